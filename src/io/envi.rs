//! Text model for ENVI-style `.hdr` sidecars.
//!
//! The header is kept as an ordered list of raw entries so that rewriting a
//! single field (e.g. `description`) leaves every other field byte-for-byte
//! as it was read. Typed accessors parse values lazily on request.
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors encountered when reading or writing ENVI headers
#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Not an ENVI header (missing 'ENVI' magic line)")]
    MissingMagic,
    #[error("Malformed header line {line}: {text:?}")]
    MalformedLine { line: usize, text: String },
    #[error("Unterminated '{{' block for key '{key}'")]
    UnterminatedBlock { key: String },
    #[error("Missing header field '{0}'")]
    MissingField(String),
    #[error("Invalid number in field '{key}': {value:?}")]
    InvalidNumber { key: String, value: String },
}

/// Raw value of a header entry; braced values keep their inner text verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    Scalar(String),
    Braced(String),
}

impl HeaderValue {
    pub fn as_str(&self) -> &str {
        match self {
            HeaderValue::Scalar(s) | HeaderValue::Braced(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderEntry {
    pub key: String,
    pub value: HeaderValue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnviHeader {
    entries: Vec<HeaderEntry>,
}

impl EnviHeader {
    pub fn parse(text: &str) -> Result<Self, HeaderError> {
        let mut lines = text.lines().enumerate().peekable();

        // Skip leading blank lines, then require the magic token
        loop {
            match lines.next() {
                Some((_, l)) if l.trim().is_empty() => continue,
                Some((_, l)) if l.trim() == "ENVI" => break,
                _ => return Err(HeaderError::MissingMagic),
            }
        }

        let mut entries = Vec::new();
        while let Some((idx, line)) = lines.next() {
            if line.trim().is_empty() {
                continue;
            }
            let Some((key, rest)) = line.split_once('=') else {
                return Err(HeaderError::MalformedLine {
                    line: idx + 1,
                    text: line.to_string(),
                });
            };
            let key = key.trim().to_string();
            let rest = rest.trim();

            let value = if let Some(open) = rest.strip_prefix('{') {
                let mut block = open.to_string();
                while !block.contains('}') {
                    match lines.next() {
                        Some((_, next)) => {
                            block.push('\n');
                            block.push_str(next);
                        }
                        None => return Err(HeaderError::UnterminatedBlock { key }),
                    }
                }
                // Content after the closing brace is not meaningful in ENVI headers
                let close = block.rfind('}').unwrap_or(block.len());
                HeaderValue::Braced(block[..close].to_string())
            } else {
                HeaderValue::Scalar(rest.to_string())
            };
            entries.push(HeaderEntry { key, value });
        }

        Ok(Self { entries })
    }

    pub fn read(path: &Path) -> Result<Self, HeaderError> {
        let text = fs::read_to_string(path).map_err(|source| HeaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Write the header through a temporary file in the same directory, then
    /// rename it over `path`. An existing file keeps its permissions.
    pub fn write(&self, path: &Path) -> Result<(), HeaderError> {
        let io_err = |source| HeaderError::Io {
            path: path.to_path_buf(),
            source,
        };
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        if let Ok(existing) = fs::metadata(path) {
            tmp.as_file()
                .set_permissions(existing.permissions())
                .map_err(io_err)?;
        }
        tmp.write_all(self.render().as_bytes()).map_err(io_err)?;
        tmp.persist(path).map_err(|e| io_err(e.error))?;
        Ok(())
    }

    pub fn render(&self) -> String {
        let mut out = String::from("ENVI\n");
        for entry in &self.entries {
            match &entry.value {
                HeaderValue::Scalar(v) => out.push_str(&format!("{} = {}\n", entry.key, v)),
                HeaderValue::Braced(v) => out.push_str(&format!("{} = {{{}}}\n", entry.key, v)),
            }
        }
        out
    }

    pub fn entries(&self) -> &[HeaderEntry] {
        &self.entries
    }

    /// Look up a field by key, ignoring ASCII case.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key.eq_ignore_ascii_case(key))
            .map(|e| e.value.as_str().trim())
    }

    pub fn require(&self, key: &str) -> Result<&str, HeaderError> {
        self.get(key)
            .ok_or_else(|| HeaderError::MissingField(key.to_string()))
    }

    /// Comma-separated list value, items trimmed and empties dropped.
    pub fn get_list(&self, key: &str) -> Option<Vec<String>> {
        self.get(key).map(|v| {
            v.split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
    }

    pub fn get_f64_list(&self, key: &str) -> Result<Vec<f64>, HeaderError> {
        let items = self
            .get_list(key)
            .ok_or_else(|| HeaderError::MissingField(key.to_string()))?;
        items
            .iter()
            .map(|s| {
                s.parse::<f64>().map_err(|_| HeaderError::InvalidNumber {
                    key: key.to_string(),
                    value: s.clone(),
                })
            })
            .collect()
    }

    pub fn get_f64(&self, key: &str) -> Result<Option<f64>, HeaderError> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v
                .parse::<f64>()
                .map(Some)
                .map_err(|_| HeaderError::InvalidNumber {
                    key: key.to_string(),
                    value: v.to_string(),
                }),
        }
    }

    /// Replace the value of `key` in place, or append it when absent.
    pub fn set(&mut self, key: &str, value: HeaderValue) {
        match self
            .entries
            .iter_mut()
            .find(|e| e.key.eq_ignore_ascii_case(key))
        {
            Some(entry) => entry.value = value,
            None => self.entries.push(HeaderEntry {
                key: key.to_string(),
                value,
            }),
        }
    }

    pub fn set_description(&mut self, text: &str) {
        self.set("description", HeaderValue::Braced(text.to_string()));
    }
}

/// Header path for a raster binary: `x.bin` -> `x.hdr`, extension-free `x` -> `x.hdr`.
pub fn header_path_for(binary: &Path) -> PathBuf {
    match binary.extension().and_then(|e| e.to_str()) {
        Some("bin") => binary.with_extension("hdr"),
        _ => {
            let mut s = binary.as_os_str().to_os_string();
            s.push(".hdr");
            PathBuf::from(s)
        }
    }
}
