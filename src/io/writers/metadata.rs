use serde::Serialize;
use serde_json::{Map, Value};
use serde_json::ser::PrettyFormatter;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

use crate::error::Result;

/// Indentation used for per-product metadata sidecars
pub const SIDECAR_INDENT: &[u8] = b"   ";
/// Indentation used for generated run configurations
pub const RUNCONFIG_INDENT: &[u8] = b"    ";

/// Serialize `value` as indented JSON to `path`
pub fn write_json_indented<T: Serialize>(path: &Path, value: &T, indent: &[u8]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let formatter = PrettyFormatter::with_indent(indent);
    let mut ser = serde_json::Serializer::with_formatter(&mut writer, formatter);
    value.serialize(&mut ser)?;
    writer.flush()?;
    Ok(())
}

/// Shallow merge: a copy of `base` with every key of `overrides` replacing or
/// adding its value. `base` itself is never modified.
pub fn merge_metadata(base: &Map<String, Value>, overrides: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = base.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Write a per-product metadata sidecar built from the run's base record
pub fn write_metadata(
    base: &Map<String, Value>,
    overrides: &Map<String, Value>,
    path: &Path,
) -> Result<()> {
    let merged = merge_metadata(base, overrides);
    write_json_indented(path, &merged, SIDECAR_INDENT)?;
    info!("Created metadata sidecar: {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn sibling_records_do_not_leak_overrides() {
        let base = as_map(json!({"sensor": "AVNG", "start_time": "2020-01-01T12:00:00Z"}));
        let unc = merge_metadata(&base, &as_map(json!({"product": "RFL_UNC"})));
        let atm = merge_metadata(&base, &as_map(json!({"description": "atmosphere"})));

        assert_eq!(unc["product"], "RFL_UNC");
        assert!(atm.get("product").is_none());
        assert!(unc.get("description").is_none());
        assert!(base.get("product").is_none());
        assert_eq!(atm["sensor"], "AVNG");
    }

    #[test]
    fn sidecar_is_three_space_indented() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.met.json");
        let base = as_map(json!({"a": 1}));
        write_metadata(&base, &as_map(json!({"product": "RFL"})), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n   \"a\": 1"));
        let back: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back, json!({"a": 1, "product": "RFL"}));
    }
}
