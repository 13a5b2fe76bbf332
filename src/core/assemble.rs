//! Turns raw engine outputs into versioned deliverables.
//!
//! A single `ProductManifest` lists which raw outputs are expected, what they
//! become, and how they are described; there is one code path for every
//! product kind.
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::core::workspace::RasterPair;
use crate::error::{Error, Result};
use crate::io::EnviHeader;
use crate::io::writers::metadata::write_metadata;
use crate::types::ProductKind;

pub const PROCESSING_LEVEL: &str = "L2A";
pub const EXPERIMENTAL_PREFIX: &str = "EXPERIMENTAL-";
pub const DISCLAIMER: &str =
    "(DISCLAIMER: THIS DATA IS EXPERIMENTAL AND NOT INTENDED FOR SCIENTIFIC USE) ";

/// One expected raw engine output and the deliverable it becomes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSpec {
    pub kind: ProductKind,
    /// Suffix the engine appends to the staged radiance basename
    pub raw_suffix: String,
    pub description: String,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductManifest {
    pub products: Vec<ProductSpec>,
}

impl ProductManifest {
    /// Reflectance and uncertainty are required; the interpolated atmospheric
    /// state is kept when the engine produced it.
    pub fn standard(experimental: bool) -> Self {
        let disclaimer = if experimental { DISCLAIMER } else { "" };
        let spec = |kind, raw: &str, text: &str, required| ProductSpec {
            kind,
            raw_suffix: raw.to_string(),
            description: format!("{}{}", disclaimer, text),
            required,
        };
        Self {
            products: vec![
                spec(ProductKind::Reflectance, "_rfl", "Surface reflectance (unitless)", true),
                spec(
                    ProductKind::Uncertainty,
                    "_uncert",
                    "Surface reflectance uncertainties (unitless)",
                    true,
                ),
                spec(
                    ProductKind::AtmosphericState,
                    "_atm_interp",
                    "Atmospheric state AOT550, Pressure Elevation, H2O",
                    false,
                ),
            ],
        }
    }

    pub fn get(&self, kind: ProductKind) -> Option<&ProductSpec> {
        self.products.iter().find(|p| p.kind == kind)
    }
}

/// Final files of one product in the output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFiles {
    pub kind: ProductKind,
    pub binary: PathBuf,
    pub header: PathBuf,
    pub metadata: PathBuf,
}

impl ProductFiles {
    /// Item id: the binary's file name without `.bin`
    pub fn id(&self) -> String {
        self.binary
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Everything one run publishes into the output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSet {
    pub basename: String,
    pub products: Vec<ProductFiles>,
    pub browse: Option<PathBuf>,
    pub runconfig: Option<PathBuf>,
    pub log: Option<PathBuf>,
}

fn with_name_prefix(path: &Path, prefix: &str) -> PathBuf {
    match path.file_name() {
        Some(name) => path.with_file_name(format!("{}{}", prefix, name.to_string_lossy())),
        None => path.to_path_buf(),
    }
}

impl ProductSet {
    pub fn product(&self, kind: ProductKind) -> Option<&ProductFiles> {
        self.products.iter().find(|p| p.kind == kind)
    }

    /// Every file path this set refers to
    pub fn files(&self) -> Vec<&Path> {
        let mut out = Vec::new();
        for p in &self.products {
            out.extend([p.binary.as_path(), p.header.as_path(), p.metadata.as_path()]);
        }
        out.extend(self.browse.as_deref());
        out.extend(self.runconfig.as_deref());
        out.extend(self.log.as_deref());
        out
    }

    /// The same set with `prefix` prepended to the basename and every file name
    pub fn prefixed(&self, prefix: &str) -> ProductSet {
        let p = |path: &Path| with_name_prefix(path, prefix);
        ProductSet {
            basename: format!("{}{}", prefix, self.basename),
            products: self
                .products
                .iter()
                .map(|f| ProductFiles {
                    kind: f.kind,
                    binary: p(&f.binary),
                    header: p(&f.header),
                    metadata: p(&f.metadata),
                })
                .collect(),
            browse: self.browse.as_deref().map(p),
            runconfig: self.runconfig.as_deref().map(p),
            log: self.log.as_deref().map(p),
        }
    }
}

/// Overwrite only the `description` field of an ENVI header.
pub fn rewrite_description(header_path: &Path, text: &str) -> Result<()> {
    let mut header = EnviHeader::read(header_path)?;
    header.set_description(text);
    header.write(header_path)?;
    debug!("Updated description of {:?}", header_path);
    Ok(())
}

/// Copy the raw engine outputs listed in `manifest` from `raw_dir` into
/// `output_dir` as `<basename><suffix>.{bin,hdr}` and set their descriptions.
///
/// Required outputs are all checked before anything is copied; a missing
/// optional output is skipped.
pub fn assemble_products(
    raw_dir: &Path,
    engine_basename: &str,
    output_dir: &Path,
    basename: &str,
    manifest: &ProductManifest,
) -> Result<ProductSet> {
    let mut present = Vec::new();
    for spec in &manifest.products {
        let raw = RasterPair::engine_style(raw_dir, &format!("{}{}", engine_basename, spec.raw_suffix));
        match raw.missing_file() {
            None => present.push((spec, raw)),
            Some(missing) if spec.required => {
                return Err(Error::MissingEngineOutput {
                    path: missing.to_path_buf(),
                });
            }
            Some(missing) => {
                warn!("Optional {} output not found ({:?}), skipping", spec.kind, missing);
            }
        }
    }

    fs::create_dir_all(output_dir)?;

    let mut products = Vec::with_capacity(present.len());
    for (spec, raw) in present {
        let stem = format!("{}{}", basename, spec.kind.suffix());
        let files = ProductFiles {
            kind: spec.kind,
            binary: output_dir.join(format!("{}.bin", stem)),
            header: output_dir.join(format!("{}.hdr", stem)),
            metadata: output_dir.join(format!("{}.met.json", stem)),
        };
        fs::copy(&raw.binary, &files.binary)?;
        fs::copy(&raw.header, &files.header)?;
        rewrite_description(&files.header, &spec.description)?;
        info!("Assembled {} product {:?}", spec.kind, files.binary);
        products.push(files);
    }

    Ok(ProductSet {
        basename: basename.to_string(),
        products,
        browse: None,
        runconfig: None,
        log: None,
    })
}

/// `product`/`processing_level`/`description` overrides for one product
pub fn product_overrides(spec: &ProductSpec) -> Map<String, Value> {
    let mut m = Map::new();
    m.insert("product".into(), Value::from(spec.kind.product_token()));
    m.insert("processing_level".into(), Value::from(PROCESSING_LEVEL));
    m.insert("description".into(), Value::from(spec.description.clone()));
    m
}

/// Write one metadata sidecar per assembled product. Each record starts from
/// an untouched copy of `base`.
pub fn write_product_metadata(
    set: &ProductSet,
    base: &Map<String, Value>,
    manifest: &ProductManifest,
) -> Result<()> {
    for files in &set.products {
        let spec = manifest.get(files.kind).ok_or_else(|| {
            Error::Processing(format!("no manifest entry for {}", files.kind))
        })?;
        write_metadata(base, &product_overrides(spec), &files.metadata)?;
    }
    Ok(())
}

/// Copy the engine log (when present) and the run configuration next to the products.
pub fn attach_ancillary(
    set: &mut ProductSet,
    output_dir: &Path,
    log: &Path,
    runconfig: &Path,
) -> Result<()> {
    if log.is_file() {
        let target = output_dir.join(format!("{}.log", set.basename));
        fs::copy(log, &target)?;
        set.log = Some(target);
    } else {
        warn!("Engine log {:?} not found, not attaching it", log);
    }
    let target = output_dir.join(format!("{}.runconfig.json", set.basename));
    fs::copy(runconfig, &target)?;
    set.runconfig = Some(target);
    Ok(())
}

/// Prefix every file of `set` with `EXPERIMENTAL-`.
///
/// All targets are checked before the first rename, so a conflict leaves the
/// directory untouched. Each rename is a single `fs::rename`, so a file never
/// exists under both names. Files not belonging to the set are left alone.
pub fn apply_experimental_prefix(set: &ProductSet) -> Result<ProductSet> {
    let renamed = set.prefixed(EXPERIMENTAL_PREFIX);
    let plan: Vec<(&Path, &Path)> = set.files().into_iter().zip(renamed.files()).collect();

    for (from, to) in &plan {
        if !from.exists() {
            return Err(Error::MissingEngineOutput {
                path: from.to_path_buf(),
            });
        }
        if to.exists() {
            return Err(Error::Processing(format!(
                "cannot rename {:?}: {:?} already exists",
                from, to
            )));
        }
    }
    for (from, to) in &plan {
        fs::rename(from, to)?;
        debug!("Renamed {:?} -> {:?}", from, to);
    }
    info!("Marked {} files as experimental", plan.len());
    Ok(renamed)
}
