use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::LineInterpolation;

fn default_crid() -> String {
    "000".to_string()
}

fn default_n_cores() -> usize {
    32
}

fn default_segmentation_size() -> usize {
    50
}

/// The `inputs` block of a run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInputs {
    /// Directory holding `<name>.bin` and `<name>.hdr`, where `<name>` is the directory name
    pub radiance_dataset: PathBuf,
    /// Derived from `radiance_dataset` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_dataset: Option<PathBuf>,
    /// Derived from `radiance_dataset` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation_dataset: Option<PathBuf>,
    #[serde(default = "default_crid")]
    pub crid: String,
    #[serde(default = "default_n_cores")]
    pub n_cores: usize,
    #[serde(default = "default_segmentation_size")]
    pub segmentation_size: usize,
    #[serde(default)]
    pub experimental: bool,
}

/// Radiance/location/observation dataset directories for one granule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDatasets {
    pub radiance: PathBuf,
    pub location: PathBuf,
    pub observation: PathBuf,
}

/// Swap the `RDN` product token of a dataset directory name for `token`.
fn sibling_dataset(radiance: &Path, token: &str) -> Result<PathBuf> {
    let name = dataset_name(radiance)?;
    if !name.contains("_RDN_") {
        return Err(Error::malformed(
            &name,
            format!("cannot derive {} dataset without an RDN token", token),
        ));
    }
    Ok(radiance.with_file_name(name.replacen("_RDN_", &format!("_{}_", token), 1)))
}

/// Final path component of a dataset directory.
pub fn dataset_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidArgument {
            arg: "dataset",
            value: path.display().to_string(),
        })
}

impl RunInputs {
    pub fn datasets(&self) -> Result<InputDatasets> {
        let location = match &self.location_dataset {
            Some(p) => p.clone(),
            None => sibling_dataset(&self.radiance_dataset, "LOC")?,
        };
        let observation = match &self.observation_dataset {
            Some(p) => p.clone(),
            None => sibling_dataset(&self.radiance_dataset, "OBS")?,
        };
        Ok(InputDatasets {
            radiance: self.radiance_dataset.clone(),
            location,
            observation,
        })
    }
}

/// Values handed to the correction engine. Everything the engine needs is
/// carried here explicitly rather than through the process environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Interpreter used to launch the engine script
    pub interpreter: PathBuf,
    /// Engine entry point (e.g. `isofit/utils/apply_oe.py`)
    pub script: PathBuf,
    pub emulator_base: PathBuf,
    pub surface_path: PathBuf,
    /// EMIT-specific surface model; falls back to `surface_path`
    pub emit_surface_path: Option<PathBuf>,
    pub channelized_uncertainty_path: PathBuf,
    /// Radiative-transfer data directory, exported as `SIXS_DIR` to the engine process only
    pub sixs_dir: Option<PathBuf>,
    pub presolve: bool,
    pub line_interpolation: LineInterpolation,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            interpreter: PathBuf::from("python"),
            script: PathBuf::from("isofit/isofit/utils/apply_oe.py"),
            emulator_base: PathBuf::from("/app/sRTMnet_v120.h5"),
            surface_path: PathBuf::from("work/surface.mat"),
            emit_surface_path: None,
            channelized_uncertainty_path: PathBuf::from(
                "isofit/data/emit_osf_uncertainty.txt",
            ),
            sixs_dir: Some(PathBuf::from("/app/6s")),
            presolve: true,
            line_interpolation: LineInterpolation::Empirical,
        }
    }
}

/// A full run configuration (`runconfig.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub inputs: RunInputs,
    /// Free-form record inherited by every product's metadata sidecar
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub engine: EngineSettings,
}

impl RunConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
