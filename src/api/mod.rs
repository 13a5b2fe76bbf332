//! High-level, ergonomic library API: run the whole product assembly pipeline
//! for one granule, or generate a run configuration from an inputs document.
//! Prefer these entrypoints over the low-level `core` stages when integrating
//! rflpack.
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

use crate::core::assemble::{
    ProductManifest, apply_experimental_prefix, assemble_products, attach_ancillary,
    write_product_metadata,
};
use crate::core::catalog::{build_catalog, catalog_description, items_for_product_set};
use crate::core::engine::{EngineJob, EngineRunner, build_command};
use crate::core::identifiers::{
    derive_engine_basename, derive_instrument, derive_product_basename, derive_sensor_tag,
};
use crate::core::params::{RunConfig, dataset_name};
use crate::core::processing::quicklook::generate_quicklook;
use crate::core::workspace::{stage_inputs, write_wavelengths};
use crate::error::{Error, Result};
use crate::io::writers::metadata::{RUNCONFIG_INDENT, write_json_indented};
use crate::types::{BrowseFormat, ProductKind};

/// Subdirectory of the work directory the engine writes its rasters into
pub const ENGINE_OUTPUT_DIR: &str = "output";
pub const WAVELENGTH_FILE: &str = "wavelengths.txt";

/// Where one pipeline run reads and writes. Each directory must be used by
/// at most one run at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub work_dir: PathBuf,
    pub output_dir: PathBuf,
    pub browse_format: BrowseFormat,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("work"),
            output_dir: PathBuf::from("output"),
            browse_format: BrowseFormat::default(),
        }
    }
}

/// Summary of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    /// Final reflectance basename (with the experimental prefix when applied)
    pub basename: String,
    pub catalog_path: PathBuf,
    pub item_ids: Vec<String>,
}

/// Run the full pipeline for the granule named in `config`.
///
/// Stages, in order: derive names, stage inputs, write the wavelength table,
/// run the engine, assemble products, render the browse image, write metadata
/// sidecars, attach ancillary files, apply the experimental prefix, build and
/// save the catalog. Any failure stops the run; nothing is written to the
/// output directory before the engine has succeeded.
pub fn run_pipeline(
    config: &RunConfig,
    runconfig_path: &Path,
    options: &PipelineOptions,
    runner: &dyn EngineRunner,
) -> Result<PipelineReport> {
    let inputs = &config.inputs;
    let datasets = inputs.datasets()?;
    let radiance_name = dataset_name(&datasets.radiance)?;

    let basename = derive_product_basename(&radiance_name, &inputs.crid)?;
    let instrument = derive_instrument(&radiance_name)?;
    let sensor = derive_sensor_tag(&radiance_name)?;
    let engine_basename = derive_engine_basename(&radiance_name, &sensor)?;
    info!(
        "Granule {} -> {} (instrument {}, sensor {})",
        radiance_name, basename, instrument, sensor
    );
    if !runconfig_path.is_file() {
        return Err(Error::MissingInput {
            path: runconfig_path.to_path_buf(),
        });
    }

    let work = &options.work_dir;
    let staged = stage_inputs(&datasets, &engine_basename, work)?;
    let wavelength_path = work.join(WAVELENGTH_FILE);
    write_wavelengths(&staged.radiance.header, &wavelength_path)?;

    let job = EngineJob {
        workdir: work.clone(),
        wavelength_path,
        log_path: work.join(format!("{}.log", basename)),
        n_cores: inputs.n_cores,
        segmentation_size: inputs.segmentation_size,
    };
    let command = build_command(&staged, &sensor, &job, &config.engine);
    let started = Instant::now();
    runner.run(&command)?;
    info!("Engine run took {:.1?}", started.elapsed());

    let output = &options.output_dir;
    let manifest = ProductManifest::standard(inputs.experimental);
    let mut set = assemble_products(
        &work.join(ENGINE_OUTPUT_DIR),
        &engine_basename,
        output,
        &basename,
        &manifest,
    )?;

    let reflectance = set
        .product(ProductKind::Reflectance)
        .ok_or_else(|| Error::Processing("reflectance product was not assembled".into()))?;
    let browse = output.join(format!(
        "{}.{}",
        basename,
        options.browse_format.extension()
    ));
    generate_quicklook(
        &reflectance.binary,
        instrument,
        &browse,
        options.browse_format,
    )?;
    set.browse = Some(browse);

    write_product_metadata(&set, &config.metadata, &manifest)?;
    attach_ancillary(&mut set, output, &job.log_path, runconfig_path)?;

    if inputs.experimental {
        set = apply_experimental_prefix(&set)?;
    }

    let items = items_for_product_set(&set)?;
    let catalog = build_catalog(catalog_description(inputs.experimental), items)?;
    let catalog_path = catalog.save(output)?;

    Ok(PipelineReport {
        basename: set.basename,
        catalog_path,
        item_ids: catalog.items.iter().map(|i| i.meta.id.clone()).collect(),
    })
}

/// Name of the radiance dataset in an inputs document: the last component of
/// `radiance_dataset`, or of `file[0].l1_granule` in the list-shaped form.
fn radiance_reference(inputs: &Map<String, Value>) -> Option<&str> {
    inputs
        .get("radiance_dataset")
        .and_then(Value::as_str)
        .or_else(|| {
            inputs
                .get("file")?
                .as_array()?
                .first()?
                .get("l1_granule")?
                .as_str()
        })
}

/// Build `runconfig.json` from an inputs document and the granule's sidecar
/// metadata at `<input_dir>/<dataset>/<dataset>.met.json`.
///
/// List-shaped inputs get a `radiance_dataset` entry so the result loads as a
/// [`RunConfig`].
pub fn generate_runconfig(inputs_json: &Path, input_dir: &Path, output: &Path) -> Result<PathBuf> {
    let text = fs::read_to_string(inputs_json)?;
    let mut inputs = match serde_json::from_str::<Value>(&text)? {
        Value::Object(m) => m,
        _ => {
            return Err(Error::InvalidArgument {
                arg: "inputs",
                value: inputs_json.display().to_string(),
            });
        }
    };

    let reference = radiance_reference(&inputs)
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidArgument {
            arg: "inputs.radiance_dataset",
            value: inputs_json.display().to_string(),
        })?;
    let dataset = dataset_name(Path::new(&reference))?;
    inputs
        .entry("radiance_dataset")
        .or_insert_with(|| Value::from(input_dir.join(&dataset).display().to_string()));

    let met_path = input_dir.join(&dataset).join(format!("{}.met.json", dataset));
    if !met_path.is_file() {
        return Err(Error::MissingInput { path: met_path });
    }
    let metadata: Value = serde_json::from_str(&fs::read_to_string(&met_path)?)?;

    let mut runconfig = Map::new();
    runconfig.insert("inputs".into(), Value::Object(inputs));
    runconfig.insert("metadata".into(), metadata);
    write_json_indented(output, &runconfig, RUNCONFIG_INDENT)?;
    info!("Wrote run configuration {:?}", output);
    Ok(output.to_path_buf())
}
