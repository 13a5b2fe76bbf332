use std::fs;
use std::path::{Path, PathBuf};

use rflpack::core::assemble::DISCLAIMER;
use rflpack::core::params::EngineSettings;
use rflpack::{
    EngineCommand, EngineRunner, Error, PipelineOptions, ProcessRunner, RunConfig, run_pipeline,
};
use serde_json::{Value, json};

const RDN: &str = "SISTER_AVNG_L1B_RDN_20200101T120000_000";
const BASENAME: &str = "SISTER_AVNG_L2A_RFL_20200101T120000_001";
const SAMPLES: usize = 4;
const LINES: usize = 3;
const WAVELENGTHS: [f64; 3] = [660.0, 850.0, 1660.0];

fn envi_header(description: &str, bands: usize, extra: &str) -> String {
    format!(
        "ENVI\n\
         description = {{{description}}}\n\
         samples = {SAMPLES}\n\
         lines = {LINES}\n\
         bands = {bands}\n\
         header offset = 0\n\
         file type = ENVI Standard\n\
         data type = 4\n\
         interleave = bsq\n\
         byte order = 0\n\
         {extra}"
    )
}

/// Float32 little-endian BSQ raster with one no-data pixel per band
fn raster_bytes(bands: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(bands * SAMPLES * LINES * 4);
    for b in 0..bands {
        for i in 0..SAMPLES * LINES {
            let v: f32 = if i == 0 {
                -9999.0
            } else {
                0.01 * (i as f32) * (b as f32 + 1.0)
            };
            out.extend_from_slice(&v.to_le_bytes());
        }
    }
    out
}

fn product_header() -> String {
    envi_header(
        "engine output",
        WAVELENGTHS.len(),
        "wavelength = {660.0, 850.0, 1660.0}\n\
         fwhm = {10.0, 10.0, 10.0}\n\
         data ignore value = -9999\n\
         start acquisition time = 2020-01-01t12:00:00z\n\
         end acquisition time = 2020-01-01t12:05:00z\n\
         bounding box = [-118.1, 34.2, -118.0, 34.2, -118.0, 34.1, -118.1, 34.1]\n",
    )
}

fn write_dataset(input: &Path, name: &str, extra: &str) -> PathBuf {
    let dir = input.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("{name}.bin")), raster_bytes(3)).unwrap();
    fs::write(dir.join(format!("{name}.hdr")), envi_header("input", 3, extra)).unwrap();
    dir
}

struct Fixture {
    _tmp: tempfile::TempDir,
    root: PathBuf,
    runconfig: PathBuf,
}

impl Fixture {
    fn new(experimental: bool) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_path_buf();
        let input = root.join("input");
        let rdn = write_dataset(
            &input,
            RDN,
            "wavelength = {660.0, 850.0, 1660.0}\nfwhm = {10.0, 10.0, 10.0}\n",
        );
        write_dataset(&input, &RDN.replace("_RDN_", "_LOC_"), "");
        write_dataset(&input, &RDN.replace("_RDN_", "_OBS_"), "");

        let runconfig = root.join("runconfig.json");
        let doc = json!({
            "inputs": {
                "radiance_dataset": rdn,
                "crid": "001",
                "n_cores": 4,
                "experimental": experimental
            },
            "metadata": {"sensor": "AVNG", "start_time": "2020-01-01T12:00:00Z"}
        });
        fs::write(&runconfig, serde_json::to_string_pretty(&doc).unwrap()).unwrap();
        Self {
            _tmp: tmp,
            root,
            runconfig,
        }
    }

    fn config(&self) -> RunConfig {
        RunConfig::from_path(&self.runconfig).unwrap()
    }

    fn options(&self, output: &str) -> PipelineOptions {
        PipelineOptions {
            work_dir: self.root.join("work"),
            output_dir: self.root.join(output),
            ..PipelineOptions::default()
        }
    }
}

/// Writes canned engine outputs next to the staged inputs
struct FakeEngine {
    outputs: &'static [&'static str],
    fail: bool,
}

impl FakeEngine {
    fn complete() -> Self {
        Self {
            outputs: &["_rfl", "_uncert", "_atm_interp"],
            fail: false,
        }
    }
}

impl EngineRunner for FakeEngine {
    fn run(&self, command: &EngineCommand) -> rflpack::Result<()> {
        fs::write(&command.log_path, "engine log\n").unwrap();
        if self.fail {
            return Err(Error::EngineFailed {
                status: "exit status: 1".into(),
                log: command.log_path.clone(),
            });
        }
        let staged = Path::new(&command.args[1]);
        let stem = staged.file_name().unwrap().to_string_lossy().into_owned();
        let out = PathBuf::from(&command.args[4]).join("output");
        fs::create_dir_all(&out).unwrap();
        for suffix in self.outputs {
            fs::write(out.join(format!("{stem}{suffix}")), raster_bytes(3)).unwrap();
            fs::write(out.join(format!("{stem}{suffix}.hdr")), product_header()).unwrap();
        }
        Ok(())
    }
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn header_description(path: &Path) -> String {
    rflpack::EnviHeader::read(path)
        .unwrap()
        .get("description")
        .unwrap()
        .to_string()
}

#[test]
fn packages_products_into_self_contained_catalog() {
    let fx = Fixture::new(false);
    let options = fx.options("output");
    let report = run_pipeline(&fx.config(), &fx.runconfig, &options, &FakeEngine::complete()).unwrap();

    assert_eq!(report.basename, BASENAME);
    let root = options.output_dir.join(BASENAME);
    assert_eq!(report.catalog_path, root.join("catalog.json"));
    assert_eq!(
        report.item_ids,
        vec![
            BASENAME.to_string(),
            format!("{BASENAME}_ATM"),
            format!("{BASENAME}_UNC")
        ]
    );

    // Products were moved into the catalog tree
    for name in [format!("{BASENAME}.bin"), format!("{BASENAME}.png"), format!("{BASENAME}_UNC.hdr")] {
        assert!(!options.output_dir.join(name).exists());
    }

    let rfl = root.join(BASENAME);
    for ext in ["bin", "hdr", "met.json", "png", "runconfig.json", "log", "json"] {
        assert!(rfl.join(format!("{BASENAME}.{ext}")).is_file(), "missing .{ext}");
    }
    let unc_id = format!("{BASENAME}_UNC");
    let unc = root.join(&unc_id);
    let mut unc_files: Vec<String> = fs::read_dir(&unc)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    unc_files.sort();
    assert_eq!(
        unc_files,
        vec![
            format!("{unc_id}.bin"),
            format!("{unc_id}.hdr"),
            format!("{unc_id}.json"),
            format!("{unc_id}.met.json"),
        ]
    );

    assert_eq!(
        header_description(&rfl.join(format!("{BASENAME}.hdr"))),
        "Surface reflectance (unitless)"
    );
    assert_eq!(
        header_description(&unc.join(format!("{unc_id}.hdr"))),
        "Surface reflectance uncertainties (unitless)"
    );

    let rfl_meta = read_json(&rfl.join(format!("{BASENAME}.met.json")));
    assert_eq!(rfl_meta["product"], "RFL");
    assert_eq!(rfl_meta["processing_level"], "L2A");
    assert_eq!(rfl_meta["sensor"], "AVNG");
    let unc_meta = read_json(&unc.join(format!("{unc_id}.met.json")));
    assert_eq!(unc_meta["product"], "RFL_UNC");
    assert_eq!(unc_meta["start_time"], "2020-01-01T12:00:00Z");

    let item = read_json(&rfl.join(format!("{BASENAME}.json")));
    assert_eq!(item["stac_version"], "1.0.0");
    assert_eq!(item["collection"], "SISTER_AVNG_L2A_RFL_001");
    for key in ["envi_binary", "envi_header", "metadata", "browse", "runconfig", "log"] {
        let href = item["assets"][key]["href"].as_str().unwrap();
        assert!(rfl.join(href).is_file(), "{key} -> {href}");
    }
    let unc_item = read_json(&unc.join(format!("{unc_id}.json")));
    assert_eq!(unc_item["properties"]["product"], "RFL_UNC");
    assert!(unc_item["assets"].get("browse").is_none());

    let wavelengths = fs::read_to_string(options.work_dir.join("wavelengths.txt")).unwrap();
    assert_eq!(wavelengths.lines().count(), WAVELENGTHS.len());
    assert!(options.work_dir.join("ang20200101T120000_LOC.hdr").is_file());

    // Inputs are copied, never moved
    assert!(fx.root.join("input").join(RDN).join(format!("{RDN}.bin")).is_file());
}

#[test]
fn experimental_runs_are_prefixed_and_disclaimed() {
    let fx = Fixture::new(true);
    let options = fx.options("output");
    let report = run_pipeline(&fx.config(), &fx.runconfig, &options, &FakeEngine::complete()).unwrap();

    let id = format!("EXPERIMENTAL-{BASENAME}");
    assert_eq!(report.basename, id);
    let root = options.output_dir.join(&id);
    let catalog = read_json(&root.join("catalog.json"));
    assert_eq!(catalog["id"], id.as_str());
    assert!(catalog["description"].as_str().unwrap().starts_with(DISCLAIMER));

    let rfl = root.join(&id);
    assert!(rfl.join(format!("{id}.png")).is_file());
    assert!(rfl.join(format!("{id}.runconfig.json")).is_file());
    let description = header_description(&rfl.join(format!("{id}.hdr")));
    assert_eq!(description, format!("{DISCLAIMER}Surface reflectance (unitless)"));

    let item = read_json(&rfl.join(format!("{id}.json")));
    assert_eq!(item["collection"], "SISTER_AVNG_L2A_RFL_001");
    assert!(root.join(format!("{id}_UNC")).join(format!("{id}_UNC.bin")).is_file());
}

#[test]
fn engine_failure_publishes_nothing() {
    let fx = Fixture::new(false);
    let options = fx.options("output");
    let engine = FakeEngine {
        outputs: &[],
        fail: true,
    };
    let err = run_pipeline(&fx.config(), &fx.runconfig, &options, &engine).unwrap_err();
    assert!(matches!(err, Error::EngineFailed { .. }));
    assert!(!options.output_dir.join(BASENAME).exists());
}

#[test]
fn missing_uncertainty_output_is_fatal() {
    let fx = Fixture::new(false);
    let options = fx.options("output");
    let engine = FakeEngine {
        outputs: &["_rfl"],
        fail: false,
    };
    let err = run_pipeline(&fx.config(), &fx.runconfig, &options, &engine).unwrap_err();
    assert!(matches!(err, Error::MissingEngineOutput { .. }));
    assert!(!options.output_dir.exists());
}

#[test]
fn missing_atmospheric_state_is_tolerated() {
    let fx = Fixture::new(false);
    let options = fx.options("output");
    let engine = FakeEngine {
        outputs: &["_rfl", "_uncert"],
        fail: false,
    };
    let report = run_pipeline(&fx.config(), &fx.runconfig, &options, &engine).unwrap();
    assert_eq!(report.item_ids.len(), 2);
    assert!(!options.output_dir.join(BASENAME).join(format!("{BASENAME}_ATM")).exists());
}

#[test]
fn nonzero_engine_exit_stops_the_run() {
    let fx = Fixture::new(false);
    let script = fx.root.join("engine.sh");
    fs::write(&script, "exit 3\n").unwrap();
    let mut config = fx.config();
    config.engine = EngineSettings {
        interpreter: PathBuf::from("sh"),
        script,
        sixs_dir: None,
        ..EngineSettings::default()
    };
    let options = fx.options("output");
    let err = run_pipeline(&config, &fx.runconfig, &options, &ProcessRunner).unwrap_err();
    assert!(matches!(err, Error::EngineFailed { .. }));
    assert!(!options.output_dir.exists());
}

#[test]
fn reruns_produce_identical_products() {
    let fx = Fixture::new(false);
    let first = fx.options("output_a");
    let second = fx.options("output_b");
    let a = run_pipeline(&fx.config(), &fx.runconfig, &first, &FakeEngine::complete()).unwrap();
    let b = run_pipeline(&fx.config(), &fx.runconfig, &second, &FakeEngine::complete()).unwrap();

    assert_eq!(a.basename, b.basename);
    assert_eq!(a.item_ids, b.item_ids);
    for id in &a.item_ids {
        let rel = Path::new(BASENAME).join(id).join(format!("{id}.met.json"));
        assert_eq!(
            fs::read(first.output_dir.join(&rel)).unwrap(),
            fs::read(second.output_dir.join(&rel)).unwrap()
        );
    }
    let png = Path::new(BASENAME).join(BASENAME).join(format!("{BASENAME}.png"));
    assert_eq!(
        fs::read(first.output_dir.join(&png)).unwrap(),
        fs::read(second.output_dir.join(&png)).unwrap()
    );
}
