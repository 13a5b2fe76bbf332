#![doc = r#"
rflpack: L2A surface-reflectance product assembly and STAC cataloging.

This crate wraps one run of an external atmospheric-correction engine (ISOFIT's
`apply_oe`) for a single imaging-spectroscopy granule. It stages the radiance,
location and observation rasters, runs the engine, turns its raw outputs into
versioned reflectance products with metadata sidecars and a browse image, and
publishes everything as a self-contained STAC catalog. It powers the rflpack CLI
and can be embedded in your own Rust applications.

Stability
---------
The public library API is experimental in initial releases and may evolve.
Breaking changes can occur.

Requirements
------------
- GDAL development headers and runtime available on your system (browse images
  are rendered from the ENVI reflectance raster through GDAL).
- Rust 2024 edition toolchain.
- For real runs, a Python environment with ISOFIT installed.

Quick start: package one granule
--------------------------------
```rust,no_run
use std::path::Path;
use rflpack::{PipelineOptions, ProcessRunner, RunConfig, run_pipeline};

fn main() -> rflpack::Result<()> {
    let runconfig = Path::new("runconfig.json");
    let config = RunConfig::from_path(runconfig)?;

    let report = run_pipeline(&config, runconfig, &PipelineOptions::default(), &ProcessRunner)?;
    println!("catalog: {:?}", report.catalog_path);
    Ok(())
}
```

The run configuration is a JSON document:

```json
{
    "inputs": {
        "radiance_dataset": "input/SISTER_AVNG_L1B_RDN_20200101T120000_000",
        "crid": "001",
        "n_cores": 32,
        "segmentation_size": 50,
        "experimental": false
    },
    "metadata": { "...": "inherited by every product's .met.json" }
}
```

Location and observation datasets are derived from the radiance dataset name
(`RDN` → `LOC`/`OBS`) unless given explicitly. An optional `engine` block
overrides [`EngineSettings`] (interpreter, emulator, surface model, `SIXS_DIR`).

Naming
------
```rust
use rflpack::core::identifiers::{derive_product_basename, derive_sensor_tag};

let rdn = "SISTER_AVNG_L1B_RDN_20200101T120000_001";
assert_eq!(
    derive_product_basename(rdn, "001").unwrap(),
    "SISTER_AVNG_L2A_RFL_20200101T120000_001"
);
assert_eq!(derive_sensor_tag(rdn).unwrap().to_string(), "ang");
```

Testing without the engine
--------------------------
The engine sits behind the [`EngineRunner`] trait. Supply your own runner to
drive the pipeline against pre-computed outputs:

```rust,no_run
use rflpack::{EngineCommand, EngineRunner};

struct Replay;

impl EngineRunner for Replay {
    fn run(&self, _command: &EngineCommand) -> rflpack::Result<()> {
        // copy canned rasters into <work>/output/ ...
        Ok(())
    }
}
```

Output layout
-------------
```text
output/<basename>/catalog.json
output/<basename>/<basename>/          reflectance: .bin .hdr .met.json .png .runconfig.json .log .json
output/<basename>/<basename>_UNC/      uncertainty: .bin .hdr .met.json .json
output/<basename>/<basename>_ATM/      atmospheric state, when the engine produced it
```
Experimental runs prefix every file and item id with `EXPERIMENTAL-`.

Error handling
--------------
All public functions return `rflpack::Result<T>`; match on `rflpack::Error` to
handle specific cases.

```rust,no_run
use std::path::Path;
use rflpack::{Error, PipelineOptions, ProcessRunner, RunConfig, run_pipeline};

fn main() {
    let path = Path::new("runconfig.json");
    let Ok(config) = RunConfig::from_path(path) else { return };
    match run_pipeline(&config, path, &PipelineOptions::default(), &ProcessRunner) {
        Ok(report) => println!("{}", report.basename),
        Err(Error::EngineFailed { status, log }) => eprintln!("engine {status}, see {log:?}"),
        Err(Error::MissingInput { path }) => eprintln!("missing {path:?}"),
        Err(other) => eprintln!("Other error: {other}"),
    }
}
```

Useful modules
--------------
- [`api`]: high-level entry points.
- [`core`]: the pipeline stages (identifiers, workspace, engine, assemble, catalog).
- [`types`]: closed enums (`Instrument`, `SensorTag`, `ProductKind`, ...).
- [`io`]: ENVI header model, GDAL band reader, writers.
- [`error`]: crate-level `Error` and `Result`.
"#]

// Core modules (public)
pub mod api;
pub mod core;
pub mod error;
pub mod io;
pub mod types;

// Curated public API surface
// Types
pub use core::params::{EngineSettings, RunConfig, RunInputs};
pub use error::{Error, Result};
pub use types::{BrowseFormat, Instrument, LineInterpolation, ProductKind, SensorTag};

// Engine seam
pub use core::engine::{EngineCommand, EngineRunner, ProcessRunner};

// Products and catalog
pub use core::assemble::{ProductManifest, ProductSet};
pub use core::catalog::{Catalog, CatalogItem, ProductMeta};

// Readers
pub use io::{EnviHeader, RasterReader};

// High-level API re-exports
pub use api::{PipelineOptions, PipelineReport, generate_runconfig, run_pipeline};
