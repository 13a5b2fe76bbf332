//! Scratch workspace staging for the correction engine.
//!
//! Inputs are copied (never moved) so that a rerun starts from untouched
//! originals. The engine expects extension-free binaries next to `.hdr` files.
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::core::params::{InputDatasets, dataset_name};
use crate::error::{Error, Result};
use crate::io::EnviHeader;
use crate::io::writers::table::write_wavelength_table;

/// Known AVIRIS-NG defect: some headers carry extra leading FWHM entries.
pub const FWHM_OFFSET: usize = 23;

/// A raster binary and its ENVI header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterPair {
    pub binary: PathBuf,
    pub header: PathBuf,
}

impl RasterPair {
    /// `<dir>/<name>.bin` + `<dir>/<name>.hdr` where `<name>` is the directory name
    pub fn in_dataset(dir: &Path) -> Result<Self> {
        let name = dataset_name(dir)?;
        Ok(Self {
            binary: dir.join(format!("{}.bin", name)),
            header: dir.join(format!("{}.hdr", name)),
        })
    }

    /// Extension-free binary `<dir>/<stem>` + `<dir>/<stem>.hdr`
    pub fn engine_style(dir: &Path, stem: &str) -> Self {
        Self {
            binary: dir.join(stem),
            header: dir.join(format!("{}.hdr", stem)),
        }
    }

    pub fn missing_file(&self) -> Option<&Path> {
        [&self.binary, &self.header]
            .into_iter()
            .find(|p| !p.is_file())
            .map(PathBuf::as_path)
    }

    fn copy_to(&self, target: &RasterPair) -> Result<()> {
        fs::copy(&self.binary, &target.binary)?;
        fs::copy(&self.header, &target.header)?;
        debug!("Staged {:?} -> {:?}", self.binary, target.binary);
        Ok(())
    }
}

/// Locations of the staged engine inputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedPaths {
    pub radiance: RasterPair,
    pub location: RasterPair,
    pub observation: RasterPair,
}

/// Copy the radiance/location/observation pairs into `workdir` under
/// engine-compatible names. All six source files are checked before anything
/// is copied.
pub fn stage_inputs(
    datasets: &InputDatasets,
    engine_basename: &str,
    workdir: &Path,
) -> Result<StagedPaths> {
    let sources = [
        RasterPair::in_dataset(&datasets.radiance)?,
        RasterPair::in_dataset(&datasets.location)?,
        RasterPair::in_dataset(&datasets.observation)?,
    ];
    if let Some(missing) = sources.iter().find_map(RasterPair::missing_file) {
        return Err(Error::MissingInput {
            path: missing.to_path_buf(),
        });
    }

    fs::create_dir_all(workdir)?;

    let staged = StagedPaths {
        radiance: RasterPair::engine_style(workdir, engine_basename),
        location: RasterPair::engine_style(workdir, &format!("{}_LOC", engine_basename)),
        observation: RasterPair::engine_style(workdir, &format!("{}_OBS", engine_basename)),
    };
    let [rdn, loc, obs] = &sources;
    rdn.copy_to(&staged.radiance)?;
    loc.copy_to(&staged.location)?;
    obs.copy_to(&staged.observation)?;

    info!("Staged inputs into {:?} as {}", workdir, engine_basename);
    Ok(staged)
}

/// One row of the engine's wavelength file
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavelengthRow {
    pub index: usize,
    pub wavelength: f64,
    pub fwhm: f64,
}

/// Pair each wavelength with its FWHM. When the two lists differ in length the
/// FWHM list is read from `FWHM_OFFSET` onwards. Always yields one row per
/// wavelength.
pub fn derive_wavelengths(radiance_header: &Path) -> Result<Vec<WavelengthRow>> {
    let hdr = EnviHeader::read(radiance_header)?;
    let wl = hdr.get_f64_list("wavelength")?;
    let fwhm = hdr.get_f64_list("fwhm")?;

    let offset = if wl.len() == fwhm.len() { 0 } else { FWHM_OFFSET };
    if fwhm.len() < wl.len() + offset {
        return Err(Error::InvalidHeader {
            path: radiance_header.to_path_buf(),
            field: "fwhm",
            reason: format!(
                "{} values cannot cover {} wavelengths at offset {}",
                fwhm.len(),
                wl.len(),
                offset
            ),
        });
    }
    if offset > 0 {
        debug!(
            "FWHM/wavelength length mismatch ({} vs {}), applying offset {}",
            fwhm.len(),
            wl.len(),
            offset
        );
    }

    Ok(wl
        .iter()
        .enumerate()
        .map(|(i, &w)| WavelengthRow {
            index: i,
            wavelength: w,
            fwhm: fwhm[i + offset],
        })
        .collect())
}

/// Derive the wavelength table from `radiance_header` and write it to `output`.
pub fn write_wavelengths(radiance_header: &Path, output: &Path) -> Result<usize> {
    let rows = derive_wavelengths(radiance_header)?;
    write_wavelength_table(output, &rows)?;
    info!("Wrote {} wavelength rows to {:?}", rows.len(), output);
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn header_with(wl: &[f64], fwhm: &[f64]) -> String {
        let join = |v: &[f64]| v.iter().map(|x| x.to_string()).collect::<Vec<_>>().join(", ");
        format!(
            "ENVI\nbands = {}\nwavelength = {{{}}}\nfwhm = {{{}}}\n",
            wl.len(),
            join(wl),
            join(fwhm)
        )
    }

    fn write_dataset(root: &Path, name: &str) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{}.bin", name)), b"\x00\x01\x02\x03").unwrap();
        fs::write(dir.join(format!("{}.hdr", name)), "ENVI\nbands = 1\n").unwrap();
        dir
    }

    #[test]
    fn equal_lengths_zip_directly() {
        let dir = tempfile::tempdir().unwrap();
        let hdr = dir.path().join("r.hdr");
        fs::write(&hdr, header_with(&[400.0, 500.0, 600.0], &[5.0, 6.0, 7.0])).unwrap();
        let rows = derive_wavelengths(&hdr).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], WavelengthRow { index: 2, wavelength: 600.0, fwhm: 7.0 });
    }

    #[test]
    fn mismatched_fwhm_uses_offset_and_keeps_wavelength_count() {
        let dir = tempfile::tempdir().unwrap();
        let hdr = dir.path().join("r.hdr");
        let wl: Vec<f64> = (0..4).map(|i| 400.0 + 10.0 * i as f64).collect();
        let fwhm: Vec<f64> = (0..(FWHM_OFFSET + 4)).map(|i| i as f64).collect();
        fs::write(&hdr, header_with(&wl, &fwhm)).unwrap();

        let rows = derive_wavelengths(&hdr).unwrap();
        assert_eq!(rows.len(), wl.len());
        assert_eq!(rows[0].fwhm, FWHM_OFFSET as f64);
        assert_eq!(rows[3].fwhm, (FWHM_OFFSET + 3) as f64);
    }

    #[test]
    fn short_fwhm_list_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let hdr = dir.path().join("r.hdr");
        fs::write(&hdr, header_with(&[400.0, 500.0, 600.0], &[5.0])).unwrap();
        assert!(matches!(
            derive_wavelengths(&hdr),
            Err(Error::InvalidHeader { field: "fwhm", .. })
        ));
    }

    #[test]
    fn table_file_has_one_line_per_wavelength() {
        let dir = tempfile::tempdir().unwrap();
        let hdr = dir.path().join("r.hdr");
        fs::write(&hdr, header_with(&[400.0, 500.0], &[5.0, 6.0])).unwrap();
        let out = dir.path().join("wavelengths.txt");
        assert_eq!(write_wavelengths(&hdr, &out).unwrap(), 2);
        let text = fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            "1.000000000000000000e+00 5.000000000000000000e+02 6.000000000000000000e+00"
        );
    }

    #[test]
    fn staging_copies_under_engine_names() {
        let root = tempfile::tempdir().unwrap();
        let datasets = InputDatasets {
            radiance: write_dataset(root.path(), "SISTER_AVNG_L1B_RDN_20200101T120000_001"),
            location: write_dataset(root.path(), "SISTER_AVNG_L1B_LOC_20200101T120000_001"),
            observation: write_dataset(root.path(), "SISTER_AVNG_L1B_OBS_20200101T120000_001"),
        };
        let work = root.path().join("work");
        let staged = stage_inputs(&datasets, "ang20200101T120000", &work).unwrap();

        assert_eq!(staged.radiance.binary, work.join("ang20200101T120000"));
        assert_eq!(staged.location.header, work.join("ang20200101T120000_LOC.hdr"));
        assert!(staged.observation.binary.is_file());
        // originals untouched
        assert!(RasterPair::in_dataset(&datasets.radiance).unwrap().missing_file().is_none());

        // second run into the existing workdir succeeds
        stage_inputs(&datasets, "ang20200101T120000", &work).unwrap();
    }

    #[test]
    fn missing_input_aborts_before_copying() {
        let root = tempfile::tempdir().unwrap();
        let datasets = InputDatasets {
            radiance: write_dataset(root.path(), "SISTER_AVNG_L1B_RDN_20200101T120000_001"),
            location: root.path().join("SISTER_AVNG_L1B_LOC_20200101T120000_001"),
            observation: write_dataset(root.path(), "SISTER_AVNG_L1B_OBS_20200101T120000_001"),
        };
        let work = root.path().join("work");
        let err = stage_inputs(&datasets, "ang20200101T120000", &work).unwrap_err();
        assert!(matches!(err, Error::MissingInput { .. }));
        assert!(!work.exists());
    }
}
