use ndarray::Array2;
use std::path::Path;
use tracing::{debug, info};

use crate::core::processing::stretch::{STRETCH_HIGH_PCT, STRETCH_LOW_PCT, stretch_to_u8};
use crate::error::{Error, Result};
use crate::io::writers::jpeg::write_rgb_jpeg;
use crate::io::writers::png::write_rgb_png;
use crate::io::{EnviHeader, RasterReader, header_path_for};
use crate::types::{BrowseFormat, Instrument};

/// ENVI header key holding the raster's no-data value
pub const NO_DATA_KEY: &str = "data ignore value";

/// Index of the band whose center wavelength is closest to `target`
pub fn nearest_band(wavelengths: &[f64], target: f64) -> Option<usize> {
    wavelengths
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (*a - target).abs().total_cmp(&(*b - target).abs()))
        .map(|(i, _)| i)
}

pub fn select_bands(wavelengths: &[f64], targets: [f64; 3]) -> Result<[usize; 3]> {
    let pick = |t: f64| {
        nearest_band(wavelengths, t).ok_or_else(|| {
            Error::Image("raster has no wavelengths to build a browse image from".into())
        })
    };
    Ok([pick(targets[0])?, pick(targets[1])?, pick(targets[2])?])
}

/// Interleave three 8-bit channels into RGB bytes
pub fn compose_rgb(red: &[u8], green: &[u8], blue: &[u8]) -> Vec<u8> {
    debug_assert!(red.len() == green.len() && green.len() == blue.len());
    let mut rgb = Vec::with_capacity(red.len() * 3);
    for i in 0..red.len() {
        rgb.push(red[i]);
        rgb.push(green[i]);
        rgb.push(blue[i]);
    }
    rgb
}

/// Stretch each channel independently and interleave. Returns (cols, rows, rgb).
pub fn build_quicklook(channels: [&Array2<f64>; 3], no_data: Option<f64>) -> (usize, usize, Vec<u8>) {
    let (rows, cols) = channels[0].dim();
    let [r, g, b] = channels.map(|band| stretch_to_u8(band, no_data, STRETCH_LOW_PCT, STRETCH_HIGH_PCT));
    (cols, rows, compose_rgb(&r, &g, &b))
}

/// Render an RGB browse image of a reflectance raster.
pub fn generate_quicklook(
    raster: &Path,
    instrument: Instrument,
    output: &Path,
    format: BrowseFormat,
) -> Result<()> {
    let header = EnviHeader::read(&header_path_for(raster))?;
    let wavelengths = header.get_f64_list("wavelength")?;
    let no_data = header.get_f64(NO_DATA_KEY)?;

    let targets = instrument.quicklook_wavelengths();
    let bands = select_bands(&wavelengths, targets)?;
    debug!(
        "Quicklook bands for {} at {:?} nm: {:?}",
        instrument, targets, bands
    );

    let reader = RasterReader::open(raster)?;
    let red = reader.read_band(bands[0])?;
    let green = reader.read_band(bands[1])?;
    let blue = reader.read_band(bands[2])?;

    let (cols, rows, rgb) = build_quicklook([&red, &green, &blue], no_data);
    match format {
        BrowseFormat::Png => write_rgb_png(output, cols, rows, &rgb)?,
        BrowseFormat::Jpeg => write_rgb_jpeg(output, cols, rows, &rgb)?,
    }
    info!("Created quicklook {:?} ({}x{})", output, cols, rows);
    Ok(())
}
