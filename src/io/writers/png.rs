use image::{ImageFormat, RgbImage};
use std::path::Path;

use crate::error::{Error, Result};

pub fn write_rgb_png(output: &Path, cols: usize, rows: usize, rgb_data: &[u8]) -> Result<()> {
    let (width, height) = (cols as u32, rows as u32);
    let img = RgbImage::from_raw(width, height, rgb_data.to_vec()).ok_or_else(|| {
        Error::Image(format!(
            "buffer of {} bytes does not hold a {}x{} RGB image",
            rgb_data.len(),
            cols,
            rows
        ))
    })?;
    img.save_with_format(output, ImageFormat::Png)
        .map_err(|e| Error::Image(e.to_string()))
}
