use jpeg_encoder::{ColorType, Encoder};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::error::{Error, Result};

pub fn write_rgb_jpeg(output: &Path, cols: usize, rows: usize, rgb_data: &[u8]) -> Result<()> {
    let (width, height) = match (u16::try_from(cols), u16::try_from(rows)) {
        (Ok(w), Ok(h)) => (w, h),
        _ => {
            return Err(Error::Image(format!(
                "{}x{} exceeds the JPEG size limit of 65535",
                cols, rows
            )));
        }
    };
    let file = File::create(output)?;
    let mut writer = BufWriter::new(file);
    let encoder = Encoder::new(&mut writer, 90);
    encoder
        .encode(rgb_data, width, height, ColorType::Rgb)
        .map_err(|e| Error::Image(e.to_string()))?;
    Ok(())
}
