use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::core::workspace::WavelengthRow;
use crate::error::Result;

/// Format a value the way C's `%.18e` does (signed exponent, at least two digits).
pub fn format_scientific(value: f64) -> String {
    let s = format!("{:.18e}", value);
    match s.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        None => s,
    }
}

/// Write the (index, wavelength, fwhm) table as whitespace-separated float32 columns.
pub fn write_wavelength_table(output: &Path, rows: &[WavelengthRow]) -> Result<()> {
    let file = File::create(output)?;
    let mut writer = BufWriter::new(file);
    for row in rows {
        // Rows are stored at float32 precision
        let cols = [row.index as f32, row.wavelength as f32, row.fwhm as f32];
        let line: Vec<String> = cols.iter().map(|&v| format_scientific(v as f64)).collect();
        writeln!(writer, "{}", line.join(" "))?;
    }
    writer.flush()?;
    Ok(())
}
