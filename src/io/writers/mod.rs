//! Output writers: browse images (PNG/JPEG), JSON metadata sidecars and the
//! engine's wavelength table.
pub mod jpeg;
pub mod metadata;
pub mod png;
pub mod table;
