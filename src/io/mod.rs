//! I/O layer: the ENVI header text model, GDAL-backed band reading, and
//! `writers` for browse images, JSON sidecars and the wavelength table.
pub mod envi;
pub use envi::{EnviHeader, HeaderError, HeaderValue, header_path_for};

pub mod gdal;
pub use gdal::{RasterError, RasterReader, RasterShape};

pub mod writers;
