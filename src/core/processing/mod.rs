//! Raster processing for browse imagery.
pub mod quicklook;
pub mod stretch;
