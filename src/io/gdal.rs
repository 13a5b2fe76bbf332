use gdal::raster::ResampleAlg;
use gdal::{Dataset, errors::GdalError as GdalCrateError};
use ndarray::Array2;
use std::path::Path;
use thiserror::Error;

/// Errors encountered when reading raster bands via GDAL
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("GDAL error: {0}")]
    Gdal(#[from] GdalCrateError),
    #[error("Unsupported raster: {0}")]
    Unsupported(String),
    #[error("Dimension mismatch: expected {0}x{1}, got {2} samples")]
    DimensionMismatch(usize, usize, usize),
}

/// Shape of an opened raster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterShape {
    /// Width (samples) of the raster
    pub size_x: usize,
    /// Height (lines) of the raster
    pub size_y: usize,
    /// Number of raster bands
    pub bands: usize,
}

/// Band reader for ENVI binaries (extension-free or `.bin`) and anything else GDAL opens
pub struct RasterReader {
    pub dataset: Dataset,
    pub shape: RasterShape,
}

impl RasterReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RasterError> {
        let dataset = Dataset::open(path.as_ref())?;
        let (size_x, size_y) = dataset.raster_size();
        let bands = dataset.raster_count() as usize;
        if bands == 0 {
            return Err(RasterError::Unsupported("No raster bands found".into()));
        }
        Ok(RasterReader {
            dataset,
            shape: RasterShape {
                size_x,
                size_y,
                bands,
            },
        })
    }

    /// Read a single band (0-based index) as an f64 ndarray of shape (lines, samples)
    pub fn read_band(&self, index: usize) -> Result<Array2<f64>, RasterError> {
        if index >= self.shape.bands {
            return Err(RasterError::Unsupported(format!(
                "Band index {} out of range (bands={})",
                index, self.shape.bands
            )));
        }
        // GDAL band numbering is 1-based
        let band = self.dataset.rasterband(index + 1)?;
        let window = (self.shape.size_x, self.shape.size_y);
        let buf = band.read_as::<f64>(
            (0, 0),
            window,
            window,
            Some(ResampleAlg::NearestNeighbour),
        )?;
        let data_vec = buf.data().to_vec();
        let got = data_vec.len();
        Array2::from_shape_vec((self.shape.size_y, self.shape.size_x), data_vec).map_err(|_| {
            RasterError::DimensionMismatch(self.shape.size_x, self.shape.size_y, got)
        })
    }
}
