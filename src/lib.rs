pub mod affine;
pub mod epsg;
mod errors;
pub mod gcp;
pub mod image;
pub mod math;
pub mod rewrite;
pub mod session;
mod sources;
pub mod tiff;

use std::path::Path;

pub use crate::affine::{AffineTransform, MIN_GCPS};
pub use crate::epsg::Crs;
pub use crate::errors::Error;
pub use crate::gcp::{GcpStore, GroundControlPoint};
pub use crate::image::{DataType, RasterInfo};
pub use crate::math::{vec2f, Vec2f};
pub use crate::tiff::reader::TiffReader;

/// Opens a raster from a local file
pub async fn open(path: &Path) -> Result<TiffReader, Error> {
    TiffReader::open(path).await
}
