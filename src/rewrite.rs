use std::path::Path;

use crate::affine::AffineTransform;
use crate::epsg::Crs;
use crate::image::RasterInfo;
use crate::tiff::georef::Georeference;
use crate::tiff::reader::TiffReader;
use crate::tiff::writer::TiffWriter;
use crate::Error;

/// Copies `source_path` to `output_path` byte-for-byte on the sample level,
/// attaching `transform` and `crs` as the output's spatial metadata.
///
/// Width, height, band count and datatype are carried over unchanged, and
/// the copy runs band by band so peak memory is one band, not the whole
/// raster. On any failure the partially written output is removed before the
/// error is returned - there is never a half-copied file at `output_path`.
pub async fn rewrite(
    source_path: &Path,
    output_path: &Path,
    transform: &AffineTransform,
    crs: Crs,
) -> Result<RasterInfo, Error> {
    let mut reader = TiffReader::open(source_path).await?;
    let info = reader.info().clone();
    let georeference = Georeference {
        transform: *transform,
        crs,
    };
    let mut writer = TiffWriter::create(output_path, &info, Some(&georeference)).await?;
    match copy_bands(&mut reader, &mut writer).await {
        Ok(()) => writer.finish().await?,
        Err(e) => {
            // Abort errors are secondary to the copy error we already have
            let _ = writer.abort().await;
            return Err(e);
        }
    }
    Ok(info)
}

async fn copy_bands(reader: &mut TiffReader, writer: &mut TiffWriter) -> Result<(), Error> {
    for band in 0..reader.info().nbands {
        let data = reader.read_band(band).await?;
        writer.write_band(band, &data).await?;
    }
    Ok(())
}
