use super::geo_keys::{GeoKeyDirectory, KeyID};
use super::ifd::ImageFileDirectory;
use super::tags::IFDTag;
use crate::affine::AffineTransform;
use crate::epsg::Crs;
use crate::Error;

/// The spatial metadata attached to a raster: the pixel -> CRS affine
/// transform plus the CRS it maps into.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Georeference {
    pub transform: AffineTransform,
    pub crs: Crs,
}

impl Georeference {
    /// Decodes the georeference from a GeoTIFF IFD. Returns None when the
    /// raster carries no geo keys at all — an unreferenced image, which is
    /// the normal input to this system.
    pub fn decode(ifd: &ImageFileDirectory) -> Result<Option<Georeference>, Error> {
        let directory = match ifd.find_tag_value(IFDTag::GeoKeyDirectoryTag) {
            None => return Ok(None),
            Some(value) => match value {
                super::ifd::IFDValue::Short(v) => v.clone(),
                value => {
                    return Err(Error::TagHasWrongType(
                        IFDTag::GeoKeyDirectoryTag,
                        value.clone(),
                    ))
                }
            },
        };
        let geo_keys = GeoKeyDirectory::decode(&directory)?;
        let raster_type = geo_keys.get_short_key_value(KeyID::GTRasterType)?;
        if raster_type != 1 {
            return Err(Error::InvalidData(format!(
                "Only raster type 'RasterPixelIsArea' (1) is supported, got {}",
                raster_type
            )));
        }
        let crs = geo_keys.crs()?;
        let transform = Self::decode_transform(ifd)?;
        Ok(Some(Georeference { transform, crs }))
    }

    fn decode_transform(ifd: &ImageFileDirectory) -> Result<AffineTransform, Error> {
        // ModelTransformationTag carries the full affine map and takes
        // precedence; ModelTiepointTag + ModelPixelScaleTag can only express
        // north-up transforms
        if ifd.find_tag_value(IFDTag::ModelTransformationTag).is_some() {
            let matrix = ifd.get_vec_double_tag_value(IFDTag::ModelTransformationTag)?;
            if matrix.len() != 16 {
                return Err(Error::UnsupportedTagValue(
                    IFDTag::ModelTransformationTag,
                    format!("expected 16 doubles, got {}", matrix.len()),
                ));
            }
            return Ok(AffineTransform {
                a: matrix[0],
                b: matrix[1],
                c: matrix[3],
                d: matrix[4],
                e: matrix[5],
                f: matrix[7],
            });
        }

        let tie_points = ifd.get_vec_double_tag_value(IFDTag::ModelTiepointTag)?;
        let pixel_scale = ifd.get_vec_double_tag_value(IFDTag::ModelPixelScaleTag)?;
        if tie_points.len() != 6 {
            return Err(Error::UnsupportedTagValue(
                IFDTag::ModelTiepointTag,
                format!("expected 6 doubles, got {}", tie_points.len()),
            ));
        }
        if pixel_scale.len() != 3 {
            return Err(Error::UnsupportedTagValue(
                IFDTag::ModelPixelScaleTag,
                format!("expected 3 doubles, got {}", pixel_scale.len()),
            ));
        }
        if tie_points[0] != 0.0 || tie_points[1] != 0.0 || tie_points[2] != 0.0 {
            return Err(Error::UnsupportedTagValue(
                IFDTag::ModelTiepointTag,
                format!("expected a tie point at pixel (0, 0, 0), got {:?}", tie_points),
            ));
        }
        Ok(AffineTransform {
            a: pixel_scale[0],
            b: 0.0,
            c: tie_points[3],
            d: 0.0,
            // y grows downwards in pixel space, upwards in CRS space
            e: -pixel_scale[1],
            f: tie_points[4],
        })
    }

    /// The ModelTransformationTag payload: a row-major 4x4 matrix embedding
    /// the 2D affine map
    pub fn model_transformation(&self) -> [f64; 16] {
        let t = &self.transform;
        [
            t.a, t.b, 0.0, t.c, //
            t.d, t.e, 0.0, t.f, //
            0.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ]
    }

    pub fn geo_key_directory(&self) -> Vec<u16> {
        GeoKeyDirectory::for_crs(self.crs).encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiff::ifd::{IFDEntry, IFDValue};

    fn ifd_with(entries: Vec<(IFDTag, IFDValue)>) -> ImageFileDirectory {
        ImageFileDirectory {
            entries: entries
                .into_iter()
                .map(|(tag, value)| IFDEntry { tag, value })
                .collect(),
        }
    }

    fn geo_keys_wgs84() -> IFDValue {
        IFDValue::Short(GeoKeyDirectory::for_crs(Crs::Wgs84).encode())
    }

    #[test]
    fn test_decode_absent_is_none() {
        let ifd = ifd_with(vec![]);
        assert_eq!(Georeference::decode(&ifd).unwrap(), None);
    }

    #[test]
    fn test_decode_model_transformation() {
        let transform = AffineTransform {
            a: 0.1,
            b: 0.01,
            c: 10.0,
            d: -0.01,
            e: -0.1,
            f: 50.0,
        };
        let georef = Georeference {
            transform,
            crs: Crs::Wgs84,
        };
        let ifd = ifd_with(vec![
            (IFDTag::GeoKeyDirectoryTag, geo_keys_wgs84()),
            (
                IFDTag::ModelTransformationTag,
                IFDValue::Double(georef.model_transformation().to_vec()),
            ),
        ]);
        let decoded = Georeference::decode(&ifd).unwrap().unwrap();
        assert_eq!(decoded, georef);
    }

    #[test]
    fn test_decode_tiepoint_and_scale() {
        let ifd = ifd_with(vec![
            (IFDTag::GeoKeyDirectoryTag, geo_keys_wgs84()),
            (
                IFDTag::ModelTiepointTag,
                IFDValue::Double(vec![0.0, 0.0, 0.0, 10.0, 50.0, 0.0]),
            ),
            (
                IFDTag::ModelPixelScaleTag,
                IFDValue::Double(vec![0.001, 0.001, 0.0]),
            ),
        ]);
        let decoded = Georeference::decode(&ifd).unwrap().unwrap();
        assert_eq!(decoded.crs, Crs::Wgs84);
        assert_eq!(
            decoded.transform,
            AffineTransform {
                a: 0.001,
                b: 0.0,
                c: 10.0,
                d: 0.0,
                e: -0.001,
                f: 50.0,
            }
        );
    }

    #[test]
    fn test_decode_geo_keys_without_transform_fails() {
        let ifd = ifd_with(vec![(IFDTag::GeoKeyDirectoryTag, geo_keys_wgs84())]);
        assert!(Georeference::decode(&ifd).is_err());
    }
}
