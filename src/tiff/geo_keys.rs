use crate::epsg::{Crs, ModelType};
use crate::errors::Error;

// GTModelType values, GeoTIFF section B.2
const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyID {
    GTModelType,
    GTRasterType,
    GeodeticCRS,
    ProjectedCRS,
    UnknownKey(u16),
}

fn decode_key_id(v: u16) -> KeyID {
    match v {
        1024 => KeyID::GTModelType,
        1025 => KeyID::GTRasterType,
        2048 => KeyID::GeodeticCRS,
        3072 => KeyID::ProjectedCRS,
        v => KeyID::UnknownKey(v),
    }
}

fn encode_key_id(id: KeyID) -> u16 {
    match id {
        KeyID::GTModelType => 1024,
        KeyID::GTRasterType => 1025,
        KeyID::GeodeticCRS => 2048,
        KeyID::ProjectedCRS => 3072,
        KeyID::UnknownKey(v) => v,
    }
}

/// The decoded GeoKeyDirectoryTag content, restricted to inline SHORT keys —
/// which is all that model type, raster type and the EPSG code need. Keys
/// with values stored in the double/ascii params tags are skipped.
#[derive(Debug)]
pub struct GeoKeyDirectory {
    keys: Vec<(KeyID, u16)>,
}

impl GeoKeyDirectory {
    pub fn get_short_key_value(&self, id: KeyID) -> Result<u16, Error> {
        self.keys
            .iter()
            .find(|(key_id, _)| *key_id == id)
            .map(|(_, v)| *v)
            .ok_or_else(|| Error::InvalidData(format!("Required geo key {:?} not found", id)))
    }

    pub fn decode(directory: &[u16]) -> Result<GeoKeyDirectory, Error> {
        if directory.len() < 4 {
            return Err(Error::InvalidData(format!(
                "GeoKeyDirectoryTag len < 4: {}",
                directory.len()
            )));
        }
        let version = directory[0];
        if version != 1 {
            return Err(Error::InvalidData(format!(
                "Unsupported GeoKeyDirectoryTag version. Expected 1, got {}",
                version
            )));
        }
        let revision = directory[1];
        if revision != 1 {
            return Err(Error::InvalidData(format!(
                "Unsupported GeoKeyDirectoryTag revision. Expected 1, got {}",
                revision
            )));
        }
        let keys_count = directory[3] as usize;
        if directory.len() < 4 + keys_count * 4 {
            return Err(Error::InvalidData(format!(
                "GeoKeyDirectoryTag keys_count={}, expected min len {}; got {}",
                keys_count,
                4 + keys_count * 4,
                directory.len()
            )));
        }
        let mut keys = vec![];
        for i in 0..keys_count {
            let entry = &directory[4 + i * 4..4 + (i + 1) * 4];
            let id = decode_key_id(entry[0]);
            let tiff_tag_location = entry[1];
            let value_offset = entry[3];
            // location == 0 means the value is a single short stored inline
            if tiff_tag_location == 0 {
                keys.push((id, value_offset));
            }
        }
        Ok(GeoKeyDirectory { keys })
    }

    /// The directory written for a georeferenced output: model type, raster
    /// type "PixelIsArea" and the EPSG code under the key matching the model
    pub fn for_crs(crs: Crs) -> GeoKeyDirectory {
        let (model_type, crs_key) = match crs.model_type() {
            ModelType::Geographic => (MODEL_TYPE_GEOGRAPHIC, KeyID::GeodeticCRS),
            ModelType::Projected => (MODEL_TYPE_PROJECTED, KeyID::ProjectedCRS),
        };
        GeoKeyDirectory {
            keys: vec![
                (KeyID::GTModelType, model_type),
                (KeyID::GTRasterType, 1),
                (crs_key, crs.epsg_code()),
            ],
        }
    }

    pub fn encode(&self) -> Vec<u16> {
        let mut out = vec![1, 1, 0, self.keys.len() as u16];
        for (id, value) in &self.keys {
            out.extend_from_slice(&[encode_key_id(*id), 0, 1, *value]);
        }
        out
    }

    pub fn crs(&self) -> Result<Crs, Error> {
        let model_type = self.get_short_key_value(KeyID::GTModelType)?;
        let code = if model_type == MODEL_TYPE_PROJECTED {
            self.get_short_key_value(KeyID::ProjectedCRS)?
        } else if model_type == MODEL_TYPE_GEOGRAPHIC {
            self.get_short_key_value(KeyID::GeodeticCRS)?
        } else {
            return Err(Error::InvalidData(format!(
                "Only projected/geographic CRS are supported (model_type=1 or 2), got {}",
                model_type
            )));
        };
        Ok(Crs::decode(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        for crs in [Crs::Wgs84, Crs::PseudoMercator, Crs::Other(32633)] {
            let directory = GeoKeyDirectory::for_crs(crs);
            let encoded = directory.encode();
            let decoded = GeoKeyDirectory::decode(&encoded).unwrap();
            assert_eq!(decoded.crs().unwrap(), crs);
            assert_eq!(decoded.get_short_key_value(KeyID::GTRasterType).unwrap(), 1);
        }
    }

    #[test]
    fn test_decode_rejects_bad_version() {
        assert!(GeoKeyDirectory::decode(&[2, 1, 0, 0]).is_err());
        assert!(GeoKeyDirectory::decode(&[1, 1]).is_err());
    }

    #[test]
    fn test_decode_skips_non_inline_keys() {
        // A GTCitation key (1026) pointing into GeoAsciiParamsTag (34737)
        let directory = vec![
            1, 1, 0, 2, //
            1024, 0, 1, 2, //
            1026, 34737, 8, 0,
        ];
        let decoded = GeoKeyDirectory::decode(&directory).unwrap();
        assert_eq!(decoded.get_short_key_value(KeyID::GTModelType).unwrap(), 2);
        assert!(decoded
            .get_short_key_value(KeyID::UnknownKey(1026))
            .is_err());
    }
}
