/// Utilities related to EPSG
use crate::Error;

/// The GeoTIFF "model type" a CRS belongs to (geographic lon/lat vs projected
/// easting/northing). This decides which geo key carries the EPSG code.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ModelType {
    Geographic,
    Projected,
}

#[derive(Debug, Copy, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Crs {
    Wgs84,
    PseudoMercator,
    Other(u16),
}

impl Crs {
    pub fn decode(v: u16) -> Crs {
        match v {
            4326 => Crs::Wgs84,
            3857 => Crs::PseudoMercator,
            v => Crs::Other(v),
        }
    }

    pub fn epsg_code(&self) -> u16 {
        match self {
            Crs::Wgs84 => 4326,
            Crs::PseudoMercator => 3857,
            Crs::Other(v) => *v,
        }
    }

    /// Parses strings like "EPSG:4326" or "epsg:4326" or a bare code "4326"
    pub fn parse(s: &str) -> Result<Crs, Error> {
        let code = match s.split_once(':') {
            Some((prefix, code)) => {
                if !prefix.eq_ignore_ascii_case("epsg") {
                    return Err(Error::InvalidData(format!(
                        "Unsupported CRS authority {:?}, expected EPSG",
                        prefix
                    )));
                }
                code
            }
            None => s,
        };
        let code = code
            .parse::<u16>()
            .map_err(|e| Error::InvalidData(format!("Invalid EPSG code {:?}: {}", s, e)))?;
        Ok(Crs::decode(code))
    }

    pub fn model_type(&self) -> ModelType {
        match self {
            Crs::Wgs84 => ModelType::Geographic,
            Crs::PseudoMercator => ModelType::Projected,
            // EPSG geographic 2D CRS codes cluster in 4000-5000; everything
            // else we treat as projected, which covers UTM and national grids
            Crs::Other(v) => {
                if (4000..5000).contains(v) {
                    ModelType::Geographic
                } else {
                    ModelType::Projected
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(Crs::parse("EPSG:4326").unwrap(), Crs::Wgs84);
        assert_eq!(Crs::parse("epsg:3857").unwrap(), Crs::PseudoMercator);
        assert_eq!(Crs::parse("32633").unwrap(), Crs::Other(32633));
        assert!(Crs::parse("utm:33").is_err());
        assert!(Crs::parse("EPSG:notanumber").is_err());
    }

    #[test]
    fn test_model_type() {
        assert_eq!(Crs::Wgs84.model_type(), ModelType::Geographic);
        assert_eq!(Crs::PseudoMercator.model_type(), ModelType::Projected);
        assert_eq!(Crs::Other(32633).model_type(), ModelType::Projected);
        assert_eq!(Crs::Other(4258).model_type(), ModelType::Geographic);
    }

    #[test]
    fn test_epsg_code_roundtrip() {
        for code in [4326u16, 3857, 32633] {
            assert_eq!(Crs::decode(code).epsg_code(), code);
        }
    }
}
