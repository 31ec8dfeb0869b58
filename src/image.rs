/// Per-band sample data types supported by the raster copy path.
///
/// The rewriter never interprets sample values, it only needs the byte size
/// to slice band buffers, so adding a type here is enough to support it
/// end-to-end.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub enum DataType {
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
}

impl DataType {
    pub fn size_bytes(&self) -> usize {
        match self {
            DataType::Uint8 => 1,
            DataType::Int16 | DataType::Uint16 => 2,
            DataType::Int32 | DataType::Uint32 | DataType::Float32 => 4,
            DataType::Float64 => 8,
        }
    }
}

/// Structural description of a raster: everything that must be identical
/// between a source and its georeferenced copy.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RasterInfo {
    pub width: u64,
    pub height: u64,
    pub nbands: usize,
    pub data_type: DataType,
}

impl RasterInfo {
    /// Size in bytes of one fully decoded band
    pub fn band_nbytes(&self) -> usize {
        self.width as usize * self.height as usize * self.data_type.size_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_nbytes() {
        let info = RasterInfo {
            width: 100,
            height: 50,
            nbands: 3,
            data_type: DataType::Uint16,
        };
        assert_eq!(info.band_nbytes(), 100 * 50 * 2);
    }
}
