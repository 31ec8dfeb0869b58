use crate::errors::Error;
use crate::image::DataType;

// SampleFormat tag values, TIFF 6.0 section 19
const SAMPLE_FORMAT_UNSIGNED: u16 = 1;
const SAMPLE_FORMAT_SIGNED: u16 = 2;
const SAMPLE_FORMAT_FLOAT: u16 = 3;

pub fn check_all_same(numbers: &[u16]) -> Result<u16, Error> {
    if numbers.is_empty() {
        return Err(Error::InvalidData(
            "Expected at least one value, got an empty list".to_string(),
        ));
    }
    let first_value = numbers[0];
    for num in numbers {
        if *num != first_value {
            return Err(Error::InvalidData(format!(
                "Expected same value in whole list, got {:?}",
                numbers
            )));
        }
    }
    Ok(first_value)
}

/// Maps the (SampleFormat, BitsPerSample) tag pair to a `DataType`. Mixed
/// per-band types are rejected upstream via `check_all_same`.
pub fn data_type_from_format(sample_format: u16, bits_per_sample: u16) -> Result<DataType, Error> {
    match (sample_format, bits_per_sample) {
        (SAMPLE_FORMAT_UNSIGNED, 8) => Ok(DataType::Uint8),
        (SAMPLE_FORMAT_UNSIGNED, 16) => Ok(DataType::Uint16),
        (SAMPLE_FORMAT_UNSIGNED, 32) => Ok(DataType::Uint32),
        (SAMPLE_FORMAT_SIGNED, 16) => Ok(DataType::Int16),
        (SAMPLE_FORMAT_SIGNED, 32) => Ok(DataType::Int32),
        (SAMPLE_FORMAT_FLOAT, 32) => Ok(DataType::Float32),
        (SAMPLE_FORMAT_FLOAT, 64) => Ok(DataType::Float64),
        _ => Err(Error::UnsupportedDataType(format!(
            "SampleFormat={}, BitsPerSample={}",
            sample_format, bits_per_sample
        ))),
    }
}

pub fn sample_format(data_type: DataType) -> u16 {
    match data_type {
        DataType::Uint8 | DataType::Uint16 | DataType::Uint32 => SAMPLE_FORMAT_UNSIGNED,
        DataType::Int16 | DataType::Int32 => SAMPLE_FORMAT_SIGNED,
        DataType::Float32 | DataType::Float64 => SAMPLE_FORMAT_FLOAT,
    }
}

pub fn bits_per_sample(data_type: DataType) -> u16 {
    data_type.size_bytes() as u16 * 8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_all_types() {
        for dt in [
            DataType::Uint8,
            DataType::Uint16,
            DataType::Uint32,
            DataType::Int16,
            DataType::Int32,
            DataType::Float32,
            DataType::Float64,
        ] {
            assert_eq!(
                data_type_from_format(sample_format(dt), bits_per_sample(dt)).unwrap(),
                dt
            );
        }
    }

    #[test]
    fn test_unsupported() {
        assert!(matches!(
            data_type_from_format(1, 1),
            Err(Error::UnsupportedDataType(_))
        ));
        assert!(matches!(
            data_type_from_format(4, 32),
            Err(Error::UnsupportedDataType(_))
        ));
    }

    #[test]
    fn test_check_all_same() {
        assert_eq!(check_all_same(&[8, 8, 8]).unwrap(), 8);
        assert!(check_all_same(&[8, 16]).is_err());
        assert!(check_all_same(&[]).is_err());
    }
}
