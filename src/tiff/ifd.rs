/// TIFF header / Image File Directory parsing.
///
/// Unlike a streaming reader this decodes every entry eagerly: the IFD of the
/// rasters we deal with is a few hundred bytes, so there is no point in lazy
/// per-tag reads.
use std::mem::size_of;

use super::tags::{decode_tag, IFDTag};
use crate::errors::Error;
use crate::sources::Source;

#[derive(Debug, Clone, Copy)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

pub fn decode_u8(buf: [u8; 1], _byte_order: ByteOrder) -> u8 {
    u8::from_ne_bytes(buf)
}

pub fn decode_u16(buf: [u8; 2], byte_order: ByteOrder) -> u16 {
    match byte_order {
        ByteOrder::LittleEndian => u16::from_le_bytes(buf),
        ByteOrder::BigEndian => u16::from_be_bytes(buf),
    }
}

pub fn decode_u32(buf: [u8; 4], byte_order: ByteOrder) -> u32 {
    match byte_order {
        ByteOrder::LittleEndian => u32::from_le_bytes(buf),
        ByteOrder::BigEndian => u32::from_be_bytes(buf),
    }
}

pub fn decode_u32_pair(buf: [u8; 8], byte_order: ByteOrder) -> (u32, u32) {
    (
        decode_u32([buf[0], buf[1], buf[2], buf[3]], byte_order),
        decode_u32([buf[4], buf[5], buf[6], buf[7]], byte_order),
    )
}

pub fn decode_i8(buf: [u8; 1], _byte_order: ByteOrder) -> i8 {
    i8::from_ne_bytes(buf)
}

pub fn decode_i16(buf: [u8; 2], byte_order: ByteOrder) -> i16 {
    match byte_order {
        ByteOrder::LittleEndian => i16::from_le_bytes(buf),
        ByteOrder::BigEndian => i16::from_be_bytes(buf),
    }
}

pub fn decode_i32(buf: [u8; 4], byte_order: ByteOrder) -> i32 {
    match byte_order {
        ByteOrder::LittleEndian => i32::from_le_bytes(buf),
        ByteOrder::BigEndian => i32::from_be_bytes(buf),
    }
}

pub fn decode_i32_pair(buf: [u8; 8], byte_order: ByteOrder) -> (i32, i32) {
    (
        decode_i32([buf[0], buf[1], buf[2], buf[3]], byte_order),
        decode_i32([buf[4], buf[5], buf[6], buf[7]], byte_order),
    )
}

pub fn decode_f32(buf: [u8; 4], byte_order: ByteOrder) -> f32 {
    match byte_order {
        ByteOrder::LittleEndian => f32::from_le_bytes(buf),
        ByteOrder::BigEndian => f32::from_be_bytes(buf),
    }
}

pub fn decode_f64(buf: [u8; 8], byte_order: ByteOrder) -> f64 {
    match byte_order {
        ByteOrder::LittleEndian => f64::from_le_bytes(buf),
        ByteOrder::BigEndian => f64::from_be_bytes(buf),
    }
}

fn decode_string(buf: &[u8], _byte_order: ByteOrder) -> Result<String, Error> {
    let mut str: String = "".to_string();
    if buf.is_empty() || buf[buf.len() - 1] != b'\0' {
        return Err(Error::InvalidData(
            "string not terminated by null character".to_string(),
        ));
    }
    for v in &buf[..buf.len() - 1] {
        match char::from_u32(*v as u32) {
            None => {
                return Err(Error::InvalidData(format!("invalid character {:?}", v)));
            }
            Some(c) => str.push(c),
        }
    }
    Ok(str)
}

fn decode_vec<T, F, const N: usize>(
    buf: &[u8],
    count: usize,
    decode_fn: F,
    byte_order: ByteOrder,
) -> Vec<T>
where
    F: Fn([u8; N], ByteOrder) -> T,
{
    let mut out = vec![];
    let type_size: usize = size_of::<T>();
    for i in 0..count {
        out.push(decode_fn(
            buf[i * type_size..(i + 1) * type_size].try_into().unwrap(),
            byte_order,
        ))
    }
    out
}

#[derive(Clone, Copy)]
enum IFDType {
    Byte,
    Ascii,
    Short,
    Long,
    Rational,
    SignedByte,
    UndefinedRawBytes,
    SignedShort,
    SignedLong,
    SignedRational,
    Float,
    Double,
}

fn type_size(ifd_type: IFDType) -> usize {
    match ifd_type {
        IFDType::Byte => 1,
        IFDType::Ascii => 1,
        IFDType::Short => 2,
        IFDType::Long => 4,
        IFDType::Rational => 8,
        IFDType::SignedByte => 1,
        IFDType::UndefinedRawBytes => 1,
        IFDType::SignedShort => 2,
        IFDType::SignedLong => 4,
        IFDType::SignedRational => 8,
        IFDType::Float => 4,
        IFDType::Double => 8,
    }
}

#[derive(Debug, Clone)]
pub enum IFDValue {
    Byte(Vec<u8>),
    Ascii(String),
    Short(Vec<u16>),
    Long(Vec<u32>),
    Rational(Vec<(u32, u32)>),
    SignedByte(Vec<i8>),
    UndefinedRawBytes(Vec<u8>),
    SignedShort(Vec<i16>),
    SignedLong(Vec<i32>),
    SignedRational(Vec<(i32, i32)>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

#[derive(Debug, Clone)]
pub struct IFDEntry {
    pub tag: IFDTag,
    pub value: IFDValue,
}

struct IFDEntryMetadata {
    tag: u16,
    field_type: IFDType,
    count: u32,
    // Values that don't fit the 4 inline bytes are stored elsewhere in the file
    offset_or_inline: OffsetOrInlineValue,
}

enum OffsetOrInlineValue {
    Offset(u32),
    InlineValue([u8; 4]),
}

enum RawEntryResult {
    KnownType(IFDEntryMetadata),
    UnknownType(u16),
    InvalidCount(u32),
}

impl IFDEntryMetadata {
    fn decode(buf: [u8; 12], byte_order: ByteOrder) -> RawEntryResult {
        let tag = decode_u16([buf[0], buf[1]], byte_order);
        let field_type = decode_u16([buf[2], buf[3]], byte_order);
        let field_type = match field_type {
            1 => IFDType::Byte,
            2 => IFDType::Ascii,
            3 => IFDType::Short,
            4 => IFDType::Long,
            5 => IFDType::Rational,
            6 => IFDType::SignedByte,
            7 => IFDType::UndefinedRawBytes,
            8 => IFDType::SignedShort,
            9 => IFDType::SignedLong,
            10 => IFDType::SignedRational,
            11 => IFDType::Float,
            12 => IFDType::Double,
            v => return RawEntryResult::UnknownType(v),
        };
        let count = decode_u32([buf[4], buf[5], buf[6], buf[7]], byte_order);
        if count == 0 {
            return RawEntryResult::InvalidCount(count);
        }
        let offset_or_inline = if type_size(field_type) * count as usize <= 4 {
            OffsetOrInlineValue::InlineValue([buf[8], buf[9], buf[10], buf[11]])
        } else {
            OffsetOrInlineValue::Offset(decode_u32([buf[8], buf[9], buf[10], buf[11]], byte_order))
        };
        RawEntryResult::KnownType(IFDEntryMetadata {
            tag,
            field_type,
            count,
            offset_or_inline,
        })
    }

    async fn full_read(&self, source: &mut Source, byte_order: ByteOrder) -> Result<IFDEntry, Error> {
        let data = match self.offset_or_inline {
            OffsetOrInlineValue::InlineValue(arr) => {
                arr[0..type_size(self.field_type) * self.count as usize].to_vec()
            }
            OffsetOrInlineValue::Offset(offset) => {
                let mut data = vec![0u8; type_size(self.field_type) * self.count as usize];
                source.read_exact(offset.into(), data.as_mut_slice()).await?;
                data
            }
        };
        let count = self.count as usize;
        let value = match self.field_type {
            IFDType::Byte => IFDValue::Byte(decode_vec(&data, count, decode_u8, byte_order)),
            IFDType::Ascii => IFDValue::Ascii(decode_string(&data, byte_order)?),
            IFDType::Short => IFDValue::Short(decode_vec(&data, count, decode_u16, byte_order)),
            IFDType::Long => IFDValue::Long(decode_vec(&data, count, decode_u32, byte_order)),
            IFDType::Rational => {
                IFDValue::Rational(decode_vec(&data, count, decode_u32_pair, byte_order))
            }
            IFDType::SignedByte => {
                IFDValue::SignedByte(decode_vec(&data, count, decode_i8, byte_order))
            }
            IFDType::UndefinedRawBytes => IFDValue::UndefinedRawBytes(data),
            IFDType::SignedShort => {
                IFDValue::SignedShort(decode_vec(&data, count, decode_i16, byte_order))
            }
            IFDType::SignedLong => {
                IFDValue::SignedLong(decode_vec(&data, count, decode_i32, byte_order))
            }
            IFDType::SignedRational => {
                IFDValue::SignedRational(decode_vec(&data, count, decode_i32_pair, byte_order))
            }
            IFDType::Float => IFDValue::Float(decode_vec(&data, count, decode_f32, byte_order)),
            IFDType::Double => IFDValue::Double(decode_vec(&data, count, decode_f64, byte_order)),
        };
        Ok(IFDEntry {
            tag: decode_tag(self.tag),
            value,
        })
    }
}

#[derive(Debug)]
pub struct ImageFileDirectory {
    pub entries: Vec<IFDEntry>,
}

impl ImageFileDirectory {
    pub fn find_tag_value(&self, tag: IFDTag) -> Option<&IFDValue> {
        self.entries.iter().find(|e| e.tag == tag).map(|e| &e.value)
    }

    pub fn get_tag_value(&self, tag: IFDTag) -> Result<&IFDValue, Error> {
        self.find_tag_value(tag).ok_or(Error::RequiredTagNotFound(tag))
    }

    /// For scalar tags that can be stored either as Short or Long
    pub fn get_usize_tag_value(&self, tag: IFDTag) -> Result<usize, Error> {
        Ok(self.get_vec_usize_tag_value(tag)?[0])
    }

    pub fn get_vec_usize_tag_value(&self, tag: IFDTag) -> Result<Vec<usize>, Error> {
        match self.get_tag_value(tag)? {
            IFDValue::Short(values) => Ok(values.iter().map(|v| *v as usize).collect()),
            IFDValue::Long(values) => Ok(values.iter().map(|v| *v as usize).collect()),
            value => Err(Error::TagHasWrongType(tag, value.clone())),
        }
    }

    pub fn get_vec_short_tag_value(&self, tag: IFDTag) -> Result<Vec<u16>, Error> {
        match self.get_tag_value(tag)? {
            IFDValue::Short(values) => Ok(values.clone()),
            value => Err(Error::TagHasWrongType(tag, value.clone())),
        }
    }

    pub fn get_vec_double_tag_value(&self, tag: IFDTag) -> Result<Vec<f64>, Error> {
        match self.get_tag_value(tag)? {
            IFDValue::Double(values) => Ok(values.clone()),
            value => Err(Error::TagHasWrongType(tag, value.clone())),
        }
    }
}

/// Reads the TIFF header and all IFDs, with every entry value decoded
pub async fn read_ifds(source: &mut Source) -> Result<(ByteOrder, Vec<ImageFileDirectory>), Error> {
    let mut header = [0u8; 8];
    source.read_exact(0, &mut header).await?;
    let byte_order = if header[0] == 0x49 && header[1] == 0x49 {
        ByteOrder::LittleEndian
    } else if header[0] == 0x4D && header[1] == 0x4D {
        ByteOrder::BigEndian
    } else {
        return Err(Error::InvalidData(format!(
            "Invalid byte_order {:?}",
            &header[0..2]
        )));
    };
    let magic_number = decode_u16([header[2], header[3]], byte_order);
    if magic_number != 42 {
        return Err(Error::InvalidData(format!(
            "Invalid magic_number {:?}",
            magic_number
        )));
    }

    let mut ifds = vec![];
    let mut ifd_offset: u64 = decode_u32([header[4], header[5], header[6], header[7]], byte_order).into();
    while ifd_offset > 0 {
        // Guards against an offset cycle making this loop endless
        if ifds.len() > 1024 {
            return Err(Error::InvalidData(
                "More than 1024 IFDs, assuming an IFD offset cycle".to_string(),
            ));
        }
        let fields_count = {
            let mut buf = [0u8; 2];
            source.read_exact(ifd_offset, &mut buf).await?;
            decode_u16(buf, byte_order)
        };
        let mut raw_entries: Vec<IFDEntryMetadata> = vec![];
        for i in 0..fields_count as u64 {
            let mut buf = [0u8; 12];
            source.read_exact(ifd_offset + 2 + i * 12, &mut buf).await?;
            match IFDEntryMetadata::decode(buf, byte_order) {
                RawEntryResult::KnownType(e) => raw_entries.push(e),
                // Unknown field types and empty entries are not fatal, the
                // tags we need are checked for later
                RawEntryResult::UnknownType(_) | RawEntryResult::InvalidCount(_) => {}
            }
        }
        let next_offset = {
            let mut buf = [0u8; 4];
            source
                .read_exact(ifd_offset + 2 + fields_count as u64 * 12, &mut buf)
                .await?;
            decode_u32(buf, byte_order)
        };
        let mut entries: Vec<IFDEntry> = vec![];
        for e in raw_entries.iter() {
            entries.push(e.full_read(source, byte_order).await?);
        }
        ifds.push(ImageFileDirectory { entries });
        ifd_offset = next_offset.into();
    }
    Ok((byte_order, ifds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_scalars_both_orders() {
        assert_eq!(decode_u16([0x2a, 0x00], ByteOrder::LittleEndian), 42);
        assert_eq!(decode_u16([0x00, 0x2a], ByteOrder::BigEndian), 42);
        assert_eq!(
            decode_u32([0x01, 0x00, 0x00, 0x00], ByteOrder::LittleEndian),
            1
        );
        assert_eq!(decode_u32([0x00, 0x00, 0x00, 0x01], ByteOrder::BigEndian), 1);
        assert_eq!(
            decode_f64(1.5f64.to_le_bytes(), ByteOrder::LittleEndian),
            1.5
        );
        assert_eq!(decode_f64(1.5f64.to_be_bytes(), ByteOrder::BigEndian), 1.5);
        assert_eq!(decode_i16((-3i16).to_be_bytes(), ByteOrder::BigEndian), -3);
    }

    #[test]
    fn test_decode_string() {
        assert_eq!(
            decode_string(b"EPSG\0", ByteOrder::LittleEndian).unwrap(),
            "EPSG"
        );
        assert!(decode_string(b"EPSG", ByteOrder::LittleEndian).is_err());
    }

    #[tokio::test]
    async fn test_read_ifds_rejects_bad_magic() {
        let source_data = vec![0x49, 0x49, 41, 0, 8, 0, 0, 0];
        let mut source = Source::from_vec(source_data);
        assert!(matches!(
            read_ifds(&mut source).await,
            Err(Error::InvalidData(_))
        ));
    }
}
