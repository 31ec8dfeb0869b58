use crate::tiff::ifd::IFDValue;
use crate::tiff::tags::IFDTag;
use std::io;

#[derive(Debug)]
pub enum Error {
    IO(io::Error),
    InvalidData(String),
    RequiredTagNotFound(IFDTag),
    TagHasWrongType(IFDTag, IFDValue),
    UnsupportedTagValue(IFDTag, String),
    UnsupportedDataType(String),
    InsufficientGcps { got: usize, required: usize },
    DegenerateGcps(String),
    NotFound(String),
    PixelOutOfBounds(String),
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Error::IO(value)
    }
}
