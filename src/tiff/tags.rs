/// The subset of TIFF/GeoTIFF tags the reader and writer care about
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IFDTag {
    ImageWidth,
    ImageLength,
    BitsPerSample,
    Compression,
    PhotometricInterpretation,
    StripOffsets,
    Orientation,
    SamplesPerPixel,
    RowsPerStrip,
    StripByteCounts,
    PlanarConfiguration,
    SampleFormat,
    TileOffsets,
    ModelPixelScaleTag,
    ModelTiepointTag,
    ModelTransformationTag,
    GeoKeyDirectoryTag,
    GeoDoubleParamsTag,
    GeoAsciiParamsTag,
    UnknownTag(u16),
}

pub fn decode_tag(tag: u16) -> IFDTag {
    match tag {
        256 => IFDTag::ImageWidth,
        257 => IFDTag::ImageLength,
        258 => IFDTag::BitsPerSample,
        259 => IFDTag::Compression,
        262 => IFDTag::PhotometricInterpretation,
        273 => IFDTag::StripOffsets,
        274 => IFDTag::Orientation,
        277 => IFDTag::SamplesPerPixel,
        278 => IFDTag::RowsPerStrip,
        279 => IFDTag::StripByteCounts,
        284 => IFDTag::PlanarConfiguration,
        322 => IFDTag::TileOffsets,
        339 => IFDTag::SampleFormat,
        33550 => IFDTag::ModelPixelScaleTag,
        33922 => IFDTag::ModelTiepointTag,
        34264 => IFDTag::ModelTransformationTag,
        34735 => IFDTag::GeoKeyDirectoryTag,
        34736 => IFDTag::GeoDoubleParamsTag,
        34737 => IFDTag::GeoAsciiParamsTag,
        v => IFDTag::UnknownTag(v),
    }
}

pub fn encode_tag(tag: IFDTag) -> u16 {
    match tag {
        IFDTag::ImageWidth => 256,
        IFDTag::ImageLength => 257,
        IFDTag::BitsPerSample => 258,
        IFDTag::Compression => 259,
        IFDTag::PhotometricInterpretation => 262,
        IFDTag::StripOffsets => 273,
        IFDTag::Orientation => 274,
        IFDTag::SamplesPerPixel => 277,
        IFDTag::RowsPerStrip => 278,
        IFDTag::StripByteCounts => 279,
        IFDTag::PlanarConfiguration => 284,
        IFDTag::TileOffsets => 322,
        IFDTag::SampleFormat => 339,
        IFDTag::ModelPixelScaleTag => 33550,
        IFDTag::ModelTiepointTag => 33922,
        IFDTag::ModelTransformationTag => 34264,
        IFDTag::GeoKeyDirectoryTag => 34735,
        IFDTag::GeoDoubleParamsTag => 34736,
        IFDTag::GeoAsciiParamsTag => 34737,
        IFDTag::UnknownTag(v) => v,
    }
}
