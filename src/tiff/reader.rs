use std::path::Path;

use super::data_types::{check_all_same, data_type_from_format};
use super::georef::Georeference;
use super::ifd::{read_ifds, ByteOrder, IFDValue, ImageFileDirectory};
use super::tags::IFDTag;
use crate::image::RasterInfo;
use crate::sources::Source;
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
enum PlanarConfiguration {
    // All bands of a pixel packed together ("chunky")
    Contiguous,
    // One plane of samples per band
    Separate,
}

/// Reads a baseline strip-organized, uncompressed (Geo)TIFF band by band.
///
/// Tiled layouts, compression and multi-image files are rejected at open
/// time; arbitrary band counts and the full `DataType` range are supported.
#[derive(Debug)]
pub struct TiffReader {
    source: Source,
    byte_order: ByteOrder,
    info: RasterInfo,
    planar: PlanarConfiguration,
    rows_per_strip: u64,
    strip_offsets: Vec<u64>,
    strip_byte_counts: Vec<u64>,
    georeference: Option<Georeference>,
}

impl TiffReader {
    pub async fn open(path: &Path) -> Result<TiffReader, Error> {
        let source = Source::open(path).await?;
        TiffReader::from_source(source).await
    }

    pub async fn from_source(mut source: Source) -> Result<TiffReader, Error> {
        let (byte_order, ifds) = read_ifds(&mut source).await?;
        let ifd = match ifds.into_iter().next() {
            Some(ifd) => ifd,
            None => {
                return Err(Error::InvalidData("TIFF file contains no IFD".to_string()));
            }
        };

        // Compression defaults to 1 (none), which is also the only value we
        // accept: this reader exists for lossless copies, not decoding
        match ifd.find_tag_value(IFDTag::Compression) {
            None => {}
            Some(IFDValue::Short(v)) => {
                if check_all_same(v)? != 1 {
                    return Err(Error::UnsupportedTagValue(
                        IFDTag::Compression,
                        format!("{:?}", v),
                    ));
                }
            }
            Some(value) => {
                return Err(Error::TagHasWrongType(IFDTag::Compression, value.clone()))
            }
        }

        // Orientation defaults to 1 (origin at top-left), anything else is
        // out of scope
        match ifd.find_tag_value(IFDTag::Orientation) {
            None => {}
            Some(IFDValue::Short(v)) => {
                if v[0] != 1 {
                    return Err(Error::UnsupportedTagValue(
                        IFDTag::Orientation,
                        format!("{:?}", v),
                    ));
                }
            }
            Some(value) => {
                return Err(Error::TagHasWrongType(IFDTag::Orientation, value.clone()))
            }
        }

        if ifd.find_tag_value(IFDTag::TileOffsets).is_some() {
            return Err(Error::UnsupportedTagValue(
                IFDTag::TileOffsets,
                "tiled rasters are not supported, expected strips".to_string(),
            ));
        }

        let planar = match ifd.find_tag_value(IFDTag::PlanarConfiguration) {
            None => PlanarConfiguration::Contiguous,
            Some(IFDValue::Short(v)) => match v[0] {
                1 => PlanarConfiguration::Contiguous,
                2 => PlanarConfiguration::Separate,
                _ => {
                    return Err(Error::UnsupportedTagValue(
                        IFDTag::PlanarConfiguration,
                        format!("{:?}", v),
                    ))
                }
            },
            Some(value) => {
                return Err(Error::TagHasWrongType(
                    IFDTag::PlanarConfiguration,
                    value.clone(),
                ))
            }
        };

        let nbands = match ifd.find_tag_value(IFDTag::SamplesPerPixel) {
            None => 1,
            Some(_) => ifd.get_usize_tag_value(IFDTag::SamplesPerPixel)?,
        };

        let bits_per_sample =
            check_all_same(&ifd.get_vec_short_tag_value(IFDTag::BitsPerSample)?)?;
        // SampleFormat defaults to 1 (unsigned integer)
        let sample_format = match ifd.find_tag_value(IFDTag::SampleFormat) {
            None => 1,
            Some(_) => check_all_same(&ifd.get_vec_short_tag_value(IFDTag::SampleFormat)?)?,
        };
        let data_type = data_type_from_format(sample_format, bits_per_sample)?;

        let info = RasterInfo {
            width: ifd.get_usize_tag_value(IFDTag::ImageWidth)? as u64,
            height: ifd.get_usize_tag_value(IFDTag::ImageLength)? as u64,
            nbands,
            data_type,
        };
        if info.width == 0 || info.height == 0 || info.nbands == 0 {
            return Err(Error::InvalidData(format!(
                "Empty raster: width={}, height={}, nbands={}",
                info.width, info.height, info.nbands
            )));
        }

        let strip_offsets: Vec<u64> = ifd
            .get_vec_usize_tag_value(IFDTag::StripOffsets)?
            .iter()
            .map(|v| *v as u64)
            .collect();
        let strip_byte_counts: Vec<u64> = ifd
            .get_vec_usize_tag_value(IFDTag::StripByteCounts)?
            .iter()
            .map(|v| *v as u64)
            .collect();
        if strip_offsets.len() != strip_byte_counts.len() {
            return Err(Error::InvalidData(format!(
                "StripOffsets count {} != StripByteCounts count {}",
                strip_offsets.len(),
                strip_byte_counts.len()
            )));
        }
        // RowsPerStrip defaults to "whole image in one strip"
        let rows_per_strip = match ifd.find_tag_value(IFDTag::RowsPerStrip) {
            None => info.height,
            Some(_) => ifd.get_usize_tag_value(IFDTag::RowsPerStrip)? as u64,
        };
        if rows_per_strip == 0 {
            return Err(Error::InvalidData("RowsPerStrip is 0".to_string()));
        }
        let strips_per_plane = info.height.div_ceil(rows_per_strip);
        let expected_strips = match planar {
            PlanarConfiguration::Contiguous => strips_per_plane,
            PlanarConfiguration::Separate => strips_per_plane * info.nbands as u64,
        };
        if strip_offsets.len() as u64 != expected_strips {
            return Err(Error::InvalidData(format!(
                "Expected {} strips, got {}",
                expected_strips,
                strip_offsets.len()
            )));
        }

        let georeference = Georeference::decode(&ifd)?;

        Ok(TiffReader {
            source,
            byte_order,
            info,
            planar,
            rows_per_strip,
            strip_offsets,
            strip_byte_counts,
            georeference,
        })
    }

    pub fn info(&self) -> &RasterInfo {
        &self.info
    }

    pub fn georeference(&self) -> Option<&Georeference> {
        self.georeference.as_ref()
    }

    /// Reads one full band as native-endian sample bytes, row-major.
    /// Memory use is one band plus, for interleaved files, one strip.
    pub async fn read_band(&mut self, band: usize) -> Result<Vec<u8>, Error> {
        if band >= self.info.nbands {
            return Err(Error::InvalidData(format!(
                "Band index {} out of range, raster has {} bands",
                band, self.info.nbands
            )));
        }
        let sample_size = self.info.data_type.size_bytes();
        let band_row_nbytes = self.info.width as usize * sample_size;
        let mut out = vec![0u8; self.info.band_nbytes()];

        let strips_per_plane = self.info.height.div_ceil(self.rows_per_strip);
        for strip_in_plane in 0..strips_per_plane {
            let first_row = strip_in_plane * self.rows_per_strip;
            let strip_rows = std::cmp::min(self.rows_per_strip, self.info.height - first_row);
            let (strip_index, strip_row_nbytes) = match self.planar {
                PlanarConfiguration::Separate => (
                    band as u64 * strips_per_plane + strip_in_plane,
                    band_row_nbytes,
                ),
                PlanarConfiguration::Contiguous => {
                    (strip_in_plane, band_row_nbytes * self.info.nbands)
                }
            };
            let expected_nbytes = strip_rows * strip_row_nbytes as u64;
            let actual_nbytes = self.strip_byte_counts[strip_index as usize];
            if actual_nbytes != expected_nbytes {
                return Err(Error::InvalidData(format!(
                    "Strip {} has {} bytes, expected {} (corrupt or compressed data ?)",
                    strip_index, actual_nbytes, expected_nbytes
                )));
            }
            let mut strip_data = vec![0u8; expected_nbytes as usize];
            self.source
                .read_exact(self.strip_offsets[strip_index as usize], &mut strip_data)
                .await?;

            let out_offset = first_row as usize * band_row_nbytes;
            match self.planar {
                PlanarConfiguration::Separate => {
                    out[out_offset..out_offset + strip_data.len()].copy_from_slice(&strip_data);
                }
                PlanarConfiguration::Contiguous => {
                    // De-interleave: pick this band's sample out of each pixel
                    let pixel_nbytes = sample_size * self.info.nbands;
                    let samples = strip_rows as usize * self.info.width as usize;
                    for i in 0..samples {
                        let src = i * pixel_nbytes + band * sample_size;
                        let dst = out_offset + i * sample_size;
                        out[dst..dst + sample_size]
                            .copy_from_slice(&strip_data[src..src + sample_size]);
                    }
                }
            }
        }

        // Sample bytes follow the file byte order; normalize to little endian
        // so the copy path never has to care about the source's endianness
        if sample_size > 1 {
            if let ByteOrder::BigEndian = self.byte_order {
                for sample in out.chunks_exact_mut(sample_size) {
                    sample.reverse();
                }
            }
        }
        Ok(out)
    }
}
