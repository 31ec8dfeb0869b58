use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

use super::data_types::{bits_per_sample, sample_format};
use super::georef::Georeference;
use super::tags::{encode_tag, IFDTag};
use crate::image::RasterInfo;
use crate::Error;

// TIFF field type codes used by the writer
const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;
const TYPE_DOUBLE: u16 = 12;

const HEADER_NBYTES: u64 = 8;

/// Writes a baseline little-endian GeoTIFF: uncompressed, band-sequential
/// (one plane and one strip per band), IFD appended after the sample data.
///
/// Bands must be written in order, each as a full row-major buffer. The file
/// is assembled at `<path>.partial` and only renamed to `path` by
/// `finish()`, so a crashed or aborted write never leaves something that
/// could pass for a complete raster.
pub struct TiffWriter {
    file: File,
    final_path: PathBuf,
    tmp_path: PathBuf,
    info: RasterInfo,
    georeference: Option<Georeference>,
    strip_offsets: Vec<u64>,
    cursor: u64,
    bands_written: usize,
}

fn partial_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".partial");
    PathBuf::from(os)
}

impl TiffWriter {
    pub async fn create(
        path: &Path,
        info: &RasterInfo,
        georeference: Option<&Georeference>,
    ) -> Result<TiffWriter, Error> {
        if info.width == 0 || info.height == 0 || info.nbands == 0 {
            return Err(Error::InvalidData(format!(
                "Cannot create an empty raster: width={}, height={}, nbands={}",
                info.width, info.height, info.nbands
            )));
        }
        let tmp_path = partial_path(path);
        let mut file = File::create(&tmp_path).await?;
        // Header written last, once the IFD offset is known
        file.write_all(&[0u8; HEADER_NBYTES as usize]).await?;
        Ok(TiffWriter {
            file,
            final_path: path.to_path_buf(),
            tmp_path,
            info: info.clone(),
            georeference: georeference.copied(),
            strip_offsets: vec![],
            cursor: HEADER_NBYTES,
            bands_written: 0,
        })
    }

    pub fn info(&self) -> &RasterInfo {
        &self.info
    }

    /// Appends one band's samples (little-endian, row-major). `index` is
    /// only taken to catch out-of-order writes early.
    pub async fn write_band(&mut self, index: usize, data: &[u8]) -> Result<(), Error> {
        if index != self.bands_written {
            return Err(Error::InvalidData(format!(
                "Bands must be written in order: got band {}, expected {}",
                index, self.bands_written
            )));
        }
        if index >= self.info.nbands {
            return Err(Error::InvalidData(format!(
                "Band index {} out of range, raster has {} bands",
                index, self.info.nbands
            )));
        }
        let expected = self.info.band_nbytes();
        if data.len() != expected {
            return Err(Error::InvalidData(format!(
                "Band {} has {} bytes, expected {}",
                index,
                data.len(),
                expected
            )));
        }
        self.file.write_all(data).await?;
        self.strip_offsets.push(self.cursor);
        self.cursor += data.len() as u64;
        self.bands_written += 1;
        Ok(())
    }

    /// Writes the IFD and header, then moves the file to its final path
    pub async fn finish(mut self) -> Result<(), Error> {
        let res = self.write_ifd_and_rename().await;
        if res.is_err() {
            // Never leave a partial file behind on a failed finish
            let _ = tokio::fs::remove_file(&self.tmp_path).await;
        }
        res
    }

    /// Drops the partially written output
    pub async fn abort(self) -> Result<(), Error> {
        tokio::fs::remove_file(&self.tmp_path).await?;
        Ok(())
    }

    async fn write_ifd_and_rename(&mut self) -> Result<(), Error> {
        if self.bands_written != self.info.nbands {
            return Err(Error::InvalidData(format!(
                "Only {} of {} bands were written",
                self.bands_written, self.info.nbands
            )));
        }
        let ifd_offset = self.cursor;
        if ifd_offset > u32::MAX as u64 {
            return Err(Error::InvalidData(format!(
                "Raster too large for a classic TIFF: IFD offset {} exceeds 4GB",
                ifd_offset
            )));
        }
        let ifd = build_ifd(
            ifd_offset,
            &self.info,
            &self.strip_offsets,
            self.georeference.as_ref(),
        )?;
        self.file.write_all(&ifd).await?;

        let mut header = [0u8; HEADER_NBYTES as usize];
        header[0] = 0x49;
        header[1] = 0x49;
        header[2..4].copy_from_slice(&42u16.to_le_bytes());
        header[4..8].copy_from_slice(&(ifd_offset as u32).to_le_bytes());
        self.file.seek(std::io::SeekFrom::Start(0)).await?;
        self.file.write_all(&header).await?;
        self.file.flush().await?;
        self.file.sync_all().await?;

        tokio::fs::rename(&self.tmp_path, &self.final_path).await?;
        Ok(())
    }
}

struct EntryData {
    tag: u16,
    field_type: u16,
    count: u32,
    // Little-endian encoded values, inlined or moved to the aux area on
    // assembly depending on size
    payload: Vec<u8>,
}

fn entry_shorts(tag: IFDTag, values: &[u16]) -> EntryData {
    let mut payload = Vec::with_capacity(values.len() * 2);
    for v in values {
        payload.extend_from_slice(&v.to_le_bytes());
    }
    EntryData {
        tag: encode_tag(tag),
        field_type: TYPE_SHORT,
        count: values.len() as u32,
        payload,
    }
}

fn entry_longs(tag: IFDTag, values: &[u32]) -> EntryData {
    let mut payload = Vec::with_capacity(values.len() * 4);
    for v in values {
        payload.extend_from_slice(&v.to_le_bytes());
    }
    EntryData {
        tag: encode_tag(tag),
        field_type: TYPE_LONG,
        count: values.len() as u32,
        payload,
    }
}

fn entry_doubles(tag: IFDTag, values: &[f64]) -> EntryData {
    let mut payload = Vec::with_capacity(values.len() * 8);
    for v in values {
        payload.extend_from_slice(&v.to_le_bytes());
    }
    EntryData {
        tag: encode_tag(tag),
        field_type: TYPE_DOUBLE,
        count: values.len() as u32,
        payload,
    }
}

fn build_ifd(
    ifd_offset: u64,
    info: &RasterInfo,
    strip_offsets: &[u64],
    georeference: Option<&Georeference>,
) -> Result<Vec<u8>, Error> {
    let nbands = info.nbands;
    let band_nbytes = info.band_nbytes() as u32;

    let strip_offsets_u32: Vec<u32> = strip_offsets.iter().map(|v| *v as u32).collect();
    let strip_byte_counts: Vec<u32> = vec![band_nbytes; nbands];

    // RGB photometric for the common 3-band 8-bit case, min-is-black otherwise
    let photometric: u16 = if nbands == 3 && info.data_type.size_bytes() == 1 {
        2
    } else {
        1
    };
    let planar: u16 = if nbands == 1 { 1 } else { 2 };

    // Entries must be sorted by ascending tag code
    let mut entries = vec![
        entry_longs(IFDTag::ImageWidth, &[info.width as u32]),
        entry_longs(IFDTag::ImageLength, &[info.height as u32]),
        entry_shorts(
            IFDTag::BitsPerSample,
            &vec![bits_per_sample(info.data_type); nbands],
        ),
        entry_shorts(IFDTag::Compression, &[1]),
        entry_shorts(IFDTag::PhotometricInterpretation, &[photometric]),
        entry_longs(IFDTag::StripOffsets, &strip_offsets_u32),
        entry_shorts(IFDTag::SamplesPerPixel, &[nbands as u16]),
        entry_longs(IFDTag::RowsPerStrip, &[info.height as u32]),
        entry_longs(IFDTag::StripByteCounts, &strip_byte_counts),
        entry_shorts(IFDTag::PlanarConfiguration, &[planar]),
        entry_shorts(
            IFDTag::SampleFormat,
            &vec![sample_format(info.data_type); nbands],
        ),
    ];
    if let Some(georef) = georeference {
        entries.push(entry_doubles(
            IFDTag::ModelTransformationTag,
            &georef.model_transformation(),
        ));
        entries.push(entry_shorts(
            IFDTag::GeoKeyDirectoryTag,
            &georef.geo_key_directory(),
        ));
    }

    // Values larger than 4 bytes go to an aux area right after the entries
    let entries_nbytes = 2 + entries.len() as u64 * 12 + 4;
    let mut aux: Vec<u8> = vec![];
    let mut out: Vec<u8> = vec![];
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for entry in &entries {
        out.extend_from_slice(&entry.tag.to_le_bytes());
        out.extend_from_slice(&entry.field_type.to_le_bytes());
        out.extend_from_slice(&entry.count.to_le_bytes());
        if entry.payload.len() <= 4 {
            let mut inline = [0u8; 4];
            inline[..entry.payload.len()].copy_from_slice(&entry.payload);
            out.extend_from_slice(&inline);
        } else {
            let value_offset = ifd_offset + entries_nbytes + aux.len() as u64;
            if value_offset + entry.payload.len() as u64 > u32::MAX as u64 {
                return Err(Error::InvalidData(
                    "Raster too large for a classic TIFF: tag data exceeds 4GB offset".to_string(),
                ));
            }
            out.extend_from_slice(&(value_offset as u32).to_le_bytes());
            aux.extend_from_slice(&entry.payload);
        }
    }
    // No next IFD
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&aux);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affine::AffineTransform;
    use crate::epsg::Crs;
    use crate::image::DataType;
    use crate::tiff::reader::TiffReader;

    fn test_info(nbands: usize, data_type: DataType) -> RasterInfo {
        RasterInfo {
            width: 4,
            height: 3,
            nbands,
            data_type,
        }
    }

    fn test_georef() -> Georeference {
        Georeference {
            transform: AffineTransform {
                a: 0.001,
                b: 0.0,
                c: 10.0,
                d: 0.0,
                e: -0.001,
                f: 50.0,
            },
            crs: Crs::Wgs84,
        }
    }

    #[tokio::test]
    async fn test_write_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        for data_type in [
            DataType::Uint8,
            DataType::Uint16,
            DataType::Int32,
            DataType::Float64,
        ] {
            let path = dir.path().join(format!("out_{:?}.tif", data_type));
            let info = test_info(2, data_type);
            let bands: Vec<Vec<u8>> = (0..info.nbands)
                .map(|b| {
                    (0..info.band_nbytes())
                        .map(|i| (b * 101 + i) as u8)
                        .collect()
                })
                .collect();

            let georef = test_georef();
            let mut writer = TiffWriter::create(&path, &info, Some(&georef)).await.unwrap();
            for (b, data) in bands.iter().enumerate() {
                writer.write_band(b, data).await.unwrap();
            }
            writer.finish().await.unwrap();

            let mut reader = TiffReader::open(&path).await.unwrap();
            assert_eq!(reader.info(), &info);
            assert_eq!(reader.georeference(), Some(&georef));
            for (b, data) in bands.iter().enumerate() {
                assert_eq!(&reader.read_band(b).await.unwrap(), data);
            }
        }
    }

    #[tokio::test]
    async fn test_write_without_georeference() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.tif");
        let info = test_info(1, DataType::Uint8);
        let mut writer = TiffWriter::create(&path, &info, None).await.unwrap();
        writer
            .write_band(0, &vec![7u8; info.band_nbytes()])
            .await
            .unwrap();
        writer.finish().await.unwrap();

        let reader = TiffReader::open(&path).await.unwrap();
        assert!(reader.georeference().is_none());
    }

    #[tokio::test]
    async fn test_write_band_length_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.tif");
        let info = test_info(1, DataType::Uint8);
        let mut writer = TiffWriter::create(&path, &info, None).await.unwrap();
        let res = writer.write_band(0, &[0u8; 5]).await;
        assert!(matches!(res, Err(Error::InvalidData(_))));
        writer.abort().await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_finish_with_missing_band_fails_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.tif");
        let info = test_info(2, DataType::Uint8);
        let mut writer = TiffWriter::create(&path, &info, None).await.unwrap();
        writer
            .write_band(0, &vec![0u8; info.band_nbytes()])
            .await
            .unwrap();
        assert!(writer.finish().await.is_err());
        assert!(!path.exists());
        assert!(!partial_path(&path).exists());
    }

    #[tokio::test]
    async fn test_abort_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aborted.tif");
        let info = test_info(1, DataType::Uint8);
        let writer = TiffWriter::create(&path, &info, None).await.unwrap();
        writer.abort().await.unwrap();
        assert!(!path.exists());
        assert!(!partial_path(&path).exists());
    }
}
