use std::fmt;
use std::io;
use std::io::ErrorKind;
use std::path::Path;

mod file;
mod memory;

pub use file::FileSource;
pub use memory::MemorySource;

use crate::errors::Error;

enum SourceKind {
    File(FileSource),
    Memory(MemorySource),
}

impl fmt::Debug for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(_) => f.debug_tuple("File").finish(),
            Self::Memory(_) => f.debug_tuple("Memory").finish(),
        }
    }
}

/// A readable raster payload: either a file on disk or an in-memory buffer
/// (the latter mostly for tests, like an upload that was never persisted).
/// Reads are positioned, so the TIFF reader can hop between the IFD and the
/// strip data without tracking a cursor.
#[derive(Debug)]
pub struct Source {
    kind: SourceKind,
}

impl Source {
    pub async fn open(path: &Path) -> Result<Source, Error> {
        Ok(Source {
            kind: SourceKind::File(FileSource::new(path).await?),
        })
    }

    pub fn from_vec(buffer: Vec<u8>) -> Source {
        Source {
            kind: SourceKind::Memory(MemorySource::new(buffer)),
        }
    }

    /// Tries to read the given buffer at the given offset. If EOF is reached
    /// this returns Ok(n) with n < buf.len()
    pub async fn read(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, Error> {
        match &mut self.kind {
            SourceKind::File(s) => s.read(offset, buf).await,
            SourceKind::Memory(s) => Ok(s.read(offset, buf).await?),
        }
    }

    /// Reads exactly the given buffer from the given offset, failing with an
    /// `UnexpectedEof` IO error if the source ends first
    pub async fn read_exact(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), Error> {
        let bytes_count = self.read(offset, buf).await?;
        if bytes_count < buf.len() {
            Err(Error::IO(io::Error::from(ErrorKind::UnexpectedEof)))
        } else {
            Ok(())
        }
    }
}
