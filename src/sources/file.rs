use std::io::SeekFrom;
use std::path::Path;
use tokio::{fs::File, io::AsyncReadExt, io::AsyncSeekExt};

use crate::errors::Error;

pub struct FileSource {
    file: File,
}

impl FileSource {
    pub async fn new(path: &Path) -> Result<FileSource, Error> {
        let file = File::open(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(format!("{}: {}", path.display(), e))
            } else {
                Error::IO(e)
            }
        })?;
        Ok(FileSource { file })
    }

    pub async fn read(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, Error> {
        self.file.seek(SeekFrom::Start(offset)).await?;
        // Band buffers can be several MB, so a single read() call may come
        // back short without being at EOF
        let mut total = 0;
        while total < buf.len() {
            let n = self.file.read(&mut buf[total..]).await?;
            if n == 0 {
                break;
            }
            total += n;
        }
        Ok(total)
    }
}
