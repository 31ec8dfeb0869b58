use std::io;

pub struct MemorySource {
    buffer: Vec<u8>,
}

impl MemorySource {
    pub fn new(buffer: Vec<u8>) -> MemorySource {
        MemorySource { buffer }
    }

    pub async fn read(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, io::Error> {
        let offset = offset as usize;
        if offset >= self.buffer.len() {
            return Ok(0);
        }
        let end = std::cmp::min(self.buffer.len(), offset + buf.len());
        buf[..end - offset].copy_from_slice(&self.buffer[offset..end]);
        Ok(end - offset)
    }
}
