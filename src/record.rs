use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};

use crate::{Error, Result};

// pagemap, kpagecount and kpageflags all export one 64-bit word per index.
pub const RECORD_SIZE: u64 = 8;

/// Random access to a kernel export made of fixed-width little-endian words.
pub struct RecordFile<R> {
    name: String,
    inner: R,
}

impl RecordFile<File> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<RecordFile<File>> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Opened {}", path.display());
        Ok(RecordFile::new(path.display().to_string(), file))
    }
}

impl<R: Read + Seek> RecordFile<R> {
    pub fn new<S: Into<String>>(name: S, inner: R) -> RecordFile<R> {
        RecordFile {
            name: name.into(),
            inner,
        }
    }

    /// Reads the `index`-th record. A short read is an error, never zero-filled.
    pub fn read(&mut self, index: u64) -> Result<u64> {
        let mut buf = [0u8; RECORD_SIZE as usize];
        let offset = index.checked_mul(RECORD_SIZE).ok_or_else(|| {
            self.read_error(
                index,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "offset overflows u64"),
            )
        })?;
        self.inner
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.inner.read_exact(&mut buf))
            .map_err(|source| self.read_error(index, source))?;
        Ok(LittleEndian::read_u64(&buf))
    }

    fn read_error(&self, index: u64, source: std::io::Error) -> Error {
        Error::Read {
            resource: self.name.clone(),
            index,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn words(values: &[u64]) -> Cursor<Vec<u8>> {
        let mut bytes = vec![0u8; values.len() * RECORD_SIZE as usize];
        LittleEndian::write_u64_into(values, &mut bytes);
        Cursor::new(bytes)
    }

    #[test]
    fn reads_records_by_index() {
        let mut file = RecordFile::new("test", words(&[1, 0xdead_beef, u64::MAX]));
        assert_eq!(file.read(2).unwrap(), u64::MAX);
        assert_eq!(file.read(0).unwrap(), 1);
        assert_eq!(file.read(1).unwrap(), 0xdead_beef);
    }

    #[test]
    fn decodes_little_endian_regardless_of_host() {
        let bytes = vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x88];
        let mut file = RecordFile::new("test", Cursor::new(bytes));
        assert_eq!(file.read(0).unwrap(), 0x8807_0605_0403_0201);
    }

    #[test]
    fn read_past_end_fails() {
        let mut file = RecordFile::new("kpagecount", words(&[7]));
        match file.read(1) {
            Err(Error::Read { resource, index, .. }) => {
                assert_eq!(resource, "kpagecount");
                assert_eq!(index, 1);
            }
            other => panic!("expected read error, got {:?}", other),
        }
    }

    #[test]
    fn short_record_is_not_zero_filled() {
        let mut file = RecordFile::new("test", Cursor::new(vec![0xffu8; 12]));
        assert!(file.read(0).is_ok());
        assert!(file.read(1).is_err());
    }

    #[test]
    fn huge_index_fails_instead_of_wrapping() {
        let mut file = RecordFile::new("test", words(&[7]));
        assert!(file.read(u64::MAX).is_err());
    }

    #[test]
    fn missing_file_is_an_open_error() {
        match RecordFile::open("/proc/does-not-exist/pagemap") {
            Err(Error::Open { path, .. }) => {
                assert_eq!(path, Path::new("/proc/does-not-exist/pagemap"))
            }
            Err(other) => panic!("expected open error, got {:?}", other),
            Ok(_) => panic!("expected open error"),
        }
    }
}
