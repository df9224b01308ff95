//! Append-only content record file.
//!
//! # File Format
//!
//! ```text
//! +--------+-------------+---------+-----------+------------------+
//! | id:i32 | checksum:i32| flags:u8| length:i32| payload (length) |
//! +--------+-------------+---------+-----------+------------------+
//! | id:i32 | checksum:i32| flags:u8| length:i32| payload (length) |
//! +--------+-------------+---------+-----------+------------------+
//! | ...                                                           |
//! ```
//!
//! Records are only ever appended. Removal sets the `removed` flag by
//! rewriting the first nine header bytes in place; the payload stays on disk.
//! The id -> offset index is rebuilt by one sequential scan when the file is
//! opened.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::record::{RecordHeader, HEADER_SIZE};
use super::{Blob, ContentId, ContentStore};
use crate::error::Result;
use crate::hasher;
use crate::Error;

/// Record statistics gathered from the index and the file size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordStats {
    pub live: usize,
    pub removed: usize,
    pub file_len: u64,
}

#[derive(Debug)]
pub struct FileContentStore {
    file: File,
    path: PathBuf,
    index: HashMap<ContentId, u64>,
    removed: usize,
    /// `None` once a record with `ContentId::MAX` exists.
    next_id: Option<ContentId>,
    end: u64,
}

impl FileContentStore {
    /// Opens or creates the record file and rebuilds the index.
    ///
    /// Only a trailing fragment shorter than a record header is taken for an
    /// interrupted append and truncated away. Any record that fails its
    /// checksum or claims more bytes than the file holds aborts the open.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)?;

        let mut store = Self {
            file,
            path,
            index: HashMap::new(),
            removed: 0,
            next_id: Some(0),
            end: 0,
        };
        store.scan()?;

        tracing::info!(
            path = %store.path.display(),
            records = store.index.len(),
            removed = store.removed,
            next_id = ?store.next_id,
            file_len = store.end,
            "Opened content store"
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stats(&self) -> RecordStats {
        RecordStats {
            live: self.index.len(),
            removed: self.removed,
            file_len: self.end,
        }
    }

    fn scan(&mut self) -> Result<()> {
        let file_len = self.file.metadata()?.len();
        let mut reader = BufReader::new(self.file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;

        let mut offset = 0u64;
        loop {
            let header = match RecordHeader::read_from(&mut reader) {
                Ok(Some(header)) => header,
                Ok(None) => break,
                Err(Error::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    self.truncate_torn_tail(offset, file_len)?;
                    break;
                }
                Err(e) => {
                    tracing::error!(offset, error = %e, "Unreadable content record header");
                    return Err(e);
                }
            };

            if offset + header.record_len() > file_len {
                tracing::error!(
                    id = header.id,
                    offset,
                    length = header.length,
                    file_len,
                    "Content record runs past the end of the file"
                );
                return Err(Error::CorruptedStore(format!(
                    "record {} at offset {} claims {} bytes, file has {}",
                    header.id,
                    offset,
                    header.record_len(),
                    file_len - offset
                )));
            }

            let mut payload = vec![0u8; header.payload_len()];
            reader.read_exact(&mut payload)?;

            if hasher::checksum(&payload) != header.checksum {
                tracing::error!(id = header.id, offset, "Content record checksum mismatch");
                return Err(Error::CorruptedStore(format!(
                    "checksum mismatch in record {} at offset {}",
                    header.id, offset
                )));
            }

            if header.is_removed() {
                // a removed record also hides older records with the same id
                self.index.remove(&header.id);
                self.removed += 1;
            } else {
                self.index.insert(header.id, offset);
            }
            self.advance_next_id(header.id);
            offset += header.record_len();
        }

        self.end = offset;
        Ok(())
    }

    fn truncate_torn_tail(&mut self, offset: u64, file_len: u64) -> Result<()> {
        tracing::warn!(
            path = %self.path.display(),
            offset,
            dropped = file_len - offset,
            "Truncating incomplete trailing content record"
        );
        self.file.set_len(offset)?;
        self.file.sync_all()?;
        Ok(())
    }

    fn append(&mut self, id: ContentId, blob: &Blob) -> Result<()> {
        let header = RecordHeader::new(
            id,
            hasher::checksum(blob.data()),
            blob.is_compressed(),
            blob.len(),
        )?;

        let mut buf = Vec::with_capacity(HEADER_SIZE + blob.len());
        header.encode_into(&mut buf)?;
        buf.extend_from_slice(blob.data());

        let offset = self.end;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file
            .write_all(&buf)
            .map_err(|e| Error::WriteError("content record", e))?;

        self.end += buf.len() as u64;
        self.index.insert(id, offset);
        self.advance_next_id(id);
        Ok(())
    }

    fn advance_next_id(&mut self, seen: ContentId) {
        self.next_id = match (self.next_id, seen.checked_add(1)) {
            (Some(next), Some(after)) => Some(next.max(after)),
            _ => None,
        };
    }

    fn read_header_at(&mut self, offset: u64) -> Result<RecordHeader> {
        self.file.seek(SeekFrom::Start(offset))?;
        let mut buf = [0u8; HEADER_SIZE];
        self.file
            .read_exact(&mut buf)
            .map_err(|e| Error::ReadError("record header", e))?;
        RecordHeader::decode(&buf)
    }
}

impl ContentStore for FileContentStore {
    fn store(&mut self, blob: Blob) -> Result<ContentId> {
        let id = self
            .next_id
            .ok_or_else(|| Error::InvalidState("content ids exhausted".to_string()))?;
        self.append(id, &blob)?;
        Ok(id)
    }

    fn store_as(&mut self, id: ContentId, blob: Blob) -> Result<()> {
        self.append(id, &blob)
    }

    fn load(&mut self, id: ContentId) -> Result<Blob> {
        let offset = *self.index.get(&id).ok_or(Error::ContentNotFound(id))?;
        let header = self.read_header_at(offset)?;
        if header.id != id || header.is_removed() {
            return Err(Error::CorruptedRecord { id, offset });
        }

        let mut payload = vec![0u8; header.payload_len()];
        self.file
            .read_exact(&mut payload)
            .map_err(|e| Error::ReadError("record payload", e))?;

        if hasher::checksum(&payload) != header.checksum {
            tracing::error!(id, offset, "Content record checksum mismatch");
            return Err(Error::CorruptedRecord { id, offset });
        }

        Ok(if header.is_compressed() {
            Blob::compressed(payload)
        } else {
            Blob::raw(payload)
        })
    }

    fn remove(&mut self, id: ContentId) -> Result<()> {
        let offset = *self.index.get(&id).ok_or(Error::ContentNotFound(id))?;
        let mut header = self.read_header_at(offset)?;
        header.mark_removed();

        let mut buf = Vec::with_capacity(super::record::REWRITE_SIZE);
        header.encode_prefix_into(&mut buf)?;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file
            .write_all(&buf)
            .map_err(|e| Error::WriteError("record header", e))?;

        self.index.remove(&id);
        self.removed += 1;
        tracing::debug!(id, offset, "Removed content record");
        Ok(())
    }

    fn has_content(&self, id: ContentId) -> bool {
        self.index.contains_key(&id)
    }

    fn save(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::codec;
    use tempfile::tempdir;

    fn open_in(dir: &tempfile::TempDir) -> Result<FileContentStore> {
        FileContentStore::open(dir.path().join("contents"))
    }

    #[test]
    fn test_store_and_load() -> Result<()> {
        let dir = tempdir()?;
        let mut store = open_in(&dir)?;

        let blobs: Vec<Vec<u8>> = vec![
            Vec::new(),
            b"hello".to_vec(),
            vec![0xAB; 10_000],
        ];
        let mut ids = Vec::new();
        for blob in &blobs {
            ids.push(store.store(Blob::raw(blob.clone()))?);
        }

        assert_eq!(ids, vec![0, 1, 2]);
        for (id, blob) in ids.iter().zip(&blobs) {
            assert!(store.has_content(*id));
            assert_eq!(store.load(*id)?.into_bytes()?, *blob);
        }
        Ok(())
    }

    #[test]
    fn test_reopen_rebuilds_index() -> Result<()> {
        let dir = tempdir()?;
        {
            let mut store = open_in(&dir)?;
            store.store(Blob::raw(b"one".to_vec()))?;
            store.store(Blob::raw(b"two".to_vec()))?;
            store.close()?;
        }

        let mut store = open_in(&dir)?;
        assert_eq!(store.stats().live, 2);
        assert_eq!(store.load(1)?.into_bytes()?, b"two".to_vec());

        // fresh ids continue after the highest id on disk
        assert_eq!(store.store(Blob::raw(b"three".to_vec()))?, 2);
        Ok(())
    }

    #[test]
    fn test_store_as_caller_id() -> Result<()> {
        let dir = tempdir()?;
        let mut store = open_in(&dir)?;

        store.store_as(40, Blob::raw(b"first".to_vec()))?;
        store.store_as(40, Blob::raw(b"second".to_vec()))?;
        assert_eq!(store.load(40)?.into_bytes()?, b"second".to_vec());
        assert_eq!(store.store(Blob::raw(b"next".to_vec()))?, 41);

        drop(store);
        let mut store = open_in(&dir)?;
        assert_eq!(store.load(40)?.into_bytes()?, b"second".to_vec());

        // removing the latest record must not expose the superseded one
        store.remove(40)?;
        drop(store);
        let store = open_in(&dir)?;
        assert!(!store.has_content(40));
        Ok(())
    }

    #[test]
    fn test_flipped_payload_byte_is_detected() -> Result<()> {
        let dir = tempdir()?;
        let mut store = open_in(&dir)?;
        let keep = store.store(Blob::raw(b"untouched".to_vec()))?;
        let id = store.store(Blob::raw(b"some payload".to_vec()))?;
        store.save()?;

        // flip one byte inside the second record's payload
        let offset = (HEADER_SIZE + 9 + HEADER_SIZE + 3) as u64;
        let mut file = OpenOptions::new().read(true).write(true).open(store.path())?;
        file.seek(SeekFrom::Start(offset))?;
        let mut byte = [0u8; 1];
        file.read_exact(&mut byte)?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&[byte[0] ^ 0x01])?;
        file.sync_all()?;

        match store.load(id) {
            Err(Error::CorruptedRecord { id: bad, .. }) => assert_eq!(bad, id),
            other => panic!("expected corrupted record, got {:?}", other),
        }
        assert_eq!(store.load(keep)?.into_bytes()?, b"untouched".to_vec());

        // the startup scan refuses the whole file
        drop(store);
        let err = open_in(&dir).unwrap_err();
        assert!(err.is_corruption());
        Ok(())
    }

    #[test]
    fn test_remove_is_soft_and_survives_reopen() -> Result<()> {
        let dir = tempdir()?;
        let mut store = open_in(&dir)?;
        let a = store.store(Blob::raw(b"aaa".to_vec()))?;
        let b = store.store(Blob::raw(b"bbb".to_vec()))?;
        let len_before = store.stats().file_len;

        store.remove(a)?;
        assert!(!store.has_content(a));
        assert!(matches!(store.load(a), Err(Error::ContentNotFound(_))));
        assert!(matches!(store.remove(a), Err(Error::ContentNotFound(_))));
        assert_eq!(store.load(b)?.into_bytes()?, b"bbb".to_vec());
        assert_eq!(store.stats().file_len, len_before);
        store.close()?;

        let mut store = open_in(&dir)?;
        assert!(!store.has_content(a));
        assert!(store.has_content(b));
        assert_eq!(
            store.stats(),
            RecordStats {
                live: 1,
                removed: 1,
                file_len: len_before
            }
        );
        assert_eq!(store.load(b)?.into_bytes()?, b"bbb".to_vec());
        // removed ids are not handed out again
        assert_eq!(store.store(Blob::raw(b"ccc".to_vec()))?, 2);
        Ok(())
    }

    #[test]
    fn test_compressed_flag_round_trips() -> Result<()> {
        let dir = tempdir()?;
        let text = b"import java.util.*; public class A {} ".repeat(30);
        let compressed = codec::compress(&text)?.expect("should compress");

        let mut store = open_in(&dir)?;
        let id = store.store(Blob::compressed(compressed))?;
        drop(store);

        let mut store = open_in(&dir)?;
        let blob = store.load(id)?;
        assert!(blob.is_compressed());
        assert_eq!(blob.into_bytes()?, text);
        Ok(())
    }

    #[test]
    fn test_torn_tail_is_truncated() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("contents");
        {
            let mut store = FileContentStore::open(&path)?;
            store.store(Blob::raw(b"committed".to_vec()))?;
            store.close()?;
        }
        let committed_len = std::fs::metadata(&path)?.len();

        // half of a second record
        let mut file = OpenOptions::new().append(true).open(&path)?;
        file.write_all(&[0, 0, 0, 1, 0, 0])?;
        file.sync_all()?;

        let mut store = FileContentStore::open(&path)?;
        assert_eq!(std::fs::metadata(&path)?.len(), committed_len);
        assert_eq!(store.load(0)?.into_bytes()?, b"committed".to_vec());
        assert_eq!(store.store(Blob::raw(b"after".to_vec()))?, 1);
        Ok(())
    }

    #[test]
    fn test_damaged_length_field_fails_open() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("contents");
        {
            let mut store = FileContentStore::open(&path)?;
            for _ in 0..3 {
                store.store(Blob::raw(vec![7u8; 16]))?;
            }
            store.close()?;
        }
        let len_before = std::fs::metadata(&path)?.len();

        // high byte of the first record's length
        let mut file = OpenOptions::new().write(true).open(&path)?;
        file.seek(SeekFrom::Start(9))?;
        file.write_all(&[0x10])?;
        file.sync_all()?;
        drop(file);

        match FileContentStore::open(&path) {
            Err(Error::CorruptedStore(_)) => {}
            other => panic!("expected corrupted store, got {:?}", other),
        }
        assert_eq!(std::fs::metadata(&path)?.len(), len_before);
        Ok(())
    }

    #[test]
    fn test_ids_exhausted_after_max() -> Result<()> {
        let dir = tempdir()?;
        let mut store = open_in(&dir)?;
        store.store_as(ContentId::MAX, Blob::raw(b"caller".to_vec()))?;

        assert!(matches!(
            store.store(Blob::raw(b"fresh".to_vec())),
            Err(Error::InvalidState(_))
        ));
        assert_eq!(store.load(ContentId::MAX)?.into_bytes()?, b"caller".to_vec());

        // the limit is rediscovered by the startup scan
        drop(store);
        let mut store = open_in(&dir)?;
        assert!(matches!(
            store.store(Blob::raw(b"fresh".to_vec())),
            Err(Error::InvalidState(_))
        ));
        Ok(())
    }
}
