//! The storage directory.
//!
//! ```text
//! <dir>/
//!   version    one big-endian i32, the storage format version
//!   contents   content record file
//!   storage    len:u32 | serialized history, tree and id counter | crc32:u32
//!   vcs.lock   held while the directory is open
//! ```
//!
//! A directory written by a different format version is wiped and recreated;
//! there is no migration.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use crc::{Crc, CRC_32_ISCSI};

use crate::change::ChangeList;
use crate::config::VcsConfig;
use crate::content::{
    Blob, CachingContentStore, CompressingContentStore, Content, ContentStore, FileContentStore,
    SynchronizedContentStore,
};
use crate::encoding;
use crate::error::Result;
use crate::flock::FileLock;
use crate::tree::{EntryId, Snapshot, ROOT_ID};
use crate::Error;

pub const VERSION: i32 = 1;

const VERSION_FILE: &str = "version";
const CONTENTS_FILE: &str = "contents";
const STORAGE_FILE: &str = "storage";
const STORAGE_TEMP_FILE: &str = "storage.tmp";
const LOCK_FILE: &str = "vcs.lock";

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

/// Content store stack shared by every user of one storage directory.
pub type SharedContentStore = SynchronizedContentStore<Box<dyn ContentStore>>;

/// Everything persisted in the `storage` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memento {
    pub change_list: ChangeList,
    pub root: Snapshot,
    pub next_id: EntryId,
}

impl Default for Memento {
    fn default() -> Self {
        Self {
            change_list: ChangeList::new(),
            root: Snapshot::new(),
            next_id: ROOT_ID + 1,
        }
    }
}

pub struct Storage {
    dir: PathBuf,
    long_content_threshold: usize,
    content_store: SharedContentStore,
    _lock: FileLock,
}

impl Storage {
    pub fn open(config: &VcsConfig) -> Result<Self> {
        let dir = config.dir.clone();
        fs::create_dir_all(&dir)?;
        let lock = FileLock::lock(dir.join(LOCK_FILE)).map_err(Error::LockError)?;

        check_version(&dir)?;

        let mut store: Box<dyn ContentStore> =
            Box::new(FileContentStore::open(dir.join(CONTENTS_FILE))?);
        if config.compress_content {
            store = Box::new(CompressingContentStore::new(store));
        }
        if config.cache_capacity > 0 {
            store = Box::new(CachingContentStore::new(store, config.cache_capacity));
        }

        tracing::info!(
            dir = %dir.display(),
            compress = config.compress_content,
            cache_capacity = config.cache_capacity,
            "Opened storage"
        );

        Ok(Self {
            dir,
            long_content_threshold: config.long_content_threshold,
            content_store: SynchronizedContentStore::new(store),
            _lock: lock,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// A handle to the content store; clones share the same store.
    pub fn content_store(&self) -> SharedContentStore {
        self.content_store.clone()
    }

    /// Stores `bytes` and returns a handle to them. Content above the
    /// long-content threshold is not stored and yields `Content::Long`.
    pub fn store_content(&self, bytes: &[u8]) -> Result<Content> {
        if bytes.len() > self.long_content_threshold {
            tracing::debug!(
                len = bytes.len(),
                threshold = self.long_content_threshold,
                "Content too long to store"
            );
            return Ok(Content::Long);
        }

        let mut store = self.content_store.clone();
        let id = store.store(Blob::raw(bytes.to_vec()))?;
        Ok(Content::stored(id, bytes.len()))
    }

    pub fn load_content(&self, content: &Content) -> Result<Vec<u8>> {
        let mut store = self.content_store.clone();
        content.bytes(&mut store)
    }

    pub fn is_content_available(&self, content: &Content) -> bool {
        content.is_available(&self.content_store)
    }

    /// Removes the stored records behind `contents`. Sentinels and records
    /// that are already gone are skipped.
    pub fn purge_content(&self, contents: &[Content]) -> Result<usize> {
        let mut store = self.content_store.clone();
        let mut removed = 0;
        for id in contents.iter().filter_map(Content::id) {
            if store.has_content(id) {
                store.remove(id)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Reads the `storage` file, or an empty memento if there is none yet.
    pub fn load(&self) -> Result<Memento> {
        let path = self.dir.join(STORAGE_FILE);
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Memento::default()),
            Err(e) => return Err(e.into()),
        };

        let file_len = file.metadata()?.len();
        let len = file
            .read_u32::<BigEndian>()
            .map_err(|e| Error::Decode("storage length", e))? as u64;
        if len + 8 != file_len {
            return Err(Error::CorruptedStore(format!(
                "storage file is {} bytes, header says {}",
                file_len,
                len + 8
            )));
        }

        let mut body = vec![0u8; len as usize];
        file.read_exact(&mut body)
            .map_err(|e| Error::ReadError("storage body", e))?;
        let stored_checksum = file
            .read_u32::<BigEndian>()
            .map_err(|e| Error::Decode("storage checksum", e))?;

        if CRC32.checksum(&body) != stored_checksum {
            tracing::error!(path = %path.display(), "Storage checksum mismatch");
            return Err(Error::ChecksumMismatch);
        }

        let (change_list, root, next_id) = encoding::deserialize(&body)?;
        tracing::debug!(
            change_sets = change_list.len(),
            next_id,
            "Loaded storage"
        );
        Ok(Memento {
            change_list,
            root,
            next_id,
        })
    }

    /// Writes the `storage` file through a temp file and a rename, so a crash
    /// leaves either the old or the new state on disk.
    pub fn store(&self, memento: &Memento) -> Result<()> {
        let body = encoding::serialize(&memento.change_list, &memento.root, memento.next_id)?;
        let len = u32::try_from(body.len())
            .map_err(|_| Error::InvalidData(format!("storage of {} bytes is too large", body.len())))?;

        let temp_path = self.dir.join(STORAGE_TEMP_FILE);
        {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&temp_path)?;
            file.write_u32::<BigEndian>(len)
                .map_err(|e| Error::Encode("storage length", e))?;
            file.write_all(&body)
                .map_err(|e| Error::WriteError("storage body", e))?;
            file.write_u32::<BigEndian>(CRC32.checksum(&body))
                .map_err(|e| Error::Encode("storage checksum", e))?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, self.dir.join(STORAGE_FILE))?;

        tracing::debug!(
            bytes = body.len(),
            change_sets = memento.change_list.len(),
            "Stored storage"
        );
        Ok(())
    }

    /// Makes stored content durable.
    pub fn save(&self) -> Result<()> {
        self.content_store.clone().save()
    }

    pub fn close(self) -> Result<()> {
        let mut store = self.content_store;
        store.close()
    }
}

/// Makes sure `dir` holds the current format version, wiping it otherwise.
fn check_version(dir: &Path) -> Result<()> {
    let path = dir.join(VERSION_FILE);
    let found = match fs::read(&path) {
        Ok(bytes) => Some(bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(e.into()),
    };

    let version = found
        .as_deref()
        .and_then(|bytes| bytes.try_into().ok())
        .map(i32::from_be_bytes);
    if version == Some(VERSION) {
        return Ok(());
    }

    let has_data = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .any(|e| e.file_name() != LOCK_FILE);
    if has_data {
        tracing::warn!(
            dir = %dir.display(),
            found = ?version,
            expected = VERSION,
            "Storage version mismatch, recreating storage"
        );
        wipe(dir)?;
    }

    let mut file = File::create(&path)?;
    file.write_i32::<BigEndian>(VERSION)
        .map_err(|e| Error::Encode("version", e))?;
    file.sync_all()?;
    Ok(())
}

/// Removes everything in `dir` except the lock file.
fn wipe(dir: &Path) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name() == LOCK_FILE {
            continue;
        }
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}
