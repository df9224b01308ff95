use std::mem;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::change::{Change, ChangeList, ChangeSet};
use crate::config::VcsConfig;
use crate::content::Content;
use crate::error::Result;
use crate::storage::{Memento, Storage};
use crate::tree::{path, Entry, EntryId, Snapshot};
use crate::Error;

/// Source of change set timestamps, in milliseconds since the epoch.
pub trait Clock: Send {
    fn now(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

impl<F: Fn() -> i64 + Send> Clock for F {
    fn now(&self) -> i64 {
        self()
    }
}

/// Local history of a file tree.
///
/// Mutations are staged first and only touch the tree when [`apply`] commits
/// them as one change set. File content is written to the content store as
/// soon as it is staged.
///
/// [`apply`]: LocalVcs::apply
pub struct LocalVcs {
    config: VcsConfig,
    storage: Storage,
    state: Memento,
    pending: Vec<Change>,
    clock: Box<dyn Clock>,
}

impl LocalVcs {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with_config(VcsConfig::new(dir))
    }

    pub fn open_with_config(config: VcsConfig) -> Result<Self> {
        let storage = Storage::open(&config)?;
        let state = storage.load()?;

        tracing::info!(
            dir = %config.dir.display(),
            change_sets = state.change_list.len(),
            next_id = state.next_id,
            "Opened local history"
        );

        Ok(Self {
            config,
            storage,
            state,
            pending: Vec::new(),
            clock: Box::new(SystemClock),
        })
    }

    /// Replaces the clock used to timestamp change sets and drive purging.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &VcsConfig {
        &self.config
    }

    pub fn root(&self) -> &Snapshot {
        &self.state.root
    }

    pub fn has_entry(&self, path: &str) -> bool {
        self.state.root.has_entry(path)
    }

    pub fn get_entry(&self, path: &str) -> Result<&Entry> {
        self.state.root.get_entry(path)
    }

    /// Bytes of a file entry from this history, current or past.
    pub fn load_content(&self, entry: &Entry) -> Result<Vec<u8>> {
        let content = entry
            .content()
            .ok_or_else(|| Error::NotAFile(entry.name().to_string()))?;
        self.storage.load_content(&content)
    }

    pub fn change_list(&self) -> &ChangeList {
        &self.state.change_list
    }

    pub fn pending_changes(&self) -> &[Change] {
        &self.pending
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    fn next_id(&mut self) -> Result<EntryId> {
        let id = self.state.next_id;
        self.state.next_id = id
            .checked_add(1)
            .ok_or_else(|| Error::InvalidState("entry ids exhausted".to_string()))?;
        Ok(id)
    }

    pub fn create_file(&mut self, path: &str, bytes: &[u8], timestamp: i64) -> Result<()> {
        let content = self.storage.store_content(bytes)?;
        let id = self.next_id()?;
        self.pending
            .push(Change::create_file(id, path, content, timestamp));
        Ok(())
    }

    pub fn create_directory(&mut self, path: &str) -> Result<()> {
        let id = self.next_id()?;
        self.pending.push(Change::create_directory(id, path));
        Ok(())
    }

    pub fn change_file_content(&mut self, path: &str, bytes: &[u8], timestamp: i64) -> Result<()> {
        let content = self.storage.store_content(bytes)?;
        self.pending
            .push(Change::change_file_content(path, content, timestamp));
        Ok(())
    }

    pub fn rename(&mut self, path: &str, new_name: &str) -> Result<()> {
        path::validate_name(new_name)?;
        self.pending.push(Change::rename(path, new_name));
        Ok(())
    }

    pub fn move_entry(&mut self, path: &str, new_parent: &str) -> Result<()> {
        self.pending.push(Change::move_entry(path, new_parent));
        Ok(())
    }

    pub fn delete(&mut self, path: &str) -> Result<()> {
        self.pending.push(Change::delete(path));
        Ok(())
    }

    /// Commits the pending changes as one change set.
    ///
    /// Returns `Ok(false)` when nothing was pending. If any change fails, the
    /// tree is left untouched, every pending change is dropped and the content
    /// they stored is purged.
    pub fn apply(&mut self) -> Result<bool> {
        if self.pending.is_empty() {
            return Ok(false);
        }

        let mut set = ChangeSet::new(self.clock.now(), mem::take(&mut self.pending));
        match set.apply_to(&self.state.root) {
            Ok(root) => {
                self.state.root = root;
                self.state.change_list.add(set);
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(error = %e, changes = set.changes().len(), "Discarding change set");
                self.purge_quietly(&set.new_contents());
                Err(e)
            }
        }
    }

    /// Drops pending changes, then reverts the newest change set.
    pub fn revert(&mut self) -> Result<()> {
        self.discard_pending();

        let introduced = match self.state.change_list.change_sets().last() {
            Some(set) => set.new_contents(),
            None => return Err(Error::EmptyChangeList),
        };
        self.state.root = self.state.change_list.revert_last_on(&self.state.root)?;
        self.purge_quietly(&introduced);

        tracing::debug!(
            change_sets = self.state.change_list.len(),
            "Reverted change set"
        );
        Ok(())
    }

    /// Drops the pending changes and the content they stored.
    pub fn discard_pending(&mut self) {
        let pending = mem::take(&mut self.pending);
        let contents: Vec<Content> = pending.iter().filter_map(Change::new_content).collect();
        self.purge_quietly(&contents);
    }

    /// Labels the newest change set.
    pub fn put_label(&mut self, label: &str) -> Result<()> {
        self.state.change_list.last_mut()?.set_label(label);
        Ok(())
    }

    /// States the entry at `path` went through, newest first.
    pub fn get_entry_history(&self, path: &str) -> Result<Vec<Entry>> {
        let id = self.state.root.get_entry(path)?.id();
        self.state.change_list.entry_history(&self.state.root, id)
    }

    pub fn snapshot_at_label(&self, label: &str) -> Result<Snapshot> {
        self.state
            .change_list
            .snapshot_at_label(&self.state.root, label)
    }

    /// Forgets change sets older than the purge period and removes the
    /// content only they referenced. Returns the number of change sets dropped.
    pub fn purge_obsolete(&mut self) -> Result<usize> {
        let period = i64::try_from(self.config.purge_period.as_millis()).unwrap_or(i64::MAX);
        let cutoff = self.clock.now().saturating_sub(period);

        let before = self.state.change_list.len();
        let contents = self.state.change_list.purge_older_than(cutoff);
        let purged = before - self.state.change_list.len();
        let removed = self.storage.purge_content(&contents)?;

        tracing::info!(cutoff, change_sets = purged, contents = removed, "Purged history");
        Ok(purged)
    }

    /// Flushes content, then the tree, history and id counter.
    pub fn save(&mut self) -> Result<()> {
        self.storage.save()?;
        self.storage.store(&self.state)?;
        tracing::debug!(change_sets = self.state.change_list.len(), "Saved local history");
        Ok(())
    }

    /// Discards pending changes, saves and releases the storage directory.
    pub fn close(mut self) -> Result<()> {
        self.discard_pending();
        self.save()?;
        self.storage.close()
    }

    fn purge_quietly(&self, contents: &[Content]) {
        if let Err(e) = self.storage.purge_content(contents) {
            tracing::warn!(error = %e, "Failed to purge content");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;

    fn fixed_clock(now: i64) -> impl Clock {
        move || now
    }

    fn contents(vcs: &LocalVcs, entries: &[Entry]) -> Result<Vec<Vec<u8>>> {
        entries.iter().map(|e| vcs.load_content(e)).collect()
    }

    #[test]
    fn test_history_of_edited_file() -> Result<()> {
        let dir = tempdir()?;
        let mut vcs = LocalVcs::open(dir.path())?.with_clock(fixed_clock(1_000));

        vcs.create_directory("src")?;
        vcs.create_file("src/A.txt", b"hello", 1)?;
        assert!(!vcs.has_entry("src"));
        assert!(vcs.apply()?);
        vcs.put_label("init")?;

        vcs.change_file_content("src/A.txt", b"world", 2)?;
        assert!(vcs.apply()?);

        let history = vcs.get_entry_history("src/A.txt")?;
        assert_eq!(
            contents(&vcs, &history)?,
            vec![b"world".to_vec(), b"hello".to_vec()]
        );

        let at_init = vcs.snapshot_at_label("init")?;
        let entry = at_init.get_entry("src/A.txt")?;
        assert_eq!(vcs.load_content(entry)?, b"hello".to_vec());
        Ok(())
    }

    #[test]
    fn test_apply_without_changes() -> Result<()> {
        let dir = tempdir()?;
        let mut vcs = LocalVcs::open(dir.path())?;
        assert!(!vcs.apply()?);
        assert!(vcs.change_list().is_empty());
        Ok(())
    }

    #[test]
    fn test_failed_apply_changes_nothing() -> Result<()> {
        let dir = tempdir()?;
        let mut vcs = LocalVcs::open(dir.path())?;
        vcs.create_file("a", b"first", 0)?;
        vcs.apply()?;
        let before = vcs.root().clone();

        vcs.create_file("b", b"second", 0)?;
        vcs.create_file("a", b"clash", 0)?;
        let staged: Vec<Content> = vcs
            .pending_changes()
            .iter()
            .filter_map(Change::new_content)
            .collect();

        assert!(matches!(vcs.apply(), Err(Error::EntryExists(_))));
        assert_eq!(vcs.root(), &before);
        assert!(vcs.pending_changes().is_empty());
        assert_eq!(vcs.change_list().len(), 1);
        for content in staged {
            assert!(!vcs.storage().is_content_available(&content));
        }
        Ok(())
    }

    #[test]
    fn test_revert() -> Result<()> {
        let dir = tempdir()?;
        let mut vcs = LocalVcs::open(dir.path())?;
        assert!(matches!(vcs.revert(), Err(Error::EmptyChangeList)));

        vcs.create_directory("dir")?;
        vcs.create_file("dir/f", b"data", 0)?;
        vcs.apply()?;
        let created = vcs.root().clone();

        vcs.delete("dir")?;
        vcs.apply()?;
        assert!(!vcs.has_entry("dir"));

        // pending changes are dropped too
        vcs.create_file("other", b"x", 0)?;
        vcs.revert()?;
        assert!(vcs.pending_changes().is_empty());
        assert_eq!(vcs.root(), &created);
        let entry = vcs.get_entry("dir/f")?;
        assert_eq!(vcs.load_content(entry)?, b"data".to_vec());

        let content = entry.content().unwrap();
        vcs.revert()?;
        assert!(vcs.root().root().children().is_empty());
        assert!(!vcs.storage().is_content_available(&content));
        Ok(())
    }

    #[test]
    fn test_rename_and_move() -> Result<()> {
        let dir = tempdir()?;
        let mut vcs = LocalVcs::open(dir.path())?;
        vcs.create_directory("a")?;
        vcs.create_directory("b")?;
        vcs.create_file("a/f.txt", b"1", 0)?;
        vcs.apply()?;
        let id = vcs.get_entry("a/f.txt")?.id();

        vcs.rename("a/f.txt", "g.txt")?;
        vcs.move_entry("a/g.txt", "b")?;
        vcs.apply()?;
        assert_eq!(vcs.get_entry("b/g.txt")?.id(), id);

        let history = vcs.get_entry_history("b/g.txt")?;
        let names: Vec<_> = history.iter().map(|e| e.name().to_string()).collect();
        assert_eq!(names, vec!["g.txt", "f.txt"]);

        assert!(vcs.rename("b/g.txt", "x/y").is_err());
        Ok(())
    }

    #[test]
    fn test_reopen_restores_state() -> Result<()> {
        let dir = tempdir()?;
        let (root, change_list) = {
            let mut vcs = LocalVcs::open(dir.path())?;
            vcs.create_file("keep.txt", b"kept bytes", 5)?;
            vcs.apply()?;
            vcs.put_label("saved")?;
            vcs.create_file("pending.txt", b"not applied", 6)?;
            let state = (vcs.root().clone(), vcs.change_list().clone());
            vcs.close()?;
            state
        };

        let mut vcs = LocalVcs::open(dir.path())?;
        assert_eq!(vcs.root(), &root);
        assert_eq!(vcs.change_list(), &change_list);
        assert!(!vcs.has_entry("pending.txt"));

        let entry = vcs.get_entry("keep.txt")?;
        assert_eq!(vcs.load_content(entry)?, b"kept bytes".to_vec());
        assert_eq!(entry.timestamp(), Some(5));

        // ids keep counting from the saved counter
        vcs.create_file("new.txt", b"", 7)?;
        vcs.apply()?;
        assert!(vcs.get_entry("new.txt")?.id() > vcs.get_entry("keep.txt")?.id());
        Ok(())
    }

    #[test]
    fn test_purge_obsolete() -> Result<()> {
        let dir = tempdir()?;
        let now = Arc::new(AtomicI64::new(0));
        let clock = {
            let now = now.clone();
            move || now.load(Ordering::SeqCst)
        };
        let config = VcsConfig::new(dir.path()).purge_period(Duration::from_secs(10));
        let mut vcs = LocalVcs::open_with_config(config)?.with_clock(clock);

        vcs.create_file("f", b"v1", 0)?;
        vcs.apply()?;
        vcs.change_file_content("f", b"v2", 0)?;
        vcs.apply()?;
        let old = vcs.change_list().change_sets()[1].changes()[0].obsolete_contents();

        now.store(5_000, Ordering::SeqCst);
        vcs.change_file_content("f", b"v3", 0)?;
        vcs.apply()?;

        now.store(12_000, Ordering::SeqCst);
        assert_eq!(vcs.purge_obsolete()?, 2);
        assert_eq!(vcs.change_list().len(), 1);
        assert!(!vcs.storage().is_content_available(&old[0]));

        let history = vcs.get_entry_history("f")?;
        assert_eq!(contents(&vcs, &history)?, vec![b"v3".to_vec(), b"v2".to_vec()]);
        Ok(())
    }

    #[test]
    fn test_long_content_is_recorded_but_not_stored() -> Result<()> {
        let dir = tempdir()?;
        let config = VcsConfig::new(dir.path()).long_content_threshold(8);
        let mut vcs = LocalVcs::open_with_config(config)?;

        vcs.create_file("big", &[7u8; 9], 0)?;
        vcs.apply()?;
        let entry = vcs.get_entry("big")?;
        assert_eq!(entry.content(), Some(Content::Long));
        assert_eq!(
            vcs.load_content(entry)?,
            crate::content::handle::LONG_CONTENT_PLACEHOLDER.to_vec()
        );
        assert!(matches!(
            vcs.load_content(vcs.root().root()),
            Err(Error::NotAFile(_))
        ));
        Ok(())
    }

    #[test]
    fn test_failed_content_write_reaches_caller() -> Result<()> {
        use crate::content::{Blob, ContentId, ContentStore};

        let dir = tempdir()?;
        let mut vcs = LocalVcs::open(dir.path())?;
        vcs.create_file("a.txt", b"kept", 0)?;
        vcs.apply()?;

        // use up the content id space so the next write cannot be stored
        let mut store = vcs.storage().content_store();
        store.store_as(ContentId::MAX, Blob::raw(b"last".to_vec()))?;

        assert!(matches!(
            vcs.create_file("b.txt", b"lost", 1),
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(
            vcs.change_file_content("a.txt", b"lost", 1),
            Err(Error::InvalidState(_))
        ));
        assert!(vcs.pending_changes().is_empty());

        // a failed write does not consume an entry id
        vcs.create_directory("dir")?;
        assert!(matches!(
            vcs.pending_changes()[0].kind(),
            crate::change::ChangeKind::CreateDirectory { id: 2, .. }
        ));
        Ok(())
    }
}
