use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a local history storage directory
#[derive(Debug, Clone)]
pub struct VcsConfig {
    /// Directory holding the version, contents and storage files
    pub dir: PathBuf,

    /// Number of content blobs kept by the LRU cache (default: 200, 0 disables)
    pub cache_capacity: usize,

    /// Compress content records with the preset dictionary (default: true)
    pub compress_content: bool,

    /// Blobs larger than this are recorded as long content and never stored (default: 1MB)
    pub long_content_threshold: usize,

    /// Change sets older than this are dropped by purge (default: 3 days)
    pub purge_period: Duration,
}

impl Default for VcsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./localvcs"),
            cache_capacity: 200,
            compress_content: true,
            long_content_threshold: 1024 * 1024, // 1MB
            purge_period: Duration::from_secs(3 * 24 * 60 * 60),
        }
    }
}

impl VcsConfig {
    /// Create a new config with the given directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Default::default()
        }
    }

    /// Set content cache capacity
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Enable or disable content compression
    pub fn compress_content(mut self, enabled: bool) -> Self {
        self.compress_content = enabled;
        self
    }

    /// Set the size above which content is not stored
    pub fn long_content_threshold(mut self, size: usize) -> Self {
        self.long_content_threshold = size;
        self
    }

    /// Set how long history is retained by purge
    pub fn purge_period(mut self, period: Duration) -> Self {
        self.purge_period = period;
        self
    }
}
