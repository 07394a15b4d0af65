//! Engine configuration.

/// Configuration for opening a database.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the data directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Base name for log chunk files (`{base}_{N}.json`).
    pub base_name: String,

    /// Size in bytes a chunk file may reach before a new chunk is started.
    pub chunk_size_limit: u64,

    /// Whether to fsync after every append (safer but slower).
    pub sync_on_write: bool,

    /// Expected API key. When set, `Database::open` compares the supplied
    /// key against it and fails with `InvalidApiKey` on mismatch. When
    /// `None`, no credential check is performed.
    pub api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            base_name: "data".to_string(),
            chunk_size_limit: 100_000,
            sync_on_write: true,
            api_key: None,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the data directory if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets the base name for chunk files.
    #[must_use]
    pub fn base_name(mut self, name: impl Into<String>) -> Self {
        self.base_name = name.into();
        self
    }

    /// Sets the chunk rotation size threshold.
    #[must_use]
    pub const fn chunk_size_limit(mut self, bytes: u64) -> Self {
        self.chunk_size_limit = bytes;
        self
    }

    /// Sets whether to fsync after every append.
    #[must_use]
    pub const fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }

    /// Sets the expected API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}
