//! Engine configuration.

/// Default cap on indexed key length, in characters.
pub const DEFAULT_MAX_KEY_CHARS: usize = 1024;

/// Configuration for opening an [`Engine`](crate::Engine).
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the data directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether to fsync the WAL after every append.
    ///
    /// Turning this off trades crash durability of the last mutations for
    /// speed; snapshots are always synced.
    pub sync_on_append: bool,

    /// Whether the records snapshot is written as indented JSON.
    pub pretty_snapshots: bool,

    /// Whether the index snapshot is written at all.
    ///
    /// When false the tries are rebuilt from the records on every open.
    pub persist_indexes: bool,

    /// Keys longer than this many characters are not indexed.
    pub max_key_chars: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_on_append: true,
            pretty_snapshots: true,
            persist_indexes: true,
            max_key_chars: DEFAULT_MAX_KEY_CHARS,
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

    /// Sets whether to fsync the WAL on every append.
    #[must_use]
    pub const fn sync_on_append(mut self, value: bool) -> Self {
        self.sync_on_append = value;
        self
    }

    /// Sets whether the records snapshot is pretty-printed.
    #[must_use]
    pub const fn pretty_snapshots(mut self, value: bool) -> Self {
        self.pretty_snapshots = value;
        self
    }

    /// Sets whether the index snapshot is persisted.
    #[must_use]
    pub const fn persist_indexes(mut self, value: bool) -> Self {
        self.persist_indexes = value;
        self
    }

    /// Sets the maximum indexed key length.
    #[must_use]
    pub const fn max_key_chars(mut self, value: usize) -> Self {
        self.max_key_chars = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.create_if_missing);
        assert!(config.sync_on_append);
        assert!(config.persist_indexes);
        assert_eq!(config.max_key_chars, DEFAULT_MAX_KEY_CHARS);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .create_if_missing(false)
            .sync_on_append(false)
            .pretty_snapshots(false)
            .persist_indexes(false)
            .max_key_chars(16);

        assert!(!config.create_if_missing);
        assert!(!config.sync_on_append);
        assert!(!config.pretty_snapshots);
        assert!(!config.persist_indexes);
        assert_eq!(config.max_key_chars, 16);
    }
}
