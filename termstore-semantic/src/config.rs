//! Semantic indexing configuration

/// Default number of projection rows per persistence batch
pub const DEFAULT_BATCH_SAVE_SIZE: usize = 1000;

/// Configuration for the semantic index commit hook
#[derive(Debug, Clone)]
pub struct SemanticIndexConfig {
    /// Whether the commit hook maintains the index at all.
    ///
    /// When disabled the hook logs once and returns success for every commit
    /// without touching the index.
    pub enabled: bool,

    /// Number of projection rows written per batch.
    ///
    /// Bounds the size of individual bulk writes against the backing store.
    pub batch_save_size: usize,
}

impl Default for SemanticIndexConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            batch_save_size: DEFAULT_BATCH_SAVE_SIZE,
        }
    }
}

impl SemanticIndexConfig {
    /// Builder method to enable or disable semantic indexing
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Builder method to set the persistence batch size
    pub fn with_batch_save_size(mut self, batch_save_size: usize) -> Self {
        self.batch_save_size = batch_save_size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SemanticIndexConfig::default();
        assert!(config.enabled);
        assert_eq!(config.batch_save_size, DEFAULT_BATCH_SAVE_SIZE);
    }

    #[test]
    fn test_builders() {
        let config = SemanticIndexConfig::default()
            .with_enabled(false)
            .with_batch_save_size(50);
        assert!(!config.enabled);
        assert_eq!(config.batch_save_size, 50);
    }
}
