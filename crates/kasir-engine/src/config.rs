//! # Engine Configuration
//!
//! Tunables for the settlement services, overridable from the
//! environment:
//!
//! ```text
//! KASIR_OUTBOX_POLL_SECS   Journal worker poll interval (default 5)
//! KASIR_OUTBOX_BATCH_SIZE  Entries drained per tick     (default 50)
//! ```

use std::time::Duration;
use tracing::warn;

// =============================================================================
// Engine Config
// =============================================================================

/// Configuration for the settlement engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How often the journal outbox worker polls for pending entries.
    pub outbox_poll_interval: Duration,

    /// Maximum outbox entries processed per tick.
    pub outbox_batch_size: i64,

    /// Posting attempts before an entry is permanently skipped.
    pub outbox_max_attempts: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            outbox_poll_interval: Duration::from_secs(5),
            outbox_batch_size: 50,
            outbox_max_attempts: 10,
        }
    }
}

impl EngineConfig {
    /// Loads the configuration, applying environment overrides on top of
    /// the defaults. Malformed values are warned about and ignored.
    pub fn from_env() -> Self {
        let mut config = EngineConfig::default();

        if let Ok(raw) = std::env::var("KASIR_OUTBOX_POLL_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => {
                    config.outbox_poll_interval = Duration::from_secs(secs);
                }
                _ => warn!(value = %raw, "Ignoring invalid KASIR_OUTBOX_POLL_SECS"),
            }
        }

        if let Ok(raw) = std::env::var("KASIR_OUTBOX_BATCH_SIZE") {
            match raw.parse::<i64>() {
                Ok(size) if size > 0 => config.outbox_batch_size = size,
                _ => warn!(value = %raw, "Ignoring invalid KASIR_OUTBOX_BATCH_SIZE"),
            }
        }

        config
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.outbox_poll_interval, Duration::from_secs(5));
        assert_eq!(config.outbox_batch_size, 50);
        assert_eq!(config.outbox_max_attempts, 10);
    }
}
