//! Pool configuration structures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Pool id used when a call site never configures a bulkhead.
pub const DEFAULT_POOL_ID: &str = "Default-Pool-Id";

/// Admission ceiling of the default pool. Practically unbounded.
pub const DEFAULT_MAX_CONCURRENT: usize = usize::MAX;

/// Queue capacity of the default pool. Practically unbounded.
pub const DEFAULT_MAX_QUEUE: usize = usize::MAX;

/// Admission wait of the default pool, in milliseconds. Practically unbounded.
pub const DEFAULT_MAX_ADMISSION_WAIT_MILLIS: u64 = u64::MAX;

/// Capacities of one named bulkhead pool.
///
/// The first caller to register a pool id fixes its capacities for the
/// lifetime of the process; later registrations with different values are
/// ignored (see [`crate::core::registry::PoolRegistry`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSettings {
    /// Pool identifier, shared across call sites.
    pub pool_id: String,
    /// Maximum concurrent in-flight tasks (admission permits).
    pub max_concurrent: usize,
    /// Maximum queued-but-not-started tasks.
    pub max_queue: usize,
    /// Maximum blocking time to acquire a permit or a queue slot, per stage.
    pub max_admission_wait_millis: u64,
}

impl PoolSettings {
    /// Create settings for a named pool, clamping both capacities to at least 1.
    pub fn new(
        pool_id: impl Into<String>,
        max_concurrent: usize,
        max_queue: usize,
        max_admission_wait_millis: u64,
    ) -> Self {
        Self {
            pool_id: pool_id.into(),
            max_concurrent: max_concurrent.max(1),
            max_queue: max_queue.max(1),
            max_admission_wait_millis,
        }
    }

    /// Admission wait budget as a [`Duration`].
    #[must_use]
    pub fn max_admission_wait(&self) -> Duration {
        Duration::from_millis(self.max_admission_wait_millis)
    }

    /// Validate settings values.
    pub fn validate(&self) -> Result<(), String> {
        if self.pool_id.is_empty() {
            return Err("pool_id must be non-empty".into());
        }
        if self.max_concurrent == 0 {
            return Err("max_concurrent must be greater than 0".into());
        }
        if self.max_queue == 0 {
            return Err("max_queue must be greater than 0".into());
        }
        Ok(())
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            pool_id: DEFAULT_POOL_ID.to_string(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            max_queue: DEFAULT_MAX_QUEUE,
            max_admission_wait_millis: DEFAULT_MAX_ADMISSION_WAIT_MILLIS,
        }
    }
}

/// Root configuration: the set of pools to pre-register at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolsConfig {
    /// Pool settings, one entry per pool id.
    pub pools: Vec<PoolSettings>,
}

impl PoolsConfig {
    /// Validate all pools and ensure ids are unique.
    pub fn validate(&self) -> Result<(), String> {
        for settings in &self.pools {
            settings
                .validate()
                .map_err(|e| format!("pool `{}` invalid: {e}", settings.pool_id))?;
        }
        for (i, settings) in self.pools.iter().enumerate() {
            if self.pools[..i].iter().any(|s| s.pool_id == settings.pool_id) {
                return Err(format!("duplicate pool id `{}`", settings.pool_id));
            }
        }
        Ok(())
    }

    /// Parse pool configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: PoolsConfig =
            serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
