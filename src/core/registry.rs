//! Process-wide pool registry.
//!
//! Every call site naming the same pool id shares one [`PoolEntry`]. Entries
//! are created lazily, live until process exit, and are never removed; there
//! is deliberately no clear/close API. The first caller to register an id
//! fixes its capacities; later registrations with different capacities keep
//! the original and log a warning.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::config::PoolSettings;
use crate::core::admission::AdmissionGate;
use crate::core::error::ExecutionError;
use crate::core::worker_pool::WorkerPool;

/// The (carrier pool, admission gate) pair behind one pool id.
pub struct PoolEntry {
    settings: PoolSettings,
    pool: WorkerPool,
    gate: AdmissionGate,
}

impl PoolEntry {
    fn new(settings: PoolSettings) -> Self {
        let pool = WorkerPool::new(
            settings.pool_id.clone(),
            settings.max_concurrent,
            settings.max_queue,
        );
        let gate = AdmissionGate::new(settings.max_concurrent);
        Self {
            settings,
            pool,
            gate,
        }
    }

    /// The capacities this entry was created with (first writer wins).
    #[must_use]
    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    /// The entry's carrier pool.
    #[must_use]
    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// The entry's admission gate.
    #[must_use]
    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }
}

impl std::fmt::Debug for PoolEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolEntry")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Mapping from pool id to its shared [`PoolEntry`].
pub struct PoolRegistry {
    entries: RwLock<HashMap<String, Arc<PoolEntry>>>,
}

static REGISTRY: OnceLock<PoolRegistry> = OnceLock::new();

impl PoolRegistry {
    /// The process-wide registry, initialised on first access.
    #[must_use]
    pub fn global() -> &'static PoolRegistry {
        REGISTRY.get_or_init(|| PoolRegistry {
            entries: RwLock::new(HashMap::new()),
        })
    }

    /// Return the entry for `settings.pool_id`, creating it if absent.
    ///
    /// Atomic with respect to concurrent callers: exactly one entry is
    /// constructed per id, and all callers observe the same instance. The
    /// capacities of an existing entry are never modified.
    pub fn get_or_create(&self, settings: &PoolSettings) -> Arc<PoolEntry> {
        if let Some(existing) = self.entries.read().get(&settings.pool_id) {
            warn_on_mismatch(existing, settings);
            return Arc::clone(existing);
        }

        let mut entries = self.entries.write();
        // Racing creators resolve here: only the first inserts.
        if let Some(existing) = entries.get(&settings.pool_id) {
            warn_on_mismatch(existing, settings);
            return Arc::clone(existing);
        }
        debug!(pool = %settings.pool_id, "registering pool entry");
        let entry = Arc::new(PoolEntry::new(settings.clone()));
        entries.insert(settings.pool_id.clone(), Arc::clone(&entry));
        entry
    }

    /// Return the entry for `pool_id`.
    ///
    /// # Errors
    ///
    /// Fails with [`ExecutionError::UnknownPool`] when no entry exists; the
    /// pool must be created before it can be attached to.
    pub fn get(&self, pool_id: &str) -> Result<Arc<PoolEntry>, ExecutionError> {
        self.entries
            .read()
            .get(pool_id)
            .cloned()
            .ok_or_else(|| ExecutionError::UnknownPool(pool_id.to_string()))
    }

    /// True when `pool_id` has been registered.
    #[must_use]
    pub fn contains(&self, pool_id: &str) -> bool {
        self.entries.read().contains_key(pool_id)
    }
}

fn warn_on_mismatch(existing: &PoolEntry, requested: &PoolSettings) {
    if existing.settings != *requested {
        warn!(
            pool = %requested.pool_id,
            "pool already registered; keeping original capacities"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_get_or_create_returns_same_entry() {
        let registry = PoolRegistry::global();
        let settings = PoolSettings::new("reg-same", 2, 4, 100);
        let first = registry.get_or_create(&settings);
        let second = registry.get_or_create(&settings);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_first_writer_wins_on_capacities() {
        let registry = PoolRegistry::global();
        let first = registry.get_or_create(&PoolSettings::new("reg-fww", 2, 4, 100));
        let second = registry.get_or_create(&PoolSettings::new("reg-fww", 9, 9, 9));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.settings().max_concurrent, 2);
        assert_eq!(second.settings().max_queue, 4);
        assert_eq!(second.settings().max_admission_wait_millis, 100);
    }

    #[test]
    fn test_concurrent_creation_yields_one_instance() {
        let registry = PoolRegistry::global();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                thread::spawn(|| {
                    let entry = PoolRegistry::global()
                        .get_or_create(&PoolSettings::new("reg-race", 1, 1, 50));
                    Arc::as_ptr(&entry) as usize
                })
            })
            .collect();
        let pointers: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(pointers.windows(2).all(|w| w[0] == w[1]));
        assert!(registry.contains("reg-race"));
    }

    #[test]
    fn test_get_unknown_pool_fails() {
        let err = PoolRegistry::global().get("reg-missing").unwrap_err();
        assert!(matches!(err, ExecutionError::UnknownPool(id) if id == "reg-missing"));
    }
}
