//! Pre-register bulkhead pools from configuration.

use std::sync::Arc;

use crate::config::PoolsConfig;
use crate::core::registry::{PoolEntry, PoolRegistry};

/// Register every pool in `cfg` with the process-wide registry.
///
/// Pools that already exist keep their original capacities (first writer
/// wins). Returns the entries in configuration order.
///
/// # Errors
///
/// Returns the validation message when `cfg` is invalid; no pool is
/// registered in that case.
pub fn install_pools(cfg: &PoolsConfig) -> Result<Vec<Arc<PoolEntry>>, String> {
    cfg.validate()?;
    Ok(cfg
        .pools
        .iter()
        .map(|settings| PoolRegistry::global().get_or_create(settings))
        .collect())
}
