//! Integration tests for pool registration through the façade.
//!
//! These validate the process-wide registry semantics:
//! - One entry per pool id, shared across call sites and threads
//! - First-writer-wins capacities on repeated registration
//! - Attach-to-existing, including the unknown-pool programmer error
//! - The shared default pool for callers with no bulkhead configured

use prometheus_ripcord::{
    builders, BoxError, Execution, ExecutionError, PoolRegistry, PoolSettings, PoolsConfig,
    DEFAULT_POOL_ID,
};
use std::sync::Arc;
use std::thread;

#[test]
fn test_repeated_registration_keeps_first_capacities() {
    Execution::new(|| Ok::<_, BoxError>(()))
        .bulkhead("face-fww", 2, 4, 100)
        .run()
        .unwrap();
    Execution::new(|| Ok::<_, BoxError>(()))
        .bulkhead("face-fww", 9, 9, 9)
        .run()
        .unwrap();

    let entry = PoolRegistry::global().get("face-fww").unwrap();
    assert_eq!(entry.settings().max_concurrent, 2);
    assert_eq!(entry.settings().max_queue, 4);
    assert_eq!(entry.settings().max_admission_wait_millis, 100);
}

#[test]
fn test_concurrent_runs_share_one_entry() {
    let workers: Vec<_> = (0..8)
        .map(|i| {
            thread::spawn(move || {
                Execution::new(move || Ok::<_, BoxError>(i))
                    .bulkhead("face-race", 4, 8, 1_000)
                    .run()
                    .unwrap();
                Arc::as_ptr(&PoolRegistry::global().get("face-race").unwrap()) as usize
            })
        })
        .collect();
    let pointers: Vec<usize> = workers.into_iter().map(|w| w.join().unwrap()).collect();
    assert!(pointers.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn test_attach_to_existing_pool() {
    Execution::new(|| Ok::<_, BoxError>(()))
        .bulkhead("face-attach", 2, 4, 100)
        .run()
        .unwrap();

    let value = Execution::new(|| Ok::<_, BoxError>("attached"))
        .attach_bulkhead("face-attach")
        .run()
        .unwrap();
    assert_eq!(value, "attached");
}

#[test]
fn test_attach_unknown_pool_is_fatal() {
    let result = Execution::new(|| Ok::<_, BoxError>("never"))
        .attach_bulkhead("face-missing")
        .retry(3, 0)
        .on_failure(|_| "fallback must not see programmer errors")
        .run();
    let err = result.unwrap_err();
    assert!(matches!(err, ExecutionError::UnknownPool(id) if id == "face-missing"));
}

#[test]
fn test_default_pool_registered_on_first_use() {
    Execution::new(|| Ok::<_, BoxError>(())).run().unwrap();
    let entry = PoolRegistry::global().get(DEFAULT_POOL_ID).unwrap();
    assert_eq!(entry.settings().max_concurrent, usize::MAX);
    assert_eq!(entry.settings().max_queue, usize::MAX);
}

#[test]
fn test_installed_pools_are_attachable() {
    let cfg = PoolsConfig {
        pools: vec![PoolSettings::new("face-installed", 2, 8, 200)],
    };
    builders::install_pools(&cfg).unwrap();

    let value = Execution::new(|| Ok::<_, BoxError>(7))
        .attach_bulkhead("face-installed")
        .run()
        .unwrap();
    assert_eq!(value, 7);
}
