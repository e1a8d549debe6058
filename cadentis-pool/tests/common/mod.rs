//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// One unit of simulated work.
pub const UNIT: Duration = Duration::from_millis(100);

/// Installs a `tracing` subscriber once per test binary.
///
/// Output is captured by the test harness; set `RUST_LOG` to see it.
pub fn init_tracing() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Sleeps for `units` units of simulated work and returns `units`.
pub fn work(units: u64) -> u64 {
    thread::sleep(UNIT * units as u32);
    units
}

/// Tracks how many tasks run at the same time.
#[derive(Default)]
pub struct ConcurrencyProbe {
    current: AtomicUsize,
    max: AtomicUsize,
}

impl ConcurrencyProbe {
    /// Runs `f` while counted as one executing task.
    pub fn track<R>(&self, f: impl FnOnce() -> R) -> R {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);

        let out = f();

        self.current.fetch_sub(1, Ordering::SeqCst);
        out
    }

    /// Highest number of tasks observed running together.
    pub fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}
