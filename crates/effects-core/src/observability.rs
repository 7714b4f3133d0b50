use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::domain::{EffectError, ErrorKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchCounts {
    pub dispatched: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub faults: u64,
}

/// Live counters shared by a context and all of its children.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    dispatched: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    faults: AtomicU64,
}

impl Counters {
    pub(crate) fn record(&self, result: &Result<(), EffectError>) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        match result {
            Ok(()) => self.succeeded.fetch_add(1, Ordering::Relaxed),
            Err(err) if err.kind() == ErrorKind::Fault => self.faults.fetch_add(1, Ordering::Relaxed),
            Err(_) => self.failed.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub(crate) fn snapshot(&self) -> DispatchCounts {
        DispatchCounts {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            faults: self.faults.load(Ordering::Relaxed),
        }
    }
}
