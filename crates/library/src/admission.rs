//! Open file budget shared by every package worker.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// Handles held by one package worker: the archive it reads and the file it writes.
pub const PERMITS_PER_PACKAGE: u32 = 2;

/// Weighted semaphore sized to the open file budget.
///
/// Each admitted package holds [`PERMITS_PER_PACKAGE`] permits until its
/// [`OwnedSemaphorePermit`] is dropped.
#[derive(Debug, Clone)]
pub struct Admission {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl Admission {
    /// Budgets below [`PERMITS_PER_PACKAGE`] are raised to it, otherwise no
    /// package could ever be admitted. Budgets above
    /// [`Semaphore::MAX_PERMITS`] are lowered to it.
    pub fn new(open_limit: usize) -> Self {
        let capacity = open_limit.clamp(PERMITS_PER_PACKAGE as usize, Semaphore::MAX_PERMITS);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait until a package may be opened, or until `cancel` fires.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<OwnedSemaphorePermit> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => exn::bail!(ErrorKind::Cancelled),
            permit = Arc::clone(&self.semaphore).acquire_many_owned(PERMITS_PER_PACKAGE) => {
                permit.or_raise(|| ErrorKind::Cancelled)
            },
        }
    }
}
