//! Admission handshake between the coordinator and a starting worker
//!
//! The coordinator takes the gate's single permit before building a worker.
//! The worker hands it back as soon as it is started, which lets the
//! coordinator queue the next task without waiting for this one to finish.

use fleet_foundation::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Single-slot gate owned by the coordinator
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
}

impl AdmissionGate {
    pub fn new() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
        }
    }

    /// Wait for the slot and claim it
    pub async fn admit(&self) -> Result<AdmissionPermit> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| Error::Internal("admission gate closed".to_string()))?;
        Ok(AdmissionPermit::new(permit))
    }

    /// True when no permit is outstanding
    pub fn is_open(&self) -> bool {
        self.semaphore.available_permits() > 0
    }
}

impl Default for AdmissionGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Claimed admission slot.
///
/// `release` is idempotent: releasing twice, or releasing a permit that was
/// never held, does nothing.
#[derive(Debug, Clone, Default)]
pub struct AdmissionPermit {
    slot: Arc<Mutex<Option<OwnedSemaphorePermit>>>,
}

impl AdmissionPermit {
    pub fn new(permit: OwnedSemaphorePermit) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(permit))),
        }
    }

    /// A permit that holds nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Give the slot back. Returns whether anything was actually released.
    pub fn release(&self) -> bool {
        self.slot.lock().take().is_some()
    }

    pub fn is_held(&self) -> bool {
        self.slot.lock().is_some()
    }
}
