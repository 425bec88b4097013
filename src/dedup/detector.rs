use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::dedup::{Fingerprint, FingerprintStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DedupOutcome {
    FirstSeen,
    /// The store already maps this fingerprint to the same record.
    SameRecord,
    DuplicateOf(String),
}

/// Check-and-record against a fingerprint store with first-seen semantics.
///
/// Check and insert happen under one lock, so two concurrent records with the
/// same fingerprint can never both come back `FirstSeen`.
pub struct DuplicateDetector {
    store: Arc<dyn FingerprintStore>,
    write_lock: Mutex<()>,
}

impl DuplicateDetector {
    pub fn new(store: Arc<dyn FingerprintStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    #[instrument(skip(self), fields(fingerprint = %fingerprint))]
    pub async fn check_and_record(
        &self,
        fingerprint: &Fingerprint,
        record_id: &str,
    ) -> Result<DedupOutcome, StoreError> {
        let _guard = self.write_lock.lock().await;

        match self.store.get(fingerprint).await? {
            None => {
                self.store.put(fingerprint, record_id).await?;
                Ok(DedupOutcome::FirstSeen)
            }
            Some(seen) if seen == record_id => Ok(DedupOutcome::SameRecord),
            Some(seen) => {
                debug!("duplicate of {}", seen);
                Ok(DedupOutcome::DuplicateOf(seen))
            }
        }
    }

    pub async fn close(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.store.close().await
    }
}
