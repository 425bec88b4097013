pub mod detector;
pub mod fingerprint;
pub mod store;

pub use detector::{DedupOutcome, DuplicateDetector};
pub use fingerprint::Fingerprint;
pub use store::{FingerprintStore, MemoryStore, SqliteStore, StoreError};
