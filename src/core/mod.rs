pub mod comparator;
pub mod engine;
pub mod hasher;
pub mod manifest;
pub mod scanner;

pub use comparator::{decide, needs_upload, SyncAction, UploadReason};
pub use engine::{SyncConfig, SyncEngine, SyncReport, DEFAULT_CHUNK_SIZE};
pub use manifest::Manifest;
pub use scanner::{FileScanner, LocalFile, ScanConfig};
