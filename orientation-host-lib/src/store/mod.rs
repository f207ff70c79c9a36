mod file_store;
mod memory_store;

use std::fmt;

use async_trait::async_trait;

use crate::record::{NewOrientationRecord, OrientationRecord};

pub use file_store::FileStore;
pub use memory_store::MemoryStore;

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    BadHeader,
    Corrupted { offset: u64 },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "storage io error: {}", e),
            StoreError::BadHeader => write!(f, "not an orientation record log"),
            StoreError::Corrupted { offset } => write!(f, "corrupted record at byte {}", offset),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

/// Owns the persisted record set. Queries return records newest first.
#[async_trait]
pub trait OrientationStore: Send + Sync {
    /// Assigns the next id and appends the record
    async fn insert(&self, record: NewOrientationRecord) -> Result<OrientationRecord, StoreError>;

    /// At most `limit` of the newest records, newest first
    async fn latest(&self, limit: usize) -> Result<Vec<OrientationRecord>, StoreError>;

    async fn all(&self) -> Result<Vec<OrientationRecord>, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    /// Drops every record and restarts ids at 1
    async fn clear(&self) -> Result<(), StoreError>;
}
