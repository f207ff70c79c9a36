use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::record::{NewOrientationRecord, OrientationRecord};

use super::{OrientationStore, StoreError};

#[derive(Default)]
pub struct MemoryStore {
    // insertion order, oldest first
    records: Mutex<Vec<OrientationRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrientationStore for MemoryStore {
    async fn insert(&self, record: NewOrientationRecord) -> Result<OrientationRecord, StoreError> {
        let mut records = self.records.lock().await;
        let id = records.last().map_or(1, |last| last.id + 1);
        let record = record.with_id(id);
        records.push(record);
        Ok(record)
    }

    async fn latest(&self, limit: usize) -> Result<Vec<OrientationRecord>, StoreError> {
        let records = self.records.lock().await;
        Ok(records.iter().rev().take(limit).copied().collect())
    }

    async fn all(&self) -> Result<Vec<OrientationRecord>, StoreError> {
        let records = self.records.lock().await;
        Ok(records.iter().rev().copied().collect())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.records.lock().await.len() as u64)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.records.lock().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn new_record(timestamp: u64) -> NewOrientationRecord {
        NewOrientationRecord {
            roll: 1.0,
            pitch: 2.0,
            yaw: 3.0,
            timestamp,
        }
    }

    #[tokio::test]
    async fn ids_are_monotonic_and_queries_newest_first() {
        let store = MemoryStore::new();
        for i in 0..5 {
            let record = store.insert(new_record(1000 + i)).await.unwrap();
            assert_eq!(record.id, i + 1);
        }

        let latest = store.latest(3).await.unwrap();
        assert_eq!(latest.iter().map(|r| r.id).collect::<Vec<_>>(), vec![5, 4, 3]);
        let all = store.all().await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].timestamp, 1004);
        assert_eq!(all[4].timestamp, 1000);
    }

    #[tokio::test]
    async fn clear_restarts_ids() {
        let store = MemoryStore::new();
        store.insert(new_record(1)).await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        assert_eq!(store.insert(new_record(2)).await.unwrap().id, 1);
    }
}
