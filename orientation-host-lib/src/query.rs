use std::sync::Arc;

use async_stream::stream;
use futures_core::Stream;
use tokio::sync::watch;

use crate::{
    config::HISTORY_LIMIT,
    record::OrientationRecord,
    store::{OrientationStore, StoreError},
};

#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn OrientationStore>,
    revision: watch::Receiver<u64>,
}

impl QueryService {
    pub fn new(store: Arc<dyn OrientationStore>, revision: watch::Receiver<u64>) -> Self {
        Self { store, revision }
    }

    /// Newest `HISTORY_LIMIT` records, newest first
    pub async fn latest(&self) -> Result<Vec<OrientationRecord>, StoreError> {
        self.latest_n(HISTORY_LIMIT).await
    }

    pub async fn latest_n(&self, n: usize) -> Result<Vec<OrientationRecord>, StoreError> {
        self.store.latest(n).await
    }

    /// Full history, newest first
    pub async fn all(&self) -> Result<Vec<OrientationRecord>, StoreError> {
        self.store.all().await
    }

    /// Yields `latest()` now and again after every persisted record. Ends when
    /// the persister goes away.
    pub fn latest_feed(&self) -> impl Stream<Item = Result<Vec<OrientationRecord>, StoreError>> {
        let store = self.store.clone();
        let mut revision = self.revision.clone();
        stream! {
            revision.borrow_and_update();
            yield store.latest(HISTORY_LIMIT).await;
            while revision.changed().await.is_ok() {
                yield store.latest(HISTORY_LIMIT).await;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{record::NewOrientationRecord, store::MemoryStore};
    use futures_util::{pin_mut, StreamExt};

    async fn filled_store(n: u64) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for i in 0..n {
            store
                .insert(NewOrientationRecord {
                    roll: 0.0,
                    pitch: 0.0,
                    yaw: 0.0,
                    timestamp: 1_000 * (i + 1),
                })
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn latest_is_bounded_and_strictly_descending() {
        let store = filled_store(250).await;
        let (_tx, rx) = watch::channel(0);
        let query = QueryService::new(store, rx);

        let latest = query.latest().await.unwrap();
        assert_eq!(latest.len(), 100);
        assert!(latest.windows(2).all(|w| w[0].timestamp > w[1].timestamp));
        assert_eq!(latest[0].timestamp, 250_000);

        let all = query.all().await.unwrap();
        assert_eq!(all.len(), 250);
        assert!(all.windows(2).all(|w| w[0].timestamp > w[1].timestamp));
    }

    #[tokio::test]
    async fn latest_on_small_history_returns_everything() {
        let (_tx, rx) = watch::channel(0);
        let query = QueryService::new(filled_store(7).await, rx);
        assert_eq!(query.latest().await.unwrap().len(), 7);
        assert_eq!(query.latest_n(3).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn feed_follows_revisions_until_closed() {
        let store = filled_store(1).await;
        let (tx, rx) = watch::channel(1);
        let query = QueryService::new(store.clone(), rx);
        let feed = query.latest_feed();
        pin_mut!(feed);

        assert_eq!(feed.next().await.unwrap().unwrap().len(), 1);

        let record = store
            .insert(NewOrientationRecord {
                roll: 5.0,
                pitch: 0.0,
                yaw: 0.0,
                timestamp: 9_000,
            })
            .await
            .unwrap();
        tx.send_replace(record.id);
        let latest = feed.next().await.unwrap().unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].roll, 5.0);

        drop(tx);
        drop(query);
        assert!(feed.next().await.is_none());
    }
}
