use std::sync::Arc;

use crate::{
    domain::subscriber::SubscriberRecord,
    ports::record_store::{RecordStore, RecordStoreError},
};

#[async_trait::async_trait]
pub trait ListSubscribersUseCase {
    /// Returns at most `limit` records; `limit == 0` returns all of them.
    async fn list_subscribers(
        &self,
        limit: u32,
    ) -> Result<Vec<SubscriberRecord>, ListSubscribersError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ListSubscribersError {
    #[error("storage backend failure: {0}")]
    Storage(RecordStoreError),
}

pub struct ListSubscribersUseCaseImpl<R: RecordStore> {
    record_store: Arc<R>,
}

impl<R> ListSubscribersUseCaseImpl<R>
where
    R: RecordStore + Send + Sync + 'static,
{
    pub fn new(record_store: Arc<R>) -> Self {
        Self { record_store }
    }
}

#[async_trait::async_trait]
impl<R> ListSubscribersUseCase for ListSubscribersUseCaseImpl<R>
where
    R: RecordStore + Send + Sync + 'static,
{
    async fn list_subscribers(
        &self,
        limit: u32,
    ) -> Result<Vec<SubscriberRecord>, ListSubscribersError> {
        self.record_store
            .get_all(limit)
            .await
            .map_err(ListSubscribersError::Storage)
    }
}

#[cfg(test)]
mod tests {
    use crate::ports::record_store::MockRecordStore;

    use super::*;

    async fn seeded_store(count: usize) -> MockRecordStore {
        let store = MockRecordStore::default();
        for i in 0..count {
            store
                .add(&SubscriberRecord {
                    email: format!("user{}@example.com", i),
                    group: None,
                    created_at: "2020-01-01T00:00:00Z".to_string(),
                })
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn limit_is_an_inclusive_upper_bound() {
        let store = seeded_store(5).await;
        let use_case = ListSubscribersUseCaseImpl::new(Arc::new(store));

        assert_eq!(use_case.list_subscribers(3).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn zero_limit_returns_everything() {
        let store = seeded_store(5).await;
        let use_case = ListSubscribersUseCaseImpl::new(Arc::new(store));

        assert_eq!(use_case.list_subscribers(0).await.unwrap().len(), 5);
    }
}
