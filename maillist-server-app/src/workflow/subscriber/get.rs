use std::sync::Arc;

use crate::{
    domain::subscriber::SubscriberRecord,
    ports::record_store::{RecordStore, RecordStoreError},
};

#[async_trait::async_trait]
pub trait GetSubscriberUseCase {
    async fn get_subscriber(
        &self,
        email: &str,
    ) -> Result<Option<SubscriberRecord>, GetSubscriberError>;
}

#[derive(Debug, thiserror::Error)]
pub enum GetSubscriberError {
    #[error("storage backend failure: {0}")]
    Storage(RecordStoreError),
}

pub struct GetSubscriberUseCaseImpl<R: RecordStore> {
    record_store: Arc<R>,
}

impl<R> GetSubscriberUseCaseImpl<R>
where
    R: RecordStore + Send + Sync + 'static,
{
    pub fn new(record_store: Arc<R>) -> Self {
        Self { record_store }
    }
}

#[async_trait::async_trait]
impl<R> GetSubscriberUseCase for GetSubscriberUseCaseImpl<R>
where
    R: RecordStore + Send + Sync + 'static,
{
    async fn get_subscriber(
        &self,
        email: &str,
    ) -> Result<Option<SubscriberRecord>, GetSubscriberError> {
        self.record_store
            .get_by_email(email)
            .await
            .map_err(GetSubscriberError::Storage)
    }
}
