use std::sync::Arc;

use crate::{
    domain::subscriber::EmailAddress,
    ports::record_store::{RecordStore, RecordStoreError},
    services::subscription::{SubscriptionError, SubscriptionService},
};

#[async_trait::async_trait]
pub trait RemoveSubscriberWorkflow {
    async fn remove_subscriber(&self, email: &str) -> Result<(), RemoveSubscriberError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RemoveSubscriberError {
    #[error("subscriber {0} not found")]
    NotFound(String),
    #[error("failed to remove subscriber: {0}")]
    Storage(RecordStoreError),
}

pub struct RemoveSubscriberWorkflowImpl<R: RecordStore, S: SubscriptionService> {
    record_store: Arc<R>,
    subscriptions: Arc<S>,
    list_name: String,
}

impl<R, S> RemoveSubscriberWorkflowImpl<R, S>
where
    R: RecordStore + Send + Sync + 'static,
    S: SubscriptionService + Send + Sync + 'static,
{
    pub fn new(record_store: Arc<R>, subscriptions: Arc<S>, list_name: String) -> Self {
        Self {
            record_store,
            subscriptions,
            list_name,
        }
    }
}

#[async_trait::async_trait]
impl<R, S> RemoveSubscriberWorkflow for RemoveSubscriberWorkflowImpl<R, S>
where
    R: RecordStore + Send + Sync + 'static,
    S: SubscriptionService + Send + Sync + 'static,
{
    async fn remove_subscriber(&self, email: &str) -> Result<(), RemoveSubscriberError> {
        let record = self
            .record_store
            .get_by_email(email)
            .await
            .map_err(RemoveSubscriberError::Storage)?;
        if record.is_none() {
            return Err(RemoveSubscriberError::NotFound(email.to_string()));
        }
        self.record_store
            .remove(email)
            .await
            .map_err(RemoveSubscriberError::Storage)?;
        log::info!("subscriber {} removed", email);

        // Remote cleanup is best-effort: the local deletion already happened
        // and is never blocked or rolled back by the remote outcome.
        if let Ok(parsed) = EmailAddress::parse(email) {
            match self.subscriptions.unsubscribe(&self.list_name, &parsed).await {
                Ok(()) => {
                    log::debug!("member {} unsubscribed from \"{}\"", parsed, self.list_name)
                }
                // Already absent remotely; nothing to clean up.
                Err(SubscriptionError::NotFound(..)) => {}
                Err(e) => log::warn!(
                    "failed to unsubscribe {} from \"{}\": {}",
                    parsed,
                    self.list_name,
                    e
                ),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        domain::subscriber::SubscriberRecord,
        ports::mailing::MockMailingApi,
        ports::record_store::MockRecordStore,
        services::subscription::{SubscriptionService, SubscriptionServiceImpl},
    };

    use super::*;

    const LIST: &str = "MailingList";

    fn workflow(
        store: &MockRecordStore,
        api: &MockMailingApi,
    ) -> RemoveSubscriberWorkflowImpl<MockRecordStore, SubscriptionServiceImpl<MockMailingApi>>
    {
        RemoveSubscriberWorkflowImpl::new(
            Arc::new(store.clone()),
            Arc::new(SubscriptionServiceImpl::new(Arc::new(api.clone()))),
            LIST.to_string(),
        )
    }

    async fn seed_record(store: &MockRecordStore, email: &str) {
        store
            .add(&SubscriberRecord {
                email: email.to_string(),
                group: None,
                created_at: "2020-01-01T00:00:00Z".to_string(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn removes_the_record_and_unsubscribes_the_member() {
        let store = MockRecordStore::default();
        let api = MockMailingApi::default();
        let list_id = api.add_list(LIST);
        seed_record(&store, "a@b.com").await;
        let email = EmailAddress::parse("a@b.com").unwrap();
        SubscriptionServiceImpl::new(Arc::new(api.clone()))
            .upsert_member(LIST, &email, &[])
            .await
            .unwrap();

        workflow(&store, &api).remove_subscriber("a@b.com").await.unwrap();

        assert!(!store.contains("a@b.com"));
        assert!(api.member(&list_id, &email.member_id()).is_none());
    }

    #[tokio::test]
    async fn second_removal_reports_not_found() {
        let store = MockRecordStore::default();
        let api = MockMailingApi::default();
        api.add_list(LIST);
        seed_record(&store, "a@b.com").await;

        let wf = workflow(&store, &api);
        wf.remove_subscriber("a@b.com").await.unwrap();

        assert!(matches!(
            wf.remove_subscriber("a@b.com").await,
            Err(RemoveSubscriberError::NotFound(..))
        ));
    }

    #[tokio::test]
    async fn succeeds_when_the_member_was_never_subscribed() {
        let store = MockRecordStore::default();
        let api = MockMailingApi::default();
        api.add_list(LIST);
        seed_record(&store, "a@b.com").await;

        workflow(&store, &api).remove_subscriber("a@b.com").await.unwrap();

        assert!(!store.contains("a@b.com"));
    }

    #[tokio::test]
    async fn remote_failure_does_not_block_local_deletion() {
        let store = MockRecordStore::default();
        let api = MockMailingApi::default();
        api.add_list(LIST);
        seed_record(&store, "a@b.com").await;
        api.set_fail_member_writes(true);

        workflow(&store, &api).remove_subscriber("a@b.com").await.unwrap();

        assert!(!store.contains("a@b.com"));
    }
}
