use std::sync::Arc;

use crate::{
    domain::subscriber::{EmailAddress, SubscriberRecord},
    ports::record_store::{RecordStore, RecordStoreError},
    services::subscription::{MemberRegistration, SubscriptionError, SubscriptionService},
};

/// Tags attached to every member registered through signup.
const DEFAULT_MEMBER_TAGS: &[&str] = &["newsletter"];

#[async_trait::async_trait]
pub trait AddSubscriberWorkflow {
    async fn add_subscriber(
        &self,
        email: &str,
        group: Option<&str>,
    ) -> Result<MemberRegistration, AddSubscriberError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AddSubscriberError {
    #[error("invalid email address {0:?}")]
    InvalidEmail(String),
    #[error("failed to store subscriber: {0}")]
    Storage(RecordStoreError),
    /// The remote registration failed and the local record was rolled back;
    /// both systems agree the subscriber does not exist.
    #[error("remote registration failed, local record rolled back: {0}")]
    Remote(SubscriptionError),
    /// The remote registration failed and the rollback failed too. The record
    /// exists locally but was never confirmed remotely — the two systems
    /// disagree and need manual reconciliation.
    #[error(
        "data mismatch: remote registration failed ({remote}) and local rollback failed ({rollback})"
    )]
    Inconsistent {
        remote: SubscriptionError,
        rollback: RecordStoreError,
    },
}

pub struct AddSubscriberWorkflowImpl<R: RecordStore, S: SubscriptionService> {
    record_store: Arc<R>,
    subscriptions: Arc<S>,
    list_name: String,
}

impl<R, S> AddSubscriberWorkflowImpl<R, S>
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

    async fn register_remote(
        &self,
        email: &EmailAddress,
        group: Option<&str>,
    ) -> Result<MemberRegistration, SubscriptionError> {
        if let Some(group) = group {
            let interest_id = self
                .subscriptions
                .resolve_group(&self.list_name, group)
                .await?;
            log::debug!("signup group \"{}\" resolved to interest {}", group, interest_id);
        }
        let tags: Vec<String> = DEFAULT_MEMBER_TAGS.iter().map(|t| t.to_string()).collect();
        self.subscriptions
            .upsert_member(&self.list_name, email, &tags)
            .await
    }
}

#[async_trait::async_trait]
impl<R, S> AddSubscriberWorkflow for AddSubscriberWorkflowImpl<R, S>
where
    R: RecordStore + Send + Sync + 'static,
    S: SubscriptionService + Send + Sync + 'static,
{
    async fn add_subscriber(
        &self,
        email: &str,
        group: Option<&str>,
    ) -> Result<MemberRegistration, AddSubscriberError> {
        let email =
            EmailAddress::parse(email).map_err(|e| AddSubscriberError::InvalidEmail(e.0))?;

        let record = SubscriberRecord {
            email: email.as_str().to_string(),
            group: group.map(|g| g.to_string()),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        if let Err(e) = self.record_store.add(&record).await {
            log::error!("failed to store subscriber {}: {}", email, e);
            return Err(AddSubscriberError::Storage(e));
        }

        match self.register_remote(&email, group).await {
            Ok(registration) => {
                log::info!("subscriber {} added to list \"{}\"", email, self.list_name);
                Ok(registration)
            }
            Err(remote) => {
                // Undo the local write so both systems agree the subscriber
                // does not exist.
                match self.record_store.remove(email.as_str()).await {
                    Ok(()) => {
                        log::warn!(
                            "remote registration for {} failed, local record rolled back: {}",
                            email,
                            remote
                        );
                        Err(AddSubscriberError::Remote(remote))
                    }
                    Err(rollback) => {
                        log::error!(
                            "remote registration for {} failed and rollback failed, stores diverged: {} / {}",
                            email,
                            remote,
                            rollback
                        );
                        Err(AddSubscriberError::Inconsistent { remote, rollback })
                    }
                }
            }
        }
    }
}
