use std::sync::Arc;

use crate::{
    domain::subscriber::EmailAddress,
    ports::mailing::{MailingApiError, RemoteMember},
    services::subscription::{SubscriptionError, SubscriptionService},
};

/// Read-through to the remote service. Absence is a normal answer, not an
/// error.
#[async_trait::async_trait]
pub trait LookupRemoteStatusUseCase {
    async fn lookup_remote_status(
        &self,
        email: &str,
    ) -> Result<Option<RemoteMember>, LookupRemoteStatusError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LookupRemoteStatusError {
    #[error("invalid email address {0:?}")]
    InvalidEmail(String),
    #[error("mailing service failure: {0}")]
    Remote(MailingApiError),
}

pub struct LookupRemoteStatusUseCaseImpl<S: SubscriptionService> {
    subscriptions: Arc<S>,
    list_name: String,
}

impl<S> LookupRemoteStatusUseCaseImpl<S>
where
    S: SubscriptionService + Send + Sync + 'static,
{
    pub fn new(subscriptions: Arc<S>, list_name: String) -> Self {
        Self {
            subscriptions,
            list_name,
        }
    }
}

#[async_trait::async_trait]
impl<S> LookupRemoteStatusUseCase for LookupRemoteStatusUseCaseImpl<S>
where
    S: SubscriptionService + Send + Sync + 'static,
{
    async fn lookup_remote_status(
        &self,
        email: &str,
    ) -> Result<Option<RemoteMember>, LookupRemoteStatusError> {
        let email = EmailAddress::parse(email)
            .map_err(|e| LookupRemoteStatusError::InvalidEmail(e.0))?;
        match self.subscriptions.get_member(&self.list_name, &email).await {
            Ok(member) => Ok(Some(member)),
            Err(SubscriptionError::NotFound(..)) => Ok(None),
            Err(SubscriptionError::Remote(e)) => Err(LookupRemoteStatusError::Remote(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        ports::mailing::{MemberStatus, MockMailingApi},
        services::subscription::{SubscriptionService, SubscriptionServiceImpl},
    };

    use super::*;

    const LIST: &str = "MailingList";

    fn use_case(
        api: &MockMailingApi,
    ) -> LookupRemoteStatusUseCaseImpl<SubscriptionServiceImpl<MockMailingApi>> {
        LookupRemoteStatusUseCaseImpl::new(
            Arc::new(SubscriptionServiceImpl::new(Arc::new(api.clone()))),
            LIST.to_string(),
        )
    }

    #[tokio::test]
    async fn reports_subscribed_member_with_deterministic_id() {
        let api = MockMailingApi::default();
        api.add_list(LIST);
        let email = EmailAddress::parse("a@b.com").unwrap();
        SubscriptionServiceImpl::new(Arc::new(api.clone()))
            .upsert_member(LIST, &email, &[])
            .await
            .unwrap();

        let member = use_case(&api)
            .lookup_remote_status("a@b.com")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(member.id, email.member_id());
        assert_eq!(member.status, MemberStatus::Subscribed);
    }

    #[tokio::test]
    async fn absence_is_a_normal_answer() {
        let api = MockMailingApi::default();
        api.add_list(LIST);

        let member = use_case(&api)
            .lookup_remote_status("stranger@example.com")
            .await
            .unwrap();

        assert!(member.is_none());
    }
}
