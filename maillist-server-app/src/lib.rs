use std::sync::Arc;

use crate::{
    ports::{mailing::MailingApi, record_store::RecordStore},
    services::subscription::SubscriptionServiceImpl,
    workflow::subscriber::{
        add::{AddSubscriberWorkflow, AddSubscriberWorkflowImpl},
        get::{GetSubscriberUseCase, GetSubscriberUseCaseImpl},
        list::{ListSubscribersUseCase, ListSubscribersUseCaseImpl},
        lookup::{LookupRemoteStatusUseCase, LookupRemoteStatusUseCaseImpl},
        remove::{RemoveSubscriberWorkflow, RemoveSubscriberWorkflowImpl},
    },
};

pub mod domain;
pub mod ports;
pub mod services;
pub mod workflow;

/// Mailing-list configuration shared by the workflows, constructed once at
/// startup and passed in explicitly.
#[derive(Debug, Clone)]
pub struct MailingListConfig {
    /// Display name of the remote list every operation targets.
    pub list_name: String,
}

pub struct Application {
    pub add_subscriber_workflow: Box<dyn AddSubscriberWorkflow + Send + Sync + 'static>,
    pub remove_subscriber_workflow: Box<dyn RemoveSubscriberWorkflow + Send + Sync + 'static>,
    pub get_subscriber_use_case: Box<dyn GetSubscriberUseCase + Send + Sync + 'static>,
    pub list_subscribers_use_case: Box<dyn ListSubscribersUseCase + Send + Sync + 'static>,
    pub lookup_remote_status_use_case: Box<dyn LookupRemoteStatusUseCase + Send + Sync + 'static>,
}

pub fn build_application<R, M>(
    record_store: Arc<R>,
    mailing_api: Arc<M>,
    config: MailingListConfig,
) -> Application
where
    R: RecordStore + Send + Sync + 'static,
    M: MailingApi + Send + Sync + 'static,
{
    let subscription_service = Arc::new(SubscriptionServiceImpl::new(mailing_api));

    Application {
        add_subscriber_workflow: Box::new(AddSubscriberWorkflowImpl::new(
            record_store.clone(),
            subscription_service.clone(),
            config.list_name.clone(),
        )),
        remove_subscriber_workflow: Box::new(RemoveSubscriberWorkflowImpl::new(
            record_store.clone(),
            subscription_service.clone(),
            config.list_name.clone(),
        )),
        get_subscriber_use_case: Box::new(GetSubscriberUseCaseImpl::new(record_store.clone())),
        list_subscribers_use_case: Box::new(ListSubscribersUseCaseImpl::new(record_store.clone())),
        lookup_remote_status_use_case: Box::new(LookupRemoteStatusUseCaseImpl::new(
            subscription_service,
            config.list_name,
        )),
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        domain::subscriber::EmailAddress,
        ports::mailing::{MemberStatus, MockMailingApi},
        ports::record_store::MockRecordStore,
        workflow::subscriber::remove::RemoveSubscriberError,
    };

    use super::*;

    #[tokio::test]
    async fn subscriber_lifecycle_round_trip() {
        let store = MockRecordStore::default();
        let api = MockMailingApi::default();
        let list_id = api.add_list("MailingList");
        api.add_group(&list_id, "General");
        let app = build_application(
            Arc::new(store.clone()),
            Arc::new(api.clone()),
            MailingListConfig {
                list_name: "MailingList".to_string(),
            },
        );

        app.add_subscriber_workflow
            .add_subscriber("a@b.com", Some("General"))
            .await
            .unwrap();

        let record = app
            .get_subscriber_use_case
            .get_subscriber("a@b.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.email, "a@b.com");

        let member = app
            .lookup_remote_status_use_case
            .lookup_remote_status("a@b.com")
            .await
            .unwrap()
            .unwrap();
        let member_id = EmailAddress::parse("a@b.com").unwrap().member_id();
        assert_eq!(member.id, member_id);
        assert_eq!(member.status, MemberStatus::Subscribed);
        assert_eq!(
            api.tags_of(&list_id, &member_id),
            vec!["newsletter".to_string()]
        );

        app.remove_subscriber_workflow
            .remove_subscriber("a@b.com")
            .await
            .unwrap();
        assert!(
            app.get_subscriber_use_case
                .get_subscriber("a@b.com")
                .await
                .unwrap()
                .is_none()
        );
        assert!(matches!(
            app.remove_subscriber_workflow
                .remove_subscriber("a@b.com")
                .await,
            Err(RemoveSubscriberError::NotFound(..))
        ));
    }
}
