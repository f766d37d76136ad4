use std::sync::Arc;

use crate::{
    domain::subscriber::EmailAddress,
    ports::mailing::{
        CampaignDefaults, ListContact, ListSettings, MailingApi, MailingApiError, MemberStatus,
        MemberTag, MemberWriteRequest, RemoteMember,
    },
};

pub type SubscriptionResult<T> = Result<T, SubscriptionError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscriptionError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("mailing service failure: {0}")]
    Remote(MailingApiError),
}

/// Outcome of the tagging step of a member registration. The subscribe call
/// and the tag call are not atomic; a member can end up subscribed without
/// tags, and callers must be able to see that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagOutcome {
    Applied,
    Failed(MailingApiError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRegistration {
    pub member: RemoteMember,
    pub tagging: TagOutcome,
}

/// Remote-side subscription protocol. Lists and groups are resolved by display
/// name on every call — nothing is cached, trading latency for
/// staleness-avoidance. Duplicate names resolve to the first match.
#[async_trait::async_trait]
pub trait SubscriptionService {
    async fn resolve_list(&self, name: &str) -> SubscriptionResult<String>;
    async fn resolve_group(&self, list_name: &str, group_name: &str)
    -> SubscriptionResult<String>;
    async fn create_list(
        &self,
        name: &str,
        contact: ListContact,
        defaults: CampaignDefaults,
    ) -> SubscriptionResult<String>;
    async fn upsert_member(
        &self,
        list_name: &str,
        email: &EmailAddress,
        tags: &[String],
    ) -> SubscriptionResult<MemberRegistration>;
    async fn add_tag(
        &self,
        list_name: &str,
        email: &EmailAddress,
        tag: &str,
    ) -> SubscriptionResult<()>;
    async fn get_member(
        &self,
        list_name: &str,
        email: &EmailAddress,
    ) -> SubscriptionResult<RemoteMember>;
    async fn unsubscribe(&self, list_name: &str, email: &EmailAddress) -> SubscriptionResult<()>;
}

pub struct SubscriptionServiceImpl<M: MailingApi> {
    api: Arc<M>,
}

impl<M> SubscriptionServiceImpl<M>
where
    M: MailingApi + Send + Sync + 'static,
{
    pub fn new(api: Arc<M>) -> Self {
        Self { api }
    }
}

#[async_trait::async_trait]
impl<M> SubscriptionService for SubscriptionServiceImpl<M>
where
    M: MailingApi + Send + Sync + 'static,
{
    async fn resolve_list(&self, name: &str) -> SubscriptionResult<String> {
        let lists = self
            .api
            .get_lists()
            .await
            .map_err(SubscriptionError::Remote)?;
        lists
            .into_iter()
            .find(|list| list.name == name)
            .map(|list| list.id)
            .ok_or_else(|| SubscriptionError::NotFound(format!("list \"{}\"", name)))
    }

    async fn resolve_group(
        &self,
        list_name: &str,
        group_name: &str,
    ) -> SubscriptionResult<String> {
        let list_id = self.resolve_list(list_name).await?;
        let categories = self
            .api
            .get_interest_categories(&list_id)
            .await
            .map_err(SubscriptionError::Remote)?;
        let category = categories
            .into_iter()
            .find(|category| category.title == group_name)
            .ok_or_else(|| {
                SubscriptionError::NotFound(format!(
                    "group \"{}\" in list \"{}\"",
                    group_name, list_name
                ))
            })?;
        let interests = self
            .api
            .get_interests(&list_id, &category.id)
            .await
            .map_err(SubscriptionError::Remote)?;
        interests
            .into_iter()
            .find(|interest| interest.name == group_name)
            .map(|interest| interest.id)
            .ok_or_else(|| {
                SubscriptionError::NotFound(format!(
                    "group \"{}\" in list \"{}\"",
                    group_name, list_name
                ))
            })
    }

    async fn create_list(
        &self,
        name: &str,
        contact: ListContact,
        defaults: CampaignDefaults,
    ) -> SubscriptionResult<String> {
        let settings = ListSettings {
            name: name.to_string(),
            contact,
            permission_reminder: format!(
                "You're receiving this email because you signed up for the {} mailing list.",
                name
            ),
            campaign_defaults: defaults,
            email_type_option: false,
        };
        let list = self
            .api
            .create_list(&settings)
            .await
            .map_err(SubscriptionError::Remote)?;
        log::info!("created mailing list \"{}\" ({})", name, list.id);
        Ok(list.id)
    }

    async fn upsert_member(
        &self,
        list_name: &str,
        email: &EmailAddress,
        tags: &[String],
    ) -> SubscriptionResult<MemberRegistration> {
        let list_id = self.resolve_list(list_name).await?;
        let member_id = email.member_id();
        let body = MemberWriteRequest {
            email_address: email.as_str().to_string(),
            status: MemberStatus::Subscribed,
        };
        let member = self
            .api
            .put_member(&list_id, &member_id, &body)
            .await
            .map_err(SubscriptionError::Remote)?;
        if tags.is_empty() {
            return Ok(MemberRegistration {
                member,
                tagging: TagOutcome::Applied,
            });
        }
        let tag_body: Vec<MemberTag> = tags.iter().map(|tag| MemberTag::active(tag)).collect();
        let tagging = match self.api.tag_member(&list_id, &member_id, &tag_body).await {
            Ok(()) => TagOutcome::Applied,
            Err(e) => {
                log::warn!(
                    "member {} subscribed to \"{}\" but tagging failed: {}",
                    email,
                    list_name,
                    e
                );
                TagOutcome::Failed(e)
            }
        };
        Ok(MemberRegistration { member, tagging })
    }

    async fn add_tag(
        &self,
        list_name: &str,
        email: &EmailAddress,
        tag: &str,
    ) -> SubscriptionResult<()> {
        let list_id = self.resolve_list(list_name).await?;
        let member_id = email.member_id();
        let tag_body = vec![MemberTag::active(tag)];
        match self.api.tag_member(&list_id, &member_id, &tag_body).await {
            Ok(()) => Ok(()),
            Err(MailingApiError::NotFound) => {
                // The member was never subscribed. Subscribe them, then retry
                // the tag exactly once.
                log::info!(
                    "member {} missing from \"{}\", subscribing before tagging",
                    email,
                    list_name
                );
                self.upsert_member(list_name, email, &[]).await?;
                self.api
                    .tag_member(&list_id, &member_id, &tag_body)
                    .await
                    .map_err(SubscriptionError::Remote)
            }
            Err(e) => Err(SubscriptionError::Remote(e)),
        }
    }

    async fn get_member(
        &self,
        list_name: &str,
        email: &EmailAddress,
    ) -> SubscriptionResult<RemoteMember> {
        let list_id = self.resolve_list(list_name).await?;
        match self.api.get_member(&list_id, &email.member_id()).await {
            Ok(member) => Ok(member),
            Err(MailingApiError::NotFound) => Err(SubscriptionError::NotFound(format!(
                "member {} in list \"{}\"",
                email, list_name
            ))),
            Err(e) => Err(SubscriptionError::Remote(e)),
        }
    }

    async fn unsubscribe(&self, list_name: &str, email: &EmailAddress) -> SubscriptionResult<()> {
        let list_id = self.resolve_list(list_name).await?;
        match self.api.delete_member(&list_id, &email.member_id()).await {
            Ok(()) => Ok(()),
            Err(MailingApiError::NotFound) => Err(SubscriptionError::NotFound(format!(
                "member {} in list \"{}\"",
                email, list_name
            ))),
            Err(e) => Err(SubscriptionError::Remote(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ports::mailing::MockMailingApi;

    use super::*;

    const LIST: &str = "MailingList";

    fn service_with_list() -> (MockMailingApi, SubscriptionServiceImpl<MockMailingApi>, String)
    {
        let api = MockMailingApi::default();
        let list_id = api.add_list(LIST);
        let service = SubscriptionServiceImpl::new(Arc::new(api.clone()));
        (api, service, list_id)
    }

    fn email(value: &str) -> EmailAddress {
        EmailAddress::parse(value).unwrap()
    }

    fn contact() -> ListContact {
        ListContact {
            company: "Acme".to_string(),
            address1: "1 Main St".to_string(),
            city: "Ottawa".to_string(),
            state: "Ontario".to_string(),
            zip: "K1A 0A1".to_string(),
            country: "Canada".to_string(),
        }
    }

    fn defaults() -> CampaignDefaults {
        CampaignDefaults {
            from_name: "Acme".to_string(),
            from_email: "noreply@acme.test".to_string(),
            subject: "Acme news".to_string(),
            language: "English".to_string(),
        }
    }

    #[tokio::test]
    async fn resolve_list_matches_by_exact_name() {
        let (api, service, list_id) = service_with_list();
        let other_id = api.add_list("Other");

        assert_eq!(service.resolve_list(LIST).await.unwrap(), list_id);
        assert_eq!(service.resolve_list("Other").await.unwrap(), other_id);
    }

    #[tokio::test]
    async fn resolve_list_first_match_wins_on_duplicates() {
        let (api, service, list_id) = service_with_list();
        api.add_list(LIST);

        assert_eq!(service.resolve_list(LIST).await.unwrap(), list_id);
    }

    #[tokio::test]
    async fn resolve_list_unknown_name_is_not_found() {
        let (_, service, _) = service_with_list();

        assert!(matches!(
            service.resolve_list("Missing").await,
            Err(SubscriptionError::NotFound(..))
        ));
    }

    #[tokio::test]
    async fn resolve_group_walks_categories_then_interests() {
        let (api, service, list_id) = service_with_list();
        let interest_id = api.add_group(&list_id, "General");

        assert_eq!(
            service.resolve_group(LIST, "General").await.unwrap(),
            interest_id
        );
        // Unchanged remote state resolves to the same identifier.
        assert_eq!(
            service.resolve_group(LIST, "General").await.unwrap(),
            interest_id
        );
    }

    #[tokio::test]
    async fn resolve_group_unknown_name_is_not_found() {
        let (api, service, list_id) = service_with_list();
        api.add_group(&list_id, "General");

        assert!(matches!(
            service.resolve_group(LIST, "Sponsors").await,
            Err(SubscriptionError::NotFound(..))
        ));
    }

    #[tokio::test]
    async fn create_list_posts_templated_settings() {
        let (api, service, _) = service_with_list();

        let id = service
            .create_list("Launch", contact(), defaults())
            .await
            .unwrap();
        assert_eq!(service.resolve_list("Launch").await.unwrap(), id);

        // List creation is not idempotent; a second call creates a second list.
        let second = service
            .create_list("Launch", contact(), defaults())
            .await
            .unwrap();
        assert_ne!(id, second);
        assert_eq!(api.state.lock().unwrap().lists.len(), 3);
    }

    #[tokio::test]
    async fn upsert_member_subscribes_with_deterministic_id() {
        let (api, service, list_id) = service_with_list();
        let email = email("Someone@Example.com");

        let registration = service
            .upsert_member(LIST, &email, &["newsletter".to_string()])
            .await
            .unwrap();

        assert_eq!(registration.member.id, email.member_id());
        assert_eq!(registration.member.status, MemberStatus::Subscribed);
        assert_eq!(registration.tagging, TagOutcome::Applied);
        assert!(api.member(&list_id, &email.member_id()).is_some());
        assert_eq!(
            api.tags_of(&list_id, &email.member_id()),
            vec!["newsletter".to_string()]
        );
    }

    #[tokio::test]
    async fn upsert_member_is_idempotent() {
        let (api, service, _) = service_with_list();
        let email = email("someone@example.com");

        let first = service.upsert_member(LIST, &email, &[]).await.unwrap();
        let second = service.upsert_member(LIST, &email, &[]).await.unwrap();

        assert_eq!(first.member, second.member);
        assert_eq!(api.put_member_calls(), 2);
        assert_eq!(api.state.lock().unwrap().members.len(), 1);
    }

    #[tokio::test]
    async fn upsert_member_surfaces_tag_failure_as_partial_success() {
        let (api, service, list_id) = service_with_list();
        let email = email("someone@example.com");
        api.set_fail_tag_calls(1);

        let registration = service
            .upsert_member(LIST, &email, &["newsletter".to_string()])
            .await
            .unwrap();

        assert!(matches!(registration.tagging, TagOutcome::Failed(..)));
        // The member is live without tags, and the caller can see it.
        assert!(api.member(&list_id, &email.member_id()).is_some());
        assert!(api.tags_of(&list_id, &email.member_id()).is_empty());
    }

    #[tokio::test]
    async fn add_tag_resubscribes_missing_member_and_retries_once() {
        let (api, service, list_id) = service_with_list();
        let email = email("stranger@example.com");

        service.add_tag(LIST, &email, "sponsor").await.unwrap();

        assert_eq!(api.put_member_calls(), 1);
        assert_eq!(api.tag_member_calls(), 2);
        assert_eq!(
            api.tags_of(&list_id, &email.member_id()),
            vec!["sponsor".to_string()]
        );
    }

    #[tokio::test]
    async fn add_tag_does_not_retry_other_failures() {
        let (api, service, _) = service_with_list();
        let email = email("someone@example.com");
        service.upsert_member(LIST, &email, &[]).await.unwrap();
        api.set_fail_tag_calls(1);

        assert!(matches!(
            service.add_tag(LIST, &email, "sponsor").await,
            Err(SubscriptionError::Remote(MailingApiError::Transport(..)))
        ));
        // One subscribe from the setup, no repair attempt.
        assert_eq!(api.put_member_calls(), 1);
        assert_eq!(api.tag_member_calls(), 1);
    }

    #[tokio::test]
    async fn get_member_maps_remote_absence_to_not_found() {
        let (_, service, _) = service_with_list();
        let email = email("stranger@example.com");

        assert!(matches!(
            service.get_member(LIST, &email).await,
            Err(SubscriptionError::NotFound(..))
        ));
    }

    #[tokio::test]
    async fn unsubscribe_deletes_member() {
        let (api, service, list_id) = service_with_list();
        let email = email("someone@example.com");
        service.upsert_member(LIST, &email, &[]).await.unwrap();

        service.unsubscribe(LIST, &email).await.unwrap();

        assert!(api.member(&list_id, &email.member_id()).is_none());
        assert!(matches!(
            service.unsubscribe(LIST, &email).await,
            Err(SubscriptionError::NotFound(..))
        ));
    }
}
