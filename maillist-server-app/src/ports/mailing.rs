use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use serde::{Deserialize, Serialize};

pub type MailingApiResult<T> = Result<T, MailingApiError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MailingApiError {
    #[error("remote resource not found")]
    NotFound,
    #[error("mailing service rejected the request ({status}): {detail}")]
    Api { status: u16, detail: String },
    #[error("mailing service unreachable: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteList {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestCategory {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interest {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Subscribed,
    Unsubscribed,
    Pending,
    Cleaned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMember {
    pub id: String,
    pub email_address: String,
    pub status: MemberStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberWriteRequest {
    pub email_address: String,
    pub status: MemberStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TagStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberTag {
    pub name: String,
    pub status: TagStatus,
}

impl MemberTag {
    pub fn active(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: TagStatus::Active,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListContact {
    pub company: String,
    pub address1: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignDefaults {
    pub from_name: String,
    pub from_email: String,
    pub subject: String,
    pub language: String,
}

/// Settings payload for list creation.
#[derive(Debug, Clone, Serialize)]
pub struct ListSettings {
    pub name: String,
    pub contact: ListContact,
    pub permission_reminder: String,
    pub campaign_defaults: CampaignDefaults,
    pub email_type_option: bool,
}

/// Raw operations of the remote marketing API. Members are addressed by the
/// deterministic id computed from the normalized email, never by the address
/// itself.
#[async_trait::async_trait]
pub trait MailingApi {
    async fn get_lists(&self) -> MailingApiResult<Vec<RemoteList>>;
    async fn create_list(&self, settings: &ListSettings) -> MailingApiResult<RemoteList>;
    async fn get_interest_categories(
        &self,
        list_id: &str,
    ) -> MailingApiResult<Vec<InterestCategory>>;
    async fn get_interests(
        &self,
        list_id: &str,
        category_id: &str,
    ) -> MailingApiResult<Vec<Interest>>;
    async fn get_member(&self, list_id: &str, member_id: &str) -> MailingApiResult<RemoteMember>;
    async fn put_member(
        &self,
        list_id: &str,
        member_id: &str,
        body: &MemberWriteRequest,
    ) -> MailingApiResult<RemoteMember>;
    async fn tag_member(
        &self,
        list_id: &str,
        member_id: &str,
        tags: &[MemberTag],
    ) -> MailingApiResult<()>;
    async fn delete_member(&self, list_id: &str, member_id: &str) -> MailingApiResult<()>;
}

#[derive(Default)]
pub struct MockMailingState {
    pub lists: Vec<RemoteList>,
    /// (list id, category)
    pub categories: Vec<(String, InterestCategory)>,
    /// (category id, interest)
    pub interests: Vec<(String, Interest)>,
    /// keyed by (list id, member id)
    pub members: BTreeMap<(String, String), RemoteMember>,
    pub member_tags: BTreeMap<(String, String), Vec<String>>,
    /// When set, member PUT and DELETE calls fail with a transport error.
    pub fail_member_writes: bool,
    /// Number of upcoming tag calls that fail with a transport error.
    pub fail_tag_calls: u32,
    pub put_member_calls: u32,
    pub tag_member_calls: u32,
    pub delete_member_calls: u32,
}

#[derive(Clone, Default)]
pub struct MockMailingApi {
    pub state: Arc<Mutex<MockMailingState>>,
}

#[allow(unused)]
impl MockMailingApi {
    pub fn add_list(&self, name: &str) -> String {
        let mut state = self.state.lock().unwrap();
        let id = format!("list-{}", state.lists.len() + 1);
        state.lists.push(RemoteList {
            id: id.clone(),
            name: name.to_string(),
        });
        id
    }

    /// Registers an interest category and a matching interest, both carrying
    /// the group's display name, the way the remote service models groups.
    pub fn add_group(&self, list_id: &str, name: &str) -> String {
        let mut state = self.state.lock().unwrap();
        let category_id = format!("cat-{}", state.categories.len() + 1);
        let interest_id = format!("interest-{}", state.interests.len() + 1);
        state.categories.push((
            list_id.to_string(),
            InterestCategory {
                id: category_id.clone(),
                title: name.to_string(),
            },
        ));
        state.interests.push((
            category_id,
            Interest {
                id: interest_id.clone(),
                name: name.to_string(),
            },
        ));
        interest_id
    }

    pub fn member(&self, list_id: &str, member_id: &str) -> Option<RemoteMember> {
        self.state
            .lock()
            .unwrap()
            .members
            .get(&(list_id.to_string(), member_id.to_string()))
            .cloned()
    }

    pub fn tags_of(&self, list_id: &str, member_id: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .member_tags
            .get(&(list_id.to_string(), member_id.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_fail_member_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_member_writes = fail;
    }

    pub fn set_fail_tag_calls(&self, count: u32) {
        self.state.lock().unwrap().fail_tag_calls = count;
    }

    pub fn put_member_calls(&self) -> u32 {
        self.state.lock().unwrap().put_member_calls
    }

    pub fn tag_member_calls(&self) -> u32 {
        self.state.lock().unwrap().tag_member_calls
    }

    pub fn delete_member_calls(&self) -> u32 {
        self.state.lock().unwrap().delete_member_calls
    }
}

#[async_trait::async_trait]
impl MailingApi for MockMailingApi {
    async fn get_lists(&self) -> MailingApiResult<Vec<RemoteList>> {
        Ok(self.state.lock().unwrap().lists.clone())
    }

    async fn create_list(&self, settings: &ListSettings) -> MailingApiResult<RemoteList> {
        let mut state = self.state.lock().unwrap();
        let list = RemoteList {
            id: format!("list-{}", state.lists.len() + 1),
            name: settings.name.clone(),
        };
        state.lists.push(list.clone());
        Ok(list)
    }

    async fn get_interest_categories(
        &self,
        list_id: &str,
    ) -> MailingApiResult<Vec<InterestCategory>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .categories
            .iter()
            .filter(|(owner, _)| owner == list_id)
            .map(|(_, category)| category.clone())
            .collect())
    }

    async fn get_interests(
        &self,
        list_id: &str,
        category_id: &str,
    ) -> MailingApiResult<Vec<Interest>> {
        let _ = list_id;
        Ok(self
            .state
            .lock()
            .unwrap()
            .interests
            .iter()
            .filter(|(owner, _)| owner == category_id)
            .map(|(_, interest)| interest.clone())
            .collect())
    }

    async fn get_member(&self, list_id: &str, member_id: &str) -> MailingApiResult<RemoteMember> {
        self.member(list_id, member_id)
            .ok_or(MailingApiError::NotFound)
    }

    async fn put_member(
        &self,
        list_id: &str,
        member_id: &str,
        body: &MemberWriteRequest,
    ) -> MailingApiResult<RemoteMember> {
        let mut state = self.state.lock().unwrap();
        state.put_member_calls += 1;
        if state.fail_member_writes {
            return Err(MailingApiError::Transport(
                "mailing service offline".to_string(),
            ));
        }
        let member = RemoteMember {
            id: member_id.to_string(),
            email_address: body.email_address.clone(),
            status: body.status,
        };
        state
            .members
            .insert((list_id.to_string(), member_id.to_string()), member.clone());
        Ok(member)
    }

    async fn tag_member(
        &self,
        list_id: &str,
        member_id: &str,
        tags: &[MemberTag],
    ) -> MailingApiResult<()> {
        let mut state = self.state.lock().unwrap();
        state.tag_member_calls += 1;
        if state.fail_tag_calls > 0 {
            state.fail_tag_calls -= 1;
            return Err(MailingApiError::Transport(
                "mailing service offline".to_string(),
            ));
        }
        let key = (list_id.to_string(), member_id.to_string());
        if !state.members.contains_key(&key) {
            return Err(MailingApiError::NotFound);
        }
        let applied = state.member_tags.entry(key).or_default();
        for tag in tags {
            if tag.status == TagStatus::Active && !applied.contains(&tag.name) {
                applied.push(tag.name.clone());
            }
        }
        Ok(())
    }

    async fn delete_member(&self, list_id: &str, member_id: &str) -> MailingApiResult<()> {
        let mut state = self.state.lock().unwrap();
        state.delete_member_calls += 1;
        if state.fail_member_writes {
            return Err(MailingApiError::Transport(
                "mailing service offline".to_string(),
            ));
        }
        let key = (list_id.to_string(), member_id.to_string());
        if state.members.remove(&key).is_none() {
            return Err(MailingApiError::NotFound);
        }
        state.member_tags.remove(&key);
        Ok(())
    }
}
