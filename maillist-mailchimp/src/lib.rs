use maillist_server_app::ports::mailing::{
    Interest, InterestCategory, ListSettings, MailingApi, MailingApiError, MailingApiResult,
    MemberTag, MemberWriteRequest, RemoteList, RemoteMember,
};
use serde::Deserialize;

/// Connection settings for the Mailchimp v3 REST API, read once at startup.
/// The base URL carries the datacenter prefix, e.g.
/// `https://us1.api.mailchimp.com/3.0`.
pub struct MailchimpConfig {
    pub base_url: String,
    pub api_key: String,
}

impl MailchimpConfig {
    pub fn from_env() -> Self {
        let base_url = std::env::var("MAILLIST_MAILCHIMP_BASE_URL")
            .expect("MAILLIST_MAILCHIMP_BASE_URL env var not set");
        let api_key = std::env::var("MAILLIST_MAILCHIMP_API_KEY")
            .expect("MAILLIST_MAILCHIMP_API_KEY env var not set");
        Self { base_url, api_key }
    }
}

pub struct MailchimpApiAdapter {
    client: reqwest::Client,
    config: MailchimpConfig,
}

#[derive(Deserialize)]
struct ListsEnvelope {
    lists: Vec<RemoteList>,
}

#[derive(Deserialize)]
struct CategoriesEnvelope {
    categories: Vec<InterestCategory>,
}

#[derive(Deserialize)]
struct InterestsEnvelope {
    interests: Vec<Interest>,
}

#[derive(serde::Serialize)]
struct TagsBody<'a> {
    tags: &'a [MemberTag],
}

/// Error document the API returns alongside non-2xx statuses.
#[derive(Deserialize, Default)]
struct ApiProblem {
    #[serde(default)]
    detail: String,
}

impl MailchimpApiAdapter {
    pub fn new(config: MailchimpConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> MailingApiResult<reqwest::Response> {
        let resp = req
            .basic_auth("anystring", Some(&self.config.api_key))
            .send()
            .await
            .map_err(|e| MailingApiError::Transport(e.to_string()))?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(MailingApiError::NotFound);
        }
        if status.is_client_error() || status.is_server_error() {
            let detail = resp
                .json::<ApiProblem>()
                .await
                .unwrap_or_default()
                .detail;
            log::debug!("mailing API rejected request: {} {}", status, detail);
            return Err(MailingApiError::Api {
                status: status.as_u16(),
                detail,
            });
        }
        Ok(resp)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
    ) -> MailingApiResult<T> {
        resp.json::<T>()
            .await
            .map_err(|e| MailingApiError::Transport(e.to_string()))
    }
}

#[async_trait::async_trait]
impl MailingApi for MailchimpApiAdapter {
    async fn get_lists(&self) -> MailingApiResult<Vec<RemoteList>> {
        let resp = self.send(self.client.get(self.url("/lists"))).await?;
        let envelope: ListsEnvelope = Self::read_json(resp).await?;
        Ok(envelope.lists)
    }

    async fn create_list(&self, settings: &ListSettings) -> MailingApiResult<RemoteList> {
        let resp = self
            .send(self.client.post(self.url("/lists")).json(settings))
            .await?;
        Self::read_json(resp).await
    }

    async fn get_interest_categories(
        &self,
        list_id: &str,
    ) -> MailingApiResult<Vec<InterestCategory>> {
        let path = format!("/lists/{}/interest-categories", list_id);
        let resp = self.send(self.client.get(self.url(&path))).await?;
        let envelope: CategoriesEnvelope = Self::read_json(resp).await?;
        Ok(envelope.categories)
    }

    async fn get_interests(
        &self,
        list_id: &str,
        category_id: &str,
    ) -> MailingApiResult<Vec<Interest>> {
        let path = format!(
            "/lists/{}/interest-categories/{}/interests",
            list_id, category_id
        );
        let resp = self.send(self.client.get(self.url(&path))).await?;
        let envelope: InterestsEnvelope = Self::read_json(resp).await?;
        Ok(envelope.interests)
    }

    async fn get_member(&self, list_id: &str, member_id: &str) -> MailingApiResult<RemoteMember> {
        let path = format!("/lists/{}/members/{}", list_id, member_id);
        let resp = self.send(self.client.get(self.url(&path))).await?;
        Self::read_json(resp).await
    }

    async fn put_member(
        &self,
        list_id: &str,
        member_id: &str,
        body: &MemberWriteRequest,
    ) -> MailingApiResult<RemoteMember> {
        let path = format!("/lists/{}/members/{}", list_id, member_id);
        let resp = self
            .send(self.client.put(self.url(&path)).json(body))
            .await?;
        Self::read_json(resp).await
    }

    async fn tag_member(
        &self,
        list_id: &str,
        member_id: &str,
        tags: &[MemberTag],
    ) -> MailingApiResult<()> {
        let path = format!("/lists/{}/members/{}/tags", list_id, member_id);
        self.send(
            self.client
                .post(self.url(&path))
                .json(&TagsBody { tags }),
        )
        .await?;
        Ok(())
    }

    async fn delete_member(&self, list_id: &str, member_id: &str) -> MailingApiResult<()> {
        let path = format!("/lists/{}/members/{}", list_id, member_id);
        self.send(self.client.delete(self.url(&path))).await?;
        Ok(())
    }
}
