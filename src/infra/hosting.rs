//! HTTP+JSON client for the revision-hosting API.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::application::hosting::{ChangeRequestSource, HostingError};
use crate::config::HostingSettings;
use crate::domain::change_request::ChangeRequest;

const SOURCE: &str = "infra::hosting";

#[derive(Clone, Debug)]
pub struct HostingClient {
    client: Client,
    pulls: Url,
    access_token: Option<String>,
}

impl HostingClient {
    pub fn new(api_base: &Url, settings: &HostingSettings) -> Result<Self, HostingError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| HostingError::Transport(err.to_string()))?;
        Self::with_client(client, api_base, settings.access_token.clone())
    }

    pub fn with_client(
        client: Client,
        api_base: &Url,
        access_token: Option<String>,
    ) -> Result<Self, HostingError> {
        let mut base = api_base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let pulls = base
            .join("pulls")
            .map_err(|err| HostingError::Transport(format!("invalid API base: {err}")))?;
        Ok(Self {
            client,
            pulls,
            access_token,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("revdoc/", env!("CARGO_PKG_VERSION"))
    }

    fn url(&self, number: Option<u64>) -> Url {
        let mut url = self.pulls.clone();
        if let Some(number) = number {
            let path = format!("{}/{number}", url.path());
            url.set_path(&path);
        }
        if let Some(token) = self.access_token.as_deref() {
            url.query_pairs_mut().append_pair("access_token", token);
        }
        url
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        url: Url,
        number: Option<u64>,
    ) -> Result<T, HostingError> {
        debug!(target = SOURCE, op = "hosting::fetch", path = url.path(), "GET");
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| HostingError::Transport(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            if let Some(number) = number {
                return Err(HostingError::NotFound { number });
            }
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HostingError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|err| HostingError::Decode(err.to_string()))
    }
}

#[async_trait]
impl ChangeRequestSource for HostingClient {
    async fn list_open(&self) -> Result<Vec<ChangeRequest>, HostingError> {
        self.fetch(self.url(None), None).await
    }

    async fn get(&self, number: u64) -> Result<ChangeRequest, HostingError> {
        self.fetch(self.url(Some(number)), Some(number)).await
    }
}
