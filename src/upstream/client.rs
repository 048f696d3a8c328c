//! Blocking HTTP client for the upstream catalog API: per-call timeout, User-Agent, and a
//! shared retry policy.

use crate::feed::{FeedPage, FeedQuery, FeedSource};
use crate::model::RawChapterRecord;
use crate::upstream::retry::{RetryPolicy, Sleeper, ThreadSleeper};
use crate::upstream::wire::{decode_entries, ChapterEntry, FeedEnvelope};
use crate::upstream::{validate_id, UpstreamError};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.mangadex.org";
const DEFAULT_USER_AGENT: &str = "MangaReader/1.0";
/// Upper bound for any single upstream call, so one slow page cannot stall an aggregation.
const DEFAULT_TIMEOUT_SECS: u64 = 8;
const MAX_REDIRECTS: usize = 5;

/// Client for the catalog API. Cheap to share by reference across threads.
pub struct ApiClient {
    inner: reqwest::blocking::Client,
    base_url: String,
    retry: RetryPolicy,
    sleeper: Box<dyn Sleeper + Send + Sync>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Client with default base URL, User-Agent, timeout, and retry policy.
    pub fn new() -> Result<Self, UpstreamError> {
        Self::builder().build()
    }

    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn sleeper(&self) -> &dyn Sleeper {
        &*self.sleeper
    }

    /// GET `{base}{path}` once and decode the JSON body into `T`.
    ///
    /// Non-2xx is [`UpstreamError::HttpStatus`]; a body that is not JSON is
    /// [`UpstreamError::InvalidJson`]; JSON of the wrong shape is
    /// [`UpstreamError::MalformedPayload`].
    pub fn get_json_once<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, UpstreamError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, ?query, "GET");
        let response = self
            .inner
            .get(&url)
            .query(query)
            .send()
            .map_err(|e| UpstreamError::from_send(&url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::HttpStatus {
                status: status.as_u16(),
                url,
            });
        }
        let body = response.text().map_err(|e| UpstreamError::BodyRead {
            url: url.clone(),
            source: e,
        })?;
        let value: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| UpstreamError::InvalidJson {
                url: url.clone(),
                reason: e.to_string(),
            })?;
        serde_json::from_value(value).map_err(|e| UpstreamError::MalformedPayload {
            url,
            reason: e.to_string(),
        })
    }

    /// [`get_json_once`](Self::get_json_once) wrapped in the client's retry policy.
    pub fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, UpstreamError> {
        self.retry
            .run(self.sleeper(), |_| self.get_json_once(path, query))
    }
}

impl FeedSource for ApiClient {
    /// One feed page, single attempt. The fetcher applies retries.
    fn fetch_page(&self, manga_id: &str, query: &FeedQuery<'_>) -> Result<FeedPage, UpstreamError> {
        validate_id(manga_id)?;
        let path = format!("/manga/{}/feed", manga_id);
        let params = [
            ("limit", query.limit.to_string()),
            ("offset", query.offset.to_string()),
            ("translatedLanguage[]", query.language.to_string()),
            ("order[chapter]", "asc".to_string()),
        ];
        let envelope: FeedEnvelope = self.get_json_once(&path, &params)?;
        let data = envelope
            .data
            .ok_or_else(|| UpstreamError::MalformedPayload {
                url: format!("{}{}", self.base_url, path),
                reason: "missing 'data' array".to_string(),
            })?;
        let records: Vec<RawChapterRecord> = decode_entries::<ChapterEntry>(data, "chapter")
            .into_iter()
            .map(Into::into)
            .collect();
        Ok(FeedPage {
            records,
            total: envelope.total,
        })
    }
}

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder {
    base_url: String,
    user_agent: Option<String>,
    timeout_secs: u64,
    retry: RetryPolicy,
    sleeper: Box<dyn Sleeper + Send + Sync>,
}

impl Default for ApiClientBuilder {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry: RetryPolicy::default(),
            sleeper: Box::new(ThreadSleeper),
        }
    }
}

impl ApiClientBuilder {
    /// API root, e.g. `https://api.mangadex.org`. Trailing slashes are dropped.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Per-call timeout in seconds. Default 8. Zero is raised to 1.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs.max(1);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn sleeper(mut self, sleeper: impl Sleeper + Send + Sync + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    pub fn build(self) -> Result<ApiClient, UpstreamError> {
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let inner = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(self.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| UpstreamError::ClientBuild { source: e })?;
        Ok(ApiClient {
            inner,
            base_url: self.base_url,
            retry: self.retry,
            sleeper: self.sleeper,
        })
    }
}
