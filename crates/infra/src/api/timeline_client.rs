//! Timeline API client for a v2-style social REST API
//!
//! Implements the `TimelineApi` port on top of [`HttpClient`]. Every response,
//! failed ones included, carries the server's rate-limit headers back to the
//! caller so the orchestrator can resynchronise its local budget.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use daosync_core::TimelineApi;
use daosync_domain::constants::TIMELINE_PAGE_SIZE;
use daosync_domain::{
    ApiConfig, ApiFailure, ApiResponse, ApiResult, DaoSyncError, EngagementMetrics, PostMetrics,
    Result as DomainResult, TimelineItem, TimelinePage, TrackedAccount,
};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::errors::ApiError;
use crate::http::{parse_rate_limit, HttpClient};

/// Timeline and metrics lookups authenticated with a bearer token
#[derive(Clone)]
pub struct HttpTimelineClient {
    http: HttpClient,
    base_url: String,
    bearer_token: String,
}

impl HttpTimelineClient {
    /// Build a client from the API section of the configuration
    ///
    /// # Errors
    /// `DaoSyncError::Config` when no bearer token is configured.
    pub fn new(config: &ApiConfig) -> DomainResult<Self> {
        let token = config
            .bearer_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| DaoSyncError::Config("api.bearer_token is not configured".into()))?;

        Ok(Self::with_http_client(HttpClient::from_config(config)?, &config.base_url, token))
    }

    pub fn with_http_client(http: HttpClient, base_url: &str, bearer_token: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer_token: bearer_token.to_string(),
        }
    }

    /// GET `path` and decode the body
    ///
    /// Rate-limit headers are read before the status is checked, so error
    /// responses report them too.
    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> ApiResult<T> {
        let request = self
            .http
            .request(Method::GET, format!("{}{path}", self.base_url))
            .bearer_auth(&self.bearer_token)
            .query(query);

        let response = self.http.send(request).await?;
        let status = response.status();
        let rate_limit = parse_rate_limit(response.headers());
        let fail = |err: ApiError| ApiFailure::new(err.into(), rate_limit);

        let body = response
            .bytes()
            .await
            .map_err(|err| fail(ApiError::Network(format!("failed to read {path} body: {err}"))))?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&body);
            return Err(fail(ApiError::from_status(status, path, body.trim())));
        }

        let data = serde_json::from_slice(&body)
            .map_err(|err| fail(ApiError::Malformed(format!("{path}: {err}"))))?;

        Ok(ApiResponse::new(data, rate_limit))
    }
}

impl fmt::Debug for HttpTimelineClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTimelineClient")
            .field("base_url", &self.base_url)
            .field("bearer_token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl TimelineApi for HttpTimelineClient {
    #[instrument(skip(self, account, page_token), fields(account = %account.handle))]
    async fn list_timeline(
        &self,
        account: &TrackedAccount,
        since: DateTime<Utc>,
        page_token: Option<&str>,
    ) -> ApiResult<TimelinePage> {
        let path = format!("/users/{}/tweets", account.platform_user_id);
        let mut query = vec![
            ("start_time", since.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("max_results", TIMELINE_PAGE_SIZE.to_string()),
            ("tweet.fields", "created_at,public_metrics".to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("pagination_token", token.to_string()));
        }

        let response: ApiResponse<Envelope> = self.get(&path, &query).await?;
        let rate_limit = response.rate_limit;
        let Envelope { data, meta } = response.data;

        let items = data
            .into_iter()
            .map(WirePost::into_timeline_item)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| ApiFailure::new(err.into(), rate_limit))?;
        let next_token = meta.and_then(|meta| meta.next_token);

        debug!(items = items.len(), more = next_token.is_some(), "timeline page fetched");
        Ok(ApiResponse::new(TimelinePage { items, next_token }, rate_limit))
    }

    #[instrument(skip(self, ids), fields(ids = ids.len()))]
    async fn fetch_metrics(&self, ids: &[String]) -> ApiResult<Vec<PostMetrics>> {
        if ids.is_empty() {
            return Ok(ApiResponse::bare(Vec::new()));
        }

        let query = [("ids", ids.join(",")), ("tweet.fields", "public_metrics".to_string())];
        let response: ApiResponse<Envelope> = self.get("/tweets", &query).await?;

        let metrics: Vec<PostMetrics> = response
            .data
            .data
            .into_iter()
            .map(|post| PostMetrics { metrics: post.metrics(), id: post.id })
            .collect();

        // Deleted or protected posts are silently absent from lookups
        if metrics.len() < ids.len() {
            debug!(requested = ids.len(), returned = metrics.len(), "metrics lookup was partial");
        }
        Ok(ApiResponse::new(metrics, response.rate_limit))
    }
}

/* -------------------------------------------------------------------------- */
/* Wire Format */
/* -------------------------------------------------------------------------- */

/// `data` is omitted entirely when a query matches nothing
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Vec<WirePost>,
    meta: Option<Meta>,
}

#[derive(Debug, Deserialize)]
struct Meta {
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WirePost {
    id: String,
    #[serde(default)]
    text: String,
    created_at: Option<DateTime<Utc>>,
    public_metrics: Option<WireMetrics>,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
struct WireMetrics {
    #[serde(default)]
    like_count: u64,
    #[serde(default)]
    retweet_count: u64,
    #[serde(default)]
    reply_count: u64,
    #[serde(default)]
    quote_count: u64,
}

impl WirePost {
    fn metrics(&self) -> EngagementMetrics {
        let wire = self.public_metrics.unwrap_or_default();
        EngagementMetrics {
            likes: wire.like_count,
            reposts: wire.retweet_count,
            replies: wire.reply_count,
            quotes: wire.quote_count,
        }
    }

    fn into_timeline_item(self) -> Result<TimelineItem, ApiError> {
        let metrics = self.metrics();
        let created_at = self
            .created_at
            .ok_or_else(|| ApiError::Malformed(format!("post {} has no created_at", self.id)))?;

        Ok(TimelineItem { id: self.id, created_at, text: self.text, metrics })
    }
}
