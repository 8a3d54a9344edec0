use std::time::Duration;

use daosync_domain::constants::{DEFAULT_API_MAX_ATTEMPTS, DEFAULT_API_TIMEOUT_SECS};
use daosync_domain::{ApiConfig, DaoSyncError};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use tracing::debug;

use super::rate_limit::parse_rate_limit;
use crate::errors::InfraError;

const USER_AGENT: &str = concat!("daosync/", env!("CARGO_PKG_VERSION"));
const MAX_BACKOFF_SHIFT: u32 = 6;

/// HTTP transport for the remote timeline API.
///
/// Connect failures, timeouts and 5xx responses are retried with exponential
/// backoff until `max_attempts` is spent; the last response is handed back
/// for the caller to classify. A 429 is never retried, and neither is a 5xx
/// whose rate-limit headers report an empty window before its reset.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    max_attempts: usize,
    base_backoff: Duration,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Client using the timeout and attempt budget of the API section.
    pub fn from_config(config: &ApiConfig) -> Result<Self, DaoSyncError> {
        Self::builder().timeout(config.timeout()).max_attempts(config.max_attempts).build()
    }

    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Send `builder`, retrying transient failures.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, DaoSyncError> {
        for attempt in 1..=self.max_attempts {
            let last = attempt == self.max_attempts;
            let request = builder
                .try_clone()
                .ok_or_else(|| DaoSyncError::Internal("request body cannot be replayed".into()))?
                .build()
                .map_err(|err| DaoSyncError::from(InfraError::from(err)))?;
            let path = request.url().path().to_string();

            match self.client.execute(request).await {
                Ok(response) if !last && is_transient(&response) => {
                    debug!(attempt, %path, status = %response.status(), "server error, retrying");
                }
                Ok(response) => return Ok(response),
                Err(err) if !last && (err.is_timeout() || err.is_connect()) => {
                    debug!(attempt, %path, error = %err, "transport failure, retrying");
                }
                Err(err) => return Err(InfraError::from(err).into()),
            }

            tokio::time::sleep(self.backoff_delay(attempt)).await;
        }

        Err(DaoSyncError::Internal("http client allows no attempts".into()))
    }

    /// Delay after the `attempt`-th failure
    fn backoff_delay(&self, attempt: usize) -> Duration {
        let shift =
            u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX).min(MAX_BACKOFF_SHIFT);
        self.base_backoff.saturating_mul(1 << shift)
    }
}

fn is_transient(response: &Response) -> bool {
    response.status().is_server_error()
        && !parse_rate_limit(response.headers()).is_some_and(|window| window.remaining == 0)
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: usize,
    base_backoff: Duration,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_API_TIMEOUT_SECS),
            max_attempts: DEFAULT_API_MAX_ATTEMPTS,
            base_backoff: Duration::from_millis(250),
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total attempts per request, the first one included.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    pub fn build(self) -> Result<HttpClient, DaoSyncError> {
        let client = ReqwestClient::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .no_proxy()
            .build()
            .map_err(InfraError::from)?;

        Ok(HttpClient { client, max_attempts: self.max_attempts, base_backoff: self.base_backoff })
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use reqwest::StatusCode;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::http::rate_limit::{RATE_LIMIT_LIMIT, RATE_LIMIT_REMAINING, RATE_LIMIT_RESET};

    fn client(max_attempts: usize) -> HttpClient {
        HttpClient::builder()
            .base_backoff(Duration::from_millis(1))
            .max_attempts(max_attempts)
            .build()
            .expect("http client")
    }

    fn spent_window(status: u16) -> ResponseTemplate {
        ResponseTemplate::new(status)
            .insert_header(RATE_LIMIT_LIMIT, "900")
            .insert_header(RATE_LIMIT_REMAINING, "0")
            .insert_header(RATE_LIMIT_RESET, "1700000600")
    }

    async fn get(client: &HttpClient, url: String) -> Result<Response, DaoSyncError> {
        client.send(client.request(Method::GET, url)).await
    }

    #[tokio::test]
    async fn requests_identify_as_daosync() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("user-agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let response = get(&client(1), server.uri()).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn transient_outage_is_ridden_out() {
        let server = MockServer::start().await;
        Mock::given(path("/tweets"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(path("/tweets"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"data":[]}"#))
            .expect(1)
            .mount(&server)
            .await;

        let response = get(&client(3), format!("{}/tweets", server.uri())).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn throttled_response_is_returned_with_its_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(spent_window(429)).expect(1).mount(&server).await;

        let response = get(&client(3), server.uri()).await.expect("response");

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let window = parse_rate_limit(response.headers()).expect("headers kept");
        assert_eq!(window.remaining, 0);
    }

    #[tokio::test]
    async fn server_error_with_spent_window_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(spent_window(503)).expect(1).mount(&server).await;

        let response = get(&client(3), server.uri()).await.expect("response");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn persistent_server_error_is_handed_back_after_the_last_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .expect(2)
            .mount(&server)
            .await;

        let response = get(&client(2), server.uri()).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn unreachable_api_is_a_network_error() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
            listener.local_addr().expect("local addr")
        };

        let result = get(&client(2), format!("http://{addr}/tweets")).await;
        assert!(matches!(result, Err(DaoSyncError::Network(_))), "got {result:?}");
    }

    #[test]
    fn backoff_grows_geometrically_up_to_a_ceiling() {
        let client = HttpClient::builder()
            .base_backoff(Duration::from_millis(250))
            .build()
            .expect("http client");

        assert_eq!(client.backoff_delay(1), Duration::from_millis(250));
        assert_eq!(client.backoff_delay(3), Duration::from_secs(1));
        assert_eq!(client.backoff_delay(7), Duration::from_secs(16));
        assert_eq!(client.backoff_delay(40), Duration::from_secs(16));
    }
}
