//! Command-management API client.
//!
//! Three endpoints are used: list, create and delete application commands,
//! either application-wide or per guild. Every call goes through
//! [`ApiClient::send`], which retries rate-limited responses after the wait
//! the platform asks for.

use crate::error::ApiError;
use crate::{ApiResult, Credentials, Scope};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use slashhook_types::{ApiErrorResponse, ApplicationCommand, RemoteCommand};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Attempts per request before giving up on a rate limit.
pub const MAX_ATTEMPTS: u32 = 3;

/// Added on top of the platform's `retry_after` before retrying.
pub const RETRY_MARGIN: Duration = Duration::from_millis(100);

const MAX_RETRY_AFTER_SECS: f64 = 3600.0;

/// Default API root, including the version segment.
pub const DEFAULT_API_BASE_URL: &str = "https://discord.com/api/v10";

/// A single HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Performs one HTTP attempt. Authentication and content type are the
/// transport's concern.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> ApiResult<ApiResponse>;
}

/// [`HttpTransport`] backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(credentials: &Credentials) -> Result<Self, ApiError> {
        let mut auth = HeaderValue::from_str(&credentials.bot_authorization())
            .map_err(|e| ApiError::InvalidHeader(e.to_string()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("slashhook/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        let mut builder = self.http.request(request.method, &request.url);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        Ok(ApiResponse { status, body })
    }
}

/// Waits out a rate limit. Swappable so tests don't sleep for real.
pub type SleepFn = Arc<dyn Fn(Duration) -> BoxFuture<'static, ()> + Send + Sync>;

fn tokio_sleep() -> SleepFn {
    Arc::new(|duration| tokio::time::sleep(duration).boxed())
}

/// The command operations the syncer needs.
#[async_trait]
pub trait CommandApi: Send + Sync {
    async fn list(&self, scope: &Scope) -> ApiResult<Vec<RemoteCommand>>;

    /// Register a command. Fails with [`ApiError::AlreadyExists`] when an
    /// identical command is already registered.
    async fn create(&self, scope: &Scope, command: &ApplicationCommand) -> ApiResult<()>;

    async fn delete(&self, scope: &Scope, command_id: &str) -> ApiResult<()>;
}

/// Retrying client for the command-management API.
///
/// Holds no mutable state; share it freely behind an `Arc`.
#[derive(Clone)]
pub struct ApiClient {
    application_url: String,
    transport: Arc<dyn HttpTransport>,
    sleep: SleepFn,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("application_url", &self.application_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Client for `credentials`' application using the reqwest transport.
    pub fn new(credentials: &Credentials, base_url: &str) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(credentials)?;
        Ok(Self::with_transport(
            base_url,
            &credentials.client_id,
            Arc::new(transport),
        ))
    }

    pub fn with_transport(
        base_url: &str,
        application_id: &str,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            application_url: format!(
                "{}/applications/{}",
                base_url.trim_end_matches('/'),
                application_id
            ),
            transport,
            sleep: tokio_sleep(),
        }
    }

    /// Replace the rate-limit wait.
    pub fn with_sleep(mut self, sleep: SleepFn) -> Self {
        self.sleep = sleep;
        self
    }

    fn commands_url(&self, scope: &Scope) -> String {
        format!("{}/{}", self.application_url, scope.commands_path())
    }

    /// Send a request, retrying while rate limited.
    ///
    /// 401 and 403 fail immediately. 429 waits `retry_after` plus
    /// [`RETRY_MARGIN`] and tries again, up to [`MAX_ATTEMPTS`] attempts.
    /// Any other status is returned as-is. Transport failures are not retried.
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> ApiResult<ApiResponse> {
        for attempt in 1..=MAX_ATTEMPTS {
            let request = ApiRequest {
                method: method.clone(),
                url: url.to_string(),
                body: body.clone(),
            };
            let response = self.transport.execute(request).await?;

            match response.status {
                403 => return Err(ApiError::Forbidden),
                401 => return Err(ApiError::Unauthorized),
                429 => {
                    let wait = retry_delay(&response.body)?;
                    warn!(
                        target: "slashhook::api",
                        "Rate limited on {} {} (attempt {}/{}), retrying in {:?}",
                        method, url, attempt, MAX_ATTEMPTS, wait
                    );
                    if attempt < MAX_ATTEMPTS {
                        (self.sleep)(wait).await;
                    }
                }
                status => {
                    debug!(target: "slashhook::api", "{} {} -> {}", method, url, status);
                    return Ok(response);
                }
            }
        }

        Err(ApiError::MaxRetriesExceeded {
            attempts: MAX_ATTEMPTS,
        })
    }
}

fn retry_delay(body: &[u8]) -> Result<Duration, ApiError> {
    let parsed: ApiErrorResponse = serde_json::from_slice(body)?;
    let seconds = if parsed.retry_after.is_finite() {
        parsed.retry_after.clamp(0.0, MAX_RETRY_AFTER_SECS)
    } else {
        0.0
    };
    Ok(Duration::from_secs_f64(seconds) + RETRY_MARGIN)
}

#[async_trait]
impl CommandApi for ApiClient {
    async fn list(&self, scope: &Scope) -> ApiResult<Vec<RemoteCommand>> {
        let response = self
            .send(Method::GET, &self.commands_url(scope), None)
            .await?;
        if response.status != 200 {
            return Err(ApiError::status(response.status, &response.body));
        }
        Ok(serde_json::from_slice(&response.body)?)
    }

    async fn create(&self, scope: &Scope, command: &ApplicationCommand) -> ApiResult<()> {
        let body = serde_json::to_vec(command)?;
        let response = self
            .send(Method::POST, &self.commands_url(scope), Some(body))
            .await?;
        match response.status {
            201 => Ok(()),
            200 => Err(ApiError::AlreadyExists),
            status => Err(ApiError::status(status, &response.body)),
        }
    }

    async fn delete(&self, scope: &Scope, command_id: &str) -> ApiResult<()> {
        let url = format!("{}/{}", self.commands_url(scope), command_id);
        let response = self.send(Method::DELETE, &url, None).await?;
        if response.status != 204 {
            return Err(ApiError::status(response.status, &response.body));
        }
        Ok(())
    }
}
