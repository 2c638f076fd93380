//! The retry engine.
//!
//! [`Client::execute`] drives one logical request: it sends it through the
//! [`Transport`], resends after connection failures while the retry budget
//! lasts, and hands every response to an [`ErrorHook`] that either accepts
//! it, raises a typed error, or asks for a single replay.

use crate::{
    classify::classify,
    metadata::RequestDescriptor,
    retry::{Backoff, RetryPolicy},
    transport::{PreparedRequest, RawResponse, ReqwestTransport, Transport},
    Error, Response, Result,
};
use async_trait::async_trait;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default content type for request bodies.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// What the engine knows about the attempt a hook is looking at.
#[derive(Debug)]
pub struct RequestContext<'a> {
    /// The request being executed.
    pub descriptor: &'a RequestDescriptor,
    /// 1 for the first send, incremented on every resend.
    pub attempt: usize,
    /// Whether the single replay has already been used.
    pub replayed: bool,
}

impl RequestContext<'_> {
    /// Classifies a failed response into an [`Error::Api`], logging it.
    pub fn failure(&self, response: &RawResponse) -> Error {
        let error = classify(response, &self.descriptor.method);

        if response.status.is_client_error() {
            tracing::error!(
                status = response.status.as_u16(),
                path = %self.descriptor.path,
                response = %response.body,
                "Client error (4xx)"
            );
        } else if response.status.is_server_error() {
            tracing::warn!(
                status = response.status.as_u16(),
                path = %self.descriptor.path,
                response = %response.body,
                "Server error (5xx)"
            );
        }

        Error::from(error)
    }
}

/// The decision of an [`ErrorHook`] about a response.
#[derive(Debug)]
pub enum HookOutcome {
    /// Return this response to the caller.
    Done(RawResponse),
    /// Resend the original request once. The error is raised instead if the
    /// request was already replayed.
    Replay(Error),
}

/// Decides what a response means for the caller.
///
/// The engine calls [`handle`](ErrorHook::handle) for every response,
/// successful or not. HTTP failures are never retried by count; a hook that
/// can recover (for example by refreshing a token) returns
/// [`HookOutcome::Replay`].
#[async_trait]
pub trait ErrorHook: Send + Sync {
    /// Value for the `Authorization` header of this attempt, if any.
    fn authorization(&self, _ctx: &RequestContext<'_>) -> Option<String> {
        None
    }

    /// Accepts, rejects or replays a response.
    async fn handle(&self, response: RawResponse, ctx: &RequestContext<'_>)
        -> Result<HookOutcome>;
}

/// The default hook: 2xx passes through, everything else is classified.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifyHook;

#[async_trait]
impl ErrorHook for ClassifyHook {
    async fn handle(
        &self,
        response: RawResponse,
        ctx: &RequestContext<'_>,
    ) -> Result<HookOutcome> {
        if response.is_success() {
            Ok(HookOutcome::Done(response))
        } else {
            Err(ctx.failure(&response))
        }
    }
}

/// An HTTP client that retries connection failures and delegates HTTP
/// failures to an [`ErrorHook`].
///
/// # Examples
///
/// ```no_run
/// use feedly_client::{Client, metadata::RequestDescriptor};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), feedly_client::Error> {
/// let client = Client::builder()
///     .base_url("https://cloud.feedly.com")?
///     .timeout(Duration::from_secs(5))
///     .retries(2)
///     .build()?;
///
/// let response = client.send(RequestDescriptor::get("/v3/feeds/.mget")).await?;
/// println!("{} after {} attempt(s)", response.status, response.attempts);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    base_url: Url,
    default_headers: HeaderMap,
    retry_policy: RetryPolicy,
    timeout: Duration,
    content_type: HeaderValue,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// The client's connection retry policy.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.inner.retry_policy
    }

    /// Executes a request with the default [`ClassifyHook`].
    pub async fn send(&self, descriptor: RequestDescriptor) -> Result<Response<()>> {
        self.execute(descriptor, &ClassifyHook).await
    }

    /// Executes a request and decodes the JSON body.
    pub async fn call<T>(
        &self,
        descriptor: RequestDescriptor,
        hook: &dyn ErrorHook,
    ) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        self.execute(descriptor, hook).await?.json()
    }

    /// Executes a request.
    ///
    /// Connection failures are resent until the budget (the descriptor's
    /// override, else the client's) is used up, then returned as-is. Every
    /// response goes to `hook`; a [`HookOutcome::Replay`] resends the
    /// original request once without touching the connection budget.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for methods other than GET, POST, PUT
    /// and DELETE, the last connection error once the budget is exhausted,
    /// or whatever error the hook raises.
    pub async fn execute(
        &self,
        mut descriptor: RequestDescriptor,
        hook: &dyn ErrorHook,
    ) -> Result<Response<()>> {
        validate_method(&descriptor.method)?;

        let url = self.url_for(&descriptor)?;
        let body = descriptor
            .body
            .as_ref()
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| Error::SerializationFailed(e.to_string()))?;
        let timeout = descriptor.timeout.unwrap_or(self.inner.timeout);
        let max_retries = descriptor
            .retries
            .unwrap_or(self.inner.retry_policy.max_retries);

        let start_time = Instant::now();
        let mut connection_retries = 0;
        let mut replayed = false;

        loop {
            descriptor.attempts += 1;
            let ctx = RequestContext {
                descriptor: &descriptor,
                attempt: descriptor.attempts,
                replayed,
            };

            let request = PreparedRequest {
                method: descriptor.method.clone(),
                url: url.clone(),
                headers: self.headers_for(&descriptor, body.is_some(), hook.authorization(&ctx))?,
                body: body.clone(),
                timeout,
            };

            tracing::debug!(
                method = %descriptor.method,
                url = %url,
                attempt = ctx.attempt,
                "Executing HTTP request"
            );

            let response = match self.inner.transport.send(request).await {
                Ok(response) => response,
                Err(e) if e.is_connection() => {
                    if !RetryPolicy::allows(max_retries, connection_retries) {
                        tracing::warn!(
                            error = %e,
                            attempt = ctx.attempt,
                            method = %descriptor.method,
                            path = %descriptor.path,
                            "Request failed, retry budget exhausted"
                        );
                        return Err(e);
                    }
                    connection_retries += 1;

                    let delay = self.inner.retry_policy.backoff.delay_for_retry(connection_retries);
                    tracing::warn!(
                        error = %e,
                        attempt = ctx.attempt,
                        method = %descriptor.method,
                        path = %descriptor.path,
                        delay_ms = delay.map(|d| d.as_millis()).unwrap_or(0),
                        "Request failed, retrying"
                    );
                    if let Some(delay) = delay {
                        tokio::time::sleep(delay).await;
                    }
                    continue;
                }
                Err(e) => return Err(e),
            };

            let latency = start_time.elapsed();
            tracing::info!(
                status = response.status.as_u16(),
                latency_ms = latency.as_millis(),
                attempts = ctx.attempt,
                "Received HTTP response"
            );

            match hook.handle(response, &ctx).await? {
                HookOutcome::Done(response) => {
                    return Ok(Response {
                        data: (),
                        raw_body: response.body,
                        status: response.status,
                        headers: response.headers,
                        url: response.url,
                        latency: start_time.elapsed(),
                        attempts: descriptor.attempts,
                    });
                }
                HookOutcome::Replay(error) => {
                    if replayed {
                        return Err(error);
                    }
                    replayed = true;
                    tracing::info!(
                        method = %descriptor.method,
                        path = %descriptor.path,
                        "Replaying request"
                    );
                }
            }
        }
    }

    /// Builds the full URL for a descriptor.
    fn url_for(&self, descriptor: &RequestDescriptor) -> Result<Url> {
        let mut url = self.inner.base_url.clone();
        if descriptor.path.starts_with('/') {
            url.set_path(&descriptor.path);
        } else {
            url.set_path(&format!("/{}", descriptor.path));
        }

        if !descriptor.query_params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &descriptor.query_params {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }

    fn headers_for(
        &self,
        descriptor: &RequestDescriptor,
        has_body: bool,
        authorization: Option<String>,
    ) -> Result<HeaderMap> {
        let mut headers = self.inner.default_headers.clone();

        for (name, value) in &descriptor.headers {
            headers.insert(name, value.clone());
        }

        if has_body {
            headers.insert(header::CONTENT_TYPE, self.inner.content_type.clone());
        }

        if descriptor.authenticated {
            if let Some(authorization) = authorization {
                let value = HeaderValue::try_from(authorization).map_err(|e| {
                    Error::Configuration(format!("Invalid authorization header: {}", e))
                })?;
                headers.insert(header::AUTHORIZATION, value);
            }
        }

        Ok(headers)
    }
}

fn validate_method(method: &Method) -> Result<()> {
    if [Method::GET, Method::POST, Method::PUT, Method::DELETE].contains(method) {
        Ok(())
    } else {
        Err(Error::Configuration(format!(
            "Invalid method: {} Please use GET, POST, PUT, or DELETE.",
            method
        )))
    }
}

/// Builder for configuring and creating a [`Client`].
pub struct ClientBuilder {
    base_url: Option<Url>,
    default_headers: HeaderMap,
    retry_policy: RetryPolicy,
    timeout: Duration,
    content_type: HeaderValue,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            base_url: None,
            default_headers: HeaderMap::new(),
            retry_policy: RetryPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
            content_type: HeaderValue::from_static(DEFAULT_CONTENT_TYPE),
            transport: None,
        }
    }

    /// Sets the base URL for all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.base_url = Some(Url::parse(url.as_ref().trim_end_matches('/'))?);
        Ok(self)
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the connection retry budget.
    pub fn retries(mut self, max_retries: usize) -> Self {
        self.retry_policy.max_retries = max_retries;
        self
    }

    /// Sets the wait between connection retries.
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.retry_policy.backoff = backoff;
        self
    }

    /// Sets the whole retry policy.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Sets the default per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the content type sent with request bodies.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a valid header value.
    pub fn content_type(mut self, content_type: impl AsRef<str>) -> Result<Self> {
        self.content_type = HeaderValue::try_from(content_type.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid content type: {}", e)))?;
        Ok(self)
    }

    /// Uses a custom transport instead of the default `reqwest` one.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL was provided or if the HTTP stack
    /// cannot be initialised.
    pub fn build(self) -> Result<Client> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Configuration("Base URL is required".to_string()))?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };

        Ok(Client {
            inner: Arc::new(ClientInner {
                transport,
                base_url,
                default_headers: self.default_headers,
                retry_policy: self.retry_policy,
                timeout: self.timeout,
                content_type: self.content_type,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
