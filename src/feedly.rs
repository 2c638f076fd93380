//! The authenticated Feedly client.
//!
//! [`FeedlyClient`] wraps the retry engine, validates every path against
//! the `/v3/` prefix, attaches the bearer token and acts as the engine's
//! [`ErrorHook`]: a `401` triggers at most one token refresh per day and,
//! when the refresh succeeds, a single replay of the original request.

use crate::{
    auth::{Credentials, TokenResponse},
    client::{Client, ClientBuilder, ErrorHook, HookOutcome, RequestContext},
    metadata::RequestDescriptor,
    retry::Backoff,
    transport::{RawResponse, Transport},
    Response, Result,
};
use async_trait::async_trait;
use chrono::Utc;
use http::StatusCode;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Every API path starts with this prefix.
pub const API_PREFIX: &str = "/v3/";

/// Default API host.
pub const DEFAULT_BASE_URL: &str = "https://cloud.feedly.com";

/// Scope requested by the authorization-code flow.
pub const SUBSCRIPTIONS_SCOPE: &str = "https://cloud.feedly.com/subscriptions";

pub(crate) const AUTH_PREFIX: &str = "/v3/auth/";
const TOKEN_PATH: &str = "/v3/auth/token";
const LOGOUT_PATH: &str = "/v3/auth/logout";
const AUTH_CODE_PATH: &str = "/v3/auth/auth";

/// A client for the Feedly v3 API.
///
/// Cloning is cheap; clones share the connection pool and the credentials.
/// Credentials are mutated by token refreshes, so callers sharing a client
/// across tasks should serialize their requests.
///
/// # Examples
///
/// ```no_run
/// use feedly_client::{Credentials, FeedlyClient, Scope};
///
/// # async fn example() -> Result<(), feedly_client::Error> {
/// let client = FeedlyClient::builder()
///     .credentials(
///         Credentials::new("my-app", "secret")
///             .with_access_token("A1")
///             .with_refresh_token("R1"),
///     )
///     .build()?;
///
/// for collection in client.collections(Scope::User).await? {
///     println!("{}", collection.label().unwrap_or("(untitled)"));
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct FeedlyClient {
    http: Client,
    credentials: Arc<RwLock<Credentials>>,
    user_id: Option<String>,
}

impl FeedlyClient {
    /// Creates a new builder.
    pub fn builder() -> FeedlyClientBuilder {
        FeedlyClientBuilder::new()
    }

    /// Creates a client for the public API host.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP stack cannot be initialised.
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::builder().credentials(credentials).build()
    }

    /// The underlying retry engine.
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// A snapshot of the current credentials.
    pub fn credentials(&self) -> Credentials {
        self.credentials.read().clone()
    }

    /// Mutates the shared credentials.
    pub fn update_credentials(&self, update: impl FnOnce(&mut Credentials)) {
        update(&mut self.credentials.write());
    }

    /// The user id the client was configured with.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Sets the user id.
    pub fn set_user_id(&mut self, user_id: Option<String>) {
        self.user_id = user_id;
    }

    /// Issues a request against the API.
    ///
    /// The path must start with `/v3/` (a missing leading slash is added);
    /// the enterprise flag is applied before sending.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid paths or methods, the last
    /// connection error once the retry budget is spent, or the classified
    /// HTTP error.
    pub async fn request(&self, descriptor: RequestDescriptor) -> Result<Response<()>> {
        let descriptor = descriptor.resolve(API_PREFIX)?;
        self.http.execute(descriptor, self).await
    }

    /// Issues a request and decodes the JSON body.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        descriptor: RequestDescriptor,
    ) -> Result<Response<T>> {
        self.request(descriptor).await?.json()
    }

    /// Requests the authorization-code login page.
    ///
    /// `extra` is appended to the standard `response_type`, `client_id`,
    /// `redirect_uri` and `scope` parameters and may override them.
    pub async fn auth_code_request<K, V>(
        &self,
        redirect_uri: &str,
        extra: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Response<()>>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let client_id = self.credentials.read().client_id.clone();
        let descriptor = RequestDescriptor::get(AUTH_CODE_PATH)
            .unauthenticated()
            .with_query_param("response_type", "code")
            .with_query_param("client_id", client_id)
            .with_query_param("redirect_uri", redirect_uri)
            .with_query_param("scope", SUBSCRIPTIONS_SCOPE)
            .with_query_params(extra);
        self.request(descriptor).await
    }

    /// Exchanges an authorization code for access and refresh tokens.
    pub async fn exchange_auth_code(&self, code: &str, redirect_uri: &str) -> Result<()> {
        let grant = self
            .credentials
            .read()
            .authorization_code_grant(code, redirect_uri);
        let descriptor = RequestDescriptor::post(TOKEN_PATH)
            .unauthenticated()
            .with_body(&grant)?;
        let tokens = self.request_json::<TokenResponse>(descriptor).await?.data;

        let expires = tokens.expires_at(Utc::now());
        let mut credentials = self.credentials.write();
        credentials.set_access_token(Some(tokens.access_token));
        if tokens.refresh_token.is_some() {
            credentials.refresh_token = tokens.refresh_token;
        }
        credentials.expires = expires;
        tracing::info!(client_id = %credentials.client_id, "Obtained access token");
        Ok(())
    }

    /// Exchanges the refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingRefreshToken`](crate::Error::MissingRefreshToken)
    /// without a refresh token, or the error of the token request.
    pub async fn refresh_access_token(&self) -> Result<()> {
        let grant = self.credentials.read().refresh_grant()?;
        let descriptor = RequestDescriptor::post(TOKEN_PATH)
            .unauthenticated()
            .with_body(&grant)?;
        let tokens = self.request_json::<TokenResponse>(descriptor).await?.data;

        let expires = tokens.expires_at(Utc::now());
        let mut credentials = self.credentials.write();
        credentials.set_access_token(Some(tokens.access_token));
        if tokens.expires_in.is_some() {
            credentials.expires = expires;
        }
        tracing::info!(client_id = %credentials.client_id, "Refreshed access token");
        Ok(())
    }

    /// Revokes the refresh token and clears both tokens.
    pub async fn revoke_refresh_token(&self) -> Result<()> {
        let grant = self.credentials.read().revoke_grant();
        let descriptor = RequestDescriptor::post(TOKEN_PATH)
            .unauthenticated()
            .with_body(&grant)?;
        self.request(descriptor).await?;
        self.credentials.write().clear_tokens();
        Ok(())
    }

    /// Logs out and clears both tokens.
    pub async fn log_out(&self) -> Result<()> {
        self.request(RequestDescriptor::post(LOGOUT_PATH)).await?;
        self.credentials.write().clear_tokens();
        Ok(())
    }

    fn refresh_allowed(&self, ctx: &RequestContext<'_>) -> bool {
        if ctx.replayed || ctx.descriptor.path.starts_with(AUTH_PREFIX) {
            return false;
        }
        let credentials = self.credentials.read();
        credentials.refresh_token.is_some() && credentials.refresh_due(Utc::now())
    }
}

#[async_trait]
impl ErrorHook for FeedlyClient {
    fn authorization(&self, _ctx: &RequestContext<'_>) -> Option<String> {
        self.credentials.read().bearer()
    }

    async fn handle(
        &self,
        response: RawResponse,
        ctx: &RequestContext<'_>,
    ) -> Result<HookOutcome> {
        if response.is_success() {
            return Ok(HookOutcome::Done(response));
        }

        let error = ctx.failure(&response);
        if response.status != StatusCode::UNAUTHORIZED || !self.refresh_allowed(ctx) {
            return Err(error);
        }

        match self.refresh_access_token().await {
            Ok(()) => Ok(HookOutcome::Replay(error)),
            Err(refresh_error) if refresh_error.is_connection() => Err(refresh_error),
            Err(refresh_error) => {
                tracing::info!(error = %refresh_error, "error refreshing access token");
                self.credentials.write().mark_refresh_attempt();
                Err(error)
            }
        }
    }
}

/// Builder for [`FeedlyClient`].
pub struct FeedlyClientBuilder {
    http: ClientBuilder,
    base_url: String,
    credentials: Credentials,
    user_id: Option<String>,
}

impl FeedlyClientBuilder {
    /// Creates a builder pointing at the public API host.
    pub fn new() -> Self {
        Self {
            http: ClientBuilder::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            credentials: Credentials::default(),
            user_id: None,
        }
    }

    /// Sets the API host, e.g. `https://cloud.feedly.com`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the credentials.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Sets the user id.
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Sets the default per-request timeout.
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.http = self.http.timeout(timeout);
        self
    }

    /// Sets the connection retry budget.
    pub fn retries(mut self, retries: usize) -> Self {
        self.http = self.http.retries(retries);
        self
    }

    /// Sets the wait between connection retries.
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.http = self.http.backoff(backoff);
        self
    }

    /// Uses a custom transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.http = self.http.transport(transport);
        self
    }

    /// Applies arbitrary settings to the underlying [`ClientBuilder`].
    pub fn configure_http(mut self, configure: impl FnOnce(ClientBuilder) -> ClientBuilder) -> Self {
        self.http = configure(self.http);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP stack cannot
    /// be initialised.
    pub fn build(self) -> Result<FeedlyClient> {
        let http = self.http.base_url(&self.base_url)?.build()?;
        Ok(FeedlyClient {
            http,
            credentials: Arc::new(RwLock::new(self.credentials)),
            user_id: self.user_id,
        })
    }
}

impl Default for FeedlyClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
