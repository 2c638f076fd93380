//! # feedly-client - An async client for the Feedly v3 API
//!
//! `feedly-client` is an HTTP client for the Feedly cloud API built on top of
//! `reqwest`. It retries connection failures, turns HTTP failures into typed
//! errors with a readable reason, refreshes expired access tokens and walks
//! paginated streams lazily.
//!
//! ## Quick Start
//!
//! ```no_run
//! use feedly_client::{Credentials, FeedlyClient, StreamOptions};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), feedly_client::Error> {
//!     let client = FeedlyClient::builder()
//!         .credentials(
//!             Credentials::new("my-app", "secret")
//!                 .with_access_token("A1")
//!                 .with_refresh_token("R1"),
//!         )
//!         .timeout(Duration::from_secs(30))
//!         .retries(3)
//!         .build()?;
//!
//!     let mut stream = client.stream_contents(
//!         "user/af190c49/category/global.all",
//!         StreamOptions::default().unread_only(true).max_count(50),
//!     )?;
//!
//!     while let Some(item) = stream.next_item().await? {
//!         println!("{}", item["title"]);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Connection retries** - DNS, socket and timeout failures are resent up to a budget, with optional backoff
//! - **Typed HTTP errors** - 400, 401, 404, 429 and 5xx map to distinct [`ErrorKind`]s with a human-readable reason
//! - **Token refresh** - a `401` triggers at most one refresh per day and a single replay with the new token
//! - **Lazy streams** - pages are fetched on demand, capped by `max_count` and resumable via continuation tokens
//! - **Automatic logging** - structured logging with `tracing`
//! - **Pluggable transport** - swap the `reqwest` transport for anything implementing [`Transport`]
//!
//! ## Error Handling
//!
//! Every HTTP failure keeps the request and response that caused it:
//!
//! ```no_run
//! use feedly_client::{Error, ErrorKind, FeedlyClient, Credentials, Scope};
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = FeedlyClient::new(Credentials::default())?;
//! match client.collections(Scope::User).await {
//!     Ok(collections) => println!("{} collections", collections.len()),
//!     Err(e) if e.kind() == ErrorKind::RateLimited => {
//!         eprintln!("{}", e);
//!         if let Some(reset) = e.retry_after() {
//!             eprintln!("retry after {}", reset);
//!         }
//!     }
//!     Err(Error::Api(api)) => {
//!         eprintln!("{} {} failed: {}", api.method, api.url, api.reason);
//!         eprintln!("  Raw response: {}", api.raw_response);
//!     }
//!     Err(e) if e.is_connection() => eprintln!("Network trouble: {}", e),
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom Hooks
//!
//! The retry engine is usable on its own. An [`ErrorHook`] decides what each
//! response means:
//!
//! ```no_run
//! use async_trait::async_trait;
//! use feedly_client::{Client, ErrorHook, HookOutcome, RequestContext, Result};
//! use feedly_client::{metadata::RequestDescriptor, transport::RawResponse};
//!
//! struct AcceptNotFound;
//!
//! #[async_trait]
//! impl ErrorHook for AcceptNotFound {
//!     async fn handle(&self, response: RawResponse, ctx: &RequestContext<'_>) -> Result<HookOutcome> {
//!         if response.is_success() || response.status.as_u16() == 404 {
//!             Ok(HookOutcome::Done(response))
//!         } else {
//!             Err(ctx.failure(&response))
//!         }
//!     }
//! }
//!
//! # async fn example() -> Result<()> {
//! let client = Client::builder().base_url("https://cloud.feedly.com")?.build()?;
//! let response = client
//!     .execute(RequestDescriptor::get("/v3/feeds/feed%2Fmissing"), &AcceptNotFound)
//!     .await?;
//! println!("{}", response.status);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod classify;
mod client;
mod collections;
mod entries;
mod error;
mod feedly;
pub mod metadata;
pub mod rate_limit;
mod record;
mod response;
pub mod retry;
mod stream;
pub mod transport;

pub use auth::{Credentials, TokenResponse};
pub use client::{
    ClassifyHook, Client, ClientBuilder, ErrorHook, HookOutcome, RequestContext,
    DEFAULT_CONTENT_TYPE, DEFAULT_TIMEOUT,
};
pub use collections::{Collection, CollectionUpdate, FeedRef};
pub use entries::{Entry, Link, NewEntry};
pub use error::{ApiError, BoxError, Diagnostic, Error, ErrorKind, Result};
pub use feedly::{FeedlyClient, FeedlyClientBuilder, API_PREFIX, DEFAULT_BASE_URL};
pub use record::Record;
pub use response::Response;
pub use retry::{Backoff, RetryPolicy};
pub use stream::{Ranking, Scope, Stream, StreamId, StreamKind, StreamOptions};
pub use transport::{RawResponse, Transport};
