//! Error types for Feedly API calls.
//!
//! [`Error`] separates the three failure families the client deals with:
//! configuration problems (never retried), connection failures (retried up to
//! the client's budget) and HTTP failures, which are classified into an
//! [`ApiError`] carrying the request/response context and a readable reason.

use chrono::{DateTime, Utc};
use http::{HeaderMap, Method, StatusCode};
use std::fmt;
use url::Url;

/// A boxed error used for transport-level failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Classification tag for errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// HTTP 400.
    BadRequest,
    /// HTTP 401.
    Unauthorized,
    /// HTTP 404.
    NotFound,
    /// HTTP 429.
    RateLimited,
    /// HTTP 5xx.
    ServerError,
    /// Any other non-2xx status.
    GenericHttp,
    /// DNS, socket or timeout failures.
    Connection,
    /// Invalid method, path, header or client setup.
    Configuration,
    /// A request or response body could not be (de)serialized.
    Decode,
}

impl ErrorKind {
    /// Maps an HTTP status code to its error kind.
    ///
    /// # Examples
    ///
    /// ```
    /// use feedly_client::ErrorKind;
    /// use http::StatusCode;
    ///
    /// assert_eq!(ErrorKind::from_status(StatusCode::NOT_FOUND), ErrorKind::NotFound);
    /// assert_eq!(ErrorKind::from_status(StatusCode::BAD_GATEWAY), ErrorKind::ServerError);
    /// assert_eq!(ErrorKind::from_status(StatusCode::CONFLICT), ErrorKind::GenericHttp);
    /// ```
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            400 => ErrorKind::BadRequest,
            401 => ErrorKind::Unauthorized,
            404 => ErrorKind::NotFound,
            429 => ErrorKind::RateLimited,
            code if code >= 500 => ErrorKind::ServerError,
            _ => ErrorKind::GenericHttp,
        }
    }
}

/// Diagnostic fields the API embeds in error bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The server's `errorId`.
    pub error_id: String,
    /// The server's `errorMessage`.
    pub error_message: String,
}

/// A classified HTTP failure.
///
/// Built by [`classify`](crate::classify::classify); the `reason` is what
/// the error displays as.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// The classification of the status code.
    pub kind: ErrorKind,
    /// The HTTP status code.
    pub status: StatusCode,
    /// The method of the failed request.
    pub method: Method,
    /// The URL the response came from.
    pub url: Url,
    /// The response headers.
    pub headers: HeaderMap,
    /// The raw response body.
    pub raw_response: String,
    /// Human-readable reason, e.g. `404: Not Found Error abc: no such entry`.
    pub reason: String,
    /// `errorId`/`errorMessage` extracted from a JSON body, if present.
    pub diagnostic: Option<Diagnostic>,
    /// When the rate limit resets (429 responses with a valid `Retry-After`).
    pub retry_after: Option<DateTime<Utc>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl std::error::Error for ApiError {}

/// The main error type of the crate.
///
/// # Examples
///
/// ```no_run
/// use feedly_client::{Error, ErrorKind, FeedlyClient, Credentials};
///
/// # async fn example() -> Result<(), Error> {
/// let client = FeedlyClient::builder()
///     .credentials(Credentials::default().with_access_token("token"))
///     .build()?;
///
/// match client.entry("some-entry-id").await {
///     Ok(entry) => println!("{:?}", entry.and_then(|e| e.title().map(String::from))),
///     Err(Error::Api(api)) if api.kind == ErrorKind::RateLimited => {
///         eprintln!("slow down: {}", api.reason);
///     }
///     Err(e) if e.is_connection() => eprintln!("network trouble: {}", e),
///     Err(e) => return Err(e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A network-level error occurred (connection refused, DNS lookup failed, etc.).
    #[error("Network error: {0}")]
    Network(#[source] BoxError),

    /// The request exceeded its timeout.
    #[error("Request timed out")]
    Timeout,

    /// The server answered with a non-2xx status.
    #[error("{0}")]
    Api(Box<ApiError>),

    /// Invalid configuration was provided (bad method, path, header or client setup).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A stream id did not have the `[user|enterprise]/<owner>/<type>/<id>` shape.
    #[error("Invalid stream id {0:?}: expected [user|enterprise]/<owner id>/<source type>/<source id>")]
    InvalidStreamId(String),

    /// A refresh was requested but the credentials hold no refresh token.
    #[error("Missing refresh token")]
    MissingRefreshToken,

    /// Failed to serialize the request body.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// Failed to deserialize the response body into the expected type.
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The raw response body that failed to deserialize
        raw_response: String,
        /// The serde error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
    },
}

impl Error {
    /// Wraps any error as a [`Error::Network`] failure.
    pub fn network(source: impl Into<BoxError>) -> Self {
        Error::Network(source.into())
    }

    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Network(_) | Error::Timeout => ErrorKind::Connection,
            Error::Api(api) => api.kind,
            Error::Configuration(_)
            | Error::InvalidUrl(_)
            | Error::InvalidStreamId(_)
            | Error::MissingRefreshToken => ErrorKind::Configuration,
            Error::SerializationFailed(_) | Error::DeserializationFailed { .. } => {
                ErrorKind::Decode
            }
        }
    }

    /// Returns `true` for connection failures, the only errors the client retries.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Timeout)
    }

    /// Returns the classified HTTP failure, if this is one.
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(api) => Some(api),
            _ => None,
        }
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Api(api) => Some(api.status),
            Error::DeserializationFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::Api(api) => Some(&api.raw_response),
            Error::DeserializationFailed { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }

    /// Returns when the rate limit resets, for rate-limited responses.
    pub fn retry_after(&self) -> Option<DateTime<Utc>> {
        self.api()?.retry_after
    }
}

impl From<ApiError> for Error {
    fn from(error: ApiError) -> Self {
        Error::Api(Box::new(error))
    }
}

/// A specialized `Result` type for Feedly API calls.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_status_table() {
        let cases = [
            (400, ErrorKind::BadRequest),
            (401, ErrorKind::Unauthorized),
            (403, ErrorKind::GenericHttp),
            (404, ErrorKind::NotFound),
            (409, ErrorKind::GenericHttp),
            (429, ErrorKind::RateLimited),
            (500, ErrorKind::ServerError),
            (503, ErrorKind::ServerError),
            (599, ErrorKind::ServerError),
        ];
        for (code, kind) in cases {
            let status = StatusCode::from_u16(code).unwrap();
            assert_eq!(ErrorKind::from_status(status), kind, "status {}", code);
        }
    }

    #[test]
    fn test_connection_errors() {
        assert!(Error::Timeout.is_connection());
        assert!(Error::network("connection refused").is_connection());
        assert_eq!(Error::Timeout.kind(), ErrorKind::Connection);
        assert!(!Error::Configuration("bad".into()).is_connection());
        assert_eq!(Error::MissingRefreshToken.kind(), ErrorKind::Configuration);
    }
}
