//! Response wrapper that preserves both parsed data and raw response details.

use crate::{Error, Result};
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// A successful HTTP response.
///
/// The retry engine returns `Response<()>`: the body is available as
/// [`raw_body`](Response::raw_body) and can be decoded with
/// [`json`](Response::json).
///
/// # Type Parameters
///
/// * `T` - The type of the deserialized response data
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The deserialized response data.
    pub data: T,

    /// The raw response body as a string.
    pub raw_body: String,

    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// The URL the response was served from.
    pub url: Url,

    /// The total latency of the request, including all attempts.
    pub latency: Duration,

    /// The number of times the request was sent.
    ///
    /// This will be `1` for requests that succeeded on the first try.
    pub attempts: usize,
}

impl<T> Response<T> {
    /// Maps the response data to a different type using the provided function.
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            raw_body: self.raw_body,
            status: self.status,
            headers: self.headers,
            url: self.url,
            latency: self.latency,
            attempts: self.attempts,
        }
    }

    /// Deserializes the raw body as JSON, keeping the metadata.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeserializationFailed`] with the raw body if it does
    /// not match `U`.
    pub fn json<U: DeserializeOwned>(self) -> Result<Response<U>> {
        match serde_json::from_str::<U>(&self.raw_body) {
            Ok(data) => Ok(self.map(|_| data)),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    raw_response = %self.raw_body,
                    "Failed to deserialize response"
                );

                Err(Error::DeserializationFailed {
                    raw_response: self.raw_body,
                    serde_error: e.to_string(),
                    status: self.status,
                })
            }
        }
    }

    /// Returns `true` if the request was sent more than once.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Returns a reference to a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

impl<T> AsRef<T> for Response<T> {
    fn as_ref(&self) -> &T {
        &self.data
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn raw(body: &str) -> Response<()> {
        Response {
            data: (),
            raw_body: body.to_string(),
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            url: Url::parse("https://cloud.feedly.com/v3/profile").unwrap(),
            latency: Duration::from_millis(5),
            attempts: 2,
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Profile {
        id: String,
    }

    #[test]
    fn test_json_keeps_metadata() {
        let response = raw(r#"{"id":"u-1"}"#).json::<Profile>().unwrap();
        assert_eq!(response.data, Profile { id: "u-1".into() });
        assert_eq!(response.attempts, 2);
        assert!(response.was_retried());
        assert_eq!(response.raw_body, r#"{"id":"u-1"}"#);
    }

    #[test]
    fn test_json_failure_keeps_body() {
        match raw("not json").json::<Profile>() {
            Err(Error::DeserializationFailed {
                raw_response,
                status,
                ..
            }) => {
                assert_eq!(raw_response, "not json");
                assert_eq!(status, StatusCode::OK);
            }
            other => panic!("Expected DeserializationFailed, got {:?}", other),
        }
    }
}
