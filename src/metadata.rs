//! Request descriptors.

use crate::{Error, Result};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Everything needed to issue one logical API request.
///
/// A descriptor is immutable except for `attempts`, which the retry engine
/// increments every time it sends the request.
///
/// # Examples
///
/// ```
/// use feedly_client::metadata::RequestDescriptor;
///
/// let descriptor = RequestDescriptor::get("/v3/collections")
///     .with_query_param("withStats", "true")
///     .with_optional_query_param("newerThan", None::<i64>)
///     .enterprise(true);
///
/// assert_eq!(descriptor.query_params.len(), 1);
/// assert_eq!(
///     descriptor.resolve("/v3/").unwrap().path,
///     "/v3/enterprise/collections"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// The HTTP method (GET, POST, PUT or DELETE).
    pub method: Method,

    /// The request path (relative to the base URL).
    pub path: String,

    /// The JSON body, if any.
    pub body: Option<serde_json::Value>,

    /// Query parameters for this request.
    pub query_params: BTreeMap<String, String>,

    /// Additional headers for this request.
    pub headers: HeaderMap,

    /// Overrides the client's timeout.
    pub timeout: Option<Duration>,

    /// Overrides the client's connection retry budget.
    pub retries: Option<usize>,

    /// Targets the enterprise variant of the endpoint.
    pub enterprise: bool,

    /// Whether to attach the `Authorization` header.
    pub authenticated: bool,

    /// Number of times the request has been sent.
    pub attempts: usize,
}

impl RequestDescriptor {
    /// Creates a new descriptor with the given method and path.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            query_params: BTreeMap::new(),
            headers: HeaderMap::new(),
            timeout: None,
            retries: None,
            enterprise: false,
            authenticated: true,
            attempts: 0,
        }
    }

    /// A GET descriptor.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// A POST descriptor.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// A PUT descriptor.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// A DELETE descriptor.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Serializes `body` as the JSON request body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be serialized.
    pub fn with_body<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let value =
            serde_json::to_value(body).map_err(|e| Error::SerializationFailed(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Sets an already built JSON body.
    pub fn with_json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Adds a header to the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Adds a query parameter to the request.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(key.into(), value.into());
        self
    }

    /// Adds a query parameter only if `value` is set.
    pub fn with_optional_query_param<V: ToString>(
        self,
        key: impl Into<String>,
        value: Option<V>,
    ) -> Self {
        match value {
            Some(value) => self.with_query_param(key, value.to_string()),
            None => self,
        }
    }

    /// Adds multiple query parameters to the request.
    pub fn with_query_params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query_params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Overrides the timeout for this request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Overrides the connection retry budget for this request.
    pub fn with_retries(mut self, retries: usize) -> Self {
        self.retries = Some(retries);
        self
    }

    /// Targets the enterprise variant of the endpoint.
    pub fn enterprise(mut self, enterprise: bool) -> Self {
        self.enterprise = enterprise;
        self
    }

    /// Sends the request without an `Authorization` header.
    pub fn unauthenticated(mut self) -> Self {
        self.authenticated = false;
        self
    }

    /// Validates the path against an API version prefix such as `/v3/` and
    /// applies the enterprise rewrite.
    ///
    /// A missing leading `/` is added. With `enterprise` set, `/v3/x`
    /// becomes `/v3/enterprise/x`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the path does not start with `prefix`.
    pub fn resolve(mut self, prefix: &str) -> Result<Self> {
        if !self.path.starts_with('/') {
            self.path.insert(0, '/');
        }

        if !self.path.starts_with(prefix) {
            return Err(Error::Configuration(format!(
                "Invalid endpoint: {} -- API paths must start with {}",
                self.path, prefix
            )));
        }

        if self.enterprise {
            self.path = format!("{}enterprise/{}", prefix, &self.path[prefix.len()..]);
            self.enterprise = false;
        }

        Ok(self)
    }
}

impl Default for RequestDescriptor {
    fn default() -> Self {
        Self::new(Method::GET, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_adds_leading_slash() {
        let descriptor = RequestDescriptor::get("v3/profile").resolve("/v3/").unwrap();
        assert_eq!(descriptor.path, "/v3/profile");
    }

    #[test]
    fn test_resolve_rejects_foreign_prefix() {
        let err = RequestDescriptor::get("/v2/profile")
            .resolve("/v3/")
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_enterprise_rewrite() {
        let descriptor = RequestDescriptor::put("/v3/collections/abc/feeds")
            .enterprise(true)
            .resolve("/v3/")
            .unwrap();
        assert_eq!(descriptor.path, "/v3/enterprise/collections/abc/feeds");
        assert!(!descriptor.enterprise);
    }

    #[test]
    fn test_optional_query_params_skip_none() {
        let descriptor = RequestDescriptor::delete("/v3/collections/a/feeds/b")
            .with_optional_query_param("keepOrphanFeeds", None::<bool>)
            .with_optional_query_param("count", Some(20));
        assert_eq!(descriptor.query_params.len(), 1);
        assert_eq!(descriptor.query_params["count"], "20");
    }

    #[test]
    fn test_with_body() {
        let descriptor = RequestDescriptor::post("/v3/entries/.mget")
            .with_body(&["a", "b"])
            .unwrap();
        assert_eq!(descriptor.body, Some(serde_json::json!(["a", "b"])));
        assert!(descriptor.authenticated);
        assert_eq!(descriptor.attempts, 0);
    }
}
