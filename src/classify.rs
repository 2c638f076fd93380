//! Maps failed responses to typed errors.
//!
//! Classification is a pure function of the response: the same response
//! always yields the same [`ApiError`]. Malformed bodies or headers only
//! shorten the reason string, they never produce a secondary error.

use crate::error::{ApiError, Diagnostic, ErrorKind};
use crate::rate_limit;
use crate::transport::RawResponse;
use http::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "errorId")]
    error_id: Option<Value>,
    #[serde(rename = "errorMessage")]
    error_message: Option<Value>,
}

/// Classifies a non-2xx response.
///
/// # Examples
///
/// ```
/// use feedly_client::classify::classify;
/// use feedly_client::transport::RawResponse;
/// use feedly_client::ErrorKind;
/// use http::{Method, StatusCode};
///
/// let response = RawResponse::new(
///     StatusCode::NOT_FOUND,
///     "https://cloud.feedly.com/v3/entries/x".parse().unwrap(),
/// )
/// .with_body(r#"{"errorId":"ap4-1","errorMessage":"entry not found"}"#);
///
/// let error = classify(&response, &Method::GET);
/// assert_eq!(error.kind, ErrorKind::NotFound);
/// assert_eq!(error.reason, "404: Not Found Error ap4-1: entry not found");
/// ```
pub fn classify(response: &RawResponse, method: &Method) -> ApiError {
    let kind = ErrorKind::from_status(response.status);
    let diagnostic = parse_diagnostic(&response.body);
    let retry_after = if kind == ErrorKind::RateLimited {
        rate_limit::parse_reset_time(&response.headers)
    } else {
        None
    };

    let mut reason = base_reason(response.status);
    if let Some(diagnostic) = &diagnostic {
        reason.push_str(&format!(
            " Error {}: {}",
            diagnostic.error_id, diagnostic.error_message
        ));
    }
    if let Some(reset_at) = retry_after {
        reason.push_str(&format!(
            " Rate limit resets on {}",
            rate_limit::format_reset_time(reset_at)
        ));
    }

    ApiError {
        kind,
        status: response.status,
        method: method.clone(),
        url: response.url.clone(),
        headers: response.headers.clone(),
        raw_response: response.body.clone(),
        reason,
        diagnostic,
        retry_after,
    }
}

/// Returns `"{code}: {canonical reason}"`.
pub fn base_reason(status: StatusCode) -> String {
    format!(
        "{}: {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown Status")
    )
}

/// Extracts `errorId`/`errorMessage` when the body is JSON and both are set.
pub fn parse_diagnostic(body: &str) -> Option<Diagnostic> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let error_id = field_text(parsed.error_id?)?;
    let error_message = field_text(parsed.error_message?)?;
    Some(Diagnostic {
        error_id,
        error_message,
    })
}

fn field_text(value: Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s,
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn response(code: u16, body: &str) -> RawResponse {
        RawResponse::new(
            StatusCode::from_u16(code).unwrap(),
            Url::parse("https://cloud.feedly.com/v3/profile").unwrap(),
        )
        .with_body(body)
    }

    #[test]
    fn test_classification_is_idempotent() {
        for code in [400, 401, 403, 404, 418, 429, 500, 502, 599] {
            let resp = response(code, r#"{"errorId":"x","errorMessage":"y"}"#);
            let first = classify(&resp, &Method::GET);
            let second = classify(&resp, &Method::GET);
            assert_eq!(first.kind, second.kind);
            assert_eq!(first.reason, second.reason);
            assert_eq!(first.kind, ErrorKind::from_status(resp.status));
        }
    }

    #[test]
    fn test_reason_without_body() {
        let error = classify(&response(400, ""), &Method::POST);
        assert_eq!(error.kind, ErrorKind::BadRequest);
        assert_eq!(error.reason, "400: Bad Request");
        assert!(error.diagnostic.is_none());
        assert_eq!(error.method, Method::POST);
    }

    #[test]
    fn test_reason_with_non_json_body() {
        let error = classify(&response(500, "<html>oops</html>"), &Method::GET);
        assert_eq!(error.kind, ErrorKind::ServerError);
        assert_eq!(error.reason, "500: Internal Server Error");
    }

    #[test]
    fn test_reason_requires_both_diagnostic_fields() {
        let error = classify(&response(401, r#"{"errorId":"abc"}"#), &Method::GET);
        assert_eq!(error.reason, "401: Unauthorized");

        let error = classify(
            &response(401, r#"{"errorId":"","errorMessage":"expired"}"#),
            &Method::GET,
        );
        assert_eq!(error.reason, "401: Unauthorized");
    }

    #[test]
    fn test_numeric_error_id() {
        let error = classify(
            &response(404, r#"{"errorCode":404,"errorId":17,"errorMessage":"gone"}"#),
            &Method::GET,
        );
        assert_eq!(error.reason, "404: Not Found Error 17: gone");
        assert_eq!(
            error.diagnostic,
            Some(Diagnostic {
                error_id: "17".into(),
                error_message: "gone".into()
            })
        );
    }

    #[test]
    fn test_rate_limited_with_retry_after() {
        let resp = response(429, "").with_header("Retry-After", "1700000000");
        let error = classify(&resp, &Method::GET);

        assert_eq!(error.kind, ErrorKind::RateLimited);
        assert_eq!(error.retry_after.map(|t| t.timestamp()), Some(1_700_000_000));
        let expected = format!(
            "429: Too Many Requests Rate limit resets on {}",
            rate_limit::format_reset_time(error.retry_after.unwrap())
        );
        assert_eq!(error.reason, expected);
        assert!(error.reason.contains("Nov 2023"));
    }

    #[test]
    fn test_rate_limited_with_bad_retry_after() {
        let resp = response(429, "").with_header("Retry-After", "in a while");
        let error = classify(&resp, &Method::GET);
        assert_eq!(error.reason, "429: Too Many Requests");
        assert!(error.retry_after.is_none());

        let error = classify(&response(429, ""), &Method::GET);
        assert_eq!(error.reason, "429: Too Many Requests");
    }

    #[test]
    fn test_retry_after_ignored_for_other_statuses() {
        let resp = response(503, "").with_header("Retry-After", "1700000000");
        let error = classify(&resp, &Method::GET);
        assert!(error.retry_after.is_none());
        assert_eq!(error.reason, "503: Service Unavailable");
    }
}
