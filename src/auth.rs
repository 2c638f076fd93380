//! Credentials and the OAuth token lifecycle.

use crate::{Error, Result};
use chrono::{DateTime, Duration, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum time between two token refresh attempts.
pub const REFRESH_INTERVAL_SECS: i64 = 86_400;

/// OAuth client credentials and the tokens obtained with them.
///
/// Every access-token assignment, including clearing it, records the
/// current time as the last refresh attempt. The hook uses that timestamp to
/// refresh at most once per [`REFRESH_INTERVAL_SECS`].
///
/// # Examples
///
/// ```
/// use feedly_client::Credentials;
///
/// let credentials = Credentials::new("my-app", "s3cret")
///     .with_access_token("A1")
///     .with_refresh_token("R1");
///
/// assert_eq!(credentials.bearer().as_deref(), Some("Bearer A1"));
/// assert!(credentials.last_refresh_attempt().is_some());
/// ```
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    /// The OAuth client id.
    pub client_id: String,
    /// The OAuth client secret.
    pub client_secret: String,
    access_token: Option<String>,
    /// The refresh token, if the grant produced one.
    pub refresh_token: Option<String>,
    /// When the access token expires.
    pub expires: Option<DateTime<Utc>>,
    last_refresh_attempt: Option<DateTime<Utc>>,
    /// Free-form mode tag (`developer` by default).
    pub mode: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            client_id: "feedlydev".to_string(),
            client_secret: "feedlydev".to_string(),
            access_token: None,
            refresh_token: None,
            expires: None,
            last_refresh_attempt: None,
            mode: "developer".to_string(),
        }
    }
}

impl Credentials {
    /// Creates credentials for an OAuth client, without tokens.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            ..Self::default()
        }
    }

    /// Sets the access token (recording now as the last refresh attempt).
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.set_access_token(Some(token.into()));
        self
    }

    /// Sets the refresh token.
    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    /// Overrides the last refresh attempt, e.g. when restoring saved state.
    pub fn with_last_refresh_attempt(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.last_refresh_attempt = at;
        self
    }

    /// Sets the mode tag.
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }

    /// The current access token.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// Assigns (or clears) the access token and records the attempt time.
    pub fn set_access_token(&mut self, token: Option<String>) {
        self.access_token = token;
        self.mark_refresh_attempt();
    }

    /// Records now as the last refresh attempt.
    pub fn mark_refresh_attempt(&mut self) {
        self.last_refresh_attempt = Some(Utc::now());
    }

    /// When a token was last assigned or a refresh last attempted.
    pub fn last_refresh_attempt(&self) -> Option<DateTime<Utc>> {
        self.last_refresh_attempt
    }

    /// Returns `true` if a refresh may be attempted at `now`.
    pub fn refresh_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_refresh_attempt {
            None => true,
            Some(last) => now - last >= Duration::seconds(REFRESH_INTERVAL_SECS),
        }
    }

    /// The `Authorization` header value, once a token is present.
    pub fn bearer(&self) -> Option<String> {
        self.access_token
            .as_ref()
            .map(|token| format!("Bearer {}", token))
    }

    /// Drops both tokens.
    pub fn clear_tokens(&mut self) {
        self.refresh_token = None;
        self.set_access_token(None);
    }

    /// Body of a `refresh_token` grant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingRefreshToken`] when there is no refresh token.
    pub fn refresh_grant(&self) -> Result<TokenGrant> {
        let refresh_token = self
            .refresh_token
            .clone()
            .ok_or(Error::MissingRefreshToken)?;
        Ok(TokenGrant {
            refresh_token: Some(refresh_token),
            ..self.grant(GrantType::RefreshToken)
        })
    }

    /// Body of a `revoke_token` grant.
    pub fn revoke_grant(&self) -> TokenGrant {
        TokenGrant {
            refresh_token: self.refresh_token.clone(),
            ..self.grant(GrantType::RevokeToken)
        }
    }

    /// Body of an `authorization_code` grant.
    pub fn authorization_code_grant(
        &self,
        code: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> TokenGrant {
        TokenGrant {
            code: Some(code.into()),
            redirect_uri: Some(redirect_uri.into()),
            ..self.grant(GrantType::AuthorizationCode)
        }
    }

    fn grant(&self, grant_type: GrantType) -> TokenGrant {
        TokenGrant {
            grant_type,
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            refresh_token: None,
            code: None,
            redirect_uri: None,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("has_access_token", &self.access_token.is_some())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires", &self.expires)
            .field("last_refresh_attempt", &self.last_refresh_attempt)
            .field("mode", &self.mode)
            .finish()
    }
}

/// OAuth grant type sent to `/v3/auth/token`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Exchange an authorization code for tokens.
    AuthorizationCode,
    /// Exchange a refresh token for a new access token.
    RefreshToken,
    /// Revoke a refresh token.
    RevokeToken,
}

/// Body of a `/v3/auth/token` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenGrant {
    /// The grant type.
    pub grant_type: GrantType,
    /// The OAuth client id.
    pub client_id: String,
    /// The OAuth client secret.
    pub client_secret: String,
    /// The refresh token (refresh and revoke grants).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// The authorization code (code grant).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// The redirect URI used to obtain the code (code grant).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
}

/// Response of `/v3/auth/token`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// The new access token.
    pub access_token: String,
    /// A new refresh token (code grant only).
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: Option<f64>,
    /// The user the tokens belong to.
    #[serde(default)]
    pub id: Option<String>,
}

impl TokenResponse {
    /// When the access token expires, counted from `now`.
    ///
    /// Returns `None` without an `expires_in`, or when the lifetime is not a
    /// finite number or does not fit in a timestamp.
    pub fn expires_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let secs = self.expires_in.filter(|secs| secs.is_finite())?;
        let lifetime = TimeDelta::try_milliseconds((secs * 1000.0) as i64)?;
        now.checked_add_signed(lifetime)
    }
}
