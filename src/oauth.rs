//! Google sign-in bridge (implicit / access-token flow).
//!
//! ARCHITECTURE
//! ============
//! The provider's consent step runs out of band (popup, redirect, or a
//! pasted URL in a terminal). [`OAuthBridge::request_token`] hands the
//! provider a one-shot [`TokenGrant`] and returns a [`PendingToken`] future.
//! The provider completes the grant at most once; the access token is then
//! exchanged for a backend session through [`CredentialClient::google_login`].
//!
//! TRADE-OFFS
//! ==========
//! There is no timeout here. A dropped grant resolves to `None`; a grant the
//! provider never touches leaves the future pending. Abandonment handling
//! belongs to the UI.

#[cfg(test)]
#[path = "oauth_test.rs"]
mod oauth_test;

use std::fmt;
use std::fmt::Write as _;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use rand::Rng;
use tokio::sync::oneshot;

use crate::net::credentials::{AuthError, CredentialClient};

pub const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const DEFAULT_SCOPES: [&str; 3] = ["email", "profile", "openid"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OAuthError {
    #[error("invalid redirect URL: {0}")]
    InvalidRedirect(String),
    #[error("provider refused consent: {0}")]
    Provider(String),
    #[error("redirect carried no access token")]
    MissingToken,
    #[error("oauth state mismatch")]
    StateMismatch,
}

/// Google OAuth client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthConfig {
    pub client_id: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl OAuthConfig {
    /// Config with the default `email profile openid` scopes.
    #[must_use]
    pub fn new(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            scopes: DEFAULT_SCOPES.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Build the Google authorization URL requesting an access token.
    #[must_use]
    pub fn authorize_url(&self, state: &str) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "token")
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("state", state)
            .append_pair("include_granted_scopes", "true")
            .finish();
        format!("{GOOGLE_AUTHORIZE_URL}?{query}")
    }
}

/// Short-lived provider access token.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_in: Option<u64>,
}

impl AccessToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into(), expires_in: None }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Extract the access token from the provider's redirect.
///
/// Implicit-flow parameters arrive in the URL fragment; the query string is
/// accepted too. When `expected_state` is given, the echoed `state` must
/// match it.
///
/// # Errors
///
/// Returns an [`OAuthError`] for unparsable URLs, provider `error`
/// responses, a missing token, or a state mismatch.
pub fn parse_redirect(redirect: &str, expected_state: Option<&str>) -> Result<AccessToken, OAuthError> {
    let parsed = url::Url::parse(redirect.trim()).map_err(|e| OAuthError::InvalidRedirect(e.to_string()))?;
    let params = parsed
        .fragment()
        .filter(|f| !f.is_empty())
        .or_else(|| parsed.query())
        .unwrap_or_default();

    let mut token = None;
    let mut expires_in = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url::form_urlencoded::parse(params.as_bytes()) {
        match key.as_ref() {
            "access_token" => token = Some(value.into_owned()),
            "expires_in" => expires_in = value.parse::<u64>().ok(),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(OAuthError::Provider(error));
    }
    if let Some(expected) = expected_state
        && state.as_deref() != Some(expected)
    {
        return Err(OAuthError::StateMismatch);
    }
    let token = token.filter(|t| !t.is_empty()).ok_or(OAuthError::MissingToken)?;
    Ok(AccessToken { token, expires_in })
}

// =============================================================================
// ONE-SHOT GRANT
// =============================================================================

/// Completion handle for one consent request. Dropping it cancels the
/// request.
pub struct TokenGrant {
    tx: oneshot::Sender<AccessToken>,
    state: String,
}

impl TokenGrant {
    /// Anti-forgery value to send through the provider and check on return.
    #[must_use]
    pub fn state(&self) -> &str {
        &self.state
    }

    /// Deliver the access token. Returns `false` if nobody is waiting anymore.
    pub fn complete(self, token: AccessToken) -> bool {
        self.tx.send(token).is_ok()
    }
}

/// Resolves once with the granted token, or `None` if the grant was dropped.
pub struct PendingToken {
    rx: oneshot::Receiver<AccessToken>,
}

impl Future for PendingToken {
    type Output = Option<AccessToken>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(Result::ok)
    }
}

/// Third-party token client. Implementations open the consent UI and
/// complete `grant` when the user approves.
pub trait ConsentProvider: Send + Sync {
    fn request_access_token(&self, config: &OAuthConfig, grant: TokenGrant);
}

// =============================================================================
// BRIDGE
// =============================================================================

pub struct OAuthBridge {
    config: OAuthConfig,
    provider: Arc<dyn ConsentProvider>,
}

impl OAuthBridge {
    #[must_use]
    pub fn new(config: OAuthConfig, provider: Arc<dyn ConsentProvider>) -> Self {
        Self { config, provider }
    }

    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Start a consent round. Each call creates a fresh grant.
    #[must_use]
    pub fn request_token(&self) -> PendingToken {
        let (tx, rx) = oneshot::channel();
        let grant = TokenGrant { tx, state: generate_state() };
        tracing::debug!(client_id = %self.config.client_id, "requesting provider consent");
        self.provider.request_access_token(&self.config, grant);
        PendingToken { rx }
    }

    /// Run consent, then exchange the access token for a session.
    /// `Ok(None)` means the user abandoned consent.
    ///
    /// # Errors
    ///
    /// Propagates [`AuthError`] from the backend exchange.
    pub async fn sign_in(&self, client: &CredentialClient) -> Result<Option<String>, AuthError> {
        let Some(access) = self.request_token().await else {
            tracing::info!("google consent abandoned");
            return Ok(None);
        };
        client.google_login(&access.token).await.map(Some)
    }
}

fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Random 16-byte hex `state` parameter.
fn generate_state() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes_to_hex(&bytes)
}
