//! Credential exchange: password and Google logins against the blog backend.
//!
//! SYSTEM CONTEXT
//! ==============
//! Login forms and the OAuth bridge call in here; a successful exchange is
//! installed into the [`SessionStore`] before the caller sees `Ok`, so nobody
//! can observe a successful login while the store still shows the old state.
//!
//! ERROR HANDLING
//! ==============
//! Failures collapse into stable, user-facing categories. No HTTP status
//! means the service is down; any other status means the credential was
//! rejected, reported per login method so the UI can suggest the right fix.
//!
//! TRADE-OFFS
//! ==========
//! Only one exchange runs at a time. A second submit while one is in flight
//! is refused rather than queued, which keeps two responses from racing to
//! install different tokens.

#[cfg(test)]
#[path = "credentials_test.rs"]
mod credentials_test;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use super::transport::{HttpRequest, HttpTransport, Transport, TransportError};
use super::types::{google_login_endpoint, login_endpoint, parse_token_response};
use crate::config::ClientConfig;
use crate::session::SessionStore;
use crate::token::TokenError;

pub const INVALID_CREDENTIALS_MESSAGE: &str = "Incorrect username or password";
pub const SERVICE_UNAVAILABLE_MESSAGE: &str = "System down, try again later :(";
pub const OAUTH_LOGIN_FAILED_MESSAGE: &str = "Google sign-in failed, try again";

/// Classified login failure. `Display` is the user-facing message.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The backend rejected a username/password pair.
    #[error("{}", INVALID_CREDENTIALS_MESSAGE)]
    InvalidCredentials { status: u16 },

    /// No response reached the client.
    #[error("{}", SERVICE_UNAVAILABLE_MESSAGE)]
    ServiceUnavailable,

    /// The backend rejected a provider-issued access token.
    #[error("{}", OAUTH_LOGIN_FAILED_MESSAGE)]
    OAuthLoginFailed { status: u16 },

    /// The backend answered with a token that does not decode.
    #[error("Received an unreadable session token")]
    MalformedToken(#[from] TokenError),

    /// Another login is still waiting for its response.
    #[error("A sign-in is already in progress")]
    LoginInProgress,
}

impl AuthError {
    /// HTTP status behind the failure; `0` when the server was unreachable,
    /// `None` for failures raised locally.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::InvalidCredentials { status } | Self::OAuthLoginFailed { status } => Some(*status),
            Self::ServiceUnavailable => Some(0),
            Self::MalformedToken(_) | Self::LoginInProgress => None,
        }
    }

    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials { .. } => "E_INVALID_CREDENTIALS",
            Self::ServiceUnavailable => "E_SERVICE_UNAVAILABLE",
            Self::OAuthLoginFailed { .. } => "E_OAUTH_LOGIN_FAILED",
            Self::MalformedToken(_) => "E_MALFORMED_TOKEN",
            Self::LoginInProgress => "E_LOGIN_IN_PROGRESS",
        }
    }

    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::ServiceUnavailable | Self::LoginInProgress)
    }
}

/// Which exchange failed; decides the rejection category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoginMethod {
    Password,
    Google,
}

impl LoginMethod {
    fn as_str(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::Google => "google",
        }
    }
}

fn classify_failure(method: LoginMethod, status: u16) -> AuthError {
    match (status, method) {
        (0, _) => AuthError::ServiceUnavailable,
        (_, LoginMethod::Password) => AuthError::InvalidCredentials { status },
        (_, LoginMethod::Google) => AuthError::OAuthLoginFailed { status },
    }
}

/// `Basic base64(username:password)`.
fn basic_authorization(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

/// Resets the in-flight flag when the exchange finishes or is dropped.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct CredentialClient {
    transport: Arc<dyn Transport>,
    session: Arc<SessionStore>,
    login_url: String,
    google_login_url: String,
    in_flight: AtomicBool,
}

impl CredentialClient {
    #[must_use]
    pub fn new(api_base_url: &str, transport: Arc<dyn Transport>, session: Arc<SessionStore>) -> Self {
        Self {
            transport,
            session,
            login_url: login_endpoint(api_base_url),
            google_login_url: google_login_endpoint(api_base_url),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Build a client backed by [`HttpTransport`].
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn from_config(config: &ClientConfig, session: Arc<SessionStore>) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(config.timeouts)?;
        Ok(Self::new(&config.api_base_url, Arc::new(transport), session))
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// True while a login exchange is awaiting its response.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Exchange a username/password for a bearer token via `POST /login`.
    ///
    /// # Errors
    ///
    /// [`AuthError::ServiceUnavailable`] when the server cannot be reached,
    /// [`AuthError::InvalidCredentials`] for any other failure status,
    /// [`AuthError::MalformedToken`] if the issued token does not decode, and
    /// [`AuthError::LoginInProgress`] if another login is in flight.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let request = HttpRequest {
            url: self.login_url.clone(),
            authorization: Some(basic_authorization(username, password)),
            body: serde_json::json!({}),
        };
        tracing::debug!(%username, "password login");
        self.exchange(LoginMethod::Password, request).await
    }

    /// Exchange a Google access token for a bearer token via
    /// `POST /login/google`.
    ///
    /// # Errors
    ///
    /// As [`Self::login`], with [`AuthError::OAuthLoginFailed`] in place of
    /// [`AuthError::InvalidCredentials`].
    pub async fn google_login(&self, access_token: &str) -> Result<String, AuthError> {
        let request = HttpRequest {
            url: self.google_login_url.clone(),
            authorization: None,
            body: serde_json::json!({ "googleAccessToken": access_token }),
        };
        self.exchange(LoginMethod::Google, request).await
    }

    /// Sign out locally. The backend is not contacted.
    pub fn logout(&self) {
        tracing::info!("logout");
        self.session.clear();
    }

    async fn exchange(&self, method: LoginMethod, request: HttpRequest) -> Result<String, AuthError> {
        let _guard = self.begin()?;

        let response = match self.transport.post_json(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(method = method.as_str(), error = %e, "login service unreachable");
                return Err(classify_failure(method, 0));
            }
        };

        if !response.is_success() {
            tracing::warn!(method = method.as_str(), status = response.status, "login rejected");
            return Err(classify_failure(method, response.status));
        }

        let Some(token) = parse_token_response(&response.body) else {
            tracing::warn!(method = method.as_str(), status = response.status, "login response missing token");
            return Err(classify_failure(method, response.status));
        };

        self.session.set_from_token(&token)?;
        tracing::info!(method = method.as_str(), "login succeeded");
        Ok(token)
    }

    fn begin(&self) -> Result<InFlight<'_>, AuthError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("login already in flight");
            return Err(AuthError::LoginInProgress);
        }
        Ok(InFlight(&self.in_flight))
    }
}
