//! Login dialog controller: password submit and Google hand-off.
//!
//! SYSTEM CONTEXT
//! ==============
//! The view layer binds its inputs to [`LoginForm`] and renders the failure
//! banner from [`LoginForm::failure_message`]. A successful login marks the
//! form closed so the surrounding modal can dismiss itself.

#[cfg(test)]
#[path = "login_form_test.rs"]
mod login_form_test;

use crate::net::credentials::{AuthError, CredentialClient};
use crate::oauth::OAuthBridge;

pub const REQUIRED_FIELDS_MESSAGE: &str = "Enter both username and password.";

/// Result of one submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Input failed validation; nothing was sent.
    Invalid(&'static str),
    LoggedIn,
    /// The exchange failed; the failure banner is open.
    Failed,
    /// The user abandoned Google consent.
    Cancelled,
}

/// Both fields are required. Values are sent exactly as typed.
///
/// # Errors
///
/// Returns the validation message when either field is empty.
pub fn validate_credentials_input(username: &str, password: &str) -> Result<(String, String), &'static str> {
    if username.is_empty() || password.is_empty() {
        return Err(REQUIRED_FIELDS_MESSAGE);
    }
    Ok((username.to_owned(), password.to_owned()))
}

#[derive(Debug, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    failure: Option<String>,
    closed: bool,
}

impl LoginForm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        validate_credentials_input(&self.username, &self.password).is_ok()
    }

    /// Submit the password form.
    pub async fn submit(&mut self, client: &CredentialClient) -> SubmitOutcome {
        let (username, password) = match validate_credentials_input(&self.username, &self.password) {
            Ok(fields) => fields,
            Err(message) => return SubmitOutcome::Invalid(message),
        };
        let result = client.login(&username, &password).await;
        self.settle(result)
    }

    /// Exchange an access token delivered by the Google token client.
    pub async fn handle_google_token(&mut self, client: &CredentialClient, access_token: &str) -> SubmitOutcome {
        let result = client.google_login(access_token).await;
        self.settle(result)
    }

    /// Run the whole Google flow through `bridge`.
    pub async fn sign_in_with_google(&mut self, client: &CredentialClient, bridge: &OAuthBridge) -> SubmitOutcome {
        match bridge.sign_in(client).await {
            Ok(Some(token)) => self.settle(Ok(token)),
            Ok(None) => SubmitOutcome::Cancelled,
            Err(e) => self.settle(Err(e)),
        }
    }

    fn settle(&mut self, result: Result<String, AuthError>) -> SubmitOutcome {
        match result {
            Ok(_) => {
                self.failure = None;
                self.closed = true;
                SubmitOutcome::LoggedIn
            }
            Err(e) => {
                tracing::debug!(code = e.error_code(), "login form failure");
                self.failure = Some(e.to_string());
                SubmitOutcome::Failed
            }
        }
    }

    #[must_use]
    pub fn is_failure_open(&self) -> bool {
        self.failure.is_some()
    }

    #[must_use]
    pub fn failure_message(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn dismiss_failure(&mut self) {
        self.failure = None;
    }

    /// True once a login succeeded; the host closes the dialog.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
