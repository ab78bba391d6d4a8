use super::*;
use crate::net::credentials::{INVALID_CREDENTIALS_MESSAGE, OAUTH_LOGIN_FAILED_MESSAGE, SERVICE_UNAVAILABLE_MESSAGE};
use crate::net::transport::{HttpRequest, HttpResponse, Transport, TransportError};
use crate::oauth::{AccessToken, ConsentProvider, OAuthConfig, TokenGrant};
use crate::session::test_helpers::{john_token, memory_store};
use std::sync::{Arc, Mutex};

struct ScriptedTransport {
    responses: Mutex<Vec<Result<HttpResponse, TransportError>>>,
    calls: Mutex<usize>,
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn post_json(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
        *self.calls.lock().unwrap() += 1;
        self.responses.lock().unwrap().remove(0)
    }
}

fn client_with(responses: Vec<Result<HttpResponse, TransportError>>) -> (Arc<ScriptedTransport>, CredentialClient) {
    let transport = Arc::new(ScriptedTransport { responses: Mutex::new(responses), calls: Mutex::new(0) });
    let (_, store) = memory_store();
    let client = CredentialClient::new("http://blog.test/api", transport.clone(), Arc::new(store));
    (transport, client)
}

fn ok() -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse { status: 200, body: serde_json::json!({ "token": john_token(3600) }).to_string() })
}

fn filled() -> LoginForm {
    let mut form = LoginForm::new();
    form.username = "rosario123".to_owned();
    form.password = "hunter2".to_owned();
    form
}

#[test]
fn validate_credentials_input_keeps_fields_as_typed() {
    assert_eq!(
        validate_credentials_input("  alice ", " pw "),
        Ok(("  alice ".to_owned(), " pw ".to_owned()))
    );
    assert_eq!(validate_credentials_input("alice", "   "), Ok(("alice".to_owned(), "   ".to_owned())));
}

#[test]
fn validate_credentials_input_requires_both_fields() {
    assert_eq!(validate_credentials_input("", "pw"), Err(REQUIRED_FIELDS_MESSAGE));
    assert_eq!(validate_credentials_input("alice", ""), Err(REQUIRED_FIELDS_MESSAGE));
}

#[tokio::test]
async fn invalid_form_sends_nothing() {
    let (transport, client) = client_with(vec![]);
    let mut form = LoginForm::new();
    form.username = "alice".to_owned();

    assert!(!form.is_valid());
    assert_eq!(form.submit(&client).await, SubmitOutcome::Invalid(REQUIRED_FIELDS_MESSAGE));
    assert_eq!(*transport.calls.lock().unwrap(), 0);
    assert!(!form.is_failure_open());
}

#[tokio::test]
async fn successful_submit_closes_form() {
    let (_, client) = client_with(vec![ok()]);
    let mut form = filled();

    assert_eq!(form.submit(&client).await, SubmitOutcome::LoggedIn);
    assert!(form.is_closed());
    assert!(!form.is_failure_open());
    assert!(client.session().is_logged_in());
}

#[tokio::test]
async fn rejected_submit_opens_failure_banner() {
    let (_, client) = client_with(vec![Ok(HttpResponse { status: 401, body: String::new() })]);
    let mut form = filled();

    assert_eq!(form.submit(&client).await, SubmitOutcome::Failed);
    assert!(form.is_failure_open());
    assert_eq!(form.failure_message(), Some(INVALID_CREDENTIALS_MESSAGE));
    assert!(!form.is_closed());

    form.dismiss_failure();
    assert!(!form.is_failure_open());
}

#[tokio::test]
async fn unreachable_submit_reports_service_down() {
    let (_, client) = client_with(vec![Err(TransportError::Unreachable("refused".to_owned()))]);
    let mut form = filled();

    assert_eq!(form.submit(&client).await, SubmitOutcome::Failed);
    assert_eq!(form.failure_message(), Some(SERVICE_UNAVAILABLE_MESSAGE));
}

#[tokio::test]
async fn retry_after_failure_clears_banner() {
    let (_, client) = client_with(vec![Ok(HttpResponse { status: 401, body: String::new() }), ok()]);
    let mut form = filled();

    assert_eq!(form.submit(&client).await, SubmitOutcome::Failed);
    assert_eq!(form.submit(&client).await, SubmitOutcome::LoggedIn);
    assert!(!form.is_failure_open());
}

#[tokio::test]
async fn google_token_failure_uses_oauth_message() {
    let (_, client) = client_with(vec![Ok(HttpResponse { status: 403, body: String::new() })]);
    let mut form = LoginForm::new();

    assert_eq!(form.handle_google_token(&client, "ya29").await, SubmitOutcome::Failed);
    assert_eq!(form.failure_message(), Some(OAUTH_LOGIN_FAILED_MESSAGE));
}

struct Approve;

impl ConsentProvider for Approve {
    fn request_access_token(&self, _config: &OAuthConfig, grant: TokenGrant) {
        grant.complete(AccessToken::new("ya29.ok"));
    }
}

struct Abandon;

impl ConsentProvider for Abandon {
    fn request_access_token(&self, _config: &OAuthConfig, _grant: TokenGrant) {}
}

#[tokio::test]
async fn google_flow_success_closes_form() {
    let (_, client) = client_with(vec![ok()]);
    let bridge = OAuthBridge::new(OAuthConfig::new("cid", "http://localhost:4200"), Arc::new(Approve));
    let mut form = LoginForm::new();

    assert_eq!(form.sign_in_with_google(&client, &bridge).await, SubmitOutcome::LoggedIn);
    assert!(form.is_closed());
}

#[tokio::test]
async fn google_flow_cancelled_leaves_form_open() {
    let (transport, client) = client_with(vec![]);
    let bridge = OAuthBridge::new(OAuthConfig::new("cid", "http://localhost:4200"), Arc::new(Abandon));
    let mut form = LoginForm::new();

    assert_eq!(form.sign_in_with_google(&client, &bridge).await, SubmitOutcome::Cancelled);
    assert!(!form.is_closed());
    assert!(!form.is_failure_open());
    assert_eq!(*transport.calls.lock().unwrap(), 0);
}
