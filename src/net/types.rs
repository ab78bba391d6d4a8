//! Wire DTOs for the blog backend's login endpoints.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::{Deserialize, Serialize};

/// Success body of both login endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// `{apiBase}/login`.
#[must_use]
pub fn login_endpoint(api_base: &str) -> String {
    format!("{}/login", api_base.trim_end_matches('/'))
}

/// `{apiBase}/login/google`.
#[must_use]
pub fn google_login_endpoint(api_base: &str) -> String {
    format!("{}/login/google", api_base.trim_end_matches('/'))
}

/// Extract the bearer token from a success body. `None` when the body is not
/// a `{ token }` object or the token is empty.
#[must_use]
pub fn parse_token_response(body: &str) -> Option<String> {
    let parsed: TokenResponse = serde_json::from_str(body).ok()?;
    (!parsed.token.is_empty()).then_some(parsed.token)
}
