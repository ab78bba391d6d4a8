use super::*;

/// # Safety
/// Tests must run with `--test-threads=1` to avoid env races.
unsafe fn clear_blog_env() {
    unsafe {
        std::env::remove_var("BLOG_API_BASE_URL");
        std::env::remove_var("BLOG_GOOGLE_CLIENT_ID");
        std::env::remove_var("BLOG_GOOGLE_REDIRECT_URI");
        std::env::remove_var("BLOG_GOOGLE_SCOPES");
        std::env::remove_var("BLOG_REQUEST_TIMEOUT_SECS");
        std::env::remove_var("BLOG_CONNECT_TIMEOUT_SECS");
        std::env::remove_var("BLOG_STORAGE_DIR");
    }
}

// Env-driven cases share one test so parallel test threads cannot interleave
// their variable writes.
#[test]
fn from_env_defaults_and_overrides() {
    unsafe { clear_blog_env() };

    let cfg = ClientConfig::from_env().unwrap();
    assert_eq!(cfg.api_base_url, DEFAULT_API_BASE_URL);
    assert!(cfg.google.is_none());
    assert_eq!(cfg.timeouts, HttpTimeouts::default());
    assert!(cfg.storage_dir.is_none());

    unsafe {
        std::env::set_var("BLOG_API_BASE_URL", " https://blog.example.com/api/ ");
        std::env::set_var("BLOG_GOOGLE_CLIENT_ID", "client-123");
        std::env::set_var("BLOG_GOOGLE_SCOPES", "email openid");
        std::env::set_var("BLOG_REQUEST_TIMEOUT_SECS", "42");
        std::env::set_var("BLOG_CONNECT_TIMEOUT_SECS", "nope");
        std::env::set_var("BLOG_STORAGE_DIR", "/tmp/blog-session");
    }

    let cfg = ClientConfig::from_env().unwrap();
    assert_eq!(cfg.api_base_url, "https://blog.example.com/api");
    let google = cfg.google.unwrap();
    assert_eq!(google.client_id, "client-123");
    assert_eq!(google.redirect_uri, DEFAULT_GOOGLE_REDIRECT_URI);
    assert_eq!(google.scopes, vec!["email".to_owned(), "openid".to_owned()]);
    assert_eq!(cfg.timeouts, HttpTimeouts { request_secs: 42, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS });
    assert_eq!(cfg.storage_dir, Some(PathBuf::from("/tmp/blog-session")));

    unsafe {
        clear_blog_env();
        std::env::set_var("BLOG_API_BASE_URL", "ftp://blog.example.com");
    }
    let err = ClientConfig::from_env().unwrap_err().to_string();
    assert!(err.contains("expected http or https"));

    unsafe { clear_blog_env() };
}

#[test]
fn parse_base_url_trims_trailing_slashes() {
    assert_eq!(parse_base_url("http://localhost:8080/api//").unwrap(), "http://localhost:8080/api");
}

#[test]
fn parse_base_url_rejects_blank_and_relative() {
    assert!(matches!(parse_base_url("   "), Err(ConfigError::InvalidBaseUrl(_))));
    assert!(matches!(parse_base_url("/api"), Err(ConfigError::InvalidBaseUrl(_))));
}
