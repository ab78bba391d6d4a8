
use std::io::{self, BufRead, Write as _};
use std::path::PathBuf;
use std::sync::Arc;

use blog_session::config::ConfigError;
use blog_session::login_form::validate_credentials_input;
use blog_session::net::transport::TransportError;
use blog_session::oauth::{AccessToken, ConsentProvider, OAuthBridge, OAuthConfig, OAuthError, TokenGrant, parse_redirect};
use blog_session::storage::FileStorage;
use blog_session::{AuthError, ClientConfig, CredentialClient, SessionStore, UserIdentity};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

const DEFAULT_STORAGE_DIR_NAME: &str = ".blog-session";

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("http client setup failed: {0}")]
    Transport(#[from] TransportError),
    #[error("{0}")]
    Auth(#[from] AuthError),
    #[error("{0}")]
    InvalidInput(&'static str),
    #[error("google sign-in is not configured; set BLOG_GOOGLE_CLIENT_ID")]
    GoogleNotConfigured,
    #[error("google sign-in was cancelled")]
    Cancelled,
    #[error("no home directory; pass --storage-dir or set BLOG_STORAGE_DIR")]
    NoStorageDir,
    #[error("io failed: {0}")]
    Io(#[from] io::Error),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "blog-cli", about = "Sign in to the blog backend and inspect the stored session")]
struct Cli {
    /// Token directory; overrides `BLOG_STORAGE_DIR`.
    #[arg(long)]
    storage_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Password login; prompts for the password when it is not given.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "BLOG_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Google login, either with a ready access token or via consent in a browser.
    GoogleLogin {
        #[arg(long, env = "BLOG_GOOGLE_ACCESS_TOKEN", hide_env_values = true)]
        access_token: Option<String>,
    },
    /// Print the signed-in identity.
    Whoami,
    /// Print whether the session holds any of the given roles.
    HasRole {
        #[arg(required = true)]
        roles: Vec<String>,
    },
    /// Forget the stored token.
    Logout,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env()?;
    let storage_dir = resolve_storage_dir(cli.storage_dir, config.storage_dir.clone(), dirs::home_dir())?;
    tracing::debug!(dir = %storage_dir.display(), api = %config.api_base_url, "starting");

    let session = Arc::new(SessionStore::new(Arc::new(FileStorage::new(storage_dir))));
    session.initialize().await;

    match cli.command {
        Command::Login { username, password } => {
            let password = match password {
                Some(password) => password,
                None => prompt("password: ")?,
            };
            let (username, password) = validate_credentials_input(&username, &password).map_err(CliError::InvalidInput)?;
            let client = CredentialClient::from_config(&config, session.clone())?;
            client.login(&username, &password).await?;
            print_identity(session.user().as_ref())
        }
        Command::GoogleLogin { access_token } => {
            let client = CredentialClient::from_config(&config, session.clone())?;
            match access_token {
                Some(token) => {
                    client.google_login(token.trim()).await?;
                }
                None => {
                    let google = config.google.clone().ok_or(CliError::GoogleNotConfigured)?;
                    let bridge = OAuthBridge::new(google, Arc::new(TerminalConsent));
                    bridge.sign_in(&client).await?.ok_or(CliError::Cancelled)?;
                }
            }
            print_identity(session.user().as_ref())
        }
        Command::Whoami => print_identity(session.user().as_ref()),
        Command::HasRole { roles } => {
            let roles: Vec<&str> = roles.iter().map(String::as_str).collect();
            print_json(&json!({ "hasAnyRole": session.has_any_role(&roles) }))
        }
        Command::Logout => {
            session.clear();
            print_identity(None)
        }
    }
}

/// Flag, then env/config, then `$HOME/.blog-session`.
fn resolve_storage_dir(
    flag: Option<PathBuf>,
    configured: Option<PathBuf>,
    home: Option<PathBuf>,
) -> Result<PathBuf, CliError> {
    flag.or(configured)
        .or_else(|| home.map(|h| h.join(DEFAULT_STORAGE_DIR_NAME)))
        .ok_or(CliError::NoStorageDir)
}

fn identity_json(user: Option<&UserIdentity>) -> Value {
    let Some(user) = user else {
        return json!({ "loggedIn": false });
    };
    json!({
        "loggedIn": true,
        "username": user.username,
        "userId": user.user_id,
        "displayName": user.display_name,
        "initials": user.initials(),
        "roles": user.roles,
        "expiry": user.expiry,
    })
}

fn print_identity(user: Option<&UserIdentity>) -> Result<(), CliError> {
    print_json(&identity_json(user))
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

fn prompt(label: &str) -> Result<String, CliError> {
    let mut stderr = io::stderr();
    stderr.write_all(label.as_bytes())?;
    stderr.flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

// =============================================================================
// TERMINAL CONSENT
// =============================================================================

/// Prints the authorization URL and waits for the user to paste back the
/// redirect they land on (or the bare access token).
struct TerminalConsent;

impl ConsentProvider for TerminalConsent {
    fn request_access_token(&self, config: &OAuthConfig, grant: TokenGrant) {
        let url = config.authorize_url(grant.state());
        eprintln!("Open this URL in a browser and approve access:\n\n  {url}\n");
        tokio::task::spawn_blocking(move || {
            let input = match prompt("paste the redirect URL (empty to cancel): ") {
                Ok(input) => input,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read consent redirect");
                    return;
                }
            };
            match access_token_from_input(&input, grant.state()) {
                Ok(Some(token)) => {
                    grant.complete(token);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "consent redirect rejected"),
            }
        });
    }
}

/// Empty input cancels. Anything that looks like a URL is parsed as the
/// provider redirect; otherwise the input is taken as the token itself.
fn access_token_from_input(input: &str, state: &str) -> Result<Option<AccessToken>, OAuthError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    if input.contains("://") {
        return parse_redirect(input, Some(state)).map(Some);
    }
    Ok(Some(AccessToken::new(input)))
}
