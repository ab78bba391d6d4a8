//! Client-side authentication and session state for the blog frontend.
//!
//! ARCHITECTURE
//! ============
//! Leaves first:
//! - [`token`] decodes bearer tokens into claims (no signature check).
//! - [`storage`] is the durable key/value store behind the session.
//! - [`session`] is the single authoritative record of who is signed in.
//! - [`net`] performs the password and Google logins and installs tokens.
//! - [`oauth`] drives Google's access-token consent as a one-shot future.
//! - [`login_form`] is the login dialog's controller.
//!
//! Construct one [`SessionStore`], await [`SessionStore::initialize`] before
//! first render, and share it by `Arc` with the [`CredentialClient`] and every
//! view that asks about roles.

pub mod config;
pub mod login_form;
pub mod net;
pub mod oauth;
pub mod session;
pub mod storage;
pub mod token;

pub use config::ClientConfig;
pub use net::credentials::{AuthError, CredentialClient};
pub use session::{SessionStore, UserIdentity};
