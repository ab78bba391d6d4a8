//! Networking for the login exchanges.
//!
//! SYSTEM CONTEXT
//! ==============
//! `types` defines the wire schema, `transport` abstracts the HTTP hop so it
//! can be mocked, and `credentials` turns responses into sessions or
//! classified errors.

pub mod credentials;
pub mod transport;
pub mod types;
