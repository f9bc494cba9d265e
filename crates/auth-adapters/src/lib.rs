//! # auth-adapters
//!
//! Session-token adapters for the `domains::Sessions` port. Identity
//! *issuance* (registration, passwords, login forms) is an external
//! system; this crate only turns tokens into viewers and mints local
//! development tokens for the seed tool.

#[cfg(feature = "auth-jwt")]
pub mod jwt;

#[cfg(feature = "auth-jwt")]
pub use jwt::JwtSessions;

/// Name of the cookie the HTTP layer reads the session token from.
pub const SESSION_COOKIE: &str = "session";
