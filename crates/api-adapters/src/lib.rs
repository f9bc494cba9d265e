//! # api-adapters
//!
//! The HTTP surface: axum routes, session extractors, Askama
//! templates and the Prometheus request counter. Domain outcomes map
//! to HTTP here — `NotFound` becomes a 404 page, `Unauthorized` a
//! login redirect, `Forbidden` a silent redirect to the detail view,
//! `Invalid` a re-rendered form.

#[cfg(feature = "web-axum")]
pub mod extract;
#[cfg(feature = "web-axum")]
pub mod handlers;
#[cfg(feature = "web-axum")]
pub mod metrics;
#[cfg(feature = "web-axum")]
pub mod templates;

#[cfg(feature = "web-axum")]
pub use handlers::{router, AppState};
