//! Session extractors. `MaybeViewer` never rejects; `RequireViewer`
//! answers unauthenticated requests with a 302 to the login page,
//! carrying the original path in `next`.

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use axum::response::Response;

use domains::Viewer;

use crate::handlers::{found, AppState};

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session";

fn viewer_from_parts(parts: &Parts, state: &AppState) -> Option<Viewer> {
    let cookies = parts.headers.get(header::COOKIE)?.to_str().ok()?;
    let token = cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then_some(value)
    })?;
    state.sessions.verify(token)
}

pub fn login_redirect(next: &str) -> Response {
    found(&format!("/auth/login/?next={next}"))
}

/// The viewer if a valid session cookie came along, None otherwise.
pub struct MaybeViewer(pub Option<Viewer>);

impl FromRequestParts<AppState> for MaybeViewer {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeViewer(viewer_from_parts(parts, state)))
    }
}

/// Rejects unauthenticated requests with a login redirect.
pub struct RequireViewer(pub Viewer);

impl FromRequestParts<AppState> for RequireViewer {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        viewer_from_parts(parts, state)
            .map(RequireViewer)
            .ok_or_else(|| login_redirect(parts.uri.path()))
    }
}
