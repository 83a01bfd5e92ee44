use axum::{Router, response::Redirect};
use tower_sessions::Session;

use crate::{
    error::{AppError, AppResult},
    flash,
    middleware::auth::current_user,
    response::Meta,
    state::AppState,
};

pub mod auth;
pub mod catalog;
pub mod doc;
pub mod health;
pub mod purchases;
pub mod textgen;

// Build the router without binding state; it will be provided at the top level.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(catalog::router())
        .merge(purchases::router())
        .merge(textgen::router())
}

/// Context every page carries: pending notices (drained) and the session user.
pub(crate) async fn page_meta(session: &Session) -> AppResult<Meta> {
    let notices = flash::take(session).await?;
    let user = current_user(session).await?;
    Ok(Meta::new(notices, user))
}

/// Report a user-facing error as a notice on the page at `to`; anything else
/// propagates as an error response.
pub(crate) async fn redirect_on_error(
    session: &Session,
    err: AppError,
    to: &str,
) -> AppResult<Redirect> {
    match err.notice_level() {
        Some(level) => {
            tracing::debug!(error = %err, redirect = to, "request rejected");
            flash::redirect(session, level, err.to_string(), to).await
        }
        None => Err(err),
    }
}
