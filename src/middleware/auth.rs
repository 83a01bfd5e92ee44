//! Session identity and the route guards built on it.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use utoipa::ToSchema;

use crate::{
    error::AppError,
    flash::{self, Level},
    models::Role,
    services::auth_service::find_user,
    state::AppState,
};

/// Session key holding the logged-in [`CurrentUser`].
pub const CURRENT_USER: &str = "current_user";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_seller(&self) -> bool {
        self.role == Role::Seller
    }
}

pub async fn current_user(
    session: &Session,
) -> Result<Option<CurrentUser>, tower_sessions::session::Error> {
    session.get(CURRENT_USER).await
}

pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(CURRENT_USER, user).await
}

/// Rejection of a guard: a notice has been queued and the client is sent
/// elsewhere, or the session layer itself failed.
pub enum GuardRejection {
    Redirect(Redirect),
    Error(AppError),
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Redirect(redirect) => redirect.into_response(),
            Self::Error(err) => err.into_response(),
        }
    }
}

impl From<AppError> for GuardRejection {
    fn from(err: AppError) -> Self {
        Self::Error(err)
    }
}

impl From<tower_sessions::session::Error> for GuardRejection {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Error(err.into())
    }
}

fn session_from_parts(parts: &Parts) -> Result<Session, GuardRejection> {
    parts
        .extensions
        .get::<Session>()
        .cloned()
        .ok_or_else(|| {
            GuardRejection::Error(AppError::Internal(anyhow::anyhow!(
                "session layer is not installed"
            )))
        })
}

/// Requires a logged-in user; otherwise warns and redirects to `/login`.
pub struct RequireLogin(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireLogin
where
    S: Send + Sync,
{
    type Rejection = GuardRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = session_from_parts(parts)?;
        match current_user(&session).await? {
            Some(user) => Ok(Self(user)),
            None => {
                let redirect =
                    flash::redirect(&session, Level::Warning, "Please log in first.", "/login")
                        .await?;
                Err(GuardRejection::Redirect(redirect))
            }
        }
    }
}

/// Requires a logged-in seller. The role is re-read from storage rather than
/// trusted from the session.
pub struct RequireSeller(pub CurrentUser);

impl FromRequestParts<AppState> for RequireSeller {
    type Rejection = GuardRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireLogin(user) = RequireLogin::from_request_parts(parts, state).await?;

        let stored = find_user(state, user.id).await?;
        let is_seller = stored.is_some_and(|u| u.role == Role::Seller);

        if !is_seller {
            let session = session_from_parts(parts)?;
            let redirect =
                flash::redirect(&session, Level::Danger, "Only sellers can list items.", "/")
                    .await?;
            return Err(GuardRejection::Redirect(redirect));
        }

        Ok(Self(user))
    }
}
