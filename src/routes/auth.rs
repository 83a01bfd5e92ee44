use axum::{
    Form, Json, Router,
    extract::State,
    response::Redirect,
    routing::get,
};
use tower_sessions::Session;

use crate::{
    dto::auth::{LoginRequest, RegisterRequest},
    error::AppResult,
    flash::{self, Level},
    middleware::auth::set_current_user,
    response::ApiResponse,
    routes::{page_meta, redirect_on_error},
    services::auth_service::{login_user, register_user},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", get(register_page).post(register))
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
}

#[utoipa::path(
    get,
    path = "/register",
    responses(
        (status = 200, description = "Registration page")
    ),
    tag = "Auth"
)]
pub async fn register_page(session: Session) -> AppResult<Json<ApiResponse<()>>> {
    Ok(Json(ApiResponse::page("Register", page_meta(&session).await?)))
}

#[utoipa::path(
    post,
    path = "/register",
    request_body(content = RegisterRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "To /login on success, back to /register otherwise")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(payload): Form<RegisterRequest>,
) -> AppResult<Redirect> {
    match register_user(&state, payload).await {
        Ok(_) => {
            flash::redirect(
                &session,
                Level::Success,
                "Registration successful! Please log in.",
                "/login",
            )
            .await
        }
        Err(err) => redirect_on_error(&session, err, "/register").await,
    }
}

#[utoipa::path(
    get,
    path = "/login",
    responses(
        (status = 200, description = "Login page")
    ),
    tag = "Auth"
)]
pub async fn login_page(session: Session) -> AppResult<Json<ApiResponse<()>>> {
    Ok(Json(ApiResponse::page("Login", page_meta(&session).await?)))
}

#[utoipa::path(
    post,
    path = "/login",
    request_body(content = LoginRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "To / with a session on success, back to /login otherwise")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(payload): Form<LoginRequest>,
) -> AppResult<Redirect> {
    let user = match login_user(&state, payload).await {
        Ok(user) => user,
        Err(err) => return redirect_on_error(&session, err, "/login").await,
    };

    session.cycle_id().await?;
    set_current_user(&session, &user).await?;
    tracing::info!(user_id = user.id, "user logged in");

    flash::redirect(
        &session,
        Level::Success,
        format!("Welcome {}!", user.username),
        "/",
    )
    .await
}

#[utoipa::path(
    get,
    path = "/logout",
    responses(
        (status = 303, description = "Session cleared, to /")
    ),
    tag = "Auth"
)]
pub async fn logout(session: Session) -> AppResult<Redirect> {
    session.clear().await;
    flash::redirect(&session, Level::Success, "You have been logged out.", "/").await
}
