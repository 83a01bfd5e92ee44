use axum::{
    Json, Router,
    extract::{Path, State},
    response::Redirect,
    routing::{get, post},
};
use tower_sessions::Session;

use crate::{
    dto::purchases::History,
    error::AppResult,
    flash::{self, Level},
    middleware::auth::RequireLogin,
    response::ApiResponse,
    routes::{page_meta, redirect_on_error},
    services::purchase_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/buy/{item_id}", post(buy))
        .route("/purchases", get(purchases))
}

#[utoipa::path(
    post,
    path = "/buy/{item_id}",
    params(
        ("item_id" = i64, Path, description = "Item ID")
    ),
    responses(
        (status = 303, description = "To / with the outcome as a notice")
    ),
    tag = "Purchases"
)]
pub async fn buy(
    RequireLogin(user): RequireLogin,
    State(state): State<AppState>,
    session: Session,
    Path(item_id): Path<i64>,
) -> AppResult<Redirect> {
    match purchase_service::buy(&state, &user, item_id).await {
        Ok(purchase) => {
            flash::redirect(
                &session,
                Level::Success,
                format!("Bought '{}' for ${:.2}", purchase.title, purchase.price),
                "/",
            )
            .await
        }
        Err(err) => redirect_on_error(&session, err, "/").await,
    }
}

#[utoipa::path(
    get,
    path = "/purchases",
    responses(
        (status = 200, description = "Sales for sellers, purchases for everyone else", body = ApiResponse<History>),
        (status = 303, description = "Not logged in")
    ),
    tag = "Purchases"
)]
pub async fn purchases(
    RequireLogin(user): RequireLogin,
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Json<ApiResponse<History>>> {
    let history = purchase_service::history(&state, &user).await?;
    let meta = page_meta(&session).await?;
    Ok(Json(ApiResponse::success("History", history, Some(meta))))
}
