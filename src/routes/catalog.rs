use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use tower_sessions::Session;

use crate::{
    dto::{
        catalog::{CatalogPage, EditPage},
        listings::ListingForm,
    },
    error::{AppError, AppResult},
    flash::{self, Level},
    middleware::auth::RequireSeller,
    response::ApiResponse,
    routes::{page_meta, redirect_on_error},
    services::catalog_service::{self, ListingOutcome},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/sell", get(sell_page).post(sell))
        .route("/edit/{item_id}", get(edit_page).post(edit))
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Every listed item with its seller", body = ApiResponse<CatalogPage>)
    ),
    tag = "Catalog"
)]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Json<ApiResponse<CatalogPage>>> {
    let items = catalog_service::list_catalog(&state).await?;
    let meta = page_meta(&session).await?;
    Ok(Json(ApiResponse::success(
        "Catalog",
        CatalogPage { items },
        Some(meta),
    )))
}

#[utoipa::path(
    get,
    path = "/sell",
    responses(
        (status = 200, description = "Listing form"),
        (status = 303, description = "Not a logged-in seller")
    ),
    tag = "Catalog"
)]
pub async fn sell_page(
    RequireSeller(_seller): RequireSeller,
    session: Session,
) -> AppResult<Json<ApiResponse<()>>> {
    Ok(Json(ApiResponse::page("Sell", page_meta(&session).await?)))
}

#[utoipa::path(
    post,
    path = "/sell",
    responses(
        (status = 303, description = "To / once listed, back to /sell on invalid input")
    ),
    tag = "Catalog"
)]
pub async fn sell(
    RequireSeller(seller): RequireSeller,
    State(state): State<AppState>,
    session: Session,
    multipart: Multipart,
) -> AppResult<Redirect> {
    let form = match ListingForm::from_multipart(multipart).await {
        Ok(form) => form,
        Err(err) => return redirect_on_error(&session, err, "/sell").await,
    };

    match catalog_service::create_listing(&state, &seller, form).await {
        Ok(outcome) => {
            report_image_issue(&session, &outcome, "The item was listed without an image.")
                .await?;
            flash::redirect(&session, Level::Success, "Item listed for sale.", "/").await
        }
        Err(err) => redirect_on_error(&session, err, "/sell").await,
    }
}

#[utoipa::path(
    get,
    path = "/edit/{item_id}",
    params(
        ("item_id" = i64, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Edit form for one of the seller's items", body = ApiResponse<EditPage>),
        (status = 303, description = "Unknown item, not the owner, or not a seller")
    ),
    tag = "Catalog"
)]
pub async fn edit_page(
    RequireSeller(seller): RequireSeller,
    State(state): State<AppState>,
    session: Session,
    Path(item_id): Path<i64>,
) -> AppResult<Response> {
    let item = match catalog_service::load_for_edit(&state, &seller, item_id).await {
        Ok(item) => item,
        Err(err) => return Ok(redirect_on_error(&session, err, "/").await?.into_response()),
    };
    let meta = page_meta(&session).await?;
    Ok(Json(ApiResponse::success("Edit item", EditPage { item }, Some(meta))).into_response())
}

#[utoipa::path(
    post,
    path = "/edit/{item_id}",
    params(
        ("item_id" = i64, Path, description = "Item ID")
    ),
    responses(
        (status = 303, description = "To / once updated, back to the form on invalid input")
    ),
    tag = "Catalog"
)]
pub async fn edit(
    RequireSeller(seller): RequireSeller,
    State(state): State<AppState>,
    session: Session,
    Path(item_id): Path<i64>,
    multipart: Multipart,
) -> AppResult<Redirect> {
    let form_page = format!("/edit/{item_id}");
    let form = match ListingForm::from_multipart(multipart).await {
        Ok(form) => form,
        Err(err) => return redirect_on_error(&session, err, &form_page).await,
    };

    match catalog_service::edit_listing(&state, &seller, item_id, form).await {
        Ok(outcome) => {
            report_image_issue(&session, &outcome, "The previous image was kept.").await?;
            flash::redirect(&session, Level::Success, "Item updated successfully.", "/").await
        }
        // Bad input goes back to the form; a missing or foreign item has no form.
        Err(err @ AppError::BadRequest(_)) => redirect_on_error(&session, err, &form_page).await,
        Err(err) => redirect_on_error(&session, err, "/").await,
    }
}

async fn report_image_issue(
    session: &Session,
    outcome: &ListingOutcome,
    consequence: &str,
) -> AppResult<()> {
    if let Some(issue) = outcome.image_issue {
        flash::push(
            session,
            Level::Warning,
            format!("{} {consequence}", issue.message()),
        )
        .await?;
    }
    Ok(())
}
