use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use sea_orm::ActiveValue::NotSet;

use crate::{
    dto::listings::ListingForm,
    entity::{
        Items,
        items::{ActiveModel as ItemActive, Model as ItemModel},
    },
    error::{AppError, AppResult},
    middleware::auth::CurrentUser,
    models::{CatalogEntry, Item},
    state::AppState,
    upload::{IngestError, Upload},
};

/// Why an uploaded image was not attached to a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageIssue {
    UnsupportedExtension,
    ProcessingFailed,
}

impl ImageIssue {
    pub fn message(&self) -> &'static str {
        match self {
            ImageIssue::UnsupportedExtension => "Only PNG, JPG, JPEG, and GIF images are allowed.",
            ImageIssue::ProcessingFailed => "Error uploading image.",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListingOutcome {
    pub item: Item,
    pub image_issue: Option<ImageIssue>,
}

pub async fn list_catalog(state: &AppState) -> AppResult<Vec<CatalogEntry>> {
    let items = sqlx::query_as::<_, CatalogEntry>(
        r#"
        SELECT i.id, i.seller_id, i.title, i.description, i.price, i.quantity,
               i.image_filename, u.username
        FROM items i
        LEFT JOIN users u ON i.seller_id = u.id
        ORDER BY i.id
        "#,
    )
    .fetch_all(&state.pool)
    .await?;
    Ok(items)
}

pub async fn get_item(state: &AppState, id: i64) -> AppResult<Item> {
    let item = Items::find_by_id(id).one(&state.orm).await?;
    match item {
        Some(item) => Ok(item_from_entity(item)),
        None => Err(AppError::NotFound("Item not found.".into())),
    }
}

/// Fetch an item for editing, refusing anyone but its seller.
pub async fn load_for_edit(state: &AppState, seller: &CurrentUser, id: i64) -> AppResult<Item> {
    let item = get_item(state, id).await?;
    ensure_owner(seller, item.seller_id)?;
    Ok(item)
}

pub async fn create_listing(
    state: &AppState,
    seller: &CurrentUser,
    form: ListingForm,
) -> AppResult<ListingOutcome> {
    let title = form.title.as_deref().unwrap_or_default().trim().to_string();
    let description = form.description.map(|d| d.trim().to_string());
    let price = form.price.as_deref().unwrap_or("0").trim();
    let quantity = form.quantity.as_deref().unwrap_or("1").trim();

    if title.is_empty() || price.is_empty() || quantity.is_empty() {
        return Err(AppError::BadRequest(
            "Title, price and quantity are required.".into(),
        ));
    }
    let (price, quantity) = parse_price_and_quantity(price, quantity)?;

    let (image_filename, image_issue) = match &form.image {
        Some(upload) => attach_image(state, upload).await,
        None => (None, None),
    };

    let item = ItemActive {
        id: NotSet,
        seller_id: Set(seller.id),
        title: Set(title),
        description: Set(description),
        price: Set(price),
        quantity: Set(quantity),
        image_filename: Set(image_filename),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(item_id = item.id, seller_id = seller.id, "item listed");
    Ok(ListingOutcome {
        item: item_from_entity(item),
        image_issue,
    })
}

/// Update price, quantity and optionally the image of a seller's own item.
/// Title and description stay as listed.
pub async fn edit_listing(
    state: &AppState,
    seller: &CurrentUser,
    id: i64,
    form: ListingForm,
) -> AppResult<ListingOutcome> {
    let existing = Items::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Item not found.".into()))?;
    ensure_owner(seller, existing.seller_id)?;

    let price = form.price.as_deref().unwrap_or("0").trim();
    let quantity = form.quantity.as_deref().unwrap_or("1").trim();
    if price.is_empty() || quantity.is_empty() {
        return Err(AppError::BadRequest(
            "Price and quantity are required.".into(),
        ));
    }
    let (price, quantity) = parse_price_and_quantity(price, quantity)?;

    let old_image = existing.image_filename.clone();
    let (new_image, image_issue) = match &form.image {
        Some(upload) => attach_image(state, upload).await,
        None => (None, None),
    };

    let mut active: ItemActive = existing.into();
    active.price = Set(price);
    active.quantity = Set(quantity);
    if let Some(filename) = &new_image {
        active.image_filename = Set(Some(filename.clone()));
    }
    let item = active.update(&state.orm).await?;

    if let (Some(new), Some(old)) = (&new_image, &old_image) {
        if new != old {
            state.images.remove(old).await;
        }
    }

    tracing::info!(item_id = item.id, seller_id = seller.id, "item updated");
    Ok(ListingOutcome {
        item: item_from_entity(item),
        image_issue,
    })
}

fn ensure_owner(user: &CurrentUser, seller_id: i64) -> AppResult<()> {
    if seller_id != user.id {
        return Err(AppError::Forbidden(
            "You can only edit your own items.".into(),
        ));
    }
    Ok(())
}

/// Price must be a finite, non-negative number; quantity a non-negative
/// integer.
pub fn parse_price_and_quantity(price: &str, quantity: &str) -> AppResult<(f64, i64)> {
    let (Ok(price), Ok(quantity)) = (price.parse::<f64>(), quantity.parse::<i64>()) else {
        return Err(AppError::BadRequest(
            "Price must be a number and quantity an integer.".into(),
        ));
    };
    if !price.is_finite() || price < 0.0 || quantity < 0 {
        return Err(AppError::BadRequest(
            "Price and quantity must not be negative.".into(),
        ));
    }
    Ok((price, quantity))
}

async fn attach_image(state: &AppState, upload: &Upload) -> (Option<String>, Option<ImageIssue>) {
    match state.images.ingest(upload).await {
        Ok(filename) => (Some(filename), None),
        Err(IngestError::UnsupportedExtension(name)) => {
            tracing::warn!(upload = %name, "rejected image with unsupported extension");
            (None, Some(ImageIssue::UnsupportedExtension))
        }
        Err(_) => (None, Some(ImageIssue::ProcessingFailed)),
    }
}

pub(crate) fn item_from_entity(model: ItemModel) -> Item {
    Item {
        id: model.id,
        seller_id: model.seller_id,
        title: model.title,
        description: model.description,
        price: model.price,
        quantity: model.quantity,
        image_filename: model.image_filename,
    }
}
