mod common;

use axum_marketplace::{
    error::AppError,
    models::{HistoryKind, Role},
    services::{catalog_service, purchase_service},
};
use common::{create_user, listing, png_upload, setup_state};

#[tokio::test]
async fn seller_listing_appears_in_catalog() -> anyhow::Result<()> {
    let (state, _uploads) = setup_state().await?;
    let seller = create_user(&state, "sam", Role::Seller).await?;

    let outcome =
        catalog_service::create_listing(&state, &seller, listing("Chair", "25.5", "3")).await?;
    assert!(outcome.image_issue.is_none());

    let catalog = catalog_service::list_catalog(&state).await?;
    assert_eq!(catalog.len(), 1);
    let entry = &catalog[0];
    assert_eq!(entry.title, "Chair");
    assert_eq!(entry.price, 25.5);
    assert_eq!(entry.quantity, 3);
    assert_eq!(entry.seller_id, seller.id);
    assert_eq!(entry.username.as_deref(), Some("sam"));
    assert!(entry.image_filename.is_none());
    Ok(())
}

#[tokio::test]
async fn listing_input_is_validated() -> anyhow::Result<()> {
    let (state, _uploads) = setup_state().await?;
    let seller = create_user(&state, "sam", Role::Seller).await?;

    let cases = [
        (listing("", "1", "1"), "Title, price and quantity are required."),
        (listing("Chair", "cheap", "1"), "Price must be a number and quantity an integer."),
        (listing("Chair", "-2", "1"), "Price and quantity must not be negative."),
        (listing("Chair", "2", "-1"), "Price and quantity must not be negative."),
    ];
    for (form, message) in cases {
        let err = catalog_service::create_listing(&state, &seller, form)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(err.to_string(), message);
    }

    assert!(catalog_service::list_catalog(&state).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn disallowed_image_is_dropped_but_listing_is_created() -> anyhow::Result<()> {
    let (state, uploads) = setup_state().await?;
    let seller = create_user(&state, "sam", Role::Seller).await?;

    let mut form = listing("Lamp", "10", "1");
    form.image = Some(png_upload("malware.exe", 10, 10));
    let outcome = catalog_service::create_listing(&state, &seller, form).await?;

    assert_eq!(
        outcome.image_issue,
        Some(catalog_service::ImageIssue::UnsupportedExtension)
    );
    assert!(outcome.item.image_filename.is_none());
    assert_eq!(std::fs::read_dir(uploads.path())?.count(), 0);
    assert_eq!(catalog_service::list_catalog(&state).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn last_unit_can_only_be_bought_once() -> anyhow::Result<()> {
    let (state, _uploads) = setup_state().await?;
    let seller = create_user(&state, "sam", Role::Seller).await?;
    let buyer = create_user(&state, "bea", Role::Buyer).await?;
    let item = catalog_service::create_listing(&state, &seller, listing("Rug", "120", "1"))
        .await?
        .item;

    let purchase = purchase_service::buy(&state, &buyer, item.id).await?;
    assert_eq!(purchase.price, 120.0);
    assert_eq!(purchase.title, "Rug");
    assert_eq!(purchase.seller_id, seller.id);
    assert_eq!(catalog_service::get_item(&state, item.id).await?.quantity, 0);

    let err = purchase_service::buy(&state, &buyer, item.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unavailable(_)));
    assert_eq!(err.to_string(), "Item is out of stock.");
    assert_eq!(err.notice_level(), Some(axum_marketplace::flash::Level::Warning));
    assert_eq!(catalog_service::get_item(&state, item.id).await?.quantity, 0);

    let history = purchase_service::history(&state, &buyer).await?;
    assert_eq!(history.entries.len(), 1);
    Ok(())
}

#[tokio::test]
async fn buying_unknown_item_is_not_found() -> anyhow::Result<()> {
    let (state, _uploads) = setup_state().await?;
    let buyer = create_user(&state, "bea", Role::Buyer).await?;

    let err = purchase_service::buy(&state, &buyer, 42).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(purchase_service::history(&state, &buyer).await?.entries.is_empty());
    Ok(())
}

#[tokio::test]
async fn non_owner_cannot_edit() -> anyhow::Result<()> {
    let (state, _uploads) = setup_state().await?;
    let owner = create_user(&state, "sam", Role::Seller).await?;
    let other = create_user(&state, "sid", Role::Seller).await?;
    let item = catalog_service::create_listing(&state, &owner, listing("Chair", "25.5", "3"))
        .await?
        .item;

    let mut form = listing("Ignored", "1", "99");
    form.image = Some(png_upload("new.png", 20, 20));
    let err = catalog_service::edit_listing(&state, &other, item.id, form)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert_eq!(err.notice_level(), Some(axum_marketplace::flash::Level::Danger));

    let err = catalog_service::load_for_edit(&state, &other, item.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let unchanged = catalog_service::get_item(&state, item.id).await?;
    assert_eq!(unchanged, item);
    Ok(())
}

#[tokio::test]
async fn owner_edit_changes_price_and_quantity_only() -> anyhow::Result<()> {
    let (state, _uploads) = setup_state().await?;
    let owner = create_user(&state, "sam", Role::Seller).await?;
    let item = catalog_service::create_listing(&state, &owner, listing("Chair", "25.5", "3"))
        .await?
        .item;

    let updated =
        catalog_service::edit_listing(&state, &owner, item.id, listing("Throne", "30", "7"))
            .await?
            .item;
    assert_eq!(updated.title, "Chair");
    assert_eq!(updated.description, item.description);
    assert_eq!(updated.price, 30.0);
    assert_eq!(updated.quantity, 7);

    let err = catalog_service::edit_listing(&state, &owner, item.id, listing("Chair", "", "1"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Price and quantity are required.");

    let err = catalog_service::edit_listing(&state, &owner, 999, listing("Chair", "1", "1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn purchases_keep_the_price_paid() -> anyhow::Result<()> {
    let (state, _uploads) = setup_state().await?;
    let seller = create_user(&state, "sam", Role::Seller).await?;
    let buyer = create_user(&state, "bea", Role::Buyer).await?;
    let item = catalog_service::create_listing(&state, &seller, listing("Chair", "25.5", "3"))
        .await?
        .item;

    purchase_service::buy(&state, &buyer, item.id).await?;
    catalog_service::edit_listing(&state, &seller, item.id, listing("Chair", "99", "2")).await?;
    purchase_service::buy(&state, &buyer, item.id).await?;

    let history = purchase_service::history(&state, &buyer).await?;
    assert_eq!(history.kind, HistoryKind::Purchases);
    let prices: Vec<f64> = history.entries.iter().map(|e| e.price).collect();
    // Newest first.
    assert_eq!(prices, vec![99.0, 25.5]);
    assert!(history.entries.iter().all(|e| e.counterparty == "sam"));
    Ok(())
}

#[tokio::test]
async fn history_branches_on_role() -> anyhow::Result<()> {
    let (state, _uploads) = setup_state().await?;
    let seller = create_user(&state, "sam", Role::Seller).await?;
    let other_seller = create_user(&state, "sid", Role::Seller).await?;
    let buyer = create_user(&state, "bea", Role::Buyer).await?;

    let chair = catalog_service::create_listing(&state, &seller, listing("Chair", "25.5", "3"))
        .await?
        .item;
    let lamp = catalog_service::create_listing(&state, &other_seller, listing("Lamp", "5", "3"))
        .await?
        .item;

    purchase_service::buy(&state, &buyer, chair.id).await?;
    purchase_service::buy(&state, &buyer, lamp.id).await?;
    // Sellers may buy too; the purchase shows up in the other seller's sales.
    purchase_service::buy(&state, &seller, lamp.id).await?;

    let sales = purchase_service::history(&state, &seller).await?;
    assert_eq!(sales.kind, HistoryKind::Sales);
    assert_eq!(sales.entries.len(), 1);
    assert_eq!(sales.entries[0].title, "Chair");
    assert_eq!(sales.entries[0].counterparty, "bea");

    let other_sales = purchase_service::history(&state, &other_seller).await?;
    let buyers: Vec<&str> = other_sales
        .entries
        .iter()
        .map(|e| e.counterparty.as_str())
        .collect();
    assert_eq!(buyers, vec!["sam", "bea"]);

    let bought = purchase_service::history(&state, &buyer).await?;
    assert_eq!(bought.kind, HistoryKind::Purchases);
    let titles: Vec<&str> = bought.entries.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Lamp", "Chair"]);
    Ok(())
}
