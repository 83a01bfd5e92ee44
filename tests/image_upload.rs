mod common;

use axum::body::Bytes;
use axum_marketplace::{
    models::Role,
    services::catalog_service::{self, ImageIssue},
    upload::{IngestError, MAX_HEIGHT, MAX_WIDTH, Upload},
};
use common::{create_user, listing, png_upload, setup_state};
use image::{GenericImageView, ImageFormat};

#[tokio::test]
async fn ingest_downscales_flattens_and_writes_jpeg() -> anyhow::Result<()> {
    let (state, uploads) = setup_state().await?;

    let filename = state.images.ingest(&png_upload("../Big Lamp.PNG", 800, 400)).await?;
    assert!(filename.ends_with("_Big_Lamp.jpg"), "{filename}");
    assert!(!filename.contains('/'));

    let stored = std::fs::read(uploads.path().join(&filename))?;
    assert_eq!(image::guess_format(&stored)?, ImageFormat::Jpeg);

    let img = image::load_from_memory(&stored)?;
    let (w, h) = img.dimensions();
    assert!(w <= MAX_WIDTH && h <= MAX_HEIGHT);
    assert_eq!((w, h), (400, 200));

    // The transparent quadrant is now (close to) white; JPEG is lossy.
    let px = img.to_rgb8().get_pixel(10, 10).0;
    assert!(px.iter().all(|&c| c > 240), "{px:?}");
    Ok(())
}

#[tokio::test]
async fn ingest_rejects_bad_extension_and_undecodable_data() -> anyhow::Result<()> {
    let (state, uploads) = setup_state().await?;

    let err = state
        .images
        .ingest(&png_upload("malware.exe", 10, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::UnsupportedExtension(_)));

    let garbage = Upload {
        filename: "photo.jpg".to_string(),
        bytes: Bytes::from_static(b"not really a jpeg"),
    };
    let err = state.images.ingest(&garbage).await.unwrap_err();
    assert!(matches!(err, IngestError::Decode(_)));

    assert_eq!(std::fs::read_dir(uploads.path())?.count(), 0);
    Ok(())
}

#[tokio::test]
async fn listing_with_image_stores_file_and_edit_replaces_it() -> anyhow::Result<()> {
    let (state, uploads) = setup_state().await?;
    let seller = create_user(&state, "sam", Role::Seller).await?;

    let mut form = listing("Lamp", "19.99", "2");
    form.image = Some(png_upload("lamp.png", 50, 50));
    let item = catalog_service::create_listing(&state, &seller, form)
        .await?
        .item;
    let first = item.image_filename.clone().expect("image stored");
    assert!(uploads.path().join(&first).exists());

    // Re-uploading the same file name, typically within the same second.
    let mut form = listing("Lamp", "19.99", "2");
    form.image = Some(png_upload("lamp.png", 60, 60));
    let updated = catalog_service::edit_listing(&state, &seller, item.id, form)
        .await?
        .item;
    let second = updated.image_filename.clone().expect("image replaced");
    assert_ne!(first, second);
    assert!(uploads.path().join(&second).exists());
    assert!(!uploads.path().join(&first).exists());

    let stored = image::open(uploads.path().join(&second))?;
    assert_eq!(stored.dimensions(), (60, 60));
    Ok(())
}

#[tokio::test]
async fn same_upload_name_from_two_sellers_keeps_both_files() -> anyhow::Result<()> {
    let (state, uploads) = setup_state().await?;
    let sam = create_user(&state, "sam", Role::Seller).await?;
    let sid = create_user(&state, "sid", Role::Seller).await?;

    let mut form = listing("Lamp", "10", "1");
    form.image = Some(png_upload("photo.png", 30, 30));
    let first = catalog_service::create_listing(&state, &sam, form).await?.item;

    let mut form = listing("Rug", "20", "1");
    form.image = Some(png_upload("photo.png", 40, 20));
    let second = catalog_service::create_listing(&state, &sid, form).await?.item;

    let first_file = first.image_filename.expect("first image");
    let second_file = second.image_filename.expect("second image");
    assert_ne!(first_file, second_file);
    assert_eq!(
        image::open(uploads.path().join(&first_file))?.dimensions(),
        (30, 30)
    );
    assert_eq!(
        image::open(uploads.path().join(&second_file))?.dimensions(),
        (40, 20)
    );
    Ok(())
}

#[tokio::test]
async fn failed_replacement_keeps_previous_image() -> anyhow::Result<()> {
    let (state, uploads) = setup_state().await?;
    let seller = create_user(&state, "sam", Role::Seller).await?;

    let mut form = listing("Lamp", "19.99", "2");
    form.image = Some(png_upload("lamp.png", 50, 50));
    let item = catalog_service::create_listing(&state, &seller, form)
        .await?
        .item;
    let original = item.image_filename.clone().expect("image stored");

    let mut form = listing("Lamp", "17.50", "2");
    form.image = Some(Upload {
        filename: "broken.gif".to_string(),
        bytes: Bytes::from_static(b"GIF89a-truncated"),
    });
    let outcome = catalog_service::edit_listing(&state, &seller, item.id, form).await?;

    assert_eq!(outcome.image_issue, Some(ImageIssue::ProcessingFailed));
    assert_eq!(outcome.item.price, 17.5);
    assert_eq!(outcome.item.image_filename.as_deref(), Some(original.as_str()));
    assert!(uploads.path().join(&original).exists());
    Ok(())
}
