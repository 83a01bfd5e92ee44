#![allow(dead_code)]

use std::io::Cursor;

use axum::body::Bytes;
use axum_marketplace::{
    config::TextgenConfig,
    db::{create_memory_pool, create_pool, run_migrations},
    dto::{auth::RegisterRequest, listings::ListingForm},
    middleware::auth::CurrentUser,
    models::Role,
    services::auth_service,
    state::AppState,
    upload::{ImageStore, Upload},
};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use tempfile::TempDir;

/// Fresh in-memory store with the schema applied and a throwaway upload
/// directory. Keep the `TempDir` alive for the duration of the test.
pub async fn setup_state() -> anyhow::Result<(AppState, TempDir)> {
    let pool = create_memory_pool().await?;
    run_migrations(&pool).await?;
    let uploads = tempfile::tempdir()?;
    let images = ImageStore::new(uploads.path());
    Ok((AppState::new(pool, images, TextgenConfig::default()), uploads))
}

/// File-backed store with a real connection pool, for tests that need more
/// than one connection. The `TempDir` holds both the database and uploads.
pub async fn setup_file_state() -> anyhow::Result<(AppState, TempDir)> {
    let dir = tempfile::tempdir()?;
    let url = format!("sqlite://{}", dir.path().join("marketplace.db").display());
    let pool = create_pool(&url).await?;
    run_migrations(&pool).await?;
    let uploads = dir.path().join("uploads");
    std::fs::create_dir_all(&uploads)?;
    let images = ImageStore::new(uploads);
    Ok((AppState::new(pool, images, TextgenConfig::default()), dir))
}

pub async fn create_user(state: &AppState, username: &str, role: Role) -> anyhow::Result<CurrentUser> {
    let user = auth_service::register_user(
        state,
        RegisterRequest {
            username: username.to_string(),
            password: "secret".to_string(),
            role: Some(role.as_str().to_string()),
        },
    )
    .await?;
    Ok(CurrentUser {
        id: user.id,
        username: user.username,
        role: user.role,
    })
}

pub fn listing(title: &str, price: &str, quantity: &str) -> ListingForm {
    ListingForm {
        title: Some(title.to_string()),
        description: Some(format!("{title} for sale")),
        price: Some(price.to_string()),
        quantity: Some(quantity.to_string()),
        image: None,
    }
}

/// PNG with a fully transparent top-left quadrant and opaque red elsewhere.
pub fn png_upload(filename: &str, width: u32, height: u32) -> Upload {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        if x < width / 2 && y < height / 2 {
            Rgba([0, 0, 0, 0])
        } else {
            Rgba([200, 0, 0, 255])
        }
    });
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut out, ImageFormat::Png)
        .expect("encode png");
    Upload {
        filename: filename.to_string(),
        bytes: Bytes::from(out.into_inner()),
    }
}
