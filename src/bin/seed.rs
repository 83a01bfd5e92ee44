use axum_marketplace::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    dto::{auth::RegisterRequest, listings::ListingForm},
    error::AppError,
    middleware::auth::CurrentUser,
    models::Role,
    services::{auth_service, catalog_service},
    state::AppState,
    upload::ImageStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;
    let state = AppState::new(
        pool,
        ImageStore::new(&config.upload_dir),
        config.textgen.clone(),
    );

    let seller = ensure_user(&state, "seller", "seller123", Role::Seller).await?;
    let buyer = ensure_user(&state, "buyer", "buyer123", Role::Buyer).await?;
    seed_items(&state, &seller).await?;

    println!(
        "Seed completed. Seller ID: {}, Buyer ID: {}",
        seller.id, buyer.id
    );
    Ok(())
}

async fn ensure_user(
    state: &AppState,
    username: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<CurrentUser> {
    let request = RegisterRequest {
        username: username.to_string(),
        password: password.to_string(),
        role: Some(role.as_str().to_string()),
    };
    match auth_service::register_user(state, request).await {
        Ok(_) | Err(AppError::Conflict(_)) => {}
        Err(err) => return Err(anyhow::anyhow!("registering {username}: {err}")),
    }

    // Existing users keep their password, so look them up by row.
    let (id, role): (i64, String) =
        sqlx::query_as("SELECT id, role FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(&state.pool)
            .await?;
    let role = role
        .parse::<Role>()
        .map_err(|_| anyhow::anyhow!("user {username} has unknown role {role}"))?;

    println!("Ensured user {username} (role={role})");
    Ok(CurrentUser {
        id,
        username: username.to_string(),
        role,
    })
}

async fn seed_items(state: &AppState, seller: &CurrentUser) -> anyhow::Result<()> {
    let (existing,): (i64,) = sqlx::query_as("SELECT count(*) FROM items WHERE seller_id = ?")
        .bind(seller.id)
        .fetch_one(&state.pool)
        .await?;
    if existing > 0 {
        println!("Seller already has {existing} items, skipping");
        return Ok(());
    }

    let items = vec![
        ("Oak Chair", "Solid oak dining chair", "25.50", "3"),
        ("Desk Lamp", "Adjustable reading lamp", "19.99", "5"),
        ("Wool Rug", "Hand-woven, 2x3m", "120.00", "1"),
    ];

    for (title, description, price, quantity) in items {
        let form = ListingForm {
            title: Some(title.to_string()),
            description: Some(description.to_string()),
            price: Some(price.to_string()),
            quantity: Some(quantity.to_string()),
            image: None,
        };
        catalog_service::create_listing(state, seller, form)
            .await
            .map_err(|e| anyhow::anyhow!("listing {title}: {e}"))?;
    }

    println!("Seeded items");
    Ok(())
}
