use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{ApiKey, ApiKeyValue, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    app::SESSION_COOKIE_NAME,
    dto::{
        auth::{LoginRequest, RegisterRequest},
        catalog::{CatalogPage, EditPage},
        purchases::History,
        textgen::{GenerateError, GenerateRequest, GenerateResponse},
    },
    flash::{Level, Notice},
    middleware::auth::CurrentUser,
    models::{CatalogEntry, HistoryEntry, HistoryKind, Item, Purchase, Role, User},
    response::{ApiResponse, Meta},
    routes::{auth, catalog, health, purchases, textgen},
};

struct SessionCookieAddon;

impl Modify for SessionCookieAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "session_cookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(SESSION_COOKIE_NAME))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register_page,
        auth::register,
        auth::login_page,
        auth::login,
        auth::logout,
        catalog::index,
        catalog::sell_page,
        catalog::sell,
        catalog::edit_page,
        catalog::edit,
        purchases::buy,
        purchases::purchases,
        textgen::generate_description
    ),
    components(
        schemas(
            User,
            Role,
            Item,
            CatalogEntry,
            Purchase,
            HistoryEntry,
            HistoryKind,
            CurrentUser,
            Level,
            Notice,
            RegisterRequest,
            LoginRequest,
            CatalogPage,
            EditPage,
            History,
            GenerateRequest,
            GenerateResponse,
            GenerateError,
            Meta,
            ApiResponse<CatalogPage>,
            ApiResponse<EditPage>,
            ApiResponse<History>
        )
    ),
    security(
        ("session_cookie" = [])
    ),
    modifiers(&SessionCookieAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration and session endpoints"),
        (name = "Catalog", description = "Listing and editing items"),
        (name = "Purchases", description = "Buying and purchase history"),
        (name = "Descriptions", description = "Item description generation"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
