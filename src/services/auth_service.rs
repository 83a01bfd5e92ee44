use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use password_hash::rand_core::OsRng;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, SqlErr};
use sea_orm::ActiveValue::NotSet;

use crate::{
    dto::auth::{LoginRequest, RegisterRequest},
    entity::{
        Users,
        users::{self, ActiveModel as UserActive, Model as UserModel},
    },
    error::{AppError, AppResult},
    middleware::auth::CurrentUser,
    models::{Role, User},
    state::AppState,
};

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(stored_hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub async fn register_user(state: &AppState, payload: RegisterRequest) -> AppResult<User> {
    let username = payload.username.trim();
    let password = payload.password.trim();
    if username.is_empty() || password.is_empty() {
        return Err(AppError::BadRequest(
            "Username and password are required.".into(),
        ));
    }

    let role = match payload.role.as_deref().map(str::trim) {
        None | Some("") => Role::Buyer,
        Some(raw) => raw
            .parse::<Role>()
            .map_err(|_| AppError::BadRequest("Invalid role.".into()))?,
    };

    let active = UserActive {
        id: NotSet,
        username: Set(username.to_string()),
        password: Set(hash_password(password)?),
        role: Set(role.as_str().to_string()),
    };

    let user = match active.insert(&state.orm).await {
        Ok(user) => user,
        Err(err) => {
            if let Some(SqlErr::UniqueConstraintViolation(_)) = err.sql_err() {
                return Err(AppError::Conflict("Username already exists.".into()));
            }
            return Err(err.into());
        }
    };

    tracing::info!(user_id = user.id, role = %role, "user registered");
    user_from_entity(user)
}

/// Check credentials. Unknown users and wrong passwords are indistinguishable
/// to the caller.
pub async fn login_user(state: &AppState, payload: LoginRequest) -> AppResult<CurrentUser> {
    let username = payload.username.trim();
    let password = payload.password.trim();
    if username.is_empty() || password.is_empty() {
        return Err(AppError::BadRequest(
            "Username and password are required.".into(),
        ));
    }

    let user = Users::find()
        .filter(users::Column::Username.eq(username))
        .one(&state.orm)
        .await?;

    let user = match user {
        Some(u) => u,
        None => {
            return Err(AppError::Unauthorized(
                "Invalid username or password.".into(),
            ));
        }
    };

    if !verify_password(&user.password, password)? {
        tracing::debug!(user_id = user.id, "password mismatch");
        return Err(AppError::Unauthorized(
            "Invalid username or password.".into(),
        ));
    }

    let user = user_from_entity(user)?;
    Ok(CurrentUser {
        id: user.id,
        username: user.username,
        role: user.role,
    })
}

pub async fn find_user(state: &AppState, id: i64) -> AppResult<Option<User>> {
    Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(user_from_entity)
        .transpose()
}

pub(crate) fn user_from_entity(model: UserModel) -> AppResult<User> {
    let role = model.role.parse::<Role>().map_err(|_| {
        AppError::Internal(anyhow::anyhow!(
            "user {} has unknown role {:?}",
            model.id,
            model.role
        ))
    })?;
    Ok(User {
        id: model.id,
        username: model.username,
        role,
    })
}
