//! The route handler for registering a new user.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;

use crate::{
    Error, PasswordHash,
    state::RegistrationState,
    user::{Role, create_user, validate_email},
};

/// The request body for creating a user.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    /// The email address the user will log in with.
    pub email: String,
    /// The plain text password, validated for strength before hashing.
    pub password: String,
    /// The user's role. Defaults to [Role::User] when omitted.
    #[serde(default)]
    pub role: Option<Role>,
}

/// A route handler for creating a new user.
///
/// # Errors
///
/// Returns an [Error::InvalidEmail] if the email is malformed, an
/// [Error::TooWeak] if the password is too easy to guess, and an
/// [Error::DuplicateEmail] if the email is already registered.
pub async fn register_user(
    State(state): State<RegistrationState>,
    Json(form): Json<RegisterForm>,
) -> Result<impl IntoResponse, Error> {
    validate_email(&form.email)?;
    let password_hash = PasswordHash::from_raw_password(&form.password, PasswordHash::DEFAULT_COST)?;
    let role = form.role.unwrap_or(Role::User);

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let user = create_user(&form.email, password_hash, role, &connection)?;

    tracing::info!("registered user {}", user.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "id": user.id,
        })),
    ))
}
