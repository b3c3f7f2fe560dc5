//! The route handler for logging in a user and issuing a bearer token.

use axum::{Json, extract::State, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;

use crate::{Error, auth::encode_jwt, state::LogInState, user::get_user_by_email};

/// The request body for logging in.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    /// Email entered during sign-in.
    pub email: String,
    /// Password entered during sign-in.
    pub password: String,
}

/// A route handler for logging in a user.
///
/// On success the response contains a bearer token to be sent in the
/// `Authorization` header of subsequent requests.
///
/// # Errors
///
/// Returns an [Error::InvalidCredentials] if the email is not registered or
/// the password does not match. Both cases produce the same response so that
/// registered emails cannot be probed.
pub async fn log_in(
    State(state): State<LogInState>,
    Json(credentials): Json<Credentials>,
) -> Result<impl IntoResponse, Error> {
    let user = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        get_user_by_email(&credentials.email, &connection).map_err(|error| match error {
            Error::NotFound => Error::InvalidCredentials,
            error => error,
        })?
    };

    let password_is_correct = user
        .password_hash
        .verify(&credentials.password)
        .map_err(|error| {
            tracing::error!("error verifying password: {}", error);
            Error::HashingError(error.to_string())
        })?;

    if !password_is_correct {
        return Err(Error::InvalidCredentials);
    }

    let token = encode_jwt(
        user.id,
        user.role,
        state.token_duration,
        &state.encoding_key,
    )?;

    Ok(Json(json!({
        "success": true,
        "token": token,
    })))
}
