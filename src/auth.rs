//! Bearer token authentication and role checks.
//!
//! Log in issues a signed JWT; [auth_guard] verifies it on every protected
//! route and inserts the resolved [AuthUser] as a request extension. Role
//! checks are not middleware: handlers call [authorize] explicitly before
//! running their operation.

use axum::{
    RequestPartsExt,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{
    Error,
    state::AuthState,
    user::{Role, UserID},
};

/// The contents of a bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The ID of the authenticated user.
    pub sub: i64,
    /// The role of the authenticated user.
    pub role: Role,
    /// The time the token was issued as a unix timestamp.
    pub iat: i64,
    /// The expiry time of the token as a unix timestamp.
    pub exp: i64,
}

/// The identity attached to a request once its bearer token has been
/// verified.
///
/// Route handlers can use the function argument
/// `Extension(user): Extension<AuthUser>` to receive it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    /// The ID of the authenticated user.
    pub id: UserID,
    /// The role of the authenticated user.
    pub role: Role,
}

/// The operations a role check can gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Create a single expense.
    CreateExpense,
    /// Bulk import expenses from a CSV file.
    ImportExpenses,
    /// List expenses, with or without filters.
    ListExpenses,
    /// View aggregate statistics.
    ViewStatistics,
    /// Partially update an expense.
    UpdateExpense,
    /// Bulk delete expenses by ID.
    DeleteExpenses,
}

impl Action {
    /// Whether the action only reads data.
    fn is_read_only(&self) -> bool {
        matches!(self, Action::ListExpenses | Action::ViewStatistics)
    }
}

/// Check that `user`'s role permits `action`.
///
/// # Errors
///
/// Returns an [Error::Forbidden] if the role does not permit the action.
pub fn authorize(user: &AuthUser, action: Action) -> Result<(), Error> {
    match user.role {
        Role::User => Ok(()),
        Role::ReadOnly if action.is_read_only() => Ok(()),
        Role::ReadOnly => Err(Error::Forbidden),
    }
}

/// Create a signed bearer token for `user_id` that is valid for `duration`.
///
/// # Errors
///
/// Returns an [Error::TokenCreation] if the token could not be signed.
pub fn encode_jwt(
    user_id: UserID,
    role: Role,
    duration: Duration,
    encoding_key: &EncodingKey,
) -> Result<String, Error> {
    let now = OffsetDateTime::now_utc();
    let claims = Claims {
        sub: user_id.as_i64(),
        role,
        iat: now.unix_timestamp(),
        exp: (now + duration).unix_timestamp(),
    };

    encode(&Header::default(), &claims, encoding_key).map_err(|error| {
        tracing::error!("could not sign bearer token: {}", error);
        Error::TokenCreation
    })
}

/// Verify `token` and return its claims.
///
/// # Errors
///
/// Returns an [Error::InvalidToken] if the token is malformed, expired or has
/// a bad signature.
pub fn decode_jwt(token: &str, decoding_key: &DecodingKey) -> Result<Claims, Error> {
    decode::<Claims>(token, decoding_key, &Validation::default())
        .map(|token_data| token_data.claims)
        .map_err(|_| Error::InvalidToken)
}

/// Middleware function that checks for a valid bearer token in the
/// `Authorization` header.
///
/// The authenticated user is placed into the request as an [AuthUser]
/// extension and the request executed normally if the token is valid,
/// otherwise a 401 response is returned.
pub async fn auth_guard(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Result<Response, Error> {
    let (mut parts, body) = request.into_parts();

    let TypedHeader(Authorization(bearer)) = parts
        .extract::<TypedHeader<Authorization<Bearer>>>()
        .await
        .map_err(|_| Error::InvalidToken)?;

    let claims = decode_jwt(bearer.token(), &state.decoding_key)?;

    parts.extensions.insert(AuthUser {
        id: UserID::new(claims.sub),
        role: claims.role,
    });

    let request = Request::from_parts(parts, body);

    Ok(next.run(request).await)
}
