//! Defines the app level error type and its translation to HTTP responses.
//!
//! All route handlers return `Result<_, Error>`; this module is the single
//! point where error kinds are mapped to status codes and the JSON error
//! body `{ "success": false, "message": ... }`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The email or password presented at log in did not match a registered
    /// user.
    #[error("wrong email or password")]
    InvalidCredentials,

    /// The email given at registration is not a valid email address.
    #[error("{0} is not a valid email address")]
    InvalidEmail(String),

    /// The email given at registration is already registered.
    #[error("the email is already registered")]
    DuplicateEmail,

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// The bearer token was missing, malformed, expired or had a bad
    /// signature.
    #[error("missing or invalid bearer token")]
    InvalidToken,

    /// The authenticated user's role does not permit the requested
    /// operation.
    #[error("your role does not permit this operation")]
    Forbidden,

    /// An expense amount was zero or negative.
    #[error("amount must be greater than zero, got {0}")]
    InvalidAmount(String),

    /// An empty string was used as an expense category.
    #[error("category must not be empty")]
    EmptyCategory,

    /// A date string could not be parsed as a calendar date.
    #[error("\"{0}\" is not a valid date, expected YYYY-MM-DD")]
    InvalidDate(String),

    /// A payment method string was not one of the accepted values.
    #[error("\"{0}\" is not a valid payment method, expected cash or credit")]
    InvalidPaymentMethod(String),

    /// The multipart form could not be read, or did not contain the
    /// expected file field.
    #[error("could not read multipart form: {0}")]
    MultipartError(String),

    /// The uploaded file could not be read as CSV at all. Row level
    /// validation failures are reported per row instead of through this
    /// variant.
    #[error("could not parse the CSV file: {0}")]
    InvalidCsv(String),

    /// The requested resource was not found, or is not owned by the
    /// requester. Ownership misses deliberately map here rather than to
    /// [Error::Forbidden] so that record existence is not leaked.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged on the server, never sent to
    /// the client.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// A token could not be signed.
    #[error("could not create bearer token")]
    TokenCreation,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl Error {
    /// The HTTP status code the error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidEmail(_)
            | Error::DuplicateEmail
            | Error::TooWeak(_)
            | Error::InvalidAmount(_)
            | Error::EmptyCategory
            | Error::InvalidDate(_)
            | Error::InvalidPaymentMethod(_)
            | Error::MultipartError(_)
            | Error::InvalidCsv(_) => StatusCode::BAD_REQUEST,
            Error::InvalidCredentials | Error::InvalidToken => StatusCode::UNAUTHORIZED,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::HashingError(_)
            | Error::TokenCreation
            | Error::SqlError(_)
            | Error::DatabaseLockError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        // Internal detail is logged and replaced with a generic message.
        let message = if status_code == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("an unexpected error occurred: {}", self);
            "Server Error".to_owned()
        } else {
            self.to_string()
        };

        (
            status_code,
            Json(json!({
                "success": false,
                "message": message,
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod error_tests {
    use axum::http::StatusCode;

    use super::Error;

    #[test]
    fn no_rows_maps_to_not_found() {
        let error: Error = rusqlite::Error::QueryReturnedNoRows.into();

        assert!(matches!(error, Error::NotFound));
    }

    #[test]
    fn ownership_miss_is_not_found_not_forbidden() {
        assert_eq!(Error::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_ne!(Error::NotFound.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn validation_errors_are_client_errors() {
        let errors = [
            Error::InvalidAmount("-1".to_owned()),
            Error::EmptyCategory,
            Error::InvalidDate("32/01/2025".to_owned()),
            Error::InvalidPaymentMethod("cheque".to_owned()),
        ];

        for error in errors {
            assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        }
    }
}
