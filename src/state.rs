//! Implements the structs that hold the state of the REST server.
//!
//! The database connection is opened once at startup by the server binary and
//! handed to [AppState]; route handlers receive narrower sub-states via
//! `FromRef` so each one only sees what it needs.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use jsonwebtoken::{DecodingKey, EncodingKey};
use rusqlite::Connection;
use time::Duration;

/// The default duration for which bearer tokens are valid.
pub const DEFAULT_TOKEN_DURATION: Duration = Duration::hours(24);

/// The state of the REST server.
#[derive(Clone)]
pub struct AppState {
    /// The key used for signing bearer tokens.
    pub encoding_key: EncodingKey,
    /// The key used for verifying bearer tokens.
    pub decoding_key: DecodingKey,
    /// The duration for which bearer tokens are valid.
    pub token_duration: Duration,
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Create a new [AppState].
    ///
    /// `secret` is the string the JWT signing keys are derived from.
    pub fn new(secret: &str, db_connection: Arc<Mutex<Connection>>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_duration: DEFAULT_TOKEN_DURATION,
            db_connection,
        }
    }
}

/// The state needed for the auth middleware.
#[derive(Clone)]
pub struct AuthState {
    /// The key used for verifying bearer tokens.
    pub decoding_key: DecodingKey,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            decoding_key: state.decoding_key.clone(),
        }
    }
}

/// The state needed for logging in a user and issuing a token.
#[derive(Clone)]
pub struct LogInState {
    /// The key used for signing bearer tokens.
    pub encoding_key: EncodingKey,
    /// The duration for which bearer tokens are valid.
    pub token_duration: Duration,
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            encoding_key: state.encoding_key.clone(),
            token_duration: state.token_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The state needed for creating a new user.
#[derive(Clone)]
pub struct RegistrationState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The state needed for expense handlers, including CSV ingestion and
/// statistics.
#[derive(Clone)]
pub struct ExpenseState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}
