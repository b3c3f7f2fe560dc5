//! Code for creating the user table and fetching users from the database.

use std::fmt::Display;

use email_address::EmailAddress;
use rusqlite::{
    Connection,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::{Error, PasswordHash};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// What a user is allowed to do with their expense data.
///
/// `ReadOnly` users can list expenses and view statistics but cannot create,
/// import, update or delete records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    /// May read and mutate their own expenses. The default role.
    User,
    /// May only read their own expenses.
    ReadOnly,
}

impl Role {
    /// The string stored in the database for this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::ReadOnly => "readOnly",
        }
    }
}

impl ToSql for Role {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for Role {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "user" => Ok(Role::User),
            "readOnly" => Ok(Role::ReadOnly),
            other => Err(FromSqlError::Other(
                format!("unknown role {other:?}").into(),
            )),
        }
    }
}

/// A registered user of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The email address the user logs in with.
    pub email: String,
    /// The user's password hash.
    pub password_hash: PasswordHash,
    /// What the user is allowed to do.
    pub role: Role,
}

/// Check that `email` looks like an email address.
///
/// # Errors
///
/// Returns an [Error::InvalidEmail] if it does not.
pub fn validate_email(email: &str) -> Result<(), Error> {
    if EmailAddress::is_valid(email) {
        Ok(())
    } else {
        Err(Error::InvalidEmail(email.to_owned()))
    }
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                password TEXT NOT NULL,
                role TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// # Errors
///
/// Returns an [Error::DuplicateEmail] if `email` is already registered, or an
/// [Error::SqlError] if another SQL related error occurred.
pub fn create_user(
    email: &str,
    password_hash: PasswordHash,
    role: Role,
    connection: &Connection,
) -> Result<User, Error> {
    connection.execute(
        "INSERT INTO user (email, password, role) VALUES (?1, ?2, ?3)",
        (email, password_hash.as_ref(), role),
    )?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        email: email.to_owned(),
        password_hash,
        role,
    })
}

/// Get the user from the database with an email equal to `email`.
///
/// # Errors
///
/// This function will return an [Error::NotFound] if `email` does not belong
/// to a registered user, or an [Error::SqlError] if there was an error trying
/// to access the store.
pub fn get_user_by_email(email: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, email, password, role FROM user WHERE email = :email")?
        .query_row(&[(":email", email)], |row| {
            let raw_password_hash: String = row.get(2)?;

            Ok(User {
                id: UserID::new(row.get(0)?),
                email: row.get(1)?,
                password_hash: PasswordHash::new_unchecked(&raw_password_hash),
                role: row.get(3)?,
            })
        })
        .map_err(|error| error.into())
}

#[cfg(test)]
mod user_tests {
    use rusqlite::Connection;

    use crate::{
        Error, PasswordHash,
        user::{Role, create_user, get_user_by_email, validate_email},
    };

    use super::create_user_table;

    fn get_db_connection() -> Connection {
        let conn =
            Connection::open_in_memory().expect("Could not create in-memory SQLite database");
        create_user_table(&conn).expect("Could not create user table");

        conn
    }

    #[test]
    fn insert_user_succeeds() {
        let db_connection = get_db_connection();
        let password_hash = PasswordHash::new_unchecked("hunter2");

        let inserted_user = create_user(
            "foo@bar.baz",
            password_hash.clone(),
            Role::User,
            &db_connection,
        )
        .unwrap();

        assert!(inserted_user.id.as_i64() > 0);
        assert_eq!(inserted_user.email, "foo@bar.baz");
        assert_eq!(inserted_user.password_hash, password_hash);
        assert_eq!(inserted_user.role, Role::User);
    }

    #[test]
    fn insert_user_fails_with_duplicate_email() {
        let db_connection = get_db_connection();
        let password_hash = PasswordHash::new_unchecked("hunter2");

        create_user(
            "foo@bar.baz",
            password_hash.clone(),
            Role::User,
            &db_connection,
        )
        .unwrap();
        let result = create_user("foo@bar.baz", password_hash, Role::User, &db_connection);

        assert!(matches!(result, Err(Error::DuplicateEmail)));
    }

    #[test]
    fn get_user_fails_with_unknown_email() {
        let db_connection = get_db_connection();

        let result = get_user_by_email("nobody@bar.baz", &db_connection);

        assert!(matches!(result, Err(Error::NotFound)));
    }

    #[test]
    fn get_user_succeeds_with_registered_email() {
        let db_connection = get_db_connection();
        let test_user = create_user(
            "foo@bar.baz",
            PasswordHash::new_unchecked("hunter2"),
            Role::ReadOnly,
            &db_connection,
        )
        .unwrap();

        let retrieved_user = get_user_by_email("foo@bar.baz", &db_connection).unwrap();

        assert_eq!(retrieved_user, test_user);
    }

    #[test]
    fn validate_email_rejects_garbage() {
        assert!(matches!(
            validate_email("not an email"),
            Err(Error::InvalidEmail(_))
        ));
        assert!(validate_email("foo@bar.baz").is_ok());
    }
}
