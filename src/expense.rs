//! Expense management for the expense tracking API.
//!
//! This module contains everything related to expense records:
//! - The `Expense` model and `NewExpense` validation type
//! - Database functions for storing, querying, updating and deleting expenses
//! - Route handlers for the create, list, update and bulk-delete endpoints
//!
//! All reads and writes are scoped to the owning user. A record that exists
//! but belongs to someone else behaves exactly like a record that does not
//! exist.

use std::str::FromStr;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use rusqlite::{
    Connection, Row, ToSql, params_from_iter,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Type, ValueRef},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    Error,
    auth::{Action, AuthUser, authorize},
    database_id::DatabaseID,
    state::ExpenseState,
    user::UserID,
};

/// The date format expenses use on the wire and in filter parameters.
pub const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

// ============================================================================
// MODELS
// ============================================================================

/// How an expense was paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Paid with cash.
    Cash,
    /// Paid by credit card.
    Credit,
}

impl PaymentMethod {
    /// The string stored in the database and used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Credit => "credit",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "credit" => Ok(PaymentMethod::Credit),
            other => Err(Error::InvalidPaymentMethod(other.to_owned())),
        }
    }
}

impl ToSql for PaymentMethod {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for PaymentMethod {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;

        PaymentMethod::from_str(text)
            .map_err(|_| FromSqlError::Other(format!("unknown payment method {text:?}").into()))
    }
}

/// A single expense record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    /// The ID of the expense.
    pub id: DatabaseID,
    /// How much money was spent. Always greater than zero.
    pub amount: Decimal,
    /// What kind of spending this was, e.g. "food".
    pub category: String,
    /// When the money was spent.
    pub date: Date,
    /// How the expense was paid for.
    pub payment_method: PaymentMethod,
    /// The ID of the user that owns this expense.
    pub user_id: UserID,
    /// When the record was created (UTC).
    pub created_at: OffsetDateTime,
    /// When the record was last updated (UTC).
    pub updated_at: OffsetDateTime,
}

/// A validated expense waiting to be inserted.
///
/// Construct it with [NewExpense::new], which enforces the record
/// invariants: a positive amount and a non-empty category.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    amount: Decimal,
    category: String,
    date: Date,
    payment_method: PaymentMethod,
}

impl NewExpense {
    /// Validate the fields of a new expense.
    ///
    /// # Errors
    ///
    /// Returns an [Error::InvalidAmount] if `amount` is zero or negative and
    /// an [Error::EmptyCategory] if `category` is empty or whitespace.
    pub fn new(
        amount: Decimal,
        category: String,
        date: Date,
        payment_method: PaymentMethod,
    ) -> Result<Self, Error> {
        validate_amount(amount)?;
        let category = validate_category(category)?;

        Ok(Self {
            amount,
            category,
            date,
            payment_method,
        })
    }
}

fn validate_amount(amount: Decimal) -> Result<(), Error> {
    if amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount(amount.to_string()));
    }

    Ok(())
}

fn validate_category(category: String) -> Result<String, Error> {
    let category = category.trim().to_owned();

    if category.is_empty() {
        return Err(Error::EmptyCategory);
    }

    Ok(category)
}

/// Parse a `YYYY-MM-DD` string from a request into a [Date].
///
/// # Errors
///
/// Returns an [Error::InvalidDate] if the string is not a valid date.
pub fn parse_date_param(value: &str) -> Result<Date, Error> {
    Date::parse(value, DATE_FORMAT).map_err(|_| Error::InvalidDate(value.to_owned()))
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// The request body for creating an expense.
///
/// The owner is never taken from the body; it always comes from the bearer
/// token, so any owner field a client sends is ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExpenseForm {
    /// How much money was spent.
    pub amount: Decimal,
    /// What kind of spending this was.
    pub category: String,
    /// When the money was spent, as `YYYY-MM-DD`.
    pub date: String,
    /// `cash` or `credit`.
    pub payment_method: String,
}

/// A route handler for creating a new expense owned by the requester.
pub async fn create_expense_endpoint(
    State(state): State<ExpenseState>,
    Extension(user): Extension<AuthUser>,
    Json(form): Json<CreateExpenseForm>,
) -> Result<impl IntoResponse, Error> {
    authorize(&user, Action::CreateExpense)?;

    let new_expense = NewExpense::new(
        form.amount,
        form.category,
        parse_date_param(&form.date)?,
        PaymentMethod::from_str(&form.payment_method)?,
    )?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let expense = create_expense(new_expense, user.id, &connection)?;

    Ok((StatusCode::CREATED, Json(expense)))
}

/// The optional filter parameters accepted by the list endpoint.
///
/// Values arrive as strings and are parsed explicitly so that malformed
/// filters are rejected with a 400 rather than silently ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseFilterParams {
    /// Only include expenses on or after this date (`YYYY-MM-DD`).
    pub date_from: Option<String>,
    /// Only include expenses on or before this date (`YYYY-MM-DD`).
    pub date_to: Option<String>,
    /// Only include expenses with exactly this category.
    pub category: Option<String>,
    /// Only include expenses paid with this method (`cash` or `credit`).
    pub payment_method: Option<String>,
}

impl ExpenseFilterParams {
    /// Parse the raw parameters into an [ExpenseQuery] scoped to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns an [Error::InvalidDate] or [Error::InvalidPaymentMethod] if a
    /// supplied value cannot be parsed.
    pub fn into_query(self, user_id: UserID) -> Result<ExpenseQuery, Error> {
        Ok(ExpenseQuery {
            user_id,
            date_from: self.date_from.as_deref().map(parse_date_param).transpose()?,
            date_to: self.date_to.as_deref().map(parse_date_param).transpose()?,
            category: self.category,
            payment_method: self
                .payment_method
                .as_deref()
                .map(PaymentMethod::from_str)
                .transpose()?,
        })
    }
}

/// A route handler for listing the requester's expenses with optional
/// filters.
pub async fn list_expenses_endpoint(
    State(state): State<ExpenseState>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ExpenseFilterParams>,
) -> Result<impl IntoResponse, Error> {
    authorize(&user, Action::ListExpenses)?;

    let query = params.into_query(user.id)?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let expenses = query_expenses(&query, &connection)?;

    Ok(Json(expenses))
}

/// The request body for partially updating an expense. Omitted fields are
/// left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExpenseForm {
    /// A new amount for the expense.
    pub amount: Option<Decimal>,
    /// A new category for the expense.
    pub category: Option<String>,
    /// A new date for the expense, as `YYYY-MM-DD`.
    pub date: Option<String>,
    /// A new payment method for the expense.
    pub payment_method: Option<String>,
}

/// A route handler for partially updating one of the requester's expenses.
///
/// Responds with 404 if the expense does not exist or belongs to another
/// user.
pub async fn update_expense_endpoint(
    State(state): State<ExpenseState>,
    Extension(user): Extension<AuthUser>,
    Path(expense_id): Path<DatabaseID>,
    Json(form): Json<UpdateExpenseForm>,
) -> Result<impl IntoResponse, Error> {
    authorize(&user, Action::UpdateExpense)?;

    let changes = ExpenseChanges::try_from(form)?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let expense = update_expense(expense_id, user.id, changes, &connection)?;

    Ok(Json(expense))
}

/// The request body for bulk deleting expenses.
#[derive(Debug, Deserialize)]
pub struct DeleteExpensesForm {
    /// The IDs of the expenses to delete.
    pub ids: Vec<DatabaseID>,
}

/// A route handler for bulk deleting the requester's expenses.
///
/// IDs that do not exist or belong to another user are skipped; only the
/// number of records actually removed is reported.
pub async fn delete_expenses_endpoint(
    State(state): State<ExpenseState>,
    Extension(user): Extension<AuthUser>,
    Json(form): Json<DeleteExpensesForm>,
) -> Result<impl IntoResponse, Error> {
    authorize(&user, Action::DeleteExpenses)?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let deleted_count = delete_expenses(&form.ids, user.id, &connection)?;

    Ok(Json(serde_json::json!({
        "success": true,
        "deletedCount": deleted_count,
    })))
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the expense table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_expense_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS expense (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                amount TEXT NOT NULL,
                category TEXT NOT NULL,
                date TEXT NOT NULL,
                payment_method TEXT NOT NULL,
                user_id INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

const EXPENSE_COLUMNS: &str =
    "id, amount, category, date, payment_method, user_id, created_at, updated_at";

/// Map a database row to an [Expense].
pub(crate) fn map_expense_row(row: &Row) -> Result<Expense, rusqlite::Error> {
    let raw_amount: String = row.get(1)?;
    let amount = Decimal::from_str(&raw_amount)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(error)))?;
    let raw_user_id: i64 = row.get(5)?;

    Ok(Expense {
        id: row.get(0)?,
        amount,
        category: row.get(2)?,
        date: row.get(3)?,
        payment_method: row.get(4)?,
        user_id: UserID::new(raw_user_id),
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Insert a validated expense owned by `user_id`.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn create_expense(
    new_expense: NewExpense,
    user_id: UserID,
    connection: &Connection,
) -> Result<Expense, Error> {
    let now = OffsetDateTime::now_utc();

    let expense = connection
        .prepare(&format!(
            "INSERT INTO expense (amount, category, date, payment_method, user_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             RETURNING {EXPENSE_COLUMNS}"
        ))?
        .query_row(
            (
                new_expense.amount.to_string(),
                new_expense.category,
                new_expense.date,
                new_expense.payment_method,
                user_id.as_i64(),
                now,
                now,
            ),
            map_expense_row,
        )?;

    Ok(expense)
}

/// Insert many validated expenses owned by `user_id` in a single database
/// transaction.
///
/// If any insert fails the whole batch is rolled back.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an unexpected SQL error.
pub fn create_expenses(
    new_expenses: Vec<NewExpense>,
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Expense>, Error> {
    let tx = connection.unchecked_transaction()?;
    let now = OffsetDateTime::now_utc();
    let mut inserted = Vec::with_capacity(new_expenses.len());

    {
        // Prepare the insert statement once for reuse.
        let mut statement = tx.prepare(&format!(
            "INSERT INTO expense (amount, category, date, payment_method, user_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             RETURNING {EXPENSE_COLUMNS}"
        ))?;

        for new_expense in new_expenses {
            let expense = statement.query_row(
                (
                    new_expense.amount.to_string(),
                    new_expense.category,
                    new_expense.date,
                    new_expense.payment_method,
                    user_id.as_i64(),
                    now,
                    now,
                ),
                map_expense_row,
            )?;

            inserted.push(expense);
        }
    }

    tx.commit()?;

    Ok(inserted)
}

/// Defines which of a user's expenses should be fetched by
/// [query_expenses]. All filters are optional and combined with AND.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseQuery {
    /// The user whose expenses to fetch. Always applied.
    pub user_id: UserID,
    /// Include expenses on or after this date.
    pub date_from: Option<Date>,
    /// Include expenses on or before this date.
    pub date_to: Option<Date>,
    /// Include expenses with exactly this category.
    pub category: Option<String>,
    /// Include expenses paid with this method.
    pub payment_method: Option<PaymentMethod>,
}

impl ExpenseQuery {
    /// A query matching all expenses owned by `user_id`.
    pub fn for_user(user_id: UserID) -> Self {
        Self {
            user_id,
            date_from: None,
            date_to: None,
            category: None,
            payment_method: None,
        }
    }
}

/// Query for expenses in the database.
///
/// The result is ordered by date descending, tie-broken by creation time
/// descending then ID descending, so listings are deterministic.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn query_expenses(
    query: &ExpenseQuery,
    connection: &Connection,
) -> Result<Vec<Expense>, Error> {
    let mut where_clause_parts = vec!["user_id = ?1".to_owned()];
    let mut query_parameters: Vec<Box<dyn ToSql>> = vec![Box::new(query.user_id.as_i64())];

    if let Some(date_from) = query.date_from {
        where_clause_parts.push(format!("date >= ?{}", query_parameters.len() + 1));
        query_parameters.push(Box::new(date_from));
    }

    if let Some(date_to) = query.date_to {
        where_clause_parts.push(format!("date <= ?{}", query_parameters.len() + 1));
        query_parameters.push(Box::new(date_to));
    }

    if let Some(ref category) = query.category {
        where_clause_parts.push(format!("category = ?{}", query_parameters.len() + 1));
        query_parameters.push(Box::new(category.clone()));
    }

    if let Some(payment_method) = query.payment_method {
        where_clause_parts.push(format!("payment_method = ?{}", query_parameters.len() + 1));
        query_parameters.push(Box::new(payment_method));
    }

    let query_string = format!(
        "SELECT {EXPENSE_COLUMNS} FROM expense WHERE {} ORDER BY date DESC, created_at DESC, id DESC",
        where_clause_parts.join(" AND ")
    );

    connection
        .prepare(&query_string)?
        .query_map(params_from_iter(query_parameters.iter()), map_expense_row)?
        .map(|expense_result| expense_result.map_err(Error::SqlError))
        .collect()
}

/// The validated set of fields to change in a partial update.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExpenseChanges {
    /// A new amount for the expense.
    pub amount: Option<Decimal>,
    /// A new category for the expense.
    pub category: Option<String>,
    /// A new date for the expense.
    pub date: Option<Date>,
    /// A new payment method for the expense.
    pub payment_method: Option<PaymentMethod>,
}

impl TryFrom<UpdateExpenseForm> for ExpenseChanges {
    type Error = Error;

    fn try_from(form: UpdateExpenseForm) -> Result<Self, Self::Error> {
        if let Some(amount) = form.amount {
            validate_amount(amount)?;
        }

        let category = form.category.map(validate_category).transpose()?;
        let date = form.date.as_deref().map(parse_date_param).transpose()?;
        let payment_method = form
            .payment_method
            .as_deref()
            .map(PaymentMethod::from_str)
            .transpose()?;

        Ok(Self {
            amount: form.amount,
            category,
            date,
            payment_method,
        })
    }
}

/// Apply the supplied field changes to the expense with `id`, but only if it
/// is owned by `user_id`.
///
/// The record's `updated_at` timestamp is refreshed even when no fields are
/// supplied.
///
/// # Errors
/// This function will return an:
/// - [Error::NotFound] if `id` does not refer to an expense owned by
///   `user_id`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_expense(
    id: DatabaseID,
    user_id: UserID,
    changes: ExpenseChanges,
    connection: &Connection,
) -> Result<Expense, Error> {
    let mut set_clause_parts = vec![];
    let mut query_parameters: Vec<Box<dyn ToSql>> = vec![];

    if let Some(amount) = changes.amount {
        set_clause_parts.push(format!("amount = ?{}", query_parameters.len() + 1));
        query_parameters.push(Box::new(amount.to_string()));
    }

    if let Some(category) = changes.category {
        set_clause_parts.push(format!("category = ?{}", query_parameters.len() + 1));
        query_parameters.push(Box::new(category));
    }

    if let Some(date) = changes.date {
        set_clause_parts.push(format!("date = ?{}", query_parameters.len() + 1));
        query_parameters.push(Box::new(date));
    }

    if let Some(payment_method) = changes.payment_method {
        set_clause_parts.push(format!("payment_method = ?{}", query_parameters.len() + 1));
        query_parameters.push(Box::new(payment_method));
    }

    set_clause_parts.push(format!("updated_at = ?{}", query_parameters.len() + 1));
    query_parameters.push(Box::new(OffsetDateTime::now_utc()));

    let id_parameter = query_parameters.len() + 1;
    let user_id_parameter = query_parameters.len() + 2;
    query_parameters.push(Box::new(id));
    query_parameters.push(Box::new(user_id.as_i64()));

    let query_string = format!(
        "UPDATE expense SET {} WHERE id = ?{id_parameter} AND user_id = ?{user_id_parameter}
         RETURNING {EXPENSE_COLUMNS}",
        set_clause_parts.join(", ")
    );

    let expense = connection
        .prepare(&query_string)?
        .query_row(params_from_iter(query_parameters.iter()), map_expense_row)?;

    Ok(expense)
}

/// Delete the expenses in `ids` that are owned by `user_id` and return the
/// number of rows removed.
///
/// IDs that do not exist or belong to another user are skipped without
/// error.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn delete_expenses(
    ids: &[DatabaseID],
    user_id: UserID,
    connection: &Connection,
) -> Result<usize, Error> {
    if ids.is_empty() {
        return Ok(0);
    }

    let placeholders = (2..=ids.len() + 1)
        .map(|position| format!("?{position}"))
        .collect::<Vec<_>>()
        .join(", ");
    let query_string =
        format!("DELETE FROM expense WHERE user_id = ?1 AND id IN ({placeholders})");

    let mut query_parameters = vec![user_id.as_i64()];
    query_parameters.extend_from_slice(ids);

    let deleted_count = connection.execute(
        &query_string,
        params_from_iter(query_parameters.iter()),
    )?;

    Ok(deleted_count)
}


#[cfg(test)]
mod expense_db_tests {
    use rusqlite::Connection;
    use rust_decimal::Decimal;
    use time::{Date, macros::date};

    use crate::{Error, user::UserID};

    use super::{
        Expense, ExpenseChanges, ExpenseQuery, NewExpense, PaymentMethod, create_expense,
        create_expense_table, delete_expenses, query_expenses, update_expense,
    };

    fn get_db_connection() -> Connection {
        let connection =
            Connection::open_in_memory().expect("Could not create in-memory SQLite database");
        create_expense_table(&connection).expect("Could not create expense table");

        connection
    }

    fn insert_expense(
        connection: &Connection,
        user_id: UserID,
        amount: &str,
        category: &str,
        date: Date,
        payment_method: PaymentMethod,
    ) -> Expense {
        let new_expense = NewExpense::new(
            amount.parse().unwrap(),
            category.to_owned(),
            date,
            payment_method,
        )
        .unwrap();

        create_expense(new_expense, user_id, connection).expect("Could not insert expense")
    }

    #[test]
    fn create_sets_owner_and_timestamps() {
        let connection = get_db_connection();
        let owner = UserID::new(1);

        let expense = insert_expense(
            &connection,
            owner,
            "19.99",
            "food",
            date!(2025 - 01 - 15),
            PaymentMethod::Cash,
        );

        assert!(expense.id > 0);
        assert_eq!(expense.user_id, owner);
        assert_eq!(expense.amount, Decimal::new(1999, 2));
        assert_eq!(expense.created_at, expense.updated_at);
    }

    #[test]
    fn query_returns_only_owned_expenses() {
        let connection = get_db_connection();
        let alice = UserID::new(1);
        let bob = UserID::new(2);
        insert_expense(
            &connection,
            alice,
            "10",
            "food",
            date!(2025 - 01 - 15),
            PaymentMethod::Cash,
        );
        insert_expense(
            &connection,
            bob,
            "20",
            "food",
            date!(2025 - 01 - 15),
            PaymentMethod::Cash,
        );

        let expenses = query_expenses(&ExpenseQuery::for_user(alice), &connection).unwrap();

        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].user_id, alice);
    }

    #[test]
    fn query_date_range_is_inclusive() {
        let connection = get_db_connection();
        let owner = UserID::new(1);

        for (day, category) in [(14, "before"), (15, "start"), (20, "middle"), (25, "end"), (26, "after")] {
            insert_expense(
                &connection,
                owner,
                "10",
                category,
                Date::from_calendar_date(2025, time::Month::January, day).unwrap(),
                PaymentMethod::Cash,
            );
        }

        let query = ExpenseQuery {
            date_from: Some(date!(2025 - 01 - 15)),
            date_to: Some(date!(2025 - 01 - 25)),
            ..ExpenseQuery::for_user(owner)
        };
        let expenses = query_expenses(&query, &connection).unwrap();

        let categories: Vec<&str> = expenses
            .iter()
            .map(|expense| expense.category.as_str())
            .collect();
        assert_eq!(categories, vec!["end", "middle", "start"]);
    }

    #[test]
    fn query_combines_category_and_payment_method_filters() {
        let connection = get_db_connection();
        let owner = UserID::new(1);
        insert_expense(
            &connection,
            owner,
            "10",
            "food",
            date!(2025 - 01 - 15),
            PaymentMethod::Cash,
        );
        insert_expense(
            &connection,
            owner,
            "20",
            "food",
            date!(2025 - 01 - 16),
            PaymentMethod::Credit,
        );
        insert_expense(
            &connection,
            owner,
            "30",
            "travel",
            date!(2025 - 01 - 17),
            PaymentMethod::Cash,
        );

        let query = ExpenseQuery {
            category: Some("food".to_owned()),
            payment_method: Some(PaymentMethod::Cash),
            ..ExpenseQuery::for_user(owner)
        };
        let expenses = query_expenses(&query, &connection).unwrap();

        // The intersection, never a superset.
        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].amount, Decimal::TEN);
    }

    #[test]
    fn query_orders_by_date_descending() {
        let connection = get_db_connection();
        let owner = UserID::new(1);
        insert_expense(
            &connection,
            owner,
            "10",
            "oldest",
            date!(2025 - 01 - 01),
            PaymentMethod::Cash,
        );
        insert_expense(
            &connection,
            owner,
            "20",
            "newest",
            date!(2025 - 03 - 01),
            PaymentMethod::Cash,
        );
        insert_expense(
            &connection,
            owner,
            "30",
            "middle",
            date!(2025 - 02 - 01),
            PaymentMethod::Cash,
        );

        let expenses = query_expenses(&ExpenseQuery::for_user(owner), &connection).unwrap();

        let categories: Vec<&str> = expenses
            .iter()
            .map(|expense| expense.category.as_str())
            .collect();
        assert_eq!(categories, vec!["newest", "middle", "oldest"]);
    }

    #[test]
    fn query_breaks_date_ties_by_most_recently_created() {
        let connection = get_db_connection();
        let owner = UserID::new(1);
        insert_expense(
            &connection,
            owner,
            "10",
            "first",
            date!(2025 - 01 - 15),
            PaymentMethod::Cash,
        );
        insert_expense(
            &connection,
            owner,
            "20",
            "second",
            date!(2025 - 01 - 15),
            PaymentMethod::Cash,
        );

        let expenses = query_expenses(&ExpenseQuery::for_user(owner), &connection).unwrap();

        let categories: Vec<&str> = expenses
            .iter()
            .map(|expense| expense.category.as_str())
            .collect();
        assert_eq!(categories, vec!["second", "first"]);
    }

    #[test]
    fn update_applies_only_supplied_fields() {
        let connection = get_db_connection();
        let owner = UserID::new(1);
        let expense = insert_expense(
            &connection,
            owner,
            "10",
            "food",
            date!(2025 - 01 - 15),
            PaymentMethod::Cash,
        );

        let changes = ExpenseChanges {
            amount: Some(Decimal::new(2550, 2)),
            ..Default::default()
        };
        let updated = update_expense(expense.id, owner, changes, &connection).unwrap();

        assert_eq!(updated.amount, Decimal::new(2550, 2));
        assert_eq!(updated.category, expense.category);
        assert_eq!(updated.date, expense.date);
        assert_eq!(updated.payment_method, expense.payment_method);
        assert_eq!(updated.created_at, expense.created_at);
    }

    #[test]
    fn update_fails_with_unknown_id() {
        let connection = get_db_connection();

        let result = update_expense(
            42,
            UserID::new(1),
            ExpenseChanges::default(),
            &connection,
        );

        assert!(matches!(result, Err(Error::NotFound)));
    }

    #[test]
    fn update_of_foreign_expense_is_not_found() {
        let connection = get_db_connection();
        let owner = UserID::new(1);
        let other_user = UserID::new(2);
        let expense = insert_expense(
            &connection,
            owner,
            "10",
            "food",
            date!(2025 - 01 - 15),
            PaymentMethod::Cash,
        );

        let changes = ExpenseChanges {
            category: Some("travel".to_owned()),
            ..Default::default()
        };
        let result = update_expense(expense.id, other_user, changes, &connection);

        assert!(matches!(result, Err(Error::NotFound)));

        // The record is untouched.
        let expenses = query_expenses(&ExpenseQuery::for_user(owner), &connection).unwrap();
        assert_eq!(expenses[0].category, "food");
    }

    #[test]
    fn delete_skips_foreign_and_unknown_ids() {
        let connection = get_db_connection();
        let owner = UserID::new(1);
        let other_user = UserID::new(2);
        let owned = insert_expense(
            &connection,
            owner,
            "10",
            "food",
            date!(2025 - 01 - 15),
            PaymentMethod::Cash,
        );
        let foreign = insert_expense(
            &connection,
            other_user,
            "20",
            "food",
            date!(2025 - 01 - 15),
            PaymentMethod::Cash,
        );

        let deleted_count =
            delete_expenses(&[owned.id, foreign.id, 999], owner, &connection).unwrap();

        assert_eq!(deleted_count, 1);
        assert!(query_expenses(&ExpenseQuery::for_user(owner), &connection)
            .unwrap()
            .is_empty());
        assert_eq!(
            query_expenses(&ExpenseQuery::for_user(other_user), &connection)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn delete_with_empty_id_set_removes_nothing() {
        let connection = get_db_connection();
        let owner = UserID::new(1);
        insert_expense(
            &connection,
            owner,
            "10",
            "food",
            date!(2025 - 01 - 15),
            PaymentMethod::Cash,
        );

        let deleted_count = delete_expenses(&[], owner, &connection).unwrap();

        assert_eq!(deleted_count, 0);
        assert_eq!(
            query_expenses(&ExpenseQuery::for_user(owner), &connection)
                .unwrap()
                .len(),
            1
        );
    }
}
