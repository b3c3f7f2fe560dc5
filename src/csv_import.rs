//! Bulk expense ingestion from uploaded CSV files.
//!
//! A file is parsed row by row: valid rows are staged as new expenses owned
//! by the requester, invalid rows are collected as row-level errors without
//! aborting the batch. The staged rows are then inserted in one database
//! transaction and the response reports both what was inserted and what was
//! rejected. Only an unreadable file fails the whole request.

use std::str::FromStr;

use axum::{
    Extension, Json,
    extract::{Multipart, State},
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    auth::{Action, AuthUser, authorize},
    expense::{NewExpense, PaymentMethod, create_expenses, parse_date_param},
    state::ExpenseState,
};

/// The name of the multipart form field holding the CSV file.
const FILE_FIELD: &str = "file";

/// The columns a CSV upload must provide.
const REQUIRED_COLUMNS: [&str; 4] = ["amount", "category", "date", "paymentMethod"];

/// A validation failure localized to one CSV row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    /// The 1-based data-row number the error occurred on. The header row is
    /// not counted.
    pub row: usize,
    /// Why the row was rejected.
    pub reason: String,
}

/// The outcome of parsing a CSV document: the staged valid rows and the
/// errors for the rejected ones.
#[derive(Debug, Default)]
pub struct ParsedCsv {
    /// The valid rows, in file order.
    pub expenses: Vec<NewExpense>,
    /// The per-row validation failures, in file order.
    pub errors: Vec<RowError>,
}

/// The shape of one CSV data row before validation.
#[derive(Debug, Deserialize)]
struct CsvRow {
    amount: String,
    category: String,
    date: String,
    #[serde(rename = "paymentMethod")]
    payment_method: String,
}

impl CsvRow {
    /// Validate the raw strings into a [NewExpense].
    fn into_new_expense(self) -> Result<NewExpense, Error> {
        let amount = Decimal::from_str(self.amount.trim())
            .map_err(|_| Error::InvalidAmount(self.amount.clone()))?;

        NewExpense::new(
            amount,
            self.category,
            parse_date_param(self.date.trim())?,
            PaymentMethod::from_str(self.payment_method.trim())?,
        )
    }
}

/// Parse CSV text with the columns `amount,category,date,paymentMethod`.
///
/// Individual row failures are collected in the result rather than returned
/// as errors, so a batch with both good and bad rows still stages the good
/// ones.
///
/// # Errors
///
/// Returns an [Error::InvalidCsv] if the header row is missing one of the
/// required columns.
pub fn parse_expenses_csv(text: &str) -> Result<ParsedCsv, Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|error| Error::InvalidCsv(error.to_string()))?;

    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|header| header == column) {
            return Err(Error::InvalidCsv(format!("missing column \"{column}\"")));
        }
    }

    let mut parsed = ParsedCsv::default();

    for (index, record) in reader.deserialize::<CsvRow>().enumerate() {
        let row = index + 1;

        let result = record
            .map_err(|error| Error::InvalidCsv(error.to_string()))
            .and_then(CsvRow::into_new_expense);

        match result {
            Ok(new_expense) => parsed.expenses.push(new_expense),
            Err(error) => parsed.errors.push(RowError {
                row,
                reason: error.to_string(),
            }),
        }
    }

    Ok(parsed)
}

/// The response body for a CSV upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    /// Whether the upload was processed. Partial failures still count as
    /// processed; check `errors` for rejected rows.
    pub success: bool,
    /// How many rows were inserted.
    pub inserted_count: usize,
    /// The rows that were rejected and why.
    pub errors: Vec<RowError>,
}

/// A route handler for bulk importing expenses from an uploaded CSV file.
///
/// Expects a multipart form with the CSV document in a field named `file`.
pub async fn upload_expenses_endpoint(
    State(state): State<ExpenseState>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, Error> {
    authorize(&user, Action::ImportExpenses)?;

    let mut csv_text = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| Error::MultipartError(error.to_string()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let data = field
            .bytes()
            .await
            .map_err(|error| Error::MultipartError(error.to_string()))?;

        csv_text = Some(
            String::from_utf8(data.to_vec())
                .map_err(|_| Error::InvalidCsv("file is not valid UTF-8".to_owned()))?,
        );
    }

    let csv_text = csv_text
        .ok_or_else(|| Error::MultipartError(format!("missing field \"{FILE_FIELD}\"")))?;

    let parsed = parse_expenses_csv(&csv_text)?;

    let inserted = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        create_expenses(parsed.expenses, user.id, &connection)?
    };

    tracing::info!(
        "imported {} expenses for user {} ({} rows rejected)",
        inserted.len(),
        user.id,
        parsed.errors.len()
    );

    Ok(Json(UploadSummary {
        success: true,
        inserted_count: inserted.len(),
        errors: parsed.errors,
    }))
}
