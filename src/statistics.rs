//! Aggregate statistics over a user's expenses.
//!
//! The aggregator runs over the rows returned by the expense query engine
//! and groups them in Rust, summing amounts with exact decimal arithmetic.

use std::collections::BTreeMap;

use axum::{Extension, Json, extract::{Query, State}, response::IntoResponse};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    auth::{Action, AuthUser, authorize},
    expense::{Expense, ExpenseQuery, parse_date_param, query_expenses},
    state::ExpenseState,
};

/// The exact-decimal sum and record count for one group of expenses.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupSummary {
    /// The sum of the amounts in the group.
    pub sum: Decimal,
    /// How many expenses are in the group.
    pub count: u64,
}

impl GroupSummary {
    fn add(&mut self, amount: Decimal) {
        self.sum += amount;
        self.count += 1;
    }
}

/// Aggregate statistics over a set of expenses.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseStatistics {
    /// Sum and count per category.
    pub by_category: BTreeMap<String, GroupSummary>,
    /// Sum and count per calendar month, keyed as `YYYY-MM`.
    pub by_month: BTreeMap<String, GroupSummary>,
    /// The sum of all matched amounts, independent of grouping.
    pub total: Decimal,
    /// How many expenses were matched.
    pub count: u64,
}

/// The `YYYY-MM` grouping key for an expense's calendar month.
fn month_key(expense: &Expense) -> String {
    format!(
        "{:04}-{:02}",
        expense.date.year(),
        u8::from(expense.date.month())
    )
}

/// Group `expenses` by category and by calendar month, computing the sum and
/// count for each group plus a grand total.
///
/// Handles an empty slice by returning empty groups and a zero total.
pub fn aggregate_expenses(expenses: &[Expense]) -> ExpenseStatistics {
    let mut statistics = ExpenseStatistics::default();

    for expense in expenses {
        statistics
            .by_category
            .entry(expense.category.clone())
            .or_default()
            .add(expense.amount);
        statistics
            .by_month
            .entry(month_key(expense))
            .or_default()
            .add(expense.amount);

        statistics.total += expense.amount;
        statistics.count += 1;
    }

    statistics
}

/// The optional date range accepted by the statistics endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsParams {
    /// Only include expenses on or after this date (`YYYY-MM-DD`).
    pub date_from: Option<String>,
    /// Only include expenses on or before this date (`YYYY-MM-DD`).
    pub date_to: Option<String>,
}

/// A route handler for computing aggregate statistics over the requester's
/// expenses, optionally restricted to a date range.
pub async fn expense_statistics_endpoint(
    State(state): State<ExpenseState>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<StatisticsParams>,
) -> Result<impl IntoResponse, Error> {
    authorize(&user, Action::ViewStatistics)?;

    let query = ExpenseQuery {
        date_from: params.date_from.as_deref().map(parse_date_param).transpose()?,
        date_to: params.date_to.as_deref().map(parse_date_param).transpose()?,
        ..ExpenseQuery::for_user(user.id)
    };

    let expenses = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        query_expenses(&query, &connection)?
    };

    Ok(Json(aggregate_expenses(&expenses)))
}
