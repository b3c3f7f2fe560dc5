//! The API endpoint URIs.
//!
//! For endpoints that take a parameter, e.g. '/api/expenses/{expense_id}',
//! use [format_endpoint].

/// The route for registering a new user.
pub const REGISTER: &str = "/api/users/register";
/// The route for logging in a user, returns a bearer token.
pub const LOG_IN: &str = "/api/users/login";
/// The route to create an expense (POST), list expenses (GET) and bulk
/// delete expenses (DELETE).
pub const EXPENSES: &str = "/api/expenses";
/// The route to upload a CSV file for bulk expense ingestion.
pub const EXPENSES_UPLOAD: &str = "/api/expenses/upload";
/// The route for aggregate expense statistics.
pub const EXPENSES_STATS: &str = "/api/expenses/stats";
/// The route to partially update a single expense.
pub const EXPENSE: &str = "/api/expenses/{expense_id}";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace. For
/// example, in the endpoint path '/api/expenses/{expense_id}',
/// '{expense_id}' is the parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    match (endpoint_path.find('{'), endpoint_path.find('}')) {
        (Some(start), Some(end)) if start < end => {
            let mut formatted = String::with_capacity(endpoint_path.len());
            formatted.push_str(&endpoint_path[..start]);
            formatted.push_str(&id.to_string());
            formatted.push_str(&endpoint_path[end + 1..]);
            formatted
        }
        _ => endpoint_path.to_owned(),
    }
}

#[cfg(test)]
mod endpoint_tests {
    use super::{EXPENSE, format_endpoint};

    #[test]
    fn format_endpoint_replaces_parameter() {
        assert_eq!(format_endpoint(EXPENSE, 42), "/api/expenses/42");
    }

    #[test]
    fn format_endpoint_ignores_paths_without_parameters() {
        assert_eq!(format_endpoint("/api/expenses", 42), "/api/expenses");
    }
}
