//! Application router configuration with protected and unprotected route
//! definitions.

use axum::{
    Router, middleware,
    routing::{get, patch, post},
};

use crate::{
    AppState,
    auth::auth_guard,
    csv_import::upload_expenses_endpoint,
    endpoints,
    expense::{
        create_expense_endpoint, delete_expenses_endpoint, list_expenses_endpoint,
        update_expense_endpoint,
    },
    log_in::log_in,
    register_user::register_user,
    statistics::expense_statistics_endpoint,
};

/// Return a router with all the app's routes.
///
/// Every route except registration and log-in requires a bearer token.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::REGISTER, post(register_user))
        .route(endpoints::LOG_IN, post(log_in));

    let protected_routes = Router::new()
        .route(
            endpoints::EXPENSES,
            post(create_expense_endpoint)
                .get(list_expenses_endpoint)
                .delete(delete_expenses_endpoint),
        )
        .route(endpoints::EXPENSES_UPLOAD, post(upload_expenses_endpoint))
        .route(endpoints::EXPENSES_STATS, get(expense_statistics_endpoint))
        .route(endpoints::EXPENSE, patch(update_expense_endpoint))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    unprotected_routes
        .merge(protected_routes)
        .with_state(state)
}
