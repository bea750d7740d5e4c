use axum::{routing::get, Router};
use crate::handlers::report::{financial_summary, stock_overview};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reports/financial-summary", get(financial_summary))
        .route("/reports/stock-overview", get(stock_overview))
        .route_layer(axum::middleware::from_fn(require_auth))
}
