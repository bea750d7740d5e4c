use axum::{
    routing::{get, put},
    Router,
};
use crate::handlers::stock::{get_stock, update_stock};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stock", get(get_stock))
        .route("/stock/{product_id}", put(update_stock))
        .route_layer(axum::middleware::from_fn(require_auth))
}
