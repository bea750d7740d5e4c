use axum::{
    routing::{get, patch},
    Router,
};
use crate::handlers::requisition::{
    create_requisition, list_requisitions, get_requisition, update_requisition,
};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/requisitions", get(list_requisitions).post(create_requisition))
        .route("/requisitions/{id}", get(get_requisition).patch(update_requisition))
        .route_layer(axum::middleware::from_fn(require_auth))
}
