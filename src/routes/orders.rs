use axum::{
    routing::{get, post, patch},
    Router,
};
use crate::handlers::{order, order_item, payment, production};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(order::list_orders).post(order::create_order))
        .route("/orders/production-sheets", post(production::batch_production_sheets))
        .route("/orders/{id}", get(order::get_order).patch(order::update_order))
        .route("/orders/{id}/items", post(order_item::add_item))
        .route(
            "/orders/{id}/items/{item_id}",
            patch(order_item::update_item).delete(order_item::delete_item),
        )
        .route(
            "/orders/{id}/payments",
            get(payment::list_payments).post(payment::add_payment),
        )
        .route("/orders/{id}/production-sheet", get(production::production_sheet))
        .route_layer(axum::middleware::from_fn(require_auth))
}
