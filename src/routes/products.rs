use axum::{
    routing::{get, post},
    Router,
};
use crate::handlers::product::{
    list_products, get_product, create_product, update_product, upload_product_image,
};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/{id}", get(get_product).patch(update_product))
        .route("/products/{id}/image", post(upload_product_image))
        .route_layer(axum::middleware::from_fn(require_auth))
}
