pub mod users;
pub mod products;
pub mod orders;
pub mod stock;
pub mod reports;
pub mod requisitions;

use axum::Router;
use crate::state::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .merge(users::routes())
        .merge(products::routes())
        .merge(orders::routes())
        .merge(stock::routes())
        .merge(reports::routes())
        .merge(requisitions::routes())
}
