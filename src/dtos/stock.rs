use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// Merged stock view row: every active product appears once for the
/// branch. `stock_id` is None for products that have no stock row yet
/// (implied quantity 0).
#[derive(Serialize)]
pub struct StockItemResponse {
    pub stock_id: Option<i64>,
    pub product_id: i64,
    pub product_name: String,
    pub unit: String,
    pub price: f64,
    pub image_url: Option<String>,
    pub quantity: i32,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct UpdateStockRequest {
    pub quantity: i32,
    pub branch: Option<String>,
}
