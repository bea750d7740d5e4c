use sqlx::FromRow;
use chrono::{DateTime, Utc, NaiveDate};

#[derive(Debug, FromRow)]
pub struct Order {
    pub id: i64,
    pub folio: i64,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub branch: String,
    pub delivery_type: String,
    pub delivery_address: Option<String>,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_time: Option<String>,
    pub payment_method: Option<String>,
    pub status: String,
    pub payment_status: String,
    pub paid_amount: f64,
    pub total: f64,
    pub notes: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Line item joined with its product for display. Product columns are
/// optional: a line whose product disappeared falls back to a placeholder
/// label instead of failing the whole order fetch.
#[derive(Debug, FromRow)]
pub struct OrderLineItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: f64,
    pub product_name: Option<String>,
    pub product_unit: Option<String>,
    pub product_image_url: Option<String>,
}
