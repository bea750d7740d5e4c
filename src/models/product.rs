use sqlx::FromRow;
use chrono::{DateTime, Utc};

#[derive(Debug, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub unit: String,
    pub price: f64,
    pub image_url: Option<String>,
    pub category: String,
    pub subcategory: Option<String>,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}
