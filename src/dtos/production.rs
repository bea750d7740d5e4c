// Assembled production-sheet documents. These carry everything the PDF
// renderer needs; the rendering itself happens outside this service.
use serde::{Deserialize, Serialize};
use chrono::NaiveDate;

#[derive(Serialize)]
pub struct ProductionRow {
    pub quantity: i32,
    pub unit: String,
    pub product_name: String,
    pub image_url: Option<String>,
}

#[derive(Serialize)]
pub struct ProductionSheet {
    pub order_id: i64,
    pub folio: i64,
    pub customer_name: String,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_time: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<ProductionRow>,
}

#[derive(Deserialize)]
pub struct BatchProductionRequest {
    pub order_ids: Option<Vec<i64>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Serialize)]
pub struct ProductionSummaryRow {
    pub total_quantity: i64,
    pub unit: String,
    pub product_name: String,
}

/// Consolidated document: per-product totals first, then one section per
/// order in the batch.
#[derive(Serialize)]
pub struct BatchProductionSheet {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub summary: Vec<ProductionSummaryRow>,
    pub orders: Vec<ProductionSheet>,
}
