use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

#[derive(Deserialize)]
pub struct CreateRequisitionRequest {
    pub requester_name: String,
    pub position: Option<String>,
    pub branch: Option<String>,
    pub items: Vec<RequisitionItemRequest>,
}

#[derive(Deserialize)]
pub struct RequisitionItemRequest {
    pub product_id: i64,
    pub quantity: i32,
}

#[derive(Deserialize)]
pub struct UpdateRequisitionRequest {
    pub status: String,
}

#[derive(Serialize)]
pub struct RequisitionItemResponse {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub unit: String,
    pub quantity: i32,
}

#[derive(Serialize)]
pub struct RequisitionResponse {
    pub id: i64,
    pub folio: i64,
    pub branch: String,
    pub requester_name: String,
    pub position: Option<String>,
    pub status: String,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<RequisitionItemResponse>,
}

#[derive(Serialize)]
pub struct RequisitionSummary {
    pub id: i64,
    pub folio: i64,
    pub branch: String,
    pub requester_name: String,
    pub position: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
