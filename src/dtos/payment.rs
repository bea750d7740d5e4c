use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

#[derive(Deserialize)]
pub struct AddPaymentRequest {
    pub amount: f64,
    pub notes: Option<String>,
}

#[derive(Serialize)]
pub struct PaymentResponse {
    pub id: i64,
    pub order_id: i64,
    pub amount: f64,
    pub notes: Option<String>,
    pub created_by: Option<i64>,
    pub creator_name: String,
    pub created_at: DateTime<Utc>,
}

/// Payment list plus the derived figures shown next to it.
#[derive(Serialize)]
pub struct PaymentLedgerResponse {
    pub order_id: i64,
    pub total: f64,
    pub paid_amount: f64,
    pub remaining: f64,
    pub payments: Vec<PaymentResponse>,
}
