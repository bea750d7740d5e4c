use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc, NaiveDate};

use crate::aggregates::{remaining_balance, round_currency};
use crate::models::order::Order;

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub branch: Option<String>,
    pub delivery_type: String,
    pub delivery_address: Option<String>,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_time: Option<String>,
    pub payment_method: Option<String>,
    pub payment_status: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<OrderItemRequest>,
}

#[derive(Deserialize)]
pub struct OrderItemRequest {
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: Option<f64>, // Optional - snapshots the catalog price if not provided
}

#[derive(Deserialize)]
pub struct UpdateOrderRequest {
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub paid_amount: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub unit: String,
    pub quantity: i32,
    pub unit_price: f64,
    pub line_total: f64,
}

#[derive(Serialize)]
pub struct OrderResponse {
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
    pub remaining: f64,
    pub notes: Option<String>,
    pub created_by: Option<i64>,
    pub creator_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
}

#[derive(Serialize)]
pub struct OrderSummary {
    pub id: i64,
    pub folio: i64,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub branch: String,
    pub delivery_type: String,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_time: Option<String>,
    pub status: String,
    pub payment_status: String,
    pub paid_amount: f64,
    pub total: f64,
    pub remaining: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Order> for OrderSummary {
    fn from(order: Order) -> Self {
        let remaining = round_currency(remaining_balance(order.total, order.paid_amount));
        Self {
            id: order.id,
            folio: order.folio,
            customer_name: order.customer_name,
            customer_phone: order.customer_phone,
            branch: order.branch,
            delivery_type: order.delivery_type,
            delivery_date: order.delivery_date,
            delivery_time: order.delivery_time,
            status: order.status,
            payment_status: order.payment_status,
            paid_amount: order.paid_amount,
            total: order.total,
            remaining,
            notes: order.notes,
            created_at: order.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct OrderListResponse {
    pub data: Vec<OrderSummary>,
    pub count: i64,
    pub page: i64,
    pub page_size: i64,
}
