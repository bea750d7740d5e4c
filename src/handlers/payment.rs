// Append-only payment ledger per order, with the cached paid_amount on the
// order header kept in sync after each append.
use axum::{extract::{Path, State}, Extension, Json};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::aggregates::{remaining_balance, round_currency};
use crate::dtos::payment::{AddPaymentRequest, PaymentResponse, PaymentLedgerResponse};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

// POST /orders/:id/payments
pub async fn add_payment(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(order_id): Path<i64>,
    Json(req): Json<AddPaymentRequest>,
) -> Result<(StatusCode, Json<PaymentLedgerResponse>), AppError> {
    if !(req.amount.is_finite() && req.amount > 0.0) {
        return Err(AppError::validation("Payment amount must be a positive number"));
    }

    let order_exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM orders WHERE id = $1)")
        .bind(order_id)
        .fetch_one(&db_pool)
        .await?;
    if !order_exists {
        return Err(AppError::not_found("Order not found"));
    }

    sqlx::query(
        "INSERT INTO payments (order_id, amount, notes, created_by) VALUES ($1, $2, $3, $4)"
    )
    .bind(order_id)
    .bind(req.amount)
    .bind(&req.notes)
    .bind(auth.user_id)
    .execute(&db_pool)
    .await?;

    // Read-modify-write of the cached counter. Two concurrent payments can
    // lose an update here; the ledger rows themselves are never lost.
    let current_paid = sqlx::query_scalar::<_, f64>("SELECT paid_amount FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_one(&db_pool)
        .await?;

    sqlx::query("UPDATE orders SET paid_amount = $1 WHERE id = $2")
        .bind(current_paid + req.amount)
        .bind(order_id)
        .execute(&db_pool)
        .await?;

    tracing::info!(order_id, amount = req.amount, user_id = auth.user_id, "Payment recorded");

    let ledger = fetch_payment_ledger(&db_pool, order_id).await?;
    Ok((StatusCode::CREATED, Json(ledger)))
}

// GET /orders/:id/payments
pub async fn list_payments(
    State(AppState { db_pool }): State<AppState>,
    Path(order_id): Path<i64>,
) -> Result<Json<PaymentLedgerResponse>, AppError> {
    let order_exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM orders WHERE id = $1)")
        .bind(order_id)
        .fetch_one(&db_pool)
        .await?;
    if !order_exists {
        return Err(AppError::not_found("Order not found"));
    }

    fetch_payment_ledger(&db_pool, order_id).await.map(Json)
}

async fn fetch_payment_ledger(
    db_pool: &PgPool,
    order_id: i64,
) -> Result<PaymentLedgerResponse, AppError> {
    let (total, paid_amount) = sqlx::query_as::<_, (f64, f64)>(
        "SELECT total, paid_amount FROM orders WHERE id = $1"
    )
    .bind(order_id)
    .fetch_one(db_pool)
    .await?;

    let rows = sqlx::query_as::<_, PaymentRow>(
        "SELECT p.id, p.order_id, p.amount, p.notes, p.created_by, p.created_at,
                u.full_name AS creator_name
         FROM payments p
         LEFT JOIN users u ON p.created_by = u.id
         WHERE p.order_id = $1
         ORDER BY p.created_at DESC, p.id DESC"
    )
    .bind(order_id)
    .fetch_all(db_pool)
    .await?;

    let payments = rows
        .into_iter()
        .map(|p| PaymentResponse {
            id: p.id,
            order_id: p.order_id,
            amount: p.amount,
            notes: p.notes,
            created_by: p.created_by,
            creator_name: p.creator_name.unwrap_or_else(|| "Unknown".to_string()),
            created_at: p.created_at,
        })
        .collect();

    Ok(PaymentLedgerResponse {
        order_id,
        total,
        paid_amount,
        remaining: round_currency(remaining_balance(total, paid_amount)),
        payments,
    })
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: i64,
    order_id: i64,
    amount: f64,
    notes: Option<String>,
    created_by: Option<i64>,
    created_at: DateTime<Utc>,
    creator_name: Option<String>,
}
