// Line item mutations. Every insert/update/delete is followed by a total
// recalculation persisted to the order header, so the stored total tracks
// the line items it is derived from.
use axum::{extract::{Path, State}, Extension, Json};
use axum::http::StatusCode;
use sqlx::PgPool;

use crate::aggregates::{order_total, LineItemAmounts};
use crate::dtos::order::{OrderItemRequest, OrderResponse};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

use super::order::fetch_order_by_id;

#[derive(serde::Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i32,
}

// POST /orders/:id/items
pub async fn add_item(
    State(AppState { db_pool }): State<AppState>,
    Extension(_auth): Extension<AuthContext>,
    Path(order_id): Path<i64>,
    Json(req): Json<OrderItemRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    if req.quantity < 1 {
        return Err(AppError::validation("Quantity must be at least 1"));
    }

    let order_exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM orders WHERE id = $1)")
        .bind(order_id)
        .fetch_one(&db_pool)
        .await?;
    if !order_exists {
        return Err(AppError::not_found("Order not found"));
    }

    let product = sqlx::query_as::<_, (i64, f64)>(
        "SELECT id, price FROM products WHERE id = $1 AND is_active = TRUE"
    )
    .bind(req.product_id)
    .fetch_optional(&db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Product not found"))?;

    // Price is a snapshot at time of sale, not a live reference
    let unit_price = req.unit_price.unwrap_or(product.1);
    if unit_price < 0.0 {
        return Err(AppError::validation("Unit price cannot be negative"));
    }

    sqlx::query(
        "INSERT INTO order_line_items (order_id, product_id, quantity, unit_price)
         VALUES ($1, $2, $3, $4)"
    )
    .bind(order_id)
    .bind(req.product_id)
    .bind(req.quantity)
    .bind(unit_price)
    .execute(&db_pool)
    .await?;

    recalculate_order_total(&db_pool, order_id).await?;

    let response = fetch_order_by_id(&db_pool, order_id).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

// PATCH /orders/:id/items/:item_id
pub async fn update_item(
    State(AppState { db_pool }): State<AppState>,
    Extension(_auth): Extension<AuthContext>,
    Path((order_id, item_id)): Path<(i64, i64)>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    if req.quantity < 1 {
        return Err(AppError::validation("Quantity must be at least 1"));
    }

    let updated = sqlx::query(
        "UPDATE order_line_items SET quantity = $1 WHERE id = $2 AND order_id = $3"
    )
    .bind(req.quantity)
    .bind(item_id)
    .bind(order_id)
    .execute(&db_pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::not_found("Line item not found"));
    }

    recalculate_order_total(&db_pool, order_id).await?;

    fetch_order_by_id(&db_pool, order_id).await.map(Json)
}

// DELETE /orders/:id/items/:item_id
pub async fn delete_item(
    State(AppState { db_pool }): State<AppState>,
    Extension(_auth): Extension<AuthContext>,
    Path((order_id, item_id)): Path<(i64, i64)>,
) -> Result<Json<OrderResponse>, AppError> {
    let deleted = sqlx::query("DELETE FROM order_line_items WHERE id = $1 AND order_id = $2")
        .bind(item_id)
        .bind(order_id)
        .execute(&db_pool)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(AppError::not_found("Line item not found"));
    }

    recalculate_order_total(&db_pool, order_id).await?;

    fetch_order_by_id(&db_pool, order_id).await.map(Json)
}

/// Recompute the authoritative total from the current line items and write
/// it to the order header. An order left with zero items has total 0.
async fn recalculate_order_total(db_pool: &PgPool, order_id: i64) -> Result<f64, AppError> {
    let rows = sqlx::query_as::<_, (i32, f64)>(
        "SELECT quantity, unit_price FROM order_line_items WHERE order_id = $1"
    )
    .bind(order_id)
    .fetch_all(db_pool)
    .await?;

    let items: Vec<LineItemAmounts> = rows
        .into_iter()
        .map(|(quantity, unit_price)| LineItemAmounts { quantity, unit_price })
        .collect();
    let total = order_total(&items);

    sqlx::query("UPDATE orders SET total = $1 WHERE id = $2")
        .bind(total)
        .bind(order_id)
        .execute(db_pool)
        .await?;

    Ok(total)
}
