use axum::{extract::{Path, Query, State}, Extension, Json};
use axum::http::StatusCode;
use chrono::NaiveDate;
use sqlx::PgPool;
use std::collections::HashMap;

use crate::aggregates::{order_total, remaining_balance, round_currency, LineItemAmounts};
use crate::dtos::order::{
    CreateOrderRequest, UpdateOrderRequest, OrderResponse, OrderItemResponse,
    OrderSummary, OrderListResponse,
};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::order::{Order, OrderLineItem};
use crate::reconcile;
use crate::state::AppState;

pub(crate) const ORDER_COLUMNS: &str =
    "id, folio, customer_name, customer_phone, branch, delivery_type, delivery_address, \
     delivery_date, delivery_time, payment_method, status, payment_status, paid_amount, \
     total, notes, created_by, created_at";

const ORDER_STATUSES: [&str; 3] = ["pending", "delivered", "cancelled"];
const PAYMENT_STATUSES: [&str; 3] = ["pending", "abono", "paid"];

// ==================== Create Order ====================

pub async fn create_order(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    // All validation happens before any write: a rejected order leaves no
    // partial state behind.
    if req.customer_name.trim().is_empty() {
        return Err(AppError::validation("Customer name is required"));
    }
    if req.items.is_empty() {
        return Err(AppError::validation("Order must contain at least one item"));
    }
    if req.delivery_type != "pickup" && req.delivery_type != "delivery" {
        return Err(AppError::validation("delivery_type must be 'pickup' or 'delivery'"));
    }
    if let Some(ps) = &req.payment_status {
        if !PAYMENT_STATUSES.contains(&ps.as_str()) {
            return Err(AppError::validation("payment_status must be 'pending', 'abono' or 'paid'"));
        }
    }

    let branch = auth
        .scoped_branch(req.branch.as_deref())
        .ok_or_else(|| AppError::validation("No branch selected"))?;

    // Resolve products and snapshot prices
    let mut line_items = Vec::new();
    let mut amounts = Vec::new();

    for item in &req.items {
        if item.quantity < 1 {
            return Err(AppError::validation("Quantity must be at least 1"));
        }

        let product = sqlx::query_as::<_, (i64, String, f64)>(
            "SELECT id, name, price FROM products WHERE id = $1 AND is_active = TRUE"
        )
        .bind(item.product_id)
        .fetch_optional(&db_pool)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Product {} not found", item.product_id)))?;

        let unit_price = item.unit_price.unwrap_or(product.2);
        if unit_price < 0.0 {
            return Err(AppError::validation("Unit price cannot be negative"));
        }

        amounts.push(LineItemAmounts { quantity: item.quantity, unit_price });
        line_items.push((item.product_id, item.quantity, unit_price));
    }

    let total = order_total(&amounts);
    let payment_status = req.payment_status.as_deref().unwrap_or("pending");

    // Header first, then line items, as two separate writes. If the item
    // insert fails the header stays behind as an empty order with the
    // computed total; the reconciliation pass corrects it to 0 later.
    let order = sqlx::query_as::<_, Order>(
        &format!(
            "INSERT INTO orders
             (customer_name, customer_phone, branch, delivery_type, delivery_address,
              delivery_date, delivery_time, payment_method, payment_status, total, notes, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {ORDER_COLUMNS}"
        )
    )
    .bind(req.customer_name.trim())
    .bind(&req.customer_phone)
    .bind(&branch)
    .bind(&req.delivery_type)
    .bind(&req.delivery_address)
    .bind(req.delivery_date)
    .bind(&req.delivery_time)
    .bind(&req.payment_method)
    .bind(payment_status)
    .bind(total)
    .bind(&req.notes)
    .bind(auth.user_id)
    .fetch_one(&db_pool)
    .await?;

    for (product_id, quantity, unit_price) in &line_items {
        sqlx::query(
            "INSERT INTO order_line_items (order_id, product_id, quantity, unit_price)
             VALUES ($1, $2, $3, $4)"
        )
        .bind(order.id)
        .bind(product_id)
        .bind(quantity)
        .bind(unit_price)
        .execute(&db_pool)
        .await?;
    }

    tracing::info!(order_id = order.id, folio = order.folio, %branch, total, "Order created");

    let response = fetch_order_by_id(&db_pool, order.id).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

// ==================== List Orders ====================

pub async fn list_orders(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<OrderListResponse>, AppError> {
    let page = params.get("page").and_then(|p| p.parse::<i64>().ok()).unwrap_or(1).max(1);
    let page_size = params.get("page_size").and_then(|p| p.parse::<i64>().ok()).unwrap_or(10).clamp(1, 100);

    let branch = auth.scoped_branch(params.get("branch").map(|s| s.as_str()));
    if auth.role != "super_admin" && branch.is_none() {
        return Err(AppError::validation("User has no branch assigned"));
    }

    let status = params.get("status").filter(|s| s.as_str() != "all");
    let payment_status = params.get("payment_status").filter(|s| s.as_str() != "all");
    let from_date = params.get("start_date").and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
    let to_date = params.get("end_date").and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());

    let search = params.get("search").map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let search_pattern = search.as_ref().map(|s| format!("%{s}%"));
    let search_folio = search.as_ref().and_then(|s| s.parse::<i64>().ok());
    let search_total = search.as_ref().and_then(|s| s.parse::<f64>().ok());

    // Shared WHERE clause for the count and data queries; params are bound
    // in the same order the placeholders are appended.
    let mut where_clause = String::from(" WHERE 1=1");
    let mut n = 0u32;

    if branch.is_some() {
        n += 1;
        where_clause.push_str(&format!(" AND branch = ${n}"));
    }
    if status.is_some() {
        n += 1;
        where_clause.push_str(&format!(" AND status = ${n}"));
    }
    if payment_status.is_some() {
        n += 1;
        where_clause.push_str(&format!(" AND payment_status = ${n}"));
    }
    if from_date.is_some() {
        n += 1;
        where_clause.push_str(&format!(" AND created_at::date >= ${n}"));
    }
    if to_date.is_some() {
        n += 1;
        where_clause.push_str(&format!(" AND created_at::date <= ${n}"));
    }
    if search_pattern.is_some() {
        n += 1;
        let mut group = format!("(customer_name ILIKE ${n} OR customer_phone ILIKE ${n}");
        if search_folio.is_some() {
            n += 1;
            group.push_str(&format!(" OR folio = ${n}"));
        }
        if search_total.is_some() {
            n += 1;
            group.push_str(&format!(" OR total = ${n}"));
        }
        group.push(')');
        where_clause.push_str(&format!(" AND {group}"));
    }

    let count_sql = format!("SELECT COUNT(*) FROM orders{where_clause}");
    let data_sql = format!(
        "SELECT {ORDER_COLUMNS} FROM orders{where_clause} \
         ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
        n + 1,
        n + 2
    );

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    let mut data_query = sqlx::query_as::<_, Order>(&data_sql);

    if let Some(b) = &branch {
        count_query = count_query.bind(b);
        data_query = data_query.bind(b);
    }
    if let Some(s) = status {
        count_query = count_query.bind(s);
        data_query = data_query.bind(s);
    }
    if let Some(ps) = payment_status {
        count_query = count_query.bind(ps);
        data_query = data_query.bind(ps);
    }
    if let Some(d) = from_date {
        count_query = count_query.bind(d);
        data_query = data_query.bind(d);
    }
    if let Some(d) = to_date {
        count_query = count_query.bind(d);
        data_query = data_query.bind(d);
    }
    if let Some(p) = &search_pattern {
        count_query = count_query.bind(p);
        data_query = data_query.bind(p);
    }
    if let Some(f) = search_folio {
        count_query = count_query.bind(f);
        data_query = data_query.bind(f);
    }
    if let Some(t) = search_total {
        count_query = count_query.bind(t);
        data_query = data_query.bind(t);
    }

    let count = count_query.fetch_one(&db_pool).await?;
    let orders = data_query
        .bind(page_size)
        .bind((page - 1) * page_size)
        .fetch_all(&db_pool)
        .await?;

    // Self-heal any drifted totals in the page we just served; runs in the
    // background so the response is never held up.
    let stored: Vec<reconcile::StoredTotal> = orders
        .iter()
        .map(|o| reconcile::StoredTotal { order_id: o.id, total: o.total })
        .collect();
    reconcile::spawn(&db_pool, stored);

    Ok(Json(OrderListResponse {
        data: orders.into_iter().map(OrderSummary::from).collect(),
        count,
        page,
        page_size,
    }))
}

// ==================== Get Order ====================

pub async fn get_order(
    State(AppState { db_pool }): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<OrderResponse>, AppError> {
    fetch_order_by_id(&db_pool, id).await.map(Json)
}

// ==================== Update Order ====================

pub async fn update_order(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateOrderRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    if let Some(status) = &req.status {
        if !ORDER_STATUSES.contains(&status.as_str()) {
            return Err(AppError::validation("status must be 'pending', 'delivered' or 'cancelled'"));
        }
    }
    if let Some(ps) = &req.payment_status {
        if !PAYMENT_STATUSES.contains(&ps.as_str()) {
            return Err(AppError::validation("payment_status must be 'pending', 'abono' or 'paid'"));
        }
    }
    if let Some(paid) = req.paid_amount {
        if !(paid.is_finite() && paid >= 0.0) {
            return Err(AppError::validation("paid_amount must be a non-negative number"));
        }
    }

    let updated = sqlx::query(
        "UPDATE orders SET
         status = COALESCE($1, status),
         payment_status = COALESCE($2, payment_status),
         paid_amount = COALESCE($3, paid_amount),
         notes = COALESCE($4, notes)
         WHERE id = $5"
    )
    .bind(&req.status)
    .bind(&req.payment_status)
    .bind(req.paid_amount)
    .bind(&req.notes)
    .bind(id)
    .execute(&db_pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::not_found("Order not found"));
    }

    if let Some(status) = &req.status {
        tracing::info!(order_id = id, user_id = auth.user_id, %status, "Order status changed");
    }

    fetch_order_by_id(&db_pool, id).await.map(Json)
}

// ==================== Helper Functions ====================

pub(crate) async fn fetch_order_by_id(db_pool: &PgPool, id: i64) -> Result<OrderResponse, AppError> {
    let order = sqlx::query_as::<_, Order>(
        &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1")
    )
    .bind(id)
    .fetch_optional(db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Order not found"))?;

    // Creator display name; tolerate a missing user row
    let creator_name = match order.created_by {
        Some(user_id) => sqlx::query_scalar::<_, String>("SELECT full_name FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(db_pool)
            .await?
            .or_else(|| Some("Unknown".to_string())),
        None => None,
    };

    let items = fetch_order_items(db_pool, id).await?;

    let remaining = round_currency(remaining_balance(order.total, order.paid_amount));

    Ok(OrderResponse {
        id: order.id,
        folio: order.folio,
        customer_name: order.customer_name,
        customer_phone: order.customer_phone,
        branch: order.branch,
        delivery_type: order.delivery_type,
        delivery_address: order.delivery_address,
        delivery_date: order.delivery_date,
        delivery_time: order.delivery_time,
        payment_method: order.payment_method,
        status: order.status,
        payment_status: order.payment_status,
        paid_amount: order.paid_amount,
        total: order.total,
        remaining,
        notes: order.notes,
        created_by: order.created_by,
        creator_name,
        created_at: order.created_at,
        items,
    })
}

pub(crate) async fn fetch_order_items(
    db_pool: &PgPool,
    order_id: i64,
) -> Result<Vec<OrderItemResponse>, AppError> {
    let rows = sqlx::query_as::<_, OrderLineItem>(
        "SELECT oli.id, oli.order_id, oli.product_id, oli.quantity, oli.unit_price,
                p.name AS product_name, p.unit AS product_unit, p.image_url AS product_image_url
         FROM order_line_items oli
         LEFT JOIN products p ON oli.product_id = p.id
         WHERE oli.order_id = $1
         ORDER BY oli.id ASC"
    )
    .bind(order_id)
    .fetch_all(db_pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|item| OrderItemResponse {
            id: item.id,
            product_id: item.product_id,
            // A line whose product was removed keeps rendering
            product_name: item.product_name.unwrap_or_else(|| "Unknown product".to_string()),
            unit: item.product_unit.unwrap_or_default(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            line_total: round_currency(item.quantity as f64 * item.unit_price),
        })
        .collect())
}
