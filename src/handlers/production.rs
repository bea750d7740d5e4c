// Production sheet assembly. The handlers gather everything the kitchen
// document needs (folio, delivery slot, item rows with product labels and
// image URLs); rendering to PDF happens in the client against this data.
use axum::{extract::{Path, State}, Extension, Json};
use chrono::NaiveDate;
use sqlx::PgPool;
use std::collections::HashMap;

use crate::dtos::production::{
    BatchProductionRequest, BatchProductionSheet, ProductionRow, ProductionSheet,
    ProductionSummaryRow,
};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::order::Order;
use crate::state::AppState;

use super::order::ORDER_COLUMNS;

// GET /orders/:id/production-sheet
pub async fn production_sheet(
    State(AppState { db_pool }): State<AppState>,
    Path(order_id): Path<i64>,
) -> Result<Json<ProductionSheet>, AppError> {
    let order = sqlx::query_as::<_, Order>(
        &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1")
    )
    .bind(order_id)
    .fetch_optional(&db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Order not found"))?;

    let mut items_by_order = fetch_production_rows(&db_pool, &[order_id]).await?;
    let items = items_by_order.remove(&order_id).unwrap_or_default();

    if items.is_empty() {
        return Err(AppError::validation("Order has no line items"));
    }

    Ok(Json(sheet_for(&order, items)))
}

// POST /orders/production-sheets - Consolidated document for a batch of
// orders chosen by id or by creation date range
pub async fn batch_production_sheets(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<BatchProductionRequest>,
) -> Result<Json<BatchProductionSheet>, AppError> {
    let orders = match (&req.order_ids, req.start_date, req.end_date) {
        (Some(ids), _, _) if !ids.is_empty() => fetch_orders_by_ids(&db_pool, ids).await?,
        (_, Some(start), Some(end)) => {
            if end < start {
                return Err(AppError::validation("end_date must not precede start_date"));
            }
            let branch = auth
                .scoped_branch(None)
                .ok_or_else(|| AppError::validation("No branch selected"))?;
            fetch_orders_by_period(&db_pool, &branch, start, end).await?
        }
        _ => {
            return Err(AppError::validation(
                "Provide order_ids or a start_date/end_date range",
            ))
        }
    };

    if orders.is_empty() {
        return Err(AppError::not_found("No orders matched the request"));
    }

    let order_ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
    let mut items_by_order = fetch_production_rows(&db_pool, &order_ids).await?;

    // Consolidated per-product totals across the whole batch
    let mut summary: HashMap<i64, ProductionSummaryRow> = HashMap::new();
    for rows in items_by_order.values() {
        for row in rows {
            summary
                .entry(row.product_key)
                .and_modify(|s| s.total_quantity += row.row.quantity as i64)
                .or_insert_with(|| ProductionSummaryRow {
                    total_quantity: row.row.quantity as i64,
                    unit: row.row.unit.clone(),
                    product_name: row.row.product_name.clone(),
                });
        }
    }
    let mut summary: Vec<ProductionSummaryRow> = summary.into_values().collect();
    summary.sort_by(|a, b| a.product_name.cmp(&b.product_name));

    let sheets = orders
        .iter()
        .map(|order| {
            let items = items_by_order.remove(&order.id).unwrap_or_default();
            sheet_for(order, items)
        })
        .collect();

    Ok(Json(BatchProductionSheet {
        start_date: req.start_date,
        end_date: req.end_date,
        summary,
        orders: sheets,
    }))
}

fn sheet_for(order: &Order, items: Vec<TaggedRow>) -> ProductionSheet {
    ProductionSheet {
        order_id: order.id,
        folio: order.folio,
        customer_name: order.customer_name.clone(),
        delivery_date: order.delivery_date,
        delivery_time: order.delivery_time.clone(),
        notes: order.notes.clone(),
        items: items.into_iter().map(|t| t.row).collect(),
    }
}

async fn fetch_orders_by_ids(db_pool: &PgPool, ids: &[i64]) -> Result<Vec<Order>, AppError> {
    let orders = sqlx::query_as::<_, Order>(
        &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ANY($1) ORDER BY folio ASC")
    )
    .bind(ids)
    .fetch_all(db_pool)
    .await?;
    Ok(orders)
}

async fn fetch_orders_by_period(
    db_pool: &PgPool,
    branch: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Order>, AppError> {
    let orders = sqlx::query_as::<_, Order>(
        &format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE branch = $1 AND status <> 'cancelled'
               AND created_at::date BETWEEN $2 AND $3
             ORDER BY folio ASC"
        )
    )
    .bind(branch)
    .bind(start)
    .bind(end)
    .fetch_all(db_pool)
    .await?;
    Ok(orders)
}

struct TaggedRow {
    product_key: i64,
    row: ProductionRow,
}

/// One batched line-item fetch for the whole id set, grouped per order.
async fn fetch_production_rows(
    db_pool: &PgPool,
    order_ids: &[i64],
) -> Result<HashMap<i64, Vec<TaggedRow>>, AppError> {
    let rows = sqlx::query_as::<_, (i64, i64, i32, Option<String>, Option<String>, Option<String>)>(
        "SELECT oli.order_id, oli.product_id, oli.quantity,
                p.name, p.unit, p.image_url
         FROM order_line_items oli
         LEFT JOIN products p ON oli.product_id = p.id
         WHERE oli.order_id = ANY($1)
         ORDER BY oli.order_id ASC, oli.id ASC"
    )
    .bind(order_ids)
    .fetch_all(db_pool)
    .await?;

    let mut grouped: HashMap<i64, Vec<TaggedRow>> = HashMap::new();
    for (order_id, product_id, quantity, name, unit, image_url) in rows {
        grouped.entry(order_id).or_default().push(TaggedRow {
            product_key: product_id,
            row: ProductionRow {
                quantity,
                unit: unit.unwrap_or_default(),
                product_name: name.unwrap_or_else(|| "Unknown product".to_string()),
                image_url,
            },
        });
    }
    Ok(grouped)
}
