use axum::{extract::{Path, Query, State}, Extension, Json};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::dtos::stock::{StockItemResponse, UpdateStockRequest};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

// GET /stock - Every active product with the branch quantity. Products
// without a stock row appear with quantity 0 and no stock_id.
pub async fn get_stock(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<StockItemResponse>>, AppError> {
    let branch = auth
        .scoped_branch(params.get("branch").map(|s| s.as_str()))
        .ok_or_else(|| AppError::validation("No branch selected"))?;

    let products = sqlx::query_as::<_, (i64, String, String, f64, Option<String>)>(
        "SELECT id, name, unit, price, image_url FROM products WHERE is_active = TRUE ORDER BY name ASC"
    )
    .fetch_all(&db_pool)
    .await?;

    let stock_rows = sqlx::query_as::<_, (i64, i64, i32, DateTime<Utc>)>(
        "SELECT id, product_id, quantity, updated_at FROM branch_stock WHERE branch = $1"
    )
    .bind(&branch)
    .fetch_all(&db_pool)
    .await?;

    let by_product: HashMap<i64, (i64, i32, DateTime<Utc>)> = stock_rows
        .into_iter()
        .map(|(id, product_id, quantity, updated_at)| (product_id, (id, quantity, updated_at)))
        .collect();

    let merged = products
        .into_iter()
        .map(|(product_id, name, unit, price, image_url)| {
            let entry = by_product.get(&product_id);
            StockItemResponse {
                stock_id: entry.map(|(id, _, _)| *id),
                product_id,
                product_name: name,
                unit,
                price,
                image_url,
                quantity: entry.map(|(_, q, _)| *q).unwrap_or(0),
                updated_at: entry.map(|(_, _, t)| *t),
            }
        })
        .collect();

    Ok(Json(merged))
}

// PUT /stock/:product_id - Declare the quantity on hand for the branch
pub async fn update_stock(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(product_id): Path<i64>,
    Json(req): Json<UpdateStockRequest>,
) -> Result<Json<StockItemResponse>, AppError> {
    if !auth.is_admin() {
        return Err(AppError::forbidden("Only admins can update stock"));
    }
    if req.quantity < 0 {
        return Err(AppError::validation("Declared stock cannot be negative"));
    }

    let branch = auth
        .scoped_branch(req.branch.as_deref())
        .ok_or_else(|| AppError::validation("No branch selected"))?;

    let product = sqlx::query_as::<_, (String, String, f64, Option<String>)>(
        "SELECT name, unit, price, image_url FROM products WHERE id = $1 AND is_active = TRUE"
    )
    .bind(product_id)
    .fetch_optional(&db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Product not found"))?;

    let (stock_id, quantity, updated_at) = sqlx::query_as::<_, (i64, i32, DateTime<Utc>)>(
        "INSERT INTO branch_stock (product_id, branch, quantity, updated_at)
         VALUES ($1, $2, $3, NOW())
         ON CONFLICT (product_id, branch)
         DO UPDATE SET quantity = EXCLUDED.quantity, updated_at = NOW()
         RETURNING id, quantity, updated_at"
    )
    .bind(product_id)
    .bind(&branch)
    .bind(req.quantity)
    .fetch_one(&db_pool)
    .await?;

    tracing::info!(product_id, %branch, quantity, "Stock updated");

    Ok(Json(StockItemResponse {
        stock_id: Some(stock_id),
        product_id,
        product_name: product.0,
        unit: product.1,
        price: product.2,
        image_url: product.3,
        quantity,
        updated_at: Some(updated_at),
    }))
}
