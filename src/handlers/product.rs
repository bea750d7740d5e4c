// src/handlers/product.rs
use axum::{
    extract::{Path, Query, State},
    body::Bytes,
    Extension, Json,
};
use sqlx::Error as SqlxError;
use std::collections::HashMap;
use crate::dtos::product::{CreateProductRequest, UpdateProductRequest, ProductResponse};
use crate::models::product::Product;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;
use crate::storage;
use crate::error::AppError;
use tracing::{error, instrument};

const PRODUCT_COLUMNS: &str =
    "id, name, description, unit, price, image_url, category, subcategory, is_active, created_at";

fn map_unique_violation(err: SqlxError, message: &str) -> AppError {
    match err {
        SqlxError::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            AppError::conflict(message)
        }
        other => other.into(),
    }
}

// GET /products - Active catalog, optional name search and category filter
#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<ProductResponse>>, AppError> {
    let search = params.get("search").map(|s| format!("%{}%", s.trim()));
    let category = params.get("category");

    let mut query_str = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = TRUE");
    let mut n = 0u32;
    if search.is_some() {
        n += 1;
        query_str.push_str(&format!(" AND name ILIKE ${n}"));
    }
    if category.is_some() {
        n += 1;
        query_str.push_str(&format!(" AND category = ${n}"));
    }
    query_str.push_str(" ORDER BY name ASC");

    let mut query = sqlx::query_as::<_, Product>(&query_str);
    if let Some(pattern) = &search {
        query = query.bind(pattern);
    }
    if let Some(cat) = category {
        query = query.bind(cat);
    }

    match query.fetch_all(&state.db_pool).await {
        Ok(products) => {
            let response = products.into_iter().map(ProductResponse::from).collect();
            Ok(Json(response))
        }
        Err(e) => {
            error!(?e, "Failed to fetch products");
            Err(e.into())
        }
    }
}

// GET /products/:id - Single product, active or not
#[instrument(skip(state), fields(id))]
pub async fn get_product(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<ProductResponse>, AppError> {
    let product = sqlx::query_as::<_, Product>(
        &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1")
    )
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Product not found"))?;

    Ok(Json(ProductResponse::from(product)))
}

// POST /products - Create new catalog entry
#[instrument(skip(state, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(axum::http::StatusCode, Json<ProductResponse>), AppError> {
    if !auth.is_admin() {
        return Err(AppError::forbidden("Only admins can create products"));
    }
    if payload.name.trim().is_empty() {
        return Err(AppError::validation("Product name is required"));
    }
    if payload.price < 0.0 {
        return Err(AppError::validation("Price cannot be negative"));
    }

    let description = payload.description.unwrap_or_else(|| payload.name.trim().to_string());

    let product = sqlx::query_as::<_, Product>(
        &format!(
            "INSERT INTO products (name, description, unit, price, image_url, category, subcategory)
             VALUES ($1, $2, COALESCE($3, 'pieza'), $4, $5, COALESCE($6, 'Panaderia'), $7)
             RETURNING {PRODUCT_COLUMNS}"
        )
    )
    .bind(payload.name.trim())
    .bind(&description)
    .bind(&payload.unit)
    .bind(payload.price)
    .bind(&payload.image_url)
    .bind(&payload.category)
    .bind(&payload.subcategory)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| map_unique_violation(e, "Product name already exists"))?;

    Ok((axum::http::StatusCode::CREATED, Json(ProductResponse::from(product))))
}

// PATCH /products/:id - Partial update; setting is_active = false is the
// soft-delete path (products are never hard-deleted)
#[instrument(skip(state, payload), fields(id))]
pub async fn update_product(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, AppError> {
    if !auth.is_admin() {
        return Err(AppError::forbidden("Only admins can update products"));
    }
    if let Some(price) = payload.price {
        if price < 0.0 {
            return Err(AppError::validation("Price cannot be negative"));
        }
    }

    let product = sqlx::query_as::<_, Product>(
        &format!(
            "UPDATE products SET
             name = COALESCE($1, name),
             price = COALESCE($2, price),
             unit = COALESCE($3, unit),
             description = COALESCE($4, description),
             category = COALESCE($5, category),
             subcategory = COALESCE($6, subcategory),
             image_url = COALESCE($7, image_url),
             is_active = COALESCE($8, is_active)
             WHERE id = $9 RETURNING {PRODUCT_COLUMNS}"
        )
    )
    .bind(payload.name.as_deref().map(|s| s.trim()))
    .bind(payload.price)
    .bind(&payload.unit)
    .bind(&payload.description)
    .bind(&payload.category)
    .bind(&payload.subcategory)
    .bind(&payload.image_url)
    .bind(payload.is_active)
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await
    .map_err(|e| map_unique_violation(e, "Product name already exists"))?
    .ok_or_else(|| AppError::not_found("Product not found"))?;

    Ok(Json(ProductResponse::from(product)))
}

// POST /products/:id/image - Compress and store a product image, then point
// the catalog entry at the public URL
#[instrument(skip(state, body), fields(id))]
pub async fn upload_product_image(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    body: Bytes,
) -> Result<Json<ProductResponse>, AppError> {
    if !auth.is_admin() {
        return Err(AppError::forbidden("Only admins can upload product images"));
    }
    if body.is_empty() {
        return Err(AppError::validation("Image body is empty"));
    }

    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
        .bind(id)
        .fetch_one(&state.db_pool)
        .await?;
    if !exists {
        return Err(AppError::not_found("Product not found"));
    }

    let image_url = storage::save_product_image(id, &body).await?;

    let product = sqlx::query_as::<_, Product>(
        &format!("UPDATE products SET image_url = $1 WHERE id = $2 RETURNING {PRODUCT_COLUMNS}")
    )
    .bind(&image_url)
    .bind(id)
    .fetch_one(&state.db_pool)
    .await?;

    Ok(Json(ProductResponse::from(product)))
}
