// Internal stock requests: structurally an order without pricing.
use axum::{extract::{Path, Query, State}, Extension, Json};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;

use crate::dtos::requisition::{
    CreateRequisitionRequest, UpdateRequisitionRequest, RequisitionResponse,
    RequisitionItemResponse, RequisitionSummary,
};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

const REQUISITION_STATUSES: [&str; 4] = ["pending", "approved", "delivered", "cancelled"];

// POST /requisitions
pub async fn create_requisition(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateRequisitionRequest>,
) -> Result<(StatusCode, Json<RequisitionResponse>), AppError> {
    if req.requester_name.trim().is_empty() {
        return Err(AppError::validation("Requester name is required"));
    }
    if req.items.is_empty() {
        return Err(AppError::validation("Requisition must contain at least one item"));
    }
    for item in &req.items {
        if item.quantity < 1 {
            return Err(AppError::validation("Quantity must be at least 1"));
        }
    }

    let branch = auth
        .scoped_branch(req.branch.as_deref())
        .ok_or_else(|| AppError::validation("No branch selected"))?;

    // Header first, then items; same two-step write as orders
    let header = sqlx::query_as::<_, (i64, i64, DateTime<Utc>)>(
        "INSERT INTO requisitions (branch, requester_name, position, created_by)
         VALUES ($1, $2, $3, $4)
         RETURNING id, folio, created_at"
    )
    .bind(&branch)
    .bind(req.requester_name.trim())
    .bind(&req.position)
    .bind(auth.user_id)
    .fetch_one(&db_pool)
    .await?;

    for item in &req.items {
        sqlx::query(
            "INSERT INTO requisition_items (requisition_id, product_id, quantity)
             VALUES ($1, $2, $3)"
        )
        .bind(header.0)
        .bind(item.product_id)
        .bind(item.quantity)
        .execute(&db_pool)
        .await?;
    }

    let response = fetch_requisition_by_id(&db_pool, header.0).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

// GET /requisitions
pub async fn list_requisitions(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<RequisitionSummary>>, AppError> {
    let branch = auth.scoped_branch(params.get("branch").map(|s| s.as_str()));
    if auth.role != "super_admin" && branch.is_none() {
        return Err(AppError::validation("User has no branch assigned"));
    }
    let status = params.get("status").filter(|s| s.as_str() != "all");

    let mut query_str = String::from(
        "SELECT id, folio, branch, requester_name, position, status, created_at
         FROM requisitions WHERE 1=1",
    );
    let mut n = 0u32;
    if branch.is_some() {
        n += 1;
        query_str.push_str(&format!(" AND branch = ${n}"));
    }
    if status.is_some() {
        n += 1;
        query_str.push_str(&format!(" AND status = ${n}"));
    }
    query_str.push_str(" ORDER BY created_at DESC");

    let mut query = sqlx::query_as::<_, RequisitionRow>(&query_str);
    if let Some(b) = &branch {
        query = query.bind(b);
    }
    if let Some(s) = status {
        query = query.bind(s);
    }

    let rows = query.fetch_all(&db_pool).await?;

    Ok(Json(
        rows.into_iter()
            .map(|r| RequisitionSummary {
                id: r.id,
                folio: r.folio,
                branch: r.branch,
                requester_name: r.requester_name,
                position: r.position,
                status: r.status,
                created_at: r.created_at,
            })
            .collect(),
    ))
}

// GET /requisitions/:id
pub async fn get_requisition(
    State(AppState { db_pool }): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<RequisitionResponse>, AppError> {
    fetch_requisition_by_id(&db_pool, id).await.map(Json)
}

// PATCH /requisitions/:id
pub async fn update_requisition(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateRequisitionRequest>,
) -> Result<Json<RequisitionResponse>, AppError> {
    if !REQUISITION_STATUSES.contains(&req.status.as_str()) {
        return Err(AppError::validation(
            "status must be 'pending', 'approved', 'delivered' or 'cancelled'",
        ));
    }
    if !auth.is_admin() {
        return Err(AppError::forbidden("Only admins can update requisitions"));
    }

    let updated = sqlx::query("UPDATE requisitions SET status = $1 WHERE id = $2")
        .bind(&req.status)
        .bind(id)
        .execute(&db_pool)
        .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::not_found("Requisition not found"));
    }

    fetch_requisition_by_id(&db_pool, id).await.map(Json)
}

async fn fetch_requisition_by_id(
    db_pool: &PgPool,
    id: i64,
) -> Result<RequisitionResponse, AppError> {
    let header = sqlx::query_as::<_, RequisitionHeaderRow>(
        "SELECT id, folio, branch, requester_name, position, status, created_by, created_at
         FROM requisitions WHERE id = $1"
    )
    .bind(id)
    .fetch_optional(db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Requisition not found"))?;

    let items = sqlx::query_as::<_, (i64, i64, i32, Option<String>, Option<String>)>(
        "SELECT ri.id, ri.product_id, ri.quantity, p.name, p.unit
         FROM requisition_items ri
         LEFT JOIN products p ON ri.product_id = p.id
         WHERE ri.requisition_id = $1
         ORDER BY ri.id ASC"
    )
    .bind(id)
    .fetch_all(db_pool)
    .await?;

    Ok(RequisitionResponse {
        id: header.id,
        folio: header.folio,
        branch: header.branch,
        requester_name: header.requester_name,
        position: header.position,
        status: header.status,
        created_by: header.created_by,
        created_at: header.created_at,
        items: items
            .into_iter()
            .map(|(item_id, product_id, quantity, name, unit)| RequisitionItemResponse {
                id: item_id,
                product_id,
                product_name: name.unwrap_or_else(|| "Unknown product".to_string()),
                unit: unit.unwrap_or_default(),
                quantity,
            })
            .collect(),
    })
}

#[derive(sqlx::FromRow)]
struct RequisitionRow {
    id: i64,
    folio: i64,
    branch: String,
    requester_name: String,
    position: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct RequisitionHeaderRow {
    id: i64,
    folio: i64,
    branch: String,
    requester_name: String,
    position: Option<String>,
    status: String,
    created_by: Option<i64>,
    created_at: DateTime<Utc>,
}
