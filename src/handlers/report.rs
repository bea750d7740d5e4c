// Reporting endpoints. Rows are fetched with narrow queries and folded in
// memory by the aggregation passes in crate::aggregates.
use axum::{extract::{Query, State}, Extension, Json};
use chrono::NaiveDate;
use sqlx::PgPool;
use std::collections::HashMap;

use crate::aggregates::{
    self, OrderAmounts, Receivable, SoldLine, StockOverviewRow, StockProduct, round_currency,
};
use crate::dtos::report::{FinancialSummaryResponse, StockOverviewResponse};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

// GET /reports/financial-summary?start_date=..&end_date=..
//
// Sales, collected and cancelled are aggregated over orders created inside
// the period (whole local days, inclusive). Pending is aggregated over
// every outstanding order of the branch regardless of date.
pub async fn financial_summary(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<FinancialSummaryResponse>, AppError> {
    let branch = auth
        .scoped_branch(params.get("branch").map(|s| s.as_str()))
        .ok_or_else(|| AppError::validation("No branch selected"))?;

    let start_date = parse_date_param(&params, "start_date")?
        .ok_or_else(|| AppError::validation("start_date is required"))?;
    let end_date = parse_date_param(&params, "end_date")?
        .ok_or_else(|| AppError::validation("end_date is required"))?;
    if end_date < start_date {
        return Err(AppError::validation("end_date must not precede start_date"));
    }

    let period_rows = sqlx::query_as::<_, (f64, f64, String, String)>(
        "SELECT total, paid_amount, status, payment_status
         FROM orders
         WHERE branch = $1 AND created_at::date BETWEEN $2 AND $3"
    )
    .bind(&branch)
    .bind(start_date)
    .bind(end_date)
    .fetch_all(&db_pool)
    .await?;

    let period: Vec<OrderAmounts> = period_rows
        .into_iter()
        .map(|(total, paid_amount, status, payment_status)| OrderAmounts {
            total,
            paid_amount,
            status,
            payment_status,
        })
        .collect();

    // Outstanding balances are deliberately not date-scoped
    let receivable_rows = sqlx::query_as::<_, (f64, f64)>(
        "SELECT total, paid_amount
         FROM orders
         WHERE branch = $1 AND status <> 'cancelled' AND payment_status <> 'paid'"
    )
    .bind(&branch)
    .fetch_all(&db_pool)
    .await?;

    let receivables: Vec<Receivable> = receivable_rows
        .into_iter()
        .map(|(total, paid_amount)| Receivable { total, paid_amount })
        .collect();

    let totals = aggregates::financial_summary(&period, &receivables);

    let stock_overview =
        build_stock_overview(&db_pool, &branch, Some(start_date), Some(end_date)).await?;

    Ok(Json(FinancialSummaryResponse {
        branch,
        start_date,
        end_date,
        total_sales: round_currency(totals.total_sales),
        total_collected: round_currency(totals.total_collected),
        total_pending: round_currency(totals.total_pending),
        total_cancelled: round_currency(totals.total_cancelled),
        stock_overview,
    }))
}

// GET /reports/stock-overview - Consumption vs declared stock, all-time
// when no range is given
pub async fn stock_overview(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<StockOverviewResponse>, AppError> {
    let branch = auth
        .scoped_branch(params.get("branch").map(|s| s.as_str()))
        .ok_or_else(|| AppError::validation("No branch selected"))?;

    let start_date = parse_date_param(&params, "start_date")?;
    let end_date = parse_date_param(&params, "end_date")?;

    let rows = build_stock_overview(&db_pool, &branch, start_date, end_date).await?;

    Ok(Json(StockOverviewResponse {
        branch,
        start_date,
        end_date,
        rows,
    }))
}

fn parse_date_param(
    params: &HashMap<String, String>,
    name: &str,
) -> Result<Option<NaiveDate>, AppError> {
    match params.get(name) {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| AppError::validation(format!("{name} must be YYYY-MM-DD"))),
    }
}

/// Declared stock merged with consumption by non-cancelled orders in the
/// window. Line items of cancelled orders never count as sold.
async fn build_stock_overview(
    db_pool: &PgPool,
    branch: &str,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Result<Vec<StockOverviewRow>, AppError> {
    let product_rows = sqlx::query_as::<_, (i64, String, String)>(
        "SELECT id, name, unit FROM products WHERE is_active = TRUE ORDER BY name ASC"
    )
    .fetch_all(db_pool)
    .await?;

    let products: Vec<StockProduct> = product_rows
        .into_iter()
        .map(|(product_id, name, unit)| StockProduct { product_id, name, unit })
        .collect();

    let declared_rows = sqlx::query_as::<_, (i64, i32)>(
        "SELECT product_id, quantity FROM branch_stock WHERE branch = $1"
    )
    .bind(branch)
    .fetch_all(db_pool)
    .await?;

    let declared: HashMap<i64, i64> = declared_rows
        .into_iter()
        .map(|(product_id, quantity)| (product_id, quantity as i64))
        .collect();

    let mut sold_sql = String::from(
        "SELECT oli.product_id, oli.quantity
         FROM order_line_items oli
         JOIN orders o ON oli.order_id = o.id
         WHERE o.branch = $1 AND o.status <> 'cancelled'",
    );
    let mut n = 1u32;
    if start_date.is_some() {
        n += 1;
        sold_sql.push_str(&format!(" AND o.created_at::date >= ${n}"));
    }
    if end_date.is_some() {
        n += 1;
        sold_sql.push_str(&format!(" AND o.created_at::date <= ${n}"));
    }

    let mut sold_query = sqlx::query_as::<_, (i64, i32)>(&sold_sql).bind(branch);
    if let Some(d) = start_date {
        sold_query = sold_query.bind(d);
    }
    if let Some(d) = end_date {
        sold_query = sold_query.bind(d);
    }

    let sold_lines: Vec<SoldLine> = sold_query
        .fetch_all(db_pool)
        .await?
        .into_iter()
        .map(|(product_id, quantity)| SoldLine { product_id, quantity: quantity as i64 })
        .collect();

    let sold = aggregates::sold_quantities(&sold_lines);
    Ok(aggregates::stock_overview(&products, &declared, &sold))
}
