use serde::Serialize;
use chrono::NaiveDate;

use crate::aggregates::StockOverviewRow;

#[derive(Serialize)]
pub struct FinancialSummaryResponse {
    pub branch: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_sales: f64,
    pub total_collected: f64,
    /// Outstanding balances branch-wide, not limited to the period.
    pub total_pending: f64,
    pub total_cancelled: f64,
    pub stock_overview: Vec<StockOverviewRow>,
}

#[derive(Serialize)]
pub struct StockOverviewResponse {
    pub branch: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub rows: Vec<StockOverviewRow>,
}
