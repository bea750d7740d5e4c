// src/aggregates.rs
//
// In-memory aggregation passes over rows fetched from the store: order
// totals from line items, per-branch stock consumption, and the financial
// summary buckets. Handlers fetch, these functions fold.

use std::collections::HashMap;

/// Stored vs computed totals within this distance are considered equal.
/// Keeps float accumulation noise from triggering correction writes.
pub const TOTAL_TOLERANCE: f64 = 0.01;

pub struct LineItemAmounts {
    pub quantity: i32,
    pub unit_price: f64,
}

/// Authoritative order total: sum of quantity x unit price across the
/// line items. Accumulated at full precision; rounding is applied at
/// presentation time only. An order with zero items has total 0.
pub fn order_total(items: &[LineItemAmounts]) -> f64 {
    items
        .iter()
        .map(|item| item.quantity as f64 * item.unit_price)
        .sum()
}

/// Currency rounding (2 decimals) for display values.
pub fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn totals_diverge(stored: f64, computed: f64) -> bool {
    (stored - computed).abs() > TOTAL_TOLERANCE
}

/// Outstanding balance shown to the user. Floored at zero for display;
/// the stored figures are left untouched.
pub fn remaining_balance(total: f64, paid_amount: f64) -> f64 {
    (total - paid_amount).max(0.0)
}

// ==================== Stock Ledger ====================

pub struct StockProduct {
    pub product_id: i64,
    pub name: String,
    pub unit: String,
}

pub struct SoldLine {
    pub product_id: i64,
    pub quantity: i64,
}

#[derive(Debug, serde::Serialize)]
pub struct StockOverviewRow {
    pub product_id: i64,
    pub product_name: String,
    pub unit: String,
    pub initial_stock: i64,
    pub sold: i64,
    pub remaining: i64,
    pub oversold: bool,
}

/// Quantity consumed per product, summed across line items of qualifying
/// (non-cancelled) orders. Callers are responsible for excluding cancelled
/// orders before handing the lines in.
pub fn sold_quantities(lines: &[SoldLine]) -> HashMap<i64, i64> {
    let mut sold: HashMap<i64, i64> = HashMap::new();
    for line in lines {
        *sold.entry(line.product_id).or_insert(0) += line.quantity;
    }
    sold
}

/// One summary row per active product: declared stock minus consumption.
/// A product with no stock row counts as declared 0. Remaining may go
/// negative; that is surfaced via `oversold`, never blocked.
pub fn stock_overview(
    products: &[StockProduct],
    declared: &HashMap<i64, i64>,
    sold: &HashMap<i64, i64>,
) -> Vec<StockOverviewRow> {
    products
        .iter()
        .map(|p| {
            let initial = declared.get(&p.product_id).copied().unwrap_or(0);
            let sold_qty = sold.get(&p.product_id).copied().unwrap_or(0);
            let remaining = initial - sold_qty;
            StockOverviewRow {
                product_id: p.product_id,
                product_name: p.name.clone(),
                unit: p.unit.clone(),
                initial_stock: initial,
                sold: sold_qty,
                remaining,
                oversold: remaining < 0,
            }
        })
        .collect()
}

// ==================== Financial Summary ====================

/// An order as seen by the period aggregation.
pub struct OrderAmounts {
    pub total: f64,
    pub paid_amount: f64,
    pub status: String,
    pub payment_status: String,
}

/// An outstanding order from the global receivables set (status not
/// cancelled, payment_status not paid, no date restriction).
pub struct Receivable {
    pub total: f64,
    pub paid_amount: f64,
}

#[derive(Debug, Default, serde::Serialize)]
pub struct FinancialTotals {
    pub total_sales: f64,
    pub total_collected: f64,
    pub total_pending: f64,
    pub total_cancelled: f64,
}

/// Partition period orders into sales/collected/cancelled buckets and sum
/// what is currently owed across the receivables set. The four figures are
/// independent aggregates: pending is not bounded by the reporting window,
/// so sales - collected generally does not equal pending.
pub fn financial_summary(period: &[OrderAmounts], receivables: &[Receivable]) -> FinancialTotals {
    let mut totals = FinancialTotals::default();

    for order in period {
        if order.status == "cancelled" {
            totals.total_cancelled += order.total;
            continue;
        }
        totals.total_sales += order.total;
        // Trust the paid flag over a possibly-stale paid_amount.
        if order.payment_status == "paid" {
            totals.total_collected += order.total;
        } else {
            totals.total_collected += order.paid_amount;
        }
    }

    for r in receivables {
        totals.total_pending += (r.total - r.paid_amount).max(0.0);
    }

    totals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: i32, unit_price: f64) -> LineItemAmounts {
        LineItemAmounts { quantity, unit_price }
    }

    #[test]
    fn order_total_sums_quantity_times_price() {
        let items = vec![item(2, 10.0), item(1, 5.0)];
        assert_eq!(order_total(&items), 25.0);
    }

    #[test]
    fn order_total_of_empty_order_is_zero() {
        assert_eq!(order_total(&[]), 0.0);
    }

    #[test]
    fn rounding_applies_at_presentation_only() {
        let items = vec![item(3, 0.1), item(1, 0.035)];
        let total = order_total(&items);
        // Accumulated at full precision...
        assert!((total - 0.335).abs() < 1e-12);
        // ...rounded to currency precision for display.
        assert_eq!(round_currency(total), 0.34);
    }

    #[test]
    fn divergence_uses_cent_tolerance() {
        assert!(!totals_diverge(100.0, 100.005));
        assert!(!totals_diverge(100.0, 100.009));
        assert!(totals_diverge(100.0, 100.02));
        assert!(totals_diverge(100.0, 80.0));
    }

    #[test]
    fn remaining_balance_is_floored_for_display() {
        assert_eq!(remaining_balance(25.0, 10.0), 15.0);
        assert_eq!(remaining_balance(25.0, 25.0), 0.0);
        assert_eq!(remaining_balance(25.0, 30.0), 0.0);
    }

    #[test]
    fn payment_accumulation_scenario() {
        // Order of (2 x 10.00) + (1 x 5.00), paid in two installments.
        let total = order_total(&[item(2, 10.0), item(1, 5.0)]);
        assert_eq!(total, 25.0);

        let mut paid = 0.0;
        paid += 10.0;
        assert_eq!(paid, 10.0);
        assert_eq!(remaining_balance(total, paid), 15.0);

        paid += 15.0;
        assert_eq!(paid, 25.0);
        assert_eq!(remaining_balance(total, paid), 0.0);
    }

    fn stock_product(id: i64, name: &str) -> StockProduct {
        StockProduct {
            product_id: id,
            name: name.to_string(),
            unit: "pieza".to_string(),
        }
    }

    #[test]
    fn stock_overview_surfaces_oversell() {
        // Declared 5, two active orders consume 2 and 4; a cancelled order
        // for 1 never makes it into the sold lines.
        let products = vec![stock_product(1, "Concha")];
        let declared = HashMap::from([(1, 5)]);
        let sold = sold_quantities(&[
            SoldLine { product_id: 1, quantity: 2 },
            SoldLine { product_id: 1, quantity: 4 },
        ]);

        let overview = stock_overview(&products, &declared, &sold);
        assert_eq!(overview.len(), 1);
        assert_eq!(overview[0].initial_stock, 5);
        assert_eq!(overview[0].sold, 6);
        assert_eq!(overview[0].remaining, -1);
        assert!(overview[0].oversold);
    }

    #[test]
    fn stock_overview_defaults_missing_rows_to_zero() {
        let products = vec![stock_product(1, "Bolillo"), stock_product(2, "Cuernito")];
        // Product 2 has no declared stock row.
        let declared = HashMap::from([(1, 10)]);
        let sold = sold_quantities(&[SoldLine { product_id: 2, quantity: 3 }]);

        let overview = stock_overview(&products, &declared, &sold);
        assert_eq!(overview[0].initial_stock, 10);
        assert_eq!(overview[0].sold, 0);
        assert_eq!(overview[0].remaining, 10);
        assert_eq!(overview[1].initial_stock, 0);
        assert_eq!(overview[1].sold, 3);
        assert_eq!(overview[1].remaining, -3);
        assert!(overview[1].oversold);
    }

    #[test]
    fn stock_overview_invariant_remaining_equals_initial_minus_sold() {
        let products: Vec<StockProduct> =
            (1..=4).map(|i| stock_product(i, "P")).collect();
        let declared = HashMap::from([(1, 7), (2, 0), (4, 12)]);
        let sold = sold_quantities(&[
            SoldLine { product_id: 1, quantity: 3 },
            SoldLine { product_id: 2, quantity: 5 },
            SoldLine { product_id: 3, quantity: 1 },
        ]);

        for row in stock_overview(&products, &declared, &sold) {
            assert_eq!(row.remaining, row.initial_stock - row.sold);
        }
    }

    fn order(total: f64, paid: f64, status: &str, payment_status: &str) -> OrderAmounts {
        OrderAmounts {
            total,
            paid_amount: paid,
            status: status.to_string(),
            payment_status: payment_status.to_string(),
        }
    }

    #[test]
    fn financial_summary_buckets() {
        let period = vec![
            order(50.0, 20.0, "pending", "abono"),
            order(30.0, 0.0, "cancelled", "pending"),
        ];
        let receivables = vec![
            Receivable { total: 50.0, paid_amount: 20.0 },
            Receivable { total: 100.0, paid_amount: 0.0 },
        ];

        let totals = financial_summary(&period, &receivables);
        assert_eq!(totals.total_sales, 50.0);
        assert_eq!(totals.total_collected, 20.0);
        assert_eq!(totals.total_cancelled, 30.0);
        // Pending covers all outstanding orders branch-wide, not just the period.
        assert_eq!(totals.total_pending, 130.0);
    }

    #[test]
    fn collected_trusts_paid_flag_over_stale_amount() {
        let period = vec![order(50.0, 10.0, "delivered", "paid")];
        let totals = financial_summary(&period, &[]);
        assert_eq!(totals.total_collected, 50.0);
    }

    #[test]
    fn pending_is_unaffected_by_the_period_window() {
        let receivables = vec![
            Receivable { total: 80.0, paid_amount: 30.0 },
            Receivable { total: 20.0, paid_amount: 25.0 }, // overpaid, clamped to 0
        ];

        let narrow = financial_summary(&[order(10.0, 10.0, "delivered", "paid")], &receivables);
        let wide = financial_summary(
            &[
                order(10.0, 10.0, "delivered", "paid"),
                order(200.0, 0.0, "pending", "pending"),
                order(60.0, 0.0, "cancelled", "pending"),
            ],
            &receivables,
        );

        assert_eq!(narrow.total_pending, 50.0);
        assert_eq!(wide.total_pending, narrow.total_pending);
    }
}
