// src/reconcile.rs
//
// Self-healing pass over order totals. Whenever a page of orders has been
// served, this recomputes each total from the line items and writes back
// any stored value that drifted. Best-effort and idempotent: the computed
// value is deterministic from current line items, so concurrent viewers
// running the same pass converge on the same result.

use std::collections::HashMap;

use sqlx::PgPool;

use crate::aggregates::{order_total, totals_diverge, LineItemAmounts};

/// Small delay before the pass runs so it never competes with serving the
/// list request that triggered it.
const RECONCILE_DELAY_MS: u64 = 1000;

#[derive(Debug, Clone)]
pub struct StoredTotal {
    pub order_id: i64,
    pub total: f64,
}

/// Recompute totals for the given orders from their line item rows
/// (order_id, quantity, unit_price). Orders with no rows compute to 0.
fn computed_totals(orders: &[StoredTotal], item_rows: &[(i64, i32, f64)]) -> HashMap<i64, f64> {
    let mut grouped: HashMap<i64, Vec<LineItemAmounts>> =
        orders.iter().map(|o| (o.order_id, Vec::new())).collect();

    for &(order_id, quantity, unit_price) in item_rows {
        if let Some(items) = grouped.get_mut(&order_id) {
            items.push(LineItemAmounts { quantity, unit_price });
        }
    }

    grouped
        .into_iter()
        .map(|(order_id, items)| (order_id, order_total(&items)))
        .collect()
}

/// Orders whose stored total drifted beyond the tolerance, paired with the
/// corrected value. Running this again on corrected inputs yields nothing.
fn corrections(orders: &[StoredTotal], computed: &HashMap<i64, f64>) -> Vec<(i64, f64)> {
    orders
        .iter()
        .filter_map(|o| {
            let real = computed.get(&o.order_id).copied().unwrap_or(0.0);
            totals_diverge(o.total, real).then_some((o.order_id, real))
        })
        .collect()
}

/// Fire-and-forget entry point used by the order list handler.
pub fn spawn(pool: &PgPool, orders: Vec<StoredTotal>) {
    if orders.is_empty() {
        return;
    }
    let pool = pool.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(RECONCILE_DELAY_MS)).await;
        reconcile_totals(&pool, &orders).await;
    });
}

async fn reconcile_totals(pool: &PgPool, orders: &[StoredTotal]) {
    let order_ids: Vec<i64> = orders.iter().map(|o| o.order_id).collect();

    // One batched fetch for the whole visible set.
    let item_rows = match sqlx::query_as::<_, (i64, i32, f64)>(
        "SELECT order_id, quantity, unit_price FROM order_line_items WHERE order_id = ANY($1)",
    )
    .bind(&order_ids)
    .fetch_all(pool)
    .await
    {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(error = %e, "Total reconciliation fetch failed");
            return;
        }
    };

    let computed = computed_totals(orders, &item_rows);
    let updates = corrections(orders, &computed);

    if updates.is_empty() {
        return;
    }

    let mut corrected = 0usize;
    for (order_id, total) in &updates {
        match sqlx::query("UPDATE orders SET total = $1 WHERE id = $2")
            .bind(total)
            .bind(order_id)
            .execute(pool)
            .await
        {
            Ok(_) => corrected += 1,
            Err(e) => {
                tracing::warn!(order_id, error = %e, "Total correction write failed");
            }
        }
    }

    tracing::info!(corrected, of = updates.len(), "Reconciled drifted order totals");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(order_id: i64, total: f64) -> StoredTotal {
        StoredTotal { order_id, total }
    }

    #[test]
    fn corrects_drifted_totals_only() {
        // Order 1 stored 100.00 but its two items sum to 80.00.
        let orders = vec![stored(1, 100.0), stored(2, 25.0)];
        let items = vec![(1, 2, 30.0), (1, 1, 20.0), (2, 2, 10.0), (2, 1, 5.0)];

        let computed = computed_totals(&orders, &items);
        let updates = corrections(&orders, &computed);
        assert_eq!(updates, vec![(1, 80.0)]);
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let orders = vec![stored(1, 100.0)];
        let items = vec![(1, 2, 40.0)];

        let computed = computed_totals(&orders, &items);
        let updates = corrections(&orders, &computed);
        assert_eq!(updates, vec![(1, 80.0)]);

        // Apply the corrections, then run again on the unchanged item set.
        let corrected: Vec<StoredTotal> = orders
            .iter()
            .map(|o| {
                let total = updates
                    .iter()
                    .find(|(id, _)| *id == o.order_id)
                    .map(|&(_, t)| t)
                    .unwrap_or(o.total);
                stored(o.order_id, total)
            })
            .collect();

        let computed = computed_totals(&corrected, &items);
        assert!(corrections(&corrected, &computed).is_empty());
    }

    #[test]
    fn order_without_items_computes_to_zero() {
        let orders = vec![stored(1, 15.0), stored(2, 0.0)];
        let computed = computed_totals(&orders, &[]);
        let updates = corrections(&orders, &computed);
        assert_eq!(updates, vec![(1, 0.0)]);
    }

    #[test]
    fn within_tolerance_totals_are_left_alone() {
        let orders = vec![stored(1, 80.005)];
        let items = vec![(1, 2, 40.0)];
        let computed = computed_totals(&orders, &items);
        assert!(corrections(&orders, &computed).is_empty());
    }
}
