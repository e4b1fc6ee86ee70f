//! Grouped aggregation of budget entries for dashboards.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::BudgetEntry;
use super::calculations::{execution_rate, execution_rate_decimal};

/// Running sums accumulated per group before finalization.
#[derive(Debug, Default, Clone, Copy)]
struct GroupSums {
    total_budget: f64,
    total_actual: f64,
    settled_budget: f64,
    settled_actual: f64,
    future_budget: f64,
}

impl GroupSums {
    fn add(&mut self, entry: &BudgetEntry, settlement_month: u32) {
        self.total_budget += entry.budget_amount;
        self.total_actual += entry.actual_amount;
        if entry.month <= settlement_month {
            self.settled_budget += entry.budget_amount;
            self.settled_actual += entry.actual_amount;
        } else {
            self.future_budget += entry.budget_amount;
        }
    }
}

/// Finalized aggregation figures for one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregate {
    pub key: String,
    pub budget: f64,
    pub actual: f64,
    /// Settled actual over settled budget, as a percentage.
    pub execution_rate: f64,
    pub remaining: f64,
    pub projected_annual: f64,
    pub settled_budget: f64,
    pub settled_actual: f64,
}

/// Groups entries by `key_fn` and applies the calculation-engine formulas per
/// group. Groups come back in first-seen order, which downstream consumers
/// rely on for deterministic default ordering.
pub fn aggregate_by_key<'a, F>(
    entries: &'a [BudgetEntry],
    settlement_month: u32,
    key_fn: F,
) -> Vec<Aggregate>
where
    F: Fn(&'a BudgetEntry) -> &'a str,
{
    let mut sums: HashMap<&str, GroupSums> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();

    for entry in entries {
        let key = key_fn(entry);
        let group = sums.entry(key).or_insert_with(|| {
            order.push(key);
            GroupSums::default()
        });
        group.add(entry, settlement_month);
    }

    order
        .into_iter()
        .map(|key| {
            let g = sums[key];
            let rate_decimal = execution_rate_decimal(g.settled_budget, g.settled_actual);
            Aggregate {
                key: key.to_string(),
                budget: g.total_budget,
                actual: g.total_actual,
                execution_rate: execution_rate(g.settled_budget, g.settled_actual),
                remaining: g.total_budget - g.total_actual,
                projected_annual: g.settled_actual + g.future_budget * rate_decimal,
                settled_budget: g.settled_budget,
                settled_actual: g.settled_actual,
            }
        })
        .collect()
}

pub fn aggregate_by_department(entries: &[BudgetEntry], settlement_month: u32) -> Vec<Aggregate> {
    aggregate_by_key(entries, settlement_month, |e| e.department.as_str())
}

pub fn aggregate_by_account(entries: &[BudgetEntry], settlement_month: u32) -> Vec<Aggregate> {
    aggregate_by_key(entries, settlement_month, |e| e.account_category.as_str())
}

/// One point of the 12-month execution-rate series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthPoint {
    pub month: u32,
    /// Cumulative-to-date execution rate for settled months; `None` for
    /// projected months. Consumers must keep the distinction rather than
    /// substituting 0.
    pub execution_rate: Option<f64>,
    /// Linear target curve: `month / 12 * 100`.
    pub target_rate: f64,
    pub is_projected: bool,
}

/// Classifies each of the 12 months as settled or projected and computes the
/// cumulative execution rate for the settled ones.
pub fn aggregate_by_month(entries: &[BudgetEntry], settlement_month: u32) -> Vec<MonthPoint> {
    (1..=12u32)
        .map(|month| {
            let horizon = month.min(settlement_month);
            let cumulative_budget: f64 = entries
                .iter()
                .filter(|e| e.month <= horizon)
                .map(|e| e.budget_amount)
                .sum();
            let cumulative_actual: f64 = entries
                .iter()
                .filter(|e| e.month <= horizon)
                .map(|e| e.actual_amount)
                .sum();
            let is_projected = month > settlement_month;
            MonthPoint {
                month,
                execution_rate: if is_projected {
                    None
                } else {
                    Some(execution_rate(cumulative_budget, cumulative_actual))
                },
                target_rate: month as f64 / 12.0 * 100.0,
                is_projected,
            }
        })
        .collect()
}
