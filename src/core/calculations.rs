//! Pure calculations over budget entries.
//!
//! All sums are plain linear folds over `f64`; no rounding is applied here so
//! every consumer (stats endpoint, aggregation, exports) sees bit-identical
//! figures.

use serde::{Deserialize, Serialize};

use super::BudgetEntry;

/// Execution rate as a percentage. A zero budget yields 0, not an error.
pub fn execution_rate(budget: f64, actual: f64) -> f64 {
    if budget > 0.0 { actual / budget * 100.0 } else { 0.0 }
}

pub fn execution_rate_decimal(budget: f64, actual: f64) -> f64 {
    if budget > 0.0 { actual / budget } else { 0.0 }
}

/// Actual spend for months after the settlement month is forced to zero:
/// unclosed months cannot show execution.
pub fn enforce_settlement_constraint(month: u32, settlement_month: u32, actual: f64) -> f64 {
    if month > settlement_month { 0.0 } else { actual }
}

pub fn total_budget(entries: &[BudgetEntry]) -> f64 {
    entries.iter().map(|e| e.budget_amount).sum()
}

pub fn total_actual(entries: &[BudgetEntry]) -> f64 {
    entries.iter().map(|e| e.actual_amount).sum()
}

pub fn settled_budget(entries: &[BudgetEntry], settlement_month: u32) -> f64 {
    entries
        .iter()
        .filter(|e| e.month <= settlement_month)
        .map(|e| e.budget_amount)
        .sum()
}

pub fn settled_actual(entries: &[BudgetEntry], settlement_month: u32) -> f64 {
    entries
        .iter()
        .filter(|e| e.month <= settlement_month)
        .map(|e| e.actual_amount)
        .sum()
}

pub fn future_budget(entries: &[BudgetEntry], settlement_month: u32) -> f64 {
    entries
        .iter()
        .filter(|e| e.month > settlement_month)
        .map(|e| e.budget_amount)
        .sum()
}

/// Derived statistics computed per query, never stored.
///
/// The three budget figures are deliberately MECE: `annual_total_budget` is
/// filter-independent (all months), `filtered_total_budget` covers the current
/// filter across all months in range, `settled_budget` narrows the filtered
/// set to settled months. They must never be conflated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetStats {
    pub annual_total_budget: f64,
    pub filtered_total_budget: f64,
    pub filtered_total_actual: f64,
    pub settled_budget: f64,
    pub settled_actual: f64,
    /// Settled actual over settled budget, as a percentage.
    pub execution_rate: f64,
    /// Settled actual plus unsettled-months budget scaled by the settled rate.
    pub projected_annual: f64,
    /// Annual total budget minus filtered total actual.
    pub remaining_budget: f64,
}

/// Computes the dashboard statistics for a filtered view.
///
/// `all` is the unfiltered entry set; it feeds only the filter-independent
/// `annual_total_budget` and the `remaining_budget` derived from it.
pub fn calculate_stats(
    filtered: &[BudgetEntry],
    settlement_month: u32,
    all: &[BudgetEntry],
) -> BudgetStats {
    let annual_total_budget = total_budget(all);
    let filtered_total_budget = total_budget(filtered);
    let filtered_total_actual = total_actual(filtered);
    let settled = settled_budget(filtered, settlement_month);
    let settled_spend = settled_actual(filtered, settlement_month);

    let rate = execution_rate(settled, settled_spend);
    let rate_decimal = execution_rate_decimal(settled, settled_spend);
    let projected_annual = settled_spend + future_budget(filtered, settlement_month) * rate_decimal;

    BudgetStats {
        annual_total_budget,
        filtered_total_budget,
        filtered_total_actual,
        settled_budget: settled,
        settled_actual: settled_spend,
        execution_rate: rate,
        projected_annual,
        remaining_budget: annual_total_budget - filtered_total_actual,
    }
}
