//! Persisted row layout shared by the store, the exports and the template.
//!
//! The file holds one row per budget-kind or actual-kind contribution, not
//! one row per entry; loading merges the two kinds back together by the
//! composite key.

use crate::core::BudgetEntry;

/// Canonical column order of the persisted file. Ingestion additionally
/// accepts the source-locale header aliases for each column.
pub const COLUMNS: [&str; 11] = [
    "department",
    "accountCategory",
    "month",
    "year",
    "type",
    "amount",
    "isWithinBudget",
    "businessDivision",
    "projectName",
    "calculationBasis",
    "costType",
];

pub const TYPE_BUDGET: &str = "budget";
pub const TYPE_ACTUAL: &str = "actual";

pub fn header_row() -> Vec<String> {
    COLUMNS.iter().map(|c| c.to_string()).collect()
}

fn contribution_row(entry: &BudgetEntry, kind: &str, amount: f64) -> Vec<String> {
    vec![
        entry.department.clone(),
        entry.account_category.clone(),
        entry.month.to_string(),
        entry.year.to_string(),
        kind.to_string(),
        amount.to_string(),
        entry.is_within_budget.to_string(),
        entry.business_division.to_string(),
        entry.project_name.clone(),
        entry.calculation_basis.clone(),
        entry.cost_type.to_string(),
    ]
}

/// Splits an entry back into its contribution rows. Zero amounts produce no
/// row, mirroring how the source files carry only the sides that exist.
pub fn entry_rows(entry: &BudgetEntry) -> Vec<Vec<String>> {
    let mut rows = Vec::with_capacity(2);
    if entry.budget_amount > 0.0 {
        rows.push(contribution_row(entry, TYPE_BUDGET, entry.budget_amount));
    }
    if entry.actual_amount > 0.0 {
        rows.push(contribution_row(entry, TYPE_ACTUAL, entry.actual_amount));
    }
    rows
}

pub fn sheet_rows<'a>(entries: impl IntoIterator<Item = &'a BudgetEntry>) -> Vec<Vec<String>> {
    let mut rows = vec![header_row()];
    for entry in entries {
        rows.extend(entry_rows(entry));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BusinessDivision, CostType};

    fn entry(budget: f64, actual: f64) -> BudgetEntry {
        BudgetEntry {
            id: "e1".into(),
            department: "dx".into(),
            account_category: "fees".into(),
            month: 3,
            year: 2025,
            budget_amount: budget,
            actual_amount: actual,
            execution_rate: 0.0,
            is_within_budget: true,
            business_division: BusinessDivision::All,
            project_name: "proj".into(),
            calculation_basis: "basis".into(),
            cost_type: CostType::Variable,
        }
    }

    #[test]
    fn entry_with_both_amounts_becomes_two_rows() {
        let rows = entry_rows(&entry(1000.0, 500.0));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][4], TYPE_BUDGET);
        assert_eq!(rows[0][5], "1000");
        assert_eq!(rows[1][4], TYPE_ACTUAL);
        assert_eq!(rows[1][5], "500");
    }

    #[test]
    fn zero_amounts_produce_no_rows() {
        assert!(entry_rows(&entry(0.0, 0.0)).is_empty());
        assert_eq!(entry_rows(&entry(1000.0, 0.0)).len(), 1);
    }

    #[test]
    fn rows_match_column_count() {
        for row in entry_rows(&entry(1.0, 1.0)) {
            assert_eq!(row.len(), COLUMNS.len());
        }
    }
}
