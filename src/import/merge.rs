//! Folding raw contribution rows into merged budget lines.

use std::collections::HashMap;

use crate::core::{BusinessDivision, CostType, EntryKey};

use super::{RowKind, SheetRow};

/// One logical budget line assembled from possibly several raw rows: one row
/// supplies the budget amount, another the actual amount.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedEntry {
    pub department: String,
    pub account_category: String,
    pub month: u32,
    pub year: i32,
    pub project_name: String,
    pub calculation_basis: String,
    pub is_within_budget: bool,
    pub business_division: BusinessDivision,
    pub cost_type: CostType,
    pub budget_amount: f64,
    pub actual_amount: f64,
}

impl MergedEntry {
    fn seed(row: &SheetRow) -> Self {
        Self {
            department: row.department.clone(),
            account_category: row.account_category.clone(),
            month: row.month,
            year: row.year,
            project_name: row.project_name.clone(),
            calculation_basis: row.calculation_basis.clone(),
            is_within_budget: row.is_within_budget,
            business_division: row.business_division,
            cost_type: row.cost_type,
            budget_amount: 0.0,
            actual_amount: 0.0,
        }
    }

    pub fn key(&self) -> EntryKey {
        EntryKey {
            department: self.department.clone(),
            account_category: self.account_category.clone(),
            month: self.month,
            year: self.year,
            project_name: self.project_name.clone(),
        }
    }
}

/// Folds rows into merged entries keyed by the composite identity, preserving
/// first-seen order.
///
/// Descriptive fields come from the first row seen for a key; each amount
/// kind is last-write-wins within a key. A duplicate budget-type row for the
/// same key silently replaces the earlier one, which makes re-imports
/// idempotent.
pub fn merge_rows(rows: impl IntoIterator<Item = SheetRow>) -> Vec<MergedEntry> {
    let mut positions: HashMap<EntryKey, usize> = HashMap::new();
    let mut merged: Vec<MergedEntry> = Vec::new();

    for row in rows {
        let key = EntryKey {
            department: row.department.clone(),
            account_category: row.account_category.clone(),
            month: row.month,
            year: row.year,
            project_name: row.project_name.clone(),
        };
        let index = *positions.entry(key).or_insert_with(|| {
            merged.push(MergedEntry::seed(&row));
            merged.len() - 1
        });
        match row.kind {
            RowKind::Budget => merged[index].budget_amount = row.amount,
            RowKind::Actual => merged[index].actual_amount = row.amount,
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(kind: RowKind, amount: f64) -> SheetRow {
        SheetRow {
            department: "dx".into(),
            account_category: "fees".into(),
            month: 1,
            year: 2025,
            kind,
            amount,
            is_within_budget: true,
            business_division: BusinessDivision::All,
            cost_type: CostType::Variable,
            project_name: "proj".into(),
            calculation_basis: "basis".into(),
        }
    }

    #[test]
    fn budget_and_actual_rows_fold_into_one_entry() {
        let merged = merge_rows([row(RowKind::Budget, 1000.0), row(RowKind::Actual, 400.0)]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].budget_amount, 1000.0);
        assert_eq!(merged[0].actual_amount, 400.0);
    }

    #[test]
    fn duplicate_kind_is_last_write_wins() {
        let merged = merge_rows([row(RowKind::Budget, 1000.0), row(RowKind::Budget, 2000.0)]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].budget_amount, 2000.0);
    }

    #[test]
    fn descriptive_fields_are_first_seen_wins() {
        let mut second = row(RowKind::Actual, 400.0);
        second.calculation_basis = "different".into();
        second.business_division = BusinessDivision::Kids;
        let merged = merge_rows([row(RowKind::Budget, 1000.0), second]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].calculation_basis, "basis");
        assert_eq!(merged[0].business_division, BusinessDivision::All);
    }

    #[test]
    fn distinct_projects_stay_separate() {
        let mut other = row(RowKind::Budget, 500.0);
        other.project_name = "other".into();
        let merged = merge_rows([row(RowKind::Budget, 1000.0), other]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].project_name, "proj");
        assert_eq!(merged[1].project_name, "other");
    }

    #[test]
    fn merging_twice_yields_the_same_entries() {
        let rows = vec![row(RowKind::Budget, 1000.0), row(RowKind::Actual, 400.0)];
        let once = merge_rows(rows.clone());
        let twice = merge_rows(rows.iter().cloned().chain(rows.clone()));
        assert_eq!(once, twice);
    }
}
