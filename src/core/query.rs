//! Filtering of budget entries for the query surface.

use serde::{Deserialize, Serialize};

use super::BudgetEntry;

/// Optional, independently AND-combined predicates over the ledger.
///
/// Empty `departments`/`account_categories` vectors mean "no restriction",
/// not "match nothing". The month range is inclusive on both ends.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetFilter {
    #[serde(default)]
    pub start_month: Option<u32>,
    #[serde(default)]
    pub end_month: Option<u32>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub departments: Vec<String>,
    #[serde(default)]
    pub account_categories: Vec<String>,
}

impl BudgetFilter {
    pub fn matches(&self, entry: &BudgetEntry) -> bool {
        if let Some(start) = self.start_month {
            if entry.month < start {
                return false;
            }
        }
        if let Some(end) = self.end_month {
            if entry.month > end {
                return false;
            }
        }
        if let Some(year) = self.year {
            if entry.year != year {
                return false;
            }
        }
        if !self.departments.is_empty() && !self.departments.contains(&entry.department) {
            return false;
        }
        if !self.account_categories.is_empty()
            && !self.account_categories.contains(&entry.account_category)
        {
            return false;
        }
        true
    }

    pub fn filter<'a>(&self, entries: &'a [BudgetEntry]) -> Vec<&'a BudgetEntry> {
        entries.iter().filter(|e| self.matches(e)).collect()
    }
}
