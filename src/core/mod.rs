//! Core data model for the budget ledger.

pub mod aggregation;
pub mod calculations;
pub mod query;

use serde::{Deserialize, Serialize};

/// Business division an entry belongs to. `All` is the catch-all used when a
/// source row does not say.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusinessDivision {
    Kids,
    Elementary,
    Middle,
    #[default]
    All,
}

impl BusinessDivision {
    /// Parses a cell token, accepting both the canonical English names and
    /// the source-locale (Korean) ones.
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "kids" | "키즈" => Some(Self::Kids),
            "elementary" | "초등" => Some(Self::Elementary),
            "middle" | "중등" => Some(Self::Middle),
            "all" | "전체" => Some(Self::All),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kids => "kids",
            Self::Elementary => "elementary",
            Self::Middle => "middle",
            Self::All => "all",
        }
    }
}

impl std::fmt::Display for BusinessDivision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a line item is a fixed or variable cost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostType {
    Fixed,
    #[default]
    Variable,
}

impl CostType {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "fixed" | "고정비" => Some(Self::Fixed),
            "variable" | "변동비" => Some(Self::Variable),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Variable => "variable",
        }
    }
}

impl std::fmt::Display for CostType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One budget line: a department/account/month/year/project combination with
/// its planned and executed amounts.
///
/// `execution_rate` is always derived from the two amounts; the store
/// recomputes it on every mutation and callers cannot set it directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetEntry {
    /// Store-assigned unique identifier, never reused.
    pub id: String,
    pub department: String,
    pub account_category: String,
    /// Month in `[1, 12]`.
    pub month: u32,
    pub year: i32,
    pub budget_amount: f64,
    pub actual_amount: f64,
    /// `actual / budget * 100`, or 0 when the budget is 0. Derived.
    pub execution_rate: f64,
    /// `false` marks an out-of-budget (settlement-only) line item.
    pub is_within_budget: bool,
    pub business_division: BusinessDivision,
    /// Required; part of the composite identity key.
    pub project_name: String,
    /// Required justification/description for the amounts.
    pub calculation_basis: String,
    pub cost_type: CostType,
}

impl BudgetEntry {
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

/// Composite identity of a budget line across raw sheet rows.
///
/// Kept as a structured key rather than a delimiter-joined string so that
/// identity fields containing arbitrary text can never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryKey {
    pub department: String,
    pub account_category: String,
    pub month: u32,
    pub year: i32,
    pub project_name: String,
}

impl std::fmt::Display for EntryKey {
    // For logging only; lookups always use the structured key.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}|{}",
            self.department, self.account_category, self.month, self.year, self.project_name
        )
    }
}

fn default_true() -> bool {
    true
}

/// Payload for creating an entry. Carries no `id` and no `execution_rate`;
/// both are owned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryDraft {
    pub department: String,
    pub account_category: String,
    pub month: u32,
    pub year: i32,
    #[serde(default)]
    pub budget_amount: f64,
    #[serde(default)]
    pub actual_amount: f64,
    #[serde(default = "default_true")]
    pub is_within_budget: bool,
    #[serde(default)]
    pub business_division: BusinessDivision,
    pub project_name: String,
    pub calculation_basis: String,
    #[serde(default)]
    pub cost_type: CostType,
}

/// Partial update for an existing entry. Absent fields keep their value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPatch {
    pub department: Option<String>,
    pub account_category: Option<String>,
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub budget_amount: Option<f64>,
    pub actual_amount: Option<f64>,
    pub is_within_budget: Option<bool>,
    pub business_division: Option<BusinessDivision>,
    pub project_name: Option<String>,
    pub calculation_basis: Option<String>,
    pub cost_type: Option<CostType>,
}
