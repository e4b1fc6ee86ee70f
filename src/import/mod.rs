//! Row ingestion and validation for sheet data and bulk imports.
//!
//! Malformed *data* never raises an error here: every rule violation for a
//! row is collected into its [`RowOutcome`] so callers (import previews, the
//! store's load path) can show the full failure list. Only unreadable file
//! structure raises, and that happens at the sheet boundary, not here.
//!
//! Optional fields default silently (`isWithinBudget`, `businessDivision`,
//! `costType`) while required text fields reject the row. The asymmetry is
//! deliberate: the former are genuinely optional, the latter are required but
//! often omitted by legacy data and must not be invented.

pub mod merge;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::LedgerConfig;
use crate::core::{BusinessDivision, CostType};

/// Whether a raw row contributes a budget amount or an actual amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowKind {
    Budget,
    Actual,
}

impl RowKind {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "budget" | "plan" | "예산" | "계획" => Some(Self::Budget),
            "actual" | "execution" | "실제" | "집행" => Some(Self::Actual),
            _ => None,
        }
    }
}

/// A raw row that passed validation, ready for merging.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    pub department: String,
    pub account_category: String,
    pub month: u32,
    pub year: i32,
    pub kind: RowKind,
    pub amount: f64,
    pub is_within_budget: bool,
    pub business_division: BusinessDivision,
    pub cost_type: CostType,
    pub project_name: String,
    pub calculation_basis: String,
}

/// Validation result for one raw row. Invalid rows keep their full reason
/// list and are surfaced to the caller, never silently coerced.
#[derive(Debug, Clone)]
pub struct RowOutcome {
    /// 1-based line number in the source, header excluded.
    pub line: usize,
    pub row: Option<SheetRow>,
    pub errors: Vec<String>,
}

impl RowOutcome {
    pub fn is_valid(&self) -> bool {
        self.row.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Column {
    Department,
    AccountCategory,
    Month,
    Year,
    Kind,
    Amount,
    IsWithinBudget,
    BusinessDivision,
    ProjectName,
    CalculationBasis,
    CostType,
}

/// Accepted header tokens per column, compared after normalization
/// (whitespace stripped, lowercased). Covers the canonical English headers
/// and the source-locale ones found in legacy files.
const COLUMN_ALIASES: [(Column, &[&str]); 11] = [
    (Column::Department, &["department", "부서"]),
    (Column::AccountCategory, &["accountcategory", "계정과목"]),
    (Column::Month, &["month", "월"]),
    (Column::Year, &["year", "연도"]),
    (Column::Kind, &["type", "구분"]),
    (Column::Amount, &["amount", "금액"]),
    (Column::IsWithinBudget, &["iswithinbudget", "예산내/외"]),
    (Column::BusinessDivision, &["businessdivision", "사업구분"]),
    (
        Column::ProjectName,
        &["projectname", "프로젝트명", "프로젝트명/세부항목"],
    ),
    (
        Column::CalculationBasis,
        &["calculationbasis", "산정근거/집행내역"],
    ),
    (Column::CostType, &["costtype", "고정비/변동비"]),
];

fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

#[derive(Debug, Clone)]
pub struct HeaderMap {
    indices: HashMap<Column, usize>,
}

impl HeaderMap {
    /// Resolves a header row against the alias table. Unknown headers are
    /// ignored; missing required columns show up later as row failures.
    pub fn resolve(headers: &[String]) -> Self {
        let mut indices = HashMap::new();
        for (position, header) in headers.iter().enumerate() {
            let normalized = normalize_header(header);
            for (column, aliases) in COLUMN_ALIASES {
                if aliases.contains(&normalized.as_str()) {
                    indices.entry(column).or_insert(position);
                }
            }
        }
        Self { indices }
    }

    fn cell<'a>(&self, row: &'a [String], column: Column) -> &'a str {
        self.indices
            .get(&column)
            .and_then(|&i| row.get(i))
            .map(|s| s.as_str())
            .unwrap_or("")
    }
}

/// Thousands-separator-tolerant amount parse.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',' && *c != ' ').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_within_budget(raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        // Absent column defaults to in-budget.
        return true;
    }
    matches!(
        trimmed.to_lowercase().as_str(),
        "true" | "within" | "예산 내" | "예산내"
    )
}

/// Validates one data row. All rule violations are collected; the row is
/// usable only when the list is empty.
pub fn validate_row(
    values: &[String],
    headers: &HeaderMap,
    config: &LedgerConfig,
    line: usize,
) -> RowOutcome {
    let mut errors = Vec::new();

    let department = headers.cell(values, Column::Department).trim().to_string();
    let account_category = headers
        .cell(values, Column::AccountCategory)
        .trim()
        .to_string();
    let project_name = headers.cell(values, Column::ProjectName).trim().to_string();
    let calculation_basis = headers
        .cell(values, Column::CalculationBasis)
        .trim()
        .to_string();
    let kind_raw = headers.cell(values, Column::Kind).trim().to_string();

    if department.is_empty() {
        errors.push("department is empty".to_string());
    } else if !config.is_valid_department(&department) {
        errors.push(format!("unknown department: {department}"));
    }
    if account_category.is_empty() {
        errors.push("accountCategory is empty".to_string());
    } else if !config.is_valid_account_category(&account_category) {
        errors.push(format!("unknown accountCategory: {account_category}"));
    }
    if project_name.is_empty() {
        errors.push("projectName is empty".to_string());
    }
    if calculation_basis.is_empty() {
        errors.push("calculationBasis is empty".to_string());
    }

    let kind = if kind_raw.is_empty() {
        errors.push("type is empty (expected budget or actual)".to_string());
        None
    } else {
        let parsed = RowKind::parse(&kind_raw);
        if parsed.is_none() {
            errors.push(format!(
                "invalid type \"{kind_raw}\": expected one of budget, plan, actual, execution"
            ));
        }
        parsed
    };

    let month = match headers.cell(values, Column::Month).trim().parse::<u32>() {
        Ok(m) if (1..=12).contains(&m) => Some(m),
        Ok(m) => {
            errors.push(format!("month must be between 1 and 12, got {m}"));
            None
        }
        Err(_) => {
            errors.push(format!(
                "month is not a number: \"{}\"",
                headers.cell(values, Column::Month).trim()
            ));
            None
        }
    };

    let year_raw = headers.cell(values, Column::Year).trim();
    let year = if year_raw.is_empty() {
        Some(config.default_year)
    } else {
        match year_raw.parse::<i32>() {
            Ok(y) if config.is_valid_year(y) => Some(y),
            Ok(y) => {
                errors.push(format!(
                    "year must be between {} and {}, got {y}",
                    config.min_year, config.max_year
                ));
                None
            }
            Err(_) => {
                errors.push(format!("year is not a number: \"{year_raw}\""));
                None
            }
        }
    };

    let amount_raw = headers.cell(values, Column::Amount).trim();
    let amount = match parse_amount(amount_raw) {
        Some(v) if v >= 0.0 => Some(v),
        Some(v) => {
            errors.push(format!("amount must be non-negative, got {v}"));
            None
        }
        None => {
            errors.push(format!("amount is not a number: \"{amount_raw}\""));
            None
        }
    };

    let division_raw = headers.cell(values, Column::BusinessDivision).trim();
    let business_division = if division_raw.is_empty() {
        Some(BusinessDivision::default())
    } else {
        let parsed = BusinessDivision::parse(division_raw);
        if parsed.is_none() {
            errors.push(format!("unknown businessDivision: {division_raw}"));
        }
        parsed
    };

    let cost_type_raw = headers.cell(values, Column::CostType).trim();
    let cost_type = if cost_type_raw.is_empty() {
        Some(CostType::default())
    } else {
        let parsed = CostType::parse(cost_type_raw);
        if parsed.is_none() {
            errors.push(format!("unknown costType: {cost_type_raw}"));
        }
        parsed
    };

    let is_within_budget = parse_within_budget(headers.cell(values, Column::IsWithinBudget));

    if !errors.is_empty() {
        warn!(line, reasons = ?errors, "sheet row rejected");
        return RowOutcome {
            line,
            row: None,
            errors,
        };
    }

    RowOutcome {
        line,
        row: Some(SheetRow {
            department,
            account_category,
            // All unwraps are guarded by the empty error list above.
            month: month.expect("validated month"),
            year: year.expect("validated year"),
            kind: kind.expect("validated kind"),
            amount: amount.expect("validated amount"),
            is_within_budget,
            business_division: business_division.expect("validated division"),
            cost_type: cost_type.expect("validated cost type"),
            project_name,
            calculation_basis,
        }),
        errors,
    }
}

/// Validates a whole sheet: the first row is the header, the rest are data.
/// Blank rows are skipped without producing an outcome.
pub fn ingest(rows: &[Vec<String>], config: &LedgerConfig) -> Vec<RowOutcome> {
    let Some((header, data)) = rows.split_first() else {
        return Vec::new();
    };
    let headers = HeaderMap::resolve(header);
    data.iter()
        .enumerate()
        .filter(|(_, values)| values.iter().any(|cell| !cell.trim().is_empty()))
        .map(|(i, values)| validate_row(values, &headers, config, i + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_kind_matches_both_locales_case_insensitively() {
        assert_eq!(RowKind::parse("Budget"), Some(RowKind::Budget));
        assert_eq!(RowKind::parse("계획"), Some(RowKind::Budget));
        assert_eq!(RowKind::parse("실제"), Some(RowKind::Actual));
        assert_eq!(RowKind::parse("EXECUTION"), Some(RowKind::Actual));
        assert_eq!(RowKind::parse("forecast"), None);
    }

    #[test]
    fn amount_parse_tolerates_thousands_separators() {
        assert_eq!(parse_amount("1,000,000"), Some(1_000_000.0));
        assert_eq!(parse_amount(" 2 500 "), Some(2_500.0));
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount(""), None);
    }

    #[test]
    fn header_resolution_ignores_case_and_whitespace() {
        let headers = HeaderMap::resolve(&[
            "Account Category".to_string(),
            "DEPARTMENT".to_string(),
            "월".to_string(),
        ]);
        let row = vec!["fees".to_string(), "dx".to_string(), "3".to_string()];
        assert_eq!(headers.cell(&row, Column::AccountCategory), "fees");
        assert_eq!(headers.cell(&row, Column::Department), "dx");
        assert_eq!(headers.cell(&row, Column::Month), "3");
    }
}
