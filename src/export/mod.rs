//! CSV/JSON snapshots and the blank import template.
//!
//! All serializers reuse the persisted row layout so an exported file can be
//! re-imported without translation.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::LedgerConfig;
use crate::core::BudgetEntry;
use crate::sheet::layout;

#[derive(Debug)]
pub enum ExportError {
    Csv(String),
    Json(String),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Csv(msg) => write!(f, "csv export error: {msg}"),
            ExportError::Json(msg) => write!(f, "json export error: {msg}"),
        }
    }
}

impl std::error::Error for ExportError {}

fn rows_to_csv(rows: &[Vec<String>]) -> Result<String, ExportError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    for row in rows {
        wtr.write_record(row)
            .map_err(|e| ExportError::Csv(e.to_string()))?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| ExportError::Csv(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Csv(e.to_string()))
}

/// CSV snapshot of the given entries in the persisted file layout.
pub fn csv_snapshot(entries: &[BudgetEntry]) -> Result<String, ExportError> {
    rows_to_csv(&layout::sheet_rows(entries.iter()))
}

/// Metadata envelope around a JSON export.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonExport<'a> {
    export_date: DateTime<Utc>,
    settlement_month: u32,
    departments: &'a [String],
    account_categories: &'a [String],
    data: &'a [BudgetEntry],
}

/// JSON snapshot: the entries plus the vocabularies and settlement month
/// needed to interpret them.
pub fn json_snapshot(entries: &[BudgetEntry], config: &LedgerConfig) -> Result<String, ExportError> {
    let export = JsonExport {
        export_date: Utc::now(),
        settlement_month: config.settlement_month,
        departments: &config.departments,
        account_categories: &config.account_categories,
        data: entries,
    };
    serde_json::to_string_pretty(&export).map_err(|e| ExportError::Json(e.to_string()))
}

/// Blank import template: the expected headers plus two example rows drawn
/// from the configured vocabularies.
pub fn csv_template(config: &LedgerConfig) -> Result<String, ExportError> {
    let dept = |i: usize| {
        config
            .departments
            .get(i)
            .map(String::as_str)
            .unwrap_or("department")
            .to_string()
    };
    let category = |i: usize| {
        config
            .account_categories
            .get(i)
            .map(String::as_str)
            .unwrap_or("account category")
            .to_string()
    };
    let default_year = config.default_year.to_string();
    let rows = vec![
        layout::header_row(),
        vec![
            dept(0),
            category(0),
            "1".to_string(),
            default_year.clone(),
            layout::TYPE_BUDGET.to_string(),
            "10000000".to_string(),
            "true".to_string(),
            "all".to_string(),
            "온라인 광고".to_string(),
            "1월 온라인 광고 집행 계획".to_string(),
            "variable".to_string(),
        ],
        vec![
            dept(0),
            category(0),
            "1".to_string(),
            default_year,
            layout::TYPE_ACTUAL.to_string(),
            "8000000".to_string(),
            "true".to_string(),
            "all".to_string(),
            "온라인 광고".to_string(),
            "1월 온라인 광고 집행 내역".to_string(),
            "variable".to_string(),
        ],
    ];
    rows_to_csv(&rows)
}
