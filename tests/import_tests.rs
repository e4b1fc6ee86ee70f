use budget_ledger::config::LedgerConfig;
use budget_ledger::import::merge::merge_rows;
use budget_ledger::import::ingest;
use budget_ledger::sheet::MemorySheet;
use budget_ledger::store::LedgerStore;

const DEPT: &str = "서비스혁신 Core";
const ACCOUNT: &str = "광고선전비(이벤트)";

fn korean_header() -> Vec<String> {
    ["부서", "계정과목", "월", "연도", "구분", "금액", "프로젝트명/세부항목", "산정근거/집행내역"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn korean_row(kind: &str, month: &str, amount: &str, project: &str) -> Vec<String> {
    vec![
        DEPT.to_string(),
        ACCOUNT.to_string(),
        month.to_string(),
        "2025".to_string(),
        kind.to_string(),
        amount.to_string(),
        project.to_string(),
        "집행 내역".to_string(),
    ]
}

#[test]
fn korean_headers_and_tokens_are_ingested() {
    let config = LedgerConfig::default();
    let rows = vec![
        korean_header(),
        korean_row("계획", "3", "1,000,000", "봄 이벤트"),
        korean_row("실제", "3", "350,000", "봄 이벤트"),
    ];
    let outcomes = ingest(&rows, &config);
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.is_valid()));

    let merged = merge_rows(outcomes.into_iter().filter_map(|o| o.row));
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].budget_amount, 1_000_000.0);
    assert_eq!(merged[0].actual_amount, 350_000.0);
    assert_eq!(merged[0].project_name, "봄 이벤트");
}

#[test]
fn missing_project_name_names_the_field() {
    let config = LedgerConfig::default();
    let rows = vec![
        korean_header(),
        korean_row("계획", "3", "1000", ""),
    ];
    let outcomes = ingest(&rows, &config);
    assert_eq!(outcomes.len(), 1);
    assert!(!outcomes[0].is_valid());
    assert!(
        outcomes[0]
            .errors
            .iter()
            .any(|e| e.contains("projectName is empty")),
        "errors were: {:?}",
        outcomes[0].errors
    );
}

#[test]
fn every_violation_in_a_row_is_reported() {
    let config = LedgerConfig::default();
    let mut row = korean_row("예측", "14", "abc", "이벤트");
    row[0] = String::new(); // department
    let outcomes = ingest(&vec![korean_header(), row], &config);
    let errors = &outcomes[0].errors;
    assert!(errors.iter().any(|e| e.contains("department is empty")));
    assert!(errors.iter().any(|e| e.contains("invalid type")));
    assert!(errors.iter().any(|e| e.contains("month")));
    assert!(errors.iter().any(|e| e.contains("amount")));
}

#[test]
fn blank_rows_are_skipped_without_an_outcome() {
    let config = LedgerConfig::default();
    let rows = vec![
        korean_header(),
        vec![String::new(); 8],
        korean_row("계획", "3", "1000", "이벤트"),
    ];
    let outcomes = ingest(&rows, &config);
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].is_valid());
}

#[test]
fn missing_year_defaults_to_the_configured_year() {
    let config = LedgerConfig::default();
    let mut row = korean_row("계획", "3", "1000", "이벤트");
    row[3] = String::new(); // year
    let outcomes = ingest(&vec![korean_header(), row], &config);
    let parsed = outcomes[0].row.as_ref().unwrap();
    assert_eq!(parsed.year, config.default_year);
}

#[test]
fn out_of_band_year_is_rejected() {
    let config = LedgerConfig::default();
    let mut row = korean_row("계획", "3", "1000", "이벤트");
    row[3] = "1999".to_string();
    let outcomes = ingest(&vec![korean_header(), row], &config);
    assert!(!outcomes[0].is_valid());
    assert!(outcomes[0].errors.iter().any(|e| e.contains("year")));
}

#[test]
fn line_numbers_count_data_rows_from_one() {
    let config = LedgerConfig::default();
    let rows = vec![
        korean_header(),
        korean_row("계획", "3", "1000", "이벤트"),
        korean_row("계획", "4", "bad", "이벤트"),
    ];
    let outcomes = ingest(&rows, &config);
    assert_eq!(outcomes[0].line, 1);
    assert_eq!(outcomes[1].line, 2);
    assert!(!outcomes[1].is_valid());
}

#[test]
fn bulk_import_reports_counts_and_failures() {
    let store = LedgerStore::open(MemorySheet::new(), LedgerConfig::default());
    let rows = vec![
        korean_header(),
        korean_row("계획", "3", "1,000,000", "봄 이벤트"),
        korean_row("실제", "3", "350,000", "봄 이벤트"),
        korean_row("계획", "15", "500", "깨진 행"),
    ];
    let report = store.import_rows(&rows);
    assert_eq!(report.total, 3);
    assert_eq!(report.valid, 2);
    assert_eq!(report.invalid, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].line, 3);
    // The two valid rows merge into one stored entry.
    assert_eq!(report.entries.len(), 1);
    assert_eq!(store.len(), 1);
    assert_eq!(report.entries[0].execution_rate, 35.0);
}

#[test]
fn reimporting_the_same_rows_changes_nothing() {
    let store = LedgerStore::open(MemorySheet::new(), LedgerConfig::default());
    let rows = vec![
        korean_header(),
        korean_row("계획", "3", "1,000,000", "봄 이벤트"),
        korean_row("실제", "3", "350,000", "봄 이벤트"),
    ];
    store.import_rows(&rows);
    let before = store.get_all();
    store.import_rows(&rows);
    let after = store.get_all();

    assert_eq!(before.len(), after.len());
    assert_eq!(before[0].budget_amount, after[0].budget_amount);
    assert_eq!(before[0].actual_amount, after[0].actual_amount);
}
