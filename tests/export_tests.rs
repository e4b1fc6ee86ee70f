use budget_ledger::config::LedgerConfig;
use budget_ledger::core::EntryDraft;
use budget_ledger::export;
use budget_ledger::sheet::SheetStore;
use budget_ledger::sheet::file::CsvSheet;
use budget_ledger::store::LedgerStore;

const DEPT: &str = "플랫폼혁신 Core";
const ACCOUNT: &str = "통신비";

fn draft(month: u32, budget: f64, actual: f64, project: &str) -> EntryDraft {
    EntryDraft {
        department: DEPT.to_string(),
        account_category: ACCOUNT.to_string(),
        month,
        year: 2025,
        budget_amount: budget,
        actual_amount: actual,
        is_within_budget: true,
        business_division: Default::default(),
        project_name: project.to_string(),
        calculation_basis: "통신 요금".to_string(),
        cost_type: Default::default(),
    }
}

fn config_in(dir: &std::path::Path) -> LedgerConfig {
    let mut config = LedgerConfig::default();
    config.data_path = dir.join("budget.csv");
    config
}

#[test]
fn csv_file_round_trips_through_a_fresh_store() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());

    let store = LedgerStore::open(CsvSheet::new(), config.clone());
    store.create(draft(3, 1_000_000.0, 250_000.0, "회선 비용")).unwrap();
    store.create(draft(4, 500_000.0, 0.0, "신규 회선")).unwrap();

    let reopened = LedgerStore::open(CsvSheet::new(), config);
    assert_eq!(reopened.len(), 2);

    let before = store.get_all();
    let after = reopened.get_all();
    for (b, a) in before.iter().zip(&after) {
        assert_eq!(b.key(), a.key());
        assert_eq!(b.budget_amount, a.budget_amount);
        assert_eq!(b.actual_amount, a.actual_amount);
        assert_eq!(b.execution_rate, a.execution_rate);
    }
}

#[test]
fn csv_snapshot_can_be_reimported() {
    let dir = tempfile::tempdir().unwrap();
    let store = LedgerStore::open(CsvSheet::new(), config_in(dir.path()));
    store.create(draft(3, 1_000_000.0, 250_000.0, "회선 비용")).unwrap();

    let snapshot = export::csv_snapshot(&store.get_all()).unwrap();
    let path = dir.path().join("snapshot.csv");
    std::fs::write(&path, snapshot).unwrap();

    let rows = CsvSheet::new().read_rows(&path).unwrap();
    let target = LedgerStore::open(CsvSheet::new(), config_in(dir.path()));
    let report = target.import_rows(&rows);
    assert_eq!(report.invalid, 0);
    assert_eq!(report.entries.len(), 1);
    assert_eq!(report.entries[0].budget_amount, 1_000_000.0);
    assert_eq!(report.entries[0].actual_amount, 250_000.0);
}

#[test]
fn json_snapshot_carries_entries_and_vocabularies() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let store = LedgerStore::open(CsvSheet::new(), config.clone());
    store.create(draft(3, 1_000_000.0, 250_000.0, "회선 비용")).unwrap();

    let json = export::json_snapshot(&store.get_all(), &config).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["data"].as_array().unwrap().len(), 1);
    assert_eq!(value["data"][0]["department"], DEPT);
    assert_eq!(value["data"][0]["executionRate"], 25.0);
    assert_eq!(value["settlementMonth"], 9);
}

#[test]
fn template_is_importable_as_is() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let template = export::csv_template(&config).unwrap();
    let path = dir.path().join("template.csv");
    std::fs::write(&path, template).unwrap();

    let rows = CsvSheet::new().read_rows(&path).unwrap();
    let store = LedgerStore::open(CsvSheet::new(), config);
    let report = store.import_rows(&rows);
    assert_eq!(report.invalid, 0, "failures: {:?}", report.failures);
    // budget and actual example rows share one key
    assert_eq!(report.entries.len(), 1);
}
