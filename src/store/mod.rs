//! The authoritative in-memory ledger, synchronized with a sheet file.
//!
//! The store owns the only mutable copy of the entry map. Loads replace the
//! map wholesale (swap, not patch), saves serialize the whole map back, and
//! a guard built from a settle deadline plus the last written mtime keeps the
//! file watcher from re-loading the store's own writes.

pub mod watch;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Instant, SystemTime};

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::LedgerConfig;
use crate::core::calculations::{enforce_settlement_constraint, execution_rate};
use crate::core::query::BudgetFilter;
use crate::core::{BudgetEntry, EntryDraft, EntryPatch};
use crate::import::merge::{MergedEntry, merge_rows};
use crate::import::{RowOutcome, ingest};
use crate::sheet::{SheetError, SheetStore, layout};

/// Errors surfaced by ledger operations.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerError {
    /// The request violated one or more documented validation rules.
    Validation(Vec<String>),
    /// The referenced entry id does not exist.
    NotFound(String),
    /// The sheet file could not be read or written.
    Persistence(SheetError),
    /// Anything unanticipated.
    Internal(String),
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerError::Validation(reasons) => {
                write!(f, "validation failed: {}", reasons.join("; "))
            }
            LedgerError::NotFound(id) => write!(f, "budget entry not found: {id}"),
            LedgerError::Persistence(e) => write!(f, "persistence error: {e}"),
            LedgerError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for LedgerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LedgerError::Persistence(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SheetError> for LedgerError {
    fn from(e: SheetError) -> Self {
        LedgerError::Persistence(e)
    }
}

/// Per-row failure inside a bulk import report.
#[derive(Debug, Clone, PartialEq)]
pub struct RowFailure {
    pub line: usize,
    pub errors: Vec<String>,
}

/// Outcome of a bulk import: counts, per-row failures and the merged entries
/// actually stored.
#[derive(Debug, Clone)]
pub struct ImportReport {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub failures: Vec<RowFailure>,
    pub entries: Vec<BudgetEntry>,
}

struct StoreState {
    entries: HashMap<String, BudgetEntry>,
    /// Entry ids in insertion order; keeps `get_all` deterministic.
    order: Vec<String>,
    path: PathBuf,
    /// Bumped on every save; loads log it for traceability.
    generation: u64,
    /// Watcher events before this instant are treated as echoes of our own
    /// write.
    settle_deadline: Option<Instant>,
    /// Mtime of the file right after our last write, when the backend can
    /// report one.
    last_written: Option<SystemTime>,
}

impl StoreState {
    fn ordered_entries(&self) -> Vec<BudgetEntry> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id))
            .cloned()
            .collect()
    }

    fn replace_all(&mut self, entries: Vec<BudgetEntry>) {
        self.entries.clear();
        self.order.clear();
        for entry in entries {
            self.order.push(entry.id.clone());
            self.entries.insert(entry.id.clone(), entry);
        }
    }

    fn insert(&mut self, entry: BudgetEntry) {
        if !self.entries.contains_key(&entry.id) {
            self.order.push(entry.id.clone());
        }
        self.entries.insert(entry.id.clone(), entry);
    }

    fn remove(&mut self, id: &str) -> Option<BudgetEntry> {
        let removed = self.entries.remove(id);
        if removed.is_some() {
            self.order.retain(|existing| existing != id);
        }
        removed
    }
}

/// The budget ledger store.
///
/// Thread-safe: the entry map and guard state live behind one mutex, the
/// sheet backend behind another, and no lock is held across a blocking wait.
pub struct LedgerStore<S: SheetStore> {
    state: Mutex<StoreState>,
    sheet: Mutex<S>,
    config: LedgerConfig,
}

impl<S: SheetStore> LedgerStore<S> {
    /// Opens the store over `sheet`, loading the configured file immediately.
    /// A missing or unreadable file leaves the store empty and logs a
    /// warning; the store stays operational either way.
    pub fn open(sheet: S, config: LedgerConfig) -> Self {
        let path = config.data_path.clone();
        let store = Self {
            state: Mutex::new(StoreState {
                entries: HashMap::new(),
                order: Vec::new(),
                path,
                generation: 0,
                settle_deadline: None,
                last_written: None,
            }),
            sheet: Mutex::new(sheet),
            config,
        };
        if let Err(e) = store.try_load() {
            warn!(error = %e, "initial sheet load failed, starting with an empty ledger");
        }
        store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn path(&self) -> PathBuf {
        self.state.lock().expect("state mutex poisoned").path.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("state mutex poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_all(&self) -> Vec<BudgetEntry> {
        self.state
            .lock()
            .expect("state mutex poisoned")
            .ordered_entries()
    }

    pub fn get_filtered(&self, filter: &BudgetFilter) -> Vec<BudgetEntry> {
        self.state
            .lock()
            .expect("state mutex poisoned")
            .ordered_entries()
            .into_iter()
            .filter(|e| filter.matches(e))
            .collect()
    }

    pub fn get_by_id(&self, id: &str) -> Option<BudgetEntry> {
        self.state
            .lock()
            .expect("state mutex poisoned")
            .entries
            .get(id)
            .cloned()
    }

    /// Creates one entry. The settlement constraint and the execution rate
    /// are recomputed here; the draft cannot carry its own rate.
    pub fn create(&self, draft: EntryDraft) -> Result<BudgetEntry, LedgerError> {
        let reasons = self.validate_draft(&draft);
        if !reasons.is_empty() {
            return Err(LedgerError::Validation(reasons));
        }
        let entry = self.materialize(draft);
        self.state
            .lock()
            .expect("state mutex poisoned")
            .insert(entry.clone());
        self.persist();
        Ok(entry)
    }

    /// Creates a batch of entries with a single save at the end. The whole
    /// batch is validated up front and rejected as one if any draft fails.
    pub fn create_many(&self, drafts: Vec<EntryDraft>) -> Result<Vec<BudgetEntry>, LedgerError> {
        let mut reasons = Vec::new();
        for (i, draft) in drafts.iter().enumerate() {
            for reason in self.validate_draft(draft) {
                reasons.push(format!("entry {}: {reason}", i + 1));
            }
        }
        if !reasons.is_empty() {
            return Err(LedgerError::Validation(reasons));
        }
        let entries: Vec<BudgetEntry> = drafts.into_iter().map(|d| self.materialize(d)).collect();
        {
            let mut state = self.state.lock().expect("state mutex poisoned");
            for entry in &entries {
                state.insert(entry.clone());
            }
        }
        self.persist();
        Ok(entries)
    }

    /// Bulk-imports raw sheet rows (header row first). Valid rows are merged
    /// by composite key and stored; invalid rows are dropped but reported
    /// with their full reason lists. An imported line whose key matches an
    /// existing entry replaces it, keeping its id, so re-imports are
    /// idempotent.
    pub fn import_rows(&self, rows: &[Vec<String>]) -> ImportReport {
        let outcomes = ingest(rows, &self.config);
        let total = outcomes.len();
        let mut failures = Vec::new();
        let mut valid_rows = Vec::new();
        for outcome in outcomes {
            match outcome {
                RowOutcome { row: Some(row), .. } => valid_rows.push(row),
                RowOutcome { line, errors, .. } => failures.push(RowFailure { line, errors }),
            }
        }
        let valid = valid_rows.len();

        let mut entries: Vec<BudgetEntry> = merge_rows(valid_rows)
            .into_iter()
            .map(|m| self.entry_from_merged(m))
            .collect();
        {
            let mut state = self.state.lock().expect("state mutex poisoned");
            for entry in &mut entries {
                let existing = state
                    .entries
                    .values()
                    .find(|e| e.key() == entry.key())
                    .map(|e| e.id.clone());
                if let Some(id) = existing {
                    entry.id = id;
                }
                state.insert(entry.clone());
            }
        }
        if !entries.is_empty() {
            self.persist();
        }
        info!(
            total,
            valid,
            invalid = failures.len(),
            merged = entries.len(),
            "bulk import finished"
        );
        ImportReport {
            total,
            valid,
            invalid: failures.len(),
            failures,
            entries,
        }
    }

    /// Applies a partial update, then re-enforces the settlement constraint
    /// and recomputes the execution rate before storing.
    pub fn update(&self, id: &str, patch: EntryPatch) -> Result<BudgetEntry, LedgerError> {
        let updated = {
            let mut state = self.state.lock().expect("state mutex poisoned");
            let existing = state
                .entries
                .get(id)
                .cloned()
                .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;
            let mut next = existing;
            if let Some(v) = patch.department {
                next.department = v;
            }
            if let Some(v) = patch.account_category {
                next.account_category = v;
            }
            if let Some(v) = patch.month {
                next.month = v;
            }
            if let Some(v) = patch.year {
                next.year = v;
            }
            if let Some(v) = patch.budget_amount {
                next.budget_amount = v;
            }
            if let Some(v) = patch.actual_amount {
                next.actual_amount = v;
            }
            if let Some(v) = patch.is_within_budget {
                next.is_within_budget = v;
            }
            if let Some(v) = patch.business_division {
                next.business_division = v;
            }
            if let Some(v) = patch.project_name {
                next.project_name = v;
            }
            if let Some(v) = patch.calculation_basis {
                next.calculation_basis = v;
            }
            if let Some(v) = patch.cost_type {
                next.cost_type = v;
            }

            let reasons = self.validate_entry_fields(&next);
            if !reasons.is_empty() {
                return Err(LedgerError::Validation(reasons));
            }

            next.actual_amount = enforce_settlement_constraint(
                next.month,
                self.config.settlement_month,
                next.actual_amount,
            );
            next.execution_rate = execution_rate(next.budget_amount, next.actual_amount);
            state.insert(next.clone());
            next
        };
        self.persist();
        Ok(updated)
    }

    pub fn delete(&self, id: &str) -> Result<(), LedgerError> {
        let removed = self
            .state
            .lock()
            .expect("state mutex poisoned")
            .remove(id)
            .is_some();
        if !removed {
            return Err(LedgerError::NotFound(id.to_string()));
        }
        self.persist();
        Ok(())
    }

    /// Drops every entry and writes a header-only file.
    pub fn clear(&self) {
        {
            let mut state = self.state.lock().expect("state mutex poisoned");
            state.entries.clear();
            state.order.clear();
        }
        self.persist();
        info!("all budget entries cleared");
    }

    /// Reloads from the sheet file, optionally re-pointing the store at a new
    /// path first. Returns the entry count after the reload.
    pub fn reload(&self, path: Option<PathBuf>) -> Result<usize, LedgerError> {
        if let Some(path) = path {
            self.state.lock().expect("state mutex poisoned").path = path;
        }
        self.try_load()?;
        Ok(self.len())
    }

    /// Entry point for the file watcher. Returns `true` when a reload
    /// actually happened.
    ///
    /// Events are ignored while the settle deadline from our own last save
    /// has not passed, and when the file's mtime still equals what we wrote:
    /// both are echoes of the store's own write, not external edits.
    pub fn on_file_event(&self) -> bool {
        let path = {
            let state = self.state.lock().expect("state mutex poisoned");
            if let Some(deadline) = state.settle_deadline {
                if Instant::now() < deadline {
                    debug!("file event ignored: within settle window of our own save");
                    return false;
                }
            }
            state.path.clone()
        };

        let modified = self.sheet.lock().expect("sheet mutex poisoned").modified(&path);
        {
            let state = self.state.lock().expect("state mutex poisoned");
            if let (Some(written), Some(observed)) = (state.last_written, modified) {
                if written == observed {
                    debug!("file event ignored: mtime matches our last write");
                    return false;
                }
            }
        }

        match self.try_load() {
            Ok(count) => {
                info!(count, "reloaded ledger after external file change");
                true
            }
            Err(e) => {
                warn!(error = %e, "external change reload failed, keeping current entries");
                false
            }
        }
    }

    /// Reads the file, validates and merges its rows, and swaps the whole
    /// map. On any error the current map is left untouched.
    fn try_load(&self) -> Result<usize, SheetError> {
        let path = self.state.lock().expect("state mutex poisoned").path.clone();
        let rows = self.sheet.lock().expect("sheet mutex poisoned").read_rows(&path)?;

        let outcomes = ingest(&rows, &self.config);
        let total = outcomes.len();
        let valid_rows: Vec<_> = outcomes.into_iter().filter_map(|o| o.row).collect();
        let skipped = total - valid_rows.len();
        let entries: Vec<BudgetEntry> = merge_rows(valid_rows)
            .into_iter()
            .map(|m| self.entry_from_merged(m))
            .collect();
        let count = entries.len();

        let mut state = self.state.lock().expect("state mutex poisoned");
        state.replace_all(entries);
        info!(
            rows = total,
            skipped,
            entries = count,
            generation = state.generation,
            path = %path.display(),
            "loaded ledger from sheet"
        );
        Ok(count)
    }

    /// Serializes the current map back to the file. Persistence is
    /// best-effort: a failed write is logged and the in-memory mutation
    /// stands.
    fn persist(&self) {
        let (path, rows) = {
            let mut state = self.state.lock().expect("state mutex poisoned");
            state.generation += 1;
            // Guard up before the write so a fast watcher cannot slip in.
            state.settle_deadline = Some(Instant::now() + self.config.settle_delay());
            path_and_rows(&state)
        };

        let result = {
            let mut sheet = self.sheet.lock().expect("sheet mutex poisoned");
            let result = sheet.write_rows(&path, &rows);
            let modified = sheet.modified(&path);
            result.map(|()| modified)
        };

        let mut state = self.state.lock().expect("state mutex poisoned");
        match result {
            Ok(modified) => {
                // The write itself takes time; restart the settle window.
                state.settle_deadline = Some(Instant::now() + self.config.settle_delay());
                state.last_written = modified;
                debug!(
                    generation = state.generation,
                    rows = rows.len(),
                    "ledger persisted"
                );
            }
            Err(e) => {
                state.settle_deadline = None;
                error!(error = %e, "sheet save failed, continuing on in-memory state");
            }
        }
    }

    fn materialize(&self, draft: EntryDraft) -> BudgetEntry {
        let actual_amount = enforce_settlement_constraint(
            draft.month,
            self.config.settlement_month,
            draft.actual_amount,
        );
        BudgetEntry {
            id: Uuid::new_v4().to_string(),
            execution_rate: execution_rate(draft.budget_amount, actual_amount),
            department: draft.department,
            account_category: draft.account_category,
            month: draft.month,
            year: draft.year,
            budget_amount: draft.budget_amount,
            actual_amount,
            is_within_budget: draft.is_within_budget,
            business_division: draft.business_division,
            project_name: draft.project_name,
            calculation_basis: draft.calculation_basis,
            cost_type: draft.cost_type,
        }
    }

    fn entry_from_merged(&self, merged: MergedEntry) -> BudgetEntry {
        let actual_amount = enforce_settlement_constraint(
            merged.month,
            self.config.settlement_month,
            merged.actual_amount,
        );
        BudgetEntry {
            id: Uuid::new_v4().to_string(),
            execution_rate: execution_rate(merged.budget_amount, actual_amount),
            department: merged.department,
            account_category: merged.account_category,
            month: merged.month,
            year: merged.year,
            budget_amount: merged.budget_amount,
            actual_amount,
            is_within_budget: merged.is_within_budget,
            business_division: merged.business_division,
            project_name: merged.project_name,
            calculation_basis: merged.calculation_basis,
            cost_type: merged.cost_type,
        }
    }

    fn validate_draft(&self, draft: &EntryDraft) -> Vec<String> {
        let mut reasons = Vec::new();
        validate_text(&mut reasons, "department", &draft.department);
        validate_text(&mut reasons, "accountCategory", &draft.account_category);
        validate_text(&mut reasons, "projectName", &draft.project_name);
        validate_text(&mut reasons, "calculationBasis", &draft.calculation_basis);
        if !draft.department.trim().is_empty()
            && !self.config.is_valid_department(draft.department.trim())
        {
            reasons.push(format!("unknown department: {}", draft.department));
        }
        if !draft.account_category.trim().is_empty()
            && !self
                .config
                .is_valid_account_category(draft.account_category.trim())
        {
            reasons.push(format!("unknown accountCategory: {}", draft.account_category));
        }
        if !(1..=12).contains(&draft.month) {
            reasons.push(format!("month must be between 1 and 12, got {}", draft.month));
        }
        if !self.config.is_valid_year(draft.year) {
            reasons.push(format!(
                "year must be between {} and {}, got {}",
                self.config.min_year, self.config.max_year, draft.year
            ));
        }
        if draft.budget_amount < 0.0 || draft.budget_amount.is_nan() {
            reasons.push(format!(
                "budgetAmount must be non-negative, got {}",
                draft.budget_amount
            ));
        }
        if draft.actual_amount < 0.0 || draft.actual_amount.is_nan() {
            reasons.push(format!(
                "actualAmount must be non-negative, got {}",
                draft.actual_amount
            ));
        }
        reasons
    }

    fn validate_entry_fields(&self, entry: &BudgetEntry) -> Vec<String> {
        let draft = EntryDraft {
            department: entry.department.clone(),
            account_category: entry.account_category.clone(),
            month: entry.month,
            year: entry.year,
            budget_amount: entry.budget_amount,
            actual_amount: entry.actual_amount,
            is_within_budget: entry.is_within_budget,
            business_division: entry.business_division,
            project_name: entry.project_name.clone(),
            calculation_basis: entry.calculation_basis.clone(),
            cost_type: entry.cost_type,
        };
        self.validate_draft(&draft)
    }
}

fn validate_text(reasons: &mut Vec<String>, field: &str, value: &str) {
    if value.trim().is_empty() {
        reasons.push(format!("{field} is empty"));
    }
}

fn path_and_rows(state: &StoreState) -> (PathBuf, Vec<Vec<String>>) {
    let entries = state.ordered_entries();
    (state.path.clone(), layout::sheet_rows(entries.iter()))
}
