use std::path::PathBuf;
use std::sync::Arc;

use budget_ledger::config::LedgerConfig;
use budget_ledger::core::aggregation::{
    aggregate_by_account, aggregate_by_department, aggregate_by_month,
};
use budget_ledger::core::calculations::calculate_stats;
use budget_ledger::core::query::BudgetFilter;
use budget_ledger::core::{BusinessDivision, CostType, EntryDraft};
use budget_ledger::export;
use budget_ledger::sheet::SheetStore;
use budget_ledger::sheet::file::CsvSheet;
use budget_ledger::store::LedgerStore;
use budget_ledger::store::watch::watch_file;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "budget-ledger", about = "Budget-vs-actual ledger over a sheet file")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FilterArgs {
    #[arg(long)]
    start_month: Option<u32>,
    #[arg(long)]
    end_month: Option<u32>,
    #[arg(long)]
    year: Option<i32>,
    #[arg(long)]
    department: Vec<String>,
    #[arg(long)]
    account_category: Vec<String>,
}

impl FilterArgs {
    fn into_filter(self) -> BudgetFilter {
        BudgetFilter {
            start_month: self.start_month,
            end_month: self.end_month,
            year: self.year,
            departments: self.department,
            account_categories: self.account_category,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List entries, optionally filtered
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Print dashboard statistics for the (optionally filtered) ledger
    Stats {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Add a single entry
    Add {
        #[arg(long)]
        department: String,
        #[arg(long)]
        account_category: String,
        #[arg(long)]
        month: u32,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long, default_value_t = 0.0)]
        budget: f64,
        #[arg(long, default_value_t = 0.0)]
        actual: f64,
        #[arg(long)]
        project_name: String,
        #[arg(long)]
        calculation_basis: String,
        /// kids, elementary, middle or all
        #[arg(long, default_value = "all")]
        division: String,
        /// fixed or variable
        #[arg(long, default_value = "variable")]
        cost_type: String,
    },
    /// Delete an entry by id
    Delete {
        id: String,
    },
    /// Bulk-import rows from a CSV file and report per-row failures
    Import {
        file: PathBuf,
    },
    /// Write a snapshot of all entries
    Export {
        /// csv or json
        #[arg(long, default_value = "csv")]
        format: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Write a blank import template
    Template {
        #[arg(long, default_value = "budget_template.csv")]
        out: PathBuf,
    },
    /// Watch the sheet file and keep the ledger synchronized
    Watch,
}

fn format_amount(value: f64) -> String {
    format!("{value:.0}")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = LedgerConfig::load(&cli.config)?;
    let store = LedgerStore::open(CsvSheet::new(), config);

    match cli.command {
        Commands::List { filter } => {
            let entries = store.get_filtered(&filter.into_filter());
            for e in &entries {
                println!(
                    "{} | {} | {} | {}-{:02} | budget {} | actual {} | {:.1}% | {}",
                    e.id,
                    e.department,
                    e.account_category,
                    e.year,
                    e.month,
                    format_amount(e.budget_amount),
                    format_amount(e.actual_amount),
                    e.execution_rate,
                    e.project_name,
                );
            }
            println!("{} entries", entries.len());
        }
        Commands::Stats { filter } => {
            let all = store.get_all();
            let filtered = store.get_filtered(&filter.into_filter());
            let settlement_month = store.config().settlement_month;
            let stats = calculate_stats(&filtered, settlement_month, &all);
            println!("settlement month      {settlement_month}");
            println!("annual total budget   {}", format_amount(stats.annual_total_budget));
            println!("filtered budget       {}", format_amount(stats.filtered_total_budget));
            println!("filtered actual       {}", format_amount(stats.filtered_total_actual));
            println!("settled budget        {}", format_amount(stats.settled_budget));
            println!("settled actual        {}", format_amount(stats.settled_actual));
            println!("execution rate        {:.2}%", stats.execution_rate);
            println!("projected annual      {}", format_amount(stats.projected_annual));
            println!("remaining budget      {}", format_amount(stats.remaining_budget));

            println!("\nby department:");
            for agg in aggregate_by_department(&filtered, settlement_month) {
                println!(
                    "  {} | budget {} | actual {} | {:.1}%",
                    agg.key,
                    format_amount(agg.budget),
                    format_amount(agg.actual),
                    agg.execution_rate,
                );
            }
            println!("by account category:");
            for agg in aggregate_by_account(&filtered, settlement_month) {
                println!(
                    "  {} | budget {} | actual {} | {:.1}%",
                    agg.key,
                    format_amount(agg.budget),
                    format_amount(agg.actual),
                    agg.execution_rate,
                );
            }
            println!("by month:");
            for point in aggregate_by_month(&filtered, settlement_month) {
                let rate = match point.execution_rate {
                    Some(r) => format!("{r:.1}%"),
                    None => "projected".to_string(),
                };
                println!(
                    "  {:>2} | {} | target {:.1}%",
                    point.month, rate, point.target_rate
                );
            }
        }
        Commands::Add {
            department,
            account_category,
            month,
            year,
            budget,
            actual,
            project_name,
            calculation_basis,
            division,
            cost_type,
        } => {
            let business_division = BusinessDivision::parse(&division)
                .ok_or_else(|| format!("unknown business division: {division}"))?;
            let cost_type = CostType::parse(&cost_type)
                .ok_or_else(|| format!("unknown cost type: {cost_type}"))?;
            let draft = EntryDraft {
                department,
                account_category,
                month,
                year: year.unwrap_or(store.config().default_year),
                budget_amount: budget,
                actual_amount: actual,
                is_within_budget: true,
                business_division,
                project_name,
                calculation_basis,
                cost_type,
            };
            let entry = store.create(draft)?;
            println!("created {} ({:.1}% executed)", entry.id, entry.execution_rate);
        }
        Commands::Delete { id } => {
            store.delete(&id)?;
            println!("deleted {id}");
        }
        Commands::Import { file } => {
            let rows = CsvSheet::new().read_rows(&file)?;
            let report = store.import_rows(&rows);
            println!(
                "{} rows: {} valid, {} invalid, {} entries stored",
                report.total,
                report.valid,
                report.invalid,
                report.entries.len()
            );
            for failure in &report.failures {
                println!("  row {}: {}", failure.line, failure.errors.join("; "));
            }
        }
        Commands::Export { format, out } => {
            let entries = store.get_all();
            let (content, default_name) = match format.as_str() {
                "json" => (
                    export::json_snapshot(&entries, store.config())?,
                    "budget_data.json",
                ),
                "csv" => (export::csv_snapshot(&entries)?, "budget_data.csv"),
                other => return Err(format!("unknown export format: {other}").into()),
            };
            let out = out.unwrap_or_else(|| PathBuf::from(default_name));
            std::fs::write(&out, content)?;
            println!("exported {} entries to {}", entries.len(), out.display());
        }
        Commands::Template { out } => {
            std::fs::write(&out, export::csv_template(store.config())?)?;
            println!("template written to {}", out.display());
        }
        Commands::Watch => {
            let store = Arc::new(store);
            let _watcher = watch_file(Arc::clone(&store))?;
            println!(
                "watching {} ({} entries loaded), press Ctrl-C to stop",
                store.path().display(),
                store.len()
            );
            loop {
                std::thread::park();
            }
        }
    }

    Ok(())
}
