use chrono::NaiveDate;
use clap::Parser;
use lending_desk::application::desk::LibraryDesk;
use lending_desk::config::LibraryConfig;
use lending_desk::domain::ports::Stores;
use lending_desk::interfaces::csv::event_reader::EventReader;
use lending_desk::interfaces::csv::invoice_writer::InvoiceWriter;
use lending_desk::interfaces::csv::loan_writer::LoanWriter;
use lending_desk::telemetry;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input circulation events CSV file
    input: PathBuf,

    /// Library configuration (fees, memberships, catalog) in TOML
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Mark loans past due as of this date (YYYY-MM-DD) before reporting
    #[arg(long)]
    as_of: Option<NaiveDate>,

    /// Report loans instead of invoices
    #[arg(long)]
    loans: bool,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => LibraryConfig::load(path).into_diagnostic()?,
        None => LibraryConfig::default(),
    };
    let stores = open_stores(cli.db_path.as_ref())?;
    let desk = LibraryDesk::new(stores, &config);
    desk.seed(&config).await.into_diagnostic()?;

    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = EventReader::new(file);
    let mut last_date = None;
    for (row, event_result) in reader.events().enumerate() {
        match event_result {
            Ok(event) => {
                let (kind, date) = (event.kind, event.date);
                match desk.process_event(event).await {
                    Ok(()) => last_date = last_date.max(Some(date)),
                    Err(e) => warn!(row = row + 1, %kind, error = %e, "Rejected event"),
                }
            }
            Err(e) => warn!(row = row + 1, error = %e, "Error reading event"),
        }
    }

    if let Some(as_of) = cli.as_of {
        let delayed = desk.circulation().sweep_overdue(as_of).await.into_diagnostic()?;
        info!(%as_of, delayed = delayed.len(), "overdue sweep finished");
    }

    let stdout = io::stdout();
    if cli.loans {
        let as_of = cli
            .as_of
            .or(last_date)
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        let loans = desk.transactions().await.into_diagnostic()?;
        let calculator = desk.calculator();
        let mut writer = LoanWriter::new(stdout.lock(), calculator, as_of);
        writer.write_loans(&loans).into_diagnostic()?;
    } else {
        let invoices = desk.invoices().await.into_diagnostic()?;
        let mut writer = InvoiceWriter::new(stdout.lock());
        writer.write_invoices(&invoices).into_diagnostic()?;
    }

    Ok(())
}

#[cfg(feature = "storage-rocksdb")]
fn open_stores(db_path: Option<&PathBuf>) -> Result<Stores> {
    use lending_desk::infrastructure::rocksdb::RocksDBStore;

    match db_path {
        Some(path) => Ok(RocksDBStore::open(path).into_diagnostic()?.stores()),
        None => Ok(Stores::in_memory()),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_stores(db_path: Option<&PathBuf>) -> Result<Stores> {
    if let Some(path) = db_path {
        warn!(
            path = %path.display(),
            "Persistent storage requested via --db-path, but the 'storage-rocksdb' feature is not enabled. Falling back to in-memory storage."
        );
    }
    Ok(Stores::in_memory())
}
