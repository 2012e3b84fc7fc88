mod catalog;
mod database;
mod pipeline;
mod transform;
mod utils;

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::catalog::client::HttpCatalog;
use crate::database::predefined;
use crate::database::query::{display_cell, QueryResult};
use crate::pipeline::{Archive, Collector};
use crate::utils::config::Settings;

#[derive(Parser, Debug)]
#[command(author, version, about = "Collect museum artifacts into a local SQLite archive and query them", long_about = None)]
struct Args {
    /// Settings file with KEY=value lines
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    #[arg(long)]
    api_key: Option<String>,

    #[arg(long)]
    db_path: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the catalog's classifications
    Classifications {
        /// Names to use if the listing endpoint is unavailable
        #[arg(long, value_delimiter = ',')]
        fallback: Vec<String>,
    },
    /// Fetch and normalize one classification without storing it
    Collect(FetchArgs),
    /// Fetch, normalize and store one classification
    Load(FetchArgs),
    /// Run a predefined query by label, or any SQL statement
    Query {
        sql_or_label: String,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Tsv)]
        format: OutputFormat,
    },
    /// List predefined query labels
    Queries,
    /// Save the API key and database path to the settings file
    Configure,
}

#[derive(clap::Args, Debug)]
struct FetchArgs {
    #[arg(short, long)]
    classification: String,

    #[arg(long)]
    page_size: Option<u32>,

    #[arg(long)]
    limit: Option<usize>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OutputFormat {
    Tsv,
    Csv,
    Json,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let mut settings = Settings::load(&args.env_file)?;
    if let Some(key) = args.api_key.clone() {
        settings.api_key = Some(key);
    }
    if let Some(path) = args.db_path.clone() {
        settings.db_path = path;
    }

    match args.command {
        Command::Queries => {
            for label in predefined::labels() {
                println!("{}", label);
            }
            Ok(())
        }
        Command::Configure => {
            settings.require_api_key()?;
            settings.save(&args.env_file)?;
            info!("Settings written to {:?}", args.env_file);
            Ok(())
        }
        command => run(command, settings),
    }
}

fn run(command: Command, mut settings: Settings) -> Result<()> {
    if let Command::Collect(fetch) | Command::Load(fetch) = &command {
        if let Some(size) = fetch.page_size {
            settings.page_size = size;
        }
        if let Some(limit) = fetch.limit {
            settings.limit = limit;
        }
    }

    match command {
        Command::Classifications { fallback } => {
            let mut collector = collector(&settings)?;
            if !fallback.is_empty() {
                collector = collector.with_fallback(fallback);
            }
            for name in collector.list_classifications(settings.api_key.as_deref()) {
                println!("{}", name);
            }
        }
        Command::Collect(fetch) => {
            let api_key = settings.require_api_key()?;
            let batch = collector(&settings)?.fetch_and_normalize(api_key, &fetch.classification);
            if batch.is_empty() {
                warn!("No records found for {}", fetch.classification);
                return Ok(());
            }
            info!("Collected {} records for {}", batch.metadata.len(), fetch.classification);
            preview("metadata", &batch.metadata)?;
            preview("media", &batch.media)?;
            preview("colors", &batch.colors)?;
        }
        Command::Load(fetch) => {
            let api_key = settings.require_api_key()?;
            let batch = collector(&settings)?.fetch_and_normalize(api_key, &fetch.classification);
            if batch.is_empty() {
                warn!("No records found for {}", fetch.classification);
                return Ok(());
            }
            let mut archive = archive(&settings)?;
            let summary = archive.persist(&batch)?;
            info!(
                metadata = summary.metadata,
                media = summary.media,
                colors = summary.colors,
                "Inserted {} rows",
                summary.total()
            );
            match archive.recent_metadata() {
                Ok(result) => write_table(&result, b'\t', io::stdout())?,
                Err(e) => warn!("Preview failed: {}", e),
            }
        }
        Command::Query { sql_or_label, format } => match archive(&settings)?.run_query(&sql_or_label) {
            Ok(result) => {
                print_result(&result, format)?;
                let numeric = result.numeric_columns();
                if !numeric.is_empty() {
                    info!("Chartable columns: {}", numeric.join(", "));
                }
            }
            Err(e) => {
                error!(sql = %e.sql, "Error: {}", e);
                return Err(e.into());
            }
        },
        Command::Queries | Command::Configure => {}
    }
    Ok(())
}

fn collector(settings: &Settings) -> Result<Collector<HttpCatalog>> {
    let source = HttpCatalog::new(&settings.api_base, settings.timeout())?;
    Ok(Collector::new(source, settings.fetch_options()))
}

fn archive(settings: &Settings) -> Result<Archive> {
    info!("DB: {}", settings.db_path);
    Archive::open(&settings.db_path)
}

fn preview<T: Serialize>(name: &str, rows: &[T]) -> Result<()> {
    println!("== {} ({} rows)", name, rows.len());
    for row in rows.iter().take(10) {
        println!("{}", serde_json::to_string(row)?);
    }
    Ok(())
}

fn print_result(result: &QueryResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result.to_json())?),
        OutputFormat::Csv => write_table(result, b',', io::stdout())?,
        OutputFormat::Tsv => write_table(result, b'\t', io::stdout())?,
    }
    Ok(())
}

fn write_table<W: Write>(result: &QueryResult, delimiter: u8, out: W) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().delimiter(delimiter).from_writer(out);
    writer.write_record(&result.columns)?;
    for row in &result.rows {
        writer.write_record(row.iter().map(display_cell))?;
    }
    writer.flush()?;
    Ok(())
}
