use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use paystat::analyser::logic::*;
use paystat::config::{Settings, load_settings};
use paystat::export::save_table;
use paystat::fetch::{HttpPageSource, fetch_and_clean};
use serde_json::{Map, Value as JsonValue, json};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "paystat",
    version,
    about = "Load, clean and explore research payment records"
)]
pub struct Cli {
    /// Path to a JSON settings file. Defaults are used when omitted.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch and clean the data, then report row counts, columns and missing values
    Load,
    /// Per-column statistics of the cleaned data
    Describe,
    /// Histogram bins and summary statistics for a numeric column
    Histogram {
        #[arg(short, long)]
        column: String,

        /// Bin width. Automatic (Freedman–Diaconis) when omitted or not positive.
        #[arg(long, allow_hyphen_values = true)]
        bin_width: Option<String>,

        /// Upper bound of the X axis. Defaults to the column maximum.
        #[arg(long, allow_hyphen_values = true)]
        max_x: Option<String>,
    },
    /// Count distinct investigators per value of a column
    Count {
        #[arg(short, long)]
        group_by: String,

        /// Keep groups with at least this many investigators
        #[arg(long)]
        min: Option<usize>,

        /// Keep groups with at most this many investigators
        #[arg(long)]
        max: Option<usize>,

        /// Leave out rows whose group value is missing
        #[arg(long)]
        drop_missing_groups: bool,
    },
    /// Find rows by investigator profile id and/or name fragments
    Search {
        #[arg(long)]
        profile_id: Option<String>,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        /// Export the matches to this file (.csv or .xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub fn run_command(cli: Cli) -> Result<()> {
    let settings = load_settings(cli.config.as_deref()).context("Failed to load settings")?;
    let cleaned = load_clean(&settings)?;

    match cli.command {
        Commands::Load => handle_load(&settings, &cleaned),
        Commands::Describe => print_json(&describe(&cleaned.table)?),
        Commands::Histogram {
            column,
            bin_width,
            max_x,
        } => {
            let params = BinParams::parse(bin_width.as_deref(), max_x.as_deref())?;
            print_json(&bin_distribution(&cleaned.table, &column, &params)?)
        }
        Commands::Count {
            group_by,
            min,
            max,
            drop_missing_groups,
        } => {
            let range = CountRange::new(min, max)?;
            let aggregate = count_distinct_by(
                &cleaned.table,
                &group_by,
                &settings.search.id_column,
                range,
                drop_missing_groups,
            )?;
            print_json(&aggregate)
        }
        Commands::Search {
            profile_id,
            first_name,
            last_name,
            output,
        } => {
            let criteria = SearchCriteria {
                profile_id,
                first_name,
                last_name,
            };
            handle_search(&settings, &cleaned.table, &criteria, output)
        }
    }
}

fn load_clean(settings: &Settings) -> Result<Cleaned> {
    let mut source = HttpPageSource::from_settings(settings)?;
    log::info!(
        "Loading data from {} ({}) ...",
        settings.source_name,
        source.endpoint()
    );
    let cleaned = fetch_and_clean(
        &mut source,
        &settings.fetch_options(),
        &settings.cleaning,
    )
    .with_context(|| format!("Failed to load data from {}", settings.source_name))?;
    log::info!(
        "Data successfully loaded with {} records ({} after cleaning).",
        cleaned.report.input_rows,
        cleaned.report.output_rows
    );
    Ok(cleaned)
}

fn handle_load(settings: &Settings, cleaned: &Cleaned) -> Result<()> {
    let missing: Map<String, JsonValue> = missing_counts(&cleaned.table)
        .into_iter()
        .map(|(name, count)| (name, JsonValue::from(count)))
        .collect();
    print_json(&json!({
        "source": settings.source_name,
        "endpoint": settings.endpoint,
        "cleaning": cleaned.report,
        "columns": cleaned.table.column_names(),
        "missing": missing,
    }))
}

fn handle_search(
    settings: &Settings,
    table: &Table,
    criteria: &SearchCriteria,
    output: Option<PathBuf>,
) -> Result<()> {
    if criteria.is_empty() {
        log::info!("No search criteria given; returning every row");
    }
    let matches = match search(table, &settings.search, criteria)? {
        SearchOutcome::NoMatches => {
            println!("No matching rows found for the provided criteria.");
            return Ok(());
        }
        SearchOutcome::Matched(matches) => matches,
    };

    if let Some(path) = output {
        save_table(&matches, &path)
            .with_context(|| format!("Failed to export results to {}", path.display()))?;
        println!("Results exported to {}", path.display());
        return Ok(());
    }
    print_json(&records(&matches)?)
}

/// Rows as JSON objects keyed by column name.
fn records(table: &Table) -> Result<Vec<Map<String, JsonValue>>> {
    let names = table.column_names();
    Ok(table
        .rows()?
        .into_iter()
        .map(|row| {
            names
                .iter()
                .zip(row)
                .map(|(name, value)| {
                    let cell = match value {
                        Value::Number(n) => JsonValue::from(n),
                        Value::Text(s) => JsonValue::from(s),
                        Value::Missing => JsonValue::Null,
                    };
                    ((*name).to_owned(), cell)
                })
                .collect()
        })
        .collect())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
