//! # paystat command-line entry point
//!
//! Every command fetches the configured source afresh, runs the cleaning
//! pipeline and then prints its result as JSON:
//!
//! ```bash
//! paystat load
//! paystat histogram --column total_amount_of_payment_usdollars --bin-width 500
//! paystat count --group-by principal_investigator_1_state --min 10
//! paystat search --last-name smith --output smiths.xlsx
//! ```
//!
//! Set `RUST_LOG=debug` for per-page and per-step detail on stderr.

#![warn(clippy::all, rust_2018_idioms)]
#![expect(clippy::print_stdout)] // Allow println! in main binary

mod cli;

use anyhow::Result;
use clap::Parser as _;

fn main() -> Result<()> {
    paystat::logging::init()?;

    let cli = cli::Cli::parse();
    cli::run_command(cli)
}
