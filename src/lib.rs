//! # paystat - research payment ingestion and exploration
//!
//! paystat pulls paginated records from a remote datastore, cleans them into
//! a bounded numeric/categorical table and answers exploratory questions
//! about it: distribution binning, distinct counts per group and
//! investigator search.
//!
//! ## Quick Start
//!
//! ```no_run
//! use paystat::analyser::logic::{BinParams, bin_distribution};
//! use paystat::config::Settings;
//! use paystat::fetch::{HttpPageSource, fetch_and_clean};
//!
//! # fn main() -> paystat::error::Result<()> {
//! let settings = Settings::default();
//! let mut source = HttpPageSource::from_settings(&settings)?;
//! let cleaned = fetch_and_clean(&mut source, &settings.fetch_options(), &settings.cleaning)?;
//!
//! let bins = bin_distribution(
//!     &cleaned.table,
//!     &settings.cleaning.amount_column,
//!     &BinParams::default(),
//! )?;
//! println!("{} bins, median {}", bins.num_bins, bins.stats.median);
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Modules
//!
//! - [`fetch`]: paginated loading behind the [`fetch::PageSource`] trait
//! - [`analyser`]: the [`analyser::logic::Table`] model and the analysis stages
//!   - [`analyser::logic::cleaning`]: the fixed cleaning pipeline
//!   - [`analyser::logic::binning`]: histogram layout and summary statistics
//!   - [`analyser::logic::aggregate`] and [`analyser::logic::search`]
//! - [`config`]: JSON settings with defaults for the CMS research payments source
//! - [`export`]: CSV and XLSX output
//! - [`error`]: error types and handling utilities
//!
//! Every operation on a table borrows it and returns a new one, so a failed
//! step never leaves a half-transformed table behind.

#![warn(clippy::all, rust_2018_idioms)]

pub mod analyser;
pub mod config;
pub mod error;
pub mod export;
pub mod fetch;
#[cfg(not(target_arch = "wasm32"))]
pub mod logging;
