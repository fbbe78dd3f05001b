//! Per-column profiling: missing counts and basic descriptive statistics.
//!
//! Numeric columns get mean, sample standard deviation and the five-number
//! summary (quartiles use the same linear interpolation as
//! [`Table::percentile`]). Text columns get their distinct count and most
//! frequent value.

use super::table::{ColumnKind, Table, quantile};
use super::types::{ColumnProfile, ColumnStats, NumericProfile, TextProfile};
use crate::error::Result;
use polars::prelude::*;
use std::collections::HashMap;

/// Missing values per column, in column order.
pub fn missing_counts(table: &Table) -> Vec<(String, usize)> {
    table
        .as_dataframe()
        .get_columns()
        .iter()
        .map(|c| (c.name().to_string(), c.null_count()))
        .collect()
}

/// # Errors
///
/// Returns `DataProcessing` if a column cannot be read as its own type.
pub fn describe(table: &Table) -> Result<Vec<ColumnProfile>> {
    table
        .as_dataframe()
        .get_columns()
        .iter()
        .map(|c| profile_column(c.as_materialized_series()))
        .collect()
}

fn profile_column(series: &Series) -> Result<ColumnProfile> {
    let missing = series.null_count();
    let kind = ColumnKind::of(series);
    let stats = match kind {
        ColumnKind::Numeric => analyse_numeric(series)?,
        ColumnKind::Text => analyse_text(series)?,
        ColumnKind::Empty => ColumnStats::None,
    };
    Ok(ColumnProfile {
        name: series.name().to_string(),
        kind,
        count: series.len() - missing,
        missing,
        stats,
    })
}

fn analyse_numeric(series: &Series) -> Result<ColumnStats> {
    let cast = series.cast(&DataType::Float64)?;
    let ca = cast.f64()?;
    let (Some(min), Some(max), Some(mean)) = (ca.min(), ca.max(), ca.mean()) else {
        return Ok(ColumnStats::None);
    };
    let quartile = |q: f64| -> Result<f64> { Ok(quantile(ca, q)?.unwrap_or(min)) };

    Ok(ColumnStats::Numeric(NumericProfile {
        mean,
        std_dev: ca.std(1),
        min,
        q1: quartile(0.25)?,
        median: quartile(0.5)?,
        q3: quartile(0.75)?,
        max,
    }))
}

fn analyse_text(series: &Series) -> Result<ColumnStats> {
    let cast = series.cast(&DataType::String)?;
    // value -> (first seen at, frequency)
    let mut freq: HashMap<&str, (usize, usize)> = HashMap::new();
    for (i, value) in cast.str()?.into_iter().enumerate() {
        if let Some(value) = value {
            freq.entry(value).or_insert((i, 0)).1 += 1;
        }
    }

    // most frequent wins; earliest appearance breaks ties
    let top_value = freq
        .iter()
        .max_by(|a, b| a.1.1.cmp(&b.1.1).then(b.1.0.cmp(&a.1.0)))
        .map(|(value, (_, count))| ((*value).to_owned(), *count));

    Ok(ColumnStats::Text(TextProfile {
        distinct: series.drop_nulls().n_unique()?,
        top_value,
    }))
}
