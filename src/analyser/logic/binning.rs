//! Histogram binning and summary statistics for one numeric column.
//!
//! The bin count comes either from a caller-supplied width or from the
//! Freedman–Diaconis rule (`2 * IQR / n^(1/3)`). Bins are equal-width over the
//! data range; the chart axis always starts at 0 and ends at `max_x` when one
//! is given, else at the data maximum.

use super::table::{Table, quantile};
use super::types::{BinSpec, SummaryStats};
use crate::error::{PaystatError, Result};
use polars::prelude::*;

/// Upper bound on the number of bins a request may produce.
pub const MAX_BINS: usize = 10_000;

/// Optional user parameters for [`bin_distribution`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BinParams {
    pub bin_width: Option<f64>,
    pub max_x: Option<f64>,
}

impl BinParams {
    /// Reads raw user input. Blank input means "not supplied".
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for text that is not a finite number, or a
    /// `max_x` that is not positive.
    pub fn parse(bin_width: Option<&str>, max_x: Option<&str>) -> Result<Self> {
        let params = Self {
            bin_width: parse_optional("bin width", bin_width)?,
            max_x: parse_optional("maximum X-axis", max_x)?,
        };
        params.validate()?;
        Ok(params)
    }

    /// # Errors
    ///
    /// Returns `InvalidParameter` for non-finite values or a non-positive
    /// `max_x`.
    pub fn validate(&self) -> Result<()> {
        if let Some(w) = self.bin_width
            && !w.is_finite()
        {
            return Err(PaystatError::invalid_parameter(
                "bin width",
                format!("{w} is not a finite number"),
            ));
        }
        if let Some(x) = self.max_x
            && !(x.is_finite() && x > 0.0)
        {
            return Err(PaystatError::invalid_parameter(
                "maximum X-axis",
                format!("{x} is not a positive number"),
            ));
        }
        Ok(())
    }
}

fn parse_optional(name: &str, raw: Option<&str>) -> Result<Option<f64>> {
    let Some(text) = raw.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(PaystatError::invalid_parameter(
            name,
            format!("'{text}' is not a valid number"),
        )),
    }
}

/// Computes the histogram layout and summary statistics for `column`.
///
/// The column is read through the same numeric coercion the cleaning
/// pipeline uses, on a copy; the table itself is not changed.
///
/// # Errors
///
/// Returns `Schema` if the column is absent, `EmptyColumn` if no value reads
/// as a number, and `InvalidParameter` for bad parameters or a bin width so
/// small it would exceed [`MAX_BINS`].
pub fn bin_distribution(table: &Table, column: &str, params: &BinParams) -> Result<BinSpec> {
    params.validate()?;
    let coerced = table.coerce_numeric(column)?;
    let ca = coerced.numeric(column)?;
    let stats = summary_stats(&ca)?.ok_or_else(|| PaystatError::empty_column(column))?;

    let (bin_width, num_bins) = match params.bin_width {
        Some(width) if width > 0.0 => {
            let bins = ((stats.range / width).floor() as usize).max(1);
            if bins > MAX_BINS {
                return Err(PaystatError::invalid_parameter(
                    "bin width",
                    format!("{width} would produce {bins} bins (limit {MAX_BINS})"),
                ));
            }
            (width, bins)
        }
        _ => freedman_diaconis(&ca, stats.range)?,
    };

    let (edges, counts) = equal_width_bins(&ca, stats.min, stats.max, num_bins);
    log::debug!("Binned '{column}' into {num_bins} bins of width {bin_width}");

    Ok(BinSpec {
        column: column.to_owned(),
        bin_width,
        num_bins,
        edge_width: stats.range / num_bins as f64,
        range_min: 0.0,
        range_max: params.max_x.unwrap_or(stats.max),
        edges,
        counts,
        stats,
    })
}

/// Bin width and count by the Freedman–Diaconis rule over the present
/// values of `ca`. A zero IQR falls back to a single bin spanning the data.
///
/// # Errors
///
/// Propagates quantile errors.
pub fn freedman_diaconis(ca: &Float64Chunked, range: f64) -> Result<(f64, usize)> {
    let q1 = quantile(ca, 0.25)?.unwrap_or(0.0);
    let q3 = quantile(ca, 0.75)?.unwrap_or(0.0);
    let n = ca.len() - ca.null_count();
    let width = 2.0 * (q3 - q1) / (n as f64).cbrt();

    if width > 0.0 && width.is_finite() {
        let bins = ((range / width).floor() as usize).clamp(1, MAX_BINS);
        Ok((width, bins))
    } else {
        Ok((if range > 0.0 { range } else { 1.0 }, 1))
    }
}

/// Mean, median, mode and range of the present values; `None` when there
/// are none.
///
/// # Errors
///
/// Propagates quantile errors.
pub fn summary_stats(ca: &Float64Chunked) -> Result<Option<SummaryStats>> {
    let (Some(min), Some(max), Some(mean)) = (ca.min(), ca.max(), ca.mean()) else {
        return Ok(None);
    };
    let Some(median) = quantile(ca, 0.5)? else {
        return Ok(None);
    };
    let mut sorted: Vec<f64> = ca.into_iter().flatten().collect();
    sorted.sort_by(f64::total_cmp);
    Ok(Some(SummaryStats {
        count: sorted.len(),
        mean,
        median,
        mode: mode_sorted(&sorted),
        min,
        max,
        range: max - min,
    }))
}

/// Most frequent value; the smallest one wins a tie.
pub fn mode_sorted(sorted: &[f64]) -> Option<f64> {
    let mut best: Option<(f64, usize)> = None;
    let mut run: Option<(f64, usize)> = None;
    for &v in sorted {
        run = match run {
            Some((current, n)) if current == v => Some((current, n + 1)),
            _ => Some((v, 1)),
        };
        if let Some((value, n)) = run
            && best.is_none_or(|(_, top)| n > top)
        {
            best = Some((value, n));
        }
    }
    best.map(|(value, _)| value)
}

fn equal_width_bins(ca: &Float64Chunked, min: f64, max: f64, num_bins: usize) -> (Vec<f64>, Vec<usize>) {
    let num_bins = num_bins.max(1);
    let range = max - min;
    let edges = (0..=num_bins)
        .map(|i| min + range * i as f64 / num_bins as f64)
        .collect();

    let mut counts = vec![0_usize; num_bins];
    for v in ca.into_iter().flatten() {
        let idx = if range > 0.0 {
            (((v - min) / range) * num_bins as f64).floor() as usize
        } else {
            0
        };
        // the maximum lands in the last, closed bin
        if let Some(slot) = counts.get_mut(idx.min(num_bins - 1)) {
            *slot += 1;
        }
    }
    (edges, counts)
}
