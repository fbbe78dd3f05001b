//! The fixed cleaning pipeline applied to a freshly fetched table.
//!
//! Steps, in order, on the amount column `N` and the label column `S`:
//!
//! 1. coerce `N` to numbers
//! 2. drop rows where `N` is missing
//! 3. drop rows where `N` is zero or negative
//! 4. drop rows where `N` exceeds the absolute ceiling
//! 5. keep rows within the `[lower_quantile, upper_quantile]` percentile
//!    bounds of `N`, computed on the table as of step 4
//! 6. normalize the text of `S`
//!
//! The pipeline works on borrowed input and only hands back the final table,
//! so a failure leaves the caller's table exactly as it was.

use super::table::Table;
use super::types::CleaningReport;
use crate::error::{PaystatError, Result};
use polars::prelude::{col, lit};
use serde::{Deserialize, Serialize};

/// Taxonomy prefix carried by research-payment specialty labels,
/// e.g. `"Allopathic & Osteopathic Physicians|Internal Medicine"`.
pub const SPECIALTY_PREFIX_LEN: usize = 36;
pub const SPECIALTY_MARKER: &str = "Allopathic & Osteopathic Physician";

/// How the label column is shortened.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TextNormalization {
    /// Drop the first `chars` characters.
    StripPrefix { chars: usize },
    /// Drop everything up to and including the first `marker`, then trim.
    /// Labels without the marker are left unchanged.
    StripThroughMarker { marker: String },
}

impl Default for TextNormalization {
    fn default() -> Self {
        Self::StripPrefix {
            chars: SPECIALTY_PREFIX_LEN,
        }
    }
}

impl TextNormalization {
    pub fn apply(&self, label: &str) -> String {
        match self {
            Self::StripPrefix { chars } => label.chars().skip(*chars).collect(),
            Self::StripThroughMarker { marker } => match label.split_once(marker.as_str()) {
                Some((_, rest)) => rest.trim().to_owned(),
                None => label.to_owned(),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningPlan {
    pub amount_column: String,
    pub text_column: String,
    pub upper_cap: f64,
    pub lower_quantile: f64,
    pub upper_quantile: f64,
    pub text_normalization: TextNormalization,
}

impl Default for CleaningPlan {
    fn default() -> Self {
        Self {
            amount_column: "total_amount_of_payment_usdollars".to_owned(),
            text_column: "principal_investigator_1_specialty_1".to_owned(),
            upper_cap: 1_000_000.0,
            lower_quantile: 0.05,
            upper_quantile: 0.95,
            text_normalization: TextNormalization::default(),
        }
    }
}

impl CleaningPlan {
    /// # Errors
    ///
    /// Returns `InvalidParameter` for a non-positive ceiling or quantile
    /// bounds outside `[0, 1]` or in the wrong order.
    pub fn validate(&self) -> Result<()> {
        if !(self.upper_cap.is_finite() && self.upper_cap > 0.0) {
            return Err(PaystatError::invalid_parameter(
                "upper_cap",
                format!("{} is not a positive number", self.upper_cap),
            ));
        }
        let in_unit = |q: f64| (0.0..=1.0).contains(&q);
        if !in_unit(self.lower_quantile)
            || !in_unit(self.upper_quantile)
            || self.lower_quantile > self.upper_quantile
        {
            return Err(PaystatError::invalid_parameter(
                "quantiles",
                format!(
                    "expected 0 <= lower <= upper <= 1, got {} and {}",
                    self.lower_quantile, self.upper_quantile
                ),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Cleaned {
    pub table: Table,
    pub report: CleaningReport,
}

/// Runs the cleaning pipeline over `table`.
///
/// # Errors
///
/// Returns `Schema` if the amount or label column is absent and
/// `InvalidParameter` if the plan itself is invalid. Nothing is applied in
/// either case.
pub fn clean_table(table: &Table, plan: &CleaningPlan) -> Result<Cleaned> {
    plan.validate()?;
    let amount = plan.amount_column.as_str();
    if let Err(err) = table.require_columns(&[amount, plan.text_column.as_str()]) {
        log::warn!("Cleaning aborted: {err}");
        return Err(err);
    }

    let input_rows = table.height();

    let present = table.coerce_numeric(amount)?.drop_missing(amount)?;
    let positive = present.filter(col(amount).gt(lit(0.0)))?;
    let capped = positive.filter(col(amount).lt_eq(lit(plan.upper_cap)))?;

    let (trimmed, bounds) = if capped.is_empty() {
        log::warn!("No rows left before outlier trimming; skipping percentile bounds");
        (capped.clone(), None)
    } else {
        let lo = capped.percentile(amount, plan.lower_quantile)?;
        let hi = capped.percentile(amount, plan.upper_quantile)?;
        (capped.filter_numeric_range(amount, lo, hi)?, Some((lo, hi)))
    };

    let normalized = trimmed.transform_text(&plan.text_column, |label| {
        plan.text_normalization.apply(label)
    })?;

    let report = CleaningReport {
        input_rows,
        dropped_missing: input_rows - present.height(),
        dropped_non_positive: present.height() - positive.height(),
        dropped_over_cap: positive.height() - capped.height(),
        dropped_outliers: capped.height() - trimmed.height(),
        lower_bound: bounds.map(|(lo, _)| lo),
        upper_bound: bounds.map(|(_, hi)| hi),
        output_rows: normalized.height(),
    };
    log::info!(
        "Cleaned '{amount}': {} -> {} rows (missing {}, non-positive {}, over cap {}, outliers {})",
        report.input_rows,
        report.output_rows,
        report.dropped_missing,
        report.dropped_non_positive,
        report.dropped_over_cap,
        report.dropped_outliers
    );

    Ok(Cleaned {
        table: normalized,
        report,
    })
}
