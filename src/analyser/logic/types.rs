use super::table::{ColumnKind, Value};
use serde::Serialize;

// DATA STRUCTURES

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupCount {
    pub group: Value,
    pub count: usize,
}

/// Distinct identifier counts per group value, in order of first appearance.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupAggregate {
    pub group_column: String,
    pub id_column: String,
    pub groups: Vec<GroupCount>,
}

impl GroupAggregate {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SummaryStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// `None` renders as `N/A`.
    pub mode: Option<f64>,
    pub min: f64,
    pub max: f64,
    pub range: f64,
}

/// Histogram layout for one numeric column. Recomputed per request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BinSpec {
    pub column: String,
    /// Width that chose `num_bins`: the requested width, or the
    /// Freedman–Diaconis width.
    pub bin_width: f64,
    pub num_bins: usize,
    /// Spacing of `edges`. The data range split into `num_bins` equal parts,
    /// so it is at least `bin_width` whenever the range is positive.
    pub edge_width: f64,
    /// Axis bounds for the rendered chart.
    pub range_min: f64,
    pub range_max: f64,
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
    pub stats: SummaryStats,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CleaningReport {
    pub input_rows: usize,
    pub dropped_missing: usize,
    pub dropped_non_positive: usize,
    pub dropped_over_cap: usize,
    pub dropped_outliers: usize,
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
    pub output_rows: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NumericProfile {
    pub mean: f64,
    pub std_dev: Option<f64>,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TextProfile {
    pub distinct: usize,
    pub top_value: Option<(String, usize)>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum ColumnStats {
    Numeric(NumericProfile),
    Text(TextProfile),
    None,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub kind: ColumnKind,
    pub count: usize,
    pub missing: usize,
    pub stats: ColumnStats,
}
