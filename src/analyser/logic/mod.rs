pub mod aggregate;
pub mod binning;
pub mod cleaning;
pub mod profiling;
pub mod search;
pub mod table;
pub mod types;

pub use aggregate::{CountRange, count_distinct_by};
pub use binning::{BinParams, bin_distribution};
pub use cleaning::{Cleaned, CleaningPlan, TextNormalization, clean_table};
pub use profiling::{describe, missing_counts};
pub use search::{SearchColumns, SearchCriteria, SearchOutcome, search};
pub use table::{ColumnKind, Table, Value};
pub use types::{
    BinSpec, CleaningReport, ColumnProfile, ColumnStats, GroupAggregate, GroupCount,
    NumericProfile, SummaryStats, TextProfile,
};
