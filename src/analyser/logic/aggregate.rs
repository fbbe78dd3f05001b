use super::table::Table;
use super::types::GroupAggregate;
use crate::error::{PaystatError, Result};

/// Optional inclusive bounds on a group's distinct count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CountRange {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl CountRange {
    /// # Errors
    ///
    /// Returns `InvalidParameter` when `min` is greater than `max`.
    pub fn new(min: Option<usize>, max: Option<usize>) -> Result<Self> {
        if let (Some(lo), Some(hi)) = (min, max)
            && lo > hi
        {
            return Err(PaystatError::invalid_parameter(
                "count range",
                format!("minimum {lo} is greater than maximum {hi}"),
            ));
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, count: usize) -> bool {
        self.min.is_none_or(|lo| count >= lo) && self.max.is_none_or(|hi| count <= hi)
    }
}

/// Distinct `id_column` counts per `group_column` value, restricted to groups
/// whose count falls within `range`.
///
/// # Errors
///
/// Returns `Schema` if either column is absent.
pub fn count_distinct_by(
    table: &Table,
    group_column: &str,
    id_column: &str,
    range: CountRange,
    drop_missing_group: bool,
) -> Result<GroupAggregate> {
    let mut kept = table.group_count_distinct(group_column, id_column, drop_missing_group)?;
    let total = kept.len();
    kept.groups.retain(|g| range.contains(g.count));
    log::debug!(
        "Grouped '{id_column}' by '{group_column}': {} of {total} groups in range",
        kept.len()
    );
    Ok(kept)
}
