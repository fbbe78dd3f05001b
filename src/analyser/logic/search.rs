//! AND-combined lookup of investigators by identifier and name fragments.

use super::table::{Table, Value};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Which columns the search predicates apply to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchColumns {
    pub id_column: String,
    pub first_name_column: String,
    pub last_name_column: String,
}

impl Default for SearchColumns {
    fn default() -> Self {
        Self {
            id_column: "principal_investigator_1_profile_id".to_owned(),
            first_name_column: "principal_investigator_1_first_name".to_owned(),
            last_name_column: "principal_investigator_1_last_name".to_owned(),
        }
    }
}

/// User input. Blank fields are treated as not supplied.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    pub profile_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl SearchCriteria {
    fn supplied(field: Option<&String>) -> Option<&str> {
        field.map(|s| s.trim()).filter(|s| !s.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        Self::supplied(self.profile_id.as_ref()).is_none()
            && Self::supplied(self.first_name.as_ref()).is_none()
            && Self::supplied(self.last_name.as_ref()).is_none()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SearchOutcome {
    Matched(Table),
    NoMatches,
}

/// Filters `table` by every supplied criterion. With no criteria the whole
/// table is returned unchanged, even when it has no rows. An empty result
/// of a real search is reported as [`SearchOutcome::NoMatches`], never as an
/// error.
///
/// # Errors
///
/// Returns `Schema` if a column needed by a supplied criterion is absent.
pub fn search(
    table: &Table,
    columns: &SearchColumns,
    criteria: &SearchCriteria,
) -> Result<SearchOutcome> {
    if criteria.is_empty() {
        log::debug!("No search criteria; returning all {} rows", table.height());
        return Ok(SearchOutcome::Matched(table.clone()));
    }

    let id = SearchCriteria::supplied(criteria.profile_id.as_ref());
    let first = SearchCriteria::supplied(criteria.first_name.as_ref());
    let last = SearchCriteria::supplied(criteria.last_name.as_ref());

    let needed: Vec<&str> = [
        id.map(|_| columns.id_column.as_str()),
        first.map(|_| columns.first_name_column.as_str()),
        last.map(|_| columns.last_name_column.as_str()),
    ]
    .into_iter()
    .flatten()
    .collect();
    table.require_columns(&needed)?;

    let mut result = table.clone();
    if let Some(id) = id {
        result = result.filter_equals(&columns.id_column, &Value::text(id))?;
    }
    if let Some(first) = first {
        result = result.filter_contains(&columns.first_name_column, first, true)?;
    }
    if let Some(last) = last {
        result = result.filter_contains(&columns.last_name_column, last, true)?;
    }

    log::info!("Search matched {} of {} rows", result.height(), table.height());
    if result.is_empty() {
        Ok(SearchOutcome::NoMatches)
    } else {
        Ok(SearchOutcome::Matched(result))
    }
}
