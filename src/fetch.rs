//! Paginated loading of records from a remote source into one [`Table`].
//!
//! The loop asks a [`PageSource`] for fixed-size pages at increasing offsets
//! until a page comes back empty or the record cap is reached. Every page must
//! carry all required columns; a page that does not aborts the whole fetch and
//! nothing fetched so far is returned.
//!
//! ```no_run
//! use paystat::config::Settings;
//! use paystat::fetch::{HttpPageSource, fetch_table};
//!
//! # fn main() -> paystat::error::Result<()> {
//! let settings = Settings::default();
//! let mut source = HttpPageSource::from_settings(&settings)?;
//! let table = fetch_table(&mut source, &settings.fetch_options())?;
//! println!("{} rows", table.height());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod flatten;

pub use client::HttpPageSource;

use crate::analyser::logic::cleaning::{Cleaned, CleaningPlan, clean_table};
use crate::analyser::logic::table::Table;
use crate::error::{PaystatError, Result};
use std::collections::VecDeque;

/// One decoded record, before flattening.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Anything that can serve a page of records at an offset.
pub trait PageSource {
    /// Returns up to `limit` records starting at `offset`. An empty page
    /// means the source is exhausted.
    ///
    /// # Errors
    ///
    /// `Transport`, `Remote` or `InvalidResponse` when no page is obtained.
    fn fetch_page(&mut self, offset: usize, limit: usize) -> Result<Vec<Record>>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchOptions {
    pub limit: usize,
    pub cap: usize,
    pub required_columns: Vec<String>,
}

/// Progress of one load. Lives only for the duration of [`fetch_table`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchSession {
    pub offset: usize,
    pub limit: usize,
    pub total_fetched: usize,
    pub cap: usize,
}

impl FetchSession {
    /// # Errors
    ///
    /// Returns `InvalidParameter` if `limit` or `cap` is zero.
    pub fn new(limit: usize, cap: usize) -> Result<Self> {
        if limit == 0 {
            return Err(PaystatError::invalid_parameter("limit", "must be at least 1"));
        }
        if cap == 0 {
            return Err(PaystatError::invalid_parameter("cap", "must be at least 1"));
        }
        Ok(Self {
            offset: 0,
            limit,
            total_fetched: 0,
            cap,
        })
    }

    pub fn cap_reached(&self) -> bool {
        self.total_fetched >= self.cap
    }

    fn advance(&mut self, received: usize) {
        self.total_fetched += received;
        self.offset += self.limit;
    }
}

/// Fetches pages from `source` and assembles them into one table restricted
/// to the required columns, truncated to exactly `options.cap` rows.
///
/// # Errors
///
/// - `Schema` if any page lacks a required column
/// - `EmptyResult` if no rows were obtained
/// - any error from the source, unretried
pub fn fetch_table<S>(source: &mut S, options: &FetchOptions) -> Result<Table>
where
    S: PageSource + ?Sized,
{
    let mut session = FetchSession::new(options.limit, options.cap)?;
    let required: Vec<&str> = options.required_columns.iter().map(String::as_str).collect();
    let mut pages: Vec<Table> = Vec::new();

    while !session.cap_reached() {
        let records = source
            .fetch_page(session.offset, session.limit)
            .inspect_err(|e| log::warn!("Fetch aborted at offset {}: {e}", session.offset))?;
        if records.is_empty() {
            log::info!("Source exhausted at offset {}", session.offset);
            break;
        }

        let page = flatten::page_to_table(&records)?;
        if let Err(err) = page.require_columns(&required) {
            log::warn!("Fetch aborted at offset {}: {err}", session.offset);
            return Err(err);
        }
        let page = if required.is_empty() {
            page
        } else {
            page.select(&required)?
        };

        session.advance(page.height());
        log::info!(
            "Loaded {} records at offset {}, total: {}",
            page.height(),
            session.offset - session.limit,
            session.total_fetched
        );
        pages.push(page);
    }
    if session.cap_reached() {
        log::info!("Record cap of {} reached", session.cap);
    }

    let mut table = Table::concat(pages)?;
    if table.height() > options.cap {
        log::debug!("Truncating {} rows to the cap of {}", table.height(), options.cap);
        table = table.head(options.cap);
    }
    if table.is_empty() {
        log::warn!("{}", PaystatError::EmptyResult);
        return Err(PaystatError::EmptyResult);
    }
    Ok(table)
}

/// Fetches a fresh table and runs the cleaning pipeline over it.
///
/// # Errors
///
/// Any error from [`fetch_table`] or [`clean_table`].
pub fn fetch_and_clean<S>(
    source: &mut S,
    options: &FetchOptions,
    plan: &CleaningPlan,
) -> Result<Cleaned>
where
    S: PageSource + ?Sized,
{
    let raw = fetch_table(source, options)?;
    clean_table(&raw, plan)
}

/// Serves scripted pages from memory and records every request it receives.
/// Once the script runs out, every further page is empty.
#[derive(Debug, Default)]
pub struct MemoryPageSource {
    responses: VecDeque<Result<Vec<Record>>>,
    requests: Vec<(usize, usize)>,
}

impl MemoryPageSource {
    pub fn new(pages: Vec<Vec<Record>>) -> Self {
        Self::with_responses(pages.into_iter().map(Ok).collect())
    }

    pub fn with_responses(responses: Vec<Result<Vec<Record>>>) -> Self {
        Self {
            responses: responses.into(),
            requests: Vec::new(),
        }
    }

    /// `(offset, limit)` of each request, in order.
    pub fn requests(&self) -> &[(usize, usize)] {
        &self.requests
    }
}

impl PageSource for MemoryPageSource {
    fn fetch_page(&mut self, offset: usize, limit: usize) -> Result<Vec<Record>> {
        self.requests.push((offset, limit));
        let mut page = self.responses.pop_front().unwrap_or_else(|| Ok(Vec::new()))?;
        page.truncate(limit);
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    #![expect(clippy::unwrap_used)]

    use super::*;
    use crate::analyser::logic::table::Value;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    fn record(amount: f64, id: usize) -> Record {
        json!({ "amount": amount, "id": id, "extra": "dropped" })
            .as_object()
            .cloned()
            .unwrap()
    }

    fn page(start: usize, len: usize) -> Vec<Record> {
        (start..start + len).map(|i| record(i as f64, i)).collect()
    }

    fn options(limit: usize, cap: usize) -> FetchOptions {
        FetchOptions {
            limit,
            cap,
            required_columns: vec!["id".to_owned(), "amount".to_owned()],
        }
    }

    #[test]
    fn test_stops_on_empty_page() {
        let mut source = MemoryPageSource::new(vec![page(0, 2), vec![]]);
        let table = fetch_table(&mut source, &options(2, 100)).unwrap();

        assert_eq!(table.height(), 2);
        assert_eq!(table.column_names(), vec!["id", "amount"]);
        assert_eq!(source.requests(), &[(0, 2), (2, 2)]);
    }

    #[test]
    fn test_cap_truncates_exactly_and_stops_immediately() {
        let mut source = MemoryPageSource::new(vec![page(0, 4), page(4, 4), page(8, 4)]);
        let table = fetch_table(&mut source, &options(4, 6)).unwrap();

        assert_eq!(table.height(), 6);
        // no third request after the cap was reached on the second page
        assert_eq!(source.requests(), &[(0, 4), (4, 4)]);
        let ids = table.values("id").unwrap();
        assert_eq!(ids.last(), Some(&Value::Number(5.0)));
    }

    #[test]
    fn test_missing_required_column_discards_everything() {
        let bad = vec![json!({ "amount": 1.0 }).as_object().cloned().unwrap()];
        let mut source = MemoryPageSource::new(vec![page(0, 2), bad, page(4, 2)]);
        match fetch_table(&mut source, &options(2, 100)).unwrap_err() {
            PaystatError::Schema { missing_columns } => assert_eq!(missing_columns, vec!["id"]),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(source.requests().len(), 2);
    }

    #[test]
    fn test_source_error_aborts_without_retry() {
        let mut source = MemoryPageSource::with_responses(vec![
            Ok(page(0, 2)),
            Err(PaystatError::Remote {
                status: 500,
                body: "oops".to_owned(),
            }),
        ]);
        assert!(matches!(
            fetch_table(&mut source, &options(2, 100)).unwrap_err(),
            PaystatError::Remote { status: 500, .. }
        ));
        assert_eq!(source.requests().len(), 2);
    }

    #[test]
    fn test_empty_result() {
        let mut source = MemoryPageSource::new(vec![]);
        assert!(matches!(
            fetch_table(&mut source, &options(10, 100)).unwrap_err(),
            PaystatError::EmptyResult
        ));
        assert!(matches!(
            fetch_table(&mut source, &options(0, 100)).unwrap_err(),
            PaystatError::InvalidParameter { .. }
        ));
    }

    proptest! {
        #[test]
        fn prop_row_count_never_exceeds_cap(
            page_sizes in proptest::collection::vec(0_usize..8, 0..10),
            limit in 1_usize..8,
            cap in 1_usize..40,
        ) {
            let mut start = 0;
            let pages: Vec<Vec<Record>> = page_sizes
                .iter()
                .map(|&n| {
                    let p = page(start, n.min(limit));
                    start += n;
                    p
                })
                .collect();
            let served: Vec<usize> = pages.iter().map(Vec::len).collect();
            let mut source = MemoryPageSource::new(pages);

            match fetch_table(&mut source, &options(limit, cap)) {
                Ok(table) => {
                    prop_assert!(table.height() <= cap);
                    // pages up to the first empty one are all consumed unless the cap intervenes
                    let available: usize = served.iter().take_while(|&&n| n > 0).sum();
                    prop_assert_eq!(table.height(), available.min(cap));
                }
                Err(PaystatError::EmptyResult) => {
                    prop_assert_eq!(served.first().copied().unwrap_or(0), 0);
                }
                Err(other) => prop_assert!(false, "unexpected error: {}", other),
            }
        }
    }
}
