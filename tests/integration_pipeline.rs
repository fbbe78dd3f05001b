//! Integration tests for the full load-clean-analyse workflow
//!
//! A scripted in-memory page source stands in for the remote datastore, so
//! these run the real fetch loop and cleaning pipeline without a network.

#![expect(clippy::unwrap_used)]

use paystat::analyser::logic::*;
use paystat::config::{REQUIRED_COLUMNS, Settings};
use paystat::error::PaystatError;
use paystat::fetch::{MemoryPageSource, Record, fetch_and_clean, fetch_table};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{Value as JsonValue, json};

fn payment(amount: &str, profile_id: u64, state: &str, last_name: &str) -> Record {
    let mut record: Record = REQUIRED_COLUMNS
        .iter()
        .map(|name| ((*name).to_owned(), JsonValue::from("n/a")))
        .collect();
    let fields = json!({
        "total_amount_of_payment_usdollars": amount,
        "principal_investigator_1_profile_id": profile_id,
        "principal_investigator_1_state": state,
        "principal_investigator_1_first_name": "Ada",
        "principal_investigator_1_last_name": last_name,
        "principal_investigator_1_specialty_1":
            "Allopathic & Osteopathic Physicians|Internal Medicine",
        "record_id": "extra column dropped at load",
    });
    for (key, value) in fields.as_object().cloned().unwrap() {
        record.insert(key, value);
    }
    record
}

#[test]
fn test_two_records_then_empty_page() {
    let settings = Settings::default();
    let mut source = MemoryPageSource::new(vec![
        vec![
            payment("0", 1, "NY", "Lovelace"),
            payment("150.00", 2, "CA", "Hopper"),
        ],
        vec![],
    ]);

    let raw = fetch_table(&mut source, &settings.fetch_options()).unwrap();
    assert_eq!(raw.height(), 2, "fetch should halt on the empty page");
    assert_eq!(raw.width(), REQUIRED_COLUMNS.len());
    assert_eq!(source.requests(), &[(0, 500), (500, 500)]);

    let cleaned = clean_table(&raw, &settings.cleaning).unwrap();
    assert_eq!(cleaned.table.height(), 1, "the zero payment is removed");
    assert_eq!(cleaned.report.dropped_non_positive, 1);

    let specialty = cleaned
        .table
        .values("principal_investigator_1_specialty_1")
        .unwrap();
    assert_eq!(specialty, vec![Value::text("Internal Medicine")]);
}

#[test]
fn test_analysis_over_cleaned_table() {
    let settings = Settings::default();
    let amounts = (1..=40).map(|i| {
        let state = if i % 2 == 0 { "NY" } else { "CA" };
        payment(&format!("${i},000.00"), i % 7, state, "Smith")
    });
    let mut source = MemoryPageSource::new(vec![amounts.collect(), vec![]]);
    let cleaned =
        fetch_and_clean(&mut source, &settings.fetch_options(), &settings.cleaning).unwrap();

    let lo = cleaned.report.lower_bound.unwrap();
    let hi = cleaned.report.upper_bound.unwrap();
    let amounts = cleaned
        .table
        .numbers(&settings.cleaning.amount_column)
        .unwrap();
    assert!(!amounts.is_empty());
    assert!(amounts.iter().all(|n| *n > 0.0 && *n <= settings.cleaning.upper_cap));
    assert!(amounts.iter().all(|n| *n >= lo && *n <= hi));

    let bins = bin_distribution(
        &cleaned.table,
        &settings.cleaning.amount_column,
        &BinParams::parse(None, Some("50000")).unwrap(),
    )
    .unwrap();
    assert_eq!(bins.counts.iter().sum::<usize>(), cleaned.table.height());
    assert!((bins.range_max - 50_000.0).abs() < f64::EPSILON);

    let per_state = count_distinct_by(
        &cleaned.table,
        "principal_investigator_1_state",
        &settings.search.id_column,
        CountRange::default(),
        true,
    )
    .unwrap();
    assert_eq!(per_state.len(), 2);
    assert!(per_state.groups.iter().all(|g| g.count <= 7));

    let everything = search(&cleaned.table, &settings.search, &SearchCriteria::default()).unwrap();
    assert_eq!(everything, SearchOutcome::Matched(cleaned.table.clone()));

    let nobody = SearchCriteria {
        last_name: Some("Hopper".to_owned()),
        ..SearchCriteria::default()
    };
    assert_eq!(
        search(&cleaned.table, &settings.search, &nobody).unwrap(),
        SearchOutcome::NoMatches
    );
}

#[test]
fn test_schema_error_on_second_page() {
    let settings = Settings::default();
    let mut incomplete = payment("10", 1, "NY", "Smith");
    incomplete.remove("clinicaltrials_gov_identifier");
    let mut source = MemoryPageSource::new(vec![
        vec![payment("10", 1, "NY", "Smith")],
        vec![incomplete],
    ]);

    let err = fetch_and_clean(&mut source, &settings.fetch_options(), &settings.cleaning)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "The following columns are missing: clinicaltrials_gov_identifier"
    );
    assert!(matches!(err, PaystatError::Schema { .. }));
}

fn cell() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Missing),
        (-1e6_f64..1e6).prop_map(Value::Number),
        "[-$0-9.,a-z ]{0,10}".prop_map(Value::Text),
    ]
}

proptest! {
    #[test]
    fn prop_coerce_then_drop_is_idempotent(cells in proptest::collection::vec(cell(), 0..40)) {
        let table = Table::from_columns(vec![("n", cells)]).unwrap();
        let once = table.coerce_numeric("n").unwrap().drop_missing("n").unwrap();
        let twice = once.coerce_numeric("n").unwrap().drop_missing("n").unwrap();
        prop_assert_eq!(&once, &twice);
        prop_assert!(once.values("n").unwrap().iter().all(|v| v.as_f64().is_some()));
    }
}
