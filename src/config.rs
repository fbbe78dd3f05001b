use crate::analyser::logic::cleaning::CleaningPlan;
use crate::analyser::logic::search::SearchColumns;
use crate::error::{PaystatError, Result};
use crate::fetch::FetchOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_SOURCE_NAME: &str = "2023 Research Payments API";
pub const DEFAULT_ENDPOINT: &str =
    "https://openpaymentsdata.cms.gov/api/1/datastore/query/60f290ea-f990-5ef0-845f-68b3a91f45a1";

/// Columns every fetched page must carry. Pages are reduced to exactly these.
pub const REQUIRED_COLUMNS: [&str; 12] = [
    "total_amount_of_payment_usdollars",
    "principal_investigator_1_state",
    "form_of_payment_or_transfer_of_value",
    "name_of_drug_or_biological_or_device_or_medical_supply_1",
    "product_category_or_therapeutic_area_1",
    "principal_investigator_1_primary_type_1",
    "principal_investigator_1_specialty_1",
    "submitting_applicable_manufacturer_or_applicable_gpo_name",
    "principal_investigator_1_profile_id",
    "principal_investigator_1_first_name",
    "principal_investigator_1_last_name",
    "clinicaltrials_gov_identifier",
];

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Display name of the data source, used in log lines.
    pub source_name: String,
    pub endpoint: String,
    /// Records requested per page.
    pub page_limit: usize,
    /// Maximum records kept across all pages.
    pub record_cap: usize,
    pub request_timeout_secs: u64,
    pub required_columns: Vec<String>,
    pub cleaning: CleaningPlan,
    pub search: SearchColumns,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source_name: DEFAULT_SOURCE_NAME.to_owned(),
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            page_limit: 500,
            record_cap: 30_000,
            request_timeout_secs: 30,
            required_columns: REQUIRED_COLUMNS.iter().map(|c| (*c).to_owned()).collect(),
            cleaning: CleaningPlan::default(),
            search: SearchColumns::default(),
        }
    }
}

impl Settings {
    /// # Errors
    ///
    /// Returns `InvalidParameter` for a zero page size, cap or timeout, or
    /// an invalid cleaning plan.
    pub fn validate(&self) -> Result<()> {
        if self.page_limit == 0 {
            return Err(PaystatError::invalid_parameter(
                "page_limit",
                "must be at least 1",
            ));
        }
        if self.record_cap == 0 {
            return Err(PaystatError::invalid_parameter(
                "record_cap",
                "must be at least 1",
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(PaystatError::invalid_parameter(
                "request_timeout_secs",
                "must be at least 1",
            ));
        }
        self.cleaning.validate()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            limit: self.page_limit,
            cap: self.record_cap,
            required_columns: self.required_columns.clone(),
        }
    }
}

/// Loads settings from a JSON file, or the defaults when `path` is `None`.
/// Keys absent from the file keep their default values.
///
/// # Errors
///
/// Returns `Config` if the file cannot be read or parsed, and
/// `InvalidParameter` if the resulting settings fail validation.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let settings = match path {
        None => Settings::default(),
        Some(path) => {
            let content = std::fs::read_to_string(path).map_err(|e| {
                PaystatError::Config(format!("Failed to read {}: {e}", path.display()))
            })?;
            let settings: Settings = serde_json::from_str(&content)?;
            log::debug!("Loaded settings from {}", path.display());
            settings
        }
    };
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    #![expect(clippy::unwrap_used)]

    use super::*;
    use crate::analyser::logic::cleaning::TextNormalization;
    use pretty_assertions::assert_eq;
    use std::io::Write as _;

    #[test]
    fn test_defaults() {
        let settings = load_settings(None).unwrap();
        assert_eq!(settings.page_limit, 500);
        assert_eq!(settings.record_cap, 30_000);
        assert_eq!(settings.required_columns.len(), 12);
        assert_eq!(settings.fetch_options().cap, 30_000);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "record_cap": 1000,
                "cleaning": {{
                    "upper_cap": 50000,
                    "text_normalization": {{ "mode": "strip_through_marker", "marker": "Physician" }}
                }}
            }}"#
        )
        .unwrap();

        let settings = load_settings(Some(file.path())).unwrap();
        assert_eq!(settings.record_cap, 1000);
        assert_eq!(settings.page_limit, 500);
        assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);
        assert!((settings.cleaning.upper_cap - 50_000.0).abs() < f64::EPSILON);
        assert_eq!(
            settings.cleaning.amount_column,
            "total_amount_of_payment_usdollars"
        );
        assert_eq!(
            settings.cleaning.text_normalization,
            TextNormalization::StripThroughMarker {
                marker: "Physician".to_owned()
            }
        );
    }

    #[test]
    fn test_invalid_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            load_settings(Some(file.path())).unwrap_err(),
            PaystatError::Config(_)
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "page_limit": 0 }}"#).unwrap();
        assert!(matches!(
            load_settings(Some(file.path())).unwrap_err(),
            PaystatError::InvalidParameter { .. }
        ));

        assert!(matches!(
            load_settings(Some(Path::new("/definitely/not/here.json"))).unwrap_err(),
            PaystatError::Config(_)
        ));
    }
}
