#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the preschool services.
//!
//! Query parameters arrive as raw strings and are interpreted here, so the
//! handlers only see typed values.

use preschool_analytics_models::{KindergartenSort, ListKindergartensParams};
use preschool_kindergarten_models::{KindergartenType, ValidationError};
use serde::{Deserialize, Serialize};

/// Media type of the rendered municipality report.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Download name of the rendered municipality report.
pub const REPORT_FILENAME: &str = "municipality-report.pdf";

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
    /// Which service role answered.
    pub service: String,
}

/// Error body returned with every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable message.
    pub error: String,
}

impl ApiError {
    /// Creates an error body.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Query parameters for the kindergarten listing endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KindergartenQueryParams {
    /// Ownership type filter (`state` or `private`).
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Ordering: `free_seats` or `name`.
    pub sort: Option<String>,
}

impl KindergartenQueryParams {
    /// Interprets the raw parameters.
    ///
    /// An empty type means no filter. An unrecognized sort falls back to
    /// ordering by name.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidType`] if the type filter is not a
    /// known kindergarten type.
    pub fn to_list_params(&self) -> Result<ListKindergartensParams, ValidationError> {
        let kind = match self.kind.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.to_lowercase().parse::<KindergartenType>().map_err(
                |_| ValidationError::InvalidType {
                    value: raw.to_string(),
                },
            )?),
        };

        let sort = self
            .sort
            .as_deref()
            .and_then(|s| s.trim().parse::<KindergartenSort>().ok())
            .unwrap_or_default();

        Ok(ListKindergartensParams { kind, sort })
    }
}

/// Query parameters for the municipality report endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQueryParams {
    /// `pdf` requests the rendered document; anything else returns JSON.
    pub format: Option<String>,
}

impl ReportQueryParams {
    /// Whether the caller asked for the PDF rendition, either through
    /// `format=pdf` or an `Accept` header naming the PDF media type.
    #[must_use]
    pub fn wants_pdf(&self, accept: Option<&str>) -> bool {
        self.format
            .as_deref()
            .is_some_and(|f| f.eq_ignore_ascii_case("pdf"))
            || accept.is_some_and(|a| a.contains(PDF_MEDIA_TYPE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(kind: Option<&str>, sort: Option<&str>) -> KindergartenQueryParams {
        KindergartenQueryParams {
            kind: kind.map(str::to_string),
            sort: sort.map(str::to_string),
        }
    }

    #[test]
    fn parses_listing_filters() {
        let params = list(Some("Private"), Some("free_seats")).to_list_params().unwrap();
        assert_eq!(params.kind, Some(KindergartenType::Private));
        assert_eq!(params.sort, KindergartenSort::FreeSeats);
    }

    #[test]
    fn missing_filters_use_defaults() {
        assert_eq!(
            list(None, None).to_list_params().unwrap(),
            ListKindergartensParams::default()
        );
        assert_eq!(
            list(Some(" "), Some("capacity")).to_list_params().unwrap(),
            ListKindergartensParams::default()
        );
    }

    #[test]
    fn rejects_unknown_type() {
        assert_eq!(
            list(Some("municipal"), None).to_list_params().unwrap_err(),
            ValidationError::InvalidType {
                value: "municipal".to_string()
            }
        );
    }

    #[test]
    fn pdf_negotiation() {
        let pdf = ReportQueryParams {
            format: Some("PDF".to_string()),
        };
        let plain = ReportQueryParams::default();
        assert!(pdf.wants_pdf(None));
        assert!(!plain.wants_pdf(None));
        assert!(!plain.wants_pdf(Some("application/json")));
        assert!(plain.wants_pdf(Some("text/html, application/pdf;q=0.9")));
    }

    #[test]
    fn api_error_serializes_message() {
        let json = serde_json::to_string(&ApiError::new("not found")).unwrap();
        assert_eq!(json, r#"{"error":"not found"}"#);
    }
}
