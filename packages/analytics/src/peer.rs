//! HTTP client for the municipality report of a peer preschool service.

use std::time::Duration;

use preschool_kindergarten_models::MunicipalityAggregate;

use crate::AnalyticsError;
use crate::sources::AggregateSource;

/// Path of the municipality report on a preschool service.
pub const REPORT_PATH: &str = "/api/reports/municipalities";

/// Default request timeout for peer calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// [`AggregateSource`] that fetches the JSON municipality report from
/// another preschool service instance.
///
/// Each call issues exactly one request. Failures are returned as-is with
/// no retry.
#[derive(Debug, Clone)]
pub struct PeerAggregateSource {
    client: reqwest::Client,
    report_url: String,
}

impl PeerAggregateSource {
    /// Creates a client for the service at `base_url` (e.g.
    /// `"http://preschool:8081"`), bounding every request by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AnalyticsError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            report_url: report_url(base_url),
        })
    }

    /// The full URL that will be requested.
    #[must_use]
    pub fn report_url(&self) -> &str {
        &self.report_url
    }
}

fn report_url(base_url: &str) -> String {
    format!("{}{REPORT_PATH}", base_url.trim_end_matches('/'))
}

impl AggregateSource for PeerAggregateSource {
    async fn fetch_aggregates(&self) -> Result<Vec<MunicipalityAggregate>, AnalyticsError> {
        let response = self
            .client
            .get(&self.report_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?
            .error_for_status()?;

        let aggregates: Vec<MunicipalityAggregate> = response.json().await?;

        log::debug!(
            "Fetched {} municipality aggregates from {}",
            aggregates.len(),
            self.report_url
        );

        Ok(aggregates)
    }
}
