#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Capacity analytics for kindergarten records.
//!
//! Raw records flow through three stages:
//!
//! 1. [`derive`] computes occupancy, free seats, and the critical flag for
//!    each record.
//! 2. [`aggregate`] groups records by municipality into capacity-weighted
//!    [`MunicipalityAggregate`](preschool_kindergarten_models::MunicipalityAggregate)s.
//! 3. [`tools`] answers coverage, ranking, and projection queries on top of
//!    those aggregates, and [`report`] renders them as a PDF.
//!
//! Data is pulled through the collaborator traits in [`sources`] on every
//! call. Nothing is cached and nothing is retried: the first failure is
//! returned to the caller.

pub mod aggregate;
pub mod derive;
pub mod peer;
pub mod population;
pub mod report;
pub mod sources;
pub mod tools;

use thiserror::Error;

/// Errors that can occur during analytics operations.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// The local record store failed.
    #[error("Record store error: {0}")]
    Database(#[from] preschool_database::DbError),

    /// The peer aggregate service could not be reached or answered badly.
    #[error("Peer request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The population table could not be parsed.
    #[error("Population data error: {0}")]
    Population(#[from] csv::Error),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A data source failed for another reason.
    #[error("Fetch failed: {message}")]
    Fetch {
        /// Description of what went wrong.
        message: String,
    },

    /// The municipality has no entry in the population table.
    #[error("Municipality not found in population data: {municipality}")]
    NotFound {
        /// The municipality that was looked up.
        municipality: String,
    },
}

impl AnalyticsError {
    /// Whether this error means the requested municipality is unknown, as
    /// opposed to a data source failure.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether this error came from a remote data source rather than the
    /// local record store.
    #[must_use]
    pub const fn is_upstream(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Fetch { .. })
    }
}
