#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Analytics parameter and result types.
//!
//! Defines the inputs and outputs of the coverage, ranking, projection, and
//! listing operations in `preschool_analytics`. Ranking and projection
//! return plain [`MunicipalityAggregate`] sequences, so only coverage has a
//! dedicated result type.

use preschool_kindergarten_models::{KindergartenType, MunicipalityAggregate};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Fixed annual enrollment growth used by projections.
pub const ANNUAL_GROWTH_RATE: f64 = 0.05;

/// Parameters for a coverage query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageParams {
    /// Municipality to compute coverage for.
    #[serde(default)]
    pub municipality: String,
}

/// Kindergarten capacity measured against the child population of one
/// municipality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageResult {
    /// Municipality name.
    pub municipality: String,
    /// Number of preschool-age children living in the municipality.
    pub population: i64,
    /// Total kindergarten capacity in the municipality.
    pub capacity: i64,
    /// `population - capacity`. Negative values mean surplus capacity.
    pub deficit: i64,
    /// `capacity / population * 100`.
    pub coverage_percent: f64,
}

/// Parameters for a projection query.
///
/// `years` is kept as raw text: anything that does not parse as an integer
/// projects zero years rather than rejecting the request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionParams {
    /// Number of years to project forward.
    pub years: Option<String>,
}

impl ProjectionParams {
    /// Returns the requested number of years, or 0 when missing or
    /// malformed.
    #[must_use]
    pub fn years(&self) -> i64 {
        self.years
            .as_deref()
            .and_then(|y| y.trim().parse().ok())
            .unwrap_or(0)
    }
}

/// Ordering for kindergarten listings.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum KindergartenSort {
    /// Case-insensitive name, ascending.
    #[default]
    Name,
    /// Free seats, most first.
    FreeSeats,
}

/// Filter and ordering for a kindergarten listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListKindergartensParams {
    /// Only include kindergartens of this type.
    pub kind: Option<KindergartenType>,
    /// Result ordering.
    pub sort: KindergartenSort,
}

/// Ranking result: aggregates ordered by occupancy, highest first.
pub type RankingResult = Vec<MunicipalityAggregate>;

/// Projection result: aggregates with enrollment grown forward.
pub type ProjectionResult = Vec<MunicipalityAggregate>;
