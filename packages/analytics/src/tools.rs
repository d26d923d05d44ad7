//! Analytics operations exposed to the HTTP layer.
//!
//! Each function re-fetches its inputs through the [`crate::sources`]
//! traits. Aggregation, ranking, and projection cannot fail on fetched
//! data; only the fetch itself can.

use preschool_analytics_models::{
    ANNUAL_GROWTH_RATE, CoverageResult, ProjectionResult, RankingResult,
};
use preschool_kindergarten_models::MunicipalityAggregate;

use crate::AnalyticsError;
use crate::aggregate::aggregate_by_municipality;
use crate::derive::occupancy;
use crate::sources::{AggregateSource, PopulationSource, RecordSource};

/// Aggregates every stored record by municipality.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the records cannot be fetched.
pub async fn list_municipality_aggregates<R: RecordSource>(
    records: &R,
) -> Result<Vec<MunicipalityAggregate>, AnalyticsError> {
    let records = records.fetch_all_records().await?;
    Ok(aggregate_by_municipality(&records))
}

/// Computes coverage from a known population figure and the aggregate
/// report.
///
/// A municipality with no aggregate has zero capacity, so its deficit is the
/// whole population and coverage is 0. Coverage is also 0 when the
/// population is not positive. The deficit saturates at the `i64` bounds.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn coverage_for(
    municipality: &str,
    population: i64,
    aggregates: &[MunicipalityAggregate],
) -> CoverageResult {
    let capacity = aggregates
        .iter()
        .find(|a| a.municipality == municipality)
        .map_or(0, |a| a.total_capacity);

    let coverage_percent = if population > 0 {
        capacity as f64 / population as f64 * 100.0
    } else {
        0.0
    };

    CoverageResult {
        municipality: municipality.to_string(),
        population,
        capacity,
        deficit: population.saturating_sub(capacity),
        coverage_percent,
    }
}

/// Measures kindergarten capacity against the child population of
/// `municipality`.
///
/// The population table is consulted first, so an unknown municipality is
/// reported without touching the aggregate source.
///
/// # Errors
///
/// Returns [`AnalyticsError::NotFound`] if the municipality has no
/// population figure, or the aggregate source's error if the report cannot
/// be fetched.
pub async fn coverage<P: PopulationSource, A: AggregateSource>(
    population: &P,
    aggregates: &A,
    municipality: &str,
) -> Result<CoverageResult, AnalyticsError> {
    let Some(children) = population.population_of(municipality) else {
        return Err(AnalyticsError::NotFound {
            municipality: municipality.to_string(),
        });
    };

    let report = aggregates.fetch_aggregates().await?;
    Ok(coverage_for(municipality, children, &report))
}

/// Orders aggregates by occupancy, highest first.
///
/// The sort is stable: municipalities with equal occupancy keep their
/// incoming (name-ascending) order.
pub fn rank_by_occupancy(aggregates: &mut [MunicipalityAggregate]) {
    aggregates.sort_by(|a, b| b.occupancy.total_cmp(&a.occupancy));
}

/// Fetches the aggregate report and ranks it by occupancy.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the report cannot be fetched.
pub async fn ranking<A: AggregateSource>(aggregates: &A) -> Result<RankingResult, AnalyticsError> {
    let mut report = aggregates.fetch_aggregates().await?;
    rank_by_occupancy(&mut report);
    Ok(report)
}

/// Grows enrollment by [`ANNUAL_GROWTH_RATE`] for `years` years.
///
/// Enrollment is truncated to a whole number after every year, then
/// occupancy is recomputed against the unchanged capacity. `years <= 0`
/// returns the aggregate untouched. The loop stops early once truncation
/// pins enrollment to a fixed point, which bounds it for any `years`.
#[must_use]
pub fn project_aggregate(aggregate: &MunicipalityAggregate, years: i64) -> MunicipalityAggregate {
    if years <= 0 {
        return aggregate.clone();
    }

    let mut enrolled = aggregate.total_enrolled;
    for _ in 0..years {
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        let next = (enrolled as f64 * (1.0 + ANNUAL_GROWTH_RATE)) as i64;
        if next == enrolled {
            break;
        }
        enrolled = next;
    }

    MunicipalityAggregate {
        total_enrolled: enrolled,
        occupancy: occupancy(aggregate.total_capacity, enrolled),
        ..aggregate.clone()
    }
}

/// Fetches the aggregate report and projects each entry `years` ahead.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the report cannot be fetched.
pub async fn projection<A: AggregateSource>(
    aggregates: &A,
    years: i64,
) -> Result<ProjectionResult, AnalyticsError> {
    let report = aggregates.fetch_aggregates().await?;
    Ok(report
        .iter()
        .map(|aggregate| project_aggregate(aggregate, years))
        .collect())
}
