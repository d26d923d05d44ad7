//! Collaborator interfaces the analytics functions read from.
//!
//! Every analytics call fetches fresh data through these traits. The
//! concrete implementations are the local record store
//! ([`DatabaseRecords`]), local aggregation on top of any record source
//! ([`RecordAggregates`]), the population table
//! ([`crate::population::PopulationTable`]), and the peer preschool service
//! ([`crate::peer::PeerAggregateSource`]).

use std::sync::Arc;

use preschool_database::queries;
use preschool_kindergarten_models::{KindergartenRecord, MunicipalityAggregate};
use switchy_database::Database;

use crate::AnalyticsError;
use crate::aggregate::aggregate_by_municipality;

/// Supplies the full set of kindergarten records.
pub trait RecordSource: Send + Sync {
    /// Fetches every record.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError`] if the underlying store cannot be read.
    fn fetch_all_records(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<KindergartenRecord>, AnalyticsError>> + Send;
}

/// Supplies per-municipality aggregates, sorted by municipality name.
pub trait AggregateSource: Send + Sync {
    /// Fetches the aggregate report.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError`] if the report cannot be produced or
    /// fetched.
    fn fetch_aggregates(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<MunicipalityAggregate>, AnalyticsError>> + Send;
}

/// Supplies the number of preschool-age children per municipality.
pub trait PopulationSource: Send + Sync {
    /// Returns the population figure, or `None` if the municipality is not
    /// in the table.
    fn population_of(&self, municipality: &str) -> Option<i64>;
}

/// [`RecordSource`] backed by the `SQLite` record store.
#[derive(Clone)]
pub struct DatabaseRecords {
    db: Arc<dyn Database>,
}

impl DatabaseRecords {
    /// Wraps a record store connection.
    #[must_use]
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

impl std::fmt::Debug for DatabaseRecords {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseRecords").finish_non_exhaustive()
    }
}

impl RecordSource for DatabaseRecords {
    async fn fetch_all_records(&self) -> Result<Vec<KindergartenRecord>, AnalyticsError> {
        Ok(queries::fetch_all_kindergartens(self.db.as_ref()).await?)
    }
}

/// [`AggregateSource`] that aggregates a [`RecordSource`] locally.
#[derive(Debug, Clone)]
pub struct RecordAggregates<R> {
    records: R,
}

impl<R: RecordSource> RecordAggregates<R> {
    /// Aggregates records fetched from `records`.
    #[must_use]
    pub const fn new(records: R) -> Self {
        Self { records }
    }

    /// The wrapped record source.
    #[must_use]
    pub const fn records(&self) -> &R {
        &self.records
    }
}

impl<R: RecordSource> AggregateSource for RecordAggregates<R> {
    async fn fetch_aggregates(&self) -> Result<Vec<MunicipalityAggregate>, AnalyticsError> {
        let records = self.records.fetch_all_records().await?;
        Ok(aggregate_by_municipality(&records))
    }
}
