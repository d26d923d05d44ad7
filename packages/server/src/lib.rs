#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web services for preschool capacity tracking.
//!
//! The same binary runs one of two roles:
//!
//! - **preschool**: kindergarten CRUD, derived listings, the critical list,
//!   and the municipality report (JSON or PDF), backed by a `SQLite`
//!   record store. Creating, updating, and deleting records requires a
//!   bearer token from `/api/auth/login`.
//! - **analytics**: coverage, ranking, and projection over the municipality
//!   report, fetched either from a peer preschool service or aggregated
//!   from a local record store.

pub mod auth;
pub mod config;
mod handlers;

use std::path::Path;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use preschool_analytics::AnalyticsError;
use preschool_analytics::peer::PeerAggregateSource;
use preschool_analytics::population::PopulationTable;
use preschool_analytics::sources::{AggregateSource, DatabaseRecords, RecordAggregates};
use preschool_auth::Authenticator;
use preschool_database::{DbError, db, queries};
use preschool_kindergarten_models::MunicipalityAggregate;
use switchy_database::Database;
use thiserror::Error;

use crate::config::{ServerConfig, ServiceRole};

const DEV_JWT_SECRET: &str = "dev-secret";

/// Errors that prevent a service from starting.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The record store could not be opened or seeded.
    #[error(transparent)]
    Database(#[from] DbError),

    /// The population table or peer client could not be set up.
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    /// The HTTP server failed to bind or run.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Shared state of the preschool service.
pub struct AppState {
    /// Kindergarten and user account store.
    pub db: Arc<dyn Database>,
    /// Password hashing and token signing.
    pub auth: Arc<Authenticator>,
}

impl AppState {
    /// Record source over the store, for the analytics pipeline.
    #[must_use]
    pub fn records(&self) -> DatabaseRecords {
        DatabaseRecords::new(Arc::clone(&self.db))
    }
}

/// Where the analytics service gets its municipality report from.
#[derive(Debug, Clone)]
pub enum AggregateBackend {
    /// A remote preschool service.
    Peer(PeerAggregateSource),
    /// A record store opened by this process.
    Local(RecordAggregates<DatabaseRecords>),
}

impl AggregateSource for AggregateBackend {
    async fn fetch_aggregates(&self) -> Result<Vec<MunicipalityAggregate>, AnalyticsError> {
        match self {
            Self::Peer(peer) => peer.fetch_aggregates().await,
            Self::Local(local) => local.fetch_aggregates().await,
        }
    }
}

/// Shared state of the analytics service.
pub struct AnalyticsState {
    /// Child population per municipality, loaded once at startup.
    pub population: Arc<PopulationTable>,
    /// Source of the municipality report.
    pub aggregates: AggregateBackend,
}

/// Registers the preschool service routes under `/api`.
pub fn configure_preschool(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::preschool_health))
            .route("/auth/register", web::post().to(handlers::register))
            .route("/auth/login", web::post().to(handlers::login))
            .route("/auth/profile", web::get().to(handlers::profile))
            .route("/kindergartens", web::get().to(handlers::list_kindergartens))
            .route("/kindergartens", web::post().to(handlers::create_kindergarten))
            .route(
                "/kindergartens/critical",
                web::get().to(handlers::critical_kindergartens),
            )
            .route("/kindergartens/{id}", web::get().to(handlers::get_kindergarten))
            .route("/kindergartens/{id}", web::put().to(handlers::update_kindergarten))
            .route(
                "/kindergartens/{id}",
                web::delete().to(handlers::delete_kindergarten),
            )
            .route(
                "/reports/municipalities",
                web::get().to(handlers::municipality_report),
            ),
    );
}

/// Registers the analytics service routes under `/api`.
pub fn configure_analytics(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::analytics_health))
            .route("/analytics/coverage", web::get().to(handlers::coverage))
            .route("/analytics/ranking", web::get().to(handlers::ranking))
            .route("/analytics/projection", web::get().to(handlers::projection)),
    );
}

async fn open_store(path: &Path) -> Result<Arc<dyn Database>, ServerError> {
    let db = db::open_db(path).await?;
    queries::seed_if_empty(db.as_ref()).await?;
    Ok(Arc::from(db))
}

/// Starts the preschool service.
///
/// Opens (and if empty, seeds) the record store, then serves until the
/// server is stopped. The caller provides the async runtime.
///
/// # Errors
///
/// Returns [`ServerError`] if the record store cannot be opened or the
/// server fails to bind.
#[allow(clippy::future_not_send)]
pub async fn run_preschool_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = open_store(&config.db_path).await?;
    if config.jwt_secret == DEV_JWT_SECRET {
        log::warn!("Signing access tokens with the development secret; set JWT_SECRET");
    }
    let auth = Arc::new(Authenticator::new(
        &config.jwt_secret,
        config.auth_salt,
        config.token_ttl,
    ));
    let state = web::Data::new(AppState { db, auth });

    log::info!(
        "Starting {} service on {}:{}",
        ServiceRole::Preschool.as_str(),
        config.bind_addr,
        config.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure_preschool)
    })
    .bind((config.bind_addr, config.port))?
    .run()
    .await?;

    Ok(())
}

/// Starts the analytics service.
///
/// Loads the population table, then uses the peer preschool service when
/// one is configured or the local record store otherwise.
///
/// # Errors
///
/// Returns [`ServerError`] if the population table or the report source
/// cannot be set up, or the server fails to bind.
#[allow(clippy::future_not_send)]
pub async fn run_analytics_server(config: ServerConfig) -> Result<(), ServerError> {
    let population = Arc::new(PopulationTable::from_path(&config.population_csv)?);

    let aggregates = if let Some(base_url) = &config.peer_base_url {
        let peer = PeerAggregateSource::new(base_url, config.peer_timeout)?;
        log::info!("Fetching municipality reports from {}", peer.report_url());
        AggregateBackend::Peer(peer)
    } else {
        log::info!("No peer configured, aggregating the local record store");
        let db = open_store(&config.db_path).await?;
        AggregateBackend::Local(RecordAggregates::new(DatabaseRecords::new(db)))
    };

    let state = web::Data::new(AnalyticsState {
        population,
        aggregates,
    });

    log::info!(
        "Starting {} service on {}:{}",
        ServiceRole::Analytics.as_str(),
        config.bind_addr,
        config.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure_analytics)
    })
    .bind((config.bind_addr, config.port))?
    .run()
    .await?;

    Ok(())
}
