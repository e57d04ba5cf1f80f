use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use crate::{
    catalog::{Catalog, Country, CountryInfo, CountryListing},
    error::SimulationError,
    projection::{project, ProjectionOptions, ProjectionReport},
    scenario::{Scenario, ScenarioLoader},
};

/// Where each request gets its country catalog from.
pub enum CatalogSource {
    /// Re-read on every request so edits apply without a restart.
    File {
        loader: ScenarioLoader,
        path: PathBuf,
    },
    Fixed(Catalog),
}

impl CatalogSource {
    fn current(&self) -> Result<Catalog> {
        match self {
            CatalogSource::File { loader, path } => loader.load_catalog(path),
            CatalogSource::Fixed(catalog) => Ok(catalog.clone()),
        }
    }
}

struct AppState {
    source: CatalogSource,
}

pub struct WebServerConfig {
    pub source: CatalogSource,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error("failed to load scenario: {0:#}")]
    Load(anyhow::Error),
    #[error(transparent)]
    Invalid(#[from] SimulationError),
    #[error("unknown country '{0}'")]
    UnknownCountry(String),
    #[error("projection task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::UnknownCountry(_) => StatusCode::NOT_FOUND,
            ApiError::Load(_) | ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let error = self.to_string();
        tracing::warn!(%status, %error, "request rejected");
        (status, Json(ErrorBody { error })).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
struct PopulationQuery {
    country: Option<String>,
    migration: Option<String>,
}

impl PopulationQuery {
    fn options(&self) -> ProjectionOptions {
        let off = self
            .migration
            .as_deref()
            .is_some_and(|value| value.eq_ignore_ascii_case("off"));
        ProjectionOptions { migration: !off }
    }
}

#[derive(Debug, Default, Deserialize)]
struct CountryQuery {
    country: Option<String>,
}

#[derive(Serialize)]
struct CountryProjection {
    country: CountryInfo,
    #[serde(flatten)]
    report: ProjectionReport,
}

pub fn router(source: CatalogSource) -> Router {
    let state = Arc::new(AppState { source });
    Router::new()
        .route("/api/population", get(population))
        .route("/api/countries", get(countries))
        .route("/config.json", get(config))
        .with_state(state)
}

pub async fn run(config: WebServerConfig) -> Result<()> {
    let WebServerConfig { source, host, port } = config;

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid listen address {host}:{port}"))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(%addr, "population projection service listening");
    axum::serve(listener, router(source))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutting down");
}

fn load_catalog(state: &AppState) -> Result<Catalog, ApiError> {
    let catalog = state.source.current().map_err(ApiError::Load)?;
    catalog.validate()?;
    Ok(catalog)
}

fn select_country(catalog: Catalog, slug: Option<&str>) -> Result<Country, ApiError> {
    match catalog.select(slug) {
        Some(country) => Ok(country.clone()),
        None => Err(ApiError::UnknownCountry(
            slug.unwrap_or(&catalog.default).to_string(),
        )),
    }
}

async fn population(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PopulationQuery>,
) -> Result<Json<CountryProjection>, ApiError> {
    let options = query.options();
    let response = tokio::task::spawn_blocking(move || -> Result<CountryProjection, ApiError> {
        let country = select_country(load_catalog(&state)?, query.country.as_deref())?;
        let report = project(&country.scenario, options)?.report();
        Ok(CountryProjection {
            country: country.info(),
            report,
        })
    })
    .await??;
    Ok(Json(response))
}

async fn countries(State(state): State<Arc<AppState>>) -> Result<Json<CountryListing>, ApiError> {
    let catalog = tokio::task::spawn_blocking(move || load_catalog(&state)).await??;
    Ok(Json(catalog.listing()))
}

async fn config(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CountryQuery>,
) -> Result<Json<Scenario>, ApiError> {
    let country = tokio::task::spawn_blocking(move || {
        select_country(load_catalog(&state)?, query.country.as_deref())
    })
    .await??;
    Ok(Json(country.scenario))
}
