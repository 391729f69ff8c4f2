//! HTTP endpoints:
//! - GET /api/filters - selectable years and malls
//! - GET /api/top3    - per-month top captions for one mall
//! - anything else    - static files from the public directory

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::error::DashboardError;
use crate::filters::FilterService;
use crate::models::{FilterSet, Top3Report};
use crate::report::ReportOrchestrator;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub filters: FilterService,
    pub reports: ReportOrchestrator,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            filters: FilterService::new(store.clone()),
            reports: ReportOrchestrator::new(store),
        }
    }
}

pub fn router(state: AppState, public_dir: PathBuf) -> Router {
    Router::new()
        .route("/api/filters", get(filters))
        .route("/api/top3", get(top3))
        .fallback_service(ServeDir::new(public_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: AppState, port: u16, public_dir: PathBuf) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Dashboard server running on http://localhost:{port}");

    axum::serve(listener, router(state, public_dir)).await?;
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
pub struct Top3Params {
    pub year: Option<String>,
    pub mall: Option<String>,
    pub month: Option<String>,
}

impl Top3Params {
    /// Resolve the raw query string into (year, mall, month filter).
    pub fn resolve(self) -> Result<(i32, String, Option<u32>), DashboardError> {
        let required = || DashboardError::InvalidRequest("year and mall are required".to_string());

        let year = self
            .year
            .as_deref()
            .map(str::trim)
            .and_then(|value| value.parse::<i32>().ok())
            .filter(|year| *year != 0)
            .ok_or_else(required)?;
        let mall = self
            .mall
            .filter(|mall| !mall.trim().is_empty())
            .ok_or_else(required)?;

        let month = match self.month.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) => Some(value.parse::<u32>().map_err(|_| {
                DashboardError::InvalidRequest(format!("month must be between 1 and 12, got {value}"))
            })?),
        };

        Ok((year, mall, month))
    }
}

#[tracing::instrument(skip_all, fields(request_id = %Uuid::new_v4()))]
async fn filters(State(state): State<AppState>) -> Result<Json<FilterSet>, DashboardError> {
    let filters = state.filters.compute_filters().await?;
    tracing::info!(years = filters.years.len(), malls = filters.malls.len(), "filters computed");
    Ok(Json(filters))
}

#[tracing::instrument(skip_all, fields(request_id = %Uuid::new_v4()))]
async fn top3(
    State(state): State<AppState>,
    Query(params): Query<Top3Params>,
) -> Result<Json<Top3Report>, DashboardError> {
    let (year, mall, month) = params.resolve()?;
    let report = state.reports.build_report(year, &mall, month).await?;
    tracing::info!(year, mall = %report.mall, months = report.monthly.len(), "report built");
    Ok(Json(report))
}
