use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Postgres SQLSTATE for `undefined_table`.
const UNDEFINED_TABLE: &str = "42P01";

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// The caller supplied a selection that cannot be resolved.
    #[error("{0}")]
    InvalidRequest(String),
    /// The named partition relation does not exist in the store.
    #[error("relation \"{0}\" does not exist")]
    MissingPartition(String),
    /// Any other failure talking to the store.
    #[error("{0}")]
    StoreUnavailable(#[source] sqlx::Error),
}

impl DashboardError {
    /// Classify a store error raised while reading `relation`.
    pub fn from_store(relation: &str, err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNDEFINED_TABLE) => {
                DashboardError::MissingPartition(relation.to_string())
            }
            _ => DashboardError::StoreUnavailable(err),
        }
    }

    pub fn is_missing_partition(&self) -> bool {
        matches!(self, DashboardError::MissingPartition(_))
    }
}

impl From<sqlx::Error> for DashboardError {
    fn from(err: sqlx::Error) -> Self {
        DashboardError::StoreUnavailable(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = match &self {
            DashboardError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            DashboardError::MissingPartition(_) | DashboardError::StoreUnavailable(_) => {
                tracing::error!(error = %self, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorBody {
            error: self.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}
