use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Failures while loading or building the rating store.
///
/// All of these are fatal at startup: the service must not serve queries
/// from a partially loaded dataset.
#[derive(thiserror::Error, Debug)]
pub enum DataIntegrityError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed CSV in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{} is missing required column '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("{}:{line}: invalid {column} value '{value}'", path.display())]
    InvalidField {
        path: PathBuf,
        line: u64,
        column: &'static str,
        value: String,
    },

    #[error("{} lists movieId {movie_id} more than once", path.display())]
    DuplicateItemKey { path: PathBuf, movie_id: u32 },

    #[error(
        "{} lists {expected} ratings for '{title}' but holds {found}",
        path.display()
    )]
    IncompleteDataset {
        path: PathBuf,
        title: String,
        expected: u64,
        found: u64,
    },

    #[error("No ratings survived the minimum count of {min_count}")]
    Empty { min_count: u64 },
}

/// Failures in the query path. `Recommender::recommend` downgrades these to
/// a miss with a diagnostic instead of returning them.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RecommendError {
    #[error("'{0}' is not a rated title")]
    UnknownItem(String),

    #[error("'{0}' shares no raters with any other title")]
    NoSimilarItems(String),

    #[error("Ranking is degenerate: maximum weighted score is {max}")]
    DegenerateRanking { max: f64 },
}

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Ranking error: {0}")]
    Ranking(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<RecommendError> for AppError {
    fn from(err: RecommendError) -> Self {
        match err {
            RecommendError::UnknownItem(_) => AppError::NotFound(err.to_string()),
            RecommendError::NoSimilarItems(_) | RecommendError::DegenerateRanking { .. } => {
                AppError::Ranking(err.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Ranking(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
