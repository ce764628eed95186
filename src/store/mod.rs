//! Rating store: the read-only ratings table every query runs against.
//!
//! Built once at startup from the raw CSV tables (or their filtered
//! derivative) and shared by all requests without locking.

pub mod loader;
pub mod matrix;

pub use loader::DatasetSource;
pub use matrix::{build_rating_matrix, DuplicatePolicy, PopularityIndex, RatingMatrix};

use crate::error::DataIntegrityError;
use crate::models::{RatingObservation, StoreStats};

/// Filtered rating matrix together with its popularity counts
#[derive(Debug, Clone, PartialEq)]
pub struct RatingStore {
    matrix: RatingMatrix,
    popularity: PopularityIndex,
    min_rating_count: u64,
}

impl RatingStore {
    /// Builds the store from observations, failing if no title reaches
    /// `min_count`
    pub fn from_observations(
        observations: &[RatingObservation],
        min_count: u64,
        policy: DuplicatePolicy,
    ) -> Result<Self, DataIntegrityError> {
        let (matrix, popularity) = build_rating_matrix(observations, min_count, policy);
        if matrix.is_empty() {
            return Err(DataIntegrityError::Empty { min_count });
        }

        tracing::info!(
            titles = matrix.item_count(),
            users = matrix.user_count(),
            observations = popularity.total(),
            min_count,
            "Rating store built"
        );

        Ok(Self {
            matrix,
            popularity,
            min_rating_count: min_count,
        })
    }

    /// Loads observations from `source` and builds the store
    pub fn load(
        source: &DatasetSource,
        min_count: u64,
        policy: DuplicatePolicy,
    ) -> Result<Self, DataIntegrityError> {
        let observations = source.load_observations(min_count)?;
        Self::from_observations(&observations, min_count, policy)
    }

    pub fn matrix(&self) -> &RatingMatrix {
        &self.matrix
    }

    pub fn popularity(&self) -> &PopularityIndex {
        &self.popularity
    }

    pub fn min_rating_count(&self) -> u64 {
        self.min_rating_count
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            titles: self.matrix.item_count(),
            users: self.matrix.user_count(),
            observations: self.popularity.total(),
            min_rating_count: self.min_rating_count,
        }
    }
}
