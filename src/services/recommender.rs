use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::RecommendError;
use crate::models::{RankedTitle, RecommendationResult};
use crate::store::RatingStore;

use super::{fuzzy, ranking, similarity};

/// Tunables for turning a ranking into a single recommendation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionSettings {
    /// Size of the top band the recommendation is drawn from
    pub top_k: usize,
    /// Minimum fuzzy ratio for a "did you mean" suggestion
    pub suggestion_threshold: f64,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            top_k: 4,
            suggestion_threshold: 0.5,
        }
    }
}

/// Item-based recommender over a fixed rating store
#[derive(Debug)]
pub struct Recommender {
    store: RatingStore,
    settings: SelectionSettings,
}

impl Recommender {
    pub fn new(store: RatingStore, settings: SelectionSettings) -> Self {
        Self { store, settings }
    }

    pub fn store(&self) -> &RatingStore {
        &self.store
    }

    /// Popularity-weighted ranking of the titles similar to `title`.
    ///
    /// `title` must be an exact title in the store.
    pub fn similar(&self, title: &str) -> Result<Vec<RankedTitle>, RecommendError> {
        let sims = similarity::similarity(self.store.matrix(), title)?;
        if sims.is_empty() {
            return Err(RecommendError::NoSimilarItems(title.to_string()));
        }
        ranking::rank(&sims, self.store.popularity())
    }

    /// Closest known title to `query`, if any is close enough
    pub fn suggest(&self, query: &str) -> Option<String> {
        fuzzy::resolve(
            query,
            self.store.matrix().titles(),
            self.settings.suggestion_threshold,
        )
    }

    /// Recommends one title for someone who liked `query`.
    ///
    /// An exact title match yields a random pick from the top of its
    /// ranking. Anything else yields a miss, carrying the closest known
    /// title when the query was not recognized, or a diagnostic when the
    /// ranking could not be built.
    pub fn recommend<R: Rng + ?Sized>(&self, query: &str, rng: &mut R) -> RecommendationResult {
        if !self.store.matrix().contains(query) {
            let suggestion = self.suggest(query);
            tracing::info!(
                query,
                suggestion = suggestion.as_deref().unwrap_or(""),
                "Query did not match a known title"
            );
            return RecommendationResult::Miss {
                suggestion,
                diagnostic: None,
            };
        }

        let ranked = match self.similar(query) {
            Ok(ranked) => ranked,
            Err(e) => {
                tracing::warn!(query, error = %e, "Could not rank similar titles");
                return RecommendationResult::Miss {
                    suggestion: None,
                    diagnostic: Some(e.to_string()),
                };
            }
        };

        match select_top_k(&ranked, self.settings.top_k, rng) {
            Some(pick) => {
                tracing::info!(
                    query,
                    candidates = ranked.len(),
                    recommendation = %pick.title,
                    score = pick.score,
                    "Recommendation selected"
                );
                RecommendationResult::Hit {
                    title: pick.title.clone(),
                }
            }
            None => RecommendationResult::Miss {
                suggestion: None,
                diagnostic: Some(RecommendError::NoSimilarItems(query.to_string()).to_string()),
            },
        }
    }
}

/// Uniform pick among the first `k` entries of `ranked`
pub fn select_top_k<'a, R: Rng + ?Sized>(
    ranked: &'a [RankedTitle],
    k: usize,
    rng: &mut R,
) -> Option<&'a RankedTitle> {
    ranked[..k.min(ranked.len())].choose(rng)
}
