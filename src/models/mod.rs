use serde::{Deserialize, Serialize};

/// Identifier of a rating user as found in the ratings table
pub type UserId = u32;

/// A single rating of a movie title by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingObservation {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub title: String,
    pub rating: f64,
}

impl RatingObservation {
    pub fn new(user_id: UserId, title: impl Into<String>, rating: f64) -> Self {
        Self {
            user_id,
            title: title.into(),
            rating,
        }
    }
}

/// One entry of a popularity-weighted ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedTitle {
    pub title: String,
    /// Weighted score divided by the best weighted score; the top entry is 1.0
    pub score: f64,
}

/// Outcome of a recommendation query
#[derive(Debug, Clone, PartialEq)]
pub enum RecommendationResult {
    /// The query matched a title and a neighbor was picked
    Hit { title: String },
    /// No recommendation could be made
    Miss {
        /// Closest known title when the query was not an exact match
        suggestion: Option<String>,
        /// Why the ranking failed when the query did match
        diagnostic: Option<String>,
    },
}

impl RecommendationResult {
    /// Renders the result as a line of user-facing text
    pub fn message(&self) -> String {
        match self {
            RecommendationResult::Hit { title } => format!("Recommendation: {}", title),
            RecommendationResult::Miss {
                suggestion: Some(suggestion),
                ..
            } => format!(
                "This entry does not match any movie in the database. Did you mean: {}",
                suggestion
            ),
            RecommendationResult::Miss {
                suggestion: None,
                diagnostic: Some(_),
            } => "No recommendation could be made for this movie".to_string(),
            RecommendationResult::Miss { .. } => {
                "This movie doesn't seem to be in our list".to_string()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Hit,
    Miss,
}

/// Query for the recommendation endpoint
#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub title: String,
}

/// Response of the recommendation endpoint
#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub query: String,
    pub outcome: Outcome,
    pub recommendation: Option<String>,
    pub suggestion: Option<String>,
    pub diagnostic: Option<String>,
    pub message: String,
}

impl RecommendationResponse {
    pub fn new(query: String, result: RecommendationResult) -> Self {
        let message = result.message();
        match result {
            RecommendationResult::Hit { title } => Self {
                query,
                outcome: Outcome::Hit,
                recommendation: Some(title),
                suggestion: None,
                diagnostic: None,
                message,
            },
            RecommendationResult::Miss {
                suggestion,
                diagnostic,
            } => Self {
                query,
                outcome: Outcome::Miss,
                recommendation: None,
                suggestion,
                diagnostic,
                message,
            },
        }
    }
}

/// Query for the similar-titles endpoint
#[derive(Debug, Deserialize)]
pub struct SimilarQuery {
    pub title: String,
    #[serde(default = "default_similar_limit")]
    pub limit: usize,
}

fn default_similar_limit() -> usize {
    10
}

/// Query for the suggestion endpoint
#[derive(Debug, Deserialize)]
pub struct SuggestQuery {
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct SuggestResponse {
    pub query: String,
    pub suggestion: Option<String>,
}

/// Size of the loaded rating store
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StoreStats {
    pub titles: usize,
    pub users: usize,
    pub observations: u64,
    pub min_rating_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_message() {
        let hit = RecommendationResult::Hit {
            title: "Toy Story (1995)".to_string(),
        };
        assert_eq!(hit.message(), "Recommendation: Toy Story (1995)");
    }

    #[test]
    fn test_miss_messages() {
        let with_suggestion = RecommendationResult::Miss {
            suggestion: Some("Jumanji (1995)".to_string()),
            diagnostic: None,
        };
        assert!(with_suggestion.message().ends_with("Did you mean: Jumanji (1995)"));

        let nothing = RecommendationResult::Miss {
            suggestion: None,
            diagnostic: None,
        };
        assert_eq!(nothing.message(), "This movie doesn't seem to be in our list");
    }

    #[test]
    fn test_response_from_hit() {
        let response = RecommendationResponse::new(
            "Heat (1995)".to_string(),
            RecommendationResult::Hit {
                title: "Casino (1995)".to_string(),
            },
        );
        assert_eq!(response.outcome, Outcome::Hit);
        assert_eq!(response.recommendation.as_deref(), Some("Casino (1995)"));
        assert_eq!(response.suggestion, None);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["outcome"], "hit");
    }

    #[test]
    fn test_observation_serialization() {
        let obs = RatingObservation::new(3, "Heat (1995)", 4.5);
        let json = serde_json::to_value(&obs).unwrap();
        assert_eq!(json["userId"], 3);
        assert_eq!(json["title"], "Heat (1995)");
    }
}
