use std::path::PathBuf;

use serde::Deserialize;

use crate::store::DuplicatePolicy;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Raw ratings table (userId, movieId, rating)
    #[serde(default = "default_ratings_path")]
    pub ratings_path: PathBuf,

    /// Raw movies table (movieId, title)
    #[serde(default = "default_movies_path")]
    pub movies_path: PathBuf,

    /// Directory holding the derived filtered dataset
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Minimum number of ratings a title needs to be recommendable
    #[serde(default = "default_min_rating_count")]
    pub min_rating_count: u64,

    /// Number of top-ranked titles the recommendation is drawn from
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum string similarity for a "did you mean" suggestion
    #[serde(default = "default_suggestion_threshold")]
    pub suggestion_threshold: f64,

    /// How repeated (user, title) ratings are combined
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,

    /// Fixed seed for the selection RNG; entropy when unset
    #[serde(default)]
    pub rng_seed: Option<u64>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_ratings_path() -> PathBuf {
    PathBuf::from("ratings.csv")
}

fn default_movies_path() -> PathBuf {
    PathBuf::from("movies.csv")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_min_rating_count() -> u64 {
    1000
}

fn default_top_k() -> usize {
    4
}

fn default_suggestion_threshold() -> f64 {
    0.5
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the recommender cannot work with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.min_rating_count == 0 {
            anyhow::bail!("MIN_RATING_COUNT must be at least 1");
        }
        if self.top_k == 0 {
            anyhow::bail!("TOP_K must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.suggestion_threshold) {
            anyhow::bail!(
                "SUGGESTION_THRESHOLD must be within [0, 1], got {}",
                self.suggestion_threshold
            );
        }
        Ok(())
    }

    /// Listen address in `host:port` form
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()));
        envy::from_iter::<_, Config>(vars).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = from_pairs(&[]);
        assert_eq!(config.min_rating_count, 1000);
        assert_eq!(config.top_k, 4);
        assert_eq!(config.suggestion_threshold, 0.5);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Mean);
        assert_eq!(config.rng_seed, None);
        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("MIN_RATING_COUNT", "50"),
            ("TOP_K", "1"),
            ("DUPLICATE_POLICY", "last"),
            ("RNG_SEED", "7"),
            ("PORT", "8080"),
        ]);
        assert_eq!(config.min_rating_count, 50);
        assert_eq!(config.top_k, 1);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Last);
        assert_eq!(config.rng_seed, Some(7));
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = from_pairs(&[]);
        config.top_k = 0;
        assert!(config.validate().is_err());

        let mut config = from_pairs(&[]);
        config.suggestion_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = from_pairs(&[]);
        config.min_rating_count = 0;
        assert!(config.validate().is_err());
    }
}
