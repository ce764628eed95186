use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::Mutex;

use crate::services::Recommender;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Read-only after startup; handlers share it without locking
    pub recommender: Arc<Recommender>,
    rng: Arc<Mutex<StdRng>>,
}

impl AppState {
    /// Wraps a recommender, seeding selection from `seed` or from entropy
    pub fn new(recommender: Recommender, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            recommender: Arc::new(recommender),
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    /// Seed for one request's selection RNG, drawn from the shared RNG so a
    /// fixed startup seed gives a reproducible sequence of picks
    pub async fn next_seed(&self) -> u64 {
        self.rng.lock().await.gen()
    }
}
