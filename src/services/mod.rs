pub mod fuzzy;
pub mod ranking;
pub mod recommender;
pub mod similarity;

pub use recommender::{select_top_k, Recommender, SelectionSettings};
pub use similarity::SimilarityVector;
