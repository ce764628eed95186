use crate::error::RecommendError;
use crate::models::RankedTitle;
use crate::store::PopularityIndex;

use super::similarity::SimilarityVector;

/// Orders candidates by similarity weighted with popularity.
///
/// Each candidate's correlation is multiplied by its rating count, then
/// divided by the largest such product, so the top entry scores exactly 1.0.
/// A non-positive maximum has no meaningful normalization and is reported as
/// [`RecommendError::DegenerateRanking`]. Equal scores are ordered by title.
pub fn rank(
    sims: &SimilarityVector,
    popularity: &PopularityIndex,
) -> Result<Vec<RankedTitle>, RecommendError> {
    if sims.is_empty() {
        return Ok(Vec::new());
    }

    let weighted: Vec<(&str, f64)> = sims
        .iter()
        .map(|(title, sim)| {
            let count = popularity.get(title).unwrap_or(0);
            (title.as_str(), sim * count as f64)
        })
        .collect();

    let max = weighted
        .iter()
        .map(|&(_, score)| score)
        .fold(f64::NEG_INFINITY, f64::max);

    if !max.is_finite() || max <= 0.0 {
        return Err(RecommendError::DegenerateRanking { max });
    }

    let mut ranked: Vec<RankedTitle> = weighted
        .into_iter()
        .map(|(title, score)| RankedTitle {
            title: title.to_string(),
            score: score / max,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.title.cmp(&b.title))
    });

    Ok(ranked)
}
