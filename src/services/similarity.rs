use std::collections::{BTreeMap, HashMap};

use crate::error::RecommendError;
use crate::store::RatingMatrix;

/// Pearson correlation of every co-rated title with a query title
pub type SimilarityVector = BTreeMap<String, f64>;

/// Correlates the query title's ratings with every other title's ratings.
///
/// Only users who rated both titles contribute. Titles with fewer than two
/// such users, or whose overlap has no variance on either side, are left
/// out rather than scored as zero. The query title never appears in the
/// result.
///
/// The work is driven from the query's raters: each rater's row is scanned
/// once, so titles that share no raters with the query are never touched.
pub fn similarity(matrix: &RatingMatrix, query: &str) -> Result<SimilarityVector, RecommendError> {
    let query_idx = matrix
        .index_of(query)
        .ok_or_else(|| RecommendError::UnknownItem(query.to_string()))?;

    let mut overlaps: HashMap<usize, Vec<(f64, f64)>> = HashMap::new();
    for (&user, &query_rating) in matrix.column_at(query_idx) {
        for &(idx, rating) in matrix.row(user) {
            if idx != query_idx {
                overlaps.entry(idx).or_default().push((query_rating, rating));
            }
        }
    }

    let sims: SimilarityVector = overlaps
        .into_iter()
        .filter_map(|(idx, pairs)| pearson(&pairs).map(|r| (matrix.title(idx).to_string(), r)))
        .collect();

    tracing::debug!(
        query,
        co_rated = sims.len(),
        "Computed item similarities"
    );

    Ok(sims)
}

/// Pearson correlation of paired samples, or `None` when it is undefined
/// (fewer than two pairs, or a constant side).
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    let (first_x, first_y) = *pairs.first()?;
    if pairs.len() < 2
        || pairs.iter().all(|&(x, _)| x == first_x)
        || pairs.iter().all(|&(_, y)| y == first_y)
    {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|&(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|&(_, y)| y).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for &(x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }

    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RatingObservation;
    use crate::store::{build_rating_matrix, DuplicatePolicy};

    fn matrix(rows: &[(u32, &str, f64)]) -> RatingMatrix {
        let observations: Vec<RatingObservation> = rows
            .iter()
            .map(|&(user, title, rating)| RatingObservation::new(user, title, rating))
            .collect();
        build_rating_matrix(&observations, 1, DuplicatePolicy::Mean).0
    }

    #[test]
    fn test_pearson_known_values() {
        let identical = pearson(&[(1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]).unwrap();
        assert!((identical - 1.0).abs() < 1e-12);

        let inverse = pearson(&[(1.0, 3.0), (2.0, 2.0), (3.0, 1.0)]).unwrap();
        assert!((inverse + 1.0).abs() < 1e-12);

        // x = [1, 2, 3, 4], y = [2, 1, 4, 3] -> r = 0.6
        let partial = pearson(&[(1.0, 2.0), (2.0, 1.0), (3.0, 4.0), (4.0, 3.0)]).unwrap();
        assert!((partial - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_undefined() {
        assert_eq!(pearson(&[]), None);
        assert_eq!(pearson(&[(1.0, 2.0)]), None);
        assert_eq!(pearson(&[(3.0, 1.0), (3.0, 2.0), (3.0, 5.0)]), None);
        assert_eq!(pearson(&[(1.0, 4.0), (2.0, 4.0)]), None);
    }

    #[test]
    fn test_similarity_restricts_to_shared_raters() {
        let m = matrix(&[
            (1, "A", 5.0),
            (2, "A", 3.0),
            (3, "A", 1.0),
            (1, "B", 4.0),
            (2, "B", 3.0),
            (3, "B", 2.0),
            // C shares a single rater with A
            (1, "C", 5.0),
            (4, "C", 1.0),
            // D shares raters but is rated constantly
            (1, "D", 3.0),
            (2, "D", 3.0),
            // E shares no raters
            (5, "E", 2.0),
            (6, "E", 4.0),
        ]);

        let sims = similarity(&m, "A").unwrap();
        assert_eq!(sims.keys().collect::<Vec<_>>(), vec!["B"]);
        assert!((sims["B"] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_similarity_excludes_query_and_stays_bounded() {
        let m = matrix(&[
            (1, "A", 5.0),
            (2, "A", 1.0),
            (3, "A", 4.0),
            (1, "B", 1.0),
            (2, "B", 5.0),
            (3, "B", 2.0),
            (1, "C", 4.5),
            (2, "C", 2.0),
            (3, "C", 3.0),
        ]);

        let sims = similarity(&m, "A").unwrap();
        assert!(!sims.contains_key("A"));
        assert_eq!(sims.len(), 2);
        for score in sims.values() {
            assert!((-1.0..=1.0).contains(score));
        }
        assert!(sims["B"] < 0.0);
        assert!(sims["C"] > 0.0);
    }

    #[test]
    fn test_similarity_unknown_item() {
        let m = matrix(&[(1, "A", 5.0)]);
        assert_eq!(
            similarity(&m, "Z"),
            Err(RecommendError::UnknownItem("Z".to_string()))
        );
    }
}
