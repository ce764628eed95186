use std::collections::BTreeMap;

use serde::Deserialize;

use crate::models::{RatingObservation, UserId};

/// How repeated ratings of the same title by the same user are combined
/// into a single matrix cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Average of all repeated ratings
    #[default]
    Mean,
    /// Rating that appeared first in the input
    First,
    /// Rating that appeared last in the input
    Last,
    /// Sum of all repeated ratings
    Sum,
}

#[derive(Debug, Clone, Copy)]
struct Cell {
    first: f64,
    last: f64,
    sum: f64,
    count: u32,
}

impl Cell {
    fn new(rating: f64) -> Self {
        Self {
            first: rating,
            last: rating,
            sum: rating,
            count: 1,
        }
    }

    fn push(&mut self, rating: f64) {
        self.last = rating;
        self.sum += rating;
        self.count += 1;
    }

    fn resolve(self, policy: DuplicatePolicy) -> f64 {
        match policy {
            DuplicatePolicy::Mean => self.sum / f64::from(self.count),
            DuplicatePolicy::First => self.first,
            DuplicatePolicy::Last => self.last,
            DuplicatePolicy::Sum => self.sum,
        }
    }
}

/// Sparse title x user rating matrix.
///
/// Titles are kept sorted and addressed by their position; each column maps
/// the users who rated that title to their rating, and each row lists the
/// titles a user rated. An unrated cell has no entry at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingMatrix {
    titles: Vec<String>,
    columns: Vec<BTreeMap<UserId, f64>>,
    rows: BTreeMap<UserId, Vec<(usize, f64)>>,
}

impl RatingMatrix {
    /// Position of `title` among the sorted titles
    pub fn index_of(&self, title: &str) -> Option<usize> {
        self.titles
            .binary_search_by(|t| t.as_str().cmp(title))
            .ok()
    }

    pub fn contains(&self, title: &str) -> bool {
        self.index_of(title).is_some()
    }

    pub fn title(&self, index: usize) -> &str {
        &self.titles[index]
    }

    /// All titles in ascending order
    pub fn titles(&self) -> impl Iterator<Item = &str> + '_ {
        self.titles.iter().map(String::as_str)
    }

    pub fn column(&self, title: &str) -> Option<&BTreeMap<UserId, f64>> {
        self.index_of(title).map(|idx| &self.columns[idx])
    }

    pub fn column_at(&self, index: usize) -> &BTreeMap<UserId, f64> {
        &self.columns[index]
    }

    /// Titles rated by `user`, as (title index, rating) in title order
    pub fn row(&self, user: UserId) -> &[(usize, f64)] {
        self.rows.get(&user).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn rating(&self, user: UserId, title: &str) -> Option<f64> {
        self.column(title)?.get(&user).copied()
    }

    pub fn item_count(&self) -> usize {
        self.titles.len()
    }

    pub fn user_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

/// Total number of ratings per title, used as a ranking weight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopularityIndex {
    counts: BTreeMap<String, u64>,
}

impl PopularityIndex {
    pub fn get(&self, title: &str) -> Option<u64> {
        self.counts.get(title).copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts, i.e. the number of retained observations
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

/// Counts observations per title. Repeated (user, title) pairs count once
/// per occurrence.
pub fn count_by_title(observations: &[RatingObservation]) -> BTreeMap<&str, u64> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for obs in observations {
        *counts.entry(obs.title.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Pivots observations into a [`RatingMatrix`], keeping only titles with at
/// least `min_count` observations, and derives their [`PopularityIndex`].
///
/// The result depends only on the inputs: titles and users are ordered by
/// key, and repeated cells are combined according to `policy`.
pub fn build_rating_matrix(
    observations: &[RatingObservation],
    min_count: u64,
    policy: DuplicatePolicy,
) -> (RatingMatrix, PopularityIndex) {
    let counts: BTreeMap<String, u64> = count_by_title(observations)
        .into_iter()
        .filter(|(_, count)| *count >= min_count)
        .map(|(title, count)| (title.to_string(), count))
        .collect();

    let titles: Vec<String> = counts.keys().cloned().collect();
    let mut cells: Vec<BTreeMap<UserId, Cell>> = vec![BTreeMap::new(); titles.len()];

    for obs in observations {
        let Ok(idx) = titles.binary_search_by(|t| t.as_str().cmp(obs.title.as_str())) else {
            continue;
        };
        cells[idx]
            .entry(obs.user_id)
            .and_modify(|cell| cell.push(obs.rating))
            .or_insert_with(|| Cell::new(obs.rating));
    }

    let columns: Vec<BTreeMap<UserId, f64>> = cells
        .into_iter()
        .map(|column| {
            column
                .into_iter()
                .map(|(user, cell)| (user, cell.resolve(policy)))
                .collect()
        })
        .collect();

    // Columns are visited in title order, so every row ends up sorted.
    let mut rows: BTreeMap<UserId, Vec<(usize, f64)>> = BTreeMap::new();
    for (idx, column) in columns.iter().enumerate() {
        for (&user, &rating) in column {
            rows.entry(user).or_default().push((idx, rating));
        }
    }

    (
        RatingMatrix {
            titles,
            columns,
            rows,
        },
        PopularityIndex { counts },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(user: UserId, title: &str, rating: f64) -> RatingObservation {
        RatingObservation::new(user, title, rating)
    }

    fn sample() -> Vec<RatingObservation> {
        vec![
            obs(1, "Heat (1995)", 4.0),
            obs(2, "Heat (1995)", 3.5),
            obs(3, "Heat (1995)", 5.0),
            obs(1, "Casino (1995)", 4.5),
            obs(2, "Casino (1995)", 3.0),
            obs(1, "Nixon (1995)", 2.0),
        ]
    }

    #[test]
    fn test_count_filter() {
        let (matrix, popularity) = build_rating_matrix(&sample(), 2, DuplicatePolicy::Mean);

        assert_eq!(matrix.titles().collect::<Vec<_>>(), vec!["Casino (1995)", "Heat (1995)"]);
        assert!(!matrix.contains("Nixon (1995)"));
        assert_eq!(popularity.get("Heat (1995)"), Some(3));
        assert_eq!(popularity.get("Casino (1995)"), Some(2));
        assert_eq!(popularity.get("Nixon (1995)"), None);

        for title in matrix.titles() {
            assert!(popularity.get(title).unwrap() >= 2);
        }
    }

    #[test]
    fn test_unrated_cells_are_absent() {
        let (matrix, _) = build_rating_matrix(&sample(), 1, DuplicatePolicy::Mean);

        assert_eq!(matrix.rating(3, "Heat (1995)"), Some(5.0));
        assert_eq!(matrix.rating(3, "Casino (1995)"), None);
        assert_eq!(matrix.user_count(), 3);
        assert_eq!(matrix.row(3).len(), 1);
        assert!(matrix.row(42).is_empty());
    }

    #[test]
    fn test_rows_mirror_columns() {
        let (matrix, _) = build_rating_matrix(&sample(), 1, DuplicatePolicy::Mean);
        let casino = matrix.index_of("Casino (1995)").unwrap();
        let heat = matrix.index_of("Heat (1995)").unwrap();

        assert_eq!(matrix.row(2), &[(casino, 3.0), (heat, 3.5)]);
        assert_eq!(matrix.column_at(heat).len(), 3);
    }

    #[test]
    fn test_duplicate_policies() {
        let mut observations = sample();
        observations.push(obs(1, "Heat (1995)", 2.0));

        let rating = |policy| {
            let (matrix, _) = build_rating_matrix(&observations, 1, policy);
            matrix.rating(1, "Heat (1995)").unwrap()
        };

        assert_eq!(rating(DuplicatePolicy::Mean), 3.0);
        assert_eq!(rating(DuplicatePolicy::First), 4.0);
        assert_eq!(rating(DuplicatePolicy::Last), 2.0);
        assert_eq!(rating(DuplicatePolicy::Sum), 6.0);

        let (_, popularity) = build_rating_matrix(&observations, 1, DuplicatePolicy::Mean);
        assert_eq!(popularity.get("Heat (1995)"), Some(4));
    }

    #[test]
    fn test_build_is_deterministic() {
        let mut shuffled = sample();
        shuffled.reverse();

        let first = build_rating_matrix(&sample(), 2, DuplicatePolicy::Mean);
        let second = build_rating_matrix(&sample(), 2, DuplicatePolicy::Mean);
        assert_eq!(first, second);

        let reordered = build_rating_matrix(&shuffled, 2, DuplicatePolicy::Mean);
        assert_eq!(first, reordered);
    }

    #[test]
    fn test_threshold_above_every_count() {
        let (matrix, popularity) = build_rating_matrix(&sample(), 10, DuplicatePolicy::Mean);
        assert!(matrix.is_empty());
        assert!(popularity.is_empty());
        assert_eq!(matrix.user_count(), 0);
    }
}
