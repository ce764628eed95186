//! "Did you mean" suggestions for titles that are not in the store.
//!
//! Similarity is the Ratcliff/Obershelp ratio: find the longest common
//! substring, recurse on the pieces to its left and right, and report
//! `2 * matched / (len(a) + len(b))`. Comparison is case-sensitive and works
//! on Unicode scalar values.

use std::collections::HashMap;

/// Sequences at least this long have very frequent characters ignored as
/// anchors for the longest-match search.
const POPULAR_MIN_LEN: usize = 200;

/// Returns the known title most similar to `query`, if its ratio is at
/// least `threshold`. The first title wins among equal ratios.
pub fn resolve<'a, I>(query: &str, known_titles: I, threshold: f64) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&str, f64)> = None;
    for title in known_titles {
        let score = ratio(query, title);
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((title, score));
        }
    }

    best.filter(|&(_, score)| score >= threshold)
        .map(|(title, _)| title.to_string())
}

/// Similarity of two strings in [0, 1]; two empty strings score 1.0.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    2.0 * matching_characters(&a, &b) as f64 / total as f64
}

/// Number of characters covered by the matching blocks of `a` and `b`.
fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, &c) in b.iter().enumerate() {
        b2j.entry(c).or_default().push(j);
    }

    if b.len() >= POPULAR_MIN_LEN {
        let limit = b.len() / 100 + 1;
        b2j.retain(|_, positions| positions.len() <= limit);
    }

    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, b, &b2j, (alo, ahi), (blo, bhi));
        if size == 0 {
            continue;
        }

        matched += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }

    matched
}

/// Longest common run of `a[alo..ahi]` and `b[blo..bhi]` as
/// `(start in a, start in b, length)`, preferring the earliest start in `a`,
/// then in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    b2j: &HashMap<char, Vec<usize>>,
    (alo, ahi): (usize, usize),
    (blo, bhi): (usize, usize),
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);

    // run_ends[j] = length of the match ending at a[i - 1] and b[j]
    let mut run_ends: HashMap<usize, usize> = HashMap::new();
    for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next_run_ends = HashMap::new();
        if let Some(positions) = b2j.get(c) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let size = j
                    .checked_sub(1)
                    .and_then(|prev| run_ends.get(&prev))
                    .copied()
                    .unwrap_or(0)
                    + 1;
                next_run_ends.insert(j, size);
                if size > best_size {
                    best_i = i + 1 - size;
                    best_j = j + 1 - size;
                    best_size = size;
                }
            }
        }
        run_ends = next_run_ends;
    }

    // Grow across characters dropped from b2j as too frequent.
    while best_i > alo && best_j > blo && a[best_i - 1] == b[best_j - 1] {
        best_i -= 1;
        best_j -= 1;
        best_size += 1;
    }
    while best_i + best_size < ahi
        && best_j + best_size < bhi
        && a[best_i + best_size] == b[best_j + best_size]
    {
        best_size += 1;
    }

    (best_i, best_j, best_size)
}
