use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use tempfile::NamedTempFile;

use crate::config::Config;
use crate::error::DataIntegrityError;
use crate::models::{RatingObservation, UserId};

use super::matrix::count_by_title;

/// Locations of the raw MovieLens-style tables and the derived dataset.
#[derive(Debug, Clone)]
pub struct DatasetSource {
    pub ratings_path: PathBuf,
    pub movies_path: PathBuf,
    pub data_dir: PathBuf,
}

impl DatasetSource {
    pub fn from_config(config: &Config) -> Self {
        Self {
            ratings_path: config.ratings_path.clone(),
            movies_path: config.movies_path.clone(),
            data_dir: config.data_dir.clone(),
        }
    }

    /// Path of the filtered dataset derived for `min_count`
    pub fn filtered_path(&self, min_count: u64) -> PathBuf {
        self.data_dir
            .join(format!("movie_ratings_count_over_{}.csv", min_count))
    }

    /// Returns every observation whose title has at least `min_count`
    /// ratings.
    ///
    /// Reads the filtered dataset for `min_count` when one exists. Otherwise
    /// joins the raw tables, filters them and writes the filtered dataset
    /// for the next start.
    pub fn load_observations(
        &self,
        min_count: u64,
    ) -> Result<Vec<RatingObservation>, DataIntegrityError> {
        let filtered_path = self.filtered_path(min_count);

        if filtered_path.exists() {
            match read_filtered(&filtered_path) {
                Ok(observations) => {
                    tracing::info!(
                        path = %filtered_path.display(),
                        observations = observations.len(),
                        "Loaded filtered ratings"
                    );
                    return Ok(observations);
                }
                Err(e) => {
                    tracing::warn!(
                        path = %filtered_path.display(),
                        error = %e,
                        "Filtered ratings unreadable, rebuilding from raw tables"
                    );
                }
            }
        }

        let movies = read_movies(&self.movies_path)?;
        let observations = read_ratings(&self.ratings_path, &movies)?;
        let filtered = filter_by_count(observations, min_count);

        if let Err(e) = write_filtered(&filtered_path, &filtered) {
            tracing::warn!(
                path = %filtered_path.display(),
                error = %e,
                "Failed to write filtered ratings"
            );
        } else {
            tracing::info!(
                path = %filtered_path.display(),
                observations = filtered.len(),
                "Wrote filtered ratings"
            );
        }

        Ok(filtered)
    }
}

fn csv_error(path: &Path) -> impl Fn(csv::Error) -> DataIntegrityError + '_ {
    move |source| DataIntegrityError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

fn open_reader(path: &Path) -> Result<csv::Reader<std::fs::File>, DataIntegrityError> {
    let file = std::fs::File::open(path).map_err(|source| DataIntegrityError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(ReaderBuilder::new().from_reader(file))
}

fn find_column(
    path: &Path,
    headers: &StringRecord,
    name: &'static str,
) -> Result<usize, DataIntegrityError> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| DataIntegrityError::MissingColumn {
            path: path.to_path_buf(),
            column: name,
        })
}

fn invalid_field(
    path: &Path,
    record: &StringRecord,
    column: &'static str,
    value: &str,
) -> DataIntegrityError {
    DataIntegrityError::InvalidField {
        path: path.to_path_buf(),
        line: record.position().map(|p| p.line()).unwrap_or(0),
        column,
        value: value.to_string(),
    }
}

/// Trimmed, non-empty value of a required field
fn required_field<'r>(
    path: &Path,
    record: &'r StringRecord,
    idx: usize,
    column: &'static str,
) -> Result<&'r str, DataIntegrityError> {
    match record.get(idx).map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        other => Err(invalid_field(path, record, column, other.unwrap_or(""))),
    }
}

fn parse_field<T: FromStr>(
    path: &Path,
    record: &StringRecord,
    idx: usize,
    column: &'static str,
) -> Result<T, DataIntegrityError> {
    let raw = required_field(path, record, idx, column)?;
    raw.parse()
        .map_err(|_| invalid_field(path, record, column, raw))
}

fn parse_rating(
    path: &Path,
    record: &StringRecord,
    idx: usize,
) -> Result<f64, DataIntegrityError> {
    let rating: f64 = parse_field(path, record, idx, "rating")?;
    if !rating.is_finite() {
        return Err(invalid_field(path, record, "rating", &rating.to_string()));
    }
    Ok(rating)
}

/// Reads the movies table into a movieId -> title map
pub fn read_movies(path: &Path) -> Result<HashMap<u32, String>, DataIntegrityError> {
    let mut reader = open_reader(path)?;
    let headers = reader.headers().map_err(csv_error(path))?.clone();
    let id_idx = find_column(path, &headers, "movieId")?;
    let title_idx = find_column(path, &headers, "title")?;

    let mut movies = HashMap::new();
    let mut record = StringRecord::new();
    while reader.read_record(&mut record).map_err(csv_error(path))? {
        let movie_id: u32 = parse_field(path, &record, id_idx, "movieId")?;
        let title = required_field(path, &record, title_idx, "title")?.to_string();
        if movies.insert(movie_id, title).is_some() {
            return Err(DataIntegrityError::DuplicateItemKey {
                path: path.to_path_buf(),
                movie_id,
            });
        }
    }

    tracing::info!(path = %path.display(), movies = movies.len(), "Loaded movies");
    Ok(movies)
}

/// Reads the ratings table, joining each row to its title.
///
/// Rows whose movieId is not in `movies` are dropped.
pub fn read_ratings(
    path: &Path,
    movies: &HashMap<u32, String>,
) -> Result<Vec<RatingObservation>, DataIntegrityError> {
    let mut reader = open_reader(path)?;
    let headers = reader.headers().map_err(csv_error(path))?.clone();
    let user_idx = find_column(path, &headers, "userId")?;
    let movie_idx = find_column(path, &headers, "movieId")?;
    let rating_idx = find_column(path, &headers, "rating")?;

    let mut observations = Vec::new();
    let mut unmatched = 0usize;
    let mut record = StringRecord::new();
    while reader.read_record(&mut record).map_err(csv_error(path))? {
        let user_id: UserId = parse_field(path, &record, user_idx, "userId")?;
        let movie_id: u32 = parse_field(path, &record, movie_idx, "movieId")?;
        let rating = parse_rating(path, &record, rating_idx)?;

        match movies.get(&movie_id) {
            Some(title) => observations.push(RatingObservation::new(user_id, title.clone(), rating)),
            None => unmatched += 1,
        }
    }

    if unmatched > 0 {
        tracing::warn!(
            path = %path.display(),
            unmatched,
            "Dropped ratings for unknown movieIds"
        );
    }
    tracing::info!(
        path = %path.display(),
        observations = observations.len(),
        "Loaded ratings"
    );

    Ok(observations)
}

/// Keeps observations whose title has at least `min_count` ratings,
/// preserving input order.
pub fn filter_by_count(
    observations: Vec<RatingObservation>,
    min_count: u64,
) -> Vec<RatingObservation> {
    let retained: std::collections::HashSet<String> = count_by_title(&observations)
        .into_iter()
        .filter(|(_, count)| *count >= min_count)
        .map(|(title, _)| title.to_string())
        .collect();

    observations
        .into_iter()
        .filter(|obs| retained.contains(&obs.title))
        .collect()
}

/// Writes a filtered dataset with columns `userId,title,rating,num_ratings`.
///
/// Rows go to a temporary file next to `path` that is renamed into place
/// once complete, so `path` never holds a partial dataset.
pub fn write_filtered(
    path: &Path,
    observations: &[RatingObservation],
) -> Result<(), DataIntegrityError> {
    let io_error = |source| DataIntegrityError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut staged = NamedTempFile::new_in(dir).map_err(io_error)?;

    write_rows(path, staged.as_file_mut(), observations)?;

    staged
        .persist(path)
        .map_err(|e| io_error(e.error))?;
    Ok(())
}

fn write_rows(
    path: &Path,
    out: &mut std::fs::File,
    observations: &[RatingObservation],
) -> Result<(), DataIntegrityError> {
    let counts = count_by_title(observations);
    let mut writer = WriterBuilder::new().from_writer(out);

    writer
        .write_record(["userId", "title", "rating", "num_ratings"])
        .map_err(csv_error(path))?;
    for obs in observations {
        let num_ratings = counts.get(obs.title.as_str()).copied().unwrap_or(0);
        writer
            .write_record([
                obs.user_id.to_string(),
                obs.title.clone(),
                obs.rating.to_string(),
                num_ratings.to_string(),
            ])
            .map_err(csv_error(path))?;
    }

    writer.flush().map_err(|source| DataIntegrityError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a dataset previously produced by [`write_filtered`].
///
/// Every row carries its title's total count; a title whose rows disagree
/// with that count marks the file as incomplete.
pub fn read_filtered(path: &Path) -> Result<Vec<RatingObservation>, DataIntegrityError> {
    let mut reader = open_reader(path)?;
    let headers = reader.headers().map_err(csv_error(path))?.clone();
    let user_idx = find_column(path, &headers, "userId")?;
    let title_idx = find_column(path, &headers, "title")?;
    let rating_idx = find_column(path, &headers, "rating")?;
    let count_idx = find_column(path, &headers, "num_ratings")?;

    let mut observations = Vec::new();
    let mut declared: BTreeMap<String, u64> = BTreeMap::new();
    let mut record = StringRecord::new();
    while reader.read_record(&mut record).map_err(csv_error(path))? {
        let user_id: UserId = parse_field(path, &record, user_idx, "userId")?;
        let rating = parse_rating(path, &record, rating_idx)?;
        let title = required_field(path, &record, title_idx, "title")?.to_string();
        let num_ratings: u64 = parse_field(path, &record, count_idx, "num_ratings")?;

        let expected = *declared.entry(title.clone()).or_insert(num_ratings);
        if expected != num_ratings {
            return Err(invalid_field(path, &record, "num_ratings", &num_ratings.to_string()));
        }
        observations.push(RatingObservation::new(user_id, title, rating));
    }

    let found = count_by_title(&observations);
    for (title, expected) in &declared {
        let found = found.get(title.as_str()).copied().unwrap_or(0);
        if found != *expected {
            return Err(DataIntegrityError::IncompleteDataset {
                path: path.to_path_buf(),
                title: title.clone(),
                expected: *expected,
                found,
            });
        }
    }

    Ok(observations)
}
