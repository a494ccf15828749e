//! Data
//!
//! Observations of the cell-counting example and the row-indexed `Dataset` that
//! every fitting and resampling routine consumes.
use crate::errors::CountError;
use crate::sampler::{BootstrapSampler, Sampler, SplitSampler};
use crate::utils::items_to_strings;
use hashbrown::HashMap;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;

/// Staining protocol of a sample, one of two levels.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub enum Stain {
    One,
    Two,
}

impl Stain {
    pub const ALL: [Stain; 2] = [Stain::One, Stain::Two];

    /// Position of the level in `Stain::ALL`.
    pub fn index(&self) -> usize {
        match self {
            Stain::One => 0,
            Stain::Two => 1,
        }
    }
}

impl Display for Stain {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Stain::One => write!(f, "1"),
            Stain::Two => write!(f, "2"),
        }
    }
}

impl FromStr for Stain {
    type Err = CountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(Stain::One),
            "2" => Ok(Stain::Two),
            _ => Err(CountError::ParseString(
                s.to_string(),
                "Stain".to_string(),
                items_to_strings(vec!["1", "2"]),
            )),
        }
    }
}

/// A single measured sample.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
#[serde(try_from = "RawObservation")]
pub struct Observation {
    stain: Stain,
    intensity: f64,
    count: Option<u32>,
}

#[derive(Deserialize)]
struct RawObservation {
    stain: Stain,
    intensity: f64,
    count: Option<u32>,
}

impl TryFrom<RawObservation> for Observation {
    type Error = CountError;

    fn try_from(raw: RawObservation) -> Result<Self, Self::Error> {
        Observation::new(raw.stain, raw.intensity, raw.count)
    }
}

impl Observation {
    pub fn new(stain: Stain, intensity: f64, count: Option<u32>) -> Result<Self, CountError> {
        if !intensity.is_finite() || intensity < 0.0 {
            return Err(CountError::InvalidParameter(
                "intensity".to_string(),
                "a finite non-negative value".to_string(),
                intensity.to_string(),
            ));
        }
        Ok(Observation {
            stain,
            intensity,
            count,
        })
    }

    pub fn stain(&self) -> Stain {
        self.stain
    }

    /// Stain intensity, finite and non-negative.
    pub fn intensity(&self) -> f64 {
        self.intensity
    }

    /// Observed number of cells, `None` for unlabeled rows.
    pub fn count(&self) -> Option<u32> {
        self.count
    }

    /// The same measurement with its count removed.
    pub fn unlabeled(&self) -> Self {
        Observation { count: None, ..*self }
    }
}

/// Ordered rows of observations. Rows are the unit of resampling.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
pub struct Dataset {
    observations: Vec<Observation>,
}

impl FromIterator<Observation> for Dataset {
    fn from_iter<I: IntoIterator<Item = Observation>>(iter: I) -> Self {
        Dataset::new(iter.into_iter().collect())
    }
}

impl Dataset {
    pub fn new(observations: Vec<Observation>) -> Self {
        Dataset { observations }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&Observation> {
        self.observations.get(i)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Observation> {
        self.observations.iter()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Select rows by index. Repeated indices repeat the row, which is how a
    /// bootstrap multiset becomes a dataset.
    ///
    /// * `index` - Row indices into this dataset.
    pub fn subset(&self, index: &[usize]) -> Result<Dataset, CountError> {
        let n = self.len();
        index
            .iter()
            .map(|&i| {
                self.observations
                    .get(i)
                    .copied()
                    .ok_or(CountError::IndexOutOfBounds(i, n))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Dataset::new)
    }

    /// Draw `k` rows uniformly without replacement. Returns the sample and the
    /// remaining rows.
    pub fn sample(&self, rng: &mut StdRng, k: usize) -> Result<(Dataset, Dataset), CountError> {
        let index: Vec<usize> = (0..self.len()).collect();
        let (chosen, excluded) = SplitSampler::new(k).sample(rng, &index)?;
        Ok((self.subset(&chosen)?, self.subset(&excluded)?))
    }

    /// Draw `n` rows with replacement, `n` being the size of this dataset.
    pub fn resample(&self, rng: &mut StdRng) -> Result<Dataset, CountError> {
        let index: Vec<usize> = (0..self.len()).collect();
        let (chosen, _) = BootstrapSampler::new().sample(rng, &index)?;
        self.subset(&chosen)
    }

    /// Observed counts as floats. Fails on the first unlabeled row.
    pub fn targets(&self) -> Result<Vec<f64>, CountError> {
        self.observations
            .iter()
            .enumerate()
            .map(|(i, o)| o.count.map(f64::from).ok_or(CountError::MissingCount(i)))
            .collect()
    }

    pub fn intensities(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.intensity).collect()
    }

    pub fn stains(&self) -> Vec<Stain> {
        self.observations.iter().map(|o| o.stain).collect()
    }

    /// Whether every row carries an observed count.
    pub fn is_labeled(&self) -> bool {
        self.observations.iter().all(|o| o.count.is_some())
    }

    pub fn stain_counts(&self) -> HashMap<Stain, usize> {
        let mut counts = HashMap::new();
        for o in &self.observations {
            *counts.entry(o.stain).or_insert(0) += 1;
        }
        counts
    }

    /// Share of rows with the given stain, 0 for an empty dataset.
    pub fn stain_fraction(&self, stain: Stain) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let n = self.stain_counts().get(&stain).copied().unwrap_or(0);
        n as f64 / self.len() as f64
    }

    /// Load a dataset from a csv file with `stain`, `intensity` and `count` columns.
    ///
    /// * `path` - Path to the csv file.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Dataset, CountError> {
        let file = File::open(path.as_ref())
            .map_err(|e| CountError::UnableToRead(format!("{}: {}", path.as_ref().display(), e)))?;
        Dataset::from_reader(BufReader::new(file))
    }

    /// Load a dataset from any csv source with a header row.
    ///
    /// Columns are found by name, in any order, extra columns are ignored. The
    /// `count` column may be left out entirely, and empty or `NA` cells load as
    /// unlabeled rows.
    pub fn from_reader<R: Read>(reader: R) -> Result<Dataset, CountError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = csv_reader
            .headers()
            .map_err(|e| CountError::UnableToRead(e.to_string()))?
            .clone();
        let column = |name: &str| headers.iter().position(|h| h == name);
        let stain_index = column("stain").ok_or_else(|| missing_column("stain"))?;
        let intensity_index = column("intensity").ok_or_else(|| missing_column("intensity"))?;
        let count_index = column("count");

        let mut observations = Vec::new();
        for result in csv_reader.records() {
            let record = result.map_err(|e| CountError::UnableToRead(e.to_string()))?;
            let stain = Stain::from_str(&record[stain_index])?;
            let intensity_str = &record[intensity_index];
            let intensity = intensity_str.parse::<f64>().map_err(|_| {
                CountError::ParseString(
                    intensity_str.to_string(),
                    "intensity".to_string(),
                    "a real number".to_string(),
                )
            })?;
            let count = match count_index {
                Some(idx) => parse_count(&record[idx])?,
                None => None,
            };
            observations.push(Observation::new(stain, intensity, count)?);
        }
        Ok(Dataset::new(observations))
    }
}

fn missing_column(name: &str) -> CountError {
    CountError::UnableToRead(format!("column {} not found in header", name))
}

fn parse_count(s: &str) -> Result<Option<u32>, CountError> {
    match s {
        "" | "NA" | "NaN" | "null" => Ok(None),
        _ => s.parse::<u32>().map(Some).map_err(|_| {
            CountError::ParseString(
                s.to_string(),
                "count".to_string(),
                "a non-negative integer or an empty cell".to_string(),
            )
        }),
    }
}
