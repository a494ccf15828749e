//! Sampler
//!
//! Strategies for drawing row indices: uniform splits without replacement for
//! validation and calibration sets, an opt-in stratified split, and draws with
//! replacement for the bootstrap.
use crate::data::Stain;
use crate::errors::CountError;
use rand::rngs::StdRng;
use rand::seq::index::sample as sample_positions;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// How validation rows are drawn.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug, Default)]
pub enum SampleMethod {
    /// Uniformly over all rows, ignoring the stain.
    #[default]
    Uniform,
    /// Proportionally within each stain level.
    Stratified,
}

/// A partition of row indices into a training and a validation part.
#[derive(Clone, PartialEq, Debug)]
pub struct Split {
    pub training: Vec<usize>,
    pub validation: Vec<usize>,
}

// A sampler chooses a subset of the rows of a dataset.
pub trait Sampler {
    /// Sample the data, returning a tuple, where the first item is the samples
    /// chosen, and the second are the samples excluded.
    fn sample(&mut self, rng: &mut StdRng, index: &[usize]) -> Result<(Vec<usize>, Vec<usize>), CountError>;
}

fn check_split_size(size: usize, n: usize) -> Result<(), CountError> {
    if size == 0 || size >= n {
        Err(CountError::InvalidSplitSize(size, n))
    } else {
        Ok(())
    }
}

/// Excluded items of `index`, in their original order.
fn complement(index: &[usize], chosen_positions: &[usize]) -> Vec<usize> {
    let mut taken = vec![false; index.len()];
    for p in chosen_positions {
        taken[*p] = true;
    }
    index
        .iter()
        .zip(taken)
        .filter_map(|(i, t)| if t { None } else { Some(*i) })
        .collect()
}

/// Draw exactly `size` items uniformly without replacement.
pub struct SplitSampler {
    size: usize,
}

impl SplitSampler {
    pub fn new(size: usize) -> Self {
        SplitSampler { size }
    }
}

impl Sampler for SplitSampler {
    fn sample(&mut self, rng: &mut StdRng, index: &[usize]) -> Result<(Vec<usize>, Vec<usize>), CountError> {
        check_split_size(self.size, index.len())?;
        let positions = sample_positions(rng, index.len(), self.size).into_vec();
        let chosen = positions.iter().map(|p| index[*p]).collect();
        let excluded = complement(index, &positions);
        Ok((chosen, excluded))
    }
}

/// Draw `size` items without replacement, allocating the draw across stain
/// levels in proportion to their share of `index`.
pub struct StratifiedSplitSampler<'a> {
    size: usize,
    /// Stain of every row, indexed by row id.
    strata: &'a [Stain],
}

impl<'a> StratifiedSplitSampler<'a> {
    pub fn new(size: usize, strata: &'a [Stain]) -> Self {
        StratifiedSplitSampler { size, strata }
    }

    /// Number of items to draw from each level, largest remainder first.
    fn allocate(&self, group_sizes: &[usize], n: usize) -> Vec<usize> {
        let exact: Vec<f64> = group_sizes
            .iter()
            .map(|g| self.size as f64 * *g as f64 / n as f64)
            .collect();
        let mut alloc: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();
        let mut left = self.size - alloc.iter().sum::<usize>();
        let mut order: Vec<usize> = (0..group_sizes.len()).collect();
        order.sort_by(|a, b| {
            let ra = exact[*a] - exact[*a].floor();
            let rb = exact[*b] - exact[*b].floor();
            rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal)
        });
        for g in order {
            if left == 0 {
                break;
            }
            if alloc[g] < group_sizes[g] {
                alloc[g] += 1;
                left -= 1;
            }
        }
        alloc
    }
}

impl Sampler for StratifiedSplitSampler<'_> {
    fn sample(&mut self, rng: &mut StdRng, index: &[usize]) -> Result<(Vec<usize>, Vec<usize>), CountError> {
        check_split_size(self.size, index.len())?;
        let mut groups: Vec<Vec<usize>> = vec![Vec::new(); Stain::ALL.len()];
        for (position, row) in index.iter().enumerate() {
            let stain = self
                .strata
                .get(*row)
                .ok_or(CountError::IndexOutOfBounds(*row, self.strata.len()))?;
            groups[stain.index()].push(position);
        }
        let group_sizes: Vec<usize> = groups.iter().map(|g| g.len()).collect();
        let alloc = self.allocate(&group_sizes, index.len());

        let mut positions = Vec::with_capacity(self.size);
        for (group, k) in groups.iter().zip(alloc) {
            if k == 0 {
                continue;
            }
            positions.extend(sample_positions(rng, group.len(), k).into_iter().map(|p| group[p]));
        }
        let chosen = positions.iter().map(|p| index[*p]).collect();
        let excluded = complement(index, &positions);
        Ok((chosen, excluded))
    }
}

/// Draw as many items as there are in `index`, with replacement. The excluded
/// items are the ones never drawn (out of bag).
#[derive(Default)]
pub struct BootstrapSampler {}

impl BootstrapSampler {
    pub fn new() -> Self {
        BootstrapSampler {}
    }
}

impl Sampler for BootstrapSampler {
    fn sample(&mut self, rng: &mut StdRng, index: &[usize]) -> Result<(Vec<usize>, Vec<usize>), CountError> {
        if index.is_empty() {
            return Err(CountError::DegenerateInput("cannot resample an empty dataset".to_string()));
        }
        let n = index.len();
        let positions: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
        let chosen = positions.iter().map(|p| index[*p]).collect();
        let excluded = complement(index, &positions);
        Ok((chosen, excluded))
    }
}
