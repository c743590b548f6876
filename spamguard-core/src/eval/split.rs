//! Reproducible row split.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::{Result, SpamError};

/// Row indices partitioned into a training and a held-out subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl TrainTestSplit {
    /// Shuffle `0..n` with `seed` and hold out `ceil(n * test_size)` rows.
    ///
    /// The same `(n, test_size, seed)` always yields the same partition.
    /// Both subsets must end up non-empty.
    pub fn new(n: usize, test_size: f64, seed: u64) -> Result<Self> {
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(SpamError::config(format!(
                "test_size must be in (0, 1), got {test_size}"
            )));
        }
        let n_test = (n as f64 * test_size).ceil() as usize;
        if n_test == 0 || n_test >= n {
            return Err(SpamError::dataset(format!(
                "{n} rows cannot be split with test_size {test_size}"
            )));
        }

        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let train = indices.split_off(n_test);
        Ok(Self {
            train,
            test: indices,
        })
    }
}
