//! Trainable classifier capability.
//!
//! The serving and training paths only rely on this trait; the concrete
//! learner (see [`crate::forest::RandomForest`]) can be swapped freely.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::schema::FitReport;
use crate::{ModelOpsError, Result};

/// Fraction of rows held out by [`Classifier::train`].
pub const TEST_FRACTION: f64 = 0.2;
pub const SPLIT_SEED: u64 = 42;

pub trait Classifier: Send + Sync {
    /// Fit on the full set of rows.
    fn fit(&mut self, x: &[Vec<f64>], y: &[u32]) -> Result<()>;

    /// Class probabilities per row, ordered as [`Classifier::classes`].
    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>>;

    /// Sorted label set seen during fitting; empty before.
    fn classes(&self) -> &[u32];

    /// Feature arity seen during fitting.
    fn n_features(&self) -> Option<usize>;

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<u32>> {
        let classes = self.classes();
        Ok(self
            .predict_proba(x)?
            .iter()
            .map(|p| classes[argmax(p)])
            .collect())
    }

    /// Mean accuracy on the given rows.
    fn score(&self, x: &[Vec<f64>], y: &[u32]) -> Result<f64> {
        let pred = self.predict(x)?;
        Ok(accuracy(y, &pred))
    }

    /// Hold out a seeded 20% split, fit on the rest and report both scores.
    fn train(&mut self, x: &[Vec<f64>], y: &[u32]) -> Result<FitReport> {
        let n_features = check_training_set(x, y)?;
        let (train_idx, test_idx) = train_test_split(x.len(), TEST_FRACTION, SPLIT_SEED);

        let pick = |idx: &[usize]| -> (Vec<Vec<f64>>, Vec<u32>) {
            (idx.iter().map(|&i| x[i].clone()).collect(), idx.iter().map(|&i| y[i]).collect())
        };
        let (x_train, y_train) = pick(&train_idx);
        let (x_test, y_test) = pick(&test_idx);

        self.fit(&x_train, &y_train)?;

        let train_score = self.score(&x_train, &y_train)?;
        let test_score = self.score(&x_test, &y_test)?;
        let accuracy = accuracy(&y_test, &self.predict(&x_test)?);

        Ok(FitReport { train_score, test_score, accuracy, n_samples: x.len(), n_features })
    }
}

/// Index of the first maximum.
pub(crate) fn argmax(p: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in p.iter().enumerate() {
        if *v > p[best] {
            best = i;
        }
    }
    best
}

pub fn accuracy(truth: &[u32], pred: &[u32]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let hits = truth.iter().zip(pred).filter(|(a, b)| a == b).count();
    hits as f64 / truth.len() as f64
}

/// Shuffled split; the test side gets `ceil(n * test_fraction)` rows, and at
/// least one row stays on each side when `n >= 2`.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut idx: Vec<usize> = (0..n).collect();
    idx.shuffle(&mut StdRng::seed_from_u64(seed));

    let mut n_test = (n as f64 * test_fraction).ceil() as usize;
    if n >= 2 {
        n_test = n_test.clamp(1, n - 1);
    } else {
        n_test = 0;
    }
    let test = idx.split_off(n - n_test);
    (idx, test)
}

/// Validate a training set, returning its feature arity.
pub(crate) fn check_training_set(x: &[Vec<f64>], y: &[u32]) -> Result<usize> {
    if x.is_empty() {
        return Err(ModelOpsError::InvalidInput("empty training set".into()));
    }
    if x.len() != y.len() {
        return Err(ModelOpsError::InvalidInput(format!(
            "{} feature rows but {} labels",
            x.len(),
            y.len()
        )));
    }
    let n_features = x[0].len();
    if n_features == 0 {
        return Err(ModelOpsError::InvalidInput("rows have no features".into()));
    }
    check_rows(x, n_features)?;
    Ok(n_features)
}

/// Every row must have `n_features` finite values.
pub(crate) fn check_rows(x: &[Vec<f64>], n_features: usize) -> Result<()> {
    for (i, row) in x.iter().enumerate() {
        if row.len() != n_features {
            return Err(ModelOpsError::InvalidInput(format!(
                "row {i}: expected {n_features} features, got {}",
                row.len()
            )));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(ModelOpsError::InvalidInput(format!("row {i}: non-finite feature value")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sizes_and_disjoint() {
        let (train, test) = train_test_split(100, 0.2, 42);
        assert_eq!(train.len(), 80);
        assert_eq!(test.len(), 20);
        let mut all: Vec<usize> = train.iter().chain(&test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_is_seeded() {
        assert_eq!(train_test_split(50, 0.2, 42), train_test_split(50, 0.2, 42));
    }

    #[test]
    fn test_split_small_sets() {
        let (train, test) = train_test_split(2, 0.2, 1);
        assert_eq!((train.len(), test.len()), (1, 1));
        let (train, test) = train_test_split(1, 0.2, 1);
        assert_eq!((train.len(), test.len()), (1, 0));
    }

    #[test]
    fn test_check_rows() {
        assert!(check_rows(&[vec![1.0, 2.0]], 2).is_ok());
        assert!(check_rows(&[vec![1.0]], 2).is_err());
        assert!(check_rows(&[vec![1.0, f64::NAN]], 2).is_err());
        assert!(check_training_set(&[vec![1.0]], &[0, 1]).is_err());
    }

    #[test]
    fn test_argmax_first_wins() {
        assert_eq!(argmax(&[0.5, 0.5]), 0);
        assert_eq!(argmax(&[0.2, 0.8]), 1);
    }
}
