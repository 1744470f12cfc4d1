//! Datasets
//!
//! This module implements the dataset struct and various helper traits to extend its
//! functionality.
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, NdFloat};

use num_traits::{AsPrimitive, FromPrimitive, NumCast, Signed};

use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hash;
use std::iter::Sum;

use crate::error::{Error, Result};

mod impl_targets;

/// Floating point numbers
///
/// This trait bound multiplexes to the most common assumption of floating point number and
/// implement them for 32bit and 64bit floating points. They are used in records of a dataset and,
/// for regression tasks, in the targets as well.
pub trait Float:
    NdFloat + FromPrimitive + Default + Signed + Sum + AsPrimitive<usize>
{
    fn cast<T: NumCast>(x: T) -> Self {
        NumCast::from(x).unwrap()
    }
}

impl Float for f32 {}
impl Float for f64 {}

/// Discrete labels
///
/// Labels are countable, comparable and hashable. They are used as targets of the
/// discriminant models and as group identifiers when sampling segments by blocks.
pub trait Label: PartialEq + Eq + Hash + Ord + Clone + fmt::Debug + Send + Sync {}

impl Label for bool {}
impl Label for usize {}
impl Label for u32 {}
impl Label for i32 {}
impl Label for i64 {}
impl Label for char {}
impl Label for String {}
impl Label for &'static str {}

/// Targets whose rows can be selected
///
/// Implemented for response matrices (`Array2`) and label vectors (`Array1`), this is what the
/// validation and local engines need to slice a dataset along its observations.
pub trait Targets: Sized {
    /// Number of observations stored in the targets
    fn ntarget_rows(&self) -> usize;

    /// Copy the observations at `indices`, in the given order
    fn select_targets(&self, indices: &[usize]) -> Self;
}

/// DatasetBase
///
/// This is the fundamental structure of a dataset. It contains the predictors `X`, the targets
/// and an optional weight per observation.
///
/// # Fields
///
/// * `records`: a two-dimensional matrix with dimensionality (nsamples, nfeatures)
/// * `targets`: a response matrix (nsamples, ntargets) or a label vector (nsamples)
/// * `weights`: optional non-negative weights for each sample, they do not need to sum to one and
/// are normalized when a weighted routine consumes them
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetBase<F, T> {
    pub records: Array2<F>,
    pub targets: T,

    weights: Option<Array1<F>>,
}

/// Dataset
///
/// The most commonly used type of dataset, with a response matrix as targets.
pub type Dataset<F> = DatasetBase<F, Array2<F>>;

/// Labeled dataset
///
/// Dataset with one class label per observation, consumed by discriminant models.
pub type LabeledDataset<F, L> = DatasetBase<F, Array1<L>>;

impl<F: Float, T: Targets> DatasetBase<F, T> {
    /// Create a new dataset from records and targets
    ///
    /// The shapes are not checked here, every fitting routine calls
    /// [`validate`](Self::validate) before touching the data.
    pub fn new(records: Array2<F>, targets: T) -> Self {
        DatasetBase {
            records,
            targets,
            weights: None,
        }
    }

    /// Attach observation weights
    pub fn with_weights(mut self, weights: Array1<F>) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Remove the observation weights
    pub fn without_weights(mut self) -> Self {
        self.weights = None;
        self
    }

    pub fn records(&self) -> &Array2<F> {
        &self.records
    }

    pub fn targets(&self) -> &T {
        &self.targets
    }

    /// The raw weights, if any were attached
    pub fn weights(&self) -> Option<&Array1<F>> {
        self.weights.as_ref()
    }

    pub fn nsamples(&self) -> usize {
        self.records.nrows()
    }

    pub fn nfeatures(&self) -> usize {
        self.records.ncols()
    }

    /// Checks that records, targets and weights agree on the number of observations
    pub fn validate(&self) -> Result<()> {
        let n = self.records.nrows();
        Error::check_rows("targets rows", n, self.targets.ntarget_rows())?;
        if let Some(weights) = &self.weights {
            Error::check_rows("weights length", n, weights.len())?;
        }
        Ok(())
    }

    /// Weights normalized to sum to one
    ///
    /// Returns uniform weights `1/n` if none were attached.
    pub fn sample_weights(&self) -> Result<Array1<F>> {
        self.validate()?;
        match &self.weights {
            Some(weights) => crate::linalg::normalize_weights(weights.view()),
            None => {
                let n = self.nsamples();
                if n == 0 {
                    return Err(Error::NotEnoughSamples);
                }
                Ok(Array1::from_elem(n, F::one() / F::cast(n)))
            }
        }
    }

    /// Copy the observations at `indices` into a new dataset
    ///
    /// Records, targets and weights are selected identically.
    pub fn select(&self, indices: &[usize]) -> Self {
        DatasetBase {
            records: self.records.select(Axis(0), indices),
            targets: self.targets.select_targets(indices),
            weights: self.weights.as_ref().map(|w| w.select(Axis(0), indices)),
        }
    }

    /// Split into the observations at `indices` and all remaining observations
    pub fn split_indices(&self, indices: &[usize]) -> (Self, Self) {
        let mut mask = vec![false; self.nsamples()];
        for &i in indices {
            mask[i] = true;
        }
        let rest: Vec<usize> = (0..self.nsamples()).filter(|&i| !mask[i]).collect();
        (self.select(indices), self.select(&rest))
    }

    /// Replace the targets while keeping records and weights
    pub fn with_targets<T2: Targets>(self, targets: T2) -> DatasetBase<F, T2> {
        DatasetBase {
            records: self.records,
            targets,
            weights: self.weights,
        }
    }

    /// Replace the records while keeping targets and weights
    pub fn with_records(mut self, records: Array2<F>) -> Self {
        self.records = records;
        self
    }
}

impl<F: Float> Dataset<F> {
    pub fn ntargets(&self) -> usize {
        self.targets.ncols()
    }

    /// View on the response matrix
    pub fn targets_view(&self) -> ArrayView2<F> {
        self.targets.view()
    }

    /// Returns the single response column, fails for more than one response
    pub fn try_single_target(&self) -> Result<ArrayView1<F>> {
        if self.targets.ncols() != 1 {
            return Err(Error::Parameters(format!(
                "expected a single response, got {}",
                self.targets.ncols()
            )));
        }
        Ok(self.targets.column(0))
    }
}

impl<F: Float, L: Label> LabeledDataset<F, L> {
    /// Sorted set of the distinct labels
    pub fn labels(&self) -> Vec<L> {
        self.label_counts().into_keys().collect()
    }

    /// Number of observations per label
    pub fn label_counts(&self) -> BTreeMap<L, usize> {
        let mut counts = BTreeMap::new();
        for label in self.targets.iter() {
            *counts.entry(label.clone()).or_insert(0) += 1;
        }
        counts
    }
}

impl<F: Float, T: Targets> From<(Array2<F>, T)> for DatasetBase<F, T> {
    fn from(rec_tar: (Array2<F>, T)) -> Self {
        DatasetBase::new(rec_tar.0, rec_tar.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn dataset_implements_required_methods() {
        let dataset = Dataset::new(
            array![[1., 2.], [3., 4.], [5., 6.]],
            array![[0.], [1.], [2.]],
        )
        .with_weights(array![1., 1., 2.]);
        dataset.validate().unwrap();

        assert_eq!(dataset.nsamples(), 3);
        assert_eq!(dataset.nfeatures(), 2);
        assert_eq!(dataset.ntargets(), 1);
        assert_abs_diff_eq!(
            dataset.sample_weights().unwrap(),
            array![0.25, 0.25, 0.5],
            epsilon = 1e-12
        );

        let sub = dataset.select(&[2, 0]);
        assert_eq!(sub.records(), &array![[5., 6.], [1., 2.]]);
        assert_eq!(sub.targets(), &array![[2.], [0.]]);
        assert_eq!(sub.weights().unwrap(), &array![2., 1.]);

        let (test, train) = dataset.split_indices(&[1]);
        assert_eq!(test.nsamples(), 1);
        assert_eq!(train.records(), &array![[1., 2.], [5., 6.]]);
    }

    #[test]
    fn uniform_weights_without_attached_weights() {
        let dataset = Dataset::new(Array2::<f64>::zeros((4, 2)), Array2::zeros((4, 1)));
        assert_abs_diff_eq!(
            dataset.sample_weights().unwrap(),
            Array1::from_elem(4, 0.25)
        );
    }

    #[test]
    fn mismatched_rows_are_rejected() {
        let dataset = Dataset::new(Array2::<f64>::zeros((4, 2)), Array2::zeros((3, 1)));
        assert!(matches!(
            dataset.validate(),
            Err(Error::Dimension { expected: 4, actual: 3, .. })
        ));

        let dataset = Dataset::new(Array2::<f64>::zeros((4, 2)), Array2::zeros((4, 1)))
            .with_weights(array![1., 2.]);
        assert!(dataset.sample_weights().is_err());
    }

    #[test]
    fn labels_are_sorted_and_counted() {
        let dataset = LabeledDataset::new(
            Array2::<f64>::zeros((5, 1)),
            array!["b", "a", "b", "c", "b"],
        );
        assert_eq!(dataset.labels(), vec!["a", "b", "c"]);
        assert_eq!(dataset.label_counts()[&"b"], 3);
    }
}
