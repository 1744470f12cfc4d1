use std::cmp::Ordering;

use chemolv::Float;
use noisy_float::{checkers::FiniteChecker, NoisyFloat};

use crate::{NnError, Result};

/// Candidate neighbor ordered by distance, then by position in the reference set
///
/// The index breaks ties so that the order of the neighbors never depends on the heap layout.
pub(crate) struct HeapElem<D: Ord> {
    pub(crate) dist: D,
    pub(crate) index: usize,
}

impl<D: Ord> PartialEq for HeapElem<D> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl<D: Ord> Eq for HeapElem<D> {}

impl<D: Ord> PartialOrd for HeapElem<D> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<D: Ord> Ord for HeapElem<D> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist
            .cmp(&other.dist)
            .then_with(|| self.index.cmp(&other.index))
    }
}

pub(crate) type DistElem<F> = HeapElem<NoisyFloat<F, FiniteChecker>>;

impl<F: Float> DistElem<F> {
    pub(crate) fn new(dist: F, index: usize) -> Result<Self> {
        let dist = NoisyFloat::try_new(dist).ok_or(NnError::NonFinite)?;
        Ok(Self { dist, index })
    }

    pub(crate) fn raw(&self) -> F {
        self.dist.raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BinaryHeap;

    #[test]
    fn ties_resolve_by_index() {
        let mut heap = BinaryHeap::new();
        for (i, d) in [1.0, 0.5, 1.0, 0.5].iter().enumerate() {
            heap.push(DistElem::new(*d, i).unwrap());
        }
        let order: Vec<usize> = heap.into_sorted_vec().iter().map(|e| e.index).collect();
        assert_eq!(order, vec![1, 3, 0, 2]);
    }

    #[test]
    fn rejects_non_finite() {
        assert!(DistElem::new(f64::NAN, 0).is_err());
        assert!(DistElem::new(f64::INFINITY, 0).is_err());
    }
}
