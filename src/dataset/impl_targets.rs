use super::Targets;
use ndarray::{Array1, Array2, Axis};

/// A response matrix can act as targets
impl<L: Clone> Targets for Array2<L> {
    fn ntarget_rows(&self) -> usize {
        self.nrows()
    }

    fn select_targets(&self, indices: &[usize]) -> Self {
        self.select(Axis(0), indices)
    }
}

/// A vector of labels can act as targets
impl<L: Clone> Targets for Array1<L> {
    fn ntarget_rows(&self) -> usize {
        self.len()
    }

    fn select_targets(&self, indices: &[usize]) -> Self {
        self.select(Axis(0), indices)
    }
}

