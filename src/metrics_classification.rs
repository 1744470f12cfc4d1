//! Common metrics for classification

use ndarray::{Array1, ArrayBase, Data, Ix1};

use crate::error::{Error, Result};
use crate::Float;

/// Classification error rate
///
/// Returns a single-element array so it can be used wherever a per-column score is expected.
pub fn err<F: Float, L: PartialEq>(
    pred: &ArrayBase<impl Data<Elem = L>, Ix1>,
    truth: &ArrayBase<impl Data<Elem = L>, Ix1>,
) -> Result<Array1<F>> {
    Error::check_rows("reference labels", pred.len(), truth.len())?;
    if pred.is_empty() {
        return Err(Error::NotEnoughSamples);
    }
    let wrong = pred.iter().zip(truth.iter()).filter(|(p, t)| p != t).count();
    Ok(Array1::from_elem(1, F::cast(wrong) / F::cast(pred.len())))
}
