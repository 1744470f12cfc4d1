use std::fmt::Display;

use chemolv::dataset::{DatasetBase, Targets};
use chemolv::{Error, Float};
use chemolv_nn::Neighbors;
use log::warn;
use ndarray::{s, Array1, Array2, ArrayView2};
use rayon::prelude::*;

/// Predictions of a local model with the neighborhoods they were computed on
///
/// Rows whose local fit failed are listed in `failed`. Their prediction is a NaN row for the
/// regressions and `None` for the discriminants, so a failure is never mistaken for a
/// legitimate value.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalOutput<F, P> {
    pub predictions: P,
    /// Query rows whose local fit failed, ascending
    pub failed: Vec<usize>,
    pub neighbors: Vec<Neighbors<F>>,
    /// Kernel weights of the neighbors, in the order of `neighbors`
    pub weights: Vec<Array1<F>>,
}

/// Locally weighted prediction
///
/// For every query row `i`, selects the training observations `neighbors[i]`, attaches the
/// weights `weights[i]` and hands the neighborhood with the query row to `fit_predict`. The
/// rows are independent and run in parallel, the results are returned in row order.
///
/// The inputs are checked before any fitting and an inconsistency fails the whole call. A
/// failing local fit only affects its own row.
pub fn locw<F, T, I, O, E, FP>(
    train: &DatasetBase<F, T>,
    queries: ArrayView2<F>,
    neighbors: &[I],
    weights: &[Array1<F>],
    fit_predict: FP,
) -> chemolv::Result<Vec<Result<O, E>>>
where
    F: Float,
    T: Targets + Sync,
    I: AsRef<[usize]> + Sync,
    O: Send,
    E: Send,
    FP: Fn(&DatasetBase<F, T>, ArrayView2<F>) -> Result<O, E> + Sync,
{
    train.validate()?;
    let n = train.nsamples();
    Error::check_rows("neighbor lists", queries.nrows(), neighbors.len())?;
    Error::check_rows("weight lists", queries.nrows(), weights.len())?;
    for (neighbors, weights) in neighbors.iter().zip(weights) {
        let neighbors = neighbors.as_ref();
        Error::check_rows("neighbor weights", neighbors.len(), weights.len())?;
        if neighbors.is_empty() {
            return Err(Error::Parameters("empty neighborhood".into()));
        }
        if let Some(i) = neighbors.iter().find(|&&i| i >= n) {
            return Err(Error::Parameters(format!(
                "neighbor {} out of bounds for {} training observations",
                i, n
            )));
        }
    }

    Ok((0..queries.nrows())
        .into_par_iter()
        .map(|i| {
            let local = train
                .select(neighbors[i].as_ref())
                .with_weights(weights[i].clone());
            fit_predict(&local, queries.slice(s![i..i + 1, ..]))
        })
        .collect())
}

/// Stack single-row predictions, failed rows become NaN
pub(crate) fn stack_rows<F: Float, E: Display>(
    rows: Vec<Result<Array2<F>, E>>,
    ncols: usize,
) -> (Array2<F>, Vec<usize>) {
    let mut out = Array2::from_elem((rows.len(), ncols), F::nan());
    let mut failed = Vec::new();
    for (i, row) in rows.into_iter().enumerate() {
        match row {
            Ok(pred) => out.row_mut(i).assign(&pred.row(0)),
            Err(err) => {
                warn!("local fit of query {} failed: {}", i, err);
                failed.push(i);
            }
        }
    }
    (out, failed)
}

/// Collect per-row labels, failed rows become `None`
pub(crate) fn collect_labels<L, E: Display>(rows: Vec<Result<L, E>>) -> (Array1<Option<L>>, Vec<usize>) {
    let mut failed = Vec::new();
    let labels = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| match row {
            Ok(label) => Some(label),
            Err(err) => {
                warn!("local fit of query {} failed: {}", i, err);
                failed.push(i);
                None
            }
        })
        .collect();
    (labels, failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chemolv::Dataset;
    use ndarray::array;

    fn dataset() -> Dataset<f64> {
        Dataset::new(
            array![[0.], [1.], [2.], [3.], [4.]],
            array![[0.], [10.], [20.], [30.], [40.]],
        )
    }

    #[test]
    fn fits_every_neighborhood() {
        let train = dataset();
        let queries = array![[0.5], [3.5]];
        let neighbors: Vec<Vec<usize>> = vec![vec![0, 1], vec![3, 4, 2]];
        let weights = vec![array![1., 3.], array![1., 1., 0.]];

        let rows = locw(&train, queries.view(), &neighbors, &weights, |local, query| {
            assert_eq!(query.nrows(), 1);
            let w = local.sample_weights()?;
            Ok::<_, Error>(local.targets().t().dot(&w))
        })
        .unwrap();

        assert_abs_diff_eq!(rows[0].as_ref().unwrap()[0], 7.5);
        assert_abs_diff_eq!(rows[1].as_ref().unwrap()[0], 35.);
    }

    #[test]
    fn failures_stay_in_their_row() {
        let train = dataset();
        let queries = array![[0.], [1.], [2.]];
        let neighbors: Vec<Vec<usize>> = vec![vec![0], vec![1], vec![2]];
        let weights = vec![array![1.], array![1.], array![1.]];

        let rows = locw(&train, queries.view(), &neighbors, &weights, |local, _| {
            if local.targets()[[0, 0]] == 10. {
                Err(Error::NotEnoughSamples)
            } else {
                Ok(local.targets().clone())
            }
        })
        .unwrap();

        let (stacked, failed) = stack_rows(rows, 1);
        assert_eq!(failed, vec![1]);
        assert_eq!(stacked[[0, 0]], 0.);
        assert!(stacked[[1, 0]].is_nan());
        assert_eq!(stacked[[2, 0]], 20.);

        let (labels, failed) = collect_labels(vec![Ok(1), Err("singular"), Ok(3)]);
        assert_eq!(labels, array![Some(1), None, Some(3)]);
        assert_eq!(failed, vec![1]);
    }

    fn fit(local: &Dataset<f64>, _: ArrayView2<f64>) -> Result<usize, Error> {
        Ok(local.nsamples())
    }

    #[test]
    fn inconsistent_inputs_abort() {
        let train = dataset();
        let queries = array![[0.], [1.]];

        let short: Vec<Vec<usize>> = vec![vec![0]];
        assert!(matches!(
            locw(&train, queries.view(), &short, &[array![1.]], fit),
            Err(Error::Dimension { .. })
        ));
        let out_of_bounds: Vec<Vec<usize>> = vec![vec![0], vec![5]];
        let weights = vec![array![1.], array![1.]];
        assert!(locw(&train, queries.view(), &out_of_bounds, &weights, fit).is_err());
        let mismatched: Vec<Vec<usize>> = vec![vec![0, 1], vec![1]];
        assert!(locw(&train, queries.view(), &mismatched, &weights, fit).is_err());
        let empty: Vec<Vec<usize>> = vec![vec![], vec![1]];
        assert!(locw(&train, queries.view(), &empty, &weights, fit).is_err());
    }
}
