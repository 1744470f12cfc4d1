use log::debug;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use super::{ParamGrid, ParamSet, ParamValue};
use crate::dataset::{DatasetBase, Targets};
use crate::error::Error;
use crate::lv_range::LvRange;
use crate::segments::Segments;
use crate::traits::{PredictLambda, PredictLv};
use crate::Float;

/// Scores of one combination on one held-out segment
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct CvRecord<F> {
    pub rep: usize,
    pub segment: usize,
    /// Row of the combination in [`CvResult::grid`]
    pub combination: usize,
    pub scores: Array1<F>,
}

/// Outcome of a grid cross-validation
///
/// `detail` holds one record per (replication, segment, combination), ordered by replication,
/// then segment, then combination. `summary` holds one row of averaged scores per combination
/// of `grid`.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct CvResult<F> {
    grid: ParamGrid,
    detail: Vec<CvRecord<F>>,
    summary: Array2<F>,
}

impl<F: Float> CvResult<F> {
    fn aggregate(grid: ParamGrid, detail: Vec<CvRecord<F>>) -> Result<Self, Error> {
        let nscores = detail.first().map(|r| r.scores.len()).unwrap_or(0);
        let mut sums = Array2::zeros((grid.len(), nscores));
        let mut counts = vec![0usize; grid.len()];
        for record in &detail {
            Error::check_rows("score length", nscores, record.scores.len())?;
            let mut row = sums.row_mut(record.combination);
            row += &record.scores;
            counts[record.combination] += 1;
        }
        for (mut row, count) in sums.axis_iter_mut(Axis(0)).zip(counts) {
            let count = F::cast(count);
            row.mapv_inplace(|v| v / count);
        }
        Ok(CvResult {
            grid,
            detail,
            summary: sums,
        })
    }

    /// Evaluated combinations, including the latent-variable or lambda column of the
    /// specialized engines
    pub fn grid(&self) -> &ParamGrid {
        &self.grid
    }

    pub fn detail(&self) -> &[CvRecord<F>] {
        &self.detail
    }

    /// Unweighted mean of the scores of every combination over replications and segments
    pub fn summary(&self) -> &Array2<F> {
        &self.summary
    }

    /// Combination with the smallest averaged score in column `col`
    pub fn best(&self, col: usize) -> Option<(ParamSet<'_>, F)> {
        if col >= self.summary.ncols() {
            return None;
        }
        self.summary
            .column(col)
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_nan())
            .fold(None, |best: Option<(usize, F)>, (i, &v)| match best {
                Some((_, b)) if b <= v => best,
                _ => Some((i, v)),
            })
            .map(|(i, v)| (self.grid.get(i), v))
    }
}

/// Scores of every combination on one split
type SplitScores<F> = Vec<Vec<Array1<F>>>;

fn records<F>(rep: usize, segment: usize, scores: SplitScores<F>) -> Vec<CvRecord<F>> {
    scores
        .into_iter()
        .flatten()
        .enumerate()
        .map(|(combination, scores)| CvRecord {
            rep,
            segment,
            combination,
            scores,
        })
        .collect()
}

/// Scores every combination of `grid` on a single train/test split
///
/// `fit_predict` receives the training set, the test records and the combination, `score`
/// compares its prediction against the test targets.
pub fn grid_score<F, T, P, E, FP, S>(
    train: &DatasetBase<F, T>,
    test: &DatasetBase<F, T>,
    grid: &ParamGrid,
    fit_predict: FP,
    score: S,
) -> Result<CvResult<F>, E>
where
    F: Float,
    T: Targets + Sync,
    E: std::error::Error + From<Error> + Send,
    FP: Fn(&DatasetBase<F, T>, &ArrayView2<F>, &ParamSet) -> Result<P, E> + Sync,
    S: Fn(&P, &T) -> Result<Array1<F>, Error> + Sync,
{
    train.validate()?;
    test.validate()?;
    let scores = score_split(train, test, grid, &fit_predict, &score)?;
    Ok(CvResult::aggregate(grid.clone(), records(0, 0, scores))?)
}

fn score_split<F, T, P, E, FP, S>(
    train: &DatasetBase<F, T>,
    test: &DatasetBase<F, T>,
    grid: &ParamGrid,
    fit_predict: &FP,
    score: &S,
) -> Result<SplitScores<F>, E>
where
    F: Float,
    T: Targets + Sync,
    E: std::error::Error + From<Error> + Send,
    FP: Fn(&DatasetBase<F, T>, &ArrayView2<F>, &ParamSet) -> Result<P, E> + Sync,
    S: Fn(&P, &T) -> Result<Array1<F>, Error> + Sync,
{
    let test_records = test.records.view();
    (0..grid.len())
        .into_par_iter()
        .map(|row| -> Result<Vec<Array1<F>>, E> {
            let pred = fit_predict(train, &test_records, &grid.get(row))?;
            Ok(vec![score(&pred, &test.targets)?])
        })
        .collect()
}

/// Grid cross-validation refitting the model for every combination and segment
///
/// For every replication and segment of `segments` the model is fitted on the remaining
/// observations and scored on the segment. Combinations run in parallel.
pub fn grid_cv<F, T, P, E, FP, S>(
    dataset: &DatasetBase<F, T>,
    segments: &Segments,
    grid: &ParamGrid,
    fit_predict: FP,
    score: S,
) -> Result<CvResult<F>, E>
where
    F: Float,
    T: Targets + Sync,
    E: std::error::Error + From<Error> + Send,
    FP: Fn(&DatasetBase<F, T>, &ArrayView2<F>, &ParamSet) -> Result<P, E> + Sync,
    S: Fn(&P, &T) -> Result<Array1<F>, Error> + Sync,
{
    dataset.validate()?;
    segments.check_bounds(dataset.nsamples())?;

    let mut detail = Vec::with_capacity(segments.len() * grid.len());
    for (rep, seg, idx) in segments.iter() {
        let (test, train) = dataset.split_indices(idx);
        let scores = score_split(&train, &test, grid, &fit_predict, &score)?;
        detail.extend(records(rep, seg, scores));
    }
    debug!(
        "grid cross-validation of {} combinations over {} segments",
        grid.len(),
        segments.len()
    );

    Ok(CvResult::aggregate(grid.clone(), detail)?)
}

/// Grid cross-validation over a range of latent-variable counts
///
/// One model is fitted per (segment, combination) at `nlv.high()` latent variables, every count
/// of the range is then predicted by truncation. The result grid gains a trailing `nlv` column.
pub fn grid_cv_lv<F, T, P, M, E, FM, S>(
    dataset: &DatasetBase<F, T>,
    segments: &Segments,
    grid: &ParamGrid,
    nlv: LvRange,
    fit: FM,
    score: S,
) -> Result<CvResult<F>, E>
where
    F: Float,
    T: Targets + Sync,
    M: PredictLv<Array2<F>, P>,
    E: std::error::Error + From<Error> + Send,
    FM: Fn(&DatasetBase<F, T>, &ParamSet, usize) -> Result<M, E> + Sync,
    S: Fn(&P, &T) -> Result<Array1<F>, Error> + Sync,
{
    dataset.validate()?;
    segments.check_bounds(dataset.nsamples())?;

    let counts: Vec<ParamValue> = nlv.iter().map(ParamValue::from).collect();
    let result_grid = grid.clone().product("nlv", &counts)?;

    let mut detail = Vec::with_capacity(segments.len() * result_grid.len());
    for (rep, seg, idx) in segments.iter() {
        let (test, train) = dataset.split_indices(idx);
        let scores: SplitScores<F> = (0..grid.len())
            .into_par_iter()
            .map(|row| -> Result<Vec<Array1<F>>, E> {
                let model = fit(&train, &grid.get(row), nlv.high())?;
                nlv.check_max(model.max_lv())?;
                nlv.iter()
                    .map(|k| -> Result<Array1<F>, E> {
                        let pred = model.predict_lv(&test.records, k)?;
                        Ok(score(&pred, &test.targets)?)
                    })
                    .collect()
            })
            .collect::<Result<_, E>>()?;
        detail.extend(records(rep, seg, scores));
    }

    Ok(CvResult::aggregate(result_grid, detail)?)
}

/// Grid cross-validation over a ridge penalty path
///
/// One model is fitted per (segment, combination), every penalty of `lambdas` is evaluated from
/// that fit. The result grid gains a trailing `lambda` column.
pub fn grid_cv_lambda<F, T, P, M, E, FM, S>(
    dataset: &DatasetBase<F, T>,
    segments: &Segments,
    grid: &ParamGrid,
    lambdas: &[F],
    fit: FM,
    score: S,
) -> Result<CvResult<F>, E>
where
    F: Float,
    T: Targets + Sync,
    M: PredictLambda<F, Array2<F>, P>,
    E: std::error::Error + From<Error> + Send,
    FM: Fn(&DatasetBase<F, T>, &ParamSet) -> Result<M, E> + Sync,
    S: Fn(&P, &T) -> Result<Array1<F>, Error> + Sync,
{
    dataset.validate()?;
    segments.check_bounds(dataset.nsamples())?;
    if lambdas.is_empty() {
        return Err(Error::InvalidRange("empty lambda path".to_string()).into());
    }
    if lambdas.iter().any(|l| !l.is_finite() || *l < F::zero()) {
        return Err(Error::Parameters("penalties must be finite and non-negative".into()).into());
    }

    let values: Vec<ParamValue> = lambdas
        .iter()
        .map(|l| ParamValue::Float(l.to_f64().unwrap_or(f64::NAN)))
        .collect();
    let result_grid = grid.clone().product("lambda", &values)?;

    let mut detail = Vec::with_capacity(segments.len() * result_grid.len());
    for (rep, seg, idx) in segments.iter() {
        let (test, train) = dataset.split_indices(idx);
        let scores: SplitScores<F> = (0..grid.len())
            .into_par_iter()
            .map(|row| -> Result<Vec<Array1<F>>, E> {
                let model = fit(&train, &grid.get(row))?;
                lambdas
                    .iter()
                    .map(|&lambda| -> Result<Array1<F>, E> {
                        let pred = model.predict_lambda(&test.records, lambda)?;
                        Ok(score(&pred, &test.targets)?)
                    })
                    .collect()
            })
            .collect::<Result<_, E>>()?;
        detail.extend(records(rep, seg, scores));
    }

    Ok(CvResult::aggregate(result_grid, detail)?)
}

/// Grid cross-validation for models consuming several row-aligned predictor blocks
///
/// All blocks and the targets are sliced with the same segment indices. `fit_predict` receives
/// the training blocks and targets, then the test blocks.
pub fn grid_cv_mb<F, T, P, E, FP, S>(
    blocks: &[Array2<F>],
    targets: &T,
    segments: &Segments,
    grid: &ParamGrid,
    fit_predict: FP,
    score: S,
) -> Result<CvResult<F>, E>
where
    F: Float,
    T: Targets + Sync,
    E: std::error::Error + From<Error> + Send,
    FP: Fn(&[Array2<F>], &T, &[Array2<F>], &ParamSet) -> Result<P, E> + Sync,
    S: Fn(&P, &T) -> Result<Array1<F>, Error> + Sync,
{
    if blocks.is_empty() {
        return Err(Error::Parameters("at least one predictor block is required".into()).into());
    }
    let n = targets.ntarget_rows();
    for block in blocks {
        Error::check_rows("block rows", n, block.nrows())?;
    }
    segments.check_bounds(n)?;

    let mut detail = Vec::with_capacity(segments.len() * grid.len());
    for (rep, seg, idx) in segments.iter() {
        let mut in_test = vec![false; n];
        idx.iter().for_each(|&i| in_test[i] = true);
        let rest: Vec<usize> = (0..n).filter(|&i| !in_test[i]).collect();

        let slice = |rows: &[usize]| -> Vec<Array2<F>> {
            blocks.iter().map(|b| b.select(Axis(0), rows)).collect()
        };
        let (train_blocks, test_blocks) = (slice(&rest), slice(idx));
        let (train_targets, test_targets) =
            (targets.select_targets(&rest), targets.select_targets(idx));

        let scores: SplitScores<F> = (0..grid.len())
            .into_par_iter()
            .map(|row| -> Result<Vec<Array1<F>>, E> {
                let pred = fit_predict(&train_blocks, &train_targets, &test_blocks, &grid.get(row))?;
                Ok(vec![score(&pred, &test_targets)?])
            })
            .collect::<Result<_, E>>()?;
        detail.extend(records(rep, seg, scores));
    }

    Ok(CvResult::aggregate(grid.clone(), detail)?)
}
