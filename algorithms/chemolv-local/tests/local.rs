use approx::assert_abs_diff_eq;
use chemolv::grid::grid_cv_lv;
use chemolv::metrics::rmsep;
use chemolv::prelude::*;
use chemolv::segments::k_fold;
use chemolv_local::{LocalError, LwPlsDa, LwPlsr};
use chemolv_nn::Metric;
use chemolv_pls::{Pls, PlsDa, Prior};
use ndarray::{array, Array1, Array2, Axis};
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

#[test]
fn whole_training_set_without_weighting_is_the_global_model() {
    let dataset = chemolv_datasets::spectra(30, 40, 12);
    let n = dataset.nsamples();
    let queries = chemolv_datasets::spectra(6, 40, 13);

    let global = Pls::params(3).fit(&dataset).unwrap();
    let expected = global.predict_lv(queries.records(), 3).unwrap();

    for nlvdis in [0, 5] {
        let local = LwPlsr::params(n, 3)
            .nlvdis(nlvdis)
            .bandwidth(f64::INFINITY)
            .fit(&dataset)
            .unwrap();
        let out = local.predict_local(queries.records()).unwrap();
        assert!(out.failed.is_empty());
        assert!(out.weights.iter().all(|w| w.iter().all(|&v| v == 1.)));
        assert_abs_diff_eq!(out.predictions, expected, epsilon = 1e-6);
    }
}

#[test]
fn mahalanobis_neighbors_on_global_scores() {
    let dataset = chemolv_datasets::spectra(40, 30, 9);
    let n = dataset.nsamples();
    let queries = chemolv_datasets::spectra(6, 30, 10);

    let expected = Pls::params(3)
        .fit(&dataset)
        .unwrap()
        .predict_lv(queries.records(), 3)
        .unwrap();
    let whole = LwPlsr::params(n, 3)
        .nlvdis(4)
        .metric(Metric::Mahalanobis)
        .bandwidth(f64::INFINITY)
        .fit(&dataset)
        .unwrap();
    let out = whole.predict_local(queries.records()).unwrap();
    assert!(out.failed.is_empty());
    assert_abs_diff_eq!(out.predictions, expected, epsilon = 1e-6);

    let local = LwPlsr::params(15, 3)
        .nlvdis(4)
        .metric(Metric::Mahalanobis)
        .fit(&dataset)
        .unwrap();
    let out = local.predict_local(queries.records()).unwrap();
    assert!(out.failed.is_empty());
    assert!(out.predictions.iter().all(|v| v.is_finite()));
    assert!(out.neighbors.iter().all(|nb| nb.indices.len() == 15));
}

#[test]
fn distance_space_beyond_the_rank_of_the_predictors() {
    let dataset = chemolv_datasets::latent_dataset(30, 10, 2, 0.0, 1);
    let model = LwPlsr::params(10, 1).nlvdis(3).fit(&dataset).unwrap();
    assert_eq!(model.distance_model().map(|pls| pls.nlv()), Some(2));

    let out = model.predict_local(dataset.records()).unwrap();
    assert!(out.failed.is_empty());
    assert_eq!(out.predictions.dim(), (30, 1));
}

#[test]
fn whole_training_set_discriminant_is_the_global_discriminant() {
    let dataset = chemolv_datasets::classes(10, 30, 3, 21);
    let n = dataset.nsamples();

    let global: PlsDa<f64, usize> = PlsDa::params(4)
        .prior(Prior::Proportional)
        .fit(&dataset)
        .unwrap();
    let expected = global.predict_lv(dataset.records(), 4).unwrap();

    let local = LwPlsDa::params(n, 4)
        .prior(Prior::Proportional)
        .bandwidth(f64::INFINITY)
        .fit(&dataset)
        .unwrap();
    let out = local.predict_local(dataset.records()).unwrap();
    assert!(out.failed.is_empty());
    assert_eq!(out.predictions, expected.mapv(Some));
}

/// Three identical observations around the origin, the others spread along a curve
fn with_degenerate_cluster() -> Dataset<f64> {
    let x = Array2::from_shape_fn((12, 2), |(i, j)| match (i, j) {
        (0..=2, _) => 0.,
        (_, 0) => 10. + 0.5 * i as f64,
        _ => 0.1 * (i * i) as f64,
    });
    let y = Array2::from_shape_fn((12, 1), |(i, _)| i as f64);
    Dataset::new(x, y)
}

#[test]
fn a_failing_neighborhood_only_voids_its_query() {
    let dataset = with_degenerate_cluster();
    let model = LwPlsr::params(3, 1).fit(&dataset).unwrap();

    // the first query only sees the constant cluster
    let queries = array![[0., 0.], [13., 4.]];
    let out = model.predict_local(&queries).unwrap();
    assert_eq!(out.failed, vec![0]);
    assert!(out.predictions[[0, 0]].is_nan());
    assert!(out.predictions[[1, 0]].is_finite());
    assert_eq!(out.neighbors[0].indices, vec![0, 1, 2]);
}

#[test]
fn configuration_errors_abort_the_call() {
    let dataset = with_degenerate_cluster();
    assert!(matches!(
        LwPlsr::params(13, 1).fit(&dataset),
        Err(LocalError::BaseCrate(Error::InsufficientNeighbors { .. }))
    ));

    let model = LwPlsr::params(3, 1).fit(&dataset).unwrap();
    assert!(model.predict_local(&Array2::<f64>::zeros((1, 3))).is_err());
    assert!(model.predict_local(&array![[f64::NAN, 0.]]).is_err());
}

#[test]
fn predictions_are_reproducible() {
    let dataset = chemolv_datasets::spectra(60, 30, 8);
    let (test, train) = dataset.split_indices(&[3, 17, 29, 41, 58]);
    let model = LwPlsr::params(20, 3).nlvdis(4).fit(&train).unwrap();

    let first = model.predict_local(test.records()).unwrap();
    let second = model.predict_local(test.records()).unwrap();
    assert_eq!(first, second);

    // each query is independent of the batch it comes in
    for (i, row) in test.records().rows().into_iter().enumerate() {
        let single = model.predict_local(&row.insert_axis(Axis(0))).unwrap();
        assert_eq!(single.neighbors[0], first.neighbors[i]);
        assert_eq!(single.predictions.row(0), first.predictions.row(i));
    }
}

#[test]
fn local_model_tuned_by_latent_variable_grid() {
    let dataset = chemolv_datasets::spectra(48, 30, 5);
    let segments = k_fold(48, 4, 1, &mut Xoshiro256Plus::seed_from_u64(3)).unwrap();
    let grid = ParamGrid::from_columns(vec![("k", vec![15usize.into(), 30usize.into()])]).unwrap();

    let res = grid_cv_lv(
        &dataset,
        &segments,
        &grid,
        LvRange::new(1, 4).unwrap(),
        |train: &Dataset<f64>,
         params: &ParamSet,
         nlv: usize|
         -> std::result::Result<LwPlsr<f64>, LocalError> {
            LwPlsr::params(params.usize("k")?, nlv).nlvdis(5).fit(train)
        },
        |p: &Array2<f64>, t: &Array2<f64>| rmsep(p, t),
    )
    .unwrap();

    assert_eq!(res.grid().len(), 8);
    assert_eq!(res.detail().len(), 4 * 8);
    let (best, score) = res.best(0).unwrap();
    assert!(score.is_finite());
    assert!(best.usize("nlv").unwrap() >= 1);

    let scores: Array1<f64> = res.summary().column(0).to_owned();
    assert!(scores.iter().all(|s| s.is_finite()));
}
