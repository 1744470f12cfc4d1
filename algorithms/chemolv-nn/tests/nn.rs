use approx::assert_abs_diff_eq;
use ndarray::{aview1, Array1, Array2, ArrayView1, Axis};
use ndarray_rand::{rand::SeedableRng, rand_distr::Uniform, RandomExt};
use ndarray_stats::DeviationExt;
use noisy_float::{checkers::FiniteChecker, NoisyFloat};
use rand_xoshiro::Xoshiro256Plus;

use chemolv_nn::{weights_from_distances, Mahalanobis, Metric, NeighborIndex, WeightKernel};

fn brute_force(points: &Array2<f64>, pt: ArrayView1<f64>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..points.nrows()).collect();
    order.sort_by_key(|&i| {
        (
            NoisyFloat::<_, FiniteChecker>::new(points.row(i).sq_l2_dist(&pt).unwrap()),
            i,
        )
    });
    order
}

#[test]
fn euclidean_matches_brute_force() {
    let mut rng = Xoshiro256Plus::seed_from_u64(40);
    let points: Array2<f64> = Array2::random_using((200, 4), Uniform::new(-5., 5.), &mut rng);
    let queries: Array2<f64> = Array2::random_using((20, 4), Uniform::new(-5., 5.), &mut rng);
    let nn = NeighborIndex::from_batch(&points, Metric::Euclidean).unwrap();

    for (query, found) in queries
        .outer_iter()
        .zip(nn.k_nearest_batch(&queries, 15).unwrap())
    {
        let expected = brute_force(&points, query);
        assert_eq!(found.indices, &expected[..15]);
        assert!(found
            .distances
            .windows(2)
            .into_iter()
            .all(|w| w[0] <= w[1]));
    }
}

#[test]
fn rounded_points_keep_a_deterministic_order() {
    // many exact ties on an integer grid
    let mut rng = Xoshiro256Plus::seed_from_u64(7);
    let points: Array2<f64> =
        Array2::random_using((150, 2), Uniform::new(-3., 3.), &mut rng).mapv(f64::round);
    let nn = NeighborIndex::from_batch(&points, Metric::Euclidean).unwrap();

    let pt = aview1(&[0.0, 0.0]);
    let first = nn.k_nearest(pt, 60).unwrap();
    assert_eq!(first.indices, &brute_force(&points, pt)[..60]);

    let reversed = points.slice(ndarray::s![..;-1, ..]).to_owned();
    let nn_rev = NeighborIndex::from_batch(&reversed, Metric::Euclidean).unwrap();
    let second = nn_rev.k_nearest(pt, 60).unwrap();
    assert_abs_diff_eq!(first.distances, second.distances);
}

#[test]
fn mahalanobis_equals_euclidean_on_whitened_data() {
    let mut rng = Xoshiro256Plus::seed_from_u64(3);
    let latent: Array2<f64> = Array2::random_using((100, 3), Uniform::new(-1., 1.), &mut rng);
    let mixing = ndarray::array![[3., 0.5, 0.], [0., 0.2, 1.], [1., 0., 10.]];
    let points = latent.dot(&mixing);

    let maha = Mahalanobis::fit(&points, &Array1::ones(100)).unwrap();
    let white = maha.whiten(&points).unwrap();

    let by_maha = NeighborIndex::from_batch(&points, Metric::Mahalanobis).unwrap();
    let by_euclid = NeighborIndex::from_batch(&white, Metric::Euclidean).unwrap();
    for i in 0..10 {
        let a = by_maha.k_nearest(points.row(i), 10).unwrap();
        let b = by_euclid.k_nearest(white.row(i), 10).unwrap();
        assert_eq!(a.indices, b.indices);
        assert_abs_diff_eq!(a.distances, b.distances, epsilon = 1e-10);
    }

    // whitened data has identity covariance
    let cov = white.t().dot(&(&white - &white.mean_axis(Axis(0)).unwrap())) / 100.;
    assert_abs_diff_eq!(cov, Array2::eye(3), epsilon = 1e-10);
}

#[test]
fn neighborhood_weights_are_floored() {
    let mut rng = Xoshiro256Plus::seed_from_u64(11);
    let points: Array2<f64> = Array2::random_using((300, 5), Uniform::new(0., 1.), &mut rng);
    let nn = NeighborIndex::from_batch(&points, Metric::Euclidean).unwrap();
    let tol = 1e-4;

    for kernel in &[
        WeightKernel::Bisquare,
        WeightKernel::Gaussian,
        WeightKernel::Inverse,
        WeightKernel::Exponential { cri: 4. },
    ] {
        for neighbors in nn.k_nearest_batch(&points.slice(ndarray::s![..30, ..]), 50).unwrap() {
            for &h in &[0.05, 1., 5.] {
                let w = weights_from_distances(&neighbors.distances, h, *kernel, tol).unwrap();
                assert_eq!(w.len(), 50);
                assert!(w.iter().all(|v| *v >= tol && *v <= 1.));
                assert_abs_diff_eq!(w[0], 1.);
            }
        }
    }
}
