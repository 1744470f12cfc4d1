//! Utility functions for randomly generating datasets

use chemolv::{Dataset, LabeledDataset};
use ndarray::{s, Array, Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2};
use ndarray_rand::{
    rand::{Rng, SeedableRng},
    rand_distr::{Distribution, StandardNormal, Uniform},
    RandomExt,
};
use rand_xoshiro::Xoshiro256Plus;

/// Band centers of the constituents, as fractions of the wavelength range
const BANDS: [(f64, f64); 4] = [(0.2, 0.06), (0.45, 0.1), (0.65, 0.05), (0.85, 0.08)];

/// Gaussian absorption band over `p` equally spaced wavelengths
fn band(p: usize, center: f64, width: f64) -> Array1<f64> {
    Array1::linspace(0., 1., p).mapv(|l| (-(l - center).powi(2) / (2. * width * width)).exp())
}

/// Random baselines: an offset and a slope per spectrum
fn baselines(n: usize, p: usize, rng: &mut impl Rng) -> Array2<f64> {
    let offsets: Array1<f64> = Array::random_using(n, Uniform::new(0., 0.2), rng);
    let slopes: Array1<f64> = Array::random_using(n, Uniform::new(-0.1, 0.1), rng);
    let grid = Array1::linspace(0., 1., p);
    Array2::from_shape_fn((n, p), |(i, j)| offsets[i] + slopes[i] * grid[j])
}

/// Synthetic NIR-like spectra
///
/// Every spectrum mixes four absorption bands with random concentrations in `[0, 1)`, adds a
/// linear baseline and a small white noise. The response is ten times the concentration of the
/// first constituent.
pub fn spectra(n: usize, p: usize, seed: u64) -> Dataset<f64> {
    let mut rng = Xoshiro256Plus::seed_from_u64(seed);
    let concentrations: Array2<f64> = Array::random_using((n, BANDS.len()), Uniform::new(0., 1.), &mut rng);

    let mut pure = Array2::zeros((BANDS.len(), p));
    for (mut row, &(center, width)) in pure.rows_mut().into_iter().zip(BANDS.iter()) {
        row.assign(&band(p, center, width));
    }

    let noise: Array2<f64> = Array::random_using((n, p), StandardNormal, &mut rng) * 0.002;
    let records = concentrations.dot(&pure) + baselines(n, p, &mut rng) + noise;
    let targets = concentrations.slice(s![.., 0..1]).mapv(|c| 10. * c);

    Dataset::new(records, targets)
}

/// Predictors and a single response driven by `rank` latent variables
///
/// The latent variables have standard deviations `rank, rank - 1, .., 1`, the predictors are
/// random linear combinations of them plus column offsets, the response is their sum. Both are
/// perturbed by a gaussian noise of standard deviation `noise`.
pub fn latent_dataset(n: usize, p: usize, rank: usize, noise: f64, seed: u64) -> Dataset<f64> {
    let mut rng = Xoshiro256Plus::seed_from_u64(seed);
    let scales = Array1::from_shape_fn(rank, |r| (rank - r) as f64);
    let latent: Array2<f64> = Array::random_using((n, rank), StandardNormal, &mut rng) * &scales;
    let loadings: Array2<f64> = Array::random_using((rank, p), StandardNormal, &mut rng);
    let offsets: Array1<f64> = Array::random_using(p, Uniform::new(-1., 1.), &mut rng);

    let xnoise: Array2<f64> = Array::random_using((n, p), StandardNormal, &mut rng) * noise;
    let records = latent.dot(&loadings) + &offsets + xnoise;

    let ynoise: Array1<f64> = Array::random_using(n, StandardNormal, &mut rng) * noise;
    let targets = (latent.sum_axis(Axis(1)) + ynoise).insert_axis(Axis(1));

    Dataset::new(records, targets)
}

/// Spectra of `nclass` classes with `size` observations each
///
/// All classes share the mixture of [`spectra`], class `c` adds a band centered at
/// `(c + 1) / (nclass + 1)` of the wavelength range. Labels are `0..nclass`.
pub fn classes(size: usize, p: usize, nclass: usize, seed: u64) -> LabeledDataset<f64, usize> {
    let n = size * nclass;
    let base = spectra(n, p, seed);
    let mut records = base.records;
    let labels = Array1::from_shape_fn(n, |i| i / size);
    for c in 0..nclass {
        let marker = band(p, (c + 1) as f64 / (nclass + 1) as f64, 0.04) * 0.5;
        let mut block = records.slice_mut(s![c * size..(c + 1) * size, ..]);
        block += &marker;
    }
    LabeledDataset::new(records, labels)
}

/// Random regression dataset with `q` responses linear in the `p` predictors
///
/// # Example
/// ```
/// use chemolv_datasets::generate::make_dataset;
/// let dataset = make_dataset(5, 5, 2, 42);
/// assert_eq!(dataset.targets().dim(), (5, 2));
/// ```
pub fn make_dataset(n: usize, p: usize, q: usize, seed: u64) -> Dataset<f64> {
    let mut rng = Xoshiro256Plus::seed_from_u64(seed);
    let records: Array2<f64> = Array::random_using((n, p), StandardNormal, &mut rng);
    let coefficients: Array2<f64> = Array::random_using((p, q), StandardNormal, &mut rng);
    let noise: Array2<f64> = Array::random_using((n, q), StandardNormal, &mut rng) * 0.1;
    let targets = records.dot(&coefficients) + noise;
    Dataset::new(records, targets)
}

/// Special case of `blobs_with_distribution` with a standard normal distribution.
pub fn blobs(
    blob_size: usize,
    blob_centroids: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    rng: &mut impl Rng,
) -> LabeledDataset<f64, usize> {
    blobs_with_distribution(blob_size, blob_centroids, StandardNormal, rng)
}

/// Given an input matrix `blob_centroids`, with shape `(n_blobs, n_features)`,
/// generate `blob_size` data points (a "blob") around each of the blob centroids.
///
/// The label of every point is the index of its centroid.
pub fn blobs_with_distribution(
    blob_size: usize,
    blob_centroids: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    distribution: impl Distribution<f64> + Clone,
    rng: &mut impl Rng,
) -> LabeledDataset<f64, usize> {
    let (n_centroids, n_features) = blob_centroids.dim();
    let mut blobs: Array2<f64> = Array2::zeros((n_centroids * blob_size, n_features));

    for (blob_index, blob_centroid) in blob_centroids.rows().into_iter().enumerate() {
        let blob = make_blob(blob_size, &blob_centroid, distribution.clone(), rng);

        let indexes = s![blob_index * blob_size..(blob_index + 1) * blob_size, ..];
        blobs.slice_mut(indexes).assign(&blob);
    }
    let labels = Array1::from_shape_fn(n_centroids * blob_size, |i| i / blob_size);
    LabeledDataset::new(blobs, labels)
}

/// Generate `blob_size` data points (a "blob") around `blob_centroid` using the given distribution.
fn make_blob(
    blob_size: usize,
    blob_centroid: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    distribution: impl Distribution<f64>,
    rng: &mut impl Rng,
) -> Array2<f64> {
    let shape = (blob_size, blob_centroid.len());
    let origin_blob: Array2<f64> = Array::random_using(shape, distribution, rng);
    origin_blob + blob_centroid
}
