//! `chemolv-datasets` provides synthetic datasets for the tests, examples and benchmarks of the
//! chemolv crates.
//!
//! Real spectroscopic data sets are large and come in many vendor formats, which are out of
//! scope. The generators below reproduce the structures the latent-variable models are designed
//! for instead:
//!
//! * [`spectra`]: NIR-like spectra as mixtures of broad absorption bands on top of a random
//!   baseline, with the concentration of the first constituent as response,
//! * [`latent_dataset`]: predictors and response driven by a few latent variables,
//! * [`classes`]: spectra of several classes differing by a class-specific band,
//! * [`generate::make_dataset`] and [`generate::blobs`] for plain random data.
//!
//! All generators take an explicit seed and are reproducible.
//!
//! ```
//! let dataset = chemolv_datasets::spectra(20, 100, 42);
//! assert_eq!(dataset.records().dim(), (20, 100));
//! assert_eq!(dataset.targets().dim(), (20, 1));
//! ```
pub mod generate;

pub use generate::{classes, latent_dataset, spectra};
