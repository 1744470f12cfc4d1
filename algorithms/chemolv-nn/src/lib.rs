//! # Nearest neighbors and distance weighting
//!
//! `chemolv-nn` finds the neighborhood of a query observation and turns the distances into
//! observation weights, the two steps that precede every locally weighted fit.
//!
//! * [`NeighborIndex`] searches a reference set exhaustively under the Euclidean or the
//!   Mahalanobis [`Metric`]. The neighbor order is deterministic: increasing distance, then
//!   ascending row index.
//! * [`weights_from_distances`] maps neighbor distances through a [`WeightKernel`] with bandwidth
//!   `h` into weights in `[tol, 1]`.
//!
//! ## Example
//!
//! ```rust
//! use chemolv_nn::{weights_from_distances, Metric, NeighborIndex, WeightKernel};
//! use ndarray::array;
//!
//! let reference = array![[0., 0.], [1., 0.], [0., 2.], [5., 5.]];
//! let index = NeighborIndex::from_batch(&reference, Metric::Euclidean)?;
//!
//! let neighbors = index.k_nearest(array![0.1, 0.].view(), 3)?;
//! assert_eq!(neighbors.indices, vec![0, 1, 2]);
//!
//! let weights = weights_from_distances(&neighbors.distances, 1., WeightKernel::Bisquare, 1e-4)?;
//! assert_eq!(weights[0], 1.);
//! # Ok::<(), chemolv_nn::NnError>(())
//! ```
use ndarray::ArrayView1;

pub mod distance;
mod error;
mod heap_elem;
mod index;
mod weights;

pub use distance::{Distance, L2Dist, Mahalanobis, Metric};
pub use error::{NnError, Result};
pub use index::{NeighborIndex, Neighbors};
pub use weights::{weights_from_distances, WeightKernel};

pub(crate) type Point<'a, F> = ArrayView1<'a, F>;
