//! Gradient Vector Flow (GVF) of a 2D edge map.
//!
//! The GVF is a vector field `(u, v)` that agrees with the gradient of the edge
//! map where that gradient is strong and diffuses it smoothly into flat
//! regions. It is obtained by relaxing
//!
//! ```text
//! w <- w + mu * lap(w) - |grad f|^2 * (w - grad f)
//! ```
//!
//! on a copy of the edge map padded with a mirror boundary, until the update
//! norm falls below a tolerance or the iteration budget runs out.
//!
//! Arrays are indexed `[[row, col]]`; `u` runs along rows (axis 0) and `v`
//! along columns (axis 1). See [`VectorField`].
//!
//! ```no_run
//! use gradient_vector_flow::gvf;
//! use ndarray::Array2;
//!
//! let edge_map = Array2::from_shape_fn((64, 64), |(i, j)| if i == 32 || j == 32 { 1.0 } else { 0.0 });
//! let result = gvf(&edge_map, 0.15, 500, 0.02)?;
//! let angles = result.field.angles();
//! # Ok::<(), gradient_vector_flow::GvfError>(())
//! ```

pub mod boundary;
pub mod error;
pub mod field;
pub mod solver;

pub use boundary::{mirror_ensure, mirror_ensure_in_place, mirror_expand, mirror_shrink};
pub use error::GvfError;
pub use field::VectorField;
pub use solver::{
    gvf, gvf_with_params, stable_mu_limit, GvfParams, GvfResult, GvfSolver, DEFAULT_TOLERANCE,
    MAX_STABLE_MU,
};
