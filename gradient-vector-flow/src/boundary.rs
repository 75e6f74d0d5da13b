//! Mirror (reflective) boundary condition for 2D fields.
//!
//! A padded field carries one extra row/column on every side. The mirror rule
//! copies the second line in from each edge onto the edge itself, so a
//! finite-difference stencil centred on an original edge pixel sees the field
//! continued symmetrically:
//!
//! ```text
//! row 0      := row 2           col 0      := col 2
//! row last   := row last-2      col last   := col last-2
//! (0, 0)     := (2, 2)          (0, last)  := (2, last-2)
//! (last, 0)  := (last-2, 2)     (last, last) := (last-2, last-2)
//! ```

use crate::error::{GvfError, Result};
use ndarray::{s, Array2, ArrayBase, Data, DataMut, Ix2};

/// Smallest extent along either axis for which the mirror rule is defined.
pub const MIN_EXTENT: usize = 3;

pub(crate) fn check_shape(dim: (usize, usize)) -> Result<()> {
    let (rows, cols) = dim;
    if rows < MIN_EXTENT || cols < MIN_EXTENT {
        return Err(GvfError::Shape { rows, cols });
    }
    Ok(())
}

/// Returns a copy of `field` whose outermost border is rewritten by the
/// mirror rule. The interior is left untouched.
pub fn mirror_ensure<S>(field: &ArrayBase<S, Ix2>) -> Result<Array2<f64>>
where
    S: Data<Elem = f64>,
{
    let mut out = field.to_owned();
    mirror_ensure_in_place(&mut out)?;
    Ok(out)
}

/// In-place form of [`mirror_ensure`].
pub fn mirror_ensure_in_place<S>(field: &mut ArrayBase<S, Ix2>) -> Result<()>
where
    S: DataMut<Elem = f64>,
{
    check_shape(field.dim())?;
    let (m, n) = field.dim();

    // Top and bottom rows
    for j in 0..n {
        field[[0, j]] = field[[2, j]];
        field[[m - 1, j]] = field[[m - 3, j]];
    }

    // Left and right columns
    for i in 0..m {
        field[[i, 0]] = field[[i, 2]];
        field[[i, n - 1]] = field[[i, n - 3]];
    }

    // Corners
    field[[0, 0]] = field[[2, 2]];
    field[[0, n - 1]] = field[[2, n - 3]];
    field[[m - 1, 0]] = field[[m - 3, 2]];
    field[[m - 1, n - 1]] = field[[m - 3, n - 3]];

    Ok(())
}

/// Pads an `m x n` field to `(m + 2) x (n + 2)`, filling the new border with
/// the mirror rule.
pub fn mirror_expand<S>(field: &ArrayBase<S, Ix2>) -> Result<Array2<f64>>
where
    S: Data<Elem = f64>,
{
    check_shape(field.dim())?;
    let (m, n) = field.dim();

    let mut out = Array2::<f64>::zeros((m + 2, n + 2));
    out.slice_mut(s![1..m + 1, 1..n + 1]).assign(field);
    mirror_ensure_in_place(&mut out)?;
    Ok(out)
}

/// Drops the one-cell border added by [`mirror_expand`].
pub fn mirror_shrink<S>(field: &ArrayBase<S, Ix2>) -> Result<Array2<f64>>
where
    S: Data<Elem = f64>,
{
    check_shape(field.dim())?;
    let (m, n) = field.dim();
    Ok(field.slice(s![1..m - 1, 1..n - 1]).to_owned())
}
