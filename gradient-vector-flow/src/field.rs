use crate::error::{GvfError, Result};
use ndarray::{Array2, ArrayBase, ArrayView2, Axis, Data, Ix2, Zip};

/// A 2D vector field stored as two same-shaped component arrays.
///
/// Arrays are indexed `[[row, col]]`. `u` is the component along axis 0
/// (increasing row, downward in an image) and `v` the component along
/// axis 1 (increasing column, rightward). Angles follow the same order:
/// `atan2(v, u)`.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorField {
    pub u: Array2<f64>,
    pub v: Array2<f64>,
}

impl VectorField {
    pub fn new(u: Array2<f64>, v: Array2<f64>) -> Result<Self> {
        if u.dim() != v.dim() {
            return Err(GvfError::ComponentMismatch {
                u: u.dim(),
                v: v.dim(),
            });
        }
        Ok(VectorField { u, v })
    }

    pub fn dim(&self) -> (usize, usize) {
        self.u.dim()
    }

    /// |w| = sqrt(u² + v²) per pixel.
    pub fn magnitude(&self) -> Array2<f64> {
        Zip::from(&self.u)
            .and(&self.v)
            .map_collect(|&u, &v| u.hypot(v))
    }

    /// Per-pixel direction `atan2(v, u)` in radians, in `(-pi, pi]`.
    pub fn angles(&self) -> Array2<f64> {
        Zip::from(&self.u)
            .and(&self.v)
            .map_collect(|&u, &v| v.atan2(u))
    }

    pub fn is_finite(&self) -> bool {
        self.u.iter().chain(self.v.iter()).all(|x| x.is_finite())
    }
}

/// Min-max scales `field` onto `[0, 1]`.
pub fn normalize<S>(field: &ArrayBase<S, Ix2>) -> Result<Array2<f64>>
where
    S: Data<Elem = f64>,
{
    if field.iter().any(|x| !x.is_finite()) {
        return Err(GvfError::NonFiniteInput);
    }

    let (min, max) = field
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
            (lo.min(x), hi.max(x))
        });
    let range = max - min;
    if range <= 0.0 {
        return Err(GvfError::DegenerateInput { value: min });
    }

    Ok(field.mapv(|x| (x - min) / range))
}

/// Discrete gradient `(fx, fy)`, `fx` along axis 0 and `fy` along axis 1.
///
/// Central differences inside, one-sided differences on the first and last
/// line of each axis. Needs at least two samples along each axis.
pub fn gradient<S>(field: &ArrayBase<S, Ix2>) -> (Array2<f64>, Array2<f64>)
where
    S: Data<Elem = f64>,
{
    let view = field.view();
    (axis_gradient(view, Axis(0)), axis_gradient(view, Axis(1)))
}

fn axis_gradient(field: ArrayView2<'_, f64>, axis: Axis) -> Array2<f64> {
    let len = field.len_of(axis);
    assert!(len >= 2, "gradient needs at least two samples along {axis:?}");

    let mut out = Array2::<f64>::zeros(field.raw_dim());
    for (k, mut lane) in out.axis_iter_mut(axis).enumerate() {
        let (lo, hi, scale) = if k == 0 {
            (0, 1, 1.0)
        } else if k == len - 1 {
            (len - 2, len - 1, 1.0)
        } else {
            (k - 1, k + 1, 0.5)
        };
        let hi = field.index_axis(axis, hi);
        let lo = field.index_axis(axis, lo);
        Zip::from(&mut lane)
            .and(&hi)
            .and(&lo)
            .for_each(|d, &h, &l| *d = (h - l) * scale);
    }
    out
}

/// 5-point Laplacian at `(i, j)`. Off-grid neighbours on the outer ring are
/// replaced by the edge value itself.
#[inline]
pub(crate) fn laplacian_at(field: &ArrayView2<'_, f64>, i: usize, j: usize) -> f64 {
    let (m, n) = field.dim();
    let centre = field[[i, j]];
    let up = field[[i.saturating_sub(1), j]];
    let down = field[[(i + 1).min(m - 1), j]];
    let left = field[[i, j.saturating_sub(1)]];
    let right = field[[i, (j + 1).min(n - 1)]];
    up + down + left + right - 4.0 * centre
}

/// Squared gradient magnitude `fx² + fy²`.
pub fn squared_magnitude(fx: &Array2<f64>, fy: &Array2<f64>) -> Array2<f64> {
    Zip::from(fx).and(fy).map_collect(|&x, &y| x * x + y * y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use std::f64::consts::PI;

    fn laplacian(field: &Array2<f64>) -> Array2<f64> {
        let view = field.view();
        Array2::from_shape_fn(view.dim(), |(i, j)| laplacian_at(&view, i, j))
    }

    #[test]
    fn normalize_maps_onto_unit_range() {
        let f = array![[2.0, 4.0], [6.0, 10.0]];
        let n = normalize(&f).unwrap();
        assert_eq!(n, array![[0.0, 0.25], [0.5, 1.0]]);
    }

    #[test]
    fn normalize_rejects_constant_field() {
        let f = Array2::from_elem((4, 4), 3.5);
        assert_eq!(normalize(&f), Err(GvfError::DegenerateInput { value: 3.5 }));
    }

    #[test]
    fn normalize_rejects_non_finite_values() {
        let mut f = Array2::<f64>::zeros((3, 3));
        f[[1, 1]] = f64::NAN;
        assert_eq!(normalize(&f), Err(GvfError::NonFiniteInput));
        f[[1, 1]] = f64::INFINITY;
        assert_eq!(normalize(&f), Err(GvfError::NonFiniteInput));
    }

    #[test]
    fn gradient_uses_central_and_one_sided_differences() {
        let f = array![
            [0.0, 1.0, 4.0],
            [2.0, 3.0, 8.0],
            [6.0, 5.0, 16.0],
        ];
        let (fx, fy) = gradient(&f);
        assert_eq!(
            fx,
            array![
                [2.0, 2.0, 4.0],
                [3.0, 2.0, 6.0],
                [4.0, 2.0, 8.0],
            ]
        );
        assert_eq!(
            fy,
            array![
                [1.0, 2.0, 3.0],
                [1.0, 3.0, 5.0],
                [-1.0, 5.0, 11.0],
            ]
        );
    }

    #[test]
    fn gradient_of_mirrored_field_vanishes_at_original_edges() {
        let f = Array2::from_shape_fn((4, 5), |(i, j)| (i * i + 2 * j) as f64);
        let padded = crate::boundary::mirror_expand(&f).unwrap();
        let (fx, fy) = gradient(&padded);
        for j in 0..7 {
            assert_eq!(fx[[1, j]], 0.0);
            assert_eq!(fx[[4, j]], 0.0);
        }
        for i in 0..6 {
            assert_eq!(fy[[i, 1]], 0.0);
            assert_eq!(fy[[i, 5]], 0.0);
        }
    }

    #[test]
    fn laplacian_of_linear_ramp_is_zero_inside() {
        let f = Array2::from_shape_fn((5, 6), |(i, j)| 3.0 * i as f64 - 2.0 * j as f64);
        let l = laplacian(&f);
        for i in 1..4 {
            for j in 1..5 {
                assert_abs_diff_eq!(l[[i, j]], 0.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn laplacian_of_impulse() {
        let mut f = Array2::<f64>::zeros((5, 5));
        f[[2, 2]] = 1.0;
        let l = laplacian(&f);
        assert_eq!(l[[2, 2]], -4.0);
        assert_eq!(l[[1, 2]], 1.0);
        assert_eq!(l[[3, 2]], 1.0);
        assert_eq!(l[[2, 1]], 1.0);
        assert_eq!(l[[2, 3]], 1.0);
        assert_eq!(l[[0, 0]], 0.0);
    }

    #[test]
    fn laplacian_repeats_edge_value_on_outer_ring() {
        let f = array![
            [1.0, 2.0, 3.0],
            [4.0, 5.0, 6.0],
            [7.0, 8.0, 9.0],
        ];
        // (0,0): up = 1, left = 1, down = 4, right = 2
        assert_eq!(laplacian(&f)[[0, 0]], 1.0 + 1.0 + 4.0 + 2.0 - 4.0);
    }

    #[test]
    fn magnitude_and_angles() {
        let field =
            VectorField::new(array![[1.0, 0.0], [-1.0, 3.0]], array![[0.0, 2.0], [0.0, 4.0]])
                .unwrap();
        assert_eq!(field.magnitude(), array![[1.0, 2.0], [1.0, 5.0]]);

        let angles = field.angles();
        assert_abs_diff_eq!(angles[[0, 0]], 0.0);
        assert_abs_diff_eq!(angles[[0, 1]], PI / 2.0);
        assert_abs_diff_eq!(angles[[1, 0]], PI);
        assert!(field.is_finite());
    }

    #[test]
    fn mismatched_components_are_rejected() {
        let err = VectorField::new(Array2::zeros((4, 5)), Array2::zeros((5, 4))).unwrap_err();
        assert_eq!(err, GvfError::ComponentMismatch { u: (4, 5), v: (5, 4) });
    }
}
