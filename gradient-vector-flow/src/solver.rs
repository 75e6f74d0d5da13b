use crate::boundary::{self, mirror_ensure_in_place, mirror_expand, mirror_shrink};
use crate::error::{GvfError, Result};
use crate::field::{self, VectorField};
use log::{debug, info, warn};
use ndarray::{s, Array2, ArrayBase, Data, Ix2, Zip};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TOLERANCE: f64 = 0.02;

/// Largest `mu` for which the explicit update can be stable at all, reached
/// only where the edge map has no gradient. See [`stable_mu_limit`].
pub const MAX_STABLE_MU: f64 = 0.25;

/// Largest stable `mu` for a normalized edge map whose squared gradient
/// magnitude peaks at `max_sqr_mag`.
///
/// The highest-frequency mode of the update is scaled by
/// `1 - 8 * mu - |grad f|^2` per step, so the scheme stays bounded while
/// `8 * mu + max |grad f|^2 <= 2`.
pub fn stable_mu_limit(max_sqr_mag: f64) -> f64 {
    ((2.0 - max_sqr_mag) / 8.0).min(MAX_STABLE_MU)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GvfParams {
    pub mu: f64,              // Diffusion weight against gradient fidelity
    pub max_iterations: usize, // Iteration budget
    pub tolerance: f64,       // Stop once ||du|| + ||dv|| drops below this
    pub report_period: usize, // Log progress every N iterations, 0 disables
    pub parallel: bool,       // Update pixels with rayon
}

impl Default for GvfParams {
    fn default() -> Self {
        Self {
            mu: 0.15,
            max_iterations: 1000,
            tolerance: DEFAULT_TOLERANCE,
            report_period: 100,
            parallel: true,
        }
    }
}

impl GvfParams {
    pub fn new(mu: f64, max_iterations: usize) -> Self {
        Self {
            mu,
            max_iterations,
            ..Self::default()
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_report_period(mut self, report_period: usize) -> Self {
        self.report_period = report_period;
        self
    }

    /// Stability check for the explicit scheme, analogous to a CFL condition.
    pub fn is_stable(&self, max_sqr_mag: f64) -> bool {
        self.mu.is_finite() && (0.0..=stable_mu_limit(max_sqr_mag)).contains(&self.mu)
    }

    /// Input-independent checks. The stability bound also depends on the edge
    /// map and is enforced by [`GvfSolver::new`].
    pub fn validate(&self) -> Result<()> {
        if !self.is_stable(0.0) {
            return Err(GvfError::InvalidParameter {
                name: "mu",
                reason: format!(
                    "must lie in [0, {MAX_STABLE_MU}] for a stable update, got {}",
                    self.mu
                ),
            });
        }
        if self.max_iterations == 0 {
            return Err(GvfError::InvalidParameter {
                name: "max_iterations",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(GvfError::InvalidParameter {
                name: "tolerance",
                reason: format!("must be finite and positive, got {}", self.tolerance),
            });
        }
        Ok(())
    }
}

/// Outcome of a GVF solve at the edge map's original resolution.
#[derive(Debug, Clone)]
pub struct GvfResult {
    pub field: VectorField,
    pub converged: bool,
    pub iterations: usize,
    pub final_delta: f64,
}

impl GvfResult {
    pub fn u(&self) -> &Array2<f64> {
        &self.field.u
    }

    pub fn v(&self) -> &Array2<f64> {
        &self.field.v
    }

    pub fn into_parts(self) -> (Array2<f64>, Array2<f64>, bool) {
        (self.field.u, self.field.v, self.converged)
    }
}

/// Working storage for one component. `next` is swapped with `current`
/// after every relaxation so no buffer is reallocated inside the loop.
struct Component {
    current: Array2<f64>,
    previous: Array2<f64>,
    next: Array2<f64>,
    target: Array2<f64>, // fx or fy
}

impl Component {
    fn new(target: Array2<f64>) -> Self {
        let dim = target.raw_dim();
        Self {
            current: target.clone(),
            previous: Array2::zeros(dim),
            next: Array2::zeros(dim),
            target,
        }
    }

    /// One Jacobi sweep. Returns ||next - previous||.
    fn relax(&mut self, sqr_mag: &Array2<f64>, mu: f64, parallel: bool) -> Result<f64> {
        self.previous.assign(&self.current);
        mirror_ensure_in_place(&mut self.current)?;

        // w_new = w + mu * lap(w) - |grad f|^2 * (w - target)
        let current = self.current.view();
        let update = |(i, j): (usize, usize), out: &mut f64, &s: &f64, &g: &f64| {
            let w = current[[i, j]];
            *out = w + mu * field::laplacian_at(&current, i, j) - s * (w - g);
        };
        let zip = Zip::indexed(&mut self.next).and(sqr_mag).and(&self.target);
        if parallel {
            zip.par_for_each(update);
        } else {
            zip.for_each(update);
        }

        let sum_sq = Zip::from(&self.next)
            .and(&self.previous)
            .fold(0.0, |acc, &a, &b| acc + (a - b) * (a - b));

        std::mem::swap(&mut self.current, &mut self.next);
        Ok(sum_sq.sqrt())
    }

    fn snapshot(&self) -> Result<Array2<f64>> {
        let mut out = self.current.clone();
        mirror_ensure_in_place(&mut out)?;
        mirror_shrink(&out)
    }
}

/// Iterative GVF relaxation over a mirror-padded copy of the edge map.
pub struct GvfSolver {
    params: GvfParams,
    sqr_mag: Array2<f64>,
    u: Component,
    v: Component,
    iteration: usize,
    converged: bool,
    last_delta: f64,
}

impl GvfSolver {
    pub fn new<S>(edge_map: &ArrayBase<S, Ix2>, params: GvfParams) -> Result<Self>
    where
        S: Data<Elem = f64>,
    {
        params.validate()?;
        boundary::check_shape(edge_map.dim())?;

        let f = field::normalize(edge_map)?;
        let f = mirror_expand(&f)?;
        let (fx, fy) = field::gradient(&f);
        let sqr_mag = field::squared_magnitude(&fx, &fy);

        // The outer ring is rewritten by the mirror boundary every step.
        let max_s = sqr_mag
            .slice(s![1..-1, 1..-1])
            .fold(0.0, |acc: f64, &x| acc.max(x));
        if !params.is_stable(max_s) {
            return Err(GvfError::InvalidParameter {
                name: "mu",
                reason: format!(
                    "{} is unstable for this edge map (max |grad f|^2 = {:.4}), \
                     must not exceed {:.4}",
                    params.mu,
                    max_s,
                    stable_mu_limit(max_s)
                ),
            });
        }

        debug!(
            "GVF setup: {}x{} edge map, padded to {:?}, max |grad f|^2 = {:.4}",
            edge_map.nrows(),
            edge_map.ncols(),
            f.dim(),
            max_s
        );

        Ok(Self {
            params,
            sqr_mag,
            u: Component::new(fx),
            v: Component::new(fy),
            iteration: 0,
            converged: false,
            last_delta: f64::INFINITY,
        })
    }

    pub fn params(&self) -> &GvfParams {
        &self.params
    }

    /// Number of relaxation steps performed so far.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn is_converged(&self) -> bool {
        self.converged
    }

    /// Update norm of the most recent step, `inf` before the first one.
    pub fn last_delta(&self) -> f64 {
        self.last_delta
    }

    pub fn is_finished(&self) -> bool {
        self.converged || self.iteration >= self.params.max_iterations
    }

    pub fn step(&mut self) -> Result<f64> {
        if self.params.parallel {
            self.step_parallel()
        } else {
            self.step_serial()
        }
    }

    pub fn step_serial(&mut self) -> Result<f64> {
        let mu = self.params.mu;
        let du = self.u.relax(&self.sqr_mag, mu, false)?;
        let dv = self.v.relax(&self.sqr_mag, mu, false)?;
        self.finish_step(du + dv)
    }

    /// Relaxes both components concurrently, each with a parallel pixel sweep.
    /// Both sweeps complete before the step returns.
    pub fn step_parallel(&mut self) -> Result<f64> {
        let mu = self.params.mu;
        let (u, v, sqr_mag) = (&mut self.u, &mut self.v, &self.sqr_mag);
        let (du, dv) = rayon::join(
            || u.relax(sqr_mag, mu, true),
            || v.relax(sqr_mag, mu, true),
        );
        self.finish_step(du? + dv?)
    }

    fn finish_step(&mut self, delta: f64) -> Result<f64> {
        self.iteration += 1;
        self.last_delta = delta;

        if !delta.is_finite() {
            return Err(GvfError::Diverged {
                iteration: self.iteration,
            });
        }

        debug!("iteration {}: delta = {:.6e}", self.iteration, delta);
        if delta < self.params.tolerance {
            self.converged = true;
        }
        Ok(delta)
    }

    /// Current field at the original resolution, with the mirror boundary
    /// refreshed before the padding is dropped.
    pub fn current_field(&self) -> Result<VectorField> {
        VectorField::new(self.u.snapshot()?, self.v.snapshot()?)
    }

    pub fn run(mut self) -> Result<GvfResult> {
        let (rows, cols) = self.sqr_mag.dim();
        info!(
            "Starting GVF relaxation on {}x{} (mu = {}, budget = {}, tolerance = {})",
            rows - 2,
            cols - 2,
            self.params.mu,
            self.params.max_iterations,
            self.params.tolerance
        );

        while !self.is_finished() {
            let delta = self.step()?;

            let period = self.params.report_period;
            if period > 0 && self.iteration % period == 0 {
                info!(
                    "Iteration {}/{} (delta = {:.6e})",
                    self.iteration, self.params.max_iterations, delta
                );
            }
        }

        if self.converged {
            info!(
                "GVF converged after {} iterations (delta = {:.6e})",
                self.iteration, self.last_delta
            );
        } else {
            warn!(
                "GVF did not converge within {} iterations (delta = {:.6e}, tolerance = {})",
                self.iteration, self.last_delta, self.params.tolerance
            );
        }

        Ok(GvfResult {
            field: self.current_field()?,
            converged: self.converged,
            iterations: self.iteration,
            final_delta: self.last_delta,
        })
    }
}

/// Computes the GVF of `field` with regularization `mu`.
pub fn gvf<S>(
    field: &ArrayBase<S, Ix2>,
    mu: f64,
    max_iterations: usize,
    tolerance: f64,
) -> Result<GvfResult>
where
    S: Data<Elem = f64>,
{
    let params = GvfParams::new(mu, max_iterations).with_tolerance(tolerance);
    gvf_with_params(field, &params)
}

pub fn gvf_with_params<S>(field: &ArrayBase<S, Ix2>, params: &GvfParams) -> Result<GvfResult>
where
    S: Data<Elem = f64>,
{
    GvfSolver::new(field, *params)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(n: usize) -> Array2<f64> {
        Array2::from_shape_fn((n, n), |(i, j)| {
            if (n / 4..3 * n / 4).contains(&i) && (n / 4..3 * n / 4).contains(&j) {
                1.0
            } else {
                0.0
            }
        })
    }

    #[test]
    fn default_params() {
        let p = GvfParams::default();
        assert_eq!(p.tolerance, 0.02);
        assert!(p.validate().is_ok());
        assert_eq!(GvfParams::new(0.1, 50).tolerance, DEFAULT_TOLERANCE);
    }

    #[test]
    fn params_from_toml_fill_defaults() {
        let p: GvfParams = toml::from_str("mu = 0.1\nmax_iterations = 250").unwrap();
        assert_eq!(p.mu, 0.1);
        assert_eq!(p.max_iterations, 250);
        assert_eq!(p.tolerance, DEFAULT_TOLERANCE);
        assert!(p.parallel);
    }

    #[test]
    fn invalid_params_are_rejected() {
        let f = square(8);
        for params in [
            GvfParams::new(-0.1, 10),
            GvfParams::new(0.3, 10),
            GvfParams::new(f64::NAN, 10),
            GvfParams::new(0.2, 0),
            GvfParams::new(0.2, 10).with_tolerance(0.0),
            GvfParams::new(0.2, 10).with_tolerance(f64::INFINITY),
        ] {
            assert!(matches!(
                GvfSolver::new(&f, params),
                Err(GvfError::InvalidParameter { .. })
            ));
        }
        assert!(GvfParams::new(0.0, 1).validate().is_ok());
        assert!(GvfParams::new(MAX_STABLE_MU, 1).validate().is_ok());
    }

    #[test]
    fn stable_mu_limit_tightens_with_gradient_strength() {
        assert_eq!(stable_mu_limit(0.0), MAX_STABLE_MU);
        assert_eq!(stable_mu_limit(0.25), 0.21875);
        assert_eq!(stable_mu_limit(0.5), 0.1875);
        assert!(GvfParams::new(0.2, 1).is_stable(0.25));
        assert!(!GvfParams::new(0.2, 1).is_stable(0.5));
    }

    #[test]
    fn mu_beyond_the_edge_map_limit_is_rejected() {
        // The square's corners have |grad f|^2 = 0.5.
        let f = square(16);
        match GvfSolver::new(&f, GvfParams::new(0.2, 10)) {
            Err(GvfError::InvalidParameter { name, reason }) => {
                assert_eq!(name, "mu");
                assert!(reason.contains("0.1875"), "{reason}");
            }
            other => panic!("expected an unstable mu to be rejected, got {:?}", other.map(|_| ())),
        }
        assert!(GvfSolver::new(&f, GvfParams::new(0.1875, 10)).is_ok());
    }

    #[test]
    fn non_finite_delta_reports_divergence() {
        let mut solver = GvfSolver::new(&square(8), GvfParams::new(0.15, 10)).unwrap();
        solver.step().unwrap();
        assert_eq!(
            solver.finish_step(f64::NAN),
            Err(GvfError::Diverged { iteration: 2 })
        );
        assert_eq!(
            solver.finish_step(f64::INFINITY),
            Err(GvfError::Diverged { iteration: 3 })
        );
        assert!(!solver.is_converged());
    }

    #[test]
    fn undersized_edge_map_is_rejected() {
        let f = ndarray::array![[0.0, 1.0], [1.0, 0.0]];
        assert!(matches!(
            gvf(&f, 0.2, 10, 0.02),
            Err(GvfError::Shape { rows: 2, cols: 2 })
        ));
    }

    #[test]
    fn serial_and_parallel_steps_agree() {
        let f = square(16);
        let mut serial = GvfSolver::new(&f, GvfParams::new(0.15, 40).with_parallel(false)).unwrap();
        let mut parallel = GvfSolver::new(&f, GvfParams::new(0.15, 40).with_parallel(true)).unwrap();

        for _ in 0..25 {
            let a = serial.step_serial().unwrap();
            let b = parallel.step_parallel().unwrap();
            assert_eq!(a, b);
        }
        assert_eq!(serial.current_field().unwrap(), parallel.current_field().unwrap());
    }

    #[test]
    fn stepping_tracks_budget() {
        let f = square(12);
        let mut solver = GvfSolver::new(&f, GvfParams::new(0.15, 3).with_tolerance(1e-12)).unwrap();
        assert_eq!(solver.iteration(), 0);
        assert!(solver.last_delta().is_infinite());
        while !solver.is_finished() {
            solver.step().unwrap();
        }
        assert_eq!(solver.iteration(), 3);
        assert!(!solver.is_converged());
        assert_eq!(solver.current_field().unwrap().dim(), (12, 12));
    }

    #[test]
    fn exhausted_budget_is_reported_not_raised() {
        let result = gvf(&square(20), 0.15, 5, 1e-9).unwrap();
        assert!(!result.converged);
        assert_eq!(result.iterations, 5);
        assert!(result.final_delta >= 1e-9);
        let (u, v, converged) = result.into_parts();
        assert_eq!(u.dim(), (20, 20));
        assert_eq!(v.dim(), (20, 20));
        assert!(!converged);
    }
}
