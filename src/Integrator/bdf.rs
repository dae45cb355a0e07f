//! Variable-order, variable-step BDF for the stiff burn equations.
//!
//! The solution history is kept as a modified divided-difference array D (D[0] = y,
//! D[1] ~ h y', ...). A step of order k
//! 1. predicts y = sum_{i<=k} D[i],
//! 2. corrects with a modified Newton iteration on (I - c J) dy = c f(y) - psi - d,
//!    c = h/gamma_k, reusing the LU factorization while the step size stays fixed,
//! 3. estimates the local error as d/(k+1) in the weighted RMS norm,
//! 4. after k+1 steps of equal size compares the error estimates of orders k-1, k, k+1
//!    and changes order and step size to the most favourable one.
//!
//! Changing h rescales the difference array in place, so no interpolation of past
//! solution values is needed. Newton failure with a fresh Jacobian halves h; an error
//! test failure shrinks h by the usual (safety * err^(-1/(k+1))) factor.
use crate::EOS::eos_api::EosError;
use crate::Integrator::burn_state::{BurnCounters, BurnFailure};
use crate::Integrator::integrator_config::IntegratorConfig;
use crate::Network::network_table::normalize_mass_fractions;
use crate::Network::rhs::{BurnRhs, RhsPoint};
use log::{debug, trace};
use nalgebra::{DMatrix, DVector, Dyn, LU};

pub const MAX_ORDER: usize = 5;
const SAFETY: f64 = 0.9;

enum EvalError {
    Budget(usize),
    Eos(EosError),
}

impl From<EvalError> for BurnFailure {
    fn from(err: EvalError) -> Self {
        match err {
            EvalError::Budget(max) => BurnFailure::EvaluationBudgetExceeded(max),
            EvalError::Eos(e) => BurnFailure::EosDomain(e),
        }
    }
}

/// Counts every right-hand-side and Jacobian evaluation against the optional budget.
struct Evaluator<'r, 'a> {
    rhs: &'r BurnRhs<'a>,
    counters: BurnCounters,
    budget: Option<usize>,
}

impl<'r, 'a> Evaluator<'r, 'a> {
    /// Fails unless `cost` more evaluations fit in the budget.
    fn check_budget(&self, cost: usize) -> Result<(), EvalError> {
        if let Some(max) = self.budget {
            if self.counters.n_rhs + self.counters.n_jac + cost > max {
                return Err(EvalError::Budget(max));
            }
        }
        Ok(())
    }

    fn rhs(&mut self, y: &DVector<f64>) -> Result<RhsPoint, EvalError> {
        self.check_budget(1)?;
        self.counters.n_rhs += 1;
        self.rhs.evaluate(y).map_err(EvalError::Eos)
    }

    fn jacobian(&mut self, y: &DVector<f64>, point: &RhsPoint) -> Result<DMatrix<f64>, EvalError> {
        // a numerical Jacobian also spends one rhs evaluation per column
        self.check_budget(1 + self.rhs.jacobian_rhs_cost())?;
        self.counters.n_jac += 1;
        let (jac, extra_rhs) = self.rhs.jacobian(y, point).map_err(EvalError::Eos)?;
        self.counters.n_rhs += extra_rhs;
        Ok(jac)
    }
}

enum NewtonOutcome {
    Converged {
        y: DVector<f64>,
        d: DVector<f64>,
        iterations: usize,
    },
    Diverged,
    EosFailure(EosError),
}

/// Reason of the last rejected attempt of the current step.
enum Rejection {
    Newton,
    ErrorTest,
    Eos(EosError),
}

fn rms_norm(v: &DVector<f64>, scale: &DVector<f64>) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    (v.component_div(scale).norm_squared() / v.len() as f64).sqrt()
}

/// Matrix R(factor) of the difference-array rescaling.
fn compute_r(order: usize, factor: f64) -> DMatrix<f64> {
    let mut m = DMatrix::<f64>::zeros(order + 1, order + 1);
    for j in 0..=order {
        m[(0, j)] = 1.0;
    }
    for i in 1..=order {
        for j in 1..=order {
            m[(i, j)] = (i as f64 - 1.0 - factor * j as f64) / i as f64;
        }
    }
    // cumulative product down each column
    for i in 1..=order {
        for j in 0..=order {
            m[(i, j)] *= m[(i - 1, j)];
        }
    }
    m
}

/// Rescale D[0..=order] for a step size multiplied by `factor`.
fn change_d(d: &mut [DVector<f64>], order: usize, factor: f64) {
    let ru = compute_r(order, factor) * compute_r(order, 1.0);
    let old: Vec<DVector<f64>> = d[..=order].to_vec();
    for i in 0..=order {
        let mut row = DVector::zeros(old[0].len());
        for (j, old_j) in old.iter().enumerate() {
            row.axpy(ru[(j, i)], old_j, 1.0);
        }
        d[i] = row;
    }
}

struct Bdf<'c> {
    config: &'c IntegratorConfig,
    n_species: usize,
    rtol: DVector<f64>,
    atol: DVector<f64>,
    max_order: usize,
    gamma: [f64; MAX_ORDER + 2],
    error_const: [f64; MAX_ORDER + 2],
    newton_tol: f64,
}

impl<'c> Bdf<'c> {
    fn new(config: &'c IntegratorConfig, n_species: usize) -> Self {
        let (rtol, atol) = config.tolerance_vectors(n_species);
        let mut gamma = [0.0; MAX_ORDER + 2];
        for k in 1..MAX_ORDER + 2 {
            gamma[k] = gamma[k - 1] + 1.0 / k as f64;
        }
        let mut error_const = [0.0; MAX_ORDER + 2];
        for (k, c) in error_const.iter_mut().enumerate() {
            *c = 1.0 / (k as f64 + 1.0);
        }
        let rtol_min = rtol.min();
        let newton_tol = (10.0 * f64::EPSILON / rtol_min).max(0.03f64.min(rtol_min.sqrt()));
        Bdf {
            config,
            n_species,
            rtol,
            atol,
            max_order: config.max_order.clamp(1, MAX_ORDER),
            gamma,
            error_const,
            newton_tol,
        }
    }

    fn scale(&self, y: &DVector<f64>) -> DVector<f64> {
        (&self.atol + self.rtol.component_mul(&y.abs())).map(|s| s.max(f64::MIN_POSITIVE))
    }

    /// Starting step from the scale of y0 and of its first two derivatives
    /// (Hairer, Norsett & Wanner, Solving ODEs I, sec. II.4).
    fn initial_step(
        &self,
        ev: &mut Evaluator,
        y0: &DVector<f64>,
        f0: &DVector<f64>,
        t_end: f64,
    ) -> Result<f64, BurnFailure> {
        let scale = self.scale(y0);
        let d0 = rms_norm(y0, &scale);
        let d1 = rms_norm(f0, &scale);
        let h0 = if d0 < 1e-5 || d1 < 1e-5 {
            1e-6
        } else {
            0.01 * d0 / d1
        };
        let h0 = h0.min(t_end);
        let y1 = y0 + f0 * h0;
        let f1 = match ev.rhs(&y1) {
            Ok(point) => point.ydot,
            Err(EvalError::Budget(max)) => return Err(BurnFailure::EvaluationBudgetExceeded(max)),
            Err(EvalError::Eos(_)) => return Ok(h0),
        };
        let d2 = rms_norm(&(f1 - f0), &scale) / h0;
        let h1 = if d1 <= 1e-15 && d2 <= 1e-15 {
            (h0 * 1e-3).max(1e-6)
        } else {
            (0.01 / d1.max(d2)).sqrt()
        };
        Ok((100.0 * h0).min(h1).min(t_end))
    }

    fn solve_newton(
        &self,
        ev: &mut Evaluator,
        c: f64,
        psi: &DVector<f64>,
        y_predict: &DVector<f64>,
        lu: &LU<f64, Dyn, Dyn>,
        scale: &DVector<f64>,
    ) -> Result<NewtonOutcome, BurnFailure> {
        let max_iter = self.config.max_newton_iterations;
        let mut d = DVector::zeros(y_predict.len());
        let mut y = y_predict.clone();
        let mut dy_norm_old: Option<f64> = None;
        for k in 0..max_iter {
            let f = match ev.rhs(&y) {
                Ok(point) => point.ydot,
                Err(EvalError::Budget(max)) => {
                    return Err(BurnFailure::EvaluationBudgetExceeded(max));
                }
                Err(EvalError::Eos(e)) => return Ok(NewtonOutcome::EosFailure(e)),
            };
            if f.iter().any(|v| !v.is_finite()) {
                return Ok(NewtonOutcome::Diverged);
            }
            let residual = &f * c - psi - &d;
            let Some(dy) = lu.solve(&residual) else {
                return Ok(NewtonOutcome::Diverged);
            };
            let dy_norm = rms_norm(&dy, scale);
            if !dy_norm.is_finite() {
                return Ok(NewtonOutcome::Diverged);
            }
            let rate = dy_norm_old.map(|old| dy_norm / old);
            if let Some(rate) = rate {
                if rate >= 1.0
                    || rate.powi((max_iter - k) as i32) / (1.0 - rate) * dy_norm > self.newton_tol
                {
                    return Ok(NewtonOutcome::Diverged);
                }
            }
            y += &dy;
            d += &dy;
            if dy_norm == 0.0 || rate.is_some_and(|r| r / (1.0 - r) * dy_norm < self.newton_tol) {
                return Ok(NewtonOutcome::Converged {
                    y,
                    d,
                    iterations: k + 1,
                });
            }
            dy_norm_old = Some(dy_norm);
        }
        Ok(NewtonOutcome::Diverged)
    }

    fn rejection_failure(&self, rejection: Rejection, time: f64, failures: usize) -> BurnFailure {
        match rejection {
            Rejection::Newton => BurnFailure::NewtonNonConvergence { time, failures },
            Rejection::ErrorTest => BurnFailure::ErrorTestFailure { time, failures },
            Rejection::Eos(e) => BurnFailure::EosDomain(e),
        }
    }

    fn run(&self, ev: &mut Evaluator, y0: DVector<f64>, t_end: f64) -> Result<DVector<f64>, BurnFailure> {
        let n = y0.len();
        let max_step = self.config.max_step.unwrap_or(f64::INFINITY);
        let max_iter = self.config.max_newton_iterations;
        let identity = DMatrix::<f64>::identity(n, n);

        let point0 = ev.rhs(&y0)?;
        let mut h_abs = match self.config.initial_step {
            Some(h0) => h0.min(t_end),
            None => self.initial_step(ev, &y0, &point0.ydot, t_end)?,
        };
        h_abs = h_abs.min(max_step).max(self.config.min_step);
        let mut jac = ev.jacobian(&y0, &point0)?;
        let mut jac_current = true;

        let mut d: Vec<DVector<f64>> = vec![DVector::zeros(n); MAX_ORDER + 3];
        d[1] = &point0.ydot * h_abs;
        d[0] = y0;
        let mut order = 1usize;
        let mut n_equal_steps = 0usize;
        let mut lu: Option<LU<f64, Dyn, Dyn>> = None;
        let mut t = 0.0;

        while t < t_end {
            if ev.counters.n_steps >= self.config.max_steps {
                return Err(BurnFailure::TooManySteps(self.config.max_steps));
            }
            let min_step = self.config.min_step.max(10.0 * f64::EPSILON * t.abs());
            if h_abs > max_step {
                change_d(&mut d, order, max_step / h_abs);
                h_abs = max_step;
                n_equal_steps = 0;
                lu = None;
            } else if h_abs < min_step {
                change_d(&mut d, order, min_step / h_abs);
                h_abs = min_step;
                n_equal_steps = 0;
                lu = None;
            }

            let mut consecutive_failures = 0usize;
            let mut last_rejection: Option<Rejection> = None;
            let (t_new, d_sum, error_norm, scale, safety) = loop {
                if h_abs < min_step {
                    return Err(match last_rejection {
                        Some(Rejection::Eos(e)) => BurnFailure::EosDomain(e),
                        _ => BurnFailure::StepUnderflow { time: t, step: h_abs },
                    });
                }
                let mut t_new = t + h_abs;
                if t_new > t_end {
                    t_new = t_end;
                    change_d(&mut d, order, (t_end - t) / h_abs);
                    n_equal_steps = 0;
                    lu = None;
                }
                let h = t_new - t;
                h_abs = h;

                let mut y_predict = DVector::zeros(n);
                for d_i in &d[..=order] {
                    y_predict += d_i;
                }
                let scale = self.scale(&y_predict);
                let mut psi = DVector::zeros(n);
                for i in 1..=order {
                    psi.axpy(self.gamma[i], &d[i], 1.0);
                }
                psi /= self.gamma[order];
                let c = h / self.gamma[order];

                let mut converged = None;
                loop {
                    let factorized = match lu.take() {
                        Some(factorized) => factorized,
                        None => (&identity - &jac * c).lu(),
                    };
                    let outcome = self.solve_newton(ev, c, &psi, &y_predict, &factorized, &scale)?;
                    lu = Some(factorized);
                    match outcome {
                        NewtonOutcome::Converged { y, d, iterations } => {
                            converged = Some((y, d, iterations));
                            break;
                        }
                        NewtonOutcome::Diverged => last_rejection = Some(Rejection::Newton),
                        NewtonOutcome::EosFailure(e) => last_rejection = Some(Rejection::Eos(e)),
                    }
                    if jac_current {
                        break;
                    }
                    let refreshed = ev
                        .rhs(&y_predict)
                        .and_then(|point| ev.jacobian(&y_predict, &point));
                    match refreshed {
                        Ok(fresh) => {
                            jac = fresh;
                            jac_current = true;
                            lu = None;
                        }
                        Err(EvalError::Budget(max)) => {
                            return Err(BurnFailure::EvaluationBudgetExceeded(max));
                        }
                        Err(EvalError::Eos(e)) => {
                            last_rejection = Some(Rejection::Eos(e));
                            break;
                        }
                    }
                }

                let Some((y_new, d_sum, iterations)) = converged else {
                    consecutive_failures += 1;
                    trace!("BDF: Newton failed at t = {:e}, h = {:e}", t, h_abs);
                    if consecutive_failures >= self.config.max_consecutive_failures {
                        let rejection = last_rejection.take().unwrap_or(Rejection::Newton);
                        return Err(self.rejection_failure(rejection, t, consecutive_failures));
                    }
                    h_abs *= 0.5;
                    change_d(&mut d, order, 0.5);
                    n_equal_steps = 0;
                    lu = None;
                    continue;
                };

                let safety =
                    SAFETY * (2 * max_iter + 1) as f64 / (2 * max_iter + iterations) as f64;
                let scale = self.scale(&y_new);
                let error_norm = rms_norm(&(&d_sum * self.error_const[order]), &scale);
                if !(error_norm <= 1.0) {
                    let factor = (safety * error_norm.powf(-1.0 / (order as f64 + 1.0)))
                        .max(self.config.max_shrink);
                    trace!(
                        "BDF: error test failed at t = {:e}, h = {:e}, err = {:e}",
                        t, h_abs, error_norm
                    );
                    consecutive_failures += 1;
                    last_rejection = Some(Rejection::ErrorTest);
                    if consecutive_failures >= self.config.max_consecutive_failures {
                        return Err(self.rejection_failure(
                            Rejection::ErrorTest,
                            t,
                            consecutive_failures,
                        ));
                    }
                    h_abs *= factor;
                    change_d(&mut d, order, factor);
                    n_equal_steps = 0;
                    lu = None;
                    continue;
                }
                break (t_new, d_sum, error_norm, scale, safety);
            };

            ev.counters.n_steps += 1;
            n_equal_steps += 1;
            t = t_new;

            d[order + 2] = &d_sum - &d[order + 1];
            d[order + 1] = d_sum;
            for i in (0..=order).rev() {
                let (lower, upper) = d.split_at_mut(i + 1);
                lower[i] += &upper[0];
            }
            normalize_mass_fractions(&mut d[0].as_mut_slice()[..self.n_species]);
            jac_current = false;

            if n_equal_steps < order + 1 {
                continue;
            }

            let error_m_norm = if order > 1 {
                rms_norm(&(&d[order] * self.error_const[order - 1]), &scale)
            } else {
                f64::INFINITY
            };
            let error_p_norm = if order < self.max_order {
                rms_norm(&(&d[order + 2] * self.error_const[order + 1]), &scale)
            } else {
                f64::INFINITY
            };
            let norms = [error_m_norm, error_norm, error_p_norm];
            let mut best = 0;
            let mut best_factor = f64::NEG_INFINITY;
            for (i, norm) in norms.iter().enumerate() {
                let factor = norm.powf(-1.0 / (order + i) as f64);
                if factor > best_factor {
                    best = i;
                    best_factor = factor;
                }
            }
            order = order + best - 1;
            let factor = self.config.max_growth.min(safety * best_factor);
            h_abs *= factor;
            change_d(&mut d, order, factor);
            n_equal_steps = 0;
            lu = None;
        }
        debug!(
            "BDF: reached t = {:e} in {} steps ({} rhs, {} jacobians), final order {}",
            t, ev.counters.n_steps, ev.counters.n_rhs, ev.counters.n_jac, order
        );
        Ok(d[0].clone())
    }
}

/// Integrate y' = f(y) from t = 0 to `t_end` with the variable-order BDF.
///
/// The evaluation counters are returned whether or not the integration succeeded.
pub fn integrate_bdf(
    rhs: &BurnRhs,
    config: &IntegratorConfig,
    y0: DVector<f64>,
    t_end: f64,
) -> (Result<DVector<f64>, BurnFailure>, BurnCounters) {
    let mut ev = Evaluator {
        rhs,
        counters: BurnCounters::default(),
        budget: config.max_evaluations,
    };
    let result = Bdf::new(config, rhs.num_species()).run(&mut ev, y0, t_end);
    (result, ev.counters)
}
