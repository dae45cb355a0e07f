use crate::Network::rhs::JacobianMode;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

/// Relative and absolute tolerance of one group of variables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    pub rtol: f64,
    pub atol: f64,
}

impl Tolerance {
    pub fn new(rtol: f64, atol: f64) -> Self {
        Self { rtol, atol }
    }
}

/// Settings of the BDF burner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegratorConfig {
    /// tolerance of every mass fraction
    pub species: Tolerance,
    /// tolerance of the specific internal energy
    pub energy: Tolerance,
    /// highest BDF order, 1..=5
    pub max_order: usize,
    /// first internal step; estimated from the initial rates when None
    pub initial_step: Option<f64>,
    /// absolute lower bound of the step (s); the effective bound also scales with t
    pub min_step: f64,
    pub max_step: Option<f64>,
    /// bounds on the step change factor after a step or a rejection
    pub max_growth: f64,
    pub max_shrink: f64,
    pub max_newton_iterations: usize,
    /// consecutive rejections allowed before the burn fails
    pub max_consecutive_failures: usize,
    pub max_steps: usize,
    /// limit on rhs + Jacobian evaluations of one burn
    pub max_evaluations: Option<usize>,
    pub jacobian: JacobianMode,
    /// lower bound of the numerical differencing step
    pub jacobian_min_perturbation: f64,
    /// evolve the temperature with the released energy
    pub self_heat: bool,
    /// warn when the input mass fractions miss unity by more than this
    pub composition_tolerance: f64,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            species: Tolerance::new(1e-6, 1e-10),
            energy: Tolerance::new(1e-6, 1e-6),
            max_order: 5,
            initial_step: None,
            min_step: 1e-30,
            max_step: None,
            max_growth: 10.0,
            max_shrink: 0.2,
            max_newton_iterations: 4,
            max_consecutive_failures: 20,
            max_steps: 150_000,
            max_evaluations: None,
            jacobian: JacobianMode::Analytic,
            jacobian_min_perturbation: 1e-10,
            self_heat: true,
            composition_tolerance: 1e-6,
        }
    }
}

impl IntegratorConfig {
    pub fn with_tolerances(species: Tolerance, energy: Tolerance) -> Self {
        Self {
            species,
            energy,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, tol) in [("species", &self.species), ("energy", &self.energy)] {
            if !(tol.rtol > 0.0) || !tol.rtol.is_finite() {
                return Err(format!("{} rtol must be positive, got {}", name, tol.rtol));
            }
            if !(tol.atol >= 0.0) || !tol.atol.is_finite() {
                return Err(format!("{} atol must be >= 0, got {}", name, tol.atol));
            }
        }
        if !(1..=5).contains(&self.max_order) {
            return Err(format!("max_order must lie in 1..=5, got {}", self.max_order));
        }
        if let Some(h0) = self.initial_step {
            if !(h0 > 0.0) || !h0.is_finite() {
                return Err(format!("initial_step must be positive, got {}", h0));
            }
        }
        if !(self.min_step >= 0.0) {
            return Err(format!("min_step must be >= 0, got {}", self.min_step));
        }
        if let Some(max_step) = self.max_step {
            if !(max_step > self.min_step) {
                return Err(format!("max_step {} must exceed min_step {}", max_step, self.min_step));
            }
        }
        if !(self.max_growth > 1.0) {
            return Err(format!("max_growth must exceed 1, got {}", self.max_growth));
        }
        if !(self.max_shrink > 0.0 && self.max_shrink < 1.0) {
            return Err(format!("max_shrink must lie in (0, 1), got {}", self.max_shrink));
        }
        if self.max_newton_iterations == 0 || self.max_steps == 0 {
            return Err("max_newton_iterations and max_steps must be positive".to_string());
        }
        if !(self.jacobian_min_perturbation > 0.0) {
            return Err(format!(
                "jacobian_min_perturbation must be positive, got {}",
                self.jacobian_min_perturbation
            ));
        }
        if !(self.composition_tolerance >= 0.0) {
            return Err(format!(
                "composition_tolerance must be >= 0, got {}",
                self.composition_tolerance
            ));
        }
        Ok(())
    }

    /// Per-variable (rtol, atol) for y = [X_1..X_n, e].
    pub fn tolerance_vectors(&self, n_species: usize) -> (DVector<f64>, DVector<f64>) {
        let pick = |i: usize| {
            if i < n_species {
                self.species
            } else {
                self.energy
            }
        };
        (
            DVector::from_fn(n_species + 1, |i, _| pick(i).rtol),
            DVector::from_fn(n_species + 1, |i, _| pick(i).atol),
        )
    }
}
