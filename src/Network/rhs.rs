//! Right-hand side and Jacobian of the burn of one cell.
//!
//! The integrated vector is y = [X_1, ..., X_N, e]: mass fractions followed by the specific
//! internal energy. Density is frozen for the duration of the burn. With self-heating the
//! temperature follows from (rho, e, composition) through the equation of state; without
//! it the temperature stays at the value the burn was started with.
//!
//! For every reaction k with screened rate coefficient lambda_k the molar rate is
//!
//! r_k = lambda_k * s_k * rho^(sum(o) - 1) * prod Y_j^(o_j)
//!
//! (s_k is 1/prod(count!) for identical reactants), so that
//! dY_i/dt = sum_k nu_ik r_k, dX_i/dt = A_i dY_i/dt and
//! de/dt = eps = -N_A c^2 sum_i m_i dY_i/dt.
use crate::EOS::eos_api::{Eos, EosError, EosInput, EquationOfState, ThermoState};
use crate::Network::network_table::{NetworkTable, Reaction};
use crate::Network::rates::{RateConfig, RateEvaluation, evaluate_rates};
use crate::Utils::esum::esum;
use crate::constants::ENUC_CONVERSION;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JacobianMode {
    #[default]
    Analytic,
    /// one-sided differences, one right-hand-side evaluation per column
    Numerical,
}

/// Everything one right-hand-side evaluation produces.
#[derive(Debug, Clone, PartialEq)]
pub struct RhsPoint {
    pub ydot: DVector<f64>,
    pub thermo: ThermoState,
    pub rates: RateEvaluation,
    /// molar rates r_k (mol/g/s)
    pub reaction_rates: Vec<f64>,
}

impl RhsPoint {
    /// specific nuclear energy generation rate (erg/g/s)
    pub fn enuc_rate(&self) -> f64 {
        self.ydot[self.ydot.len() - 1]
    }
}

/// Burn of one cell at fixed density.
#[derive(Debug, Clone)]
pub struct BurnRhs<'a> {
    pub network: &'a NetworkTable,
    pub eos: &'a Eos,
    pub rates: &'a RateConfig,
    pub jacobian: JacobianMode,
    /// lower bound of the numerical differencing step
    pub min_perturbation: f64,
    pub self_heat: bool,
    pub rho: f64,
    /// temperature at the start of the burn; the burn temperature when self_heat is off
    pub initial_temperature: f64,
}

fn abundance_power(y: f64, order: f64) -> f64 {
    if order == 0.0 {
        1.0
    } else if order.fract() == 0.0 {
        y.powi(order as i32)
    } else {
        y.max(0.0).powf(order)
    }
}

fn abundance_power_derivative(y: f64, order: f64) -> f64 {
    if order == 0.0 {
        0.0
    } else if order.fract() == 0.0 {
        order * y.powi(order as i32 - 1)
    } else if y > 0.0 {
        order * y.powf(order - 1.0)
    } else {
        0.0
    }
}

/// r_k without the rate coefficient: s_k * rho^(sum(o) - 1) * prod Y_j^(o_j)
fn concentration_factor(reaction: &Reaction, rho: f64, y: &[f64]) -> f64 {
    let mut factor = reaction.symmetry * rho.powf(reaction.density_exponent);
    for &(j, order) in &reaction.orders {
        factor *= abundance_power(y[j], order);
    }
    factor
}

impl<'a> BurnRhs<'a> {
    pub fn num_species(&self) -> usize {
        self.network.num_species()
    }

    /// N species + energy
    pub fn num_vars(&self) -> usize {
        self.network.num_species() + 1
    }

    /// Initial integration vector [X, e] for the given mass fractions and energy.
    pub fn pack(&self, xn: &[f64], e: f64) -> DVector<f64> {
        let n = self.num_species();
        DVector::from_fn(n + 1, |i, _| if i < n { xn[i] } else { e })
    }

    /// Thermodynamic state along the burn.
    pub fn thermo(&self, y: &DVector<f64>) -> Result<ThermoState, EosError> {
        let n = self.num_species();
        let mut state = self
            .network
            .thermo_state(self.rho, self.initial_temperature, &y.as_slice()[..n]);
        if self.self_heat {
            state.e = y[n];
            self.eos.evaluate(EosInput::RhoE, &mut state)?;
        } else {
            self.eos.evaluate(EosInput::RhoT, &mut state)?;
        }
        Ok(state)
    }

    pub fn evaluate(&self, y: &DVector<f64>) -> Result<RhsPoint, EosError> {
        let n = self.num_species();
        let thermo = self.thermo(y)?;
        let molar = self.network.molar_abundances(&y.as_slice()[..n]);
        let rates = evaluate_rates(self.network, self.rates, self.rho, thermo.T, &molar);

        let mut ydot_molar = vec![0.0; n];
        let mut reaction_rates = Vec::with_capacity(self.network.num_reactions());
        for (k, reaction) in self.network.reactions().iter().enumerate() {
            let r = if rates.rate[k] == 0.0 {
                0.0
            } else {
                rates.rate[k] * concentration_factor(reaction, self.rho, &molar)
            };
            for &(i, nu) in &reaction.net_change {
                ydot_molar[i] += nu * r;
            }
            reaction_rates.push(r);
        }

        let species = self.network.species();
        let mut ydot = DVector::zeros(n + 1);
        for i in 0..n {
            ydot[i] = species[i].a * ydot_molar[i];
        }
        ydot[n] = self.energy_rate(&ydot_molar);
        Ok(RhsPoint {
            ydot,
            thermo,
            rates,
            reaction_rates,
        })
    }

    /// -N_A c^2 sum m_i dY_i/dt, summed exactly; the terms cancel to a few parts in 1e4.
    fn energy_rate(&self, ydot_molar: &[f64]) -> f64 {
        let terms: Vec<f64> = self
            .network
            .masses()
            .iter()
            .zip(ydot_molar)
            .map(|(m, dy)| m * dy)
            .collect();
        ENUC_CONVERSION * esum(&terms)
    }

    /// Jacobian d(ydot)/dy at `y`, where `point` is the right-hand side already evaluated
    /// there. Returns the matrix and the number of extra right-hand-side evaluations spent.
    pub fn jacobian(
        &self,
        y: &DVector<f64>,
        point: &RhsPoint,
    ) -> Result<(DMatrix<f64>, usize), EosError> {
        match self.jacobian {
            JacobianMode::Analytic => Ok((self.analytic_jacobian(y, point), 0)),
            JacobianMode::Numerical => self.numerical_jacobian(y, point),
        }
    }

    /// Right-hand-side evaluations one call to `jacobian` spends besides itself.
    pub fn jacobian_rhs_cost(&self) -> usize {
        match self.jacobian {
            JacobianMode::Analytic => 0,
            JacobianMode::Numerical => self.num_vars(),
        }
    }

    fn analytic_jacobian(&self, y: &DVector<f64>, point: &RhsPoint) -> DMatrix<f64> {
        let n = self.num_species();
        let species = self.network.species();
        let molar = self.network.molar_abundances(&y.as_slice()[..n]);
        let thermo = &point.thermo;
        let rates = &point.rates;

        // temperature response at fixed (rho, e): dT/de = 1/cv, dT/dX_j from the composition
        let (dt_de, dt_dx) = if self.self_heat && thermo.cv > 0.0 {
            let summary = self.network.composition(&y.as_slice()[..n]);
            let (dabar, dzbar) = self.network.composition_derivatives(&summary);
            let dt_dx: Vec<f64> = dabar
                .iter()
                .zip(&dzbar)
                .map(|(da, dz)| -(thermo.dedA * da + thermo.dedZ * dz) / thermo.cv)
                .collect();
            (1.0 / thermo.cv, dt_dx)
        } else {
            (0.0, vec![0.0; n])
        };

        // d(dY_i/dt)/dy_j, column n is the energy
        let mut dydot_molar = DMatrix::<f64>::zeros(n, n + 1);
        let mut dr_dx = vec![0.0; n];
        for (k, reaction) in self.network.reactions().iter().enumerate() {
            let lambda = rates.rate[k];
            let dlambda_dt = rates.drate_dt[k];
            if lambda == 0.0 && dlambda_dt == 0.0 {
                continue;
            }
            let concentration = concentration_factor(reaction, self.rho, &molar);
            let r = lambda * concentration;
            let dr_dt = dlambda_dt * concentration;

            dr_dx.iter_mut().for_each(|v| *v = 0.0);
            // kinetic orders
            for (m, &(j, order)) in reaction.orders.iter().enumerate() {
                let mut partial = lambda
                    * reaction.symmetry
                    * self.rho.powf(reaction.density_exponent)
                    * abundance_power_derivative(molar[j], order);
                for (l, &(jj, other)) in reaction.orders.iter().enumerate() {
                    if l != m {
                        partial *= abundance_power(molar[jj], other);
                    }
                }
                dr_dx[j] += partial / species[j].a;
            }
            // screening depends on the composition through zeta
            let h = rates.screening_exponent[k];
            if h != 0.0 && r != 0.0 {
                for j in 0..n {
                    dr_dx[j] += r * h * rates.dln_zeta_dy[j] / species[j].a;
                }
            }
            // composition changes the temperature at fixed e
            if dr_dt != 0.0 {
                for j in 0..n {
                    dr_dx[j] += dr_dt * dt_dx[j];
                }
            }

            for &(i, nu) in &reaction.net_change {
                for j in 0..n {
                    dydot_molar[(i, j)] += nu * dr_dx[j];
                }
                dydot_molar[(i, n)] += nu * dr_dt * dt_de;
            }
        }

        let mut jac = DMatrix::<f64>::zeros(n + 1, n + 1);
        let masses = self.network.masses();
        let mut terms = vec![0.0; n];
        for j in 0..=n {
            for i in 0..n {
                jac[(i, j)] = species[i].a * dydot_molar[(i, j)];
                terms[i] = masses[i] * dydot_molar[(i, j)];
            }
            jac[(n, j)] = ENUC_CONVERSION * esum(&terms);
        }
        jac
    }

    fn numerical_jacobian(
        &self,
        y: &DVector<f64>,
        point: &RhsPoint,
    ) -> Result<(DMatrix<f64>, usize), EosError> {
        let n_vars = self.num_vars();
        let mut jac = DMatrix::<f64>::zeros(n_vars, n_vars);
        let mut perturbed = y.clone();
        for j in 0..n_vars {
            let delta = (f64::EPSILON.sqrt() * y[j].abs()).max(self.min_perturbation);
            perturbed[j] = y[j] + delta;
            // the step actually representable in floating point
            let step = perturbed[j] - y[j];
            let shifted = self.evaluate(&perturbed)?;
            let column = (&shifted.ydot - &point.ydot) / step;
            jac.set_column(j, &column);
            perturbed[j] = y[j];
        }
        Ok((jac, n_vars))
    }
}
