use crate::EOS::eos_api::{Eos, EosInput, EquationOfState};
use crate::Integrator::bdf::integrate_bdf;
use crate::Integrator::burn_state::{BurnCounters, BurnFailure, BurnState, BurnStatus};
use crate::Integrator::integrator_config::IntegratorConfig;
use crate::Network::network_table::{NetworkTable, normalize_mass_fractions};
use crate::Network::rates::RateConfig;
use crate::Network::rhs::BurnRhs;
use log::{debug, warn};

/// Burns one cell over a hydrodynamic time step.
#[derive(Debug, Clone, Copy)]
pub struct Burner<'a> {
    pub network: &'a NetworkTable,
    pub eos: &'a Eos,
    pub rates: &'a RateConfig,
    pub config: &'a IntegratorConfig,
}

impl<'a> Burner<'a> {
    /// Right-hand side of a burn at density `rho` started at `temperature`.
    pub fn burn_rhs(&self, rho: f64, temperature: f64) -> BurnRhs<'a> {
        BurnRhs {
            network: self.network,
            eos: self.eos,
            rates: self.rates,
            jacobian: self.config.jacobian,
            min_perturbation: self.config.jacobian_min_perturbation,
            self_heat: self.config.self_heat,
            rho,
            initial_temperature: temperature,
        }
    }

    /// Integrate `state` over `dt` seconds.
    ///
    /// On success the composition, thermodynamic state, `time` and `e_nuc` are advanced.
    /// On failure the state is restored to its input values; only the counters and the
    /// status record the attempt. Never panics on bad input.
    pub fn integrate(&self, state: &mut BurnState, dt: f64) -> BurnStatus {
        let snapshot = state.clone();
        let mut used = BurnCounters::default();
        match self.try_integrate(state, dt, &mut used) {
            Ok(()) => {
                state.counters += used;
                state.status = BurnStatus::Converged;
                debug!(
                    "burn converged: dt = {:e}, T = {:e}, e_nuc = {:e}, {} steps",
                    dt, state.thermo.T, state.e_nuc, used.n_steps
                );
            }
            Err(failure) => {
                *state = snapshot;
                state.counters += used;
                warn!(
                    "burn failed ({}) at rho = {:e}, T = {:e}, dt = {:e}: {}",
                    failure.kind(),
                    state.thermo.rho,
                    state.thermo.T,
                    dt,
                    failure
                );
                state.status = BurnStatus::Failed(failure);
            }
        }
        state.status.clone()
    }

    fn try_integrate(
        &self,
        state: &mut BurnState,
        dt: f64,
        used: &mut BurnCounters,
    ) -> Result<(), BurnFailure> {
        if !(dt >= 0.0) || !dt.is_finite() {
            return Err(BurnFailure::InvalidInput(format!(
                "time step must be finite and >= 0, got {}",
                dt
            )));
        }
        self.network
            .check_length(&state.xn)
            .map_err(|e| BurnFailure::InvalidInput(e.to_string()))?;
        if state.xn.iter().any(|x| !x.is_finite()) {
            return Err(BurnFailure::InvalidInput(
                "mass fractions must be finite".to_string(),
            ));
        }
        let sum = normalize_mass_fractions(&mut state.xn);
        if !(sum > 0.0) {
            return Err(BurnFailure::InvalidInput(
                "mass fractions sum to zero".to_string(),
            ));
        }
        if (sum - 1.0).abs() > self.config.composition_tolerance {
            warn!("input mass fractions sum to {}, renormalized", sum);
        }
        if dt == 0.0 {
            state.dt = 0.0;
            return Ok(());
        }

        let mut initial = self
            .network
            .thermo_state(state.thermo.rho, state.thermo.T, &state.xn);
        self.eos.evaluate(EosInput::RhoT, &mut initial)?;

        let rhs = self.burn_rhs(initial.rho, initial.T);
        let y0 = rhs.pack(&state.xn, initial.e);
        let (result, counters) = integrate_bdf(&rhs, self.config, y0, dt);
        *used = counters;
        let y = result?;

        let n = self.network.num_species();
        let mut xn = y.as_slice()[..n].to_vec();
        normalize_mass_fractions(&mut xn);
        let mut thermo = self.network.thermo_state(initial.rho, initial.T, &xn);
        if self.config.self_heat {
            thermo.e = y[n];
            self.eos.evaluate(EosInput::RhoE, &mut thermo)?;
        } else {
            self.eos.evaluate(EosInput::RhoT, &mut thermo)?;
        }

        state.xn = xn;
        state.thermo = thermo;
        state.time += dt;
        state.dt = dt;
        state.e_nuc += y[n] - initial.e;
        Ok(())
    }
}
