//! # Microphysics
//!
//! The immutable bundle an external hydrodynamics driver talks to: the active network
//! table, the equation of state, the rate options and the integrator settings.
//!
//! ## Usage
//! ```rust, ignore
//! use StellarBurn::microphysics::{Microphysics, MicrophysicsConfig};
//! let micro = Microphysics::init(MicrophysicsConfig::default()).unwrap();
//! let xn = micro.network().mass_fractions(&[("he4", 1.0)]).unwrap();
//! let mut state = micro.burn_state(1.0e6, 3.0e8, xn).unwrap();
//! let status = micro.integrate(&mut state, 1.0);
//! ```
//! One `Microphysics` is shared by reference between any number of threads; every burn
//! works on its own `BurnState` only. `init_global` stores a single process-wide instance
//! and refuses to be called twice.
use crate::EOS::eos_api::{Eos, EosConfig, EosError, EosInput, EquationOfState, ThermoState};
use crate::Integrator::burn_state::{BurnFailure, BurnState, BurnStatus};
use crate::Integrator::burner::Burner;
use crate::Integrator::integrator_config::IntegratorConfig;
use crate::Network::iso7::iso7_network;
use crate::Network::network_table::{NetworkError, NetworkTable, normalize_mass_fractions};
use crate::Network::rates::RateConfig;
use crate::Network::toy::two_species_network;
use crate::Utils::load_from_file::load_network;
use log::info;
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("network error: {0}")]
    Network(#[from] NetworkError),
    #[error("EOS error: {0}")]
    Eos(#[from] EosError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("global microphysics already initialized")]
    AlreadyInitialized,
}

/// Which reaction network to build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NetworkChoice {
    /// seven-isotope alpha chain
    #[default]
    Iso7,
    /// linear a <-> b network with constant rates (s^-1)
    TwoSpecies { forward: f64, reverse: f64 },
    /// JSON `NetworkSpec` file
    File { path: PathBuf },
}

impl NetworkChoice {
    pub fn build(&self) -> Result<NetworkTable, ConfigError> {
        match self {
            NetworkChoice::Iso7 => Ok(iso7_network()?),
            NetworkChoice::TwoSpecies { forward, reverse } => {
                Ok(two_species_network(*forward, *reverse)?)
            }
            NetworkChoice::File { path } => load_network(path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MicrophysicsConfig {
    pub eos: EosConfig,
    pub network: NetworkChoice,
    pub rates: RateConfig,
    pub integrator: IntegratorConfig,
}

/// Result of one right-hand-side evaluation for a burn state.
#[derive(Debug, Clone)]
pub struct RhsOutput {
    /// dX_i/dt followed by de/dt
    pub ydot: DVector<f64>,
    /// specific nuclear energy generation rate (erg/g/s)
    pub enuc_rate: f64,
    /// d(ydot)/dy in the same [X, e] layout
    pub jacobian: DMatrix<f64>,
    pub thermo: ThermoState,
    /// molar rate of every reaction (mol/g/s)
    pub reaction_rates: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct Microphysics {
    network: NetworkTable,
    eos: Eos,
    rates: RateConfig,
    integrator: IntegratorConfig,
}

static GLOBAL: OnceLock<Microphysics> = OnceLock::new();

impl Microphysics {
    /// Build everything the configuration names and validate the options.
    pub fn init(config: MicrophysicsConfig) -> Result<Self, ConfigError> {
        let eos = config.eos.build()?;
        let network = config.network.build()?;
        let micro = Self::new(network, eos, config.rates, config.integrator)?;
        info!(
            "microphysics initialized: EOS {}, network {} ({} species, {} reactions)",
            micro.eos.name(),
            micro.network.name(),
            micro.network.num_species(),
            micro.network.num_reactions()
        );
        Ok(micro)
    }

    pub fn new(
        network: NetworkTable,
        eos: Eos,
        rates: RateConfig,
        integrator: IntegratorConfig,
    ) -> Result<Self, ConfigError> {
        rates.validate().map_err(ConfigError::Invalid)?;
        integrator.validate().map_err(ConfigError::Invalid)?;
        Ok(Microphysics {
            network,
            eos,
            rates,
            integrator,
        })
    }

    pub fn network(&self) -> &NetworkTable {
        &self.network
    }

    pub fn eos_model(&self) -> &Eos {
        &self.eos
    }

    pub fn rate_config(&self) -> &RateConfig {
        &self.rates
    }

    pub fn integrator_config(&self) -> &IntegratorConfig {
        &self.integrator
    }

    /// Same network and EOS with other integrator settings.
    pub fn with_integrator_config(&self, integrator: IntegratorConfig) -> Result<Self, ConfigError> {
        Self::new(self.network.clone(), self.eos.clone(), self.rates.clone(), integrator)
    }

    fn burner(&self) -> Burner<'_> {
        Burner {
            network: &self.network,
            eos: &self.eos,
            rates: &self.rates,
            config: &self.integrator,
        }
    }

    /// EOS input state for (rho, T) and the mass fractions `xn`.
    #[allow(non_snake_case)]
    pub fn thermo_state(&self, rho: f64, T: f64, xn: &[f64]) -> ThermoState {
        self.network.thermo_state(rho, T, xn)
    }

    pub fn eos(&self, input: EosInput, state: &mut ThermoState) -> Result<(), EosError> {
        self.eos.evaluate(input, state)
    }

    /// Burn state at (rho, T) with the thermodynamics filled in. The mass fractions are
    /// renormalized.
    #[allow(non_snake_case)]
    pub fn burn_state(&self, rho: f64, T: f64, mut xn: Vec<f64>) -> Result<BurnState, BurnFailure> {
        self.network
            .check_length(&xn)
            .map_err(|e| BurnFailure::InvalidInput(e.to_string()))?;
        normalize_mass_fractions(&mut xn);
        let mut thermo = self.network.thermo_state(rho, T, &xn);
        self.eos.evaluate(EosInput::RhoT, &mut thermo)?;
        Ok(BurnState::new(xn, thermo))
    }

    /// Right-hand side and Jacobian at the (rho, T, X) of `state`.
    pub fn rhs(&self, state: &BurnState) -> Result<RhsOutput, EosError> {
        let mut thermo = self
            .network
            .thermo_state(state.thermo.rho, state.thermo.T, &state.xn);
        self.eos.evaluate(EosInput::RhoT, &mut thermo)?;
        let rhs = self.burner().burn_rhs(thermo.rho, thermo.T);
        let y = rhs.pack(&state.xn, thermo.e);
        let point = rhs.evaluate(&y)?;
        let (jacobian, _) = rhs.jacobian(&y, &point)?;
        Ok(RhsOutput {
            enuc_rate: point.enuc_rate(),
            ydot: point.ydot,
            jacobian,
            thermo: point.thermo,
            reaction_rates: point.reaction_rates,
        })
    }

    /// Burn `state` over `dt` seconds. The status is also stored on the state.
    pub fn integrate(&self, state: &mut BurnState, dt: f64) -> BurnStatus {
        self.burner().integrate(state, dt)
    }

    /// Burn independent cells in parallel.
    pub fn burn_cells(&self, states: &mut [BurnState], dt: f64) -> Vec<BurnStatus> {
        states
            .par_iter_mut()
            .map(|state| self.integrate(state, dt))
            .collect()
    }
}

/// Initialize the process-wide instance. A second call fails with `AlreadyInitialized`.
pub fn init_global(config: MicrophysicsConfig) -> Result<&'static Microphysics, ConfigError> {
    let micro = Microphysics::init(config)?;
    GLOBAL
        .set(micro)
        .map_err(|_| ConfigError::AlreadyInitialized)?;
    GLOBAL.get().ok_or(ConfigError::AlreadyInitialized)
}

pub fn global() -> Option<&'static Microphysics> {
    GLOBAL.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::GAS_CONSTANT;
    use crate::EOS::eos_api::PolytropeKind;
    use approx::assert_relative_eq;

    fn toy(forward: f64, reverse: f64) -> Microphysics {
        Microphysics::init(MicrophysicsConfig {
            network: NetworkChoice::TwoSpecies { forward, reverse },
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_default_configuration() {
        let micro = Microphysics::init(MicrophysicsConfig::default()).unwrap();
        assert_eq!(micro.network().num_species(), 7);
        assert_eq!(micro.eos_model().name(), "gamma_law");
        assert!(micro.integrator_config().self_heat);
    }

    #[test]
    fn test_gamma_law_closed_form() {
        let micro = toy(1.0, 1.0);
        // pure helium-like species: abar = 4, zbar = 2, mu = 4/3
        let state = micro.burn_state(1.0e7, 1.0e9, vec![1.0, 0.0]).unwrap();
        let mu = 4.0 / 3.0;
        let p = 1.0e7 * GAS_CONSTANT * 1.0e9 / mu;
        assert_relative_eq!(state.thermo.p, p, max_relative = 1e-12);
        assert_relative_eq!(state.thermo.e, 1.5 * p / 1.0e7, max_relative = 1e-12);
        assert_relative_eq!(state.thermo.gam1, 5.0 / 3.0, max_relative = 1e-12);
        assert_relative_eq!(
            state.thermo.cs,
            (5.0 / 3.0 * p / 1.0e7).sqrt(),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_eos_round_trip_through_facade() {
        let micro = Microphysics::init(MicrophysicsConfig::default()).unwrap();
        let xn = micro
            .network()
            .mass_fractions(&[("c12", 0.3), ("o16", 0.7)])
            .unwrap();
        let mut state = micro.thermo_state(2.0e8, 4.0e8, &xn);
        micro.eos(EosInput::RhoT, &mut state).unwrap();
        let mut inverse = micro.thermo_state(2.0e8, 1.0, &xn);
        inverse.e = state.e;
        micro.eos(EosInput::RhoE, &mut inverse).unwrap();
        assert_relative_eq!(inverse.T, 4.0e8, max_relative = 1e-8);
    }

    #[test]
    fn test_rhs_output() {
        let micro = toy(2.0, 1.0);
        let state = micro.burn_state(1.0e6, 1.0e8, vec![0.5, 0.5]).unwrap();
        let out = micro.rhs(&state).unwrap();
        // dX_a/dt = -kf X_a + kr X_b
        assert_relative_eq!(out.ydot[0], -0.5, max_relative = 1e-12);
        assert_relative_eq!(out.ydot[1], 0.5, max_relative = 1e-12);
        assert_relative_eq!(out.jacobian[(0, 0)], -2.0, max_relative = 1e-12);
        assert_relative_eq!(out.jacobian[(0, 1)], 1.0, max_relative = 1e-12);
        assert!(out.enuc_rate > 0.0);
        assert_eq!(out.reaction_rates.len(), 2);
    }

    #[test]
    fn test_polytrope_configuration() {
        let micro = Microphysics::init(MicrophysicsConfig {
            eos: EosConfig::Polytrope {
                polytrope: PolytropeKind::NonRelativisticWd,
                mu_e: 2.0,
            },
            ..Default::default()
        })
        .unwrap();
        let xn = micro.network().mass_fractions(&[("c12", 1.0)]).unwrap();
        let a = micro.burn_state(1.0e6, 1.0e7, xn.clone()).unwrap();
        let b = micro.burn_state(1.0e6, 1.0e9, xn).unwrap();
        assert_eq!(a.thermo.p, b.thermo.p);
    }

    #[test]
    fn test_invalid_options_rejected() {
        let config = MicrophysicsConfig {
            integrator: IntegratorConfig {
                max_order: 7,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            Microphysics::init(config),
            Err(ConfigError::Invalid(_))
        ));
        let config = MicrophysicsConfig {
            eos: EosConfig::GammaLaw {
                gamma: 1.0,
                fully_ionized: true,
            },
            ..Default::default()
        };
        assert!(matches!(Microphysics::init(config), Err(ConfigError::Eos(_))));
        assert!(toy(1.0, 1.0).burn_state(1.0e6, 1.0e8, vec![1.0]).is_err());
    }

    #[test]
    fn test_burn_cells_in_parallel() {
        let micro = toy(1.0, 0.5);
        let mut states: Vec<BurnState> = (0..16)
            .map(|i| {
                let xa = i as f64 / 15.0;
                micro.burn_state(1.0e6, 1.0e8, vec![xa, 1.0 - xa]).unwrap()
            })
            .collect();
        states[3].thermo.rho = -1.0;
        let statuses = micro.burn_cells(&mut states, 20.0);
        assert_eq!(statuses.len(), 16);
        for (i, (status, state)) in statuses.iter().zip(&states).enumerate() {
            if i == 3 {
                assert!(matches!(
                    status,
                    BurnStatus::Failed(BurnFailure::EosDomain(_))
                ));
                continue;
            }
            assert!(status.is_success());
            assert_relative_eq!(state.xn[1] / state.xn[0], 2.0, max_relative = 1e-4);
            assert_relative_eq!(state.mass_fraction_sum(), 1.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_zero_dt_through_facade() {
        let micro = Microphysics::init(MicrophysicsConfig::default()).unwrap();
        let xn = micro.network().mass_fractions(&[("he4", 1.0)]).unwrap();
        let mut state = micro.burn_state(1.0e6, 3.0e8, xn).unwrap();
        let before = state.clone();
        assert!(micro.integrate(&mut state, 0.0).is_success());
        assert_eq!(state.xn, before.xn);
        assert_eq!(state.thermo, before.thermo);
        assert_eq!(state.e_nuc, 0.0);
    }

    // the only test touching the process-wide instance
    #[test]
    fn test_global_is_set_once() {
        let first = init_global(MicrophysicsConfig::default()).unwrap();
        assert_eq!(first.network().num_species(), 7);
        assert!(global().is_some());
        let second = init_global(MicrophysicsConfig::default());
        assert!(matches!(second, Err(ConfigError::AlreadyInitialized)));
    }
}
