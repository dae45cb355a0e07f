use crate::EOS::gamma_law::GammaLaw;
use crate::EOS::polytrope::Polytrope;
use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which variable, besides the density, is known on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EosInput {
    /// density and temperature
    RhoT,
    /// density and specific internal energy
    RhoE,
    /// density and pressure
    RhoP,
    /// density and specific enthalpy
    RhoH,
}

/// Thermodynamic state of one cell.
///
/// Inputs are `rho`, `abar`, `zbar` and whichever of `T`, `e`, `p`, `h` the [`EosInput`]
/// names; everything else is filled by [`EquationOfState::evaluate`].
#[allow(non_snake_case)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThermoState {
    /// density (g/cm^3)
    pub rho: f64,
    /// temperature (K)
    pub T: f64,
    /// mean nucleon number
    pub abar: f64,
    /// mean charge
    pub zbar: f64,
    /// electron fraction zbar/abar
    pub ye: f64,
    /// mean molecular weight used by the closure (0 when the closure has none)
    pub mu: f64,
    /// pressure (erg/cm^3)
    pub p: f64,
    /// specific internal energy (erg/g)
    pub e: f64,
    /// specific enthalpy (erg/g)
    pub h: f64,
    pub cv: f64,
    pub cp: f64,
    /// first adiabatic index
    pub gam1: f64,
    /// sound speed (cm/s)
    pub cs: f64,
    pub dpdr: f64,
    pub dpdT: f64,
    pub dedr: f64,
    pub dedT: f64,
    /// composition derivatives at fixed (rho, T)
    pub dpdA: f64,
    pub dpdZ: f64,
    pub dedA: f64,
    pub dedZ: f64,
}

impl ThermoState {
    #[allow(non_snake_case)]
    pub fn new(rho: f64, T: f64, abar: f64, zbar: f64) -> Self {
        let ye = if abar > 0.0 { zbar / abar } else { 0.0 };
        ThermoState {
            rho,
            T,
            abar,
            zbar,
            ye,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EosError {
    #[error("non-positive or non-finite density: {0}")]
    NonPositiveDensity(f64),
    #[error("non-positive or non-finite temperature: {0}")]
    NonPositiveTemperature(f64),
    #[error("non-positive or non-finite internal energy: {0}")]
    NonPositiveEnergy(f64),
    #[error("non-positive or non-finite pressure: {0}")]
    NonPositivePressure(f64),
    #[error("non-positive or non-finite enthalpy: {0}")]
    NonPositiveEnthalpy(f64),
    #[error("invalid composition: abar = {abar}, zbar = {zbar}")]
    InvalidComposition { abar: f64, zbar: f64 },
    #[error("invalid equation of state parameter {name} = {value}")]
    InvalidParameter { name: String, value: f64 },
}

pub(crate) fn check_positive(value: f64, error: fn(f64) -> EosError) -> Result<(), EosError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(error(value))
    }
}

#[enum_dispatch]
pub trait EquationOfState {
    fn name(&self) -> &'static str;
    /// Fill `state` from `state.rho`, the composition summary and the variable named by `input`.
    /// On error `state` may be partially written; callers keep their own copy.
    fn evaluate(&self, input: EosInput, state: &mut ThermoState) -> Result<(), EosError>;
    /// false for closures where temperature is a passive label
    fn depends_on_temperature(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
#[enum_dispatch(EquationOfState)]
pub enum Eos {
    GammaLaw(GammaLaw),
    Polytrope(Polytrope),
}

/// Built-in polytrope parameter sets.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PolytropeKind {
    /// gamma = 5/3, K = 9.9154e12 / mu_e^(5/3)
    #[default]
    NonRelativisticWd,
    /// gamma = 4/3, K = 1.2316e15 / mu_e^(4/3)
    UltraRelativisticWd,
    Custom { gamma: f64, k_const: f64 },
}

fn default_gamma() -> f64 {
    5.0 / 3.0
}

fn default_true() -> bool {
    true
}

fn default_mu_e() -> f64 {
    2.0
}

/// Serializable choice of closure, see [`EosConfig::build`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EosConfig {
    GammaLaw {
        #[serde(default = "default_gamma")]
        gamma: f64,
        #[serde(default = "default_true")]
        fully_ionized: bool,
    },
    Polytrope {
        #[serde(default)]
        polytrope: PolytropeKind,
        #[serde(default = "default_mu_e")]
        mu_e: f64,
    },
}

impl Default for EosConfig {
    fn default() -> Self {
        EosConfig::GammaLaw {
            gamma: default_gamma(),
            fully_ionized: true,
        }
    }
}

impl EosConfig {
    pub fn build(&self) -> Result<Eos, EosError> {
        match self {
            EosConfig::GammaLaw {
                gamma,
                fully_ionized,
            } => Ok(Eos::GammaLaw(GammaLaw::new(*gamma, *fully_ionized)?)),
            EosConfig::Polytrope { polytrope, mu_e } => {
                Ok(Eos::Polytrope(Polytrope::from_kind(polytrope, *mu_e)?))
            }
        }
    }
}
