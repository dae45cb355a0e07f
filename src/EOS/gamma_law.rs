use crate::EOS::eos_api::{EosError, EosInput, EquationOfState, ThermoState, check_positive};
use crate::constants::GAS_CONSTANT;

/// Ideal gas with constant adiabatic index: p = rho*R*T/mu, e = p/(rho*(gamma-1)).
#[derive(Debug, Clone, PartialEq)]
pub struct GammaLaw {
    gamma: f64,
    fully_ionized: bool,
}

impl GammaLaw {
    pub fn new(gamma: f64, fully_ionized: bool) -> Result<Self, EosError> {
        if !(gamma > 1.0) || !gamma.is_finite() {
            return Err(EosError::InvalidParameter {
                name: "gamma".to_string(),
                value: gamma,
            });
        }
        Ok(GammaLaw {
            gamma,
            fully_ionized,
        })
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn fully_ionized(&self) -> bool {
        self.fully_ionized
    }

    pub fn mean_molecular_weight(&self, abar: f64, zbar: f64) -> f64 {
        if self.fully_ionized {
            abar / (1.0 + zbar)
        } else {
            abar
        }
    }
}

impl EquationOfState for GammaLaw {
    fn name(&self) -> &'static str {
        "gamma_law"
    }

    fn depends_on_temperature(&self) -> bool {
        true
    }

    fn evaluate(&self, input: EosInput, state: &mut ThermoState) -> Result<(), EosError> {
        check_positive(state.rho, EosError::NonPositiveDensity)?;
        if !(state.abar > 0.0) || !state.abar.is_finite() || !(state.zbar >= 0.0) {
            return Err(EosError::InvalidComposition {
                abar: state.abar,
                zbar: state.zbar,
            });
        }
        let mu = self.mean_molecular_weight(state.abar, state.zbar);
        let gm1 = self.gamma - 1.0;
        // temperature from the known variable; every relation is linear in T
        match input {
            EosInput::RhoT => {}
            EosInput::RhoE => {
                check_positive(state.e, EosError::NonPositiveEnergy)?;
                state.T = state.e * mu * gm1 / GAS_CONSTANT;
            }
            EosInput::RhoP => {
                check_positive(state.p, EosError::NonPositivePressure)?;
                state.T = state.p * mu / (state.rho * GAS_CONSTANT);
            }
            EosInput::RhoH => {
                check_positive(state.h, EosError::NonPositiveEnthalpy)?;
                state.T = state.h * mu * gm1 / (self.gamma * GAS_CONSTANT);
            }
        }
        check_positive(state.T, EosError::NonPositiveTemperature)?;

        let rho = state.rho;
        let t = state.T;
        state.mu = mu;
        state.ye = state.zbar / state.abar;
        state.p = rho * GAS_CONSTANT * t / mu;
        state.e = state.p / (rho * gm1);
        state.h = state.e + state.p / rho;
        state.dpdr = GAS_CONSTANT * t / mu;
        state.dpdT = rho * GAS_CONSTANT / mu;
        state.dedr = 0.0;
        state.dedT = GAS_CONSTANT / (mu * gm1);
        state.cv = state.dedT;
        state.cp = self.gamma * state.cv;
        state.gam1 = self.gamma;
        state.cs = (self.gamma * state.p / rho).sqrt();

        state.dpdA = -state.p / state.abar;
        state.dedA = -state.e / state.abar;
        if self.fully_ionized {
            state.dpdZ = state.p / (1.0 + state.zbar);
            state.dedZ = state.e / (1.0 + state.zbar);
        } else {
            state.dpdZ = 0.0;
            state.dedZ = 0.0;
        }
        Ok(())
    }
}
