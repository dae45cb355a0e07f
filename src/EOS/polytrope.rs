use crate::EOS::eos_api::{
    EosError, EosInput, EquationOfState, PolytropeKind, ThermoState, check_positive,
};

/// K for non-relativistic degenerate electrons, to be divided by mu_e^(5/3)
pub const K_NONRELATIVISTIC: f64 = 9.9154e12;
/// K for ultra-relativistic degenerate electrons, to be divided by mu_e^(4/3)
pub const K_RELATIVISTIC: f64 = 1.2316e15;

/// Barotropic closure p = K*rho^gamma.
///
/// The state depends on density only. Temperature is carried through unchanged in every
/// input mode, so a burn with this closure runs at the temperature it was started with.
#[derive(Debug, Clone, PartialEq)]
pub struct Polytrope {
    gamma: f64,
    k_const: f64,
    mu_e: f64,
}

impl Polytrope {
    pub fn new(gamma: f64, k_const: f64) -> Result<Self, EosError> {
        Self::with_mu_e(gamma, k_const, 2.0)
    }

    fn with_mu_e(gamma: f64, k_const: f64, mu_e: f64) -> Result<Self, EosError> {
        if !(gamma > 1.0) || !gamma.is_finite() {
            return Err(EosError::InvalidParameter {
                name: "gamma".to_string(),
                value: gamma,
            });
        }
        if !(k_const > 0.0) || !k_const.is_finite() {
            return Err(EosError::InvalidParameter {
                name: "k_const".to_string(),
                value: k_const,
            });
        }
        Ok(Polytrope {
            gamma,
            k_const,
            mu_e,
        })
    }

    pub fn from_kind(kind: &PolytropeKind, mu_e: f64) -> Result<Self, EosError> {
        if !(mu_e > 0.0) || !mu_e.is_finite() {
            return Err(EosError::InvalidParameter {
                name: "mu_e".to_string(),
                value: mu_e,
            });
        }
        match kind {
            PolytropeKind::NonRelativisticWd => {
                Self::with_mu_e(5.0 / 3.0, K_NONRELATIVISTIC / mu_e.powf(5.0 / 3.0), mu_e)
            }
            PolytropeKind::UltraRelativisticWd => {
                Self::with_mu_e(4.0 / 3.0, K_RELATIVISTIC / mu_e.powf(4.0 / 3.0), mu_e)
            }
            PolytropeKind::Custom { gamma, k_const } => Self::with_mu_e(*gamma, *k_const, mu_e),
        }
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn k_const(&self) -> f64 {
        self.k_const
    }

    /// mean molecular weight per electron the constant was built for
    pub fn mu_e(&self) -> f64 {
        self.mu_e
    }

    /// n = 1/(gamma-1)
    pub fn polytropic_index(&self) -> f64 {
        1.0 / (self.gamma - 1.0)
    }

    pub fn density_from_pressure(&self, p: f64) -> Result<f64, EosError> {
        check_positive(p, EosError::NonPositivePressure)?;
        Ok((p / self.k_const).powf(1.0 / self.gamma))
    }
}

impl EquationOfState for Polytrope {
    fn name(&self) -> &'static str {
        "polytrope"
    }

    fn depends_on_temperature(&self) -> bool {
        false
    }

    fn evaluate(&self, _input: EosInput, state: &mut ThermoState) -> Result<(), EosError> {
        check_positive(state.rho, EosError::NonPositiveDensity)?;
        let rho = state.rho;
        let gm1 = self.gamma - 1.0;
        state.mu = if state.abar > 0.0 {
            state.abar / (1.0 + state.zbar)
        } else {
            0.0
        };
        state.p = self.k_const * rho.powf(self.gamma);
        state.e = state.p / (rho * gm1);
        state.h = state.e + state.p / rho;
        state.dpdr = self.gamma * state.p / rho;
        state.dedr = state.p / (rho * rho);
        state.dpdT = 0.0;
        state.dedT = 0.0;
        state.cv = 0.0;
        state.cp = 0.0;
        state.gam1 = self.gamma;
        state.cs = (self.gamma * state.p / rho).sqrt();
        state.dpdA = 0.0;
        state.dpdZ = 0.0;
        state.dedA = 0.0;
        state.dedZ = 0.0;
        Ok(())
    }
}
