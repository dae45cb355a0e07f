//! Plasma screening of charged-particle reactions.
//!
//! In the weak-screening limit the Coulomb barrier is lowered by the surrounding plasma and
//! the rate is enhanced by f = exp(H) with
//!
//! H = 0.188 * Z1 * Z2 * zeta * sqrt(rho) * T6^(-3/2),  zeta = sqrt(sum Z_i (Z_i + 1) Y_i).
//!
//! H is capped at a configurable maximum; past the cap the factor is constant.
use crate::Network::network_table::Species;
use serde::{Deserialize, Serialize};

const WEAK_SCREENING_CONST: f64 = 0.188;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreeningModel {
    None,
    #[default]
    Weak,
}

/// Composition and thermodynamic quantities shared by every screened pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PlasmaParameters {
    /// sum Z_i (Z_i + 1) Y_i
    pub zeta2: f64,
    /// 0.188 * zeta * sqrt(rho) * T6^(-3/2); H = Z1 Z2 * base
    pub base: f64,
    /// d ln(zeta)/dY_i = Z_i (Z_i + 1) / (2 zeta^2)
    pub dln_zeta_dy: Vec<f64>,
}

impl PlasmaParameters {
    /// Negative abundances (transient overshoot in the integrator) are clipped to zero.
    pub fn new(rho: f64, temperature: f64, y: &[f64], species: &[Species]) -> Self {
        let zeta2: f64 = species
            .iter()
            .zip(y)
            .map(|(s, &yi)| s.z * (s.z + 1.0) * yi.max(0.0))
            .sum();
        let t6 = temperature / 1.0e6;
        let base = if zeta2 > 0.0 && t6 > 0.0 && rho > 0.0 {
            WEAK_SCREENING_CONST * zeta2.sqrt() * rho.sqrt() / (t6 * t6.sqrt())
        } else {
            0.0
        };
        let dln_zeta_dy = species
            .iter()
            .zip(y)
            .map(|(s, &yi)| {
                if zeta2 > 0.0 && yi >= 0.0 {
                    s.z * (s.z + 1.0) / (2.0 * zeta2)
                } else {
                    0.0
                }
            })
            .collect();
        PlasmaParameters {
            zeta2,
            base,
            dln_zeta_dy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreeningFactor {
    pub factor: f64,
    /// H, the composition-sensitive part of ln f; zero when capped or unscreened
    pub exponent: f64,
    /// d ln f / dT
    pub dlnf_dt: f64,
}

impl ScreeningFactor {
    pub const NONE: ScreeningFactor = ScreeningFactor {
        factor: 1.0,
        exponent: 0.0,
        dlnf_dt: 0.0,
    };
}

/// Product of the factors of every charged pair of a reaction (three-body captures are
/// screened pairwise).
pub fn screening_factor(
    model: ScreeningModel,
    plasma: &PlasmaParameters,
    temperature: f64,
    pairs: &[(f64, f64)],
    max_exponent: f64,
) -> ScreeningFactor {
    if model == ScreeningModel::None || pairs.is_empty() || plasma.base == 0.0 {
        return ScreeningFactor::NONE;
    }
    let mut ln_f = 0.0;
    let mut exponent = 0.0;
    let mut dlnf_dt = 0.0;
    for &(z1, z2) in pairs {
        let h = z1 * z2 * plasma.base;
        if h >= max_exponent {
            ln_f += max_exponent;
        } else {
            ln_f += h;
            exponent += h;
            // H ~ T^(-3/2)
            dlnf_dt += -1.5 * h / temperature;
        }
    }
    ScreeningFactor {
        factor: ln_f.exp(),
        exponent,
        dlnf_dt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn helium_carbon() -> Vec<Species> {
        vec![
            Species::new("he4", 4.0, 2.0, 28.29603),
            Species::new("c12", 12.0, 6.0, 92.16294),
        ]
    }

    #[test]
    fn test_weak_screening_value() {
        let species = helium_carbon();
        let y = [0.25, 0.0];
        let plasma = PlasmaParameters::new(1.0e4, 1.0e8, &y, &species);
        // zeta^2 = 2*3*0.25 = 1.5, T6 = 100
        let expected_base = 0.188 * 1.5f64.sqrt() * 100.0 / 1000.0;
        assert_relative_eq!(plasma.base, expected_base, max_relative = 1e-12);
        let screen = screening_factor(ScreeningModel::Weak, &plasma, 1.0e8, &[(2.0, 2.0)], 10.0);
        assert_relative_eq!(screen.factor, (4.0 * expected_base).exp(), max_relative = 1e-12);
        assert_relative_eq!(screen.dlnf_dt, -1.5 * 4.0 * expected_base / 1.0e8, max_relative = 1e-12);
    }

    #[test]
    fn test_screening_cap_and_disable() {
        let species = helium_carbon();
        let plasma = PlasmaParameters::new(1.0e10, 1.0e7, &[0.0, 1.0 / 12.0], &species);
        let capped = screening_factor(ScreeningModel::Weak, &plasma, 1.0e7, &[(6.0, 6.0)], 4.0);
        assert_relative_eq!(capped.factor, 4.0f64.exp(), max_relative = 1e-12);
        assert_eq!(capped.exponent, 0.0);
        assert_eq!(capped.dlnf_dt, 0.0);

        let off = screening_factor(ScreeningModel::None, &plasma, 1.0e7, &[(6.0, 6.0)], 4.0);
        assert_eq!(off, ScreeningFactor::NONE);
        let no_pairs = screening_factor(ScreeningModel::Weak, &plasma, 1.0e7, &[], 4.0);
        assert_eq!(no_pairs.factor, 1.0);
    }

    #[test]
    fn test_negative_abundance_is_clipped() {
        let species = helium_carbon();
        let plasma = PlasmaParameters::new(1.0e6, 1.0e9, &[0.25, -1.0e-3], &species);
        assert_relative_eq!(plasma.zeta2, 1.5, max_relative = 1e-12);
        assert_eq!(plasma.dln_zeta_dy[1], 0.0);
    }
}
