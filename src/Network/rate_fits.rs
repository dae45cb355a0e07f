//! Temperature dependence of reaction rates.
//!
//! Every law returns the unscreened rate coefficient lambda(T) together with its analytic
//! temperature derivative where one exists. Rates below the configured floor are reported
//! as exactly zero so that negligible channels drop out of the right-hand side and the
//! Jacobian.
use crate::constants::{DETAILED_BALANCE_CONST, MEV_OVER_K_T9};
use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

pub const T9_SCALE: f64 = 1.0e9;
/// exponents above this are clamped before exp() to avoid overflow
const MAX_EXPONENT: f64 = 700.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateValue {
    pub rate: f64,
    /// d(rate)/dT in 1/K, None when the law has no analytic form
    pub drate_dt: Option<f64>,
}

impl RateValue {
    pub const ZERO: RateValue = RateValue {
        rate: 0.0,
        drate_dt: Some(0.0),
    };
}

#[enum_dispatch]
pub trait RateLaw {
    /// Evaluate at temperature `temperature` (K); values below `floor` come back as zero.
    fn evaluate(&self, temperature: f64, floor: f64) -> RateValue;
    fn has_analytic_derivative(&self) -> bool;
}

/// Rate law attached to a reaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[enum_dispatch(RateLaw)]
pub enum RateFit {
    Constant(ConstantRate),
    Reaclib(ReaclibRate),
    Tabulated(TabulatedRate),
}

impl RateFit {
    /// Rate fit of the reverse reaction from detailed balance.
    ///
    /// lambda_rev = prefactor * T9^t9_power * exp(-11.6045*Q/T9) * lambda_fwd, which for
    /// REACLIB sets is again a REACLIB fit with shifted a0, a1 and a6.
    pub fn reverse(&self, q_mev: f64, prefactor: f64, t9_power: f64) -> Result<RateFit, String> {
        match self {
            RateFit::Constant(constant) => {
                if !(constant.value > 0.0) {
                    return Err("cannot reverse a non-positive constant rate".to_string());
                }
                let set = [constant.value.ln(), 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
                Ok(RateFit::Reaclib(
                    ReaclibRate::new(vec![set]).reverse(q_mev, prefactor, t9_power)?,
                ))
            }
            RateFit::Reaclib(reaclib) => Ok(RateFit::Reaclib(
                reaclib.reverse(q_mev, prefactor, t9_power)?,
            )),
            RateFit::Tabulated(_) => {
                Err("detailed balance is not available for tabulated rates".to_string())
            }
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            RateFit::Constant(constant) => {
                if constant.value >= 0.0 && constant.value.is_finite() {
                    Ok(())
                } else {
                    Err(format!("constant rate must be finite and >= 0, got {}", constant.value))
                }
            }
            RateFit::Reaclib(reaclib) => {
                if reaclib.sets.is_empty() {
                    return Err("REACLIB fit has no parameter sets".to_string());
                }
                if reaclib.sets.iter().flatten().any(|a| !a.is_finite()) {
                    return Err("REACLIB fit has non-finite parameters".to_string());
                }
                Ok(())
            }
            RateFit::Tabulated(table) => table.validate(),
        }
    }
}

/// Temperature-independent rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstantRate {
    pub value: f64,
}

impl RateLaw for ConstantRate {
    fn evaluate(&self, _temperature: f64, floor: f64) -> RateValue {
        if self.value < floor || self.value == 0.0 {
            return RateValue::ZERO;
        }
        RateValue {
            rate: self.value,
            drate_dt: Some(0.0),
        }
    }

    fn has_analytic_derivative(&self) -> bool {
        true
    }
}

/// Sum of REACLIB seven-parameter sets:
/// lambda = sum exp(a0 + a1/T9 + a2/T9^(1/3) + a3*T9^(1/3) + a4*T9 + a5*T9^(5/3) + a6*ln T9)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReaclibRate {
    pub sets: Vec<[f64; 7]>,
}

impl ReaclibRate {
    pub fn new(sets: Vec<[f64; 7]>) -> Self {
        ReaclibRate { sets }
    }

    /// Non-resonant charged-particle rate N_A<sigma v> ~ exp(a0 - tau/T9^(1/3)) T9^(-2/3),
    /// with the Gamow exponent tau = 4.2487 (Z1^2 Z2^2 mu)^(1/3) from the charges and mass
    /// numbers of the two reactants.
    pub fn non_resonant(a0: f64, (z1, a1): (f64, f64), (z2, a2): (f64, f64)) -> Self {
        let reduced_mass = a1 * a2 / (a1 + a2);
        let tau = 4.2487 * (z1 * z1 * z2 * z2 * reduced_mass).cbrt();
        ReaclibRate {
            sets: vec![[a0, 0.0, -tau, 0.0, 0.0, 0.0, -2.0 / 3.0]],
        }
    }

    pub fn reverse(&self, q_mev: f64, prefactor: f64, t9_power: f64) -> Result<Self, String> {
        if !(prefactor > 0.0) || !prefactor.is_finite() {
            return Err(format!("invalid detailed balance prefactor {}", prefactor));
        }
        let ln_prefactor = prefactor.ln();
        let sets = self
            .sets
            .iter()
            .map(|a| {
                let mut reversed = *a;
                reversed[0] += ln_prefactor;
                reversed[1] -= MEV_OVER_K_T9 * q_mev;
                reversed[6] += t9_power;
                reversed
            })
            .collect();
        Ok(ReaclibRate { sets })
    }
}

impl RateLaw for ReaclibRate {
    fn evaluate(&self, temperature: f64, floor: f64) -> RateValue {
        let t9 = temperature / T9_SCALE;
        if !(t9 > 0.0) || !t9.is_finite() {
            return RateValue::ZERO;
        }
        let t913 = t9.cbrt();
        let t923 = t913 * t913;
        let t953 = t9 * t923;
        let ln_t9 = t9.ln();
        let ln_floor = if floor > 0.0 {
            floor.ln()
        } else {
            f64::NEG_INFINITY
        };

        let mut rate = 0.0;
        let mut drate_dt9 = 0.0;
        for a in &self.sets {
            let exponent = a[0]
                + a[1] / t9
                + a[2] / t913
                + a[3] * t913
                + a[4] * t9
                + a[5] * t953
                + a[6] * ln_t9;
            if exponent < ln_floor {
                continue;
            }
            let value = exponent.min(MAX_EXPONENT).exp();
            rate += value;
            if exponent < MAX_EXPONENT {
                let dexponent = -a[1] / (t9 * t9) - a[2] / (3.0 * t9 * t913)
                    + a[3] / (3.0 * t923)
                    + a[4]
                    + 5.0 / 3.0 * a[5] * t923
                    + a[6] / t9;
                drate_dt9 += value * dexponent;
            }
        }
        if rate < floor || rate == 0.0 {
            return RateValue::ZERO;
        }
        RateValue {
            rate,
            drate_dt: Some(drate_dt9 / T9_SCALE),
        }
    }

    fn has_analytic_derivative(&self) -> bool {
        true
    }
}

/// log10(rate) tabulated against T9, interpolated linearly and clamped to the end points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabulatedRate {
    pub t9: Vec<f64>,
    pub log10_rate: Vec<f64>,
}

impl TabulatedRate {
    pub fn new(t9: Vec<f64>, log10_rate: Vec<f64>) -> Result<Self, String> {
        let table = TabulatedRate { t9, log10_rate };
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.t9.len() != self.log10_rate.len() {
            return Err(format!(
                "rate table has {} temperatures but {} values",
                self.t9.len(),
                self.log10_rate.len()
            ));
        }
        if self.t9.len() < 2 {
            return Err("rate table needs at least two points".to_string());
        }
        if self.t9.windows(2).any(|w| !(w[1] > w[0])) {
            return Err("rate table temperatures must be strictly increasing".to_string());
        }
        if self.log10_rate.iter().any(|v| !v.is_finite()) {
            return Err("rate table has non-finite values".to_string());
        }
        Ok(())
    }

    fn log10_at(&self, t9: f64) -> f64 {
        let n = self.t9.len();
        if t9 <= self.t9[0] {
            return self.log10_rate[0];
        }
        if t9 >= self.t9[n - 1] {
            return self.log10_rate[n - 1];
        }
        // first index with t9[i] > t9, always in 1..n here
        let upper = self.t9.partition_point(|&x| x <= t9);
        let lower = upper - 1;
        let w = (t9 - self.t9[lower]) / (self.t9[upper] - self.t9[lower]);
        self.log10_rate[lower] + w * (self.log10_rate[upper] - self.log10_rate[lower])
    }
}

impl RateLaw for TabulatedRate {
    fn evaluate(&self, temperature: f64, floor: f64) -> RateValue {
        let t9 = temperature / T9_SCALE;
        if !(t9 > 0.0) || self.t9.is_empty() {
            return RateValue {
                rate: 0.0,
                drate_dt: None,
            };
        }
        let rate = 10f64.powf(self.log10_at(t9));
        if rate < floor {
            return RateValue {
                rate: 0.0,
                drate_dt: None,
            };
        }
        RateValue {
            rate,
            drate_dt: None,
        }
    }

    fn has_analytic_derivative(&self) -> bool {
        false
    }
}

/// Prefactor and T9 exponent of detailed balance for a reaction with `n_reactants`
/// reactant nuclei and `n_products` product nuclei, given the ratios of partition-function
/// weights, masses (A_reactants/A_products, raised to 3/2 here) and the identical-particle
/// factor.
pub fn detailed_balance_factors(
    n_reactants: u32,
    n_products: u32,
    spin_ratio: f64,
    mass_ratio: f64,
    identical_particle_ratio: f64,
) -> (f64, f64) {
    let dn = n_reactants as f64 - n_products as f64;
    let prefactor = spin_ratio
        * mass_ratio.powf(1.5)
        * identical_particle_ratio
        * DETAILED_BALANCE_CONST.powf(dn);
    (prefactor, 1.5 * dn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reaclib_single_term() {
        // exp(a0 + a6 ln T9) = e^1 * T9^2
        let fit = ReaclibRate::new(vec![[1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 2.0]]);
        let value = fit.evaluate(2.0e9, 1e-100);
        assert_relative_eq!(value.rate, 4.0 * std::f64::consts::E, max_relative = 1e-12);
        // d/dT (e T9^2) = 2 e T9 / 1e9
        assert_relative_eq!(
            value.drate_dt.unwrap(),
            4.0 * std::f64::consts::E / 1.0e9,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_reaclib_derivative_against_difference() {
        let fit = ReaclibRate::new(vec![
            [61.2863, 0.0, -84.165, -1.4191, -0.114619, -0.070307, -0.666667],
            [-17.3949, -4.4027, 0.0, 0.0, 0.0, 0.0, -3.0],
        ]);
        let t = 1.3e9;
        let dt = t * 1e-7;
        let analytic = fit.evaluate(t, 0.0).drate_dt.unwrap();
        let numeric = (fit.evaluate(t + dt, 0.0).rate - fit.evaluate(t - dt, 0.0).rate) / (2.0 * dt);
        assert_relative_eq!(analytic, numeric, max_relative = 1e-6);
    }

    #[test]
    fn test_rate_floor_zeroes_small_rates() {
        let fit = ReaclibRate::non_resonant(10.0, (6.0, 12.0), (6.0, 12.0));
        let cold = fit.evaluate(1.0e7, 1e-100);
        assert_eq!(cold, RateValue::ZERO);
        let hot = fit.evaluate(5.0e9, 1e-100);
        assert!(hot.rate > 0.0);
        assert_eq!(ConstantRate { value: 1e-120 }.evaluate(1e9, 1e-100), RateValue::ZERO);
        assert_eq!(fit.evaluate(0.0, 1e-100), RateValue::ZERO);
    }

    #[test]
    fn test_reverse_shifts_parameters() {
        let fit = ReaclibRate::new(vec![[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]]);
        let reversed = fit.reverse(2.0, std::f64::consts::E, 1.5).unwrap();
        let a = reversed.sets[0];
        assert_relative_eq!(a[0], 2.0);
        assert_relative_eq!(a[1], 2.0 - 2.0 * MEV_OVER_K_T9);
        assert_eq!(&a[2..6], &[3.0, 4.0, 5.0, 6.0]);
        assert_relative_eq!(a[6], 8.5);
    }

    #[test]
    fn test_tabulated_rate_interpolation() {
        let table = TabulatedRate::new(vec![1.0, 2.0, 4.0], vec![0.0, 2.0, 3.0]).unwrap();
        assert_relative_eq!(table.evaluate(1.5e9, 0.0).rate, 10.0, max_relative = 1e-12);
        assert_relative_eq!(table.evaluate(3.0e9, 0.0).rate, 10f64.powf(2.5), max_relative = 1e-12);
        // clamped outside the table
        assert_relative_eq!(table.evaluate(0.1e9, 0.0).rate, 1.0);
        assert_relative_eq!(table.evaluate(9.0e9, 0.0).rate, 1000.0, max_relative = 1e-12);
        assert!(table.evaluate(3.0e9, 0.0).drate_dt.is_none());
        assert!(TabulatedRate::new(vec![1.0, 1.0], vec![0.0, 1.0]).is_err());
        assert!(TabulatedRate::new(vec![1.0], vec![0.0]).is_err());
    }

    #[test]
    fn test_rate_fit_from_json() {
        let json = r#"{"kind": "reaclib", "sets": [[1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]]}"#;
        let fit: RateFit = serde_json::from_str(json).unwrap();
        assert!(fit.validate().is_ok());
        assert!(fit.has_analytic_derivative());
        assert_relative_eq!(fit.evaluate(1e9, 0.0).rate, std::f64::consts::E, max_relative = 1e-12);

        let json = r#"{"kind": "constant", "value": 2.5}"#;
        let fit: RateFit = serde_json::from_str(json).unwrap();
        assert_eq!(fit.evaluate(1e9, 0.0).rate, 2.5);
    }
}
