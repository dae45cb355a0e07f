use crate::Network::network_table::NetworkTable;
use crate::Network::rate_fits::RateLaw;
use crate::Network::screening::{
    PlasmaParameters, ScreeningFactor, ScreeningModel, screening_factor,
};
use serde::{Deserialize, Serialize};

/// Rate evaluation settings shared by every reaction of a network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    /// rates below this are treated as exactly zero
    pub rate_floor: f64,
    pub screening: ScreeningModel,
    /// cap on the weak-screening exponent H of a single pair
    pub max_screening_exponent: f64,
    /// smallest temperature step when a rate law has to be differenced numerically
    pub min_temperature_perturbation: f64,
}

impl Default for RateConfig {
    fn default() -> Self {
        RateConfig {
            rate_floor: 1.0e-100,
            screening: ScreeningModel::Weak,
            max_screening_exponent: 5.0,
            min_temperature_perturbation: 1.0,
        }
    }
}

impl RateConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.rate_floor >= 0.0) || !self.rate_floor.is_finite() {
            return Err(format!("rate_floor must be finite and >= 0, got {}", self.rate_floor));
        }
        if !(self.max_screening_exponent >= 0.0) {
            return Err(format!(
                "max_screening_exponent must be >= 0, got {}",
                self.max_screening_exponent
            ));
        }
        if !(self.min_temperature_perturbation > 0.0) {
            return Err(format!(
                "min_temperature_perturbation must be > 0, got {}",
                self.min_temperature_perturbation
            ));
        }
        Ok(())
    }
}

/// Screened rate coefficients of every reaction at one (rho, T, Y).
#[derive(Debug, Clone, PartialEq)]
pub struct RateEvaluation {
    /// lambda * f
    pub rate: Vec<f64>,
    /// d(lambda * f)/dT
    pub drate_dt: Vec<f64>,
    pub screening_factor: Vec<f64>,
    /// H of each reaction (zero when capped or unscreened)
    pub screening_exponent: Vec<f64>,
    /// d ln(zeta)/dY_i, so that d ln f/dY_i = H * dln_zeta_dy[i]
    pub dln_zeta_dy: Vec<f64>,
    /// number of reactions whose temperature derivative was differenced numerically
    pub numerical_derivatives: usize,
}

pub fn evaluate_rates(
    network: &NetworkTable,
    config: &RateConfig,
    rho: f64,
    temperature: f64,
    y: &[f64],
) -> RateEvaluation {
    let plasma = PlasmaParameters::new(rho, temperature, y, network.species());
    let n_reactions = network.num_reactions();
    let mut evaluation = RateEvaluation {
        rate: Vec::with_capacity(n_reactions),
        drate_dt: Vec::with_capacity(n_reactions),
        screening_factor: Vec::with_capacity(n_reactions),
        screening_exponent: Vec::with_capacity(n_reactions),
        dln_zeta_dy: plasma.dln_zeta_dy.clone(),
        numerical_derivatives: 0,
    };
    for reaction in network.reactions() {
        let value = reaction.rate.evaluate(temperature, config.rate_floor);
        let dlambda_dt = match value.drate_dt {
            Some(derivative) => derivative,
            None => {
                evaluation.numerical_derivatives += 1;
                let dt = (f64::EPSILON.sqrt() * temperature).max(config.min_temperature_perturbation);
                let shifted = reaction.rate.evaluate(temperature + dt, config.rate_floor);
                (shifted.rate - value.rate) / dt
            }
        };
        let screen = if value.rate > 0.0 {
            screening_factor(
                config.screening,
                &plasma,
                temperature,
                &reaction.screening,
                config.max_screening_exponent,
            )
        } else {
            ScreeningFactor::NONE
        };
        evaluation.rate.push(value.rate * screen.factor);
        evaluation
            .drate_dt
            .push(screen.factor * (dlambda_dt + value.rate * screen.dlnf_dt));
        evaluation.screening_factor.push(screen.factor);
        evaluation.screening_exponent.push(screen.exponent);
    }
    evaluation
}
