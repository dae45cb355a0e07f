//! Two-species linear network a <-> b with constant rates.
//!
//! Both species have the same mass number, so the forward and reverse channels are pure
//! relabellings; b is bound more tightly by `TOY_Q_VALUE` MeV. The composition relaxes
//! exponentially with rate (forward + reverse) toward X_b/X_a = forward/reverse, which
//! gives the integrator an exact solution to be checked against.
use crate::Network::network_table::{
    NetworkError, NetworkSpec, NetworkTable, ReactionGroup, ReactionSpec, Species,
};
use crate::Network::rate_fits::ConstantRate;

/// binding energy difference b - a (MeV)
pub const TOY_Q_VALUE: f64 = 1.0;

pub fn two_species_spec(forward: f64, reverse: f64) -> NetworkSpec {
    NetworkSpec {
        name: "two_species".to_string(),
        species: vec![
            Species::new("a", 4.0, 2.0, 28.29603),
            Species::new("b", 4.0, 2.0, 28.29603 + TOY_Q_VALUE),
        ],
        reactions: vec![
            ReactionSpec::new("a_to_b", ReactionGroup::Effective, &[("a", 1)], &[("b", 1)])
                .with_rate(ConstantRate { value: forward }),
            ReactionSpec::new("b_to_a", ReactionGroup::Effective, &[("b", 1)], &[("a", 1)])
                .with_rate(ConstantRate { value: reverse }),
        ],
    }
}

pub fn two_species_network(forward: f64, reverse: f64) -> Result<NetworkTable, NetworkError> {
    NetworkTable::new(two_species_spec(forward, reverse))
}

/// Exact X_a(t) for the two-species network starting from X_a(0) = `xa0`.
pub fn two_species_solution(forward: f64, reverse: f64, xa0: f64, t: f64) -> f64 {
    let total = forward + reverse;
    if total == 0.0 {
        return xa0;
    }
    let xa_eq = reverse / total;
    xa_eq + (xa0 - xa_eq) * (-total * t).exp()
}
