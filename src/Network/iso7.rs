//! Seven-isotope alpha-chain network (he4, c12, o16, ne20, mg24, si28, ni56).
//!
//! Captures of alpha particles up the chain, their photodisintegration reverses from
//! detailed balance, triple alpha, the three heavy-ion fusions and an effective
//! si28 -> ni56 link with its reverse. Rates are REACLIB-form fits; charged entrance
//! channels are weakly screened.
use crate::Network::network_table::{
    NetworkError, NetworkSpec, NetworkTable, ReactionGroup, ReactionSpec, Species,
};
use crate::Network::rate_fits::{ReaclibRate, detailed_balance_factors};

pub const ISO7_SPECIES: [&str; 7] = ["he4", "c12", "o16", "ne20", "mg24", "si28", "ni56"];

pub fn iso7_species() -> Vec<Species> {
    vec![
        Species::new("he4", 4.0, 2.0, 28.29603),
        Species::new("c12", 12.0, 6.0, 92.16294),
        Species::new("o16", 16.0, 8.0, 127.62093),
        Species::new("ne20", 20.0, 10.0, 160.64788),
        Species::new("mg24", 24.0, 12.0, 198.25790),
        Species::new("si28", 28.0, 14.0, 236.53790),
        Species::new("ni56", 56.0, 28.0, 484.00300),
    ]
}

/// Alpha capture `target + he4 -> product` and its reverse by detailed balance.
fn alpha_capture(
    forward: &str,
    reverse: &str,
    target: (&str, f64, f64),
    product: &str,
    a0: f64,
) -> [ReactionSpec; 2] {
    let (name, z, a) = target;
    [
        ReactionSpec::new(
            forward,
            ReactionGroup::Capture,
            &[(name, 1), ("he4", 1)],
            &[(product, 1)],
        )
        .with_rate(ReaclibRate::non_resonant(a0, (z, a), (2.0, 4.0)))
        .screened(&[(z, 2.0)]),
        ReactionSpec::new(
            reverse,
            ReactionGroup::Photodisintegration,
            &[(product, 1)],
            &[(name, 1), ("he4", 1)],
        )
        .reverse_of(forward),
    ]
}

pub fn iso7_spec() -> Result<NetworkSpec, NetworkError> {
    let mut reactions = Vec::with_capacity(15);
    reactions.extend(alpha_capture("c12ag", "o16ga", ("c12", 6.0, 12.0), "o16", 19.3));
    reactions.push(
        ReactionSpec::new("triple_alpha", ReactionGroup::Capture, &[("he4", 3)], &[("c12", 1)])
            .with_rate(ReaclibRate::new(vec![[
                -17.3949, -4.4027, 0.0, 0.0, 0.0, 0.0, -3.0,
            ]]))
            .screened(&[(2.0, 2.0), (2.0, 4.0)]),
    );
    reactions.push(
        ReactionSpec::new(
            "c12_to_3alpha",
            ReactionGroup::Photodisintegration,
            &[("c12", 1)],
            &[("he4", 3)],
        )
        .reverse_of("triple_alpha"),
    );
    reactions.push(
        ReactionSpec::new(
            "c12c12",
            ReactionGroup::Fusion,
            &[("c12", 2)],
            &[("ne20", 1), ("he4", 1)],
        )
        .with_rate(ReaclibRate::new(vec![[
            61.2863, 0.0, -84.165, -1.4191, -0.114619, -0.070307, -0.666667,
        ]]))
        .screened(&[(6.0, 6.0)]),
    );
    reactions.push(
        ReactionSpec::new(
            "c12o16",
            ReactionGroup::Fusion,
            &[("c12", 1), ("o16", 1)],
            &[("mg24", 1), ("he4", 1)],
        )
        .with_rate(ReaclibRate::non_resonant(76.8, (6.0, 12.0), (8.0, 16.0)))
        .screened(&[(6.0, 8.0)]),
    );
    reactions.push(
        ReactionSpec::new(
            "o16o16",
            ReactionGroup::Fusion,
            &[("o16", 2)],
            &[("si28", 1), ("he4", 1)],
        )
        .with_rate(ReaclibRate::new(vec![[
            97.2435, 0.0, -135.93, -0.629829, 0.445885, -0.0253731, -0.666667,
        ]]))
        .screened(&[(8.0, 8.0)]),
    );
    reactions.extend(alpha_capture("o16ag", "ne20ga", ("o16", 8.0, 16.0), "ne20", 24.0));
    reactions.extend(alpha_capture("ne20ag", "mg24ga", ("ne20", 10.0, 20.0), "mg24", 28.0));
    reactions.extend(alpha_capture("mg24ag", "si28ga", ("mg24", 12.0, 24.0), "si28", 31.0));

    // si28 + 7 he4 -> ni56 proceeds at the pace of its first capture
    let si2ni = ReaclibRate::non_resonant(33.0, (14.0, 28.0), (2.0, 4.0));
    let q_si2ni = 484.00300 - 236.53790 - 7.0 * 28.29603;
    let (prefactor, t9_power) = detailed_balance_factors(2, 1, 1.0, 28.0 * 4.0 / 32.0, 1.0);
    let ni2si = si2ni
        .reverse(q_si2ni, prefactor, t9_power)
        .map_err(|reason| NetworkError::InvalidReaction {
            reaction: "ni56_to_si28".to_string(),
            reason,
        })?;
    reactions.push(
        ReactionSpec::new(
            "si28_to_ni56",
            ReactionGroup::Effective,
            &[("si28", 1), ("he4", 7)],
            &[("ni56", 1)],
        )
        .with_rate(si2ni)
        .with_orders(&[("si28", 1.0), ("he4", 1.0)])
        .screened(&[(14.0, 2.0)]),
    );
    reactions.push(
        ReactionSpec::new(
            "ni56_to_si28",
            ReactionGroup::Effective,
            &[("ni56", 1)],
            &[("si28", 1), ("he4", 7)],
        )
        .with_rate(ni2si),
    );

    Ok(NetworkSpec {
        name: "iso7".to_string(),
        species: iso7_species(),
        reactions,
    })
}

pub fn iso7_network() -> Result<NetworkTable, NetworkError> {
    NetworkTable::new(iso7_spec()?)
}
