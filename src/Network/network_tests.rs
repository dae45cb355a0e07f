//////////////////////////////////////////////////////////////////////////////////////////////////
// TESTS
//////////////////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use crate::EOS::eos_api::{Eos, EosConfig, EosInput, EquationOfState, PolytropeKind};
    use crate::Network::iso7::{ISO7_SPECIES, iso7_network, iso7_spec};
    use crate::Network::network_table::{
        NetworkError, NetworkSpec, NetworkTable, ReactionGroup, ReactionSpec, Species,
        normalize_mass_fractions,
    };
    use crate::Network::rate_fits::{ConstantRate, RateLaw};
    use crate::Network::rates::RateConfig;
    use crate::Network::rhs::{BurnRhs, JacobianMode};
    use crate::Network::toy::{TOY_Q_VALUE, two_species_network};
    use crate::constants::{AVOGADRO, MEV_OVER_K_T9, MEV_TO_ERG};
    use approx::assert_relative_eq;
    use nalgebra::{DMatrix, DVector};

    fn mixed_composition(network: &NetworkTable) -> Vec<f64> {
        network
            .mass_fractions(&[
                ("he4", 0.3),
                ("c12", 0.2),
                ("o16", 0.2),
                ("ne20", 0.1),
                ("mg24", 0.1),
                ("si28", 0.05),
                ("ni56", 0.05),
            ])
            .unwrap()
    }

    fn burn_rhs<'a>(
        network: &'a NetworkTable,
        eos: &'a Eos,
        rates: &'a RateConfig,
        rho: f64,
        t: f64,
        self_heat: bool,
    ) -> BurnRhs<'a> {
        BurnRhs {
            network,
            eos,
            rates,
            jacobian: JacobianMode::Analytic,
            min_perturbation: 1e-12,
            self_heat,
            rho,
            initial_temperature: t,
        }
    }

    fn initial_vector(rhs: &BurnRhs, xn: &[f64]) -> DVector<f64> {
        let mut state = rhs.network.thermo_state(rhs.rho, rhs.initial_temperature, xn);
        rhs.eos.evaluate(EosInput::RhoT, &mut state).unwrap();
        rhs.pack(xn, state.e)
    }

    /// element-wise comparison scaled by the largest entry of each row
    fn assert_jacobians_close(analytic: &DMatrix<f64>, numeric: &DMatrix<f64>) {
        for i in 0..analytic.nrows() {
            let row_max = analytic
                .row(i)
                .iter()
                .chain(numeric.row(i).iter())
                .fold(0.0f64, |m, v| m.max(v.abs()));
            for j in 0..analytic.ncols() {
                let a = analytic[(i, j)];
                let b = numeric[(i, j)];
                let tol = 1e-3 * a.abs().max(b.abs()) + 1e-6 * row_max;
                assert!(
                    (a - b).abs() <= tol,
                    "J[{}][{}]: analytic {} vs numerical {}",
                    i,
                    j,
                    a,
                    b
                );
            }
        }
    }

    #[test]
    fn test_iso7_structure() {
        let network = iso7_network().unwrap();
        assert_eq!(network.num_species(), 7);
        assert_eq!(network.num_reactions(), 15);
        for (i, name) in ISO7_SPECIES.iter().enumerate() {
            assert_eq!(network.species_index(name), Some(i));
        }
        let count = |group| network.reactions_in_group(group).count();
        assert_eq!(count(ReactionGroup::Capture), 5);
        assert_eq!(count(ReactionGroup::Photodisintegration), 5);
        assert_eq!(count(ReactionGroup::Fusion), 3);
        assert_eq!(count(ReactionGroup::Effective), 2);

        let triple_alpha = &network.reactions()[network.reaction_index("triple_alpha").unwrap()];
        assert_relative_eq!(triple_alpha.symmetry, 1.0 / 6.0);
        assert_relative_eq!(triple_alpha.density_exponent, 2.0);
        assert_relative_eq!(triple_alpha.q_value, 7.27485, max_relative = 1e-6);
        assert_eq!(triple_alpha.equation, "3 he4 -> c12");

        let c12c12 = &network.reactions()[network.reaction_index("c12c12").unwrap()];
        assert_relative_eq!(c12c12.symmetry, 0.5);

        let si2ni = &network.reactions()[network.reaction_index("si28_to_ni56").unwrap()];
        assert_relative_eq!(si2ni.symmetry, 1.0);
        assert_relative_eq!(si2ni.density_exponent, 1.0);
    }

    #[test]
    fn test_detailed_balance_of_alpha_capture() {
        let network = iso7_network().unwrap();
        let forward = &network.reactions()[network.reaction_index("c12ag").unwrap()];
        let reverse = &network.reactions()[network.reaction_index("o16ga").unwrap()];
        assert_relative_eq!(forward.q_value, 7.16196, max_relative = 1e-6);

        let t9 = 2.0;
        let ratio = reverse.rate.evaluate(t9 * 1e9, 0.0).rate / forward.rate.evaluate(t9 * 1e9, 0.0).rate;
        let expected = 9.8685e9
            * t9.powf(1.5)
            * (12.0f64 * 4.0 / 16.0).powf(1.5)
            * (-MEV_OVER_K_T9 * forward.q_value / t9).exp();
        assert_relative_eq!(ratio, expected, max_relative = 1e-9);
    }

    #[test]
    fn test_detailed_balance_of_triple_alpha() {
        let network = iso7_network().unwrap();
        let forward = &network.reactions()[network.reaction_index("triple_alpha").unwrap()];
        let reverse = &network.reactions()[network.reaction_index("c12_to_3alpha").unwrap()];
        let t9 = 3.0;
        let ratio = reverse.rate.evaluate(t9 * 1e9, 0.0).rate / forward.rate.evaluate(t9 * 1e9, 0.0).rate;
        // classic 2.00e20 T9^3 exp(-84.424/T9)
        let expected = 2.00e20 * t9.powi(3) * (-84.424 / t9).exp();
        assert_relative_eq!(ratio, expected, max_relative = 1e-2);
    }

    #[test]
    fn test_invalid_networks_are_rejected() {
        let species = vec![Species::new("he4", 4.0, 2.0, 28.3), Species::new("c12", 12.0, 6.0, 92.2)];
        let rate = ConstantRate { value: 1.0 };

        let unbalanced = NetworkSpec {
            name: "bad".to_string(),
            species: species.clone(),
            reactions: vec![
                ReactionSpec::new("2a", ReactionGroup::Capture, &[("he4", 2)], &[("c12", 1)])
                    .with_rate(rate),
            ],
        };
        assert!(matches!(
            NetworkTable::new(unbalanced),
            Err(NetworkError::MassNotConserved { .. })
        ));

        let unknown = NetworkSpec {
            name: "bad".to_string(),
            species: species.clone(),
            reactions: vec![
                ReactionSpec::new("x", ReactionGroup::Capture, &[("he4", 3)], &[("o16", 1)])
                    .with_rate(rate),
            ],
        };
        assert!(matches!(
            NetworkTable::new(unknown),
            Err(NetworkError::UnknownSpecies { .. })
        ));

        let duplicate = NetworkSpec {
            name: "bad".to_string(),
            species: vec![species[0].clone(), species[0].clone()],
            reactions: vec![],
        };
        assert_eq!(
            NetworkTable::new(duplicate),
            Err(NetworkError::DuplicateSpecies("he4".to_string()))
        );

        let no_rate = NetworkSpec {
            name: "bad".to_string(),
            species: species.clone(),
            reactions: vec![ReactionSpec::new(
                "3a",
                ReactionGroup::Capture,
                &[("he4", 3)],
                &[("c12", 1)],
            )],
        };
        assert!(matches!(
            NetworkTable::new(no_rate),
            Err(NetworkError::InvalidReaction { .. })
        ));

        let wrong_reverse = NetworkSpec {
            name: "bad".to_string(),
            species: species.clone(),
            reactions: vec![
                ReactionSpec::new("3a", ReactionGroup::Capture, &[("he4", 3)], &[("c12", 1)])
                    .with_rate(rate),
                ReactionSpec::new("3a_again", ReactionGroup::Capture, &[("he4", 3)], &[("c12", 1)])
                    .reverse_of("3a"),
            ],
        };
        assert!(matches!(
            NetworkTable::new(wrong_reverse),
            Err(NetworkError::InvalidReaction { .. })
        ));

        let empty = NetworkSpec {
            name: "empty".to_string(),
            species: vec![],
            reactions: vec![],
        };
        assert_eq!(
            NetworkTable::new(empty),
            Err(NetworkError::NoSpecies("empty".to_string()))
        );
    }

    #[test]
    fn test_network_spec_from_json() {
        let json = r#"{
            "name": "he_burning",
            "species": [
                {"name": "he4", "a": 4, "z": 2, "binding_energy": 28.29603},
                {"name": "c12", "a": 12, "z": 6, "binding_energy": 92.16294}
            ],
            "reactions": [
                {"name": "triple_alpha", "group": "capture",
                 "reactants": [{"species": "he4", "count": 3}],
                 "products": [{"species": "c12"}],
                 "rate": {"kind": "reaclib", "sets": [[-17.3949, -4.4027, 0, 0, 0, 0, -3.0]]},
                 "screening": [[2, 2], [2, 4]]},
                {"name": "c12_to_3alpha", "group": "photodisintegration",
                 "reactants": [{"species": "c12"}],
                 "products": [{"species": "he4", "count": 3}],
                 "reverse_of": "triple_alpha"}
            ]
        }"#;
        let spec: NetworkSpec = serde_json::from_str(json).unwrap();
        let network = NetworkTable::new(spec).unwrap();
        assert_eq!(network.num_reactions(), 2);
        let iso7 = iso7_network().unwrap();
        let a = &network.reactions()[1].rate;
        let b = &iso7.reactions()[iso7.reaction_index("c12_to_3alpha").unwrap()].rate;
        assert_eq!(a, b);
    }

    #[test]
    fn test_composition_summary() {
        let network = iso7_network().unwrap();
        let helium = network.mass_fractions(&[("he4", 1.0)]).unwrap();
        let summary = network.composition(&helium);
        assert_relative_eq!(summary.abar, 4.0);
        assert_relative_eq!(summary.zbar, 2.0);
        assert_relative_eq!(summary.ye, 0.5);

        let co = network.mass_fractions(&[("c12", 0.5), ("o16", 0.5)]).unwrap();
        let summary = network.composition(&co);
        assert_relative_eq!(summary.abar, 1.0 / (0.5 / 12.0 + 0.5 / 16.0), max_relative = 1e-12);
        assert_relative_eq!(summary.ye, 0.5, max_relative = 1e-12);

        assert!(network.mass_fractions(&[("fe56", 1.0)]).is_err());
        assert!(network.check_length(&[1.0, 0.0]).is_err());
    }

    #[test]
    fn test_normalize_mass_fractions() {
        let mut xn = vec![0.5, 0.6, -1e-9];
        let sum = normalize_mass_fractions(&mut xn);
        assert_relative_eq!(sum, 1.1, max_relative = 1e-12);
        assert_eq!(xn[2], 0.0);
        assert_relative_eq!(xn.iter().sum::<f64>(), 1.0, max_relative = 1e-14);

        // fractions above one keep their proportions
        let mut xn = vec![1.5, 0.5];
        let sum = normalize_mass_fractions(&mut xn);
        assert_relative_eq!(sum, 2.0, max_relative = 1e-14);
        assert_relative_eq!(xn[0], 0.75, max_relative = 1e-14);
        assert_relative_eq!(xn[1], 0.25, max_relative = 1e-14);
    }

    #[test]
    fn test_rhs_conserves_mass() {
        let network = iso7_network().unwrap();
        let eos = EosConfig::default().build().unwrap();
        let rates = RateConfig::default();
        let xn = mixed_composition(&network);
        let rhs = burn_rhs(&network, &eos, &rates, 1.0e7, 3.0e9, true);
        let y = initial_vector(&rhs, &xn);
        let point = rhs.evaluate(&y).unwrap();
        let n = network.num_species();
        let total: f64 = point.ydot.rows(0, n).iter().sum();
        let scale = point.ydot.rows(0, n).iter().fold(0.0f64, |m, v| m.max(v.abs()));
        assert!(scale > 0.0);
        assert!(total.abs() <= 1e-12 * scale);
        assert_relative_eq!(point.thermo.T, 3.0e9, max_relative = 1e-12);
        assert_eq!(point.reaction_rates.len(), 15);
    }

    #[test]
    fn test_toy_energy_generation() {
        let network = two_species_network(2.0, 0.0).unwrap();
        let eos = EosConfig::default().build().unwrap();
        let rates = RateConfig::default();
        let rhs = burn_rhs(&network, &eos, &rates, 1.0e6, 1.0e8, false);
        let xn = [0.8, 0.2];
        let y = initial_vector(&rhs, &xn);
        let point = rhs.evaluate(&y).unwrap();
        assert_relative_eq!(point.ydot[0], -1.6, max_relative = 1e-12);
        assert_relative_eq!(point.ydot[1], 1.6, max_relative = 1e-12);
        // eps = N_A * Q * r with r = k * Y_a
        let expected = AVOGADRO * TOY_Q_VALUE * MEV_TO_ERG * 2.0 * 0.8 / 4.0;
        assert_relative_eq!(point.enuc_rate(), expected, max_relative = 1e-6);
    }

    #[test]
    fn test_analytic_jacobian_matches_numerical_with_self_heating() {
        let network = iso7_network().unwrap();
        let eos = EosConfig::default().build().unwrap();
        let rates = RateConfig::default();
        let xn = mixed_composition(&network);
        let rhs = burn_rhs(&network, &eos, &rates, 1.0e7, 3.0e9, true);
        let y = initial_vector(&rhs, &xn);
        let point = rhs.evaluate(&y).unwrap();
        let (analytic, extra) = rhs.jacobian(&y, &point).unwrap();
        assert_eq!(extra, 0);

        let mut numeric_rhs = rhs.clone();
        numeric_rhs.jacobian = JacobianMode::Numerical;
        let (numeric, extra) = numeric_rhs.jacobian(&y, &point).unwrap();
        assert_eq!(extra, 8);
        assert_jacobians_close(&analytic, &numeric);
        // burning heats the gas: the energy column is not empty
        assert!(analytic.column(7).iter().any(|v| *v != 0.0));
    }

    #[test]
    fn test_jacobian_energy_column_vanishes_without_temperature_feedback() {
        let network = iso7_network().unwrap();
        let eos = EosConfig::Polytrope {
            polytrope: PolytropeKind::NonRelativisticWd,
            mu_e: 2.0,
        }
        .build()
        .unwrap();
        let rates = RateConfig::default();
        let xn = mixed_composition(&network);
        let rhs = burn_rhs(&network, &eos, &rates, 1.0e7, 3.0e9, true);
        let y = initial_vector(&rhs, &xn);
        let point = rhs.evaluate(&y).unwrap();
        let (analytic, _) = rhs.jacobian(&y, &point).unwrap();
        assert!(analytic.column(7).iter().all(|v| *v == 0.0));

        let mut numeric_rhs = rhs.clone();
        numeric_rhs.jacobian = JacobianMode::Numerical;
        let (numeric, _) = numeric_rhs.jacobian(&y, &point).unwrap();
        assert_jacobians_close(&analytic, &numeric);
    }

    #[test]
    fn test_iso7_spec_serializes() {
        let spec = iso7_spec().unwrap();
        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains("\"reverse_of\":\"c12ag\""));
        assert!(json.contains("\"kind\":\"reaclib\""));
    }
}
