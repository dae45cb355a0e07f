//////////////////////////////////////////////////////////////////////////////////////////////////
// TESTS
//////////////////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use crate::EOS::eos_api::{
        Eos, EosConfig, EosError, EosInput, EquationOfState, PolytropeKind, ThermoState,
    };
    use crate::EOS::gamma_law::GammaLaw;
    use crate::EOS::polytrope::{K_NONRELATIVISTIC, K_RELATIVISTIC, Polytrope};
    use crate::constants::GAS_CONSTANT;
    use approx::assert_relative_eq;

    fn helium_state(rho: f64, t: f64) -> ThermoState {
        ThermoState::new(rho, t, 4.0, 2.0)
    }

    #[test]
    fn test_gamma_law_pressure_of_ionized_helium() {
        let eos = GammaLaw::new(5.0 / 3.0, true).unwrap();
        let mut state = helium_state(1.0e6, 1.0e8);
        eos.evaluate(EosInput::RhoT, &mut state).unwrap();
        assert_relative_eq!(state.mu, 4.0 / 3.0);
        assert_relative_eq!(state.p, 6.23585e21, max_relative = 1e-5);
        assert_relative_eq!(state.e, 1.5 * state.p / state.rho, max_relative = 1e-12);
        assert_relative_eq!(state.h, state.e + state.p / state.rho, max_relative = 1e-12);
        assert_relative_eq!(state.cp / state.cv, 5.0 / 3.0, max_relative = 1e-12);
        assert_relative_eq!(state.ye, 0.5);
        assert_relative_eq!(
            state.cs,
            (5.0 / 3.0 * state.p / state.rho).sqrt(),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_gamma_law_neutral_gas_uses_abar() {
        let eos = GammaLaw::new(1.4, false).unwrap();
        let mut state = ThermoState::new(1.0, 300.0, 28.0, 14.0);
        eos.evaluate(EosInput::RhoT, &mut state).unwrap();
        assert_relative_eq!(state.mu, 28.0);
        assert_relative_eq!(state.p, GAS_CONSTANT * 300.0 / 28.0, max_relative = 1e-12);
        assert_eq!(state.dpdZ, 0.0);
    }

    #[test]
    fn test_gamma_law_inverse_modes_recover_temperature() {
        let eos = GammaLaw::new(5.0 / 3.0, true).unwrap();
        let mut reference = ThermoState::new(3.0e7, 2.5e9, 12.0, 6.0);
        eos.evaluate(EosInput::RhoT, &mut reference).unwrap();

        for input in [EosInput::RhoE, EosInput::RhoP, EosInput::RhoH] {
            let mut state = ThermoState::new(reference.rho, 0.0, 12.0, 6.0);
            match input {
                EosInput::RhoE => state.e = reference.e,
                EosInput::RhoP => state.p = reference.p,
                EosInput::RhoH => state.h = reference.h,
                EosInput::RhoT => unreachable!(),
            }
            eos.evaluate(input, &mut state).unwrap();
            assert_relative_eq!(state.T, reference.T, max_relative = 1e-12);
            assert_relative_eq!(state.p, reference.p, max_relative = 1e-12);
            assert_relative_eq!(state.e, reference.e, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_gamma_law_derivatives_match_differences() {
        let eos = GammaLaw::new(5.0 / 3.0, true).unwrap();
        let mut state = ThermoState::new(1.0e7, 1.0e9, 8.0, 4.0);
        eos.evaluate(EosInput::RhoT, &mut state).unwrap();

        let dt = 1.0e3;
        let mut hotter = ThermoState::new(1.0e7, 1.0e9 + dt, 8.0, 4.0);
        eos.evaluate(EosInput::RhoT, &mut hotter).unwrap();
        assert_relative_eq!((hotter.p - state.p) / dt, state.dpdT, max_relative = 1e-6);
        assert_relative_eq!((hotter.e - state.e) / dt, state.dedT, max_relative = 1e-6);

        let da = 1.0e-6;
        let mut heavier = ThermoState::new(1.0e7, 1.0e9, 8.0 + da, 4.0);
        eos.evaluate(EosInput::RhoT, &mut heavier).unwrap();
        assert_relative_eq!((heavier.e - state.e) / da, state.dedA, max_relative = 1e-5);
        let mut more_charge = ThermoState::new(1.0e7, 1.0e9, 8.0, 4.0 + da);
        eos.evaluate(EosInput::RhoT, &mut more_charge).unwrap();
        assert_relative_eq!((more_charge.e - state.e) / da, state.dedZ, max_relative = 1e-5);
    }

    #[test]
    fn test_gamma_law_rejects_bad_input() {
        let eos = GammaLaw::new(5.0 / 3.0, true).unwrap();
        let mut state = helium_state(0.0, 1.0e8);
        assert_eq!(
            eos.evaluate(EosInput::RhoT, &mut state),
            Err(EosError::NonPositiveDensity(0.0))
        );
        let mut state = helium_state(1.0, -5.0);
        assert_eq!(
            eos.evaluate(EosInput::RhoT, &mut state),
            Err(EosError::NonPositiveTemperature(-5.0))
        );
        let mut state = helium_state(1.0, 1.0e8);
        state.e = f64::NAN;
        assert!(matches!(
            eos.evaluate(EosInput::RhoE, &mut state),
            Err(EosError::NonPositiveEnergy(_))
        ));
        let mut state = ThermoState::new(1.0, 1.0e8, 0.0, 0.0);
        assert!(matches!(
            eos.evaluate(EosInput::RhoT, &mut state),
            Err(EosError::InvalidComposition { .. })
        ));
        assert!(GammaLaw::new(1.0, true).is_err());
    }

    #[test]
    fn test_polytrope_white_dwarf_presets() {
        let nonrel = Polytrope::from_kind(&PolytropeKind::NonRelativisticWd, 2.0).unwrap();
        assert_relative_eq!(nonrel.gamma(), 5.0 / 3.0);
        assert_relative_eq!(
            nonrel.k_const(),
            K_NONRELATIVISTIC / 2.0_f64.powf(5.0 / 3.0),
            max_relative = 1e-14
        );
        assert_relative_eq!(nonrel.polytropic_index(), 1.5, max_relative = 1e-12);

        let rel = Polytrope::from_kind(&PolytropeKind::UltraRelativisticWd, 2.0).unwrap();
        assert_relative_eq!(rel.gamma(), 4.0 / 3.0);
        assert_relative_eq!(
            rel.k_const(),
            K_RELATIVISTIC / 2.0_f64.powf(4.0 / 3.0),
            max_relative = 1e-14
        );
        assert_relative_eq!(rel.polytropic_index(), 3.0, max_relative = 1e-12);
    }

    #[test]
    fn test_polytrope_state_ignores_temperature() {
        let eos = Polytrope::new(2.0, 1.0e5).unwrap();
        let mut cold = ThermoState::new(10.0, 1.0e7, 4.0, 2.0);
        let mut hot = ThermoState::new(10.0, 1.0e9, 4.0, 2.0);
        eos.evaluate(EosInput::RhoT, &mut cold).unwrap();
        eos.evaluate(EosInput::RhoE, &mut hot).unwrap();
        assert_relative_eq!(cold.p, 1.0e7);
        assert_relative_eq!(cold.e, 1.0e6);
        assert_eq!(cold.p, hot.p);
        assert_eq!(hot.T, 1.0e9);
        assert_eq!(cold.dpdT, 0.0);
        assert_relative_eq!(cold.dpdr, 2.0 * cold.p / 10.0);
        assert_relative_eq!(eos.density_from_pressure(cold.p).unwrap(), 10.0, max_relative = 1e-12);
    }

    #[test]
    fn test_eos_config_dispatch() {
        let json = r#"{"kind": "polytrope", "polytrope": {"type": "custom", "gamma": 1.5, "k_const": 3.0}}"#;
        let config: EosConfig = serde_json::from_str(json).unwrap();
        let eos = config.build().unwrap();
        assert_eq!(eos.name(), "polytrope");
        assert!(!eos.depends_on_temperature());
        assert!(matches!(eos, Eos::Polytrope(_)));

        let eos = EosConfig::default().build().unwrap();
        assert_eq!(eos.name(), "gamma_law");
        assert!(eos.depends_on_temperature());

        let bad = EosConfig::Polytrope {
            polytrope: PolytropeKind::NonRelativisticWd,
            mu_e: -1.0,
        };
        assert!(bad.build().is_err());
    }
}
