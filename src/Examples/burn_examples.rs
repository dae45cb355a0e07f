use crate::EOS::eos_api::{EosConfig, EosInput, PolytropeKind};
use crate::Integrator::integrator_config::IntegratorConfig;
use crate::batch_diagnostics::{EosGrid, print_eos, print_rhs};
use crate::microphysics::{Microphysics, MicrophysicsConfig, NetworkChoice};
use crate::Network::toy::two_species_solution;
use crate::Utils::load_from_file::load_config;
use log::{error, info};
use std::io::Write;

pub fn burn_examples(task: usize) {
    match task {
        0 => {
            // HELIUM BURNING IN THE ISO7 NETWORK AT FIXED TEMPERATURE
            let config = MicrophysicsConfig {
                integrator: IntegratorConfig {
                    self_heat: false,
                    ..Default::default()
                },
                ..Default::default()
            };
            let micro = match Microphysics::init(config) {
                Ok(micro) => micro,
                Err(e) => {
                    error!("{}", e);
                    return;
                }
            };
            micro.network().pretty_print();
            let Ok(xn) = micro.network().mass_fractions(&[("he4", 1.0)]) else {
                return;
            };
            let mut state = match micro.burn_state(1.0e6, 3.0e8, xn) {
                Ok(state) => state,
                Err(e) => {
                    error!("{}", e);
                    return;
                }
            };
            let names = micro.network().species_names();
            for _ in 0..5 {
                let status = micro.integrate(&mut state, 2.0);
                println!("t = {} s, status {:?}", state.time, status);
            }
            state.pretty_print(&names);
            println!("counters: {:?}", state.counters);
        }
        1 => {
            // TWO-SPECIES TOY NETWORK AGAINST ITS EXACT SOLUTION
            let (forward, reverse) = (3.0, 1.0);
            let config = MicrophysicsConfig {
                network: NetworkChoice::TwoSpecies { forward, reverse },
                ..Default::default()
            };
            let Ok(micro) = Microphysics::init(config) else {
                return;
            };
            let Ok(mut state) = micro.burn_state(1.0e6, 1.0e8, vec![1.0, 0.0]) else {
                return;
            };
            for _ in 0..10 {
                micro.integrate(&mut state, 0.1);
                let exact = two_species_solution(forward, reverse, 1.0, state.time);
                println!(
                    "t = {:.2}  X_a = {:.8}  exact = {:.8}  rel. error = {:.2e}",
                    state.time,
                    state.xn[0],
                    exact,
                    (state.xn[0] - exact).abs() / exact
                );
            }
            println!(
                "e_nuc = {:.6e} erg/g, T rose from 1e8 to {:.6e} K",
                state.e_nuc, state.thermo.T
            );
        }
        2 => {
            // CARBON-OXYGEN MIXTURE WITH SELF-HEATING
            let Ok(micro) = Microphysics::init(MicrophysicsConfig::default()) else {
                return;
            };
            let Ok(xn) = micro
                .network()
                .mass_fractions(&[("c12", 0.5), ("o16", 0.5)])
            else {
                return;
            };
            let Ok(mut state) = micro.burn_state(1.0e9, 1.5e9, xn) else {
                return;
            };
            let status = micro.integrate(&mut state, 1.0e-2);
            info!("carbon burning finished with {:?}", status);
            state.pretty_print(&micro.network().species_names());
        }
        3 => {
            // EOS TABLES: GAMMA LAW AND WHITE-DWARF POLYTROPE
            for eos in [
                EosConfig::default(),
                EosConfig::Polytrope {
                    polytrope: PolytropeKind::NonRelativisticWd,
                    mu_e: 2.0,
                },
            ] {
                let config = MicrophysicsConfig {
                    eos,
                    ..Default::default()
                };
                let Ok(micro) = Microphysics::init(config) else {
                    continue;
                };
                let grid = EosGrid::new(
                    (4.0, 8.0),
                    3,
                    (7.0, 9.0),
                    3,
                    EosGrid::metallicity_sweep(micro.network(), 2, 0.02),
                );
                if let Err(e) = print_eos(&micro, &grid) {
                    error!("{}", e);
                }
            }
        }
        4 => {
            // RIGHT-HAND SIDE OVER A DENSITY-TEMPERATURE GRID
            let Ok(micro) = Microphysics::init(MicrophysicsConfig::default()) else {
                return;
            };
            let grid = EosGrid::new(
                (6.0, 8.0),
                3,
                (8.5, 9.5),
                3,
                EosGrid::metallicity_sweep(micro.network(), 3, 0.3),
            );
            if let Err(e) = print_rhs(&micro, &grid) {
                error!("{}", e);
            }
        }
        5 => {
            // MANY CELLS BURNED IN PARALLEL
            let Ok(micro) = Microphysics::init(MicrophysicsConfig::default()) else {
                return;
            };
            let Ok(xn) = micro.network().mass_fractions(&[("he4", 1.0)]) else {
                return;
            };
            let mut states: Vec<_> = (0..64)
                .filter_map(|i| {
                    let t = 2.0e8 * (1.0 + 0.02 * i as f64);
                    micro.burn_state(1.0e6, t, xn.clone()).ok()
                })
                .collect();
            let he4 = micro.network().species_index("he4").unwrap_or(0);
            let statuses = micro.burn_cells(&mut states, 1.0);
            let converged = statuses.iter().filter(|s| s.is_success()).count();
            println!("{} of {} cells converged", converged, statuses.len());
            for state in states.iter().step_by(16) {
                println!(
                    "T = {:.4e}  X(he4) = {:.6}  e_nuc = {:.4e}",
                    state.thermo.T, state.xn[he4], state.e_nuc
                );
            }
        }
        6 => {
            // CONFIGURATION FROM A JSON FILE
            let path = std::env::temp_dir().join("stellarburn_example_config.json");
            let written = std::fs::File::create(&path).and_then(|mut file| {
                writeln!(file, "MICROPHYSICS")?;
                writeln!(
                    file,
                    "{{ \"network\": {{ \"kind\": \"two_species\", \"forward\": 1.0, \"reverse\": 2.0 }},"
                )?;
                writeln!(file, "  \"integrator\": {{ \"max_order\": 3 }} }}")
            });
            if let Err(e) = written {
                error!("{}", e);
                return;
            }
            let config = match load_config(&path) {
                Ok(config) => config,
                Err(e) => {
                    error!("{}", e);
                    return;
                }
            };
            println!("{:#?}", config);
            let Ok(micro) = Microphysics::init(config) else {
                return;
            };
            let mut state = micro.thermo_state(1.0e5, 5.0e7, &[0.5, 0.5]);
            if micro.eos(EosInput::RhoT, &mut state).is_ok() {
                println!("p = {:.6e}, e = {:.6e}", state.p, state.e);
            }
            let _ = std::fs::remove_file(&path);
        }
        _ => println!("Wrong task number"),
    }
}
