//! Diagnostic batch evaluation of the EOS and the network right-hand side over a
//! rectangular grid of density, temperature and composition.
//!
//! Density and temperature are log-spaced between the given bounds; the compositions are
//! usually a metallicity sweep in which the first species carries 1 - Z and the others
//! share Z. Every grid point is independent, so the points are evaluated in parallel.
//! ```rust, ignore
//! use StellarBurn::batch_diagnostics::{EosGrid, print_eos};
//! let grid = EosGrid::new((6.0, 9.0), 4, (8.0, 9.5), 4, EosGrid::metallicity_sweep(micro.network(), 3, 0.1));
//! print_eos(&micro, &grid).unwrap();
//! ```
use crate::EOS::eos_api::{EosError, EosInput, EquationOfState, ThermoState};
use crate::Integrator::burn_state::BurnState;
use crate::Network::network_table::NetworkTable;
use crate::microphysics::{ConfigError, Microphysics, RhsOutput};
use prettytable::{Cell, Row, Table, row};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EosGrid {
    /// (min, max) of log10 rho
    pub log10_rho: (f64, f64),
    pub n_rho: usize,
    /// (min, max) of log10 T
    pub log10_t: (f64, f64),
    pub n_t: usize,
    /// mass fractions of every composition in the sweep
    pub compositions: Vec<Vec<f64>>,
}

#[allow(non_snake_case)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPoint {
    pub rho: f64,
    pub T: f64,
    /// index into `EosGrid::compositions`
    pub composition: usize,
}

fn log_space(bounds: (f64, f64), n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![10f64.powf(bounds.0)];
    }
    let step = (bounds.1 - bounds.0) / (n - 1) as f64;
    (0..n)
        .map(|i| 10f64.powf(bounds.0 + step * i as f64))
        .collect()
}

impl EosGrid {
    pub fn new(
        log10_rho: (f64, f64),
        n_rho: usize,
        log10_t: (f64, f64),
        n_t: usize,
        compositions: Vec<Vec<f64>>,
    ) -> Self {
        EosGrid {
            log10_rho,
            n_rho,
            log10_t,
            n_t,
            compositions,
        }
    }

    /// `n` compositions with metallicity Z from 0 to `max_metal`: the first species holds
    /// 1 - Z, the remaining species split Z evenly.
    pub fn metallicity_sweep(network: &NetworkTable, n: usize, max_metal: f64) -> Vec<Vec<f64>> {
        let n_spec = network.num_species();
        let n_metals = n_spec.saturating_sub(1);
        (0..n)
            .map(|i| {
                let z = if n > 1 && n_metals > 0 {
                    max_metal * i as f64 / (n - 1) as f64
                } else {
                    0.0
                };
                let mut xn = vec![0.0; n_spec];
                if n_spec > 0 {
                    xn[0] = 1.0 - z;
                }
                for x in xn.iter_mut().skip(1) {
                    *x = z / n_metals as f64;
                }
                xn
            })
            .collect()
    }

    pub fn validate(&self, network: &NetworkTable) -> Result<(), ConfigError> {
        if self.n_rho == 0 || self.n_t == 0 || self.compositions.is_empty() {
            return Err(ConfigError::Invalid("empty diagnostic grid".to_string()));
        }
        for xn in &self.compositions {
            network.check_length(xn)?;
        }
        Ok(())
    }

    /// Points in (composition, rho, T) order, T varying fastest.
    pub fn points(&self) -> Vec<GridPoint> {
        let rhos = log_space(self.log10_rho, self.n_rho);
        let temps = log_space(self.log10_t, self.n_t);
        let mut points = Vec::with_capacity(self.compositions.len() * rhos.len() * temps.len());
        for composition in 0..self.compositions.len() {
            for &rho in &rhos {
                for &t in &temps {
                    points.push(GridPoint {
                        rho,
                        T: t,
                        composition,
                    });
                }
            }
        }
        points
    }

    pub fn len(&self) -> usize {
        self.compositions.len() * self.n_rho * self.n_t
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn batch_eos(
    micro: &Microphysics,
    grid: &EosGrid,
) -> Result<Vec<(GridPoint, Result<ThermoState, EosError>)>, ConfigError> {
    grid.validate(micro.network())?;
    Ok(grid
        .points()
        .into_par_iter()
        .map(|point| {
            let mut state = micro.thermo_state(point.rho, point.T, &grid.compositions[point.composition]);
            let result = micro.eos(EosInput::RhoT, &mut state).map(|_| state);
            (point, result)
        })
        .collect())
}

pub fn batch_rhs(
    micro: &Microphysics,
    grid: &EosGrid,
) -> Result<Vec<(GridPoint, Result<RhsOutput, EosError>)>, ConfigError> {
    grid.validate(micro.network())?;
    Ok(grid
        .points()
        .into_par_iter()
        .map(|point| {
            let xn = grid.compositions[point.composition].clone();
            let thermo = micro.thermo_state(point.rho, point.T, &xn);
            let result = micro.rhs(&BurnState::new(xn, thermo));
            (point, result)
        })
        .collect())
}

fn error_cell(e: &EosError) -> String {
    format!("error: {}", e)
}

pub fn eos_table(results: &[(GridPoint, Result<ThermoState, EosError>)]) -> Table {
    let mut table = Table::new();
    table.add_row(row!["comp", "rho", "T", "p", "e", "cv", "gam1", "cs"]);
    for (point, result) in results {
        match result {
            Ok(s) => table.add_row(row![
                point.composition,
                format!("{:.3e}", point.rho),
                format!("{:.3e}", point.T),
                format!("{:.5e}", s.p),
                format!("{:.5e}", s.e),
                format!("{:.5e}", s.cv),
                format!("{:.4}", s.gam1),
                format!("{:.4e}", s.cs)
            ]),
            Err(e) => table.add_row(row![
                point.composition,
                format!("{:.3e}", point.rho),
                format!("{:.3e}", point.T),
                error_cell(e)
            ]),
        };
    }
    table
}

pub fn rhs_table(
    results: &[(GridPoint, Result<RhsOutput, EosError>)],
    network: &NetworkTable,
) -> Table {
    let mut table = Table::new();
    let mut header = vec![Cell::new("comp"), Cell::new("rho"), Cell::new("T"), Cell::new("eps")];
    header.extend(network.species().iter().map(|s| Cell::new(&format!("dX({})/dt", s.name))));
    table.add_row(Row::new(header));
    for (point, result) in results {
        let mut cells = vec![
            Cell::new(&point.composition.to_string()),
            Cell::new(&format!("{:.3e}", point.rho)),
            Cell::new(&format!("{:.3e}", point.T)),
        ];
        match result {
            Ok(out) => {
                cells.push(Cell::new(&format!("{:.4e}", out.enuc_rate)));
                let n = network.num_species();
                cells.extend(out.ydot.iter().take(n).map(|v| Cell::new(&format!("{:.4e}", v))));
            }
            Err(e) => cells.push(Cell::new(&error_cell(e))),
        }
        table.add_row(Row::new(cells));
    }
    table
}

pub fn print_eos(micro: &Microphysics, grid: &EosGrid) -> Result<(), ConfigError> {
    let results = batch_eos(micro, grid)?;
    println!("\nEOS '{}' on {} grid points:", micro.eos_model().name(), results.len());
    eos_table(&results).printstd();
    Ok(())
}

pub fn print_rhs(micro: &Microphysics, grid: &EosGrid) -> Result<(), ConfigError> {
    let results = batch_rhs(micro, grid)?;
    println!(
        "\nNetwork '{}' right-hand side on {} grid points:",
        micro.network().name(),
        results.len()
    );
    rhs_table(&results, micro.network()).printstd();
    Ok(())
}
