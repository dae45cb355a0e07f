use crate::EOS::eos_api::{EosError, ThermoState};
use crate::Utils::esum::kahan_sum;
use prettytable::{Table, row};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a burn did not complete. The cell state is left as it was before the call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BurnFailure {
    #[error("invalid burn input: {0}")]
    InvalidInput(String),
    #[error("step size fell below the minimum at t = {time} (h = {step})")]
    StepUnderflow { time: f64, step: f64 },
    #[error("Newton iteration failed to converge {failures} times in a row at t = {time}")]
    NewtonNonConvergence { time: f64, failures: usize },
    #[error("local error test failed {failures} times in a row at t = {time}")]
    ErrorTestFailure { time: f64, failures: usize },
    #[error("maximum number of steps ({0}) reached")]
    TooManySteps(usize),
    #[error("right-hand-side evaluation budget ({0}) exhausted")]
    EvaluationBudgetExceeded(usize),
    #[error("equation of state failed during the burn: {0}")]
    EosDomain(#[from] EosError),
}

impl BurnFailure {
    /// short machine-friendly name of the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            BurnFailure::InvalidInput(_) => "invalid_input",
            BurnFailure::StepUnderflow { .. } => "step_underflow",
            BurnFailure::NewtonNonConvergence { .. } => "newton_non_convergence",
            BurnFailure::ErrorTestFailure { .. } => "error_test_failure",
            BurnFailure::TooManySteps(_) => "too_many_steps",
            BurnFailure::EvaluationBudgetExceeded(_) => "evaluation_budget_exceeded",
            BurnFailure::EosDomain(_) => "eos_domain",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum BurnStatus {
    /// not integrated yet
    #[default]
    Pending,
    Converged,
    Failed(BurnFailure),
}

impl BurnStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, BurnStatus::Converged)
    }
}

/// Evaluation counters, accumulated over every burn of the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BurnCounters {
    pub n_rhs: usize,
    pub n_jac: usize,
    pub n_steps: usize,
}

impl std::ops::AddAssign for BurnCounters {
    fn add_assign(&mut self, other: BurnCounters) {
        self.n_rhs += other.n_rhs;
        self.n_jac += other.n_jac;
        self.n_steps += other.n_steps;
    }
}

/// State of one hydrodynamic cell as seen by the burner.
#[derive(Debug, Clone, PartialEq)]
pub struct BurnState {
    /// mass fractions, one per network species
    pub xn: Vec<f64>,
    pub thermo: ThermoState,
    /// total burn time accumulated over successful calls (s)
    pub time: f64,
    /// length of the last burn (s)
    pub dt: f64,
    /// nuclear energy released into the cell over all successful burns (erg/g)
    pub e_nuc: f64,
    pub counters: BurnCounters,
    pub status: BurnStatus,
}

impl BurnState {
    /// State with the given mass fractions and a thermodynamic state filled by the caller.
    pub fn new(xn: Vec<f64>, thermo: ThermoState) -> Self {
        BurnState {
            xn,
            thermo,
            time: 0.0,
            dt: 0.0,
            e_nuc: 0.0,
            counters: BurnCounters::default(),
            status: BurnStatus::Pending,
        }
    }

    pub fn success(&self) -> bool {
        self.status.is_success()
    }

    pub fn mass_fraction_sum(&self) -> f64 {
        kahan_sum(&self.xn)
    }

    pub fn pretty_print(&self, species: &[String]) {
        let mut table = Table::new();
        table.add_row(row!["rho", "T", "e", "p", "e_nuc", "status"]);
        let status = match &self.status {
            BurnStatus::Pending => "pending".to_string(),
            BurnStatus::Converged => "converged".to_string(),
            BurnStatus::Failed(failure) => failure.kind().to_string(),
        };
        table.add_row(row![
            format!("{:.4e}", self.thermo.rho),
            format!("{:.4e}", self.thermo.T),
            format!("{:.4e}", self.thermo.e),
            format!("{:.4e}", self.thermo.p),
            format!("{:.4e}", self.e_nuc),
            status
        ]);
        table.printstd();

        let mut composition = Table::new();
        composition.add_row(row!["species", "X"]);
        for (name, x) in species.iter().zip(&self.xn) {
            composition.add_row(row![name, format!("{:.6e}", x)]);
        }
        composition.printstd();
    }
}
