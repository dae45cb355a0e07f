//! # Equations of state
//!
//! An equation of state closes the hydrodynamic equations: given the density, the
//! composition summary (abar, zbar) and one more thermodynamic variable it returns the
//! full thermodynamic state of a cell (pressure, specific internal energy, enthalpy, heat
//! capacities, sound speed and the partial derivatives the integrator needs).
//!
//! The closure is pluggable: every model implements [`eos_api::EquationOfState`] and is
//! wrapped in the [`eos_api::Eos`] enum, so callers dispatch statically with no boxing.
//!
//! ## Models
//! - [`gamma_law::GammaLaw`]: ideal gas with constant adiabatic index. Mean molecular
//!   weight is abar/(1+zbar) for a fully ionized gas and abar otherwise.
//! - [`polytrope::Polytrope`]: P = K rho^gamma with presets for non-relativistic and
//!   ultra-relativistic degenerate electrons. Temperature is passed through unchanged.
//!
//! ## Input modes
//! `RhoT`, `RhoE`, `RhoP`, `RhoH` (see [`eos_api::EosInput`]). Inverse modes solve for
//! the temperature; for the gamma law this is closed form.
pub mod eos_api;
pub mod gamma_law;
pub mod polytrope;

mod eos_tests;
