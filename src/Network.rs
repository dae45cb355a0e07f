/// Species, reactions and their validation: nucleon conservation, kinetic orders,
/// identical-particle factors, Q-values and reverse rates from detailed balance.
/// Networks are built in code or deserialized from JSON (`NetworkSpec`).
pub mod network_table;
/// Rate laws: constant, REACLIB seven-parameter fits, tabulated log10(rate) vs T9.
pub mod rate_fits;
/// Rate coefficients of a whole network at one (rho, T, Y): rate floor, screening,
/// temperature derivatives.
pub mod rates;
/// Right-hand side dy/dt for y = [X, e] and its Jacobian, analytic or by differences.
pub mod rhs;
/// Weak plasma screening.
pub mod screening;
/// Seven-isotope alpha-chain network.
pub mod iso7;
/// Two-species network with constant rates and an exact solution.
pub mod toy;

mod network_tests;
