#[allow(non_snake_case)]
pub mod EOS;
#[allow(non_snake_case)]
pub mod Examples;
#[allow(non_snake_case)]
pub mod Integrator;
#[allow(non_snake_case)]
pub mod Network;
#[allow(non_snake_case)]
pub mod Utils;
pub mod batch_diagnostics;
pub mod constants;
pub mod microphysics;
