/// Per-cell state handed to the burner: composition, thermodynamic state, accumulated
/// time and energy, evaluation counters and the status of the last call.
pub mod burn_state;
/// Tolerances, step-size limits, iteration budgets and options of the burner.
pub mod integrator_config;
/// Variable-order BDF with modified Newton corrector in difference-array form.
pub mod bdf;
/// Burn of one cell over a time step: validation, normalization, BDF integration,
/// final EOS call and rollback on failure.
pub mod burner;
