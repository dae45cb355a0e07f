/// Error-free and compensated floating-point summation.
pub mod esum;
/// JSON configuration and network files, with line/column error reports.
pub mod load_from_file;
/// Terminal logger for binaries and examples.
pub mod logging;
