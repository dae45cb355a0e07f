use log::LevelFilter;
use simplelog::{ColorChoice, Config, SimpleLogger, TermLogger, TerminalMode};

/// Set up the global logger for binaries and examples. The library itself only emits
/// through the `log` facade, so drivers embedding the crate keep their own logger.
///
/// Repeated calls are ignored.
pub fn init_logger(level: LevelFilter) {
    if TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .is_err()
    {
        // no terminal (or a logger is already installed)
        let _ = SimpleLogger::init(level, Config::default());
    }
}
