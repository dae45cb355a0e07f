use StellarBurn::Examples::burn_examples::burn_examples;
use StellarBurn::Utils::logging::init_logger;
use log::LevelFilter;

pub fn main() {
    init_logger(LevelFilter::Info);
    // task number from the command line, helium burning by default
    let task: usize = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(0);
    burn_examples(task);
}
