//! brainmuk command-line entry point.
//!
//! Runs a program file, prints its disassembly, exports it as an object
//! file, or starts a line REPL when no file is given.

use brainmuk::cli::Cli;
use brainmuk::driver;
use clap::Parser;

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let options = cli.into_options();
    log::debug!("options: {:?}", options);

    if let Err(e) = driver::run(&options) {
        eprintln!("brainmuk: {}", e);
        std::process::exit(e.exit_code());
    }
}
