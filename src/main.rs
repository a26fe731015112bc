mod app;
mod cli;

use mediabridge::engine::{Verbosity, init_tracing};
use std::process;

fn main() {
    let cli = cli::parse();
    init_tracing(Verbosity(cli.verbose));

    if let Err(e) = app::run(cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
