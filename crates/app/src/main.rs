use std::process;

mod cli;
mod demo;
mod logging;
mod obj_io;
mod plan;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let parsed = match cli::parse_args(&args) {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("error: {err}");
            cli::print_help();
            process::exit(2);
        }
    };

    logging::setup_tracing(parsed.log_level);
    tracing::info!("Carryover starting");

    if let Err(err) = cli::run(&parsed) {
        eprintln!("error: {err}");
        process::exit(1);
    }
}
