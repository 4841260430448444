//! cfgresolver binary
//!
//! The JSON response or error object goes to stdout. On failure the error
//! is repeated on stderr and the process exits with status 1.

use cfgresolver::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
