//! indexctl - explorer index CLI tool
//!
//! Prints the materialized token, statistic and balance views of a local
//! index store as JSON, and manages indexer cursors.

use explorer_indexer::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
