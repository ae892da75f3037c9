//! Stepwise CLI
//!
//! Runs, steps through and instruments scripts from the command line.

use stepwise_core::cli;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = cli::run_cli().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
