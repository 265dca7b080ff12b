use std::process;
use clap::Parser;

use rss_scout::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli.run().await {
        eprintln!("Error [{}]: {}", e.error_code(), e);
        process::exit(1);
    }
}
