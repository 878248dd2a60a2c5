use clap::Parser;
use graphdrive_lib::commands::Cli;
use graphdrive_lib::logging::{init_logging, LogOptions};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&LogOptions {
        verbose: cli.verbose,
        json: cli.log_json,
    });

    if let Err(err) = graphdrive_lib::run(cli).await {
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
}
