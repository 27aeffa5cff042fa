use clap::Parser;
use litfinder::cli::Cli;
use litfinder::utils::logging::init_logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let guard = init_logging(cli.verbose);

    if let Err(e) = litfinder::run(cli).await {
        eprintln!("error: {:#}", e);
        drop(guard);
        std::process::exit(1);
    }
}
