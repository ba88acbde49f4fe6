use beach_spyglass::telemetry::logging;
use beach_spyglass::terminal::{app, cli::Cli, error::CliError};
use clap::Parser;

#[tokio::main]
async fn main() {
    // A missing .env is fine; flags and the real environment still apply.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if let Err(err) = logging::init(&cli.logging.to_config()).map_err(CliError::from) {
        eprintln!("❌ {err}");
        std::process::exit(1);
    }

    if let Err(err) = app::run(cli).await {
        eprintln!("❌ {err}");
        std::process::exit(1);
    }
}
