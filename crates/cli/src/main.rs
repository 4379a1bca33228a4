use clap::{Parser, Subcommand};

mod commands;
mod state_file;

use commands::{EvaluateArgs, SettleArgs, ShowConfigArgs};

#[derive(Parser)]
#[command(name = "edge-stake")]
#[command(about = "Edge detection and bankroll-safe staking for NHL wagers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Size a slate of candidates against a portfolio
    Evaluate(EvaluateArgs),
    /// Record a settled bet and release its exposure
    Settle(SettleArgs),
    /// Print the effective staking configuration
    ShowConfig(ShowConfigArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Evaluate(args) => commands::run_evaluate(args)?,
        Commands::Settle(args) => commands::run_settle(args)?,
        Commands::ShowConfig(args) => commands::run_show_config(args)?,
    }

    Ok(())
}
