mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::{sync::SyncArgs, validate::ValidateArgs};

#[derive(Parser)]
#[command(
    name = "oncall-sync",
    about = "Keep chat user groups and channel topics pointed at whoever is on call",
    version,
    propagate_version = true
)]
struct Cli {
    /// Log at debug level
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Update user groups and channel topics from on-call schedules
    Sync(SyncArgs),

    /// Check the configuration without contacting any API
    Validate(ValidateArgs),
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Sync(args) => cmd::sync::run(args),
        Commands::Validate(args) => cmd::validate::run(args),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
