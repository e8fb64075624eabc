//! streamgate CLI - run and inspect admission-control simulations

mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use cli::{Cli, LogFormat};
use tracing_subscriber::EnvFilter;

pub(crate) use error::CliError;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match cli.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_command_async(cli))
}

async fn run_command_async(cli: Cli) -> anyhow::Result<()> {
    use cli::{Commands, ConfigCommands};

    let format = cli.output.unwrap_or_default();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Run(args) => {
            commands::run::run(config_path, &args, format).await?;
        }

        Commands::Config { action } => match action {
            ConfigCommands::Show => {
                commands::config_cmd::run_show(config_path, format)?;
            }
            ConfigCommands::Validate => {
                commands::config_cmd::run_validate(config_path, format)?;
            }
        },
    }

    Ok(())
}
