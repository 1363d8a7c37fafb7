use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use podmortem_cli::commands::{self, analyze, config, providers, validate};
use podmortem_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    podmortem_cli::init_tracing(cli.verbose);

    let mut stdout = std::io::stdout().lock();
    let dispatch_config = commands::load_config(cli.config.as_deref())?;

    match &cli.command {
        Some(Commands::Analyze { request, strict }) => {
            let dispatcher = commands::build_dispatcher(dispatch_config)?;
            analyze::run(&mut stdout, &dispatcher, request, *strict).await?;
        }
        Some(Commands::Validate { provider_config }) => {
            let dispatcher = commands::build_dispatcher(dispatch_config)?;
            if !validate::run(&mut stdout, &dispatcher, provider_config).await? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Some(Commands::Providers) => {
            let dispatcher = commands::build_dispatcher(dispatch_config)?;
            providers::run(&mut stdout, dispatcher.registry())?;
        }
        Some(Commands::Config) => {
            config::run(&mut stdout, &dispatch_config)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(ExitCode::SUCCESS)
}
