//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Explain why a pod failed.
///
/// Sends a log analysis to an AI provider and falls back to a
/// pattern-based explanation when the provider is unavailable.
#[derive(Debug, Parser)]
#[command(name = "podmortem", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to dispatch configuration (YAML).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Explain an analysis request (JSON).
    Analyze {
        /// Request file with `analysisResult` and `providerConfig`.
        request: PathBuf,

        /// Fail instead of returning the fallback explanation.
        #[arg(long)]
        strict: bool,
    },

    /// Check a provider configuration (JSON).
    Validate {
        /// Provider configuration file with `providerId`.
        provider_config: PathBuf,
    },

    /// List registered providers.
    Providers,

    /// Print the effective dispatch configuration.
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_analyze_with_global_flags() {
        let cli = Cli::try_parse_from([
            "podmortem",
            "analyze",
            "req.json",
            "--strict",
            "-v",
            "--config",
            "dispatch.yaml",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("dispatch.yaml")));
        match cli.command {
            Some(Commands::Analyze { request, strict }) => {
                assert_eq!(request, PathBuf::from("req.json"));
                assert!(strict);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn analyze_requires_request_path() {
        assert!(Cli::try_parse_from(["podmortem", "analyze"]).is_err());
    }
}
