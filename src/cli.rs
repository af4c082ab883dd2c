use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command line interface for the application
#[derive(Parser)]
#[command(name = "taskgraph", version, about = "Answers questions by decomposing them into search, update and answer tasks")]
pub struct Cli {
    /// Path to a YAML or TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Sets the logging verbosity level for the application
    /// Possible values: "error", "warn", "info", "debug", "trace"
    /// Default: "info"
    #[arg(long, default_value_t = String::from("info"))]
    pub logging_level: String,

    /// Also write logs to daily files under `logs/`
    #[arg(long)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Answer one question; prompts for it when omitted
    Ask { query: Option<String> },
    /// Run the HTTP API
    Serve {
        /// Overrides `api.port` from the configuration
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print the stored chat history
    History,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["taskgraph", "--log-file", "ask", "top games?"]).unwrap();
        assert!(cli.log_file);
        assert_eq!(cli.logging_level, "info");
        assert!(matches!(cli.command, Command::Ask { query: Some(ref q) } if q == "top games?"));

        let cli = Cli::try_parse_from(["taskgraph", "serve", "--port", "8080"]).unwrap();
        assert!(matches!(cli.command, Command::Serve { port: Some(8080) }));
    }
}
