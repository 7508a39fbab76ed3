//! Command-line interface for gosearch.

use clap::{Parser, Subcommand};

/// gosearch - search engine with session auth and a Wikipedia scraper
#[derive(Parser)]
#[command(name = "gosearch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the web server with the background scheduler (default)
    #[command(alias = "daemon")]
    Serve,

    /// Require every user to change their password at next login
    #[command(alias = "reset-all")]
    ForceReset,

    /// Run one scrape pass over the search log
    Scrape,

    /// Push all stored pages to the search index
    #[command(alias = "sync")]
    SyncIndex,

    /// Write a default config.toml in the working directory
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let cli = Cli::try_parse_from(["gosearch"]).unwrap();
        assert_eq!(cli.command, None);

        let cli = Cli::try_parse_from(["gosearch", "force-reset"]).unwrap();
        assert_eq!(cli.command, Some(Commands::ForceReset));

        let cli = Cli::try_parse_from(["gosearch", "sync"]).unwrap();
        assert_eq!(cli.command, Some(Commands::SyncIndex));

        assert!(Cli::try_parse_from(["gosearch", "bogus"]).is_err());
    }
}
