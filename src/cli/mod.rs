pub mod commands;

use clap::{Parser, Subcommand};
use crate::error::Result;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rss-scout")]
#[command(about = "Turn news and notice list pages into RSS feeds")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Infer selectors for the list on a page
    Infer {
        /// Page URL or local HTML file
        source: String,

        /// CSS selector of a node inside the list (searches the whole page if omitted)
        #[arg(short, long)]
        start: Option<String>,

        /// Base URL for relative links when reading a local file
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Extract records from a page with explicit selectors
    Extract {
        /// Page URL or local HTML file
        source: String,

        #[arg(long)]
        container: String,

        #[arg(long)]
        item: String,

        #[arg(long, default_value = "a")]
        title: String,

        #[arg(long, default_value = "a")]
        link: String,

        #[arg(long)]
        date: String,

        /// Base URL for relative links when reading a local file
        #[arg(long)]
        base_url: Option<String>,

        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Update the feeds of configured sites once
    Run {
        /// Only update this site
        #[arg(short, long)]
        site: Option<String>,
    },

    /// Update all configured sites on the configured interval until Ctrl-C
    Watch,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = match self.command {
            Commands::Init { .. } | Commands::Completions { .. } => crate::config::Config::default(),
            _ => commands::load_config_or_default(self.config.clone())?,
        };
        let _guard = commands::init_logging(self.debug, self.verbose, &config.logging)?;

        match self.command {
            Commands::Infer { source, start, base_url } => {
                commands::infer(&config, &source, start.as_deref(), base_url).await
            }
            Commands::Extract { source, container, item, title, link, date, base_url, json } => {
                let selectors = crate::engine::SelectorSet { container, item, title, link, date };
                commands::extract(&config, &source, &selectors, base_url, json).await
            }
            Commands::Run { site } => {
                commands::run(&config, site.as_deref()).await
            }
            Commands::Watch => {
                commands::watch(&config).await
            }
            Commands::Init { force } => {
                commands::init(self.config, force)
            }
            Commands::Completions { shell } => {
                commands::generate_completions(shell);
                Ok(())
            }
        }
    }
}
