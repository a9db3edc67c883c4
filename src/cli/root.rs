use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info};

use modalis::{config::Config, tui};

/// Modalis - focus-trapped modal dialogs for the terminal
#[derive(Parser, Debug)]
#[command(
    name = "modalis",
    version,
    about = "Focus-trapped modal dialogs for the terminal",
    long_about = r#"Modalis opens an application form in a modal dialog with a focus trap,
scroll lock and Escape/backdrop dismissal, and shows what was submitted.

Examples:
  modalis                            # Start the interactive demo
  modalis --close-on-backdrop        # Clicking outside the dialog dismisses it
  modalis config                     # Print the effective configuration"#
)]
pub struct Cli {
    /// Path to a JSON configuration file
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'd', long = "debug", global = true)]
    pub debug: bool,

    /// Write logs to this file instead of stderr
    #[arg(long = "log-file", global = true)]
    pub log_file: Option<PathBuf>,

    /// Dismiss dialogs on a click outside the panel
    #[arg(long = "close-on-backdrop")]
    pub close_on_backdrop: bool,

    /// Ignore Escape in dialogs
    #[arg(long = "no-close-on-escape")]
    pub no_close_on_escape: bool,

    /// Event loop tick interval in milliseconds
    #[arg(long = "tick-rate", value_name = "MS")]
    pub tick_rate: Option<u64>,

    /// Do not capture the mouse
    #[arg(long = "no-mouse")]
    pub no_mouse: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the effective configuration as JSON
    Config,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        if self.debug {
            debug!("Debug logging enabled");
        }

        let mut config = Config::load(self.config.as_deref()).await?;
        self.apply_overrides(&mut config);
        config.validate()?;
        debug!(?config, "Configuration initialized");

        match self.command {
            Some(Commands::Config) => {
                println!("{}", serde_json::to_string_pretty(&config)?);
                Ok(())
            }
            None => {
                info!("Starting interactive mode");
                tui::run(config).await?;
                info!("Application finished");
                Ok(())
            }
        }
    }

    /// Filter used when `RUST_LOG` is unset.
    ///
    /// The interactive UI owns the terminal, so without a log file it logs
    /// nothing; stderr output would be drawn over the screen.
    pub fn default_log_filter(&self) -> &'static str {
        if self.log_file.is_none() && self.command.is_none() {
            "off"
        } else if self.debug {
            "modalis=debug"
        } else {
            "modalis=info"
        }
    }

    /// Command-line flags win over file and environment settings
    fn apply_overrides(&self, config: &mut Config) {
        if self.close_on_backdrop {
            config.chrome.close_on_backdrop_click = true;
        }
        if self.no_close_on_escape {
            config.chrome.close_on_escape = false;
        }
        if let Some(tick_rate) = self.tick_rate {
            config.tick_rate_ms = tick_rate;
        }
        if self.no_mouse {
            config.mouse_enabled = false;
        }
    }
}
