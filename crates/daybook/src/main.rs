//! Daybook - a terminal journal that remembers every edit.
//!
//! This is the main entry point for the daybook CLI.

mod commands;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use commands::App;
use daybook_core::config::LogLevel;
use daybook_core::{parse_date, Config, EntryDate};
use daybook_util::log::LogConfig;
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser)]
#[command(name = "daybook")]
#[command(author, version, about = "Terminal journal with full edit history", long_about = None)]
struct Cli {
    /// Date to edit: today, yesterday, YYYY-MM-DD, MM/DD/YYYY or DD.MM.YYYY
    date: Option<String>,

    /// Config file, merged over the global one
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log to stderr at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the recorded revisions of a day
    History {
        /// Day of the entry
        date: String,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print an entry as it was at one revision
    Show {
        /// Day of the entry
        date: String,
        /// Revision index, as listed by `history`
        index: usize,
        /// Open the reconstructed text in the editor instead of printing it
        #[arg(long)]
        open: bool,
    },
    /// Summarize a day's entry
    Info {
        /// Day of the entry
        date: String,
    },
    /// List the days of a month that have entries
    Month {
        /// Month as YYYY-MM, defaults to the current month
        month: Option<String>,
    },
    /// Remove cached reconstructions
    Clean,
    /// Print the resolved configuration
    Config,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (config, sources) = Config::load(cli.config.as_deref()).await?;
    let config = config.resolve()?;

    init_logging(cli.verbose, config.log_level);
    debug!(?sources, "Loaded configuration");

    let mut app = App::new(config);
    let result = match (cli.date, cli.command) {
        (Some(_), Some(_)) => bail!("a date cannot be combined with a subcommand"),
        (Some(date), None) => app.edit(date_arg(&date)?).await,
        (None, Some(Commands::History { date, json })) => {
            app.history(date_arg(&date)?, json).await
        }
        (None, Some(Commands::Show { date, index, open })) => {
            app.show(date_arg(&date)?, index, open).await
        }
        (None, Some(Commands::Info { date })) => app.info(date_arg(&date)?).await,
        (None, Some(Commands::Month { month })) => {
            let (year, month) = match month {
                Some(month) => daybook_core::date::parse_month(&month)
                    .with_context(|| format!("unrecognized month '{month}', expected YYYY-MM"))?,
                None => {
                    let today = EntryDate::today();
                    (today.year(), today.month())
                }
            };
            app.month(year, month).await
        }
        (None, Some(Commands::Clean)) => app.clean().await,
        (None, Some(Commands::Config)) => app.show_config(),
        (None, None) => {
            let today = EntryDate::today();
            app.month(today.year(), today.month()).await
        }
    };

    // Flush even when the command failed, so refreshed summaries survive
    let finished = app.finish().await;
    result.and(finished)
}

fn date_arg(input: &str) -> anyhow::Result<EntryDate> {
    parse_date(input, EntryDate::today().naive()).with_context(|| {
        format!(
            "unrecognized date '{input}', use today, yesterday, YYYY-MM-DD, MM/DD/YYYY or DD.MM.YYYY"
        )
    })
}

/// Logs go to a file unless `verbose`, since the editor owns the terminal.
fn init_logging(verbose: bool, level: LogLevel) {
    let config = LogConfig {
        print: verbose,
        level: if verbose {
            daybook_util::log::LogLevel::Debug
        } else {
            level.into()
        },
        ..Default::default()
    };

    if let Err(e) = daybook_util::log::init(config) {
        eprintln!("Warning: Could not initialize logging: {}", e);
    }
}
