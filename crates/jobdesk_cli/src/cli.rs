use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "jobdesk")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Drive the job-search backend from the terminal")]
pub struct CliArgs {
    /// RON configuration file (defaults to ./jobdesk.ron when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Backend base URL, e.g. http://127.0.0.1:8000
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// CSRF token sent with every mutating request
    #[arg(long, global = true, env = "JOBDESK_CSRF_TOKEN", value_name = "TOKEN")]
    pub csrf_token: Option<String>,

    /// Also write the log to this file
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Do not draw progress bars; report through the log only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Ask the backend whether a newer version is available
    CheckUpdates,

    /// Crawl for new listings and show progress until done
    Fetch {
        /// Number of listings to request
        #[arg(long, value_name = "NUM")]
        max_items: Option<u32>,

        /// Write the fetched jobs to this JSON file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Apply to the given job URLs and follow progress until done
    BulkApply {
        /// Job URLs to apply to
        #[arg(value_name = "URL")]
        urls: Vec<String>,

        /// Read additional URLs from a file, one per line
        #[arg(long, value_name = "FILE")]
        from_file: Option<PathBuf>,
    },
}
