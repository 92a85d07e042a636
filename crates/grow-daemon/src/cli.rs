//! CLI argument parsing for growd.
//!
//! CLI flags override every other configuration source.

use clap::{Parser, Subcommand};

/// GrowGram search daemon
///
/// Runs the nightly index jobs and answers search queries against the
/// local post store.
#[derive(Parser, Debug)]
#[command(name = "growd")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/growgram/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Override database path
    #[arg(long, global = true)]
    pub db_path: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scheduler until Ctrl+C / SIGTERM
    Serve,

    /// Rebuild the search fields of every post once
    Reindex {
        /// Override records per page
        #[arg(long)]
        page_size: Option<usize>,
    },

    /// Backfill thumbnail URLs and media metadata once
    BackfillThumbs {
        /// Override records per page
        #[arg(long)]
        page_size: Option<usize>,
    },

    /// Search posts
    Search {
        query: String,

        /// Restrict results to a tag
        #[arg(short, long)]
        tag: Option<String>,

        /// Continue after this cursor
        #[arg(long)]
        cursor: Option<String>,

        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Show how a query would be executed
    Resolve { query: String },

    /// Keyword completions for a prefix
    Suggest {
        prefix: String,

        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Most used tags among recent posts
    Trending {
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Inspect the taxonomy dictionary
    Taxonomy {
        #[command(subcommand)]
        command: TaxonomyCommands,
    },

    /// Load posts from a JSON Lines file, indexing each one
    Import {
        /// One post object per line; lines without an id get a fresh one
        path: String,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum TaxonomyCommands {
    /// All species, families, tags and strains
    List,

    /// Look an alias up in every table
    Resolve { query: String },

    /// Canonical values starting with a prefix
    Suggest {
        query: String,

        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
}
