//! growd library exports.
//!
//! - `cli`: command-line argument parsing with clap
//! - `commands`: command implementations (serve, batch jobs, queries, import)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands, TaxonomyCommands};
pub use commands::{
    import_posts, init_tracing, load_settings, print_json, resolve, run_backfill_thumbs,
    run_reindex, search, serve, suggest, taxonomy, trending, AppContext, ImportSummary,
};
