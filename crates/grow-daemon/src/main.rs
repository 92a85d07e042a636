//! growd: GrowGram search daemon and admin CLI.
//!
//! # Usage
//!
//! ```bash
//! growd serve
//! growd reindex [--page-size N]
//! growd backfill-thumbs [--page-size N]
//! growd search "amnesia haze" [--tag indoor] [--cursor C] [-n 20]
//! growd import posts.jsonl
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/growgram/config.toml)
//! 3. Environment variables (GROW_*)
//! 4. CLI flags

use std::path::Path;

use anyhow::Result;
use clap::Parser;

use grow_daemon::{
    import_posts, init_tracing, load_settings, print_json, resolve, run_backfill_thumbs,
    run_reindex, search, serve, suggest, taxonomy, trending, AppContext, Cli, Commands,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(
        cli.config.as_deref(),
        cli.db_path.as_deref(),
        cli.log_level.as_deref(),
    )?;
    init_tracing(&settings.log_level)?;
    let ctx = AppContext::open(settings)?;

    match cli.command {
        Commands::Serve => serve(ctx).await?,
        Commands::Reindex { page_size } => print_json(&run_reindex(&ctx, page_size)?)?,
        Commands::BackfillThumbs { page_size } => {
            print_json(&run_backfill_thumbs(&ctx, page_size)?)?
        }
        Commands::Search {
            query,
            tag,
            cursor,
            limit,
        } => print_json(&search(&ctx, &query, tag, cursor, limit)?)?,
        Commands::Resolve { query } => print_json(&resolve(&ctx, &query))?,
        Commands::Suggest { prefix, limit } => print_json(&suggest(&ctx, &prefix, limit)?)?,
        Commands::Trending { limit } => print_json(&trending(&ctx, limit)?)?,
        Commands::Taxonomy { command } => print_json(&taxonomy(&ctx.matcher, command)?)?,
        Commands::Import { path } => print_json(&import_posts(&ctx, Path::new(&path))?)?,
    }

    Ok(())
}
