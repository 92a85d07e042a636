//! Command implementations for growd.
//!
//! Handles:
//! - serve: register the nightly jobs and run the scheduler until a signal
//! - reindex / backfill-thumbs: one batch job run in the foreground
//! - search / resolve / suggest / trending: read-only queries
//! - taxonomy: dictionary inspection
//! - import: JSON Lines post loading through the write trigger
//!
//! Every command prints its result as JSON on stdout.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tokio::signal;
use tracing::{debug, info, warn};

use grow_indexing::{
    BatchJobRunner, IndexBuilder, JobConfig, NoMediaMetadata, ReindexTransform,
    ThumbnailTransform, TriggerOutcome, WriteTrigger, REINDEX_JOB, THUMBNAILS_JOB,
};
use grow_scheduler::jobs::{create_reindex_job, create_thumbnail_job};
use grow_scheduler::{SchedulerConfig, SchedulerService};
use grow_search::{QueryPlan, QueryResolver, SearchPage, SearchRequest, SearchService, TagCount};
use grow_storage::{merge_into, DocKey, DocumentStore, RocksStore};
use grow_taxonomy::{TaxonomyCatalog, TaxonomyDictionary, TaxonomyMatcher};
use grow_types::{fields, JobSettings, JobStats, PostRecord, Settings};

use crate::cli::TaxonomyCommands;

/// Load settings and apply the CLI overrides (highest precedence).
pub fn load_settings(
    config_path: Option<&str>,
    db_path_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(db_path) = db_path_override {
        settings.db_path = db_path.to_string();
    }
    if let Some(log_level) = log_level_override {
        settings.log_level = log_level.to_string();
    }
    Ok(settings)
}

/// Install the tracing subscriber. `RUST_LOG` wins over `log_level`.
/// Logs go to stderr so stdout stays machine-readable.
pub fn init_tracing(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Pretty-print `value` as JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to encode output")?;
    println!("{json}");
    Ok(())
}

/// Everything a command needs: settings, the store and the taxonomy.
pub struct AppContext {
    pub settings: Settings,
    pub store: Arc<dyn DocumentStore>,
    pub matcher: Arc<TaxonomyMatcher>,
}

impl AppContext {
    /// Open the RocksDB store and the configured taxonomy dictionary.
    pub fn open(settings: Settings) -> Result<Self> {
        let dictionary = TaxonomyDictionary::load(settings.taxonomy.dictionary_path.as_deref())
            .context("Failed to load taxonomy dictionary")?;

        let db_path = settings.expanded_db_path();
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent).context("Failed to create database directory")?;
        }
        let store = RocksStore::open(&db_path)
            .with_context(|| format!("Failed to open storage at {}", db_path.display()))?;

        Ok(Self::from_parts(
            settings,
            Arc::new(store),
            Arc::new(TaxonomyMatcher::new(Arc::new(dictionary))),
        ))
    }

    pub fn from_parts(
        settings: Settings,
        store: Arc<dyn DocumentStore>,
        matcher: Arc<TaxonomyMatcher>,
    ) -> Self {
        Self {
            settings,
            store,
            matcher,
        }
    }

    pub fn builder(&self) -> IndexBuilder {
        IndexBuilder::new(self.matcher.clone())
    }

    pub fn search_service(&self) -> SearchService {
        SearchService::new(
            self.store.clone(),
            QueryResolver::new(self.matcher.clone()),
            self.settings.search.clone(),
        )
    }

    fn runner(&self, job_name: &str, settings: &JobSettings, page_size: Option<usize>) -> BatchJobRunner {
        let mut config = JobConfig::from_settings(job_name, settings);
        if let Some(page_size) = page_size {
            config = config.with_page_size(page_size);
        }
        BatchJobRunner::new(self.store.clone(), config)
    }
}

/// Run the reindex job once. A held lease yields zero counts.
pub fn run_reindex(ctx: &AppContext, page_size: Option<usize>) -> Result<JobStats> {
    let runner = ctx.runner(REINDEX_JOB, &ctx.settings.jobs.reindex, page_size);
    let transform = ReindexTransform::new(ctx.builder());
    runner.run(&transform).context("Reindex failed")
}

/// Run the thumbnail backfill once. Media dimensions are not probed from
/// the CLI; only thumb URLs are derived.
pub fn run_backfill_thumbs(ctx: &AppContext, page_size: Option<usize>) -> Result<JobStats> {
    let runner = ctx.runner(THUMBNAILS_JOB, &ctx.settings.jobs.thumbnails, page_size);
    let transform = ThumbnailTransform::new(NoMediaMetadata, ctx.settings.thumbnails.clone());
    runner.run(&transform).context("Thumbnail backfill failed")
}

pub fn search(
    ctx: &AppContext,
    query: &str,
    tag: Option<String>,
    cursor: Option<String>,
    limit: Option<usize>,
) -> Result<SearchPage> {
    let mut request = SearchRequest::new();
    if let Some(tag) = tag {
        request = request.with_forced_tag(tag);
    }
    if let Some(cursor) = cursor {
        request = request.with_cursor(cursor);
    }
    if let Some(limit) = limit {
        request = request.with_limit(limit);
    }
    ctx.search_service()
        .search(query, &request)
        .context("Search failed")
}

pub fn resolve(ctx: &AppContext, query: &str) -> QueryPlan {
    QueryResolver::new(ctx.matcher.clone()).resolve(query)
}

pub fn suggest(ctx: &AppContext, prefix: &str, limit: Option<usize>) -> Result<Vec<String>> {
    ctx.search_service()
        .suggestions(prefix, limit)
        .context("Suggestions failed")
}

pub fn trending(ctx: &AppContext, limit: Option<usize>) -> Result<Vec<TagCount>> {
    ctx.search_service()
        .trending_tags(limit)
        .context("Trending tags failed")
}

pub fn taxonomy(matcher: &TaxonomyMatcher, command: TaxonomyCommands) -> Result<Value> {
    let catalog = TaxonomyCatalog::new(matcher.dictionary());
    let value = match command {
        TaxonomyCommands::List => serde_json::to_value(catalog.listing()),
        TaxonomyCommands::Resolve { query } => serde_json::to_value(catalog.resolve_alias(&query)),
        TaxonomyCommands::Suggest { query, limit } => {
            serde_json::to_value(catalog.suggest(&query, limit))
        }
    };
    value.context("Failed to encode taxonomy output")
}

/// Counts from one import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Non-blank lines read
    pub read: u64,
    /// Posts written to the store
    pub written: u64,
    /// Posts whose search fields were (re)built
    pub indexed: u64,
    pub failed: u64,
}

/// Load posts from a JSON Lines file.
///
/// Each line is merged onto the stored post (derived fields survive) and
/// then passed through the write trigger, as an app write would be. Lines
/// that fail to parse or index are counted and logged, not fatal.
pub fn import_posts(ctx: &AppContext, path: &Path) -> Result<ImportSummary> {
    let file = fs::File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let trigger = WriteTrigger::new(ctx.store.clone(), ctx.builder());
    let mut summary = ImportSummary::default();

    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        summary.read += 1;
        let line_no = index + 1;

        let record = match parse_post(&line) {
            Ok(record) => record,
            Err(e) => {
                warn!(line = line_no, error = %e, "Skipping malformed post");
                summary.failed += 1;
                continue;
            }
        };

        match import_one(ctx.store.as_ref(), &trigger, &record) {
            Ok(outcome) => {
                summary.written += 1;
                if matches!(outcome, TriggerOutcome::Indexed(_)) {
                    summary.indexed += 1;
                }
            }
            Err(e) => {
                warn!(line = line_no, post_id = %record.id, error = %e, "Import failed");
                summary.failed += 1;
            }
        }
    }

    info!(
        read = summary.read,
        written = summary.written,
        indexed = summary.indexed,
        failed = summary.failed,
        "Import finished"
    );
    Ok(summary)
}

fn parse_post(line: &str) -> Result<PostRecord> {
    let mut value: Value = serde_json::from_str(line).context("Invalid JSON")?;
    let object = value.as_object_mut().context("Post is not a JSON object")?;
    let has_id = object
        .get("id")
        .and_then(Value::as_str)
        .is_some_and(|id| !id.trim().is_empty());
    if !has_id {
        object.insert("id".to_string(), Value::String(ulid::Ulid::new().to_string()));
    }
    serde_json::from_value(value).context("Invalid post")
}

fn import_one(
    store: &dyn DocumentStore,
    trigger: &WriteTrigger,
    record: &PostRecord,
) -> Result<TriggerOutcome> {
    let key = DocKey::post(record.id.as_str());
    let before = store.get_document(&key)?.map(|doc| doc.data);

    let mut after = before.clone().unwrap_or_else(|| Value::Object(Default::default()));
    merge_into(&mut after, &record.to_document());
    if record.created_at == 0 {
        // Keep an existing creation time when the line omits it
        if let Some(created) = before.as_ref().and_then(|b| b.get(fields::CREATED_AT)) {
            after[fields::CREATED_AT] = created.clone();
        }
    }
    store.set_document(&key, &after)?;
    debug!(post_id = %record.id, "Post written");

    Ok(trigger.on_record_write(&record.id, before.as_ref(), Some(&after))?)
}

/// Run the scheduler with both nightly jobs until Ctrl+C or SIGTERM.
pub async fn serve(ctx: AppContext) -> Result<()> {
    let settings = &ctx.settings;
    info!("growd starting");
    info!("  Database path: {}", settings.db_path);
    info!("  Timezone: {}", settings.scheduler.timezone);

    if !settings.scheduler.enabled {
        warn!("Scheduler disabled in configuration; waiting for shutdown signal");
        shutdown_signal().await;
        return Ok(());
    }

    let mut scheduler = SchedulerService::new(SchedulerConfig::from(&settings.scheduler))
        .await
        .context("Failed to create scheduler")?;

    create_reindex_job(&scheduler, ctx.store.clone(), ctx.builder(), &settings.jobs.reindex)
        .await
        .context("Failed to register reindex job")?;
    create_thumbnail_job(
        &scheduler,
        ctx.store.clone(),
        NoMediaMetadata,
        settings.thumbnails.clone(),
        &settings.jobs.thumbnails,
    )
    .await
    .context("Failed to register thumbnail job")?;

    scheduler.start().await.context("Failed to start scheduler")?;
    for status in scheduler.registry().get_all_status() {
        info!(job = %status.job_name, cron = %status.cron_expr, next_run = ?status.next_run, "Job scheduled");
    }

    shutdown_signal().await;

    scheduler
        .shutdown()
        .await
        .context("Failed to stop scheduler")?;
    for status in scheduler.registry().get_all_status() {
        info!(
            job = %status.job_name,
            runs = status.run_count,
            errors = status.error_count,
            last_result = ?status.last_result,
            "Job summary"
        );
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
