//! Pipeline orchestrator: scraper → file sinks → relational store → viewer.
//!
//! ## One run
//!   1. For each page 1..=N: fetch, snapshot to PDF, extract quotes, append.
//!      A fetch, snapshot or parse error aborts the run before anything is written.
//!   2. Write the JSON and CSV exports. Each sink logs its own failure and the
//!      other still runs.
//!   3. Insert the batch in one transaction. A failure is logged and rolled back;
//!      files already written stay on disk.
//!   4. Read back up to 100 rows and print them.

mod aggregator;

pub use self::aggregator::Aggregator;

use crate::config::AppConfig;
use crate::export;
use crate::models::{Quote, StoredQuote};
use crate::scraper::parsers::extract_quotes;
use crate::scraper::snapshot::SnapshotWriter;
use crate::scraper::{QuoteSiteScraper, QuoteSource};
use crate::storage::{PREVIEW_LIMIT, QuoteStore};
use crate::utils::{self, Timer};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct Pipeline {
    config: AppConfig,
    source: Arc<dyn QuoteSource>,
    snapshots: Option<SnapshotWriter>,
    store: QuoteStore,
}

impl Pipeline {
    pub fn new(
        config: AppConfig,
        source: Arc<dyn QuoteSource>,
        snapshots: Option<SnapshotWriter>,
        store: QuoteStore,
    ) -> Self {
        Self {
            config,
            source,
            snapshots,
            store,
        }
    }

    /// Wire up the HTTP scraper, the PDF writer and the configured store.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let source = QuoteSiteScraper::new(&config.scraper).context("Failed to build scraper")?;
        let snapshots = config
            .snapshot
            .enabled
            .then(|| SnapshotWriter::new(&config.snapshot));
        let store = QuoteStore::from_config(&config.storage)?;
        Ok(Self::new(config, Arc::new(source), snapshots, store))
    }

    pub fn store(&self) -> &QuoteStore {
        &self.store
    }

    pub async fn run(&self) -> Result<RunReport> {
        let _t = Timer::start("Quote run");

        // ── 1. Scrape every page ───────────────────────────────────────────────
        let quotes = self.scrape().await?;

        // ── 2. File sinks ──────────────────────────────────────────────────────
        let json_path = self.config.json_path();
        let json = match export::write_json(&json_path, &quotes) {
            Ok(()) => {
                info!("JSON file written: {:?}", json_path);
                Ok(json_path)
            }
            Err(e) => {
                error!("JSON file was not written: {:#}", e);
                Err(format!("{:#}", e))
            }
        };

        let csv_path = self.config.csv_path();
        let csv = match export::write_csv(&csv_path, &quotes) {
            Ok(()) => {
                info!("CSV file written: {:?}", csv_path);
                Ok(csv_path)
            }
            Err(e) => {
                error!("CSV file was not written: {:#}", e);
                Err(format!("{:#}", e))
            }
        };

        // ── 3. Relational store ────────────────────────────────────────────────
        let inserted = match self.store.insert_all(&quotes) {
            Ok(n) => Some(n),
            Err(_) => {
                // already logged by the store
                warn!("No rows stored for this run");
                None
            }
        };

        // ── 4. Viewer ──────────────────────────────────────────────────────────
        let preview = self
            .store
            .fetch_preview(PREVIEW_LIMIT)
            .context("Preview read failed")?;
        let total = self.store.count().context("Row count failed")?;
        println!("{}", render_preview(&preview, total));
        info!(
            "Preview: {} of {} rows shown",
            preview.len(),
            utils::fmt_number(total)
        );

        Ok(RunReport {
            quotes,
            json,
            csv,
            inserted,
            preview_rows: preview.len(),
        })
    }

    async fn scrape(&self) -> Result<Vec<Quote>> {
        let total_pages = self.config.scraper.total_pages;
        let mut all = Aggregator::new();

        for page in 1..=total_pages {
            let url = self.source.page_url(page);
            info!("Fetching page {} ({})", page, url);

            let html = self
                .source
                .fetch_page(page)
                .await
                .with_context(|| format!("Failed to fetch page {}", page))?;

            if let Some(writer) = &self.snapshots {
                if let Err(e) = writer.capture(page, &url).await {
                    error!("Snapshot of page {} failed: {}", page, e);
                    return Err(e).with_context(|| format!("Snapshot of page {}", page));
                }
            }

            let quotes = {
                let _t = Timer::start(format!("extraction of page {}", page));
                extract_quotes(&html).with_context(|| format!("Failed to parse page {}", page))?
            };
            info!("  Page {}: {} quotes", page, quotes.len());
            all.push_page(quotes);
        }

        if all.is_empty() {
            warn!("No quotes found in {} pages", all.pages());
        }
        info!(
            "Scraping complete: {} quotes from {} pages",
            all.len(),
            all.pages()
        );
        Ok(all.into_quotes())
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub quotes: Vec<Quote>,
    pub json: Result<PathBuf, String>,
    pub csv: Result<PathBuf, String>,
    pub inserted: Option<usize>,
    pub preview_rows: usize,
}

pub fn render_preview(rows: &[StoredQuote], total: i64) -> String {
    let rule = "─".repeat(90);
    let mut out = String::new();
    out.push_str(&rule);
    out.push_str(&format!(
        "\n  Quotes — {} of {} rows\n",
        rows.len(),
        utils::fmt_number(total)
    ));
    out.push_str(&rule);
    for r in rows {
        out.push_str(&format!(
            "\n  {:>5}  {:<22}  {}",
            r.id,
            utils::truncate(&r.author, 22),
            utils::truncate(&r.text, 60)
        ));
    }
    if rows.is_empty() {
        out.push_str("\n  (no rows)");
    }
    out.push('\n');
    out.push_str(&rule);
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
