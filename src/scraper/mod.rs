pub mod error;
pub mod http_client;
pub mod parsers;
pub mod snapshot;

use crate::config::ScraperConfig;
use async_trait::async_trait;

use self::error::ScrapeError;
use self::http_client::HttpClient;

// ── Source trait ──────────────────────────────────────────────────────────────

/// Paginated listing that serves raw HTML per 1-based page index.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    fn page_url(&self, page: u32) -> String;
    async fn fetch_page(&self, page: u32) -> Result<String, ScrapeError>;
}

// ── quotes.toscrape.com ───────────────────────────────────────────────────────

pub struct QuoteSiteScraper {
    client: HttpClient,
    base_url: String,
}

impl QuoteSiteScraper {
    pub fn new(config: &ScraperConfig) -> Result<Self, ScrapeError> {
        Ok(Self {
            client: HttpClient::new(config)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl QuoteSource for QuoteSiteScraper {
    /// e.g. page 2 → http://quotes.toscrape.com/page/2
    fn page_url(&self, page: u32) -> String {
        format!("{}/page/{}", self.base_url, page)
    }

    async fn fetch_page(&self, page: u32) -> Result<String, ScrapeError> {
        let url = self.page_url(page);
        self.client.get_text(&url).await
    }
}
