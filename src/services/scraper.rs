//! Content ingestion: turns logged search terms into Wikipedia pages.

use anyhow::Result;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

use crate::clients::wikipedia::{Article, WikipediaClient};
use crate::db::{NewPage, Store};
use crate::services::SearchService;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrapeReport {
    pub terms: usize,
    pub skipped: usize,
    pub scraped: usize,
    pub failed: usize,
    pub pages_added: u64,
}

fn query_regex() -> Option<&'static Regex> {
    static INSTANCE: OnceLock<Option<Regex>> = OnceLock::new();
    INSTANCE
        .get_or_init(|| Regex::new(r#"query="([^"]+)""#).ok())
        .as_ref()
}

/// Unique, lower-cased terms in order of first appearance.
#[must_use]
pub fn extract_terms(log: &str) -> Vec<String> {
    let Some(re) = query_regex() else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    re.captures_iter(log)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim().to_lowercase())
        .filter(|term| !term.is_empty() && seen.insert(term.clone()))
        .collect()
}

fn validate(article: &Article) -> Result<()> {
    if article.url.trim().is_empty() {
        anyhow::bail!("Page has no URL");
    }
    if article.title.trim().is_empty() {
        anyhow::bail!("Page {} has no title", article.url);
    }
    if article.content.trim().is_empty() {
        anyhow::bail!("Page {} has no content", article.url);
    }
    Ok(())
}

pub struct Scraper {
    store: Store,
    wikipedia: WikipediaClient,
    search: Arc<SearchService>,
    log_path: PathBuf,
    language: String,
}

impl Scraper {
    #[must_use]
    pub fn new(
        store: Store,
        wikipedia: WikipediaClient,
        search: Arc<SearchService>,
        log_path: &Path,
        language: &str,
    ) -> Self {
        Self {
            store,
            wikipedia,
            search,
            log_path: log_path.to_path_buf(),
            language: language.to_string(),
        }
    }

    async fn read_terms(&self) -> Vec<String> {
        match tokio::fs::read_to_string(&self.log_path).await {
            Ok(content) => extract_terms(&content),
            Err(e) => {
                warn!(path = %self.log_path.display(), error = %e, "Cannot read search log");
                Vec::new()
            }
        }
    }

    async fn scrape_term(&self, term: &str) -> Result<()> {
        let article = self.wikipedia.fetch_article(term).await?;
        validate(&article)?;

        self.store
            .upsert_page(NewPage {
                url: article.url,
                title: article.title,
                language: self.language.clone(),
                content: article.content,
            })
            .await?;

        self.store.mark_term_processed(term).await
    }

    /// One ingestion pass over the search log.
    pub async fn run(&self) -> Result<ScrapeReport> {
        let terms = self.read_terms().await;
        let pages_before = self.store.count_pages().await?;

        let mut report = ScrapeReport {
            terms: terms.len(),
            ..ScrapeReport::default()
        };

        for term in &terms {
            let processed = match self.store.is_term_processed(term).await {
                Ok(processed) => processed,
                Err(e) => {
                    warn!(term, error = %e, "Ledger lookup failed, scraping anyway");
                    false
                }
            };
            if processed {
                report.skipped += 1;
                continue;
            }

            match self.scrape_term(term).await {
                Ok(()) => {
                    report.scraped += 1;
                    metrics::counter!("scraper_pages_total", "outcome" => "scraped").increment(1);
                }
                Err(e) => {
                    report.failed += 1;
                    metrics::counter!("scraper_pages_total", "outcome" => "failed").increment(1);
                    warn!(term, error = %e, "Failed to scrape term");
                }
            }
        }

        let pages_after = self.store.count_pages().await?;
        report.pages_added = pages_after.saturating_sub(pages_before);

        if report.pages_added > 0
            && let Err(e) = self.search.sync_index(&self.store).await
        {
            warn!(error = %e, "Search index sync after scrape failed");
        }

        info!(
            terms = report.terms,
            skipped = report.skipped,
            scraped = report.scraped,
            failed = report.failed,
            pages_added = report.pages_added,
            "Scrape finished"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_terms() {
        let log = "\
SEARCH: 2025/03/01 12:00:00 query=\"Farveblind\" from=1.2.3.4:1
SEARCH: 2025/03/01 12:00:01 query=\"  rød grød \" from=1.2.3.4:1
SEARCH: 2025/03/01 12:00:02 query=\"farveblind\" from=5.6.7.8:2
garbage line
";
        assert_eq!(extract_terms(log), vec!["farveblind", "rød grød"]);
    }

    #[test]
    fn test_validate_rejects_empty_fields() {
        let mut article = Article {
            url: "https://da.wikipedia.org/wiki/X".to_string(),
            title: "X".to_string(),
            content: "Body".to_string(),
        };
        assert!(validate(&article).is_ok());

        article.content = "  ".to_string();
        assert!(validate(&article).is_err());
    }
}
