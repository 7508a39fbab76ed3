//! Search façade over either Elasticsearch or the relational store.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clients::elasticsearch::{ElasticsearchClient, ElasticsearchCredentials, PageDocument};
use crate::config::SearchConfig;
use crate::db::{Page, Store};
use crate::services::search_log::SearchLog;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PageResult {
    pub title: String,
    pub url: String,
    pub content: String,
}

impl From<Page> for PageResult {
    fn from(page: Page) -> Self {
        Self {
            title: page.title,
            url: page.url,
            content: page.content,
        }
    }
}

impl From<PageDocument> for PageResult {
    fn from(doc: PageDocument) -> Self {
        Self {
            title: doc.title,
            url: doc.url,
            content: doc.content,
        }
    }
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search(&self, query: &str) -> Result<Vec<PageResult>>;

    /// Pushes pages into the backend's index. Returns how many were indexed.
    async fn index_pages(&self, pages: &[Page]) -> Result<usize>;
}

/// Substring match on page content.
pub struct DatabaseBackend {
    store: Store,
}

impl DatabaseBackend {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SearchBackend for DatabaseBackend {
    fn name(&self) -> &'static str {
        "database"
    }

    async fn search(&self, query: &str) -> Result<Vec<PageResult>> {
        let pages = self.store.search_pages(query).await?;
        Ok(pages.into_iter().map(PageResult::from).collect())
    }

    async fn index_pages(&self, _pages: &[Page]) -> Result<usize> {
        Ok(0)
    }
}

pub struct ElasticsearchBackend {
    client: ElasticsearchClient,
}

impl ElasticsearchBackend {
    #[must_use]
    pub const fn new(client: ElasticsearchClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SearchBackend for ElasticsearchBackend {
    fn name(&self) -> &'static str {
        "elasticsearch"
    }

    async fn search(&self, query: &str) -> Result<Vec<PageResult>> {
        let docs = self.client.search(query).await?;
        Ok(docs.into_iter().map(PageResult::from).collect())
    }

    async fn index_pages(&self, pages: &[Page]) -> Result<usize> {
        let mut indexed = 0;
        for page in pages {
            let doc = PageDocument {
                url: page.url.clone(),
                title: page.title.clone(),
                language: page.language.clone(),
                content: page.content.clone(),
            };
            match self.client.index_document(&doc).await {
                Ok(()) => indexed += 1,
                Err(e) => warn!(url = %page.url, error = %e, "Failed to index page"),
            }
        }

        if indexed > 0 {
            self.client.refresh().await?;
        }
        Ok(indexed)
    }
}

pub struct SearchService {
    backend: Arc<dyn SearchBackend>,
    audit: SearchLog,
}

impl SearchService {
    #[must_use]
    pub fn new(backend: Arc<dyn SearchBackend>, audit: SearchLog) -> Self {
        Self { backend, audit }
    }

    /// Picks the backend once: Elasticsearch when a URL is configured,
    /// the database otherwise.
    pub async fn from_config(
        config: &SearchConfig,
        store: Store,
        http_client: reqwest::Client,
    ) -> Self {
        let backend: Arc<dyn SearchBackend> = match &config.elasticsearch_url {
            Some(url) if !url.trim().is_empty() => {
                let credentials =
                    config
                        .elasticsearch_username
                        .as_ref()
                        .map(|username| ElasticsearchCredentials {
                            username: username.clone(),
                            password: config.elasticsearch_password.clone(),
                        });
                let client =
                    ElasticsearchClient::new(http_client, url, &config.index_name, credentials);

                if let Err(e) = client.ping().await {
                    warn!(url = %url, error = %e, "Elasticsearch is not reachable yet");
                }
                info!(url = %url, index = %config.index_name, "Search backend: Elasticsearch");
                Arc::new(ElasticsearchBackend::new(client))
            }
            _ => {
                info!("Search backend: database");
                Arc::new(DatabaseBackend::new(store))
            }
        };

        let audit = SearchLog::open(Path::new(&config.log_path)).await;
        Self::new(backend, audit)
    }

    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    #[must_use]
    pub fn log_path(&self) -> Option<&Path> {
        self.audit.path()
    }

    /// Records the query in the audit log, then runs it.
    pub async fn search(&self, query: &str, caller: &str) -> Result<Vec<PageResult>> {
        if let Err(e) = self.audit.record(query, caller).await {
            warn!(error = %e, "Failed to write search audit log");
        }

        metrics::counter!("search_queries_total", "backend" => self.backend.name()).increment(1);

        let results = self
            .backend
            .search(query)
            .await
            .with_context(|| format!("{} search failed", self.backend.name()))?;

        debug!(query, hits = results.len(), "Search completed");
        Ok(results)
    }

    /// Pushes every stored page into the search index.
    pub async fn sync_index(&self, store: &Store) -> Result<usize> {
        let pages = store.list_pages().await?;
        let indexed = self.backend.index_pages(&pages).await?;
        info!(
            backend = self.backend.name(),
            pages = pages.len(),
            indexed,
            "Search index synchronized"
        );
        Ok(indexed)
    }
}
