use anyhow::{Context, Result, bail};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Document stored in the pages index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageDocument {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source")]
    source: PageDocument,
}

#[derive(Debug, Clone)]
pub struct ElasticsearchCredentials {
    pub username: String,
    pub password: Option<String>,
}

/// Minimal REST client for one Elasticsearch index.
#[derive(Clone)]
pub struct ElasticsearchClient {
    client: Client,
    base_url: String,
    index: String,
    credentials: Option<ElasticsearchCredentials>,
}

impl ElasticsearchClient {
    #[must_use]
    pub fn new(
        client: Client,
        base_url: &str,
        index: &str,
        credentials: Option<ElasticsearchCredentials>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            index: index.to_string(),
            credentials,
        }
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.credentials {
            Some(creds) => builder.basic_auth(&creds.username, creds.password.as_ref()),
            None => builder,
        }
    }

    pub async fn ping(&self) -> Result<()> {
        let response = self
            .request(reqwest::Method::GET, &self.base_url)
            .send()
            .await
            .context("Failed to reach Elasticsearch")?;

        if !response.status().is_success() {
            bail!("Elasticsearch ping returned {}", response.status());
        }
        Ok(())
    }

    /// Runs a `multi_match` query weighted towards title, then url, then content.
    pub async fn search(&self, query: &str) -> Result<Vec<PageDocument>> {
        let url = format!("{}/{}/_search", self.base_url, self.index);
        let body = json!({
            "query": {
                "multi_match": {
                    "query": query,
                    "fields": ["title^3", "url^2", "content"]
                }
            }
        });

        let response = self
            .request(reqwest::Method::POST, &url)
            .json(&body)
            .send()
            .await
            .context("Elasticsearch search request failed")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("Elasticsearch search returned {status}: {text}");
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .context("Failed to decode Elasticsearch search response")?;

        Ok(parsed.hits.hits.into_iter().map(|h| h.source).collect())
    }

    /// Indexes a document under its URL so repeated syncs overwrite.
    pub async fn index_document(&self, doc: &PageDocument) -> Result<()> {
        let url = format!(
            "{}/{}/_doc/{}",
            self.base_url,
            self.index,
            urlencoding::encode(&doc.url)
        );

        let response = self
            .request(reqwest::Method::PUT, &url)
            .json(doc)
            .send()
            .await
            .with_context(|| format!("Failed to index {}", doc.url))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("Elasticsearch indexing of {} returned {status}: {text}", doc.url);
        }
        Ok(())
    }

    pub async fn refresh(&self) -> Result<()> {
        let url = format!("{}/{}/_refresh", self.base_url, self.index);
        let response = self
            .request(reqwest::Method::POST, &url)
            .send()
            .await
            .context("Elasticsearch refresh failed")?;

        if !response.status().is_success() {
            bail!("Elasticsearch refresh returned {}", response.status());
        }
        Ok(())
    }
}
