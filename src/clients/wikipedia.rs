use anyhow::{Context, Result, anyhow, bail};
use regex::Regex;
use reqwest::{Client, StatusCode};
use std::sync::OnceLock;
use url::Url;

/// Article text pulled out of a Wikipedia page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub url: String,
    pub title: String,
    pub content: String,
}

struct ArticleRegex {
    heading: Regex,
    paragraph: Regex,
    tag: Regex,
    whitespace: Regex,
}

impl ArticleRegex {
    fn get() -> Option<&'static Self> {
        static INSTANCE: OnceLock<Option<ArticleRegex>> = OnceLock::new();
        INSTANCE
            .get_or_init(|| {
                Some(Self {
                    heading: Regex::new(r#"(?s)<h1[^>]*id="firstHeading"[^>]*>(.*?)</h1>"#).ok()?,
                    paragraph: Regex::new(r"(?s)<p(?:\s[^>]*)?>(.*?)</p>").ok()?,
                    tag: Regex::new(r"<[^>]+>").ok()?,
                    whitespace: Regex::new(r"[ \t\r\n]+").ok()?,
                })
            })
            .as_ref()
    }
}

fn strip_markup(fragment: &str, re: &ArticleRegex) -> String {
    let text = re.tag.replace_all(fragment, "");
    let text = html_escape::decode_html_entities(&text);
    re.whitespace.replace_all(&text, " ").trim().to_string()
}

/// Extracts `#firstHeading` and the paragraphs of the `mw-parser-output` body.
#[must_use]
pub fn parse_article(html: &str) -> (String, String) {
    let Some(re) = ArticleRegex::get() else {
        return (String::new(), String::new());
    };

    let title = re
        .heading
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| strip_markup(m.as_str(), re))
        .unwrap_or_default();

    let body = html
        .find("mw-parser-output")
        .map_or("", |idx| &html[idx..]);

    let content = re
        .paragraph
        .captures_iter(body)
        .filter_map(|c| c.get(1))
        .map(|m| strip_markup(m.as_str(), re))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    (title, content)
}

/// Turns a search term into an article slug: `rød grød` becomes `Rød_Grød`.
#[must_use]
pub fn article_slug(term: &str) -> String {
    term.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join("_")
}

#[derive(Clone)]
pub struct WikipediaClient {
    client: Client,
    base_url: Url,
}

impl WikipediaClient {
    pub fn new(client: Client, base_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url).context("Invalid Wikipedia base URL")?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { client, base_url })
    }

    pub fn article_url(&self, term: &str) -> Result<Url> {
        let slug = article_slug(term);
        if slug.is_empty() {
            bail!("Empty search term");
        }

        // One encoded segment: `#`, `?` and `/` in a term stay part of the title
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("Wikipedia base URL {} cannot hold a path", self.base_url))?
            .pop_if_empty()
            .push(&slug);

        Ok(url)
    }

    pub async fn fetch_article(&self, term: &str) -> Result<Article> {
        let url = self.article_url(term)?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to fetch {url}"))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            bail!("No article found at {url}");
        }
        if !status.is_success() {
            bail!("Wikipedia returned {status} for {url}");
        }

        let html = response.text().await.context("Failed to read article body")?;
        let (title, content) = parse_article(&html);

        Ok(Article {
            url: url.to_string(),
            title,
            content,
        })
    }
}
