use anyhow::{Context, Result};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;

use crate::entities::pages;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Page {
    pub url: String,
    pub title: String,
    pub language: String,
    pub last_updated: String,
    pub content: String,
}

impl From<pages::Model> for Page {
    fn from(model: pages::Model) -> Self {
        Self {
            url: model.url,
            title: model.title,
            language: model.language,
            last_updated: model.last_updated,
            content: model.content,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewPage {
    pub url: String,
    pub title: String,
    pub language: String,
    pub content: String,
}

pub struct PageRepository {
    conn: DatabaseConnection,
}

impl PageRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Insert or refresh a page keyed by URL
    pub async fn upsert(&self, page: NewPage) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = pages::ActiveModel {
            url: Set(page.url),
            title: Set(page.title),
            language: Set(page.language),
            last_updated: Set(now),
            content: Set(page.content),
        };

        pages::Entity::insert(active)
            .on_conflict(
                OnConflict::column(pages::Column::Url)
                    .update_columns([
                        pages::Column::Title,
                        pages::Column::Language,
                        pages::Column::LastUpdated,
                        pages::Column::Content,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await
            .context("Failed to upsert page")?;

        Ok(())
    }

    /// Substring match against page content
    pub async fn search_content(&self, query: &str) -> Result<Vec<Page>> {
        let rows = pages::Entity::find()
            .filter(pages::Column::Content.contains(query))
            .order_by_asc(pages::Column::Title)
            .all(&self.conn)
            .await
            .context("Failed to search pages")?;

        Ok(rows.into_iter().map(Page::from).collect())
    }

    pub async fn list_all(&self) -> Result<Vec<Page>> {
        let rows = pages::Entity::find()
            .order_by_asc(pages::Column::Url)
            .all(&self.conn)
            .await
            .context("Failed to list pages")?;

        Ok(rows.into_iter().map(Page::from).collect())
    }

    pub async fn count(&self) -> Result<u64> {
        pages::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count pages")
    }
}
