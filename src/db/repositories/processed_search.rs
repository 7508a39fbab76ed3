use anyhow::{Context, Result};
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, Set};

use crate::entities::processed_searches;

pub struct ProcessedSearchRepository {
    conn: DatabaseConnection,
}

impl ProcessedSearchRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn is_processed(&self, term: &str) -> Result<bool> {
        let row = processed_searches::Entity::find_by_id(term.to_string())
            .one(&self.conn)
            .await
            .context("Failed to query processed search term")?;

        Ok(row.is_some())
    }

    /// Append-only: a term already in the ledger is left untouched
    pub async fn mark_processed(&self, term: &str) -> Result<()> {
        let active = processed_searches::ActiveModel {
            search_term: Set(term.to_string()),
            processed_at: Set(chrono::Utc::now().to_rfc3339()),
        };

        processed_searches::Entity::insert(active)
            .on_conflict(
                OnConflict::column(processed_searches::Column::SearchTerm)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await
            .context("Failed to record processed search term")?;

        Ok(())
    }

    pub async fn count(&self) -> Result<u64> {
        processed_searches::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count processed search terms")
    }
}
