use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{ConnectionTrait, DatabaseBackend};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("idx_pages_language")
                    .table(Pages::Table)
                    .col(Pages::Language)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Full-text indexes only exist on PostgreSQL
        if manager.get_database_backend() == DatabaseBackend::Postgres {
            let db = manager.get_connection();
            db.execute_unprepared(
                "CREATE INDEX IF NOT EXISTS idx_pages_title_fts ON pages USING GIN (to_tsvector('simple', title))",
            )
            .await?;
            db.execute_unprepared(
                "CREATE INDEX IF NOT EXISTS idx_pages_content_fts ON pages USING GIN (to_tsvector('simple', content))",
            )
            .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        if manager.get_database_backend() == DatabaseBackend::Postgres {
            let db = manager.get_connection();
            db.execute_unprepared("DROP INDEX IF EXISTS idx_pages_content_fts")
                .await?;
            db.execute_unprepared("DROP INDEX IF EXISTS idx_pages_title_fts")
                .await?;
        }

        manager
            .drop_index(
                Index::drop()
                    .name("idx_pages_language")
                    .table(Pages::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum Pages {
    Table,
    Language,
}
