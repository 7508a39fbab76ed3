use anyhow::{Context, Result};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::DatabaseConfig;

pub mod migrator;
pub mod repositories;

pub use repositories::page::{NewPage, Page};
pub use repositories::user::{Existence, NewUser, User, UserInsert};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    /// Connects using the database section of the config, retrying the
    /// initial connection a bounded number of times.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let db_url = config.connection_url();
        let attempts = config.connect_retries.max(1);
        let delay = Duration::from_secs(config.connect_retry_delay_seconds);

        let mut attempt = 1;
        let conn = loop {
            match Self::open(&db_url, config.max_connections, config.min_connections).await {
                Ok(conn) => break conn,
                Err(e) if attempt < attempts => {
                    warn!(
                        attempt,
                        attempts,
                        error = %e,
                        "Database connection failed, retrying in {}s",
                        delay.as_secs()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(e.context(format!(
                        "Failed to connect to database after {attempts} attempts"
                    )));
                }
            }
        };

        Self::migrate(conn, config.min_connections, config.max_connections).await
    }

    async fn open(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<DatabaseConnection> {
        if let Some(path_str) = sqlite_file_path(db_url) {
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)
                    .with_context(|| format!("Failed to create database file {path_str}"))?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;
        Ok(conn)
    }

    async fn migrate(
        conn: DatabaseConnection,
        min_connections: u32,
        max_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        migrator::Migrator::up(&conn, None)
            .await
            .context("Failed to apply database migrations")?;

        info!(
            backend = ?conn.get_database_backend(),
            "Database connected & migrations applied (pool: {}-{})",
            min_connections,
            max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn page_repo(&self) -> repositories::page::PageRepository {
        repositories::page::PageRepository::new(self.conn.clone())
    }

    fn processed_search_repo(
        &self,
    ) -> repositories::processed_search::ProcessedSearchRepository {
        repositories::processed_search::ProcessedSearchRepository::new(self.conn.clone())
    }

    // Users

    pub async fn get_user_with_password(&self, username: &str) -> Result<Option<(User, String)>> {
        self.user_repo().get_by_username_with_password(username).await
    }

    pub async fn get_password_hash(&self, user_id: i32) -> Result<Option<String>> {
        self.user_repo().get_password_hash(user_id).await
    }

    pub async fn username_or_email_exists(&self, username: &str, email: &str) -> Result<Existence> {
        self.user_repo().username_or_email_exists(username, email).await
    }

    pub async fn create_user(&self, user: NewUser) -> Result<UserInsert> {
        self.user_repo().create(user).await
    }

    pub async fn update_password(&self, user_id: i32, password_hash: String) -> Result<()> {
        self.user_repo().update_password(user_id, password_hash).await
    }

    pub async fn password_changed(&self, user_id: i32) -> Result<Option<bool>> {
        self.user_repo().password_changed(user_id).await
    }

    pub async fn force_password_reset_all(&self) -> Result<u64> {
        self.user_repo().force_reset_all().await
    }

    pub async fn count_users(&self) -> Result<u64> {
        self.user_repo().count().await
    }

    // Pages

    pub async fn upsert_page(&self, page: NewPage) -> Result<()> {
        self.page_repo().upsert(page).await
    }

    pub async fn search_pages(&self, query: &str) -> Result<Vec<Page>> {
        self.page_repo().search_content(query).await
    }

    pub async fn list_pages(&self) -> Result<Vec<Page>> {
        self.page_repo().list_all().await
    }

    pub async fn count_pages(&self) -> Result<u64> {
        self.page_repo().count().await
    }

    // Processed search ledger

    pub async fn is_term_processed(&self, term: &str) -> Result<bool> {
        self.processed_search_repo().is_processed(term).await
    }

    pub async fn mark_term_processed(&self, term: &str) -> Result<()> {
        self.processed_search_repo().mark_processed(term).await
    }

    pub async fn count_processed_terms(&self) -> Result<u64> {
        self.processed_search_repo().count().await
    }
}

/// Returns the on-disk path for file-backed SQLite URLs.
fn sqlite_file_path(db_url: &str) -> Option<&str> {
    let rest = db_url
        .strip_prefix("sqlite://")
        .or_else(|| db_url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);

    if path.is_empty() || path.contains(":memory:") {
        None
    } else {
        Some(path)
    }
}
