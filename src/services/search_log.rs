//! Append-only audit log of search queries.
//!
//! The scraper mines this file for new terms, so the line format is stable:
//! `SEARCH: <timestamp> query="<query>" from=<caller>`.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

pub struct SearchLog {
    path: Option<PathBuf>,
    file: Mutex<Option<File>>,
}

impl SearchLog {
    /// Opens the log for appending, falling back to stdout when the file
    /// cannot be opened.
    pub async fn open(path: &Path) -> Self {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.ok();
        }

        match OpenOptions::new().create(true).append(true).open(path).await {
            Ok(file) => Self {
                path: Some(path.to_path_buf()),
                file: Mutex::new(Some(file)),
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot open search log, writing to stdout");
                Self::stdout()
            }
        }
    }

    #[must_use]
    pub fn stdout() -> Self {
        Self {
            path: None,
            file: Mutex::new(None),
        }
    }

    /// Path of the backing file, `None` when logging to stdout.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn record(&self, query: &str, caller: &str) -> Result<()> {
        let line = format_entry(&chrono::Local::now(), query, caller);

        let mut guard = self.file.lock().await;
        match guard.as_mut() {
            Some(file) => {
                file.write_all(line.as_bytes()).await?;
                file.flush().await?;
            }
            None => print!("{line}"),
        }
        Ok(())
    }
}

fn format_entry<Tz>(at: &chrono::DateTime<Tz>, query: &str, caller: &str) -> String
where
    Tz: chrono::TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!(
        "SEARCH: {} query={query:?} from={caller}\n",
        at.format("%Y/%m/%d %H:%M:%S")
    )
}
