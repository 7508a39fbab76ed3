use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::SchedulerConfig;
use crate::services::monitoring;
use crate::state::SharedState;

pub struct Scheduler {
    state: Arc<SharedState>,
    config: SchedulerConfig,
    running: Arc<RwLock<bool>>,
}

impl Scheduler {
    #[must_use]
    pub fn new(state: Arc<SharedState>, config: SchedulerConfig) -> Self {
        Self {
            state,
            config,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Runs until [`Scheduler::stop`] is called.
    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("Scheduler is disabled in config");
            return Ok(());
        }

        *self.running.write().await = true;
        info!("Starting background scheduler");

        let mut sched = JobScheduler::new().await?;

        let state_for_stats = Arc::clone(&self.state);
        let stats_job = Job::new_async(self.config.stats_cron.as_str(), move |_uuid, _lock| {
            let state = Arc::clone(&state_for_stats);
            Box::pin(async move {
                if let Err(e) = log_table_stats(&state).await {
                    error!(event = "job_failed", job_name = "table_stats", error = %e, "Table statistics job failed");
                }
            })
        })?;

        let state_for_scrape = Arc::clone(&self.state);
        let running = Arc::clone(&self.running);
        let scrape_job = Job::new_async(self.config.scrape_cron.as_str(), move |_uuid, _lock| {
            let state = Arc::clone(&state_for_scrape);
            let running = Arc::clone(&running);
            Box::pin(async move {
                if !*running.read().await {
                    return;
                }
                let start = std::time::Instant::now();
                info!(event = "job_started", job_name = "scrape", "Starting scheduled scrape");

                match state.scraper.run().await {
                    Ok(report) => info!(
                        event = "job_finished",
                        job_name = "scrape",
                        scraped = report.scraped,
                        duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                        "Scheduled scrape finished"
                    ),
                    Err(e) => {
                        error!(event = "job_failed", job_name = "scrape", error = %e, "Scheduled scrape failed");
                    }
                }
            })
        })?;

        let cpu_job = Job::new_async(self.config.cpu_cron.as_str(), |_uuid, _lock| {
            Box::pin(async move {
                monitoring::record_cpu_load().await;
            })
        })?;

        let domains = Arc::new(self.state.config.observability.certificate_domains.clone());
        let domains_for_job = Arc::clone(&domains);
        let certificate_job =
            Job::new_async(self.config.certificate_cron.as_str(), move |_uuid, _lock| {
                let domains = Arc::clone(&domains_for_job);
                Box::pin(async move {
                    monitoring::record_certificates(&domains).await;
                })
            })?;

        sched.add(stats_job).await?;
        sched.add(scrape_job).await?;
        sched.add(cpu_job).await?;
        sched.add(certificate_job).await?;
        sched.start().await?;

        info!("Table statistics scheduled: {}", self.config.stats_cron);
        info!("Scrape scheduled: {}", self.config.scrape_cron);
        info!("CPU sampling scheduled: {}", self.config.cpu_cron);
        info!(
            "Certificate checks scheduled: {} for {:?}",
            self.config.certificate_cron, domains
        );

        // Gauges are populated right away instead of waiting for the first tick
        tokio::spawn(async move {
            monitoring::record_certificates(&domains).await;
        });

        loop {
            if !*self.running.read().await {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        sched.shutdown().await?;
        Ok(())
    }

    pub async fn stop(&self) {
        *self.running.write().await = false;
    }
}

async fn log_table_stats(state: &SharedState) -> Result<()> {
    let users = state.store.count_users().await?;
    let pages = state.store.count_pages().await?;
    let processed = state.store.count_processed_terms().await?;

    info!(
        event = "table_stats",
        users, pages, processed_searches = processed, "Table statistics"
    );
    Ok(())
}
