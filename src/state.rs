use std::sync::Arc;
use std::time::Duration;

use crate::clients::wikipedia::WikipediaClient;
use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AuthService, ResetGate, Scraper, SeaOrmAuthService, SearchService, SessionMediator,
    WeatherService,
};

/// Build a shared HTTP client with reasonable defaults for outbound calls.
fn build_shared_http_client(timeout_seconds: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .user_agent(concat!("gosearch/", env!("CARGO_PKG_VERSION")))
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub sessions: Arc<SessionMediator>,

    pub reset_gate: ResetGate,

    pub auth_service: Arc<dyn AuthService>,

    pub search_service: Arc<SearchService>,

    pub weather_service: Arc<WeatherService>,

    pub scraper: Arc<Scraper>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::connect(&config.database).await?;

        let reset_gate = ResetGate::new(store.clone());
        reset_gate.verify_schema().await?;

        let http_client = build_shared_http_client(config.search.request_timeout_seconds)?;
        let scraper_client = build_shared_http_client(config.scraper.request_timeout_seconds)?;

        let search_service = Arc::new(
            SearchService::from_config(&config.search, store.clone(), http_client.clone()).await,
        );

        let wikipedia = WikipediaClient::new(scraper_client, &config.scraper.wikipedia_base_url)?;
        let scraper = Arc::new(Scraper::new(
            store.clone(),
            wikipedia,
            Arc::clone(&search_service),
            std::path::Path::new(&config.search.log_path),
            &config.scraper.language,
        ));

        let auth_service: Arc<dyn AuthService> = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            config.security.clone(),
        ));

        let weather_service = Arc::new(WeatherService::new(&config.weather, http_client));

        Ok(Self {
            config: Arc::new(config),
            store,
            sessions: Arc::new(SessionMediator::new()),
            reset_gate,
            auth_service,
            search_service,
            weather_service,
            scraper,
        })
    }
}
