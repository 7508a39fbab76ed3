use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tracing::info;

/// Session secret shipped in old `.env` templates. Refused at startup.
pub const INSECURE_SESSION_SECRET: &str = "Very-secret-key";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub database: DatabaseConfig,

    pub session: SessionConfig,

    pub search: SearchConfig,

    pub scraper: ScraperConfig,

    pub weather: WeatherConfig,

    pub scheduler: SchedulerConfig,

    pub observability: ObservabilityConfig,

    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    /// Number of tokio worker threads (default: 0 = number of CPU cores)
    pub worker_threads: usize,

    /// Directory served under `/static/`
    pub static_path: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            worker_threads: 0,
            static_path: "static".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    /// Whether to set the Secure flag on session cookies.
    /// Set to false for local development without HTTPS.
    pub secure_cookies: bool,

    /// Reverse proxies whose `X-Forwarded-For` header is believed.
    /// Empty means the peer address is always used.
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            secure_cookies: true,
            trusted_proxies: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Full connection URL. Takes precedence over the discrete fields below.
    pub url: Option<String>,

    pub host: Option<String>,

    pub port: Option<u16>,

    pub user: Option<String>,

    pub password: Option<String>,

    pub name: Option<String>,

    pub max_connections: u32,

    pub min_connections: u32,

    /// Attempts made for the initial connection before giving up
    pub connect_retries: u32,

    pub connect_retry_delay_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: None,
            port: None,
            user: None,
            password: None,
            name: None,
            max_connections: 5,
            min_connections: 1,
            connect_retries: 10,
            connect_retry_delay_seconds: 5,
        }
    }
}

impl DatabaseConfig {
    pub const DEFAULT_SQLITE_URL: &str = "sqlite:data/gosearch.db";

    /// Resolves the connection URL.
    ///
    /// Discrete host/user/name settings win over `url` so that a container
    /// environment can override a file-provided DSN piece by piece.
    #[must_use]
    pub fn connection_url(&self) -> String {
        if let (Some(host), Some(user), Some(name)) = (&self.host, &self.user, &self.name)
            && !host.is_empty()
            && !user.is_empty()
            && !name.is_empty()
        {
            let port = self.port.unwrap_or(5432);
            let password = self.password.as_deref().unwrap_or_default();
            return format!(
                "postgres://{}:{}@{}:{}/{}",
                urlencoding::encode(user),
                urlencoding::encode(password),
                host,
                port,
                name
            );
        }

        match &self.url {
            Some(url) if !url.is_empty() => normalize_dsn(url),
            _ => Self::DEFAULT_SQLITE_URL.to_string(),
        }
    }
}

/// Accepts both URL-style DSNs and libpq keyword strings
/// (`host=db port=5432 user=app password=x dbname=app sslmode=disable`).
fn normalize_dsn(dsn: &str) -> String {
    if dsn.contains("://") || dsn.starts_with("sqlite:") {
        return dsn.to_string();
    }

    let mut host = "localhost";
    let mut port = "5432";
    let mut user = "";
    let mut password = "";
    let mut dbname = "";
    let mut params = Vec::new();

    for pair in dsn.split_whitespace() {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        match key {
            "host" => host = value,
            "port" => port = value,
            "user" => user = value,
            "password" => password = value,
            "dbname" => dbname = value,
            _ => params.push(format!("{key}={value}")),
        }
    }

    let mut url = format!(
        "postgres://{}:{}@{}:{}/{}",
        urlencoding::encode(user),
        urlencoding::encode(password),
        host,
        port,
        dbname
    );
    if !params.is_empty() {
        url.push('?');
        url.push_str(&params.join("&"));
    }
    url
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Secret used to sign session cookies. Required.
    #[serde(skip_serializing)]
    pub secret: String,

    pub cookie_name: String,

    pub max_age_days: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            cookie_name: "gosearch_session".to_string(),
            max_age_days: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Elasticsearch base URL. When unset, search runs against the database.
    pub elasticsearch_url: Option<String>,

    pub elasticsearch_username: Option<String>,

    #[serde(skip_serializing)]
    pub elasticsearch_password: Option<String>,

    pub index_name: String,

    /// Audit log of every search query. Falls back to stdout when unwritable.
    pub log_path: String,

    pub request_timeout_seconds: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            elasticsearch_url: None,
            elasticsearch_username: None,
            elasticsearch_password: None,
            index_name: "pages".to_string(),
            log_path: "search.log".to_string(),
            request_timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub wikipedia_base_url: String,

    pub language: String,

    pub request_timeout_seconds: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            wikipedia_base_url: "https://da.wikipedia.org/wiki/".to_string(),
            language: "da".to_string(),
            request_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    pub base_url: String,

    pub default_city: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openweathermap.org/data/2.5/weather".to_string(),
            default_city: "din valgte by".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,

    /// Cron expression (with seconds) for the table statistics job
    pub stats_cron: String,

    /// Cron expression (with seconds) for the Wikipedia ingestion job
    pub scrape_cron: String,

    /// Cron expression (with seconds) for the CPU load sample
    pub cpu_cron: String,

    /// Cron expression (with seconds) for the TLS certificate check
    pub certificate_cron: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stats_cron: "0 */1 * * * *".to_string(),
            scrape_cron: "0 */5 * * * *".to_string(),
            cpu_cron: "*/30 * * * * *".to_string(),
            certificate_cron: "0 0 * * * *".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    /// Domains whose TLS certificate is checked on port 443
    pub certificate_domains: Vec<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            certificate_domains: vec!["gosearch.dk".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    pub argon2_parallelism: u32,

    /// Minimum length for a new password on reset
    pub min_password_length: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            min_password_length: 8,
        }
    }
}

impl Config {
    /// Loads `.env` files, the first config file found, then applies
    /// environment overrides.
    pub fn load() -> Result<Self> {
        // Runs before tracing is set up, so nothing here logs
        if dotenvy::from_filename(".env.local").is_err() {
            dotenvy::dotenv().ok();
        }

        let mut config = Self::load_file()?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        Self::find_config_file()
            .map_or_else(|| Ok(Self::default()), |path| Self::load_from_path(&path))
    }

    /// First existing file among the config search paths.
    #[must_use]
    pub fn find_config_file() -> Option<PathBuf> {
        Self::config_paths().into_iter().find(|path| path.exists())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Applies environment overrides through `lookup` so tests can feed a map.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("DATABASE_URL").or_else(|| non_empty("CONN_STR")) {
            self.database.url = Some(url);
        }
        if let Some(host) = non_empty("DB_HOST") {
            self.database.host = Some(host);
        }
        if let Some(port) = non_empty("DB_PORT").and_then(|p| p.parse().ok()) {
            self.database.port = Some(port);
        }
        if let Some(user) = non_empty("DB_USER") {
            self.database.user = Some(user);
        }
        if let Some(password) = lookup("DB_PASSWORD") {
            self.database.password = Some(password);
        }
        if let Some(name) = non_empty("DB_NAME") {
            self.database.name = Some(name);
        }

        if let Some(secret) = lookup("SESSION_SECRET") {
            self.session.secret = secret;
        }

        if let Some(url) = non_empty("ELASTICSEARCH_URL") {
            self.search.elasticsearch_url = Some(url);
        }
        if let Some(user) = non_empty("ELASTICSEARCH_USERNAME") {
            self.search.elasticsearch_username = Some(user);
        }
        if let Some(password) = non_empty("ELASTICSEARCH_PASSWORD") {
            self.search.elasticsearch_password = Some(password);
        }
        if let Some(path) = non_empty("SEARCH_LOG_PATH") {
            self.search.log_path = path;
        }

        if let Some(key) = non_empty("WEATHER_API_KEY") {
            self.weather.api_key = Some(key);
        }
        if let Some(path) = non_empty("STATIC_PATH") {
            self.general.static_path = path;
        }
        if let Some(port) = non_empty("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(proxies) = non_empty("TRUSTED_PROXIES") {
            self.server.trusted_proxies = proxies
                .split(',')
                .filter_map(|p| p.trim().parse().ok())
                .collect();
        }
        if let Some(domains) = non_empty("CERTIFICATE_DOMAINS") {
            self.observability.certificate_domains = domains
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .collect();
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("gosearch").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".gosearch").join("config.toml"));
        }

        paths
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = PathBuf::from("config.toml");
        if path.exists() {
            Ok(false)
        } else {
            Self::default().save_to_path(&path)?;
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        let secret = self.session.secret.trim();
        if secret.is_empty() || secret == INSECURE_SESSION_SECRET {
            anyhow::bail!(
                "SESSION_SECRET is not set or insecure. Please set a strong SESSION_SECRET in your environment."
            );
        }

        if self.scheduler.enabled
            && [
                &self.scheduler.stats_cron,
                &self.scheduler.scrape_cron,
                &self.scheduler.cpu_cron,
                &self.scheduler.certificate_cron,
            ]
            .iter()
            .any(|cron| cron.trim().is_empty())
        {
            anyhow::bail!("Scheduler cron expressions cannot be empty when enabled");
        }

        if self.security.min_password_length == 0 {
            anyhow::bail!("security.min_password_length must be > 0");
        }

        Ok(())
    }
}
