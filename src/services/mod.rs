pub mod credentials;

pub mod session;
pub use session::{SessionMediator, SessionTracker, SessionUser};

pub mod reset_gate;
pub use reset_gate::{ResetGate, ResetState};

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, PasswordReset, Registration};
pub use auth_service_impl::SeaOrmAuthService;

pub mod search;
pub mod search_log;
pub use search::{PageResult, SearchBackend, SearchService};

pub mod scraper;
pub use scraper::{ScrapeReport, Scraper};

pub mod weather;
pub use weather::{WeatherReport, WeatherService};

pub mod monitoring;

pub mod scheduler;
pub use scheduler::Scheduler;
