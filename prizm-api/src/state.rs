//! App state: the lookup service and API configuration.

use std::path::PathBuf;

use prizm_core::MAX_BATCH_CODES;
use prizm_lookup::LookupService;

/// Default on-disk location of the cache database.
const DEFAULT_CACHE_PATH: &str = "prizm_cache.db";

/// API surface configuration.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Where the cache database lives (used by the binary to open it).
    pub cache_path: PathBuf,
    /// Upper bound on postal codes per batch request.
    pub max_batch: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cache_path: DEFAULT_CACHE_PATH.into(),
            max_batch: MAX_BATCH_CODES,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from the environment (and `.env` if present).
    ///
    /// Recognized variables: `PRIZM_CACHE_PATH`, `PRIZM_MAX_BATCH`.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        Self {
            cache_path: std::env::var("PRIZM_CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_path),
            max_batch: std::env::var("PRIZM_MAX_BATCH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_batch),
        }
    }
}

/// Shared state handed to every handler.
pub struct AppState {
    /// API configuration.
    pub config: ApiConfig,
    /// The orchestrator; also exposes the cache for admin pass-throughs.
    pub service: LookupService,
}

impl AppState {
    /// Bundles configuration and service.
    pub fn new(config: ApiConfig, service: LookupService) -> Self {
        Self { config, service }
    }
}
