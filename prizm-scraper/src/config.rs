//! Scraper configuration.

use serde::{Deserialize, Serialize};

/// Default WebDriver endpoint (chromedriver's standalone port).
const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

/// The one site this collaborator knows how to read.
const DEFAULT_SITE_URL: &str = "https://prizm.environicsanalytics.com/en-ca";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

/// Configuration for the WebDriver session and page waits.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// WebDriver endpoint URL.
    pub webdriver_url: String,
    /// PRIZM site URL to drive.
    pub site_url: String,
    /// Whether to run the browser headless.
    pub headless: bool,
    /// Wait bound for the results panel to render, in seconds.
    pub page_timeout_secs: u64,
    /// Wait bound per selector when locating an element, in seconds.
    pub element_timeout_secs: u64,
    /// User agent presented to the site.
    pub user_agent: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            webdriver_url: DEFAULT_WEBDRIVER_URL.into(),
            site_url: DEFAULT_SITE_URL.into(),
            headless: true,
            page_timeout_secs: 15,
            element_timeout_secs: 5,
            user_agent: DEFAULT_USER_AGENT.into(),
        }
    }
}

impl ScraperConfig {
    /// Creates a config pointed at the given WebDriver endpoint.
    pub fn new(webdriver_url: impl Into<String>) -> Self {
        Self {
            webdriver_url: webdriver_url.into(),
            ..Default::default()
        }
    }

    /// Loads configuration from the environment (and `.env` if present).
    ///
    /// Recognized variables: `PRIZM_WEBDRIVER_URL`, `PRIZM_SITE_URL`,
    /// `PRIZM_HEADLESS`, `PRIZM_PAGE_TIMEOUT_SECS`,
    /// `PRIZM_ELEMENT_TIMEOUT_SECS`, `PRIZM_USER_AGENT`.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        Self {
            webdriver_url: std::env::var("PRIZM_WEBDRIVER_URL")
                .unwrap_or(defaults.webdriver_url),
            site_url: std::env::var("PRIZM_SITE_URL").unwrap_or(defaults.site_url),
            headless: std::env::var("PRIZM_HEADLESS")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            page_timeout_secs: std::env::var("PRIZM_PAGE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.page_timeout_secs),
            element_timeout_secs: std::env::var("PRIZM_ELEMENT_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.element_timeout_secs),
            user_agent: std::env::var("PRIZM_USER_AGENT").unwrap_or(defaults.user_agent),
        }
    }

    /// Disables headless mode (shows the browser window).
    pub fn windowed(mut self) -> Self {
        self.headless = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_points_at_chromedriver() {
        let config = ScraperConfig::default();
        assert_eq!(config.webdriver_url, "http://localhost:9515");
        assert!(config.headless);
        assert!(config.page_timeout_secs >= config.element_timeout_secs);
    }

    #[test]
    fn test_builder() {
        let config = ScraperConfig::new("http://localhost:4444").windowed();
        assert_eq!(config.webdriver_url, "http://localhost:4444");
        assert!(!config.headless);
    }
}
