//! WebDriver session and page heuristics for the PRIZM site.
//!
//! The site is a React app with markup that has shifted across redesigns,
//! so every element is located through a fallback chain of selectors, most
//! specific first. A fetch never raises for page-level trouble; it reports
//! [`FetchOutcome::Failed`] and lets the orchestrator decide retention.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::{Client, ClientBuilder, Locator};
use regex::Regex;
use tracing::{debug, info, warn};

use prizm_core::error::{PrizmError, Result};
use prizm_core::{FetchOutcome, PostalCode, SegmentRecord, SegmentSource};

use crate::config::ScraperConfig;

/// A selector candidate in a fallback chain.
enum Sel {
    Css(&'static str),
    XPath(&'static str),
}

impl Sel {
    fn locator(&self) -> Locator<'static> {
        match self {
            Sel::Css(s) => Locator::Css(s),
            Sel::XPath(s) => Locator::XPath(s),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Sel::Css(s) | Sel::XPath(s) => s,
        }
    }
}

const SEARCH_FIELD: &[Sel] = &[
    Sel::Css(".postal-lookup-field--hero"),
    Sel::Css("input[type='search']"),
    Sel::XPath("//input[@type='text']"),
];

const SEARCH_BUTTON: &[Sel] = &[
    Sel::Css("button.primary-cta[aria-label='Search']"),
    Sel::XPath("//button[contains(text(), 'SEARCH')]"),
];

/// The element whose presence means the results panel rendered.
const SEGMENT_NUMBER: &str = ".segment-details__number";

const SEGMENT_HEADINGS: &[Sel] = &[
    Sel::Css(".segment-details__name"),
    Sel::Css(".segment-name"),
    Sel::Css(".segment-title"),
    Sel::Css(".profile-segment h1"),
    Sel::Css(".profile-segment h2"),
    Sel::Css(".segment-details h1"),
    Sel::Css(".segment-details h2"),
];

const HOUSEHOLD_INCOME: &[Sel] = &[
    Sel::XPath(
        "//div[contains(@class, 'react-tabs__tab-item__title') and \
         contains(text(), 'Average Household Income')]/following-sibling::p[1]",
    ),
    Sel::XPath("//div[contains(text(), 'Average Household Income')]/following-sibling::p[1]"),
];

const RESIDENCY: &[Sel] = &[
    Sel::XPath(
        "//div[contains(@class, 'react-tabs__tab-item__title') and \
         contains(text(), 'Residency')]/following-sibling::p[1]",
    ),
    Sel::XPath("//div[contains(text(), 'Residency')]/following-sibling::p[1]"),
];

const HOME_TYPE: &[Sel] = &[
    Sel::XPath(
        "//div[contains(@class, 'react-tabs__tab-item__title') and \
         contains(text(), 'Home Type')]/following-sibling::p[1]",
    ),
    Sel::XPath("//div[contains(text(), 'Home Type')]/following-sibling::p[1]"),
];

const SHORT_DESCRIPTION: &[Sel] = &[
    Sel::Css(".segment-details__short-description"),
    Sel::Css(".segment-short-description"),
];

const WHO_TEXT: &[Sel] = &[
    Sel::Css(".segment-details__slide__who__text"),
    Sel::Css(".segment-who-text"),
];

/// WebDriver-backed implementation of [`SegmentSource`].
///
/// Owns exactly one browser session. The session handle is acquired in
/// [`connect`](PrizmScraper::connect) and released in
/// [`close`](PrizmScraper::close); there is no ambient global driver.
pub struct PrizmScraper {
    client: Client,
    config: ScraperConfig,
}

impl PrizmScraper {
    /// Establishes the WebDriver session.
    ///
    /// Failure here is [`PrizmError::Infrastructure`]: without a session
    /// no lookup can be attempted, which is the one condition that aborts
    /// an in-flight batch.
    pub async fn connect(config: ScraperConfig) -> Result<Self> {
        let mut args = vec![
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-gpu".to_string(),
            "--disable-notifications".to_string(),
            "--disable-extensions".to_string(),
            "--window-size=1920,1080".to_string(),
            format!("--user-agent={}", config.user_agent),
        ];
        if config.headless {
            args.insert(0, "--headless=new".to_string());
        }

        let mut caps = serde_json::map::Map::new();
        caps.insert(
            "goog:chromeOptions".to_string(),
            serde_json::json!({ "args": args }),
        );

        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&config.webdriver_url)
            .await
            .map_err(|e| {
                PrizmError::Infrastructure(format!(
                    "failed to start WebDriver session at {}: {e}",
                    config.webdriver_url
                ))
            })?;

        info!(webdriver = %config.webdriver_url, headless = config.headless,
              "WebDriver session established");

        Ok(Self { client, config })
    }

    /// Releases the browser session.
    ///
    /// Usable through a shared handle (the client is a cloneable actor
    /// handle); any further fetch on this scraper will fail afterwards.
    pub async fn close(&self) {
        if let Err(e) = self.client.clone().close().await {
            warn!(error = %e, "WebDriver session did not close cleanly");
        } else {
            info!("WebDriver session closed");
        }
    }

    /// Waits for the first candidate selector that turns up an element.
    async fn first_present(&self, candidates: &[Sel], timeout: Duration) -> Option<Element> {
        for sel in candidates {
            match self
                .client
                .wait()
                .at_most(timeout)
                .for_element(sel.locator())
                .await
            {
                Ok(el) => {
                    debug!(selector = sel.as_str(), "Located element");
                    return Some(el);
                }
                Err(_) => continue,
            }
        }
        None
    }

    /// Returns the first non-empty text found by any candidate selector.
    async fn first_text(&self, candidates: &[Sel]) -> Option<String> {
        for sel in candidates {
            if let Ok(el) = self.client.find(sel.locator()).await {
                if let Ok(text) = el.text().await {
                    let text = text.trim().to_string();
                    if !text.is_empty() {
                        return Some(text);
                    }
                }
            }
        }
        None
    }

    async fn body_text(&self) -> String {
        match self.client.find(Locator::Css("body")).await {
            Ok(body) => body.text().await.unwrap_or_default(),
            Err(_) => String::new(),
        }
    }

    async fn extract_segment_number(&self, number_el: &Element) -> Option<String> {
        // Headings like "62 Suburban Recliners" carry the number with the
        // segment name and are the most reliable source.
        for sel in SEGMENT_HEADINGS {
            if let Ok(elems) = self.client.find_all(sel.locator()).await {
                for el in elems {
                    if let Ok(text) = el.text().await {
                        if let Some(num) = segment_number_from_heading(&text) {
                            debug!(selector = sel.as_str(), num, "Segment number from heading");
                            return Some(num);
                        }
                    }
                }
            }
        }

        // Fall back to the standalone number element.
        if let Ok(text) = number_el.text().await {
            if let Some(num) = digits_only(&text) {
                return Some(num);
            }
        }

        // Last resort: scan the page text.
        segment_number_from_body(&self.body_text().await)
    }
}

#[async_trait]
impl SegmentSource for PrizmScraper {
    async fn fetch(&self, code: &PostalCode) -> Result<FetchOutcome> {
        debug!(code = %code, "Fetching from site");

        let element_timeout = Duration::from_secs(self.config.element_timeout_secs);
        let page_timeout = Duration::from_secs(self.config.page_timeout_secs);

        if let Err(e) = self.client.goto(&self.config.site_url).await {
            warn!(error = %e, "Navigation failed");
            return Ok(FetchOutcome::Failed(format!("navigation failed: {e}")));
        }

        let Some(search_field) = self.first_present(SEARCH_FIELD, element_timeout).await else {
            warn!("Search field not found with any selector");
            return Ok(FetchOutcome::Failed("search field not found".into()));
        };

        if let Err(e) = search_field.clear().await {
            return Ok(FetchOutcome::Failed(format!(
                "could not clear search field: {e}"
            )));
        }
        if let Err(e) = search_field.send_keys(code.as_str()).await {
            return Ok(FetchOutcome::Failed(format!(
                "could not enter postal code: {e}"
            )));
        }

        let Some(button) = self.first_present(SEARCH_BUTTON, element_timeout).await else {
            warn!("Search button not found with any selector");
            return Ok(FetchOutcome::Failed("search button not found".into()));
        };

        if let Err(e) = button.click().await {
            // Overlays sometimes intercept the click; Enter submits too.
            debug!(error = %e, "Click intercepted, submitting with Enter");
            if let Err(e) = search_field.send_keys("\u{E007}").await {
                return Ok(FetchOutcome::Failed(format!(
                    "could not submit search: {e}"
                )));
            }
        }

        let number_el = match self
            .client
            .wait()
            .at_most(page_timeout)
            .for_element(Locator::Css(SEGMENT_NUMBER))
            .await
        {
            Ok(el) => el,
            Err(_) => {
                let body = self.body_text().await;
                return if looks_unassigned(&body) {
                    info!(code = %code, "Site reports no segment for this code");
                    Ok(FetchOutcome::NotAssigned)
                } else {
                    warn!(code = %code, "Results panel did not render");
                    Ok(FetchOutcome::Failed(
                        "results panel did not render; the site structure may have changed".into(),
                    ))
                };
            }
        };

        let Some(segment_number) = self.extract_segment_number(&number_el).await else {
            warn!(code = %code, "Results rendered but no segment number extracted");
            return Ok(FetchOutcome::Failed(
                "could not extract segment number from results".into(),
            ));
        };

        let household_income = self.first_text(HOUSEHOLD_INCOME).await;
        let residency = self.first_text(RESIDENCY).await;
        let home_type = self.first_text(HOME_TYPE).await;
        let short_desc = self.first_text(SHORT_DESCRIPTION).await;
        let who_text = self.first_text(WHO_TEXT).await;

        let record = SegmentRecord {
            segment_number,
            household_income,
            residency_home_type: join_pair(residency, home_type),
            segment_description: join_pair(short_desc, who_text),
        };

        info!(code = %code, segment = %record.segment_number, "Fetched segment record");
        Ok(FetchOutcome::Found(record))
    }
}

/// Extracts the leading number from a heading like `"62 Suburban Recliners"`.
fn segment_number_from_heading(text: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^\s*(\d+)\s+\S").expect("valid regex"));
    re.captures(text).map(|c| c[1].to_string())
}

/// Keeps only digits, for the standalone number element.
fn digits_only(text: &str) -> Option<String> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    (!digits.is_empty()).then_some(digits)
}

/// Scans free page text for `"Segment NN"` / `"PRIZM Segment NN"`.
fn segment_number_from_body(body: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?:PRIZM\s+)?Segment\s+(\d+)").expect("valid regex"));
    re.captures(body).map(|c| c[1].to_string())
}

/// Whether the page text reads as a definitive "no segment" verdict rather
/// than a broken render.
fn looks_unassigned(body: &str) -> bool {
    let lower = body.to_lowercase();
    ["no results", "could not be found", "no segment", "not found"]
        .iter()
        .any(|marker| lower.contains(marker))
}

/// Joins two optional display strings with the site's `" | "` convention.
fn join_pair(a: Option<String>, b: Option<String>) -> Option<String> {
    match (a, b) {
        (Some(a), Some(b)) => Some(format!("{a} | {b}")),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_number_from_heading() {
        assert_eq!(
            segment_number_from_heading("62 Suburban Recliners"),
            Some("62".to_string())
        );
        assert_eq!(
            segment_number_from_heading("  07 Mid-City Mellow"),
            Some("07".to_string())
        );
        assert_eq!(segment_number_from_heading("Suburban Recliners"), None);
        assert_eq!(segment_number_from_heading("62"), None);
        assert_eq!(segment_number_from_heading(""), None);
    }

    #[test]
    fn test_digits_only() {
        assert_eq!(digits_only("Segment #62"), Some("62".to_string()));
        assert_eq!(digits_only("62"), Some("62".to_string()));
        assert_eq!(digits_only("no digits"), None);
    }

    #[test]
    fn test_segment_number_from_body() {
        assert_eq!(
            segment_number_from_body("Your area is PRIZM Segment 62, Suburban Recliners"),
            Some("62".to_string())
        );
        assert_eq!(
            segment_number_from_body("Welcome to Segment 7"),
            Some("7".to_string())
        );
        assert_eq!(segment_number_from_body("nothing relevant"), None);
    }

    #[test]
    fn test_looks_unassigned() {
        assert!(looks_unassigned("Sorry, no results for that postal code"));
        assert!(looks_unassigned("The postal code could not be found"));
        assert!(!looks_unassigned("62 Suburban Recliners"));
        assert!(!looks_unassigned(""));
    }

    #[test]
    fn test_join_pair() {
        assert_eq!(
            join_pair(Some("Own & Rent".into()), Some("Single Detached".into())),
            Some("Own & Rent | Single Detached".to_string())
        );
        assert_eq!(
            join_pair(Some("Own & Rent".into()), None),
            Some("Own & Rent".to_string())
        );
        assert_eq!(join_pair(None, None), None);
    }
}
