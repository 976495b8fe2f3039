//! # PRIZM Scraper
//!
//! The external lookup collaborator: drives a headless browser through a
//! WebDriver endpoint to pull a segment record off the PRIZM site.
//!
//! Everything in here is integration glue tied to one site's markup. The
//! rest of the workspace only sees the narrow
//! [`SegmentSource`](prizm_core::SegmentSource) trait; the selector
//! fallback chains and page heuristics stay behind it.
//!
//! The browser session is an explicitly owned handle: acquired with
//! [`PrizmScraper::connect`], released with [`PrizmScraper::close`]. One
//! session supports one navigation at a time, so callers serialize access.
//!
//! ## Example
//!
//! ```rust,ignore
//! use prizm_scraper::{PrizmScraper, ScraperConfig};
//!
//! let scraper = PrizmScraper::connect(ScraperConfig::from_env()).await?;
//! let outcome = scraper.fetch(&"V8A 2P4".parse()?).await?;
//! scraper.close().await;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod config;
mod scraper;

pub use config::ScraperConfig;
pub use scraper::PrizmScraper;
