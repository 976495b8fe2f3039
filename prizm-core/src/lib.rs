//! # PRIZM Core
//!
//! Core types, errors, and traits for the PRIZM postal-code lookup service.
//!
//! This crate provides the foundational building blocks used by all other
//! crates in the workspace:
//!
//! - **Types**: Domain models for postal codes, segment records, and lookup
//!   results
//! - **Errors**: Comprehensive error types with context
//! - **Constants**: Cache retention and batch limits
//! - **Traits**: The [`SegmentSource`] seam behind which the browser-driven
//!   lookup lives
//!
//! ## Example
//!
//! ```rust
//! use prizm_core::PostalCode;
//!
//! let code = PostalCode::parse("v8a 2p4").unwrap();
//! assert_eq!(code.as_str(), "V8A 2P4");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{PrizmError, Result};
pub use traits::*;
pub use types::*;
