//! Logging facade for the Geia normalization tools.
//!
//! # Setup
//!
//! To enable logging, invoke the [`init`] function with a [`LogConfig`]. The configuration
//! implements `serde` traits, so it can be obtained from configuration files. Initialization
//! requires the `init` feature.
//!
//! ```
//! use geia_log::{Level, LogConfig};
//!
//! let config = LogConfig {
//!     level: Level::Debug,
//!     ..LogConfig::default()
//! };
//! # let _ = config;
//! ```
//!
//! # Logging
//!
//! Logging goes through the five macros [`error!`], [`warn!`], [`info!`], [`debug!`] and
//! [`trace!`], re-exported from `tracing`. They accept structured fields before the message.
//!
//! ## Conventions
//!
//! Log messages should start lowercase and end without punctuation. Prefer short and precise log
//! messages over verbose text. Choose the log level according to these rules:
//!
//! - [`error!`] for bugs and invalid behavior.
//! - [`warn!`] for undesirable behavior.
//! - [`info!`] for messages relevant to the average user.
//! - [`debug!`] for messages usually relevant to debugging.
//! - [`trace!`] for full auxiliary information, such as single records.
//!
//! ## Examples
//!
//! ```
//! geia_log::info!(records = 12, "normalized column");
//! ```
//!
//! ## Logging Error Types
//!
//! To log errors with their full chain of causes, use the [`LogError`] wrapper.
//!
//! ```
//! use std::io::{Error, ErrorKind};
//! use geia_log::LogError;
//!
//! let custom_error = Error::new(ErrorKind::Other, "oh no!");
//! geia_log::error!("operation failed: {}", LogError(&custom_error));
//! ```
//!
//! # Testing
//!
//! For unit testing, there is a separate initialization macro [`init_test!`] that should be called
//! at the beginning of test method. It enables test mode of the logger and customizes log levels
//! for the current crate. It requires the `test` feature.
//!
//! ```ignore
//! #[test]
//! fn test_something() {
//!     geia_log::init_test!();
//! }
//! ```

#![warn(missing_docs)]

mod setup;
pub use setup::*;

#[cfg(feature = "test")]
mod test;
#[cfg(feature = "test")]
pub use test::*;

mod utils;
pub use utils::*;

// Expose the minimal log facade.
#[doc(inline)]
pub use tracing::{debug, error, info, trace, warn};
