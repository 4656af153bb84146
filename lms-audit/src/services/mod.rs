//! Data source clients and the audit orchestrator
//!
//! One module per external dependency, each normalizing its source into a
//! fixed-shape record without ever failing, plus the orchestrator that
//! fans the three out and scores the combined snapshot.

pub mod browser;
pub mod crux;
pub mod orchestrator;
pub mod pagespeed;

pub use browser::{BrowserCheckError, BrowserCheckRunner};
pub use crux::{CruxClient, CruxError};
pub use orchestrator::{collect_metrics, run_full_audit};
pub use pagespeed::{PageSpeedClient, PageSpeedError};
