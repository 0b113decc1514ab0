//! Release drift detection.
//!
//! A snapshot of deployment records flows through [`dedupe`], [`baseline`]
//! and [`detector`]; [`report`] shapes the result. The baseline for every
//! application is its deployment at [`BASELINE`].

pub mod baseline;
pub mod dedupe;
pub mod detector;
pub mod report;
pub mod source;
pub mod version;

pub use baseline::{resolve_baselines, Baseline, BaselineKey, BASELINE};
pub use dedupe::{deduplicate, TieBreak};
pub use detector::{detect_drift, DriftMap};
pub use report::{compute_drift_report, compute_drift_report_with, ApplicationDrift, DriftOptions};
pub use source::{report_from_source, DeploymentSource};
pub use version::{less_than, parse_version};
