use anyhow::Result;

use crate::drift::report::{compute_drift_report_with, ApplicationDrift, DriftOptions};
use crate::types::DeploymentRecord;

/// Read side of the release store as seen by the drift engine.
///
/// Implementations return a full snapshot, most recently inserted record
/// first. The ordering decides which record wins under
/// [`TieBreak::FirstSeen`](crate::drift::TieBreak::FirstSeen).
pub trait DeploymentSource {
    fn list_deployments(&self) -> Result<Vec<DeploymentRecord>>;
}

impl DeploymentSource for Vec<DeploymentRecord> {
    fn list_deployments(&self) -> Result<Vec<DeploymentRecord>> {
        Ok(self.clone())
    }
}

/// Fetches one snapshot from `source` and computes its drift report.
pub fn report_from_source(
    source: &dyn DeploymentSource,
    options: &DriftOptions,
) -> Result<Vec<ApplicationDrift>> {
    let snapshot = source.list_deployments()?;
    Ok(compute_drift_report_with(&snapshot, options)?)
}
