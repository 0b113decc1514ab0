use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::drift::baseline::{resolve_baselines, BASELINE};
use crate::drift::dedupe::{deduplicate, TieBreak};
use crate::drift::detector::{detect_drift, DriftMap};
use crate::drift::version::parse_version;
use crate::error::DriftError;
use crate::types::DeploymentRecord;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DriftOptions {
    #[serde(default)]
    pub tie_break: TieBreak,
}

/// One report element. Serializes as `{ "<application>": { "latest", "drift" } }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationDrift {
    pub application: String,
    pub latest: String,
    pub drift: DriftMap,
}

impl ApplicationDrift {
    /// Number of account/region pairs behind baseline.
    pub fn lagging_count(&self) -> usize {
        self.drift.values().map(|regions| regions.len()).sum()
    }
}

#[derive(Serialize)]
struct EntryBody<'a> {
    latest: &'a str,
    drift: &'a DriftMap,
}

impl Serialize for ApplicationDrift {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(
            &self.application,
            &EntryBody {
                latest: &self.latest,
                drift: &self.drift,
            },
        )?;
        map.end()
    }
}

pub fn compute_drift_report(
    records: &[DeploymentRecord],
) -> Result<Vec<ApplicationDrift>, DriftError> {
    compute_drift_report_with(records, &DriftOptions::default())
}

/// Runs dedupe, baseline resolution and drift detection over one snapshot.
/// Applications without a baseline or without drift are left out.
pub fn compute_drift_report_with(
    records: &[DeploymentRecord],
    options: &DriftOptions,
) -> Result<Vec<ApplicationDrift>, DriftError> {
    let unique = deduplicate(records, options.tie_break)?;
    for record in &unique {
        parse_version(&record.version)?;
    }

    let baselines = resolve_baselines(&unique, &BASELINE);
    debug!(
        records = records.len(),
        unique = unique.len(),
        baselines = baselines.len(),
        tie_break = %options.tie_break,
        "computing drift report"
    );

    let mut report = Vec::new();
    for baseline in &baselines {
        let drift = detect_drift(&unique, baseline, &BASELINE)?;
        if drift.is_empty() {
            continue;
        }
        report.push(ApplicationDrift {
            application: baseline.name.to_string(),
            latest: baseline.latest.to_string(),
            drift,
        });
    }
    Ok(report)
}
