use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::trace;

use crate::drift::baseline::{Baseline, BaselineKey};
use crate::drift::version::{cmp_precedence, parse_version};
use crate::error::DriftError;
use crate::types::DeploymentRecord;

/// account -> region -> deployed version, for deployments behind baseline.
pub type DriftMap = BTreeMap<String, BTreeMap<String, String>>;

/// Collects every deployment of `baseline.name` outside `key` whose version
/// is strictly lower than the baseline version.
pub fn detect_drift(
    records: &[DeploymentRecord],
    baseline: &Baseline<'_>,
    key: &BaselineKey,
) -> Result<DriftMap, DriftError> {
    let latest = parse_version(baseline.latest)?;
    let mut drift = DriftMap::new();

    for record in records
        .iter()
        .filter(|record| record.name == baseline.name && !key.matches(record))
    {
        let deployed = parse_version(&record.version)?;
        if cmp_precedence(&deployed, &latest) != Ordering::Less {
            continue;
        }
        trace!(
            application = %record.name,
            account = %record.account,
            region = %record.region,
            version = %record.version,
            latest = %baseline.latest,
            "deployment behind baseline"
        );
        drift
            .entry(record.account.clone())
            .or_default()
            .insert(record.region.clone(), record.version.clone());
    }

    Ok(drift)
}
