use serde::Serialize;

use crate::types::DeploymentRecord;

/// The `(account, region)` pair whose deployed version is the reference for
/// every application.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct BaselineKey {
    pub account: &'static str,
    pub region: &'static str,
}

pub const BASELINE: BaselineKey = BaselineKey {
    account: "staging",
    region: "primary",
};

impl BaselineKey {
    pub fn matches(&self, record: &DeploymentRecord) -> bool {
        record.account == self.account && record.region == self.region
    }
}

/// An application's reference version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Baseline<'a> {
    pub name: &'a str,
    pub latest: &'a str,
}

/// Picks the baseline record of each application, in the order applications
/// first appear at the baseline key.
///
/// `records` must already be deduplicated: with one record per
/// `(name, account, region)` there is at most one baseline per application.
pub fn resolve_baselines<'a>(records: &'a [DeploymentRecord], key: &BaselineKey) -> Vec<Baseline<'a>> {
    records
        .iter()
        .filter(|record| key.matches(record))
        .map(|record| Baseline {
            name: &record.name,
            latest: &record.version,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_is_staging_primary() {
        assert_eq!(BASELINE.account, "staging");
        assert_eq!(BASELINE.region, "primary");
        assert!(BASELINE.matches(&DeploymentRecord::new("a", "staging", "primary", "1.0.0")));
        assert!(!BASELINE.matches(&DeploymentRecord::new("a", "staging", "secondary", "1.0.0")));
        assert!(!BASELINE.matches(&DeploymentRecord::new("a", "prod", "primary", "1.0.0")));
    }

    #[test]
    fn resolves_in_first_observed_order() {
        let records = vec![
            DeploymentRecord::new("b", "staging", "primary", "2.0.0"),
            DeploymentRecord::new("a", "prod", "primary", "1.0.0"),
            DeploymentRecord::new("a", "staging", "primary", "1.1.0"),
            DeploymentRecord::new("c", "prod", "secondary", "1.0.0"),
        ];
        let baselines = resolve_baselines(&records, &BASELINE);
        assert_eq!(
            baselines,
            vec![
                Baseline { name: "b", latest: "2.0.0" },
                Baseline { name: "a", latest: "1.1.0" },
            ]
        );
    }
}
