use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::drift::version::{cmp_precedence, parse_version};
use crate::error::DriftError;
use crate::types::DeploymentRecord;

/// Which record survives when several share a `(name, account, region)` key.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// First record in snapshot order. With the store's recency ordering this
    /// is the most recently inserted release.
    #[default]
    FirstSeen,
    /// Highest version precedence; equal precedence keeps the first seen.
    HighestVersion,
}

impl TieBreak {
    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::FirstSeen => "first_seen",
            Self::HighestVersion => "highest_version",
        }
    }
}

impl Display for TieBreak {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_slug())
    }
}

#[derive(Debug, Error)]
#[error("unknown tie-break policy: {0}")]
pub struct TieBreakParseError(pub String);

impl FromStr for TieBreak {
    type Err = TieBreakParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "first_seen" | "recency" | "latest_insert" => Ok(Self::FirstSeen),
            "highest_version" | "version" => Ok(Self::HighestVersion),
            _ => Err(TieBreakParseError(s.to_string())),
        }
    }
}

/// Reduces `records` to one record per `(name, account, region)`, keeping the
/// relative order of the surviving keys' first occurrences.
pub fn deduplicate(
    records: &[DeploymentRecord],
    policy: TieBreak,
) -> Result<Vec<DeploymentRecord>, DriftError> {
    let mut slot_by_key: HashMap<(&str, &str, &str), usize> = HashMap::new();
    let mut survivors: Vec<&DeploymentRecord> = Vec::new();

    for record in records {
        match slot_by_key.get(&record.key()) {
            None => {
                slot_by_key.insert(record.key(), survivors.len());
                survivors.push(record);
            }
            Some(&slot) => {
                if policy == TieBreak::HighestVersion && outranks(record, survivors[slot])? {
                    survivors[slot] = record;
                }
            }
        }
    }

    Ok(survivors.into_iter().cloned().collect())
}

fn outranks(candidate: &DeploymentRecord, current: &DeploymentRecord) -> Result<bool, DriftError> {
    let candidate = parse_version(&candidate.version)?;
    let current = parse_version(&current.version)?;
    Ok(cmp_precedence(&candidate, &current) == Ordering::Greater)
}
