use serde::{Deserialize, Serialize};

/// One deployment fact: `version` of application `name` runs in
/// `account`/`region`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DeploymentRecord {
    pub name: String,
    pub account: String,
    pub region: String,
    pub version: String,
}

impl DeploymentRecord {
    pub fn new(
        name: impl Into<String>,
        account: impl Into<String>,
        region: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            account: account.into(),
            region: region.into(),
            version: version.into(),
        }
    }

    /// The deduplication key.
    pub fn key(&self) -> (&str, &str, &str) {
        (&self.name, &self.account, &self.region)
    }
}

/// A release as persisted by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Release {
    pub id: i64,
    pub name: String,
    pub version: String,
    pub account: String,
    pub region: String,
    pub created_at: String,
}

impl From<Release> for DeploymentRecord {
    fn from(value: Release) -> Self {
        Self {
            name: value.name,
            account: value.account,
            region: value.region,
            version: value.version,
        }
    }
}

/// A validated release waiting to be inserted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewRelease {
    pub name: String,
    pub version: String,
    pub account: String,
    pub region: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
}
