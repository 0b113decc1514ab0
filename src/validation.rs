//! Request payloads and the checks that turn them into trusted values.

use serde::Deserialize;

use crate::drift::parse_version;
use crate::error::ValidationError;
use crate::types::NewRelease;

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl TryFrom<LoginRequest> for Credentials {
    type Error = ValidationError;

    fn try_from(value: LoginRequest) -> Result<Self, Self::Error> {
        let username = required(value.username)?;
        // Passwords are taken as given, whitespace included.
        let password = value
            .password
            .filter(|p| !p.is_empty())
            .ok_or(ValidationError::MissingFields)?;
        Ok(Self { username, password })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateReleaseRequest {
    pub name: Option<String>,
    pub version: Option<String>,
    pub account: Option<String>,
    pub region: Option<String>,
}

impl TryFrom<CreateReleaseRequest> for NewRelease {
    type Error = ValidationError;

    fn try_from(value: CreateReleaseRequest) -> Result<Self, Self::Error> {
        let release = NewRelease {
            name: required(value.name)?,
            version: required(value.version)?,
            account: required(value.account)?,
            region: required(value.region)?,
        };
        if parse_version(&release.version).is_err() {
            return Err(ValidationError::InvalidVersion(release.version));
        }
        Ok(release)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListReleasesQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl TryFrom<ListReleasesQuery> for Page {
    type Error = ValidationError;

    fn try_from(value: ListReleasesQuery) -> Result<Self, Self::Error> {
        let limit = value.limit.unwrap_or(i64::from(DEFAULT_PAGE_LIMIT));
        if !(1..=i64::from(MAX_PAGE_LIMIT)).contains(&limit) {
            return Err(ValidationError::OutOfRange(format!(
                "limit must be between 1 and {MAX_PAGE_LIMIT}"
            )));
        }
        let offset = value.offset.unwrap_or(0);
        let offset = u32::try_from(offset).map_err(|_| {
            ValidationError::OutOfRange("offset must be a non-negative integer".to_string())
        })?;
        Ok(Self {
            limit: limit as u32,
            offset,
        })
    }
}

fn required(field: Option<String>) -> Result<String, ValidationError> {
    field
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ValidationError::MissingFields)
}
