use anyhow::Result;

use crate::drift::ApplicationDrift;
use crate::types::Release;

/// One row per lagging account/region pair.
pub fn drift_to_csv(report: &[ApplicationDrift]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["application", "latest", "account", "region", "deployed"])?;
    for entry in report {
        for (account, regions) in &entry.drift {
            for (region, version) in regions {
                writer.write_record([
                    entry.application.as_str(),
                    entry.latest.as_str(),
                    account.as_str(),
                    region.as_str(),
                    version.as_str(),
                ])?;
            }
        }
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

pub fn releases_to_csv(releases: &[Release]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["id", "name", "version", "account", "region", "created_at"])?;
    for release in releases {
        writer.write_record([
            release.id.to_string(),
            release.name.clone(),
            release.version.clone(),
            release.account.clone(),
            release.region.clone(),
            release.created_at.clone(),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}
