use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Table};

use crate::drift::ApplicationDrift;
use crate::types::Release;

pub fn render_drift_table(report: &[ApplicationDrift]) -> String {
    if report.is_empty() {
        return "No drift detected.".to_string();
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Application", "Latest", "Account", "Region", "Deployed"]);

    for entry in report {
        for (account, regions) in &entry.drift {
            for (region, version) in regions {
                table.add_row(vec![
                    Cell::new(&entry.application),
                    Cell::new(&entry.latest).fg(Color::Green),
                    Cell::new(account),
                    Cell::new(region),
                    Cell::new(version).fg(Color::Red),
                ]);
            }
        }
    }
    let lagging: usize = report.iter().map(ApplicationDrift::lagging_count).sum();
    format!(
        "{table}\n{} application(s) drifting, {lagging} region(s) behind staging",
        report.len()
    )
}

pub fn render_releases_table(releases: &[Release]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["ID", "Name", "Version", "Account", "Region", "Created"]);
    for r in releases {
        table.add_row(vec![
            r.id.to_string(),
            r.name.clone(),
            r.version.clone(),
            r.account.clone(),
            r.region.clone(),
            r.created_at.clone(),
        ]);
    }
    table.to_string()
}
