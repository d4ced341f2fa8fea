use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use panic_admin_core::Gate;
use panic_admin_core::reports::{
    DEFAULT_AGENT_ACTIVITY_LIMIT, ReportKind, ReportRange, agent_activity_csv, alerts_summary_csv,
    overview_csv,
};
use tracing::info;

use super::Console;
use crate::ReportArgs;

impl Console {
    pub async fn report(&self, args: ReportArgs) -> Result<()> {
        let client = self.guarded_client(Gate::Admin, "/reports")?;
        let window = ReportRange::from_parts(args.range, args.from, args.to)
            .resolve(Local::now().date_naive());
        let csv = match args.kind {
            ReportKind::Alerts => alerts_summary_csv(
                &client
                    .alerts_summary(&window)
                    .await
                    .context("failed to load alert summary")?,
            ),
            ReportKind::Agents => agent_activity_csv(
                &client
                    .agent_activity(DEFAULT_AGENT_ACTIVITY_LIMIT)
                    .await
                    .context("failed to load agent activity")?
                    .items,
            ),
            ReportKind::Users => overview_csv(
                &client
                    .overview()
                    .await
                    .context("failed to load user activity")?,
            ),
        };

        let destination = match (args.output, args.save) {
            (Some(path), _) => Some(path),
            (None, true) => Some(PathBuf::from(args.kind.file_name())),
            (None, false) => None,
        };
        match destination {
            Some(path) => {
                fs::write(&path, &csv)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                info!(report = %args.kind, path = %path.display(), "report written");
                println!("{} written to {}", args.kind.title(), path.display());
            }
            None => {
                info!(report = %args.kind, from = %window.from, to = %window.to, "report loaded");
                print!("{csv}");
                if !csv.ends_with('\n') {
                    println!();
                }
            }
        }
        Ok(())
    }

    pub async fn trends(&self, days: u32) -> Result<()> {
        let client = self.guarded_client(Gate::Admin, "/reports")?;
        let (trends, types) = tokio::join!(client.alert_trends(days), client.alert_types(days));
        let trends = trends.context("failed to load alert trends")?;
        let types = types.context("failed to load alert types")?;
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "days": days,
                "alert_trends": trends,
                "alert_types": types,
            }))?
        );
        Ok(())
    }
}
