use anyhow::Result;
use panic_admin_client::Dashboard;
use panic_admin_core::{EntityKind, Gate, display_column};

use super::Console;

impl Console {
    pub async fn dashboard(&self) -> Result<()> {
        let client = self.guarded_client(Gate::Authenticated, "/dashboard")?;
        print!("{}", render_dashboard(&client.dashboard().await));
        Ok(())
    }
}

fn render_dashboard(dashboard: &Dashboard) -> String {
    let mut out = String::from("Overview\n");
    match &dashboard.overview {
        Ok(overview) => {
            out.push_str(&format!("  Total users:     {}\n", overview.total_users));
            out.push_str(&format!("  Total agents:    {}\n", overview.total_agents));
            out.push_str(&format!("  Active alerts:   {}\n", overview.active_alerts));
            out.push_str(&format!("  Resolved alerts: {}\n", overview.resolved_alerts));
        }
        Err(error) => out.push_str(&format!("  unavailable: {error}\n")),
    }

    out.push_str("\nRecent alerts\n");
    match &dashboard.recent_alerts {
        Ok(alerts) if alerts.is_empty() => out.push_str("  none\n"),
        Ok(alerts) => {
            let columns = EntityKind::Alert.schema().list_columns;
            for alert in alerts {
                let cells = columns
                    .iter()
                    .map(|column| display_column(alert, column))
                    .filter(|cell| !cell.is_empty())
                    .collect::<Vec<_>>();
                out.push_str(&format!("  {}\n", cells.join(" | ")));
            }
        }
        Err(error) => out.push_str(&format!("  unavailable: {error}\n")),
    }

    out.push_str("\nAgent leaderboard\n");
    match &dashboard.agent_activity {
        Ok(entries) if entries.is_empty() => out.push_str("  none\n"),
        Ok(entries) => {
            for (rank, entry) in entries.iter().enumerate() {
                out.push_str(&format!(
                    "  {:>2}. {} ({} resolved)\n",
                    rank + 1,
                    entry.agent_email,
                    entry.resolved
                ));
            }
        }
        Err(error) => out.push_str(&format!("  unavailable: {error}\n")),
    }
    out
}

#[cfg(test)]
mod tests {
    use panic_admin_client::ApiClientError;
    use panic_admin_core::reports::{AgentActivityEntry, Overview};
    use serde_json::json;

    use super::*;

    #[test]
    fn failed_sections_do_not_hide_the_others() {
        let dashboard = Dashboard {
            overview: Err(ApiClientError::Request {
                message: "connection refused".to_string(),
            }),
            recent_alerts: Ok(vec![
                json!({"id": 1, "alert_type": "fire", "sender_email": "c@x.com", "status": "pending"}),
            ]),
            agent_activity: Ok(vec![AgentActivityEntry {
                agent_email: "agent@x.com".to_string(),
                resolved: 12,
            }]),
        };
        let text = render_dashboard(&dashboard);
        assert!(text.contains("unavailable: api_request_failed:connection refused"));
        assert!(text.contains("fire | c@x.com | pending"));
        assert!(text.contains(" 1. agent@x.com (12 resolved)"));

        let empty = Dashboard {
            overview: Ok(Overview::default()),
            recent_alerts: Ok(Vec::new()),
            agent_activity: Ok(Vec::new()),
        };
        let text = render_dashboard(&empty);
        assert!(text.contains("Total users:     0"));
        assert_eq!(text.matches("  none").count(), 2);
    }
}
