//! Report ranges, aggregate shapes, and CSV export.

use std::fmt;
use std::str::FromStr;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

pub const DEFAULT_AGENT_ACTIVITY_LIMIT: u32 = 20;
const CUSTOM_RANGE_DEFAULT_DAYS: u64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangePreset {
    Day,
    #[default]
    Week,
    Month,
    Quarter,
    Year,
}

impl RangePreset {
    pub const ALL: [Self; 5] = [Self::Day, Self::Week, Self::Month, Self::Quarter, Self::Year];

    #[must_use]
    pub fn days(self) -> u64 {
        match self {
            Self::Day => 1,
            Self::Week => 7,
            Self::Month => 30,
            Self::Quarter => 90,
            Self::Year => 365,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Quarter => "quarter",
            Self::Year => "year",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportError {
    #[error("unknown range '{0}' (expected day, week, month, quarter, or year)")]
    UnknownRange(String),
    #[error("unknown report '{0}' (expected alerts, agents, or users)")]
    UnknownReport(String),
}

impl FromStr for RangePreset {
    type Err = ReportError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.as_str().eq_ignore_ascii_case(raw.trim()))
            .ok_or_else(|| ReportError::UnknownRange(raw.trim().to_string()))
    }
}

/// Inclusive window sent as `from_` / `to` query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    #[must_use]
    pub fn query(&self) -> [(&'static str, String); 2] {
        [
            ("from_", self.from.format("%Y-%m-%d").to_string()),
            ("to", self.to.format("%Y-%m-%d").to_string()),
        ]
    }
}

/// A preset counted back from today, or a custom pair. A custom range with
/// either end given takes priority over presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportRange {
    Preset(RangePreset),
    Custom {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
}

impl Default for ReportRange {
    fn default() -> Self {
        Self::Preset(RangePreset::default())
    }
}

impl ReportRange {
    /// Custom when either date is present, otherwise the preset.
    #[must_use]
    pub fn from_parts(preset: RangePreset, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        if from.is_some() || to.is_some() {
            Self::Custom { from, to }
        } else {
            Self::Preset(preset)
        }
    }

    #[must_use]
    pub fn resolve(&self, today: NaiveDate) -> DateWindow {
        match *self {
            Self::Preset(preset) => DateWindow {
                from: days_before(today, preset.days()),
                to: today,
            },
            Self::Custom { from, to } => DateWindow {
                from: from.unwrap_or_else(|| days_before(today, CUSTOM_RANGE_DEFAULT_DAYS)),
                to: to.unwrap_or(today),
            },
        }
    }
}

fn days_before(today: NaiveDate, days: u64) -> NaiveDate {
    today.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Alerts,
    Agents,
    Users,
}

impl ReportKind {
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Alerts => "Alert Reports",
            Self::Agents => "Agent Performance",
            Self::Users => "User Activity",
        }
    }

    #[must_use]
    pub fn file_name(self) -> String {
        format!("{self}_report.csv")
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Alerts => "alerts",
            Self::Agents => "agents",
            Self::Users => "users",
        })
    }
}

impl FromStr for ReportKind {
    type Err = ReportError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "alerts" => Ok(Self::Alerts),
            "agents" => Ok(Self::Agents),
            "users" => Ok(Self::Users),
            _ => Err(ReportError::UnknownReport(raw.trim().to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsSummary {
    pub total_alerts: u64,
    pub resolved: u64,
    pub avg_response_minutes: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentActivityEntry {
    pub agent_email: String,
    pub resolved: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentActivity {
    pub items: Vec<AgentActivityEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Overview {
    pub total_users: u64,
    pub total_agents: u64,
    pub active_alerts: u64,
    pub resolved_alerts: u64,
}

#[must_use]
pub fn alerts_summary_csv(summary: &AlertsSummary) -> String {
    let average = summary
        .avg_response_minutes
        .map(|minutes| minutes.to_string())
        .unwrap_or_default();
    format!(
        "total_alerts,resolved,avg_response_minutes\n{},{},{average}\n",
        summary.total_alerts, summary.resolved
    )
}

/// One row per agent, no trailing newline.
#[must_use]
pub fn agent_activity_csv(entries: &[AgentActivityEntry]) -> String {
    let rows = entries
        .iter()
        .map(|entry| format!("{},{}", entry.agent_email, entry.resolved))
        .collect::<Vec<_>>()
        .join("\n");
    format!("agent_email,resolved\n{rows}")
}

#[must_use]
pub fn overview_csv(overview: &Overview) -> String {
    format!(
        "total_users,total_agents,active_alerts,resolved_alerts\n{},{},{},{}\n",
        overview.total_users, overview.total_agents, overview.active_alerts, overview.resolved_alerts
    )
}
