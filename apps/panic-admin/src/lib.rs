#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use panic_admin_core::reports::{RangePreset, ReportKind};

mod commands;
pub mod config;

pub use commands::Console;
pub use config::{AdminConfig, ConfigError};

#[derive(Parser, Debug)]
#[command(name = "panic-admin")]
#[command(about = "Admin console for the panic alert system")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in and store the session token
    Login(LoginArgs),
    /// Forget the stored session token
    Logout,
    /// Show the stored session
    Whoami,
    /// List users, agents, or alerts
    List(ListArgs),
    /// Create a record from key=value fields
    Create(CreateArgs),
    /// Edit fields of an existing record
    Update(UpdateArgs),
    /// Delete a record
    Delete(DeleteArgs),
    /// Show or change system settings
    Settings(SettingsArgs),
    /// Print a report as CSV
    Report(ReportArgs),
    /// Alert trend and type breakdowns as JSON
    Trends(TrendsArgs),
    /// Overview cards, recent alerts, and the agent leaderboard
    Dashboard,
    /// Follow the realtime alert feed
    Feed(FeedArgs),
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,
    /// Read from stdin when omitted
    #[arg(long)]
    pub password: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// users, agents, or alerts
    pub entity: String,
    /// Reload and reprint every SECS seconds until interrupted
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub watch: Option<u64>,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    pub entity: String,
    /// Field assignment, repeatable: --set name="Ada Lovelace"
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    pub fields: Vec<(String, String)>,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    pub entity: String,
    pub id: String,
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment, required = true)]
    pub fields: Vec<(String, String)>,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    pub entity: String,
    pub id: String,
    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub action: SettingsAction,
}

#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    /// Print the current settings
    Show,
    /// Change one or more settings
    Set {
        #[arg(value_name = "KEY=VALUE", value_parser = parse_assignment, required = true)]
        assignments: Vec<(String, String)>,
        /// Print the pending settings without saving
        #[arg(long)]
        dry_run: bool,
    },
    /// Save the default settings
    Reset,
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// alerts, agents, or users
    pub kind: ReportKind,
    /// day, week, month, quarter, or year
    #[arg(long, default_value = "week")]
    pub range: RangePreset,
    /// Custom range start (YYYY-MM-DD); overrides --range
    #[arg(long)]
    pub from: Option<NaiveDate>,
    /// Custom range end (YYYY-MM-DD); overrides --range
    #[arg(long)]
    pub to: Option<NaiveDate>,
    /// Write the CSV to this file instead of stdout
    #[arg(long, conflicts_with = "save")]
    pub output: Option<PathBuf>,
    /// Write the CSV to <kind>_report.csv in the current directory
    #[arg(long)]
    pub save: bool,
}

#[derive(Args, Debug)]
pub struct TrendsArgs {
    #[arg(long, default_value_t = 7)]
    pub days: u32,
}

#[derive(Args, Debug)]
pub struct FeedArgs {
    /// Stop after this many alerts
    #[arg(long)]
    pub count: Option<usize>,
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

pub async fn run(cli: Cli, config: AdminConfig) -> anyhow::Result<()> {
    let console = Console::new(config);
    match cli.command {
        Commands::Login(args) => console.login(args).await,
        Commands::Logout => console.logout(),
        Commands::Whoami => console.whoami(),
        Commands::List(args) => console.list(&args.entity, args.watch).await,
        Commands::Create(args) => console.create(args).await,
        Commands::Update(args) => console.update(args).await,
        Commands::Delete(args) => console.delete(args).await,
        Commands::Settings(args) => console.settings(args.action).await,
        Commands::Report(args) => console.report(args).await,
        Commands::Trends(args) => console.trends(args.days).await,
        Commands::Dashboard => console.dashboard().await,
        Commands::Feed(args) => console.feed(args.count).await,
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use clap::error::ErrorKind;

    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("panic-admin").chain(args.iter().copied()))
    }

    #[test]
    fn cli_requires_subcommand() {
        let err = match parse(&[]) {
            Ok(_) => panic!("expected missing subcommand parse error"),
            Err(err) => err,
        };
        assert_eq!(
            err.kind(),
            ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        );
    }

    #[test]
    fn create_collects_repeated_assignments() {
        let cli = parse(&[
            "create",
            "agents",
            "--set",
            "name=Ada Lovelace",
            "--set",
            "notes=a=b",
        ])
        .unwrap();
        let Commands::Create(args) = cli.command else {
            panic!("expected create");
        };
        assert_eq!(args.entity, "agents");
        assert_eq!(
            args.fields,
            vec![
                ("name".to_string(), "Ada Lovelace".to_string()),
                ("notes".to_string(), "a=b".to_string()),
            ]
        );
    }

    #[test]
    fn list_watch_takes_a_positive_period() {
        let cli = parse(&["list", "alerts", "--watch", "3"]).unwrap();
        let Commands::List(args) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(args.entity, "alerts");
        assert_eq!(args.watch, Some(3));

        let Commands::List(args) = parse(&["list", "users"]).unwrap().command else {
            panic!("expected list");
        };
        assert_eq!(args.watch, None);

        let err = parse(&["list", "alerts", "--watch", "0"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn assignments_need_a_key() {
        let err = parse(&["update", "users", "7", "--set", "=x"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
        let err = parse(&["update", "users", "7"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn delete_accepts_yes_flag() {
        let cli = parse(&["delete", "alerts", "42", "-y"]).unwrap();
        let Commands::Delete(args) = cli.command else {
            panic!("expected delete");
        };
        assert!(args.yes);
        assert_eq!(args.id, "42");
    }

    #[test]
    fn report_parses_kind_range_and_dates() {
        let cli = parse(&["report", "alerts", "--range", "quarter", "--from", "2024-01-01"]).unwrap();
        let Commands::Report(args) = cli.command else {
            panic!("expected report");
        };
        assert_eq!(args.kind, ReportKind::Alerts);
        assert_eq!(args.range, RangePreset::Quarter);
        assert_eq!(args.from, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(args.to, None);

        let cli = parse(&["report", "users"]).unwrap();
        let Commands::Report(args) = cli.command else {
            panic!("expected report");
        };
        assert_eq!(args.range, RangePreset::Week);
    }

    #[test]
    fn report_rejects_unknown_kind_and_range() {
        assert_eq!(
            parse(&["report", "billing"]).unwrap_err().kind(),
            ErrorKind::ValueValidation
        );
        assert_eq!(
            parse(&["report", "alerts", "--range", "decade"]).unwrap_err().kind(),
            ErrorKind::ValueValidation
        );
        assert_eq!(
            parse(&["report", "alerts", "--save", "--output", "x.csv"])
                .unwrap_err()
                .kind(),
            ErrorKind::ArgumentConflict
        );
    }

    #[test]
    fn settings_set_supports_dry_run() {
        let cli = parse(&["settings", "set", "sms_notifications=yes", "--dry-run"]).unwrap();
        let Commands::Settings(SettingsArgs {
            action: SettingsAction::Set {
                assignments,
                dry_run,
            },
        }) = cli.command
        else {
            panic!("expected settings set");
        };
        assert!(dry_run);
        assert_eq!(
            assignments,
            vec![("sms_notifications".to_string(), "yes".to_string())]
        );
    }
}
