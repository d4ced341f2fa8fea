use anyhow::{Context, Result};
use panic_admin_client::AdminApiClient;
use panic_admin_core::{BannerKind, Gate, SettingsEditor, SystemSettings};
use serde_json::Value;
use tracing::warn;

use super::Console;
use crate::SettingsAction;

impl Console {
    pub async fn settings(&self, action: SettingsAction) -> Result<()> {
        let client = self.guarded_client(Gate::Admin, "/settings")?;
        let mut editor = SettingsEditor::new(client);
        match action {
            SettingsAction::Show => {
                load_or_warn(&mut editor).await;
                print!("{}", render_settings(editor.settings())?);
                Ok(())
            }
            SettingsAction::Set {
                assignments,
                dry_run,
            } => {
                editor.load().await.context("refusing to save over settings that failed to load")?;
                for (key, value) in &assignments {
                    editor.set(key, value)?;
                }
                finish(&mut editor, dry_run).await
            }
            SettingsAction::Reset => {
                load_or_warn(&mut editor).await;
                let defaults = SystemSettings::default().to_server()?;
                if let Value::Object(defaults) = defaults {
                    for (key, value) in &defaults {
                        editor.set(key, &raw_setting(value))?;
                    }
                }
                finish(&mut editor, false).await
            }
        }
    }
}

async fn load_or_warn(editor: &mut SettingsEditor<AdminApiClient>) {
    if let Err(error) = editor.load().await {
        warn!(error = %error, "showing default settings");
        if let Some(banner) = editor.banner() {
            eprintln!("{}", banner.text);
        }
    }
}

async fn finish(editor: &mut SettingsEditor<AdminApiClient>, dry_run: bool) -> Result<()> {
    if !editor.is_dirty() {
        println!("Settings unchanged");
        return Ok(());
    }
    if dry_run {
        print!("{}", render_settings(editor.settings())?);
        editor.reset();
        println!("Dry run; nothing saved");
        return Ok(());
    }
    let saved = editor.save().await;
    if let Some(banner) = editor.banner() {
        match banner.kind {
            BannerKind::Success => println!("{}", banner.text),
            BannerKind::Error => eprintln!("{}", banner.text),
        }
    }
    saved.context("failed to save settings")
}

fn render_settings(settings: &SystemSettings) -> Result<String> {
    let mut out = String::new();
    if let Value::Object(map) = settings.to_server()? {
        let width = map.keys().map(String::len).max().unwrap_or(0);
        for (key, value) in &map {
            out.push_str(&format!("{key:<width$} = {}\n", raw_setting(value)));
        }
    }
    Ok(out)
}

/// Text form accepted back by `SystemSettings::set`.
fn raw_setting(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_values_parse_back_unchanged() {
        let original = SystemSettings {
            alert_types: vec!["medical".to_string(), "flood".to_string()],
            sms_notifications: true,
            retention_days: 14,
            ..SystemSettings::default()
        };
        let mut rebuilt = SystemSettings::default();
        if let Value::Object(map) = original.to_server().unwrap() {
            for (key, value) in &map {
                rebuilt.set(key, &raw_setting(value)).unwrap();
            }
        }
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn render_lists_every_key() {
        let text = render_settings(&SystemSettings::default()).unwrap();
        assert_eq!(text.lines().count(), 23);
        assert!(text.contains("alert_types"));
        assert!(text.contains("= medical,fire,police,utility"));
    }
}
