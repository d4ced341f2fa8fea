use anyhow::{Context, Result};
use panic_admin_client::AdminApiClient;
use panic_admin_core::{
    CrudError, CrudOrchestrator, DeleteOutcome, EntityKind, EntitySchema, Gate, RecordId, SubmitOutcome,
    display_column,
};
use serde_json::Value;
use tokio::time::Duration;
use tracing::info;

use super::Console;
use super::session::prompt_line;
use crate::{CreateArgs, DeleteArgs, UpdateArgs};

impl Console {
    /// Prints the collection once, or every `watch` seconds until interrupted.
    /// A failed refresh is reported and the previous listing stays current.
    pub async fn list(&self, entity: &str, watch: Option<u64>) -> Result<()> {
        let mut crud = self.orchestrator(entity)?;
        let schema = crud.schema();
        let title = schema.title.to_lowercase();
        let items = crud
            .load()
            .await
            .with_context(|| format!("failed to list {title}"))?;
        print!("{}", render_listing(schema, items));

        let Some(secs) = watch else {
            return Ok(());
        };
        let period = Duration::from_secs(secs);
        info!(collection = schema.collection_endpoint, every_secs = secs, "watching collection");
        loop {
            tokio::select! {
                () = tokio::time::sleep(period) => {}
                _ = tokio::signal::ctrl_c() => break,
            }
            match crud.load().await {
                Ok(items) => print!("\n{}", render_listing(schema, items)),
                Err(error) => eprintln!("failed to refresh {title}: {error}"),
            }
        }
        Ok(())
    }

    pub async fn create(&self, args: CreateArgs) -> Result<()> {
        let mut crud = self.orchestrator(&args.entity)?;
        crud.begin_create()?;
        for (key, value) in &args.fields {
            crud.set_field(key, value.as_str())?;
        }
        report_submit(crud.schema(), crud.submit().await)
    }

    pub async fn update(&self, args: UpdateArgs) -> Result<()> {
        let mut crud = self.orchestrator(&args.entity)?;
        let singular = crud.schema().singular;
        crud.load()
            .await
            .with_context(|| format!("failed to load {singular} {}", args.id))?;
        crud.begin_edit(&RecordId::from(args.id.as_str()))?;
        for (key, value) in &args.fields {
            crud.set_field(key, value.as_str())?;
        }
        report_submit(crud.schema(), crud.submit().await)
    }

    pub async fn delete(&self, args: DeleteArgs) -> Result<()> {
        let mut crud = self.orchestrator(&args.entity)?;
        let singular = crud.schema().singular;
        let id = RecordId::from(args.id.as_str());
        let result = if args.yes {
            crud.delete(&id, &|_: &str| true).await
        } else {
            crud.delete(&id, &confirm_on_terminal).await
        };
        let outcome = result.with_context(|| format!("failed to delete {singular} {id}"))?;
        match outcome {
            DeleteOutcome::Deleted => println!("Deleted {singular} {id}"),
            DeleteOutcome::Cancelled => println!("Kept {singular} {id}"),
        }
        Ok(())
    }

    fn orchestrator(&self, entity: &str) -> Result<CrudOrchestrator<AdminApiClient>> {
        let schema = EntityKind::parse(entity)?.schema();
        let client = self.guarded_client(Gate::Admin, schema.collection_endpoint)?;
        Ok(CrudOrchestrator::new(schema, client))
    }
}

fn confirm_on_terminal(prompt: &str) -> bool {
    prompt_line(&format!("{prompt} [y/N] "))
        .is_ok_and(|answer| matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn report_submit(
    schema: &EntitySchema,
    result: Result<SubmitOutcome, CrudError>,
) -> Result<()> {
    let (verb, saved) = match result? {
        SubmitOutcome::Created(saved) => ("Created", saved),
        SubmitOutcome::Updated(saved) => ("Updated", saved),
    };
    match RecordId::of_record(&saved, schema.id_key) {
        Some(id) => println!("{verb} {} {id}", schema.singular),
        None => println!("{verb} {}", schema.singular),
    }
    Ok(())
}

fn render_listing(schema: &EntitySchema, items: &[Value]) -> String {
    if items.is_empty() {
        format!("No {} found\n", schema.title.to_lowercase())
    } else {
        render_table(schema, items)
    }
}

/// Column-aligned table of the schema's list columns, id first.
fn render_table(schema: &EntitySchema, items: &[Value]) -> String {
    let header = std::iter::once(schema.id_key.to_uppercase())
        .chain(schema.list_columns.iter().map(|column| {
            schema
                .fields
                .iter()
                .find(|field| field.wire_key() == *column)
                .map_or_else(|| (*column).to_string(), |field| field.label.to_string())
        }))
        .collect::<Vec<_>>();
    let rows = items
        .iter()
        .map(|item| {
            std::iter::once(
                RecordId::of_record(item, schema.id_key)
                    .map(|id| id.path_segment())
                    .unwrap_or_default(),
            )
            .chain(schema.list_columns.iter().map(|column| display_column(item, column)))
            .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    let mut widths = header.iter().map(String::len).collect::<Vec<_>>();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for row in std::iter::once(&header).chain(&rows) {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ");
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn table_uses_field_labels_and_keeps_id_first() {
        let schema = EntityKind::Alert.schema();
        let items = vec![
            json!({"id": 3, "alert_type": "fire", "sender_email": "a@x.com", "status": "pending",
                   "location": {"lat": 1.5, "lng": 2.0}}),
            json!({"id": "b7", "alert_type": "medical", "status": "resolved"}),
        ];
        let table = render_table(schema, &items);
        let lines = table.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ID"));
        assert!(lines[0].contains("Alert Type"));
        assert!(lines[1].starts_with("3 "));
        assert!(lines[1].contains("a@x.com"));
        assert!(lines[2].starts_with("b7"));
        assert!(lines[2].contains("resolved"));
    }

    #[test]
    fn empty_listing_says_so() {
        assert_eq!(render_listing(EntityKind::User.schema(), &[]), "No users found\n");
        let items = vec![json!({"id": 1, "name": "Ada"})];
        assert!(render_listing(EntityKind::User.schema(), &items).starts_with("ID"));
    }
}
