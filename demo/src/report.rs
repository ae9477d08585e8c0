//! Terminal output for records and histories.

use actlog_contracts::{
    record::{ActivityEntry, StoredLog},
    UpdateContext,
};

pub fn outcome(stored: Option<StoredLog>) {
    match stored {
        Some(stored) => println!(
            "      -> record #{} ({}) by {}",
            stored.record.id(),
            stored.record.action(),
            principal(stored.record.principal_id().map(|p| p.to_string()))
        ),
        None => println!("      -> no record written"),
    }
}

/// Print one line per entry, followed by its loaded contexts.
pub fn history(entries: &[ActivityEntry]) {
    if entries.is_empty() {
        println!("  (no activity)");
        return;
    }

    for entry in entries {
        let record = &entry.record;
        println!(
            "  #{:<4} {}  {:<8} {:<48} by {}",
            record.id(),
            record.created_at().format("%Y-%m-%d %H:%M:%S"),
            record.action().to_string(),
            record
                .subject()
                .map(ToString::to_string)
                .unwrap_or_else(|| "-".to_string()),
            principal(record.principal_id().map(|p| p.to_string()))
        );

        for (name, context) in &entry.contexts {
            match context.decode::<UpdateContext>() {
                Ok(update) => {
                    for field in update.changed_fields() {
                        println!(
                            "         {}.{}: {} -> {}",
                            name,
                            field,
                            value(update.before.get(field)),
                            value(update.after.get(field))
                        );
                    }
                }
                Err(_) => println!(
                    "         {}: {}",
                    name,
                    serde_json::Value::Object(context.fields.clone())
                ),
            }
        }
    }
}

fn principal(id: Option<String>) -> String {
    id.unwrap_or_else(|| "nobody".to_string())
}

fn value(v: Option<&serde_json::Value>) -> String {
    v.map(ToString::to_string).unwrap_or_else(|| "-".to_string())
}
