use std::path::Path;

use crate::cli::commands::Cli;
use crate::remote::memory::{MemoryStore, sample_store};
use crate::remote::{LookupSource, SchemaProvider};

pub fn load_store(data: Option<&str>) -> Result<MemoryStore, Box<dyn std::error::Error>> {
    match data {
        Some(path) => MemoryStore::from_file(Path::new(path)),
        None => Ok(sample_store()),
    }
}

pub fn cmd_schema(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let store = load_store(cli.data.as_deref())?;
    let schema = store.schema("tasks")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    println!("collection: {}", schema.collection);
    for field in &schema.fields {
        let mut flags = Vec::new();
        if field.required {
            flags.push("required");
        }
        if field.editable {
            flags.push("editable");
        }
        if field.sortable {
            flags.push("sortable");
        }
        if !field.visible {
            flags.push("hidden");
        }
        let mut extra = String::new();
        if let Some(set) = &field.lookup_set {
            extra = format!("  lookup={set}");
        } else if let Some(coll) = &field.reference_collection {
            let mode = if field.searchable { "search" } else { "fixed" };
            extra = format!("  ref={coll} ({mode})");
        }
        println!(
            "  {:<12} {:<10} [{}]{}",
            field.field_path,
            format!("{:?}", field.field_type).to_lowercase(),
            flags.join(", "),
            extra
        );
    }
    Ok(())
}

pub fn cmd_check(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let store = load_store(cli.data.as_deref())?;
    let schema = store.schema("tasks")?;
    let mut problems: Vec<String> = Vec::new();

    if let Err(e) = schema.validate() {
        problems.push(format!("schema: {e}"));
    }

    for task in store.tasks() {
        if let Some(parent) = &task.parent
            && store.get(parent).is_none()
        {
            problems.push(format!("{}: parent {parent} does not exist", task.id));
        }
        for child in &task.children {
            match store.get(child) {
                None => problems.push(format!("{}: child {child} does not exist", task.id)),
                Some(c) if c.parent.as_deref() != Some(task.id.as_str()) => {
                    problems.push(format!("{}: child {child} does not link back", task.id));
                }
                Some(_) => {}
            }
        }
        if !task.status.is_empty()
            && let Some(set) = store.lookup_set("statuses")
            && set.display_name(&task.status).is_none()
        {
            problems.push(format!("{}: unknown status '{}'", task.id, task.status));
        }
    }

    if problems.is_empty() {
        println!("ok: {} tasks, schema valid", store.tasks().count());
        return Ok(());
    }
    for p in &problems {
        eprintln!("problem: {p}");
    }
    Err(format!("{} problem(s) found", problems.len()).into())
}
