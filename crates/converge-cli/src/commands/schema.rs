//! Schema registry inspection

use colored::Colorize;
use converge_schema::{AttributeSpec, Presence, SemanticType};
use serde_json::json;

use crate::context::Context;
use crate::error::Result;

fn type_label(kind: SemanticType) -> &'static str {
    match kind {
        SemanticType::String => "string",
        SemanticType::Bool => "bool",
        SemanticType::Int => "int",
        SemanticType::Duration => "duration",
        SemanticType::StringSet => "string-set",
        SemanticType::Enum => "enum",
        SemanticType::EnumSet => "enum-set",
    }
}

/// Flags worth showing next to an attribute, in a fixed order.
fn attribute_notes(spec: &AttributeSpec) -> Vec<String> {
    let mut notes = Vec::new();
    match spec.presence {
        Presence::Required => notes.push("required".to_string()),
        Presence::Computed => notes.push("computed".to_string()),
        Presence::Optional => {}
    }
    if !spec.variants.is_empty() {
        notes.push(format!("variants: {}", spec.variants.join("|")));
    }
    if let Some(default) = &spec.default {
        notes.push(format!("default {default}"));
    }
    for (variant, default) in &spec.variant_defaults {
        notes.push(format!("default {default} when {variant}"));
    }
    if let Some(version) = &spec.min_version {
        notes.push(format!("since {version}"));
    }
    if spec.immutable {
        notes.push("immutable".to_string());
    }
    if spec.is_set() && !spec.incremental {
        notes.push("replace-only".to_string());
    }
    notes
}

pub fn run_schema_list(ctx: &Context, json: bool) -> Result<()> {
    let names = ctx.registry.list();

    if json {
        let entries: Vec<_> = names
            .iter()
            .filter_map(|name| ctx.registry.get(name))
            .map(|schema| {
                json!({
                    "name": schema.name,
                    "lifecycle": schema.lifecycle,
                    "variants": schema.variants(),
                    "attributes": schema.attributes.len(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("{}", "Resource types:".bold());
    for schema in names.iter().filter_map(|name| ctx.registry.get(name)) {
        let variants = if schema.variants().is_empty() {
            String::new()
        } else {
            format!(" [{}]", schema.variants().join(", "))
        };
        println!(
            "  {:<24} {:<10} {:>3} attributes{}",
            schema.name.cyan(),
            schema.lifecycle.to_string(),
            schema.attributes.len(),
            variants.dimmed()
        );
    }
    Ok(())
}

pub fn run_schema_show(ctx: &Context, resource: &str, json: bool) -> Result<()> {
    let schema = ctx.schema(resource)?;

    if json {
        println!("{}", serde_json::to_string_pretty(schema)?);
        return Ok(());
    }

    println!("{} ({})", schema.name.bold(), schema.lifecycle);
    if let Some(description) = &schema.description {
        println!("  {description}");
    }
    println!(
        "  import id: {}",
        schema.import_format(&ctx.config.import.delimiter)
    );
    if let Some(version) = &schema.min_version {
        println!("  requires remote {version}");
    }
    if let Some(discriminant) = &schema.discriminant {
        println!(
            "  discriminant: {} = {}",
            discriminant.attribute.cyan(),
            discriminant.variants.join(" | ")
        );
    }
    println!();

    for spec in &schema.attributes {
        let notes = attribute_notes(spec);
        let notes = if notes.is_empty() {
            String::new()
        } else {
            format!("  ({})", notes.join(", "))
        };
        println!(
            "  {:<44} {:<10}{}",
            spec.name.cyan(),
            type_label(spec.kind),
            notes.dimmed()
        );
    }
    Ok(())
}
