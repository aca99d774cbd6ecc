//! Import-id command implementation

use colored::Colorize;
use converge_core::{ConfigurationObject, import};

use crate::context::Context;
use crate::error::Result;

/// Parse `raw` as an import identifier of `resource`.
///
/// With `json`, prints a plan skeleton that can be filled in and passed to
/// `converge diff`.
pub fn run_import_id(
    ctx: &Context,
    resource: &str,
    raw: &str,
    delimiter: Option<&str>,
    json: bool,
) -> Result<()> {
    let schema = ctx.schema(resource)?;
    let delimiter = delimiter.unwrap_or(ctx.config.import.delimiter.as_str());
    let id = import::parse_import_id(schema, raw, delimiter)?;

    if json {
        let seed = ConfigurationObject::new(&schema.name, id);
        println!("{}", serde_json::to_string_pretty(&seed)?);
        return Ok(());
    }

    println!("{} {}", "resource".bold(), schema.name);
    for (name, value) in schema.parents.iter().zip(&id.parents) {
        println!("  {} = {value}", name.cyan());
    }
    if schema.keyed {
        println!("  {} = {}", "name".cyan(), id.key);
    } else {
        println!("  {}", "(singleton)".dimmed());
    }
    Ok(())
}
