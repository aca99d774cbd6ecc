//! Validate command implementation
//!
//! Runs every pre-flight check a controller operation would, without a
//! remote service: version gate, variant resolution, canonicalization and
//! (for owned resources) construction of the create request.

use std::path::Path;

use colored::Colorize;
use converge_core::{Error, pipeline, request};
use converge_schema::ProductVersion;
use serde_json::json;

use crate::context::{Context, read_object};
use crate::error::{CliError, Result};

pub fn run_validate(
    ctx: &Context,
    plan_path: &Path,
    remote_version: Option<ProductVersion>,
    json: bool,
) -> Result<()> {
    let plan = read_object(plan_path)?;
    let schema = ctx.schema(&plan.resource)?;
    let version = ctx.config.version(remote_version)?;

    let outcome = pipeline::prepare(&plan, schema, &version).and_then(|prepared| {
        if !schema.is_edit_only() {
            request::build_add_request(&plan.id, prepared.variant(), &prepared.canonical, schema)?;
        }
        Ok(prepared)
    });

    let prepared = match outcome {
        Ok(prepared) => prepared,
        Err(e) if e.is_pre_flight() => {
            report_invalid(&plan.resource, &plan.id.to_string(), &e, json)?;
            return Err(CliError::user(format!(
                "{} '{}' failed validation",
                plan.resource, plan.id
            )));
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        let output = json!({
            "valid": true,
            "resource": plan.resource,
            "id": plan.id,
            "variant": prepared.variant(),
            "remote_version": version.to_string(),
            "canonical": prepared.canonical,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let variant = prepared
        .variant()
        .map(|v| format!(", variant {v}"))
        .unwrap_or_default();
    println!(
        "{} {} '{}' is valid (remote {version}{variant})",
        "OK".green().bold(),
        plan.resource,
        plan.id
    );
    for (name, value) in &prepared.canonical {
        if !value.is_absent() {
            println!("  {} = {}", name.cyan(), value);
        }
    }
    Ok(())
}

fn report_invalid(resource: &str, id: &str, error: &Error, json: bool) -> Result<()> {
    let messages: Vec<serde_json::Value> = match error.validation_errors() {
        [] => vec![json!({ "message": error.to_string() })],
        errors => errors
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<_, _>>()?,
    };

    if json {
        let output = json!({
            "valid": false,
            "resource": resource,
            "id": id,
            "errors": messages,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{} {resource} '{id}':", "Invalid".red().bold());
    match error.validation_errors() {
        [] => println!("  {} {error}", "!".red()),
        errors => {
            for e in errors {
                println!("  {} {}", "!".red(), e.message);
            }
        }
    }
    Ok(())
}
