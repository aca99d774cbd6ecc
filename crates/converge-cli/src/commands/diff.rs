//! Diff command implementation
//!
//! Previews what a reconciliation pass would send. With recorded state this
//! is the in-place update (or the replacement it requires); without it, the
//! create request.

use std::path::Path;

use colored::Colorize;
use converge_core::{AddRequest, ConfigurationObject, Operation, OperationKind, UpdatePlan};
use converge_core::{pipeline, request};
use converge_schema::{ProductVersion, ResourceSchema};
use serde_json::json;

use crate::context::{Context, read_object};
use crate::error::{CliError, Result};

/// Run the diff command
pub fn run_diff(
    ctx: &Context,
    plan_path: &Path,
    state_path: Option<&Path>,
    remote_version: Option<ProductVersion>,
    json: bool,
) -> Result<()> {
    let plan = read_object(plan_path)?;
    let schema = ctx.schema(&plan.resource)?;
    let version = ctx.config.version(remote_version)?;

    let Some(state_path) = state_path else {
        if schema.is_edit_only() {
            return Err(CliError::user(format!(
                "{} is edit-only and is never created; pass --state with its current remote state",
                schema.name
            )));
        }
        let prepared = pipeline::prepare(&plan, schema, &version)?;
        let request =
            request::build_add_request(&plan.id, prepared.variant(), &prepared.canonical, schema)?;
        if json {
            let output = json!({
                "has_changes": true,
                "action": "create",
                "resource": plan.resource,
                "request": request,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print_create(schema, &request);
        }
        return Ok(());
    };

    let state = read_object(state_path)?;
    if state.resource != plan.resource {
        return Err(CliError::user(format!(
            "plan is a {} but state is a {}",
            plan.resource, state.resource
        )));
    }

    let update = pipeline::plan_update(&plan, &state, schema, &version)?;
    if json {
        let output = json!({
            "has_changes": !update.is_empty(),
            "resource": plan.resource,
            "id": state.id,
            "plan": update,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_update(schema, &state, &update);
    }
    Ok(())
}

fn print_create(schema: &ResourceSchema, request: &AddRequest) {
    let variant = request
        .discriminant
        .as_deref()
        .map(|v| format!(" ({v})"))
        .unwrap_or_default();
    println!(
        "  {} {}",
        "+".green(),
        format!("create {} '{}'{variant}", schema.name, request.id).green()
    );
    for (name, value) in &request.attributes {
        println!("      {} = {}", name.cyan(), value);
    }
}

fn print_update(schema: &ResourceSchema, state: &ConfigurationObject, update: &UpdatePlan) {
    match update {
        UpdatePlan::NoChanges => {
            println!(
                "{} No changes. {} '{}' is up to date.",
                "OK".green().bold(),
                schema.name,
                state.id
            );
        }
        UpdatePlan::InPlace(operations) => {
            println!(
                "{} {} '{}'",
                "Diff".blue().bold(),
                schema.name.yellow(),
                state.id
            );
            println!();
            for op in operations {
                print_operation(op);
            }
            println!();
            println!("{} operation(s) in one update request.", operations.len());
        }
        UpdatePlan::Replace(reasons) => {
            println!(
                "{} {} '{}' must be replaced:",
                "!".red().bold(),
                schema.name,
                state.id
            );
            for reason in reasons {
                println!("  {} {reason}", "-".red());
            }
            if schema.is_edit_only() {
                println!();
                println!(
                    "{}",
                    "Edit-only objects cannot be replaced; this plan would be rejected.".red()
                );
            }
        }
    }
}

fn print_operation(op: &Operation) {
    let line = op.to_string();
    match op.kind {
        OperationKind::AddValues => println!("  {} {}", "+".green(), line.green()),
        OperationKind::RemoveValues | OperationKind::RemoveAll => {
            println!("  {} {}", "-".red(), line.red())
        }
        OperationKind::Replace => println!("  {} {}", "~".yellow(), line.yellow()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::write_json;
    use tempfile::TempDir;

    const CURRENT: Option<ProductVersion> = Some(ProductVersion::new(9, 3, 0, 0));

    fn setup() -> (TempDir, Context) {
        let dir = TempDir::new().unwrap();
        let ctx = Context::load(dir.path()).unwrap();
        (dir, ctx)
    }

    #[test]
    fn test_diff_without_state_creates() {
        let (dir, ctx) = setup();
        let plan = write_json(
            dir.path(),
            "plan.json",
            json!({
                "resource": "local_db_index",
                "id": {"parents": ["userRoot"], "key": "uid"},
                "attributes": {"index_type": ["equality"]},
            }),
        );

        assert!(run_diff(&ctx, &plan, None, CURRENT, false).is_ok());
        assert!(run_diff(&ctx, &plan, None, CURRENT, true).is_ok());
    }

    #[test]
    fn test_diff_edit_only_requires_state() {
        let (dir, ctx) = setup();
        let plan = write_json(dir.path(), "plan.json", json!({"resource": "global_configuration"}));

        let result = run_diff(&ctx, &plan, None, CURRENT, false);
        assert!(matches!(result, Err(CliError::User { .. })));
    }

    #[test]
    fn test_diff_against_state() {
        let (dir, ctx) = setup();
        let plan = write_json(
            dir.path(),
            "plan.json",
            json!({
                "resource": "request_criteria",
                "id": {"key": "both"},
                "discriminant": "aggregate",
                "attributes": {"all_included_request_criteria": ["c1", "c2"]},
            }),
        );
        let state = write_json(
            dir.path(),
            "state.json",
            json!({
                "resource": "request_criteria",
                "id": {"key": "both"},
                "discriminant": "aggregate",
                "attributes": {"all_included_request_criteria": ["c1"]},
            }),
        );

        assert!(run_diff(&ctx, &plan, Some(&state), CURRENT, false).is_ok());
        assert!(run_diff(&ctx, &plan, Some(&state), CURRENT, true).is_ok());
    }

    #[test]
    fn test_diff_resource_mismatch() {
        let (dir, ctx) = setup();
        let plan = write_json(
            dir.path(),
            "plan.json",
            json!({"resource": "request_criteria", "id": {"key": "c1"}, "discriminant": "simple"}),
        );
        let state = write_json(dir.path(), "state.json", json!({"resource": "global_configuration"}));

        let result = run_diff(&ctx, &plan, Some(&state), CURRENT, false);
        assert!(matches!(result, Err(CliError::User { .. })));
    }
}
