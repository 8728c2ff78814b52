//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ScenarioSummary>,
}

#[derive(Serialize)]
struct ScenarioSummary {
    version: String,
    dispatcher_count: usize,
    listener_count: usize,
    fire_count: u64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating scenario");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Scenario validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ScenarioSummary {
                    version: format!("{:?}", blueprint.version),
                    dispatcher_count: blueprint.dispatchers.len(),
                    listener_count: blueprint.listener_count(),
                    fire_count: blueprint.fire_count(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect non-fatal issues
fn collect_warnings(blueprint: &contracts::ScenarioBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.fires.is_empty() {
        warnings.push("No fires configured - listeners will never run".to_string());
    }

    for dispatcher in &blueprint.dispatchers {
        if dispatcher.listeners.is_empty() {
            warnings.push(format!(
                "Dispatcher '{}' has no listeners",
                dispatcher.name
            ));
        }
        if !blueprint.fires.iter().any(|f| f.dispatcher == dispatcher.name) {
            warnings.push(format!("Dispatcher '{}' is never fired", dispatcher.name));
        }
        if !dispatcher.cancellable {
            for listener in &dispatcher.listeners {
                if listener.action == contracts::ListenerAction::CancelEvent {
                    warnings.push(format!(
                        "Listener '{}' cancels events but dispatcher '{}' is not cancellable",
                        listener.name, dispatcher.name
                    ));
                }
            }
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Scenario is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Dispatchers: {}", summary.dispatcher_count);
            println!("  Listeners: {}", summary.listener_count);
            println!("  Fires: {}", summary.fire_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Scenario is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
