//! `run` command implementation.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::scenario::{ScenarioConfig, ScenarioRunner};

/// Execute the `run` command
pub async fn run_scenario(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading scenario");

    if !args.config.exists() {
        anyhow::bail!("Scenario file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load scenario from {}", args.config.display()))?;

    info!(
        dispatchers = blueprint.dispatchers.len(),
        listeners = blueprint.listener_count(),
        fires = blueprint.fire_count(),
        "Scenario loaded"
    );

    if args.dry_run {
        info!("Dry run mode - scenario is valid, exiting");
        print_scenario_summary(&blueprint);
        return Ok(());
    }

    let runner = ScenarioRunner::new(ScenarioConfig {
        blueprint,
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    });

    let shutdown_signal = setup_shutdown_signal();

    info!("Starting scenario...");

    tokio::select! {
        result = runner.run() => {
            let stats = result.context("Scenario execution failed")?;
            stats.print_summary();
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, stopping scenario...");
        }
    }

    info!("Signal Dispatch finished");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed never resolves, leaving the other one
/// in charge.
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print scenario summary for dry-run mode
fn print_scenario_summary(blueprint: &contracts::ScenarioBlueprint) {
    println!("\n=== Scenario Summary ===\n");
    println!("Dispatchers ({}):", blueprint.dispatchers.len());
    for dispatcher in &blueprint.dispatchers {
        println!(
            "  - {} ({} listeners, cancellable: {})",
            dispatcher.name,
            dispatcher.listeners.len(),
            dispatcher.cancellable
        );
    }

    println!("\nFires ({}):", blueprint.fire_count());
    for fire in &blueprint.fires {
        let mut line = format!("  - {} <- {:?}", fire.dispatcher, fire.payload);
        if fire.repeat > 1 {
            line.push_str(&format!(" x{}", fire.repeat));
        }
        if let Some(delay) = fire.cancel_after_ms {
            line.push_str(&format!(" (cancel after {}ms)", delay));
        }
        println!("{}", line);
    }

    println!();
}
