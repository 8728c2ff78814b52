//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{DispatcherSpec, ListenerSpec, ScenarioBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Scenario info for JSON output
#[derive(Serialize)]
struct ScenarioInfo {
    version: String,
    dispatchers: Vec<DispatcherInfo>,
    fires: Vec<FireInfo>,
}

#[derive(Serialize)]
struct DispatcherInfo {
    name: String,
    cancellable: bool,
    listener_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    listeners: Vec<ListenerInfo>,
}

#[derive(Serialize)]
struct ListenerInfo {
    name: String,
    priority: String,
    once: bool,
    delay_ms: u64,
    action: String,
}

#[derive(Serialize)]
struct FireInfo {
    dispatcher: String,
    payload: String,
    repeat: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    cancel_after_ms: Option<u64>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading scenario info");

    if !args.config.exists() {
        anyhow::bail!("Scenario file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load scenario from {}", args.config.display()))?;

    if args.json {
        let info = build_scenario_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize scenario info")?;
        println!("{}", json);
    } else {
        print_scenario_info(&blueprint, args);
    }

    Ok(())
}

/// Listeners in the order a fire visits them
///
/// Stable sort keeps declaration order among equal priorities, matching how
/// the dispatcher inserts them.
fn firing_order(dispatcher: &DispatcherSpec) -> Vec<&ListenerSpec> {
    let mut listeners: Vec<_> = dispatcher.listeners.iter().collect();
    listeners.sort_by(|a, b| b.priority.cmp(&a.priority));
    listeners
}

fn build_scenario_info(blueprint: &ScenarioBlueprint, args: &InfoArgs) -> ScenarioInfo {
    let dispatchers = blueprint
        .dispatchers
        .iter()
        .map(|d| DispatcherInfo {
            name: d.name.clone(),
            cancellable: d.cancellable,
            listener_count: d.listeners.len(),
            listeners: if args.listeners {
                firing_order(d)
                    .into_iter()
                    .map(|l| ListenerInfo {
                        name: l.name.clone(),
                        priority: l.priority.to_string(),
                        once: l.once,
                        delay_ms: l.delay_ms,
                        action: format!("{:?}", l.action),
                    })
                    .collect()
            } else {
                Vec::new()
            },
        })
        .collect();

    let fires = blueprint
        .fires
        .iter()
        .map(|f| FireInfo {
            dispatcher: f.dispatcher.clone(),
            payload: f.payload.clone(),
            repeat: f.repeat,
            cancel_after_ms: f.cancel_after_ms,
        })
        .collect();

    ScenarioInfo {
        version: format!("{:?}", blueprint.version),
        dispatchers,
        fires,
    }
}

fn print_scenario_info(blueprint: &ScenarioBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 Signal Dispatch Scenario                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📄 Scenario");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Listeners: {}", blueprint.listener_count());
    println!("   └─ Fires: {}", blueprint.fire_count());

    println!("\n📡 Dispatchers ({})", blueprint.dispatchers.len());
    for (i, dispatcher) in blueprint.dispatchers.iter().enumerate() {
        let is_last = i == blueprint.dispatchers.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        let mode = if dispatcher.cancellable {
            "cancellable"
        } else {
            "non-cancellable"
        };
        println!("   {} {} ({})", prefix, dispatcher.name, mode);

        if args.listeners && !dispatcher.listeners.is_empty() {
            let ordered = firing_order(dispatcher);
            for (j, listener) in ordered.iter().enumerate() {
                let listener_prefix = if j == ordered.len() - 1 { "└─" } else { "├─" };
                let once = if listener.once { ", once" } else { "" };
                println!(
                    "   {}  {} {} (priority {}, {:?}{})",
                    child_prefix,
                    listener_prefix,
                    listener.name,
                    listener.priority,
                    listener.action,
                    once
                );
            }
        } else {
            println!(
                "   {}  └─ {} listeners",
                child_prefix,
                dispatcher.listeners.len()
            );
        }
    }

    if !blueprint.fires.is_empty() {
        println!("\n🔥 Fires ({})", blueprint.fires.len());
        for (i, fire) in blueprint.fires.iter().enumerate() {
            let prefix = if i == blueprint.fires.len() - 1 { "└─" } else { "├─" };
            println!(
                "   {} {} <- {:?} x{}",
                prefix, fire.dispatcher, fire.payload, fire.repeat
            );
        }
    }

    println!();
}
