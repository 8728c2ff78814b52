//! Scenario runner: builds dispatchers, connects listeners, fires values.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{FireSpec, ScenarioBlueprint};
use dispatcher::{ConnectOptions, Dispatcher, DispatcherBuilder};
use observability::{record_connection_count, record_fire_failure, record_fire_report};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use super::{ScenarioStats, ScriptedListener};

/// Scenario run configuration
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    /// Loaded and validated scenario
    pub blueprint: ScenarioBlueprint,
    /// Prometheus exporter port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Executes a scenario from start to finish
pub struct ScenarioRunner {
    config: ScenarioConfig,
}

impl ScenarioRunner {
    pub fn new(config: ScenarioConfig) -> Self {
        Self { config }
    }

    /// Run every fire in declaration order
    ///
    /// Listener failures are recorded and the run continues with the next
    /// fire. Every dispatcher is destroyed before returning.
    #[instrument(name = "scenario_run", skip(self))]
    pub async fn run(&self) -> Result<ScenarioStats> {
        let started = Instant::now();

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
        }

        let blueprint = &self.config.blueprint;
        let dispatchers = build_dispatchers(blueprint)?;

        let mut stats = ScenarioStats {
            dispatchers: dispatchers.len(),
            listeners: blueprint.listener_count(),
            ..ScenarioStats::default()
        };

        info!(
            dispatchers = stats.dispatchers,
            listeners = stats.listeners,
            fires = blueprint.fire_count(),
            "Scenario ready"
        );

        for fire in &blueprint.fires {
            let dispatcher = dispatchers
                .get(&fire.dispatcher)
                .with_context(|| format!("Unknown dispatcher '{}'", fire.dispatcher))?;
            for round in 0..fire.repeat {
                debug!(dispatcher = %fire.dispatcher, round, "Firing");
                execute_fire(dispatcher, fire, &mut stats).await;
            }
        }

        for dispatcher in dispatchers.values() {
            if let Err(e) = dispatcher.destroy() {
                warn!(dispatcher = %dispatcher.name(), error = %e, "Failed to destroy dispatcher");
            }
        }

        stats.duration = started.elapsed();
        info!(
            fires = stats.fire_stats.total_fires(),
            failed = stats.fire_stats.failed,
            duration_ms = stats.duration.as_millis() as u64,
            "Scenario finished"
        );

        Ok(stats)
    }
}

fn build_dispatchers(
    blueprint: &ScenarioBlueprint,
) -> Result<HashMap<String, Dispatcher<String>>> {
    let mut dispatchers = HashMap::with_capacity(blueprint.dispatchers.len());

    for spec in &blueprint.dispatchers {
        let dispatcher =
            DispatcherBuilder::from_config(spec.to_dispatcher_config()).build::<String>();

        for listener in &spec.listeners {
            let mut options = ConnectOptions::new(listener.priority).name(&listener.name);
            if listener.once {
                options = options.once();
            }
            dispatcher
                .connect_with(
                    options,
                    ScriptedListener::new(&spec.name, listener.clone()),
                )
                .with_context(|| {
                    format!(
                        "Failed to connect listener '{}' to dispatcher '{}'",
                        listener.name, spec.name
                    )
                })?;
        }

        record_connection_count(&spec.name, dispatcher.connection_count());
        dispatchers.insert(spec.name.clone(), dispatcher);
    }

    Ok(dispatchers)
}

async fn execute_fire(
    dispatcher: &Dispatcher<String>,
    fire: &FireSpec,
    stats: &mut ScenarioStats,
) {
    let canceller = fire
        .cancel_after_ms
        .map(|delay_ms| spawn_canceller(dispatcher.clone(), Duration::from_millis(delay_ms)));

    // Single-flight, so the counter delta belongs to this fire alone
    let invocations_before = dispatcher.metrics().listener_invocations();
    let result = dispatcher.fire(fire.payload.clone()).await;

    if let Some(canceller) = canceller {
        canceller.abort();
    }

    match result {
        Ok(report) => {
            info!(
                dispatcher = %dispatcher.name(),
                status = ?report.status,
                invoked = report.invoked,
                elapsed_ms = report.elapsed.as_secs_f64() * 1000.0,
                "Fire finished"
            );
            record_fire_report(dispatcher.name(), &report);
            stats.fire_stats.update(&report);
        }
        Err(e) => {
            error!(dispatcher = %dispatcher.name(), error = %e, "Fire failed");
            record_fire_failure(dispatcher.name(), &e);
            let invoked = dispatcher.metrics().listener_invocations() - invocations_before;
            stats.fire_stats.record_failure(dispatcher.name(), invoked as usize);
        }
    }

    record_connection_count(dispatcher.name(), dispatcher.connection_count());
}

fn spawn_canceller(dispatcher: Dispatcher<String>, delay: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        match dispatcher.cancel() {
            Ok(true) => info!(dispatcher = %dispatcher.name(), "Fire cancelled on schedule"),
            Ok(false) => debug!(dispatcher = %dispatcher.name(), "Fire already finished"),
            Err(e) => {
                warn!(dispatcher = %dispatcher.name(), error = %e, "Scheduled cancel rejected")
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{DispatcherSpec, ListenerAction, ListenerSpec, Priority};

    fn listener(name: &str, priority: f64, action: ListenerAction) -> ListenerSpec {
        ListenerSpec {
            name: name.to_string(),
            priority: Priority::new(priority),
            once: false,
            delay_ms: 0,
            action,
        }
    }

    fn fire(dispatcher: &str, payload: &str) -> FireSpec {
        FireSpec {
            dispatcher: dispatcher.to_string(),
            payload: payload.to_string(),
            cancel_after_ms: None,
            repeat: 1,
        }
    }

    fn runner(dispatchers: Vec<DispatcherSpec>, fires: Vec<FireSpec>) -> ScenarioRunner {
        ScenarioRunner::new(ScenarioConfig {
            blueprint: ScenarioBlueprint {
                version: Default::default(),
                dispatchers,
                fires,
            },
            metrics_port: None,
        })
    }

    #[tokio::test]
    async fn test_run_counts_outcomes() {
        let input = DispatcherSpec {
            name: "input".to_string(),
            cancellable: true,
            listeners: vec![
                listener("guard", 10.0, ListenerAction::CancelEvent),
                listener("audit", 0.0, ListenerAction::Log),
            ],
        };
        let output = DispatcherSpec {
            name: "output".to_string(),
            cancellable: true,
            listeners: vec![
                listener("broken", 5.0, ListenerAction::Fail),
                listener("never", 0.0, ListenerAction::Log),
            ],
        };

        let mut repeated = fire("input", "x");
        repeated.repeat = 2;
        let stats = runner(vec![input, output], vec![repeated, fire("output", "y")])
            .run()
            .await
            .unwrap();

        assert_eq!(stats.dispatchers, 2);
        assert_eq!(stats.listeners, 4);
        assert_eq!(stats.fire_stats.event_cancelled, 2);
        assert_eq!(stats.fire_stats.failed, 1);
        // Two cancelled fires plus the listener that failed
        assert_eq!(stats.fire_stats.listener_invocations, 3);
        assert_eq!(stats.fire_stats.failures_by_dispatcher.get("output"), Some(&1));
    }

    #[tokio::test]
    async fn test_scheduled_cancel_aborts_slow_fire() {
        let mut slow = listener("slow", 0.0, ListenerAction::Log);
        slow.delay_ms = 5_000;
        let input = DispatcherSpec {
            name: "input".to_string(),
            cancellable: true,
            listeners: vec![slow, listener("after", -1.0, ListenerAction::Log)],
        };
        let mut cancelled = fire("input", "x");
        cancelled.cancel_after_ms = Some(20);

        let stats = runner(vec![input], vec![cancelled]).run().await.unwrap();

        assert_eq!(stats.fire_stats.aborted, 1);
        assert_eq!(stats.fire_stats.listener_invocations, 1);
    }

    #[tokio::test]
    async fn test_once_listener_runs_a_single_time() {
        let mut first = listener("first", 1.0, ListenerAction::Log);
        first.once = true;
        let input = DispatcherSpec {
            name: "input".to_string(),
            cancellable: false,
            listeners: vec![first, listener("steady", 0.0, ListenerAction::Log)],
        };
        let mut repeated = fire("input", "x");
        repeated.repeat = 3;

        let stats = runner(vec![input], vec![repeated]).run().await.unwrap();

        assert_eq!(stats.fire_stats.completed, 3);
        assert_eq!(stats.fire_stats.listener_invocations, 4);
    }
}
