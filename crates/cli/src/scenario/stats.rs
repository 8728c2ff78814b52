//! Scenario statistics.

use std::time::Duration;

use observability::FireStatsAggregator;

/// Statistics from a scenario run
#[derive(Debug, Clone, Default)]
pub struct ScenarioStats {
    /// Dispatchers built from the scenario
    pub dispatchers: usize,

    /// Listeners connected across all dispatchers
    pub listeners: usize,

    /// Total duration of the run
    pub duration: Duration,

    /// Per-fire outcomes
    pub fire_stats: FireStatsAggregator,
}

impl ScenarioStats {
    /// Fires per second over the whole run
    pub fn fire_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.fire_stats.total_fires() as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Scenario Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.3}s", self.duration.as_secs_f64());
        println!("   ├─ Dispatchers: {}", self.dispatchers);
        println!("   ├─ Listeners: {}", self.listeners);
        println!("   └─ Fires/s: {:.2}", self.fire_rate());

        let summary = self.fire_stats.summary();

        println!("\n📈 Fires ({})", summary.total_fires);
        println!("   ├─ Completed: {}", summary.completed);
        println!("   ├─ Event cancelled: {}", summary.event_cancelled);
        println!("   ├─ Aborted: {}", summary.aborted);
        println!(
            "   ├─ Failed: {} ({:.2}%)",
            summary.failed, summary.failure_rate
        );
        println!("   ├─ Listener invocations: {}", summary.listener_invocations);
        println!("   └─ Duration (ms): {}", summary.duration_ms);

        if !summary.failures_by_dispatcher.is_empty() {
            println!("\n⚠️  Failures by Dispatcher");
            let mut failures: Vec<_> = summary.failures_by_dispatcher.iter().collect();
            failures.sort();
            for (dispatcher, count) in failures {
                println!("   ├─ {}: {}", dispatcher, count);
            }
        }

        println!();
    }
}
