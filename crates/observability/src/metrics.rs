//! Dispatcher 指标收集模块
//!
//! 基于 FireReport 收集和统计分发器的运行指标。

use std::collections::HashMap;

use dispatcher::{DispatcherError, FireReport, FireStatus};
use metrics::{counter, gauge, histogram};

fn status_label(status: FireStatus) -> &'static str {
    match status {
        FireStatus::Completed => "completed",
        FireStatus::EventCancelled => "event_cancelled",
        FireStatus::Aborted => "aborted",
    }
}

/// 从 FireReport 记录指标
///
/// 每次 fire 成功返回时调用。
///
/// # Example
///
/// ```ignore
/// let report = dispatcher.fire(value).await?;
/// record_fire_report(dispatcher.name(), &report);
/// ```
pub fn record_fire_report(dispatcher: &str, report: &FireReport) {
    counter!(
        "signal_dispatch_fires_total",
        "dispatcher" => dispatcher.to_string(),
        "status" => status_label(report.status)
    )
    .increment(1);

    counter!(
        "signal_dispatch_listener_invocations_total",
        "dispatcher" => dispatcher.to_string()
    )
    .increment(report.invoked as u64);

    histogram!(
        "signal_dispatch_fire_duration_ms",
        "dispatcher" => dispatcher.to_string()
    )
    .record(report.elapsed.as_secs_f64() * 1000.0);
}

/// 记录 fire 失败 (监听器错误或用法错误)
pub fn record_fire_failure(dispatcher: &str, error: &DispatcherError) {
    let kind = if error.is_usage_error() {
        "usage"
    } else {
        "listener"
    };
    counter!(
        "signal_dispatch_fire_failures_total",
        "dispatcher" => dispatcher.to_string(),
        "kind" => kind
    )
    .increment(1);
}

/// 记录当前连接数
pub fn record_connection_count(dispatcher: &str, count: usize) {
    gauge!(
        "signal_dispatch_connections",
        "dispatcher" => dispatcher.to_string()
    )
    .set(count as f64);
}

/// Fire 指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct FireStatsAggregator {
    /// 各状态计数
    pub completed: u64,
    pub event_cancelled: u64,
    pub aborted: u64,
    pub failed: u64,

    /// 监听器调用总数
    pub listener_invocations: u64,

    /// 耗时统计 (毫秒)
    pub duration_stats: RunningStats,

    /// 各 dispatcher 的失败次数
    pub failures_by_dispatcher: HashMap<String, u64>,
}

impl FireStatsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次成功返回的 fire
    pub fn update(&mut self, report: &FireReport) {
        match report.status {
            FireStatus::Completed => self.completed += 1,
            FireStatus::EventCancelled => self.event_cancelled += 1,
            FireStatus::Aborted => self.aborted += 1,
        }
        self.listener_invocations += report.invoked as u64;
        self.duration_stats
            .push(report.elapsed.as_secs_f64() * 1000.0);
    }

    /// 记录一次失败的 fire
    ///
    /// `invoked` 为失败前已启动的监听器数 (含失败者)。
    pub fn record_failure(&mut self, dispatcher: &str, invoked: usize) {
        self.failed += 1;
        self.listener_invocations += invoked as u64;
        *self
            .failures_by_dispatcher
            .entry(dispatcher.to_string())
            .or_insert(0) += 1;
    }

    pub fn total_fires(&self) -> u64 {
        self.completed + self.event_cancelled + self.aborted + self.failed
    }

    /// 生成摘要报告
    pub fn summary(&self) -> FireStatsSummary {
        let total = self.total_fires();
        FireStatsSummary {
            total_fires: total,
            completed: self.completed,
            event_cancelled: self.event_cancelled,
            aborted: self.aborted,
            failed: self.failed,
            listener_invocations: self.listener_invocations,
            failure_rate: if total > 0 {
                self.failed as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            duration_ms: StatsSummary::from(&self.duration_stats),
            failures_by_dispatcher: self.failures_by_dispatcher.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct FireStatsSummary {
    pub total_fires: u64,
    pub completed: u64,
    pub event_cancelled: u64,
    pub aborted: u64,
    pub failed: u64,
    pub listener_invocations: u64,
    pub failure_rate: f64,
    pub duration_ms: StatsSummary,
    pub failures_by_dispatcher: HashMap<String, u64>,
}

impl std::fmt::Display for FireStatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Fire Summary ===")?;
        writeln!(f, "Total fires: {}", self.total_fires)?;
        writeln!(f, "Completed: {}", self.completed)?;
        writeln!(f, "Event cancelled: {}", self.event_cancelled)?;
        writeln!(f, "Aborted: {}", self.aborted)?;
        writeln!(f, "Failed: {} ({:.2}%)", self.failed, self.failure_rate)?;
        writeln!(f, "Listener invocations: {}", self.listener_invocations)?;
        writeln!(f, "Duration (ms): {}", self.duration_ms)?;

        if !self.failures_by_dispatcher.is_empty() {
            writeln!(f, "Failures by dispatcher:")?;
            let mut failures: Vec<_> = self.failures_by_dispatcher.iter().collect();
            failures.sort();
            for (dispatcher, count) in failures {
                writeln!(f, "  {}: {}", dispatcher, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
