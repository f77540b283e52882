//! # Controller
//! Runs one collect → analyze → generate → apply → report cycle per trigger.
//!
//! State machine:
//! `Idle → Collecting → Analyzing → Generating → Applying → Reporting → Idle`,
//! with `Aborted` reachable from every stage before `Reporting`. Reporting
//! problems never abort a cycle. Nothing is carried from one cycle to the next.

use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::analyze::{Analyzer, MetricsSummary};
use crate::collect::Collector;
use crate::config::AppConfig;
use crate::error::{CycleAborted, PipelineError};
use crate::optimize::{executor, ApplyReport, Optimizer, Strategy};
use crate::report::{ReportOutcome, Reporter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Collecting,
    Analyzing,
    Generating,
    Applying,
    Reporting,
    Aborted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Idle => "idle",
            Stage::Collecting => "collecting",
            Stage::Analyzing => "analyzing",
            Stage::Generating => "generating",
            Stage::Applying => "applying",
            Stage::Reporting => "reporting",
            Stage::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Started,
    Ok,
    /// Finished with recoverable failures (a source, a strategy, a sink).
    Degraded,
    Failed,
}

/// One edge of the state machine, with the time spent in `from`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageTransition {
    pub from: Stage,
    pub to: Stage,
    pub status: StageStatus,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleOutcome {
    pub cycle_id: String,
    pub summary: MetricsSummary,
    pub strategies: Vec<Strategy>,
    pub apply: ApplyReport,
    pub report: ReportOutcome,
    pub transitions: Vec<StageTransition>,
    pub final_stage: Stage,
    pub duration_ms: u64,
}

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("cycles_total", "Optimization cycles started.");
        describe_counter!("cycles_aborted_total", "Cycles that ended in Aborted.");
        describe_counter!("strategies_applied_total", "Strategies applied successfully.");
        describe_counter!("strategies_failed_total", "Strategies whose side effect failed.");
        describe_counter!("report_failures_total", "Report sink failures.");
        describe_histogram!("cycle_duration_ms", "End-to-end cycle time in milliseconds.");
        describe_gauge!("cycle_last_run_ts", "Unix ts when the last cycle finished.");
    });
}

static CYCLE_SEQ: AtomicU64 = AtomicU64::new(1);

/// Timestamp plus a process-wide sequence, unique even within one millisecond.
fn next_cycle_id() -> String {
    let seq = CYCLE_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("cycle-{}-{seq}", Utc::now().format("%Y%m%dT%H%M%S%.3fZ"))
}

/// Per-run bookkeeping; dropped when the run ends.
struct RunTrace {
    cycle_id: String,
    current: Stage,
    entered: Instant,
    transitions: Vec<StageTransition>,
}

impl RunTrace {
    fn new(cycle_id: String) -> Self {
        Self {
            cycle_id,
            current: Stage::Idle,
            entered: Instant::now(),
            transitions: Vec::new(),
        }
    }

    fn advance(&mut self, to: Stage, status: StageStatus, error: Option<String>) {
        let duration_ms = self.entered.elapsed().as_millis() as u64;
        let t = StageTransition {
            from: self.current,
            to,
            status,
            duration_ms,
            error,
        };
        match status {
            StageStatus::Failed => tracing::error!(
                cycle_id = %self.cycle_id,
                stage = %t.from,
                next = %t.to,
                status = ?t.status,
                duration_ms,
                error = t.error.as_deref().unwrap_or_default(),
                "stage failed"
            ),
            StageStatus::Degraded => tracing::warn!(
                cycle_id = %self.cycle_id,
                stage = %t.from,
                next = %t.to,
                status = ?t.status,
                duration_ms,
                error = t.error.as_deref().unwrap_or_default(),
                "stage degraded"
            ),
            _ => tracing::info!(
                cycle_id = %self.cycle_id,
                stage = %t.from,
                next = %t.to,
                status = ?t.status,
                duration_ms,
                "stage transition"
            ),
        }
        self.transitions.push(t);
        self.current = to;
        self.entered = Instant::now();
    }

    fn abort(mut self, error: PipelineError) -> CycleAborted {
        let stage = self.current;
        self.advance(Stage::Aborted, StageStatus::Failed, Some(error.to_string()));
        counter!("cycles_aborted_total", "stage" => stage.to_string()).increment(1);
        CycleAborted {
            cycle_id: self.cycle_id,
            stage,
            error,
            transitions: self.transitions,
        }
    }
}

/// `Degraded` with the joined messages when any recoverable error occurred.
fn degraded_if_any<'a>(
    errors: impl IntoIterator<Item = &'a PipelineError>,
) -> (StageStatus, Option<String>) {
    let messages: Vec<String> = errors.into_iter().map(ToString::to_string).collect();
    if messages.is_empty() {
        (StageStatus::Ok, None)
    } else {
        (StageStatus::Degraded, Some(messages.join("; ")))
    }
}

pub struct Controller {
    collector: Collector,
    analyzer: Analyzer,
    optimizer: Optimizer,
    reporter: Reporter,
}

impl Controller {
    pub fn new(collector: Collector, optimizer: Optimizer, reporter: Reporter) -> Self {
        Self {
            collector,
            analyzer: Analyzer::new(),
            optimizer,
            reporter,
        }
    }

    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let collector = Collector::from_config(cfg)?;
        let exec = executor::from_config(&cfg.executor)?;
        let optimizer = Optimizer::from_config(&cfg.optimizer, exec);
        let reporter = Reporter::from_config(&cfg.reporter);
        tracing::info!(
            sources = ?collector.source_names(),
            sinks = ?reporter.sink_names(),
            "controller ready"
        );
        Ok(Self::new(collector, optimizer, reporter))
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Runs exactly one full cycle.
    pub async fn run_cycle(&self) -> Result<CycleOutcome, CycleAborted> {
        ensure_metrics_described();
        counter!("cycles_total").increment(1);
        let started = Instant::now();
        let cycle_id = next_cycle_id();
        let mut trace = RunTrace::new(cycle_id.clone());

        trace.advance(Stage::Collecting, StageStatus::Started, None);
        let collection = match self.collector.collect().await {
            Ok(c) => c,
            Err(e) => return Err(trace.abort(e)),
        };
        let (status, detail) = degraded_if_any(collection.failures());
        trace.advance(Stage::Analyzing, status, detail);

        let summary = match self.analyzer.analyze(&collection) {
            Ok(s) => s,
            Err(e) => return Err(trace.abort(e)),
        };
        tracing::info!(cycle_id = %cycle_id, metrics = ?summary, "calculated performance metrics");
        trace.advance(Stage::Generating, StageStatus::Ok, None);

        let strategies = self.optimizer.generate(&summary);
        tracing::info!(
            cycle_id = %cycle_id,
            count = strategies.len(),
            top = %strategies.first().map(Strategy::label).unwrap_or_default(),
            "generated optimization strategies"
        );
        trace.advance(Stage::Applying, StageStatus::Ok, None);

        let apply = self.optimizer.apply(&strategies).await;
        let (status, detail) = degraded_if_any(apply.failed.iter().map(|f| &f.error));
        trace.advance(Stage::Reporting, status, detail);

        let report = self.reporter.report(&cycle_id, &summary, &strategies).await;
        let (status, detail) = degraded_if_any(&report.failed);
        trace.advance(Stage::Idle, status, detail);

        let duration_ms = started.elapsed().as_millis() as u64;
        histogram!("cycle_duration_ms").record(duration_ms as f64);
        gauge!("cycle_last_run_ts").set(Utc::now().timestamp() as f64);

        Ok(CycleOutcome {
            cycle_id,
            summary,
            strategies,
            apply,
            report,
            transitions: trace.transitions,
            final_stage: trace.current,
            duration_ms,
        })
    }
}
