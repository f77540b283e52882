// src/scheduler.rs
//! In-process trigger: runs one cycle per interval tick.
//!
//! Cycles never overlap. The scheduler and `POST /run` share one
//! `CycleGate`; a tick waits for a running cycle to finish.

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard, TryLockError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::controller::Controller;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "scheduler_aborted_ticks_total",
            "Scheduler ticks whose cycle ended in Aborted."
        );
    });
}

/// Guards are owned so a cycle can hold the gate from a spawned task.
#[derive(Clone, Default)]
pub struct CycleGate(Arc<Mutex<()>>);

impl CycleGate {
    pub async fn enter(&self) -> OwnedMutexGuard<()> {
        Arc::clone(&self.0).lock_owned().await
    }

    pub fn try_enter(&self) -> Result<OwnedMutexGuard<()>, TryLockError> {
        Arc::clone(&self.0).try_lock_owned()
    }
}

/// Run one gated cycle and log its result. Returns whether it completed.
pub async fn run_tick(controller: &Controller, gate: &CycleGate) -> bool {
    ensure_metrics_described();
    let _guard = gate.enter().await;
    match controller.run_cycle().await {
        Ok(out) => {
            tracing::info!(
                target: "scheduler",
                cycle_id = %out.cycle_id,
                strategies = out.strategies.len(),
                applied = out.apply.applied.len(),
                failed = out.apply.failed.len(),
                duration_ms = out.duration_ms,
                "cycle completed"
            );
            true
        }
        Err(aborted) => {
            counter!("scheduler_aborted_ticks_total").increment(1);
            tracing::error!(
                target: "scheduler",
                cycle_id = %aborted.cycle_id,
                stage = %aborted.stage,
                error = %aborted.error,
                "cycle aborted; waiting for next tick"
            );
            false
        }
    }
}

pub fn spawn_scheduler(
    controller: Arc<Controller>,
    gate: CycleGate,
    interval_secs: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            run_tick(&controller, &gate).await;
        }
    })
}
