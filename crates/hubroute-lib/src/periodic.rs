//! Cancellable periodic background work.
//!
//! A [`PeriodicTask`] owns a tokio task that runs a closure on a fixed
//! interval until it is shut down. Shutting down waits for the task to exit,
//! so nothing keeps running after [`PeriodicTask::shutdown`] returns. Dropping
//! the handle without shutting down still signals the task to stop.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

#[derive(Debug)]
pub struct PeriodicTask {
    name: &'static str,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    /// Spawn `tick` on `runtime`, first firing one `period` from now.
    pub fn spawn<F>(runtime: &Handle, name: &'static str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => tick(),
                }
            }
            tracing::debug!(task = name, "periodic task exited");
        });

        tracing::debug!(task = name, period_ms = period.as_millis() as u64, "periodic task started");

        Self {
            name,
            stop: Some(stop_tx),
            task: Some(task),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Signal the task to stop and wait for it to finish.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                if err.is_panic() {
                    tracing::error!(task = self.name, "periodic task panicked");
                }
            }
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}
