use crate::application::ports::SyncPassRunner;
use crate::domain::entities::SyncPassOutcome;
use crate::shared::config::SyncConfig;
use crate::shared::error::AppError;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerCommand {
    /// Run a pass as soon as the current one (if any) finishes.
    RunNow,
    /// Restart the countdown with the given delay.
    Reschedule(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleIntervals {
    pub steady: Duration,
    pub retry: Duration,
}

impl ScheduleIntervals {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            steady: config.sync_interval(),
            retry: config.retry_delay(),
        }
    }
}

/// Delay before the next timer-driven pass.
///
/// Retryable failures bring the next pass forward to their backoff; an
/// aborted pass is retried after `retry`; anything else waits `steady`.
pub fn delay_after(
    result: &Result<SyncPassOutcome, AppError>,
    intervals: ScheduleIntervals,
) -> Duration {
    match result {
        Ok(SyncPassOutcome::Completed { report }) => report
            .retry_after
            .map(|delay| delay.min(intervals.steady))
            .unwrap_or(intervals.steady),
        Ok(SyncPassOutcome::Skipped { .. }) => intervals.steady,
        Err(_) => intervals.retry,
    }
}

struct RunningScheduler {
    commands: mpsc::UnboundedSender<SchedulerCommand>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Single cancellable timer that drives periodic sync passes.
pub struct SyncScheduler {
    runner: Arc<dyn SyncPassRunner>,
    intervals: ScheduleIntervals,
    running: Mutex<Option<RunningScheduler>>,
}

impl SyncScheduler {
    pub fn new(runner: Arc<dyn SyncPassRunner>, intervals: ScheduleIntervals) -> Self {
        Self {
            runner,
            intervals,
            running: Mutex::new(None),
        }
    }

    pub fn intervals(&self) -> ScheduleIntervals {
        self.intervals
    }

    /// Launches the background task. Returns `false` if it is already running.
    pub fn start(&self, initial_delay: Duration) -> bool {
        let mut guard = match self.running.lock() {
            Ok(guard) => guard,
            Err(_) => return false,
        };
        if guard
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
        {
            return false;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_loop(
            Arc::clone(&self.runner),
            self.intervals,
            rx,
            cancel.clone(),
            initial_delay,
        ));

        tracing::info!(
            target: "sync::scheduler",
            initial_delay_ms = initial_delay.as_millis() as u64,
            steady_ms = self.intervals.steady.as_millis() as u64,
            retry_ms = self.intervals.retry.as_millis() as u64,
            "sync scheduler started"
        );

        *guard = Some(RunningScheduler {
            commands: tx,
            cancel,
            handle,
        });
        true
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .map(|guard| {
                guard
                    .as_ref()
                    .is_some_and(|running| !running.handle.is_finished())
            })
            .unwrap_or(false)
    }

    pub fn trigger_now(&self) -> bool {
        self.send(SchedulerCommand::RunNow)
    }

    pub fn reschedule(&self, delay: Duration) -> bool {
        self.send(SchedulerCommand::Reschedule(delay))
    }

    /// Cancels the timer and waits for an in-flight pass to settle.
    pub async fn shutdown(&self) {
        let running = match self.running.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        let Some(running) = running else {
            return;
        };

        running.cancel.cancel();
        if let Err(err) = running.handle.await {
            if !err.is_cancelled() {
                tracing::error!(
                    target: "sync::scheduler",
                    error = %err,
                    "sync scheduler task failed"
                );
            }
        }
        tracing::info!(target: "sync::scheduler", "sync scheduler stopped");
    }

    /// A sender the connectivity callback can use without holding the scheduler.
    pub fn command_sender(&self) -> Option<mpsc::UnboundedSender<SchedulerCommand>> {
        self.running
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|running| running.commands.clone()))
    }

    fn send(&self, command: SchedulerCommand) -> bool {
        match self.command_sender() {
            Some(sender) => sender.send(command).is_ok(),
            None => false,
        }
    }
}

async fn run_loop(
    runner: Arc<dyn SyncPassRunner>,
    intervals: ScheduleIntervals,
    mut commands: mpsc::UnboundedReceiver<SchedulerCommand>,
    cancel: CancellationToken,
    initial_delay: Duration,
) {
    let mut delay = initial_delay;

    loop {
        let run = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            command = commands.recv() => match command {
                Some(SchedulerCommand::RunNow) => true,
                Some(SchedulerCommand::Reschedule(next)) => {
                    delay = next;
                    false
                }
                None => break,
            },
            _ = tokio::time::sleep(delay) => true,
        };

        if !run {
            continue;
        }

        let result = runner.run_pass().await;
        match &result {
            Ok(SyncPassOutcome::Completed { report }) => tracing::debug!(
                target: "sync::scheduler",
                pass_id = %report.pass_id,
                failed = report.failed,
                "scheduled pass completed"
            ),
            Ok(SyncPassOutcome::Skipped { reason }) => tracing::debug!(
                target: "sync::scheduler",
                reason = ?reason,
                "scheduled pass skipped"
            ),
            Err(err) => tracing::error!(
                target: "sync::scheduler",
                error = %err,
                "scheduled pass aborted"
            ),
        }
        delay = delay_after(&result, intervals);

        // Collapse triggers that piled up while the pass was running into one.
        while let Ok(command) = commands.try_recv() {
            match command {
                SchedulerCommand::RunNow => delay = Duration::ZERO,
                SchedulerCommand::Reschedule(next) => delay = next,
            }
        }

        tracing::debug!(
            target: "sync::scheduler",
            next_in_ms = delay.as_millis() as u64,
            "next pass scheduled"
        );
    }
}
