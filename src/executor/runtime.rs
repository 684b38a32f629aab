use chrono::{DateTime, Local};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{Level, debug, info, trace, warn};

use crate::config::{Action, ActionKind, SequenceConfig};
use crate::error::{DispatchError, Error, Result};
use crate::executor::capability::InputCapability;

/// Longest uninterrupted sleep; stop requests are noticed within this bound.
const WAIT_SLICE: Duration = Duration::from_millis(50);

/// Shortest pause between two reads of a pixel that did not match yet.
///
/// An unmatched check is sampled again after the step's effective delay, but
/// never sooner than this.
pub const COLOR_POLL_MIN: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Idle,
    Running,
    Stopping,
}

/// Read-only view of the engine's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSnapshot {
    pub status: RunStatus,
    /// Step currently highlighted, if a pass is in progress.
    pub current_index: Option<usize>,
    pub loops_completed: u32,
}

impl RunSnapshot {
    const IDLE: Self = Self {
        status: RunStatus::Idle,
        current_index: None,
        loops_completed: 0,
    };
}

impl Default for RunSnapshot {
    fn default() -> Self {
        Self::IDLE
    }
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// A stop was requested.
    Stopped,
    /// All requested loops were played.
    Completed,
    /// The input backend became unusable.
    Aborted,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunOutcome::Stopped => "stopped",
            RunOutcome::Completed => "completed",
            RunOutcome::Aborted => "aborted",
        })
    }
}

/// One user-facing log line produced by the playback thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub at: DateTime<Local>,
    pub level: Level,
    pub message: String,
}

/// Messages published by the playback thread to the foreground.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Log(LogLine),
    /// Step to highlight; `None` clears the highlight.
    Highlight(Option<usize>),
    Status(RunSnapshot),
    Finished {
        outcome: RunOutcome,
        loops_completed: u32,
    },
}

/// Tunables that are not part of a recorded sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Pause between two passes over the sequence.
    pub inter_loop_pause: Duration,
    /// When false every wait is skipped (step delays, color polls, pauses).
    pub paced: bool,
}

impl EngineOptions {
    /// Options that skip all waits, for deterministic tests and benchmarks.
    pub fn unpaced() -> Self {
        Self {
            inter_loop_pause: Duration::ZERO,
            paced: false,
        }
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            inter_loop_pause: Duration::from_millis(100),
            paced: true,
        }
    }
}

/// State shared between the engine handle and its playback thread.
#[derive(Debug)]
struct Shared {
    stop: AtomicBool,
    snapshot: Mutex<RunSnapshot>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, RunSnapshot> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn request_stop(&self) -> bool {
        let mut snap = self.lock();
        if snap.status == RunStatus::Running {
            snap.status = RunStatus::Stopping;
            self.stop.store(true, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

/// Cloneable handle that can request a stop from any thread.
#[derive(Debug, Clone)]
pub struct StopHandle {
    shared: Arc<Shared>,
}

impl StopHandle {
    /// Same as [`PlaybackEngine::request_stop`].
    pub fn request_stop(&self) -> bool {
        self.shared.request_stop()
    }
}

/// Plays an action sequence against an [`InputCapability`] on one background thread.
///
/// State machine: `Idle -> Running -> (Idle | Stopping -> Idle)`. Progress,
/// highlight changes and log lines are published as [`EngineEvent`]s; the
/// engine never writes foreground state directly.
pub struct PlaybackEngine<C> {
    capability: Arc<Mutex<C>>,
    options: EngineOptions,
    events: UnboundedSender<EngineEvent>,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl<C: InputCapability + 'static> PlaybackEngine<C> {
    pub fn new(
        capability: Arc<Mutex<C>>,
        options: EngineOptions,
        events: UnboundedSender<EngineEvent>,
    ) -> Self {
        Self {
            capability,
            options,
            events,
            shared: Arc::new(Shared {
                stop: AtomicBool::new(false),
                snapshot: Mutex::new(RunSnapshot::IDLE),
            }),
            worker: None,
        }
    }

    /// The capability this engine drives (shared with the playback thread).
    pub fn capability(&self) -> &Arc<Mutex<C>> {
        &self.capability
    }

    pub fn snapshot(&self) -> RunSnapshot {
        *self.shared.lock()
    }

    pub fn status(&self) -> RunStatus {
        self.snapshot().status
    }

    /// True while a playback thread owns the sequence (`Running` or `Stopping`).
    pub fn is_active(&self) -> bool {
        self.status() != RunStatus::Idle
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Start playing `actions` on a new background thread.
    ///
    /// Does nothing if a run is already active.
    pub fn start(&mut self, actions: Arc<[Action]>, config: &SequenceConfig) -> Result<()> {
        if actions.is_empty() {
            return Err(Error::EmptySequence);
        }

        {
            let mut snap = self.shared.lock();
            if snap.status != RunStatus::Idle {
                debug!(target: "clicker::engine", status = ?snap.status, "start ignored; run already active");
                return Ok(());
            }
            *snap = RunSnapshot {
                status: RunStatus::Running,
                ..RunSnapshot::IDLE
            };
            self.shared.stop.store(false, Ordering::SeqCst);
        }

        // The previous thread has already marked itself Idle; reap it.
        if let Some(previous) = self.worker.take() {
            let _ = previous.join();
        }

        info!(
            target: "clicker::engine",
            steps = actions.len(),
            loops = config.loop_count(),
            delay_secs = config.global_delay_secs(),
            "Starting playback"
        );

        let worker = Worker {
            actions,
            global_delay: config.global_delay(),
            loop_count: config.loop_count(),
            options: self.options,
            capability: Arc::clone(&self.capability),
            shared: Arc::clone(&self.shared),
            events: self.events.clone(),
        };
        worker.publish_status();

        match thread::Builder::new()
            .name("clicker-playback".into())
            .spawn(move || worker.run())
        {
            Ok(handle) => {
                self.worker = Some(handle);
                Ok(())
            }
            Err(e) => {
                *self.shared.lock() = RunSnapshot::IDLE;
                Err(Error::Spawn(e))
            }
        }
    }

    /// Ask the running sequence to stop at its next checkpoint. Never blocks.
    ///
    /// Returns whether a stop was actually requested.
    pub fn request_stop(&self) -> bool {
        let requested = self.shared.request_stop();
        if requested {
            debug!(target: "clicker::engine", "Stop requested");
        }
        requested
    }

    /// Block until the current playback thread, if any, has exited.
    pub fn join(&mut self) {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!(target: "clicker::engine", "Playback thread panicked");
                *self.shared.lock() = RunSnapshot::IDLE;
            }
        }
    }
}

impl<C> Drop for PlaybackEngine<C> {
    fn drop(&mut self) {
        // Detached threads would keep injecting input after the owner is gone.
        self.shared.request_stop();
    }
}

/// Everything the playback thread owns.
struct Worker<C> {
    actions: Arc<[Action]>,
    global_delay: Duration,
    loop_count: u32,
    options: EngineOptions,
    capability: Arc<Mutex<C>>,
    shared: Arc<Shared>,
    events: UnboundedSender<EngineEvent>,
}

/// Result of trying to play one step.
enum Step {
    /// Move to the next step.
    Advance,
    /// Color did not match yet; evaluate the same step again.
    Retry,
    Abort,
}

impl<C: InputCapability> Worker<C> {
    fn run(self) {
        let mut exit_guard = IdleOnExit {
            shared: &self.shared,
            events: &self.events,
            armed: true,
        };
        let mut loops_completed = 0u32;

        let outcome = 'passes: loop {
            if self.stopped() {
                break RunOutcome::Stopped;
            }

            if self.loop_count > 0 {
                self.log(
                    Level::INFO,
                    format!("Starting loop {}/{}.", loops_completed + 1, self.loop_count),
                );
            } else {
                self.log(
                    Level::INFO,
                    format!("Starting loop #{} (infinite).", loops_completed + 1),
                );
            }

            let mut index = 0;
            while index < self.actions.len() {
                if self.stopped() {
                    break 'passes RunOutcome::Stopped;
                }
                self.highlight(Some(index));

                match self.play_step(index) {
                    Step::Advance => index += 1,
                    Step::Retry => {}
                    Step::Abort => break 'passes RunOutcome::Aborted,
                }
            }

            loops_completed += 1;
            self.update(|snap| snap.loops_completed = loops_completed);

            if self.loop_count > 0 && loops_completed >= self.loop_count {
                break RunOutcome::Completed;
            }
            if self.stopped() {
                break RunOutcome::Stopped;
            }
            self.wait(self.options.inter_loop_pause);
        };

        self.finish(outcome, loops_completed);
        exit_guard.armed = false;
    }

    fn play_step(&self, index: usize) -> Step {
        let action = &self.actions[index];
        let delay = action.effective_delay(self.global_delay);

        if let Some(probe) = action.probe() {
            match self.with_capability(|cap| cap.sample_guard(probe.x, probe.y, probe.rgb)) {
                Ok(observed) if observed == probe.rgb => {
                    trace!(target: "clicker::engine", index, %observed, "Color condition met");
                }
                Ok(observed) => {
                    self.log(
                        Level::DEBUG,
                        format!(
                            "Waiting at step {}: color at ({}, {}) is {observed}, expected {}.",
                            index + 1,
                            probe.x,
                            probe.y,
                            probe.rgb
                        ),
                    );
                    self.wait(delay.max(COLOR_POLL_MIN));
                    return Step::Retry;
                }
                Err(err) => return self.dispatch_failed(index, action, err, delay),
            }
        }

        let dispatched = self.with_capability(|cap| match &action.kind {
            ActionKind::MouseClick {
                x,
                y,
                button,
                double,
                ..
            } => cap.click(*x, *y, *button, *double),
            ActionKind::Scroll { x, y, amount, .. } => cap.scroll(*x, *y, *amount),
            ActionKind::KeyPress { key } => cap.press_key(key),
            ActionKind::ColorCondition { .. } => Ok(()),
        });

        match dispatched {
            Ok(()) => {
                if matches!(action.kind, ActionKind::ColorCondition { .. }) {
                    self.log(Level::INFO, format!("Condition met: {action}"));
                } else {
                    self.log(Level::INFO, format!("Executing: {action}"));
                }
                self.wait(delay);
                Step::Advance
            }
            Err(err) => self.dispatch_failed(index, action, err, delay),
        }
    }

    fn dispatch_failed(
        &self,
        index: usize,
        action: &Action,
        err: DispatchError,
        delay: Duration,
    ) -> Step {
        if err.is_fatal() {
            self.log(
                Level::ERROR,
                format!("Step {} ({action}) cannot run: {err}", index + 1),
            );
            return Step::Abort;
        }
        self.log(
            Level::WARN,
            format!("Step {} ({action}) failed: {err}", index + 1),
        );
        self.wait(delay);
        Step::Advance
    }

    fn finish(&self, outcome: RunOutcome, loops_completed: u32) {
        self.highlight(None);
        self.log(
            Level::INFO,
            format!(
                "Automation sequence finished ({outcome}, {loops_completed} loop(s) completed)."
            ),
        );
        self.update(|snap| {
            snap.status = RunStatus::Idle;
            snap.current_index = None;
        });
        self.send(EngineEvent::Finished {
            outcome,
            loops_completed,
        });
    }

    fn with_capability<T>(&self, f: impl FnOnce(&mut C) -> T) -> T {
        let mut cap = self.capability.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut cap)
    }

    fn stopped(&self) -> bool {
        self.shared.stop_requested()
    }

    /// Sleep in slices so a stop request cuts the wait short.
    fn wait(&self, duration: Duration) {
        if !self.options.paced || duration.is_zero() {
            return;
        }
        // A delay past the clock's range only ends with a stop request.
        let deadline = Instant::now().checked_add(duration);
        loop {
            if self.stopped() {
                return;
            }
            let slice = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return;
                    }
                    (deadline - now).min(WAIT_SLICE)
                }
                None => WAIT_SLICE,
            };
            thread::sleep(slice);
        }
    }

    fn highlight(&self, index: Option<usize>) {
        self.update(|snap| snap.current_index = index);
        self.send(EngineEvent::Highlight(index));
    }

    fn update(&self, f: impl FnOnce(&mut RunSnapshot)) {
        let snap = {
            let mut guard = self.shared.lock();
            f(&mut guard);
            *guard
        };
        self.send(EngineEvent::Status(snap));
    }

    fn publish_status(&self) {
        let snap = *self.shared.lock();
        self.send(EngineEvent::Status(snap));
    }

    fn log(&self, level: Level, message: String) {
        if level == Level::ERROR {
            tracing::error!(target: "clicker::engine", "{message}");
        } else if level == Level::WARN {
            warn!(target: "clicker::engine", "{message}");
        } else if level == Level::INFO {
            info!(target: "clicker::engine", "{message}");
        } else if level == Level::DEBUG {
            debug!(target: "clicker::engine", "{message}");
        } else {
            trace!(target: "clicker::engine", "{message}");
        }
        self.send(EngineEvent::Log(LogLine {
            at: Local::now(),
            level,
            message,
        }));
    }

    fn send(&self, event: EngineEvent) {
        if self.events.send(event).is_err() {
            trace!(target: "clicker::engine", "Event receiver dropped");
        }
    }
}

/// Puts the engine back to `Idle` if the playback thread unwinds before
/// `Worker::finish` has run.
struct IdleOnExit<'a> {
    shared: &'a Shared,
    events: &'a UnboundedSender<EngineEvent>,
    armed: bool,
}

impl Drop for IdleOnExit<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let snap = {
            let mut snap = self.shared.lock();
            snap.status = RunStatus::Idle;
            snap.current_index = None;
            *snap
        };
        tracing::error!(target: "clicker::engine", "Playback thread ended unexpectedly");
        let _ = self.events.send(EngineEvent::Highlight(None));
        let _ = self.events.send(EngineEvent::Status(snap));
        let _ = self.events.send(EngineEvent::Finished {
            outcome: RunOutcome::Aborted,
            loops_completed: snap.loops_completed,
        });
    }
}
