//! Foreground owner of a clicking session.
//!
//! `Session` holds the action store, the playback settings, the engine and the
//! log. A front end (the CLI, or a GUI) calls its methods from one thread and
//! calls [`Session::pump`] on its own tick to fold engine events back in.

use chrono::{DateTime, Local};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info, warn};

use crate::config::{self, Action, Rgb, SequenceConfig};
use crate::error::{Error, Result};
use crate::executor::{
    EngineEvent, EngineOptions, InputCapability, PlaybackEngine, RunSnapshot, RunStatus,
};
use crate::journal::LogBook;
use crate::store::{ActionStore, MoveDirection};

/// Pointer position and the color under it, for filling in a new action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickedPoint {
    pub x: i32,
    pub y: i32,
    pub rgb: Option<Rgb>,
}

pub struct Session<C> {
    store: ActionStore,
    config: SequenceConfig,
    engine: PlaybackEngine<C>,
    events: UnboundedReceiver<EngineEvent>,
    log: LogBook,
    highlight: Option<usize>,
    snapshot: RunSnapshot,
}

impl<C: InputCapability + 'static> Session<C> {
    pub fn new(capability: C, options: EngineOptions) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        let engine = PlaybackEngine::new(Arc::new(Mutex::new(capability)), options, tx);
        Self {
            store: ActionStore::new(),
            config: SequenceConfig::default(),
            engine,
            events,
            log: LogBook::new(),
            highlight: None,
            snapshot: RunSnapshot::default(),
        }
    }

    pub fn store(&self) -> &ActionStore {
        &self.store
    }

    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SequenceConfig) {
        debug!(target: "clicker::session", ?config, "Config updated");
        self.config = config;
    }

    pub fn log(&self) -> &LogBook {
        &self.log
    }

    /// Step highlighted by the last pumped events.
    pub fn highlight(&self) -> Option<usize> {
        self.highlight
    }

    /// Run state as of the last pumped events.
    pub fn snapshot(&self) -> RunSnapshot {
        self.snapshot
    }

    /// Whether playback is active right now (not waiting for `pump`).
    pub fn is_running(&self) -> bool {
        self.engine.is_active()
    }

    /// Record a message in the session log.
    pub fn note(&mut self, message: impl Into<String>) {
        self.note_at(Local::now(), message);
    }

    fn note_at(&mut self, at: DateTime<Local>, message: impl Into<String>) {
        let message = message.into();
        info!(target: "clicker::session", "{message}");
        self.log.push_at(at, message);
    }

    pub fn add_action(&mut self, action: Action) -> Result<usize> {
        self.ensure_idle()?;
        let message = format!("Added action: {action}");
        let index = self.store.append(action)?;
        self.note(message);
        Ok(index)
    }

    pub fn remove_action(&mut self, index: usize) -> Result<Action> {
        self.ensure_idle()?;
        let removed = self.store.remove(index)?;
        self.note(format!("Removed action: {removed}"));
        Ok(removed)
    }

    pub fn move_action(&mut self, index: usize, direction: MoveDirection) -> Result<Option<usize>> {
        self.ensure_idle()?;
        let moved = self.store.move_action(index, direction)?;
        if moved.is_some() {
            let dir = match direction {
                MoveDirection::Up => "up",
                MoveDirection::Down => "down",
            };
            self.note(format!("Moved action {dir} at index {index}"));
        }
        Ok(moved)
    }

    /// Replace the sequence with a template file. On error nothing changes.
    pub fn load_template<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.ensure_idle()?;
        let path = path.as_ref();
        let outcome = config::load_from_path(path).and_then(|actions| self.store.replace_all(actions));
        match outcome {
            Ok(()) => {
                self.note(format!("Template loaded from {}", path.display()));
                Ok(())
            }
            Err(err) => {
                self.note(format!("Failed to load template: {err}"));
                Err(err)
            }
        }
    }

    /// Replace the sequence with actions already in memory.
    pub fn replace_actions(&mut self, actions: Vec<Action>) -> Result<()> {
        self.ensure_idle()?;
        let count = actions.len();
        self.store.replace_all(actions)?;
        self.note(format!("Sequence replaced with {count} action(s)"));
        Ok(())
    }

    pub fn save_template<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        match config::save_to_path(path, self.store.as_slice()) {
            Ok(()) => {
                self.note(format!("Template saved to {}", path.display()));
                Ok(())
            }
            Err(err) => {
                self.note(format!("Failed to save template: {err}"));
                Err(err)
            }
        }
    }

    pub fn export_log<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.log.export_to_path(path)?;
        self.note(format!("Log saved to {}", path.display()));
        Ok(())
    }

    pub fn clear_log_display(&mut self) {
        self.log.clear_display();
    }

    /// Start playing a snapshot of the current sequence.
    pub fn start(&mut self) -> Result<()> {
        if self.engine.is_active() {
            debug!(target: "clicker::session", "start ignored; already running");
            return Ok(());
        }
        self.pump();
        // Stamped before the worker exists so its first lines sort after it.
        let started_at = Local::now();
        match self.engine.start(self.store.snapshot(), &self.config) {
            Ok(()) => {
                let loops = match self.config.loop_count() {
                    0 => "infinite".to_string(),
                    n => n.to_string(),
                };
                self.note_at(started_at, format!("Automation started with {loops} loops."));
                Ok(())
            }
            Err(err) => {
                warn!(target: "clicker::session", error = %err, "Cannot start automation");
                self.log.push(format!("Cannot start automation: {err}"));
                Err(err)
            }
        }
    }

    /// Ask playback to stop; returns immediately.
    pub fn stop(&mut self) {
        if self.engine.status() != RunStatus::Running {
            return;
        }
        self.pump();
        let stopped_at = Local::now();
        if self.engine.request_stop() {
            self.note_at(stopped_at, "Automation stopped.");
        }
    }

    /// Start when idle, stop otherwise.
    pub fn toggle(&mut self) -> Result<()> {
        if self.engine.is_active() {
            self.stop();
            Ok(())
        } else {
            self.start()
        }
    }

    /// Fold pending engine events into the log, highlight and snapshot.
    ///
    /// Returns the number of events handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            handled += 1;
            match event {
                EngineEvent::Log(line) => self.log.push_at(line.at, line.message),
                EngineEvent::Highlight(index) => self.highlight = index,
                EngineEvent::Status(snapshot) => self.snapshot = snapshot,
                EngineEvent::Finished {
                    outcome,
                    loops_completed,
                } => {
                    debug!(target: "clicker::session", %outcome, loops_completed, "Playback finished");
                    self.highlight = None;
                }
            }
        }
        handled
    }

    /// Read the pointer position and the color beneath it.
    ///
    /// A failed color read still yields the position, with `rgb: None`.
    pub fn pick_at_cursor(&mut self) -> Result<PickedPoint> {
        let capability = Arc::clone(self.engine.capability());
        let mut cap = capability.lock().unwrap_or_else(PoisonError::into_inner);
        let (x, y) = cap.cursor_position()?;
        let rgb = match cap.pixel_color_at(x, y) {
            Ok(rgb) => Some(rgb),
            Err(err) => {
                debug!(target: "clicker::session", error = %err, "Color pick failed");
                None
            }
        };
        drop(cap);

        let picked = PickedPoint { x, y, rgb };
        match rgb {
            Some(rgb) => self.note(format!("Picked color at X={x}, Y={y}, Color={rgb}")),
            None => self.note(format!("Picked position X={x}, Y={y}")),
        }
        Ok(picked)
    }

    /// Stop playback, wait for the thread to exit and drain its last events.
    pub fn shutdown(&mut self) {
        self.stop();
        self.engine.join();
        self.pump();
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.engine.is_active() {
            Err(Error::Busy)
        } else {
            Ok(())
        }
    }
}
