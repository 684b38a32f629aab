#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

/*!
Executor module for Clicker.

This module wires together:
- `capability`: the `InputCapability` trait the playback engine drives
- `actions`: the Enigo-backed capability (mouse, keyboard, pointer, pixel sampling)
- `runtime`: the `PlaybackEngine`, which loops a sequence on a background thread

Typical usage:
- Wrap a capability in `Arc<Mutex<_>>` and create an event channel.
- Construct a `PlaybackEngine` and call `start` with a store snapshot.
- Drain `EngineEvent`s on the foreground; call `request_stop` to end the run.

Example:
```no_run
use std::sync::{Arc, Mutex};
use clicker::config::{Action, MouseButton, SequenceConfig};
use clicker::executor::{ActionExecutor, EngineOptions, PlaybackEngine};

let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
let exec = Arc::new(Mutex::new(ActionExecutor::new(true))); // dry-run mode
let mut engine = PlaybackEngine::new(exec, EngineOptions::default(), tx);
let steps: Arc<[Action]> = Arc::from(vec![Action::click(10, 10, MouseButton::Left)]);
engine.start(steps, &SequenceConfig::new(0.5, 3)?)?;
while let Some(event) = rx.blocking_recv() {
    println!("{event:?}");
}
# Ok::<(), clicker::Error>(())
```
*/

pub mod actions;
pub mod capability;
pub mod runtime;

// Re-exports for convenient access from `clicker::executor::*`
pub use actions::ActionExecutor;
pub use capability::InputCapability;
pub use runtime::{
    EngineEvent, EngineOptions, LogLine, PlaybackEngine, RunOutcome, RunSnapshot, RunStatus,
    StopHandle,
};
