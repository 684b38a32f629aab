#![forbid(unsafe_code)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! Clicker — record a sequence of mouse/keyboard actions and replay it in a loop.
//!
//! This crate organizes the codebase into cohesive modules and exposes a convenient prelude
//! for downstream crates/binaries:
//! - `config`: Action data model, playback settings, template load/save and schema.
//! - `store`: The ordered, editable action sequence.
//! - `executor`: Input capability trait, Enigo backend and the playback engine.
//! - `journal`: Timestamped session log with export.
//! - `session`: Foreground owner tying store, engine and log together.
//!
//! Use `clicker::prelude::*` to bring commonly used items into scope quickly.

/// Public module: configuration (action model, settings, template loader).
pub mod config;
/// Public module: error taxonomy.
pub mod error;
/// Public module: execution (capability, Enigo backend, playback engine).
pub mod executor;
/// Public module: session log.
pub mod journal;
/// Public module: headless session façade.
pub mod session;
/// Public module: action store.
pub mod store;

pub use error::{DispatchError, Error, Result};

/// Crate-level constants for consumers that want to inspect package metadata at runtime.
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the crate version (e.g., "0.1.0").
#[inline]
pub const fn version() -> &'static str {
    PKG_VERSION
}

/// Parse a plain level name (trace|debug|info|warn|error).
pub fn parse_level(s: &str) -> Option<tracing::Level> {
    use tracing::Level;
    match s.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Initialize tracing (logging) with a reasonable default.
/// - Uses `level` when given, else honors the `RUST_LOG` environment variable.
/// - Falls back to `info` level.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init_tracing(level: Option<&str>) {
    use tracing_subscriber::fmt;

    let level = level
        .map(str::to_string)
        .or_else(|| std::env::var("RUST_LOG").ok())
        .and_then(|s| parse_level(&s))
        .unwrap_or(tracing::Level::INFO);

    // Ignore the error if the global subscriber was already set.
    let _ = fmt().with_max_level(level).try_init();
}

/// A convenient set of exports for most consumers.
///
/// Bring this into scope with:
/// `use clicker::prelude::*;`
pub mod prelude {
    // Common result/error handling
    pub use crate::error::{DispatchError, Error, Result};

    // Data model and sequence
    pub use crate::config::{Action, ActionKind, MouseButton, Rgb, SequenceConfig};
    pub use crate::store::{ActionStore, MoveDirection};

    // Playback
    pub use crate::executor::{
        ActionExecutor, EngineEvent, EngineOptions, InputCapability, PlaybackEngine, RunOutcome,
        RunSnapshot, RunStatus,
    };
    pub use crate::journal::LogBook;
    pub use crate::session::{PickedPoint, Session};

    // Tracing macros
    pub use tracing::{debug, error, info, trace, warn};

    // External crates (namespaced) if callers want direct access
    pub use crate as clicker;
    pub use enigo;
}
