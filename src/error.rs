use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure the library can surface to a caller.
///
/// Store and configuration errors are returned synchronously and never leave
/// partial state behind. `Dispatch` only reaches a caller through direct
/// capability use (e.g. the cursor picker); during playback the engine logs
/// dispatch failures and keeps going.
#[derive(Debug, Error)]
pub enum Error {
    /// An action carries values that break its own invariants.
    #[error("invalid action: {0}")]
    Validation(String),

    /// A template document could not be decoded.
    #[error("malformed template: {0}")]
    Format(String),

    #[error("index {index} is out of range for a sequence of {len} action(s)")]
    IndexOutOfRange { index: usize, len: usize },

    /// Bad global delay or loop count.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("the action sequence is empty")]
    EmptySequence,

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The sequence cannot be edited while playback is active.
    #[error("playback is running; stop it before editing the sequence")]
    Busy,

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to spawn playback thread: {0}")]
    Spawn(#[source] io::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failure reported by an input/display capability.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// The call was attempted and failed; playback continues.
    #[error("dispatch failed: {0}")]
    Failed(String),

    /// The backend cannot perform this kind of call at all.
    #[error("{0} is not supported by this input backend")]
    Unsupported(&'static str),

    /// The backend itself is gone; playback cannot continue.
    #[error("input backend unavailable: {0}")]
    Unavailable(String),
}

impl DispatchError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    /// Whether a run must end when this error is observed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
