//! Configuration module for Clicker.
//!
//! This module wires together the action data model, the global playback
//! settings and the template loading/saving helpers.
//!
//! Example:
//! use clicker::config::{load_from_path, SequenceConfig};
//!
//! let actions = load_from_path("templates/farm.json")?;
//! let cfg = SequenceConfig::new(0.5, 10)?;

pub mod loader;
pub mod models;

// Re-export core data models
pub use models::{Action, ActionKind, ColorProbe, MouseButton, Rgb, SequenceConfig};

// Re-export loader utilities
pub use loader::{
    generate_schema, load_from_path, load_from_path_async, load_from_reader, load_from_str,
    parse_template, save_to_path, to_string_pretty, validate_actions, write_schema_to_writer,
    write_to_writer,
};
