use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};

/// One recorded step of a sequence.
///
/// The step's kind and its fields live in [`ActionKind`]; `delay` optionally
/// overrides the global delay for this step only.
///
/// Serialized as a flat JSON object, e.g.:
/// `{ "type": "MouseClick", "x": 10, "y": 20, "button": "left", "delay": 0.5 }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Action {
    #[serde(flatten)]
    pub kind: ActionKind,

    /// Seconds to wait after this step (falls back to the global delay).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<f64>,
}

/// The closed set of step kinds.
///
/// `rgb` on a click or scroll is a guard: the pixel at the step's own
/// coordinates must match before the step is dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type")]
pub enum ActionKind {
    /// Move to `(x, y)` and click.
    MouseClick {
        x: i32,
        y: i32,
        button: MouseButton,
        #[serde(default)]
        double: bool,
        #[serde(default, alias = "color", skip_serializing_if = "Option::is_none")]
        rgb: Option<Rgb>,
    },

    /// Scroll by `amount` notches at `(x, y)`; positive scrolls up.
    Scroll {
        x: i32,
        y: i32,
        amount: i32,
        #[serde(default, alias = "color", skip_serializing_if = "Option::is_none")]
        rgb: Option<Rgb>,
    },

    /// Press and release a named key (e.g. "enter", "f5") or a single character.
    KeyPress { key: String },

    /// Wait until the pixel at `(x, y)` has color `rgb`. Dispatches nothing.
    ColorCondition {
        x: i32,
        y: i32,
        #[serde(alias = "color")]
        rgb: Rgb,
    },
}

/// Mouse button enumeration.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// An RGB color, serialized as `[r, g, b]`.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// A pixel check extracted from an action: guard or standalone condition.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ColorProbe {
    pub x: i32,
    pub y: i32,
    pub rgb: Rgb,
}

impl Action {
    pub fn new(kind: ActionKind) -> Self {
        Self { kind, delay: None }
    }

    pub fn click(x: i32, y: i32, button: MouseButton) -> Self {
        Self::new(ActionKind::MouseClick {
            x,
            y,
            button,
            double: false,
            rgb: None,
        })
    }

    pub fn double_click(x: i32, y: i32, button: MouseButton) -> Self {
        Self::new(ActionKind::MouseClick {
            x,
            y,
            button,
            double: true,
            rgb: None,
        })
    }

    pub fn scroll(x: i32, y: i32, amount: i32) -> Self {
        Self::new(ActionKind::Scroll {
            x,
            y,
            amount,
            rgb: None,
        })
    }

    pub fn key(key: impl Into<String>) -> Self {
        Self::new(ActionKind::KeyPress { key: key.into() })
    }

    pub fn color_condition(x: i32, y: i32, rgb: Rgb) -> Self {
        Self::new(ActionKind::ColorCondition { x, y, rgb })
    }

    /// Override the global delay for this step.
    #[must_use]
    pub fn with_delay(mut self, secs: f64) -> Self {
        self.delay = Some(secs);
        self
    }

    /// Guard a click or scroll with a pixel color. Other kinds are returned unchanged.
    #[must_use]
    pub fn guarded_by(mut self, color: Rgb) -> Self {
        match &mut self.kind {
            ActionKind::MouseClick { rgb, .. } | ActionKind::Scroll { rgb, .. } => {
                *rgb = Some(color);
            }
            ActionKind::KeyPress { .. } | ActionKind::ColorCondition { .. } => {}
        }
        self
    }

    /// Check the invariants every stored action must hold.
    pub fn validate(&self) -> Result<()> {
        match &self.kind {
            ActionKind::MouseClick { x, y, .. }
            | ActionKind::Scroll { x, y, .. }
            | ActionKind::ColorCondition { x, y, .. } => {
                if *x < 0 || *y < 0 {
                    return Err(Error::Validation(format!(
                        "coordinates ({x}, {y}) must be non-negative"
                    )));
                }
            }
            ActionKind::KeyPress { key } => {
                if key.trim().is_empty() {
                    return Err(Error::Validation("key cannot be empty".into()));
                }
            }
        }

        if let Some(delay) = self.delay {
            if !delay.is_finite() || delay < 0.0 {
                return Err(Error::Validation(format!(
                    "step delay {delay} must be a non-negative number of seconds"
                )));
            }
            if Duration::try_from_secs_f64(delay).is_err() {
                return Err(Error::Validation(format!(
                    "step delay {delay} is too large"
                )));
            }
        }
        Ok(())
    }

    /// The pixel check to satisfy before this step runs, if any.
    pub fn probe(&self) -> Option<ColorProbe> {
        match self.kind {
            ActionKind::MouseClick { x, y, rgb, .. } | ActionKind::Scroll { x, y, rgb, .. } => {
                rgb.map(|rgb| ColorProbe { x, y, rgb })
            }
            ActionKind::ColorCondition { x, y, rgb } => Some(ColorProbe { x, y, rgb }),
            ActionKind::KeyPress { .. } => None,
        }
    }

    /// This step's delay, falling back to `global`.
    ///
    /// A validated action's delay always converts.
    pub fn effective_delay(&self, global: Duration) -> Duration {
        self.delay
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or(global)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ActionKind::MouseClick {
                x,
                y,
                button,
                double,
                rgb,
            } => {
                let what = if *double { "Double click" } else { "Click" };
                write!(f, "{what} {button} at ({x}, {y})")?;
                if let Some(rgb) = rgb {
                    write!(f, " if color {rgb}")?;
                }
            }
            ActionKind::Scroll { x, y, amount, rgb } => {
                write!(f, "Scroll {amount} at ({x}, {y})")?;
                if let Some(rgb) = rgb {
                    write!(f, " if color {rgb}")?;
                }
            }
            ActionKind::KeyPress { key } => write!(f, "Key press '{key}'")?,
            ActionKind::ColorCondition { x, y, rgb } => {
                write!(f, "Wait for color {rgb} at ({x}, {y})")?;
            }
        }
        if let Some(delay) = self.delay {
            write!(f, ", delay {delay}s")?;
        }
        Ok(())
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MouseButton::Left => "left",
            MouseButton::Middle => "middle",
            MouseButton::Right => "right",
        })
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.0, self.1, self.2)
    }
}

/// Global playback settings.
///
/// Fields are private so an instance is always valid: the delay is a positive
/// duration and `loop_count == 0` means "repeat until stopped".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceConfig {
    global_delay: Duration,
    loop_count: u32,
}

impl SequenceConfig {
    /// Build a config, rejecting a non-positive or unrepresentable delay and a
    /// negative loop count.
    pub fn new(global_delay_secs: f64, loop_count: i64) -> Result<Self> {
        if !global_delay_secs.is_finite() || global_delay_secs <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "time delay must be a positive number, got {global_delay_secs}"
            )));
        }
        let global_delay = Duration::try_from_secs_f64(global_delay_secs)
            .ok()
            .filter(|d| !d.is_zero())
            .ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "time delay {global_delay_secs} is out of range"
                ))
            })?;
        if loop_count < 0 {
            return Err(Error::InvalidConfig(format!(
                "loop count cannot be negative, got {loop_count}"
            )));
        }
        let loop_count = u32::try_from(loop_count).map_err(|_| {
            Error::InvalidConfig(format!("loop count {loop_count} is too large"))
        })?;
        Ok(Self {
            global_delay,
            loop_count,
        })
    }

    pub fn global_delay_secs(&self) -> f64 {
        self.global_delay.as_secs_f64()
    }

    pub fn global_delay(&self) -> Duration {
        self.global_delay
    }

    pub fn loop_count(&self) -> u32 {
        self.loop_count
    }

    pub fn is_infinite(&self) -> bool {
        self.loop_count == 0
    }
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            global_delay: Duration::from_secs(1),
            loop_count: 0,
        }
    }
}
