use crate::config::{MouseButton, Rgb};
use crate::error::DispatchError;

/// The input-injection and screen-reading facility the playback engine drives.
///
/// Implementations are moved onto the playback thread, hence `Send`. Every
/// method reports failure as a [`DispatchError`]; the engine decides whether a
/// failure ends the run (see [`DispatchError::is_fatal`]).
pub trait InputCapability: Send {
    /// Move to `(x, y)` and click `button` once, or twice when `double`.
    fn click(&mut self, x: i32, y: i32, button: MouseButton, double: bool)
    -> Result<(), DispatchError>;

    /// Scroll vertically by `amount` notches at `(x, y)`; positive scrolls up.
    fn scroll(&mut self, x: i32, y: i32, amount: i32) -> Result<(), DispatchError>;

    /// Press and release the named key.
    fn press_key(&mut self, name: &str) -> Result<(), DispatchError>;

    /// Read the color of the screen pixel at `(x, y)`.
    fn pixel_color_at(&mut self, x: i32, y: i32) -> Result<Rgb, DispatchError>;

    /// Current pointer position.
    fn cursor_position(&mut self) -> Result<(i32, i32), DispatchError>;

    /// Read the pixel for a color check expecting `expected`.
    ///
    /// Defaults to [`pixel_color_at`](Self::pixel_color_at). Backends that
    /// cannot observe the screen in a given mode may answer with `expected`.
    fn sample_guard(&mut self, x: i32, y: i32, expected: Rgb) -> Result<Rgb, DispatchError> {
        let _ = expected;
        self.pixel_color_at(x, y)
    }
}
