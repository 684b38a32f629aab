use enigo::Keyboard as _;
use enigo::Mouse as _;
use enigo::{Axis, Button as EButton, Coordinate, Direction, Enigo, InputError, Key, Settings};
use tracing::{info, trace};

use super::capability::InputCapability;
use crate::config::models::{MouseButton as CMouseButton, Rgb};
use crate::error::DispatchError;

/// Enigo-backed input capability with optional dry-run mode.
/// In dry-run mode, calls are only logged and no real input is simulated.
pub struct ActionExecutor {
    dry_run: bool,
    enigo: Option<Enigo>,
}

impl ActionExecutor {
    /// Create a new executor.
    /// - dry_run: when true, only logs instead of simulating real input.
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            enigo: None,
        }
    }

    /// Returns whether the executor is currently in dry-run mode.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn ensure_enigo(&mut self) -> Result<&mut Enigo, DispatchError> {
        let enigo = match self.enigo.take() {
            Some(enigo) => enigo,
            None => {
                trace!(target: "clicker::actions", "Initializing Enigo");
                Enigo::new(&Settings::default()).map_err(|e| {
                    DispatchError::Unavailable(format!("failed to initialize Enigo: {e}"))
                })?
            }
        };
        Ok(self.enigo.insert(enigo))
    }
}

impl InputCapability for ActionExecutor {
    fn click(
        &mut self,
        x: i32,
        y: i32,
        button: CMouseButton,
        double: bool,
    ) -> Result<(), DispatchError> {
        let count = if double { 2 } else { 1 };
        if self.dry_run {
            info!(target: "clicker::actions", x, y, %button, count, "DRY-RUN click");
            return Ok(());
        }
        let enigo = self.ensure_enigo()?;
        trace!(target: "clicker::actions", x, y, %button, count, "click");
        enigo
            .move_mouse(x, y, Coordinate::Abs)
            .map_err(input_failed("move_mouse"))?;
        let btn = map_mouse_button(button);
        for _ in 0..count {
            enigo
                .button(btn, Direction::Click)
                .map_err(input_failed("button"))?;
        }
        Ok(())
    }

    fn scroll(&mut self, x: i32, y: i32, amount: i32) -> Result<(), DispatchError> {
        if self.dry_run {
            info!(target: "clicker::actions", x, y, amount, "DRY-RUN scroll");
            return Ok(());
        }
        let enigo = self.ensure_enigo()?;
        trace!(target: "clicker::actions", x, y, amount, "scroll");
        enigo
            .move_mouse(x, y, Coordinate::Abs)
            .map_err(input_failed("move_mouse"))?;
        enigo
            .scroll(wheel_length(amount), Axis::Vertical)
            .map_err(input_failed("scroll"))
    }

    fn press_key(&mut self, name: &str) -> Result<(), DispatchError> {
        let key = parse_key(name)
            .ok_or_else(|| DispatchError::failed(format!("unknown key '{name}'")))?;
        if self.dry_run {
            info!(target: "clicker::actions", %name, ?key, "DRY-RUN press_key");
            return Ok(());
        }
        let enigo = self.ensure_enigo()?;
        trace!(target: "clicker::actions", %name, ?key, "press_key");
        enigo
            .key(key, Direction::Click)
            .map_err(input_failed("key"))
    }

    fn pixel_color_at(&mut self, x: i32, y: i32) -> Result<Rgb, DispatchError> {
        if self.dry_run {
            info!(target: "clicker::actions", x, y, "DRY-RUN pixel_color_at");
            return Ok(Rgb(0, 0, 0));
        }
        trace!(target: "clicker::actions", x, y, "pixel_color_at");
        screen::pixel_at(x, y)
    }

    fn cursor_position(&mut self) -> Result<(i32, i32), DispatchError> {
        if self.dry_run {
            info!(target: "clicker::actions", "DRY-RUN cursor_position");
            return Ok((0, 0));
        }
        let enigo = self.ensure_enigo()?;
        enigo.location().map_err(input_failed("location"))
    }

    fn sample_guard(&mut self, x: i32, y: i32, expected: Rgb) -> Result<Rgb, DispatchError> {
        if self.dry_run {
            info!(target: "clicker::actions", x, y, %expected, "DRY-RUN color check (assumed match)");
            return Ok(expected);
        }
        self.pixel_color_at(x, y)
    }
}

/// Enigo scrolls down for positive lengths; recorded amounts scroll up.
fn wheel_length(amount: i32) -> i32 {
    amount.saturating_neg()
}

fn input_failed(op: &'static str) -> impl FnOnce(InputError) -> DispatchError {
    move |e| DispatchError::failed(format!("{op}: {e}"))
}

fn map_mouse_button(btn: CMouseButton) -> EButton {
    match btn {
        CMouseButton::Left => EButton::Left,
        CMouseButton::Middle => EButton::Middle,
        CMouseButton::Right => EButton::Right,
    }
}

/// Resolve a key name ("enter", "page_down", "f5", "ctrl") or a single
/// character to an Enigo key. Names are case-insensitive.
pub fn parse_key(name: &str) -> Option<Key> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(Key::Unicode(c));
    }

    let lower = name.trim().to_ascii_lowercase();
    let key = match lower.as_str() {
        "enter" | "return" => Key::Return,
        "space" => Key::Space,
        "tab" => Key::Tab,
        "esc" | "escape" => Key::Escape,
        "backspace" => Key::Backspace,
        "delete" | "del" => Key::Delete,
        "home" => Key::Home,
        "end" => Key::End,
        "page_up" | "pageup" => Key::PageUp,
        "page_down" | "pagedown" => Key::PageDown,
        "up" => Key::UpArrow,
        "down" => Key::DownArrow,
        "left" => Key::LeftArrow,
        "right" => Key::RightArrow,
        "shift" => Key::Shift,
        "ctrl" | "control" => Key::Control,
        "alt" => Key::Alt,
        "cmd" | "meta" | "super" | "win" => Key::Meta,
        "caps_lock" | "capslock" => Key::CapsLock,
        "f1" => Key::F1,
        "f2" => Key::F2,
        "f3" => Key::F3,
        "f4" => Key::F4,
        "f5" => Key::F5,
        "f6" => Key::F6,
        "f7" => Key::F7,
        "f8" => Key::F8,
        "f9" => Key::F9,
        "f10" => Key::F10,
        "f11" => Key::F11,
        "f12" => Key::F12,
        _ => return None,
    };
    Some(key)
}

#[cfg(feature = "screen")]
mod screen {
    use xcap::Monitor;

    use crate::config::Rgb;
    use crate::error::DispatchError;

    /// Capture the monitor under `(x, y)` and read one pixel from it.
    pub(super) fn pixel_at(x: i32, y: i32) -> Result<Rgb, DispatchError> {
        let capture = |e: xcap::XCapError| DispatchError::failed(format!("screen capture: {e}"));

        let monitor = Monitor::from_point(x, y).map_err(capture)?;
        let origin_x = monitor.x().map_err(capture)?;
        let origin_y = monitor.y().map_err(capture)?;
        let image = monitor.capture_image().map_err(capture)?;

        let out_of_bounds = || DispatchError::failed(format!("({x}, {y}) is outside the screen"));
        let local_x = u32::try_from(x - origin_x).map_err(|_| out_of_bounds())?;
        let local_y = u32::try_from(y - origin_y).map_err(|_| out_of_bounds())?;
        let pixel = image
            .get_pixel_checked(local_x, local_y)
            .ok_or_else(out_of_bounds)?;
        Ok(Rgb(pixel[0], pixel[1], pixel[2]))
    }
}

#[cfg(not(feature = "screen"))]
mod screen {
    use tracing::warn;

    use crate::config::Rgb;
    use crate::error::DispatchError;

    pub(super) fn pixel_at(x: i32, y: i32) -> Result<Rgb, DispatchError> {
        warn!(
            target: "clicker::actions",
            x, y,
            "pixel sampling needs the `screen` feature; color checks cannot be evaluated"
        );
        Err(DispatchError::Unsupported("pixel sampling"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_named_and_single_char_keys() {
        assert_eq!(parse_key("a"), Some(Key::Unicode('a')));
        assert_eq!(parse_key("A"), Some(Key::Unicode('A')));
        assert_eq!(parse_key("Enter"), Some(Key::Return));
        assert_eq!(parse_key("page_down"), Some(Key::PageDown));
        assert_eq!(parse_key("F5"), Some(Key::F5));
        assert_eq!(parse_key("esc"), Some(Key::Escape));
        assert_eq!(parse_key("hyperdrive"), None);
    }

    #[test]
    fn wheel_length_flips_sign_without_overflow() {
        assert_eq!(wheel_length(3), -3);
        assert_eq!(wheel_length(-2), 2);
        assert_eq!(wheel_length(i32::MIN), i32::MAX);
    }

    #[test]
    fn dry_run_never_touches_enigo() {
        let mut exec = ActionExecutor::new(true);
        assert!(exec.is_dry_run());
        exec.click(10, 10, CMouseButton::Left, true).unwrap();
        exec.scroll(1, 2, -3).unwrap();
        exec.press_key("enter").unwrap();
        assert_eq!(exec.cursor_position().unwrap(), (0, 0));
        assert!(exec.enigo.is_none());
    }

    #[test]
    fn dry_run_assumes_color_checks_pass() {
        let mut exec = ActionExecutor::new(true);
        assert_eq!(exec.sample_guard(5, 5, Rgb(1, 2, 3)).unwrap(), Rgb(1, 2, 3));
    }

    #[test]
    fn unknown_key_fails_even_in_dry_run() {
        let mut exec = ActionExecutor::new(true);
        let err = exec.press_key("hyperdrive").unwrap_err();
        assert!(matches!(err, DispatchError::Failed(_)));
    }

    #[cfg(not(feature = "screen"))]
    #[test]
    fn pixel_sampling_unsupported_without_feature() {
        let mut exec = ActionExecutor::new(false);
        assert_eq!(
            exec.pixel_color_at(0, 0),
            Err(DispatchError::Unsupported("pixel sampling"))
        );
    }
}
