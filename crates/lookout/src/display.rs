//! Frame presentation and cancellation polling.
//!
//! The display is behind a trait so the loop runs identically against a
//! real window (`display` feature, minifb) or headless.

use std::time::Duration;

use crate::error::DisplayError;
use crate::source::Frame;

/// Presents frames and polls for a quit input.
pub trait DisplaySink {
    /// Present a frame.
    fn show(&mut self, frame: &Frame) -> Result<(), DisplayError>;

    /// Block up to `timeout` waiting for a quit input. Returns `true`
    /// when the session should terminate.
    fn poll_cancel(&mut self, timeout: Duration) -> Result<bool, DisplayError>;
}

impl<D: DisplaySink + ?Sized> DisplaySink for Box<D> {
    fn show(&mut self, frame: &Frame) -> Result<(), DisplayError> {
        (**self).show(frame)
    }

    fn poll_cancel(&mut self, timeout: Duration) -> Result<bool, DisplayError> {
        (**self).poll_cancel(timeout)
    }
}

/// Display that discards frames; cancellation never triggers. Keeps the
/// loop timing comparable to a windowed run by sleeping out the poll.
#[derive(Debug, Default)]
pub struct HeadlessDisplay;

impl DisplaySink for HeadlessDisplay {
    fn show(&mut self, _frame: &Frame) -> Result<(), DisplayError> {
        Ok(())
    }

    fn poll_cancel(&mut self, timeout: Duration) -> Result<bool, DisplayError> {
        std::thread::sleep(timeout);
        Ok(false)
    }
}

#[cfg(feature = "display")]
pub use self::window::WindowDisplay;

#[cfg(feature = "display")]
mod window {
    use std::time::{Duration, Instant};

    use minifb::{Key, Window, WindowOptions};
    use tracing::info;

    use super::DisplaySink;
    use crate::error::DisplayError;
    use crate::source::Frame;

    /// minifb-backed window. Quit on window close, `Q`, or Escape.
    pub struct WindowDisplay {
        window: Window,
        // Reused packed 0RGB buffer
        buffer: Vec<u32>,
        width: usize,
        height: usize,
    }

    impl WindowDisplay {
        pub fn open(title: &str, width: usize, height: usize) -> Result<Self, DisplayError> {
            let window = Window::new(title, width, height, WindowOptions::default())
                .map_err(|e| DisplayError::Open(e.to_string()))?;

            info!("Opened display window {}x{}", width, height);

            Ok(Self {
                window,
                buffer: vec![0u32; width * height],
                width,
                height,
            })
        }

        fn quit_requested(&self) -> bool {
            !self.window.is_open()
                || self.window.is_key_down(Key::Q)
                || self.window.is_key_down(Key::Escape)
        }
    }

    impl DisplaySink for WindowDisplay {
        fn show(&mut self, frame: &Frame) -> Result<(), DisplayError> {
            let (w, h) = (frame.width() as usize, frame.height() as usize);
            if (w, h) != (self.width, self.height) {
                self.buffer.resize(w * h, 0);
                self.width = w;
                self.height = h;
            }

            // RGB8 -> packed 0RGB
            for (dst, rgb) in self.buffer.iter_mut().zip(frame.as_raw().chunks_exact(3)) {
                *dst = (u32::from(rgb[0]) << 16) | (u32::from(rgb[1]) << 8) | u32::from(rgb[2]);
            }

            self.window
                .update_with_buffer(&self.buffer, w, h)
                .map_err(|e| DisplayError::Present(e.to_string()))
        }

        fn poll_cancel(&mut self, timeout: Duration) -> Result<bool, DisplayError> {
            let deadline = Instant::now() + timeout;
            loop {
                self.window.update();
                if self.quit_requested() {
                    return Ok(true);
                }
                let now = Instant::now();
                if now >= deadline {
                    return Ok(false);
                }
                std::thread::sleep((deadline - now).min(Duration::from_millis(5)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_never_cancels() {
        let mut display = HeadlessDisplay;
        let frame = Frame::solid(0, 4, 4, [0, 0, 0]);
        display.show(&frame).unwrap();
        assert!(!display.poll_cancel(Duration::from_millis(1)).unwrap());
    }
}
