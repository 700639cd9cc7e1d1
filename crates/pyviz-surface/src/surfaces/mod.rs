pub mod console;
pub mod sim;

use pyviz_lang::Rgb;

use crate::surface::{DrawCall, DrawSurface, SurfaceError};

pub use console::ConsoleSurface;
pub use sim::SimSurface;

// ─── CallLog ─────────────────────────────────────────────────────────────────

/// Records every call. Used to compare recordings with replays.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallLog {
    pub calls: Vec<DrawCall>,
}

impl CallLog {
    pub fn new() -> Self { Self::default() }

    pub fn commits(&self) -> usize {
        self.calls.iter().filter(|c| **c == DrawCall::Commit).count()
    }

    /// Calls grouped by frame, without the commits themselves. Calls after
    /// the last commit form no frame.
    pub fn frames(&self) -> Vec<Vec<DrawCall>> {
        let mut frames = Vec::new();
        let mut current = Vec::new();
        for call in &self.calls {
            match call {
                DrawCall::Commit => frames.push(std::mem::take(&mut current)),
                DrawCall::Cleanup => {}
                other => current.push(other.clone()),
            }
        }
        frames
    }
}

impl DrawSurface for CallLog {
    fn clear(&mut self, color: Rgb) -> Result<(), SurfaceError> {
        self.calls.push(DrawCall::Clear(color));
        Ok(())
    }

    fn rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgb) -> Result<(), SurfaceError> {
        self.calls.push(DrawCall::Rect { x, y, w, h, color });
        Ok(())
    }

    fn text(&mut self, x: i32, y: i32, text: &str, color: Rgb) -> Result<(), SurfaceError> {
        self.calls.push(DrawCall::Text { x, y, text: text.to_string(), color });
        Ok(())
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: Rgb) -> Result<(), SurfaceError> {
        self.calls.push(DrawCall::Pixel { x, y, color });
        Ok(())
    }

    fn commit(&mut self) -> Result<(), SurfaceError> {
        self.calls.push(DrawCall::Commit);
        Ok(())
    }

    fn cleanup(&mut self) -> Result<(), SurfaceError> {
        self.calls.push(DrawCall::Cleanup);
        Ok(())
    }
}

// ─── NullSurface ─────────────────────────────────────────────────────────────

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSurface;

impl DrawSurface for NullSurface {
    fn clear(&mut self, _: Rgb) -> Result<(), SurfaceError> { Ok(()) }
    fn rect(&mut self, _: i32, _: i32, _: i32, _: i32, _: Rgb) -> Result<(), SurfaceError> { Ok(()) }
    fn text(&mut self, _: i32, _: i32, _: &str, _: Rgb) -> Result<(), SurfaceError> { Ok(()) }
    fn set_pixel(&mut self, _: i32, _: i32, _: Rgb) -> Result<(), SurfaceError> { Ok(()) }
    fn commit(&mut self) -> Result<(), SurfaceError> { Ok(()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_log_frames() {
        let mut log = CallLog::new();
        log.clear(Rgb::BLACK).unwrap();
        log.commit().unwrap();
        log.set_pixel(1, 2, Rgb::WHITE).unwrap();
        log.text(0, 0, "tail", Rgb::WHITE).unwrap();
        log.commit().unwrap();
        log.rect(0, 0, 1, 1, Rgb::WHITE).unwrap();

        assert_eq!(log.commits(), 2);
        let frames = log.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], vec![DrawCall::Clear(Rgb::BLACK)]);
        assert_eq!(frames[1].len(), 2);
    }

    #[test]
    fn boxed_surfaces_forward() {
        let mut log = CallLog::new();
        {
            let mut boxed: Box<dyn DrawSurface + '_> = Box::new(&mut log);
            boxed.text(5, 6, "hi", Rgb::WHITE).unwrap();
            boxed.commit().unwrap();
        }
        assert_eq!(log.calls[0].name(), "text");
        assert_eq!(log.commits(), 1);
    }
}
