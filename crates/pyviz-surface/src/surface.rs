use std::io;

use pyviz_lang::Rgb;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("surface I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("surface is closed")]
    Closed,
    #[error("{0}")]
    Backend(String),
}

/// The drawing API shared by live rendering, recording and replay.
///
/// Coordinates are pixels with the origin at the top left, y down. Nothing
/// becomes visible until `commit` finishes the frame.
pub trait DrawSurface {
    fn clear(&mut self, color: Rgb) -> Result<(), SurfaceError>;

    fn rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgb) -> Result<(), SurfaceError>;

    fn text(&mut self, x: i32, y: i32, text: &str, color: Rgb) -> Result<(), SurfaceError>;

    fn set_pixel(&mut self, x: i32, y: i32, color: Rgb) -> Result<(), SurfaceError>;

    fn commit(&mut self) -> Result<(), SurfaceError>;

    /// Releases resources. Default: nothing to release.
    fn cleanup(&mut self) -> Result<(), SurfaceError> {
        Ok(())
    }
}

impl<S: DrawSurface + ?Sized> DrawSurface for &mut S {
    fn clear(&mut self, color: Rgb) -> Result<(), SurfaceError> { (**self).clear(color) }
    fn rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgb) -> Result<(), SurfaceError> {
        (**self).rect(x, y, w, h, color)
    }
    fn text(&mut self, x: i32, y: i32, text: &str, color: Rgb) -> Result<(), SurfaceError> {
        (**self).text(x, y, text, color)
    }
    fn set_pixel(&mut self, x: i32, y: i32, color: Rgb) -> Result<(), SurfaceError> {
        (**self).set_pixel(x, y, color)
    }
    fn commit(&mut self) -> Result<(), SurfaceError> { (**self).commit() }
    fn cleanup(&mut self) -> Result<(), SurfaceError> { (**self).cleanup() }
}

impl<S: DrawSurface + ?Sized> DrawSurface for Box<S> {
    fn clear(&mut self, color: Rgb) -> Result<(), SurfaceError> { (**self).clear(color) }
    fn rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgb) -> Result<(), SurfaceError> {
        (**self).rect(x, y, w, h, color)
    }
    fn text(&mut self, x: i32, y: i32, text: &str, color: Rgb) -> Result<(), SurfaceError> {
        (**self).text(x, y, text, color)
    }
    fn set_pixel(&mut self, x: i32, y: i32, color: Rgb) -> Result<(), SurfaceError> {
        (**self).set_pixel(x, y, color)
    }
    fn commit(&mut self) -> Result<(), SurfaceError> { (**self).commit() }
    fn cleanup(&mut self) -> Result<(), SurfaceError> { (**self).cleanup() }
}

// ─── Recorded calls ──────────────────────────────────────────────────────────

/// One call against a `DrawSurface`, as data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCall {
    Clear(Rgb),
    Rect { x: i32, y: i32, w: i32, h: i32, color: Rgb },
    Text { x: i32, y: i32, text: String, color: Rgb },
    Pixel { x: i32, y: i32, color: Rgb },
    Commit,
    Cleanup,
}

impl DrawCall {
    pub fn apply<S: DrawSurface + ?Sized>(&self, surface: &mut S) -> Result<(), SurfaceError> {
        match self {
            DrawCall::Clear(c) => surface.clear(*c),
            DrawCall::Rect { x, y, w, h, color } => surface.rect(*x, *y, *w, *h, *color),
            DrawCall::Text { x, y, text, color } => surface.text(*x, *y, text, *color),
            DrawCall::Pixel { x, y, color } => surface.set_pixel(*x, *y, *color),
            DrawCall::Commit => surface.commit(),
            DrawCall::Cleanup => surface.cleanup(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DrawCall::Clear(_) => "clear",
            DrawCall::Rect { .. } => "rect",
            DrawCall::Text { .. } => "text",
            DrawCall::Pixel { .. } => "set_pixel",
            DrawCall::Commit => "commit",
            DrawCall::Cleanup => "cleanup",
        }
    }
}
