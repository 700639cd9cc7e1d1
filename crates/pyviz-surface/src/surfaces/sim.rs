//! Headless frame-buffer surface.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use pyviz_lang::{BACKGROUND, Rgb};
use tracing::debug;

use crate::surface::{DrawSurface, SurfaceError};

/// A text call kept beside the pixels; the buffer has no font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextOverlay {
    pub x: i32,
    pub y: i32,
    pub text: String,
    pub color: Rgb,
}

/// A committed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub index: u64,
    pub pixels: Vec<Rgb>,
    pub texts: Vec<TextOverlay>,
}

/// Rasterizes into a `width × height` RGB buffer with clipping. Every commit
/// snapshots the buffer and, when an output directory is set, writes it as
/// `frame_NNNNN.ppm` (binary P6). Pixels persist across frames until the
/// next `clear`; the text overlay starts empty each frame.
pub struct SimSurface {
    width: usize,
    height: usize,
    pixels: Vec<Rgb>,
    texts: Vec<TextOverlay>,
    out_dir: Option<PathBuf>,
    index: u64,
    last: Option<Frame>,
}

impl SimSurface {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![BACKGROUND; width * height],
            texts: Vec::new(),
            out_dir: None,
            index: 0,
            last: None,
        }
    }

    pub fn with_out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.out_dir = Some(dir.into());
        self
    }

    pub fn width(&self) -> usize { self.width }

    pub fn height(&self) -> usize { self.height }

    pub fn frames_committed(&self) -> u64 { self.index }

    pub fn last_frame(&self) -> Option<&Frame> { self.last.as_ref() }

    /// Pixel of the frame being drawn.
    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgb> {
        (x < self.width && y < self.height).then(|| self.pixels[y * self.width + x])
    }

    pub fn frame_path(&self, index: u64) -> Option<PathBuf> {
        self.out_dir.as_ref().map(|d| d.join(format!("frame_{index:05}.ppm")))
    }

    fn put(&mut self, x: i32, y: i32, color: Rgb) {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            self.pixels[y as usize * self.width + x as usize] = color;
        }
    }

    fn write_ppm(&self, path: &Path) -> Result<(), SurfaceError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut out = BufWriter::new(fs::File::create(path)?);
        writeln!(out, "P6 {} {} 255", self.width, self.height)?;
        let bytes: Vec<u8> = self.pixels.iter().flat_map(|c| [c.r, c.g, c.b]).collect();
        out.write_all(&bytes)?;
        out.flush()?;
        Ok(())
    }
}

impl DrawSurface for SimSurface {
    fn clear(&mut self, color: Rgb) -> Result<(), SurfaceError> {
        self.pixels.fill(color);
        self.texts.clear();
        Ok(())
    }

    fn rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgb) -> Result<(), SurfaceError> {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = x.saturating_add(w).min(self.width as i32);
        let y1 = y.saturating_add(h).min(self.height as i32);
        for py in y0..y1 {
            for px in x0..x1 {
                self.put(px, py, color);
            }
        }
        Ok(())
    }

    fn text(&mut self, x: i32, y: i32, text: &str, color: Rgb) -> Result<(), SurfaceError> {
        self.texts.push(TextOverlay { x, y, text: text.to_string(), color });
        Ok(())
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: Rgb) -> Result<(), SurfaceError> {
        self.put(x, y, color);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), SurfaceError> {
        if let Some(path) = self.frame_path(self.index) {
            self.write_ppm(&path)?;
            debug!(frame = self.index, path = %path.display(), "frame written");
        }
        self.last = Some(Frame {
            index: self.index,
            pixels: self.pixels.clone(),
            texts: std::mem::take(&mut self.texts),
        });
        self.index += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb = Rgb::new(255, 0, 0);

    #[test]
    fn rect_is_clipped() {
        let mut sim = SimSurface::new(4, 3);
        sim.rect(-2, 1, 4, 10, RED).unwrap();
        assert_eq!(sim.pixel(0, 0), Some(BACKGROUND));
        assert_eq!(sim.pixel(0, 1), Some(RED));
        assert_eq!(sim.pixel(1, 2), Some(RED));
        assert_eq!(sim.pixel(2, 1), Some(BACKGROUND));
        assert_eq!(sim.pixel(4, 0), None);
    }

    #[test]
    fn out_of_bounds_pixels_are_ignored() {
        let mut sim = SimSurface::new(2, 2);
        sim.set_pixel(-1, 0, RED).unwrap();
        sim.set_pixel(5, 5, RED).unwrap();
        sim.set_pixel(1, 1, RED).unwrap();
        assert_eq!(sim.pixel(1, 1), Some(RED));
    }

    #[test]
    fn commit_snapshots_text_overlay() {
        let mut sim = SimSurface::new(2, 2);
        sim.text(0, 0, "hello", RED).unwrap();
        sim.commit().unwrap();
        sim.commit().unwrap();
        assert_eq!(sim.frames_committed(), 2);
        let last = sim.last_frame().unwrap();
        assert_eq!(last.index, 1);
        assert!(last.texts.is_empty());
    }

    #[test]
    fn writes_ppm_frames() {
        let dir = tempfile::tempdir().unwrap();
        let mut sim = SimSurface::new(3, 2).with_out_dir(dir.path().join("frames"));
        sim.clear(RED).unwrap();
        sim.commit().unwrap();
        let bytes = fs::read(dir.path().join("frames/frame_00000.ppm")).unwrap();
        let header = b"P6 3 2 255\n";
        assert_eq!(&bytes[..header.len()], header);
        assert_eq!(bytes.len(), header.len() + 3 * 2 * 3);
        assert_eq!(&bytes[header.len()..header.len() + 3], &[255, 0, 0]);
    }
}
