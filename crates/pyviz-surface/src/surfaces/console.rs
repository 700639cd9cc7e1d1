use std::io::Write;

use pyviz_lang::Rgb;

use crate::surface::{DrawSurface, SurfaceError};

/// Prints one line per primitive. Text can be colored with 24-bit ANSI
/// escapes; everything else is printed plain.
pub struct ConsoleSurface<W: Write> {
    out: W,
    color: bool,
    frame: u64,
}

impl<W: Write> ConsoleSurface<W> {
    pub fn new(out: W) -> Self {
        Self { out, color: false, frame: 0 }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn frames(&self) -> u64 { self.frame }

    pub fn into_inner(self) -> W { self.out }

    fn paint(&self, s: &str, c: Rgb) -> String {
        if self.color {
            format!("\x1b[38;2;{};{};{}m{s}\x1b[0m", c.r, c.g, c.b)
        } else {
            s.to_string()
        }
    }
}

impl<W: Write> DrawSurface for ConsoleSurface<W> {
    fn clear(&mut self, color: Rgb) -> Result<(), SurfaceError> {
        writeln!(self.out, "clear {color}")?;
        Ok(())
    }

    fn rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgb) -> Result<(), SurfaceError> {
        let bar = self.paint(&"█".repeat((w.max(0) / 5) as usize), color);
        writeln!(self.out, "rect  ({x},{y}) {w}x{h} {color} {bar}")?;
        Ok(())
    }

    fn text(&mut self, x: i32, y: i32, text: &str, color: Rgb) -> Result<(), SurfaceError> {
        let text = self.paint(text, color);
        writeln!(self.out, "text  ({x},{y}) {text}")?;
        Ok(())
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: Rgb) -> Result<(), SurfaceError> {
        writeln!(self.out, "pixel ({x},{y}) {color}")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), SurfaceError> {
        writeln!(self.out, "──── frame {} ────", self.frame)?;
        self.frame += 1;
        self.out.flush()?;
        Ok(())
    }

    fn cleanup(&mut self) -> Result<(), SurfaceError> {
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(f: impl FnOnce(&mut ConsoleSurface<Vec<u8>>)) -> String {
        let mut surface = ConsoleSurface::new(Vec::new());
        f(&mut surface);
        String::from_utf8(surface.into_inner()).unwrap_or_else(|e| panic!("not utf-8: {e}"))
    }

    #[test]
    fn one_line_per_primitive() {
        let out = output(|s| {
            s.clear(Rgb::new(0, 0x11, 0)).unwrap();
            s.rect(250, 45, 84, 10, Rgb::new(0, 255, 0)).unwrap();
            s.text(50, 50, "x = 42", Rgb::new(255, 255, 0)).unwrap();
            s.set_pixel(1, 2, Rgb::WHITE).unwrap();
            s.commit().unwrap();
        });
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines, vec![
            "clear #001100",
            "rect  (250,45) 84x10 #00ff00 ████████████████",
            "text  (50,50) x = 42",
            "pixel (1,2) #ffffff",
            "──── frame 0 ────",
        ]);
    }

    #[test]
    fn ansi_color() {
        let mut colored = ConsoleSurface::new(Vec::new()).with_color(true);
        colored.text(0, 0, "hi", Rgb::new(1, 2, 3)).unwrap();
        let out = String::from_utf8(colored.into_inner()).unwrap();
        assert_eq!(out, "text  (0,0) \x1b[38;2;1;2;3mhi\x1b[0m\n");
    }
}
