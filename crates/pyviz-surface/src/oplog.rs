//! The operation log: a frame-keyed CSV record of draw calls.
//!
//! ```text
//! frame,op,x,y,w,h,r,g,b,text
//! 0,CLEAR,,,,,0,17,0,
//! 0,RECT,250,45,84,10,0,255,0,
//! 0,TEXT,50,50,,,255,255,0,x = 42
//! 0,COMMIT,,,,,,,,
//! ```
//!
//! Recording wraps any surface and writes one row per call. Replay groups
//! rows by frame number, applies each frame in ascending order and commits
//! once per frame. Malformed numbers read as `0`; unknown ops are skipped.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use pyviz_lang::Rgb;
use thiserror::Error;
use tracing::{debug, warn};

use crate::surface::{DrawCall, DrawSurface, SurfaceError};

pub const HEADER: [&str; 10] = ["frame", "op", "x", "y", "w", "h", "r", "g", "b", "text"];

#[derive(Debug, Error)]
pub enum OpLogError {
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

impl OpLogError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io { path: path.to_path_buf(), source }
    }
}

// ─── Ops ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OpCode {
    Clear,
    Rect,
    Text,
    Pixel,
    Commit,
    /// Unrecognised op name, kept verbatim and skipped on replay.
    Other(String),
}

impl OpCode {
    /// Case-insensitive, with aliases.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        match s.to_ascii_uppercase().as_str() {
            "CLEAR" | "BG" | "BACKGROUND" => Self::Clear,
            "RECT" | "BOX" => Self::Rect,
            "TEXT" | "LABEL" => Self::Text,
            "PIXEL" | "SET" | "SET_PIXEL" => Self::Pixel,
            "COMMIT" | "SHOW" => Self::Commit,
            _ => Self::Other(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Clear => "CLEAR",
            Self::Rect => "RECT",
            Self::Text => "TEXT",
            Self::Pixel => "PIXEL",
            Self::Commit => "COMMIT",
            Self::Other(s) => s,
        }
    }
}

// ─── Rows ────────────────────────────────────────────────────────────────────

/// One CSV row. Numeric fields are `None` when blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpRow {
    pub frame: i64,
    pub op: OpCode,
    pub x: Option<i64>,
    pub y: Option<i64>,
    pub w: Option<i64>,
    pub h: Option<i64>,
    pub r: Option<i64>,
    pub g: Option<i64>,
    pub b: Option<i64>,
    pub text: String,
}

impl OpRow {
    pub fn new(frame: i64, op: OpCode) -> Self {
        Self { frame, op, x: None, y: None, w: None, h: None, r: None, g: None, b: None, text: String::new() }
    }

    fn at(mut self, x: i32, y: i32) -> Self {
        self.x = Some(x.into());
        self.y = Some(y.into());
        self
    }

    fn size(mut self, w: i32, h: i32) -> Self {
        self.w = Some(w.into());
        self.h = Some(h.into());
        self
    }

    fn colored(mut self, c: Rgb) -> Self {
        self.r = Some(c.r.into());
        self.g = Some(c.g.into());
        self.b = Some(c.b.into());
        self
    }

    /// The row recording `call`; `None` for `cleanup`, which is not logged.
    pub fn from_call(frame: i64, call: &DrawCall) -> Option<Self> {
        let row = match call {
            DrawCall::Clear(c) => Self::new(frame, OpCode::Clear).colored(*c),
            DrawCall::Rect { x, y, w, h, color } => {
                Self::new(frame, OpCode::Rect).at(*x, *y).size(*w, *h).colored(*color)
            }
            DrawCall::Text { x, y, text, color } => {
                let mut row = Self::new(frame, OpCode::Text).at(*x, *y).colored(*color);
                row.text = text.clone();
                row
            }
            DrawCall::Pixel { x, y, color } => Self::new(frame, OpCode::Pixel).at(*x, *y).colored(*color),
            DrawCall::Commit => Self::new(frame, OpCode::Commit),
            DrawCall::Cleanup => return None,
        };
        Some(row)
    }

    /// Color components clamped to `0..=255`; blanks are `0`.
    pub fn color(&self) -> Rgb {
        let c = |v: Option<i64>| v.unwrap_or(0).clamp(0, 255) as u8;
        Rgb::new(c(self.r), c(self.g), c(self.b))
    }

    /// The draw call this row replays as. `None` for commits and unknown ops.
    pub fn to_call(&self) -> Option<DrawCall> {
        let n = |v: Option<i64>| v.unwrap_or(0).clamp(i32::MIN.into(), i32::MAX.into()) as i32;
        let (x, y, color) = (n(self.x), n(self.y), self.color());
        match self.op {
            OpCode::Clear => Some(DrawCall::Clear(color)),
            OpCode::Rect => Some(DrawCall::Rect { x, y, w: n(self.w), h: n(self.h), color }),
            OpCode::Text => Some(DrawCall::Text { x, y, text: self.text.clone(), color }),
            OpCode::Pixel => Some(DrawCall::Pixel { x, y, color }),
            OpCode::Commit | OpCode::Other(_) => None,
        }
    }

    fn fields(&self) -> [String; 10] {
        let n = |v: Option<i64>| v.map(|v| v.to_string()).unwrap_or_default();
        [
            self.frame.to_string(),
            self.op.as_str().to_string(),
            n(self.x),
            n(self.y),
            n(self.w),
            n(self.h),
            n(self.r),
            n(self.g),
            n(self.b),
            self.text.clone(),
        ]
    }
}

// ─── Writing ─────────────────────────────────────────────────────────────────

fn quote(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn write_record<W: Write>(out: &mut W, fields: &[impl AsRef<str>]) -> io::Result<()> {
    let line: Vec<String> = fields.iter().map(|f| quote(f.as_ref())).collect();
    write!(out, "{}\r\n", line.join(","))?;
    out.flush()
}

/// Writes the header on creation, then one flushed line per row.
pub struct CsvWriter<W: Write> {
    out: W,
}

impl<W: Write> CsvWriter<W> {
    pub fn new(mut out: W) -> io::Result<Self> {
        write_record(&mut out, &HEADER)?;
        Ok(Self { out })
    }

    pub fn write_row(&mut self, row: &OpRow) -> io::Result<()> {
        write_record(&mut self.out, &row.fields())
    }

    pub fn into_inner(self) -> W { self.out }
}

/// Serializes rows to CSV text, header included.
pub fn to_csv(rows: &[OpRow]) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail.
    if let Ok(mut writer) = CsvWriter::new(&mut buf) {
        for row in rows {
            let _ = writer.write_row(row);
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

// ─── Reading ─────────────────────────────────────────────────────────────────

/// Splits CSV text into records (RFC 4180: quoted fields may hold commas,
/// doubled quotes and line breaks; CRLF and LF both end a record).
pub fn parse_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    records.retain(|r| r.iter().any(|f| !f.trim().is_empty()));
    records
}

/// `int(float(v))`: blank is `None`, anything unparsable is `Some(0)`.
fn parse_number(field: &str, line: usize, column: &str) -> Option<i64> {
    let s = field.trim();
    if s.is_empty() {
        return None;
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v.trunc() as i64),
        _ => {
            warn!(line, column, value = s, "malformed number read as 0");
            Some(0)
        }
    }
}

/// Reads rows, mapping columns by header name. Extra columns are ignored and
/// missing ones read as blank.
pub fn read_rows(text: &str) -> Vec<OpRow> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut records = parse_records(text).into_iter();
    let Some(header) = records.next() else {
        return Vec::new();
    };
    let index: Vec<Option<usize>> = HEADER
        .iter()
        .map(|name| header.iter().position(|h| h.trim().eq_ignore_ascii_case(name)))
        .collect();

    records
        .enumerate()
        .map(|(i, record)| {
            let line = i + 2;
            let get = |col: usize| index[col].and_then(|j| record.get(j)).map(String::as_str).unwrap_or("");
            let num = |col: usize| parse_number(get(col), line, HEADER[col]);
            OpRow {
                frame: num(0).unwrap_or(0),
                op: OpCode::parse(get(1)),
                x: num(2),
                y: num(3),
                w: num(4),
                h: num(5),
                r: num(6),
                g: num(7),
                b: num(8),
                text: get(9).to_string(),
            }
        })
        .collect()
}

pub fn load(path: &Path) -> Result<Vec<OpRow>, OpLogError> {
    let text = fs::read_to_string(path).map_err(|e| OpLogError::io(path, e))?;
    let rows = read_rows(&text);
    debug!(path = %path.display(), rows = rows.len(), "operation log loaded");
    Ok(rows)
}

// ─── Recording ───────────────────────────────────────────────────────────────

/// Forwards every call to `inner` and logs it, tagged with the current frame.
/// The frame advances after each commit.
pub struct RecordSurface<S, W: Write> {
    inner: S,
    writer: CsvWriter<W>,
    frame: i64,
}

impl<S: DrawSurface, W: Write> RecordSurface<S, W> {
    pub fn new(inner: S, out: W) -> Result<Self, SurfaceError> {
        Ok(Self { inner, writer: CsvWriter::new(out)?, frame: 0 })
    }

    pub fn with_start_frame(mut self, frame: i64) -> Self {
        self.frame = frame;
        self
    }

    pub fn frame(&self) -> i64 { self.frame }

    pub fn inner(&self) -> &S { &self.inner }

    pub fn into_parts(self) -> (S, W) {
        (self.inner, self.writer.into_inner())
    }

    fn log(&mut self, call: DrawCall) -> Result<(), SurfaceError> {
        if let Some(row) = OpRow::from_call(self.frame, &call) {
            self.writer.write_row(&row)?;
        }
        Ok(())
    }
}

impl<S: DrawSurface> RecordSurface<S, BufWriter<File>> {
    pub fn create(inner: S, path: &Path) -> Result<Self, OpLogError> {
        let file = File::create(path).map_err(|e| OpLogError::io(path, e))?;
        Self::new(inner, BufWriter::new(file)).map_err(|e| match e {
            SurfaceError::Io(source) => OpLogError::io(path, source),
            other => OpLogError::Surface(other),
        })
    }
}

impl<S: DrawSurface, W: Write> DrawSurface for RecordSurface<S, W> {
    fn clear(&mut self, color: Rgb) -> Result<(), SurfaceError> {
        self.log(DrawCall::Clear(color))?;
        self.inner.clear(color)
    }

    fn rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgb) -> Result<(), SurfaceError> {
        self.log(DrawCall::Rect { x, y, w, h, color })?;
        self.inner.rect(x, y, w, h, color)
    }

    fn text(&mut self, x: i32, y: i32, text: &str, color: Rgb) -> Result<(), SurfaceError> {
        self.log(DrawCall::Text { x, y, text: text.to_string(), color })?;
        self.inner.text(x, y, text, color)
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: Rgb) -> Result<(), SurfaceError> {
        self.log(DrawCall::Pixel { x, y, color })?;
        self.inner.set_pixel(x, y, color)
    }

    fn commit(&mut self) -> Result<(), SurfaceError> {
        self.log(DrawCall::Commit)?;
        self.inner.commit()?;
        self.frame += 1;
        Ok(())
    }

    fn cleanup(&mut self) -> Result<(), SurfaceError> {
        self.writer.out.flush()?;
        self.inner.cleanup()
    }
}

// ─── Replay ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub frames: usize,
    /// Draw calls applied, commits excluded.
    pub applied: usize,
    /// Rows with an unknown op.
    pub skipped: usize,
}

pub fn replay<S: DrawSurface + ?Sized>(rows: &[OpRow], surface: &mut S) -> Result<ReplayStats, SurfaceError> {
    replay_with_delay(rows, surface, Duration::ZERO)
}

/// Replays frames in ascending frame order, rows within a frame in file
/// order, and commits exactly once per frame. COMMIT rows only mark frames.
pub fn replay_with_delay<S: DrawSurface + ?Sized>(
    rows: &[OpRow],
    surface: &mut S,
    frame_delay: Duration,
) -> Result<ReplayStats, SurfaceError> {
    let mut by_frame: BTreeMap<i64, Vec<&OpRow>> = BTreeMap::new();
    for row in rows {
        by_frame.entry(row.frame).or_default().push(row);
    }

    let mut stats = ReplayStats::default();
    for (frame, rows) in &by_frame {
        debug!(frame, rows = rows.len(), "replaying frame");
        for row in rows {
            match row.to_call() {
                Some(call) => {
                    call.apply(surface)?;
                    stats.applied += 1;
                }
                None => {
                    if let OpCode::Other(op) = &row.op {
                        warn!(frame, op = %op, "unknown op skipped");
                        stats.skipped += 1;
                    }
                }
            }
        }
        surface.commit()?;
        stats.frames += 1;
        if !frame_delay.is_zero() {
            thread::sleep(frame_delay);
        }
    }
    Ok(stats)
}

/// Loads `path` and replays it.
pub fn play_file<S: DrawSurface + ?Sized>(
    path: &Path,
    surface: &mut S,
    frame_delay: Duration,
) -> Result<ReplayStats, OpLogError> {
    let rows = load(path)?;
    Ok(replay_with_delay(&rows, surface, frame_delay)?)
}
