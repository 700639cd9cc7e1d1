//! The work behind each CLI subcommand, kept free of argument parsing.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::ValueEnum;
use pyviz_lang::{BACKGROUND, EngineConfig, ExecutionResult, Session};
use pyviz_surface::{
    ConsoleSurface, DrawSurface, NullSurface, RecordSurface, ReplayStats, SimSurface, play_file, render_elements,
};
use tracing::{error, info};

use crate::watch::{self, DEFAULT_INTERVAL};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SurfaceKind {
    /// One line per draw call on stdout.
    #[default]
    Console,
    /// Headless frame buffer, optionally dumping PPM frames.
    Sim,
    None,
}

#[derive(Debug, Clone)]
pub struct SurfaceOptions {
    pub kind: SurfaceKind,
    pub width: usize,
    pub height: usize,
    pub out_dir: Option<PathBuf>,
    pub color: bool,
    /// Also record every draw call to this operation log.
    pub mirror: Option<PathBuf>,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self { kind: SurfaceKind::Console, width: 800, height: 600, out_dir: None, color: false, mirror: None }
    }
}

impl SurfaceOptions {
    pub fn build(&self) -> Result<Box<dyn DrawSurface>> {
        let base: Box<dyn DrawSurface> = match self.kind {
            SurfaceKind::Console => Box::new(ConsoleSurface::new(io::stdout()).with_color(self.color)),
            SurfaceKind::Sim => {
                let mut sim = SimSurface::new(self.width, self.height);
                if let Some(dir) = &self.out_dir {
                    sim = sim.with_out_dir(dir);
                }
                Box::new(sim)
            }
            SurfaceKind::None => Box::new(NullSurface),
        };
        match &self.mirror {
            Some(path) => {
                let rec = RecordSurface::create(base, path)
                    .with_context(|| format!("cannot open operation log {}", path.display()))?;
                info!(path = %path.display(), "mirroring draw calls");
                Ok(Box::new(rec))
            }
            None => Ok(base),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config: EngineConfig,
    pub json: bool,
    /// Re-run whenever the file changes.
    pub live: bool,
    pub surface: SurfaceOptions,
}

/// One-line human summary of a run.
pub fn summary(result: &ExecutionResult) -> String {
    let counts = format!(
        "{} elements, {} variables, {} output lines ({:.2} ms)",
        result.elements_created, result.variables_bound, result.output_lines, result.elapsed_ms,
    );
    match (&result.error, result.runtime_errors) {
        (Some(err), _) => format!("✗ {err}"),
        (None, 0) => format!("✓ {counts}"),
        (None, n) => format!("✓ {counts}, {n} runtime error(s)"),
    }
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))
}

/// Executes `source`, draws the elements as one frame and reports the run.
pub fn execute_and_render(
    session: &mut Session,
    source: &str,
    surface: &mut dyn DrawSurface,
    json: bool,
    out: &mut dyn Write,
) -> Result<ExecutionResult> {
    let result = session.execute(source);
    render_elements(&result.elements, surface, BACKGROUND)?;
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&result)?)?;
    } else {
        writeln!(out, "{}", summary(&result))?;
    }
    Ok(result)
}

/// `pyviz run`. Returns whether the (last) run succeeded.
pub fn run_file(path: &Path, opts: &RunOptions, out: &mut dyn Write) -> Result<bool> {
    let mut session = Session::new(opts.config.clone());

    if opts.live {
        let mut surface = opts.surface.build()?;
        let mut failure = None;
        info!(path = %path.display(), "watching");
        watch::watch(path, DEFAULT_INTERVAL, |source| {
            match execute_and_render(&mut session, source, &mut surface, opts.json, &mut *out) {
                Ok(_) => true,
                Err(e) => {
                    error!(error = %e, "live run aborted");
                    failure = Some(e);
                    false
                }
            }
        })
        .with_context(|| format!("cannot watch {}", path.display()))?;
        surface.cleanup()?;
        return match failure {
            Some(e) => Err(e),
            None => Ok(true),
        };
    }

    let source = read_source(path)?;
    let mut surface = opts.surface.build()?;
    let result = execute_and_render(&mut session, &source, &mut surface, opts.json, out)?;
    surface.cleanup()?;
    info!(path = %path.display(), success = result.success, "run finished");
    Ok(result.success)
}

/// `pyviz csv record`: executes a script and records its frame.
pub fn record(script: &Path, csv_out: &Path, config: EngineConfig, out: &mut dyn Write) -> Result<ExecutionResult> {
    let source = read_source(script)?;
    let mut session = Session::new(config);
    let mut rec = RecordSurface::create(NullSurface, csv_out)
        .with_context(|| format!("cannot create {}", csv_out.display()))?;
    let result = execute_and_render(&mut session, &source, &mut rec, false, out)?;
    rec.cleanup()?;
    writeln!(out, "recorded {} frame(s) to {}", rec.frame(), csv_out.display())?;
    Ok(result)
}

/// `pyviz csv play`.
pub fn play(csv: &Path, surface: &SurfaceOptions, frame_delay: Duration, out: &mut dyn Write) -> Result<ReplayStats> {
    let mut target = surface.build()?;
    let stats = play_file(csv, &mut target, frame_delay)?;
    target.cleanup()?;
    writeln!(
        out,
        "replayed {} frame(s): {} calls applied, {} skipped",
        stats.frames, stats.applied, stats.skipped,
    )?;
    Ok(stats)
}

/// Parses a non-negative number of seconds.
pub fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.trim().parse().map_err(|_| format!("`{s}` is not a number of seconds"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("`{s}`: {e}"))
}
