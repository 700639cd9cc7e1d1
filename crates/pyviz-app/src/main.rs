use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, anyhow};
use clap::{Args, Parser, Subcommand, ValueHint};
use pyviz_app::commands::{self, RunOptions, SurfaceKind, SurfaceOptions, parse_seconds};
use pyviz_lang::EngineConfig;

#[derive(Parser)]
#[command(author, version, about = "Executes restricted Python and draws what each statement does")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute a script and draw its elements
    Run(RunArgs),

    /// Re-run a script on every change, drawing to the console
    Watch {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Record or replay operation logs
    #[command(subcommand)]
    Csv(CsvCommand),

    /// Open the live editor
    Gui {
        #[arg(value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,

        #[command(flatten)]
        engine: EngineArgs,
    },
}

#[derive(Subcommand)]
enum CsvCommand {
    /// Replay an operation log frame by frame
    Play {
        #[arg(value_hint = ValueHint::FilePath)]
        csv: PathBuf,

        #[command(flatten)]
        surface: SurfaceArgs,

        /// Pause between frames, in seconds
        #[arg(long, value_parser = parse_seconds, default_value = "0")]
        frame_delay: Duration,
    },

    /// Execute a script and record its frame as an operation log
    Record {
        #[arg(value_hint = ValueHint::FilePath)]
        script: PathBuf,

        #[arg(long, value_hint = ValueHint::FilePath)]
        csv_out: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,
    },
}

#[derive(Args)]
struct RunArgs {
    #[arg(value_hint = ValueHint::FilePath)]
    file: PathBuf,

    /// Print the execution result as JSON instead of a summary
    #[arg(long)]
    json: bool,

    /// Re-run whenever the file changes
    #[arg(long)]
    live: bool,

    #[command(flatten)]
    surface: SurfaceArgs,

    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Args)]
struct SurfaceArgs {
    /// Where draw calls go (default: console, or none with --json)
    #[arg(long, value_enum)]
    surface: Option<SurfaceKind>,

    /// Frame buffer width for the sim surface
    #[arg(long, default_value_t = 800)]
    width: usize,

    /// Frame buffer height for the sim surface
    #[arg(long, default_value_t = 600)]
    height: usize,

    /// Write each sim frame as a PPM image into this directory
    #[arg(long, value_hint = ValueHint::DirPath)]
    out_dir: Option<PathBuf>,

    /// Also record every draw call to this CSV operation log
    #[arg(long, value_hint = ValueHint::FilePath)]
    mirror: Option<PathBuf>,

    /// Color console text with ANSI escapes
    #[arg(long)]
    color: bool,
}

impl SurfaceArgs {
    fn options(&self, default: SurfaceKind) -> SurfaceOptions {
        SurfaceOptions {
            kind: self.surface.unwrap_or(default),
            width: self.width,
            height: self.height,
            out_dir: self.out_dir.clone(),
            color: self.color,
            mirror: self.mirror.clone(),
        }
    }
}

#[derive(Args)]
struct EngineArgs {
    /// Undefined names and unpack mismatches become errors
    #[arg(long)]
    strict: bool,

    /// Iterations a single loop may run before it is cut off
    #[arg(long)]
    max_iterations: Option<usize>,
}

impl EngineArgs {
    fn config(&self) -> EngineConfig {
        let config = EngineConfig::default().with_strict(self.strict);
        match self.max_iterations {
            Some(n) => config.with_max_loop_iterations(n),
            None => config,
        }
    }
}

fn main() {
    pyviz_app::init_tracing();
    match try_main() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }
}

/// `Ok(false)` when the program itself failed (syntax error).
fn try_main() -> Result<bool> {
    let cli = Cli::parse();
    let mut out = io::stdout();
    match cli.command {
        Command::Run(args) => {
            let default = if args.json { SurfaceKind::None } else { SurfaceKind::Console };
            let opts = RunOptions {
                config: args.engine.config(),
                json: args.json,
                live: args.live,
                surface: args.surface.options(default),
            };
            commands::run_file(&args.file, &opts, &mut out)
        }
        Command::Watch { file, engine } => {
            let opts = RunOptions { config: engine.config(), live: true, ..RunOptions::default() };
            commands::run_file(&file, &opts, &mut out)
        }
        Command::Csv(CsvCommand::Play { csv, surface, frame_delay }) => {
            commands::play(&csv, &surface.options(SurfaceKind::Console), frame_delay, &mut out)?;
            Ok(true)
        }
        Command::Csv(CsvCommand::Record { script, csv_out, engine }) => {
            let result = commands::record(&script, &csv_out, engine.config(), &mut out)?;
            Ok(result.success)
        }
        Command::Gui { file, engine } => {
            pyviz_app::gui::run(file, engine.config()).map_err(|e| anyhow!("gui failed: {e}"))?;
            Ok(true)
        }
    }
}
