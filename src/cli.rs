// ============================================================================
// PaintSurface CLI — replay command scripts headlessly and export PNG
// ============================================================================
//
// Usage examples:
//   PaintSurface -i doodle.txt -o doodle.png
//   PaintSurface -i scripts/*.txt --output-dir renders/ --width 256 --height 256
//   PaintSurface -i demo.txt --config my_settings.cfg -v
//   PaintSurface -i demo.txt --width 1024 --height 768 --save-config
//
// Each script runs against a fresh session built from the settings file.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::error::Result;
use crate::project::Session;
use crate::script::run_script;
use crate::settings::Settings;
use crate::{log_err, log_info, log_warn};

/// PaintSurface headless renderer.
#[derive(Parser, Debug)]
#[command(
    name = "PaintSurface",
    about = "Replay paint command scripts on a layered canvas and export the result as PNG",
    long_about = "Each input script is a list of drawing commands (tool, color, size,\n\
                  down/move/up, fill, text, layer ..., undo, redo, zoom, pan, import)\n\
                  replayed against a fresh canvas. The visible composite is written\n\
                  as PNG.\n\n\
                  Example:\n  \
                  PaintSurface -i doodle.txt -o doodle.png\n  \
                  PaintSurface -i 'scripts/*.txt' --output-dir renders/"
)]
pub struct CliArgs {
    /// Command script(s). Glob patterns accepted (e.g. "scripts/*.txt").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Output PNG path. Only valid for a single input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for several inputs; files are named after the script stem.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Canvas width (overrides the settings file).
    #[arg(long)]
    pub width: Option<u32>,

    /// Canvas height (overrides the settings file).
    #[arg(long)]
    pub height: Option<u32>,

    /// Settings file to use instead of the per-user one.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write the effective settings back (to --config, or the per-user file).
    #[arg(long)]
    pub save_config: bool,

    /// Echo the log to stderr and print per-file timing.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Settings after applying the file and command-line overrides.
    pub fn settings(&self) -> Settings {
        let mut settings = match &self.config {
            Some(path) => Settings::load_from(path),
            None => Settings::load(),
        };
        if let Some(w) = self.width.filter(|w| *w > 0) {
            settings.canvas_width = w;
        }
        if let Some(h) = self.height.filter(|h| *h > 0) {
            settings.canvas_height = h;
        }
        settings
    }

    /// Persist `settings` where they were loaded from.
    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        match &self.config {
            Some(path) => settings.save_to(path),
            None => settings.save(),
        }
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run every script and return an OS exit code.
/// `0` = all scripts succeeded, `1` = one or more failed.
pub fn run(args: CliArgs) -> ExitCode {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("error: could not create output directory '{}': {}", dir.display(), e);
        return ExitCode::FAILURE;
    }

    let settings = args.settings();
    if args.save_config {
        if let Err(e) = args.save_settings(&settings) {
            eprintln!("error: could not save settings: {}", e);
            return ExitCode::FAILURE;
        }
        log_info!("Saved settings");
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }
        let file_start = Instant::now();

        let Some(output_path) = build_output_path(input_path, args.output.as_deref(), args.output_dir.as_deref())
        else {
            eprintln!("  error: cannot determine output path for '{}'.", input_path.display());
            any_failure = true;
            continue;
        };

        match run_one(input_path, &output_path, &settings) {
            Ok(()) => {
                log_info!("Rendered {} -> {}", input_path.display(), output_path.display());
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                log_err!("{}: {}", input_path.display(), e);
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-script pipeline
// ============================================================================

/// Replay one script on a fresh session and export its composite.
pub fn run_one(input: &Path, output: &Path, settings: &Settings) -> Result<()> {
    let source = std::fs::read_to_string(input)?;
    let base_dir = input.parent().unwrap_or(Path::new("."));

    let mut session = Session::new(settings);
    run_script(&mut session, &source, base_dir)?;

    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    session.export_png(output)
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    log_warn!("Pattern '{}' matched no files", pattern);
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Output path for one script.
///
/// Priority:
/// 1. `--output` (explicit path, single input)
/// 2. `--output-dir` (derives the file name from the script stem)
/// 3. Fallback: next to the script, same stem, `.png`
fn build_output_path(input: &Path, output: Option<&Path>, output_dir: Option<&Path>) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let stem = input.file_stem()?.to_string_lossy().into_owned();

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.png", stem)));
    }

    let parent = input.parent().unwrap_or(Path::new("."));
    let candidate = parent.join(format!("{}.png", stem));

    // Avoid silent overwrite of the input
    if candidate == input {
        Some(parent.join(format!("{}_out.png", stem)))
    } else {
        Some(candidate)
    }
}
