#![deny(unsafe_code)]
//! CLI binary for the backdrop background renderer.
//!
//! Subcommands:
//! - `render <kind>`: simulate some time on the software backend, write PNG
//! - `run <kind>`: drive the frame loop in real time, logging stats
//! - `list`: print background kinds and backends
//! - `defaults <kind>`: print the default config as JSON

mod error;

use backdrop_backgrounds::snapshot::write_png;
use backdrop_backgrounds::Studio;
use backdrop_core::config::defaults;
use backdrop_core::{BackendKind, BackgroundKind, RenderConfig, RenderError, SurfaceHandle};
use clap::{Args, Parser, Subcommand};
use error::CliError;
use serde_json::Value;
use std::path::PathBuf;
use std::process;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "backdrop", about = "Live broadcast background renderer")]
struct Cli {
    /// Output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

/// Surface, frame rate and background config shared by `render` and `run`.
#[derive(Args)]
struct SceneArgs {
    /// Background kind (gradient, solid, waves, neural, image).
    kind: String,

    /// Background config as a JSON object; merged over the defaults.
    #[arg(long, default_value = "{}", conflicts_with = "config_file")]
    config: String,

    /// Read the background config from a JSON file.
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// Logical surface width.
    #[arg(short = 'W', long, default_value_t = 1920)]
    width: u32,

    /// Logical surface height.
    #[arg(short = 'H', long, default_value_t = 1080)]
    height: u32,

    /// Device pixel ratio.
    #[arg(long, default_value_t = 1.0)]
    pixel_ratio: f64,

    /// Target frames per second.
    #[arg(long, default_value_t = 60.0)]
    fps: f64,

    /// Preferred backend (accelerated, software-2d).
    #[arg(long)]
    backend: Option<String>,

    /// Start with the background hidden.
    #[arg(long)]
    hidden: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Simulate a stretch of time and write a PNG snapshot of the last frame.
    Render {
        #[command(flatten)]
        scene: SceneArgs,

        /// Simulated time to run before the snapshot, in milliseconds.
        #[arg(short, long, default_value_t = 1000.0)]
        duration_ms: f64,

        /// Host tick interval, in milliseconds.
        #[arg(long, default_value_t = 4.0)]
        tick_ms: f64,

        /// Output file path.
        #[arg(short, long, default_value = "backdrop.png")]
        output: PathBuf,
    },
    /// Run the frame loop against the wall clock, logging stats every second.
    Run {
        #[command(flatten)]
        scene: SceneArgs,

        /// How long to run, in seconds.
        #[arg(short, long, default_value_t = 10.0)]
        seconds: f64,
    },
    /// List background kinds and backends.
    List,
    /// Print the default config for a background kind.
    Defaults {
        /// Background kind.
        kind: String,
    },
}

/// Parses the `--config` / `--config-file` pair into a JSON object.
fn load_config(inline: &str, file: Option<&PathBuf>) -> Result<Value, CliError> {
    let (text, origin) = match file {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| CliError::Io(format!("cannot read {}: {e}", path.display())))?;
            (text, path.display().to_string())
        }
        None => (inline.to_string(), "--config".to_string()),
    };
    let value: Value = serde_json::from_str(&text)
        .map_err(|e| CliError::Input(format!("invalid {origin} JSON: {e}")))?;
    if !value.is_object() {
        return Err(CliError::Input(format!("{origin} must be a JSON object")));
    }
    Ok(value)
}

fn build_studio(args: &SceneArgs) -> Result<(Studio, BackgroundKind), CliError> {
    let kind = BackgroundKind::from_name(&args.kind)?;
    let preferred_backend = args
        .backend
        .as_deref()
        .map(|name| {
            BackendKind::from_name(name)
                .ok_or_else(|| CliError::Input(format!("unknown backend '{name}'")))
        })
        .transpose()?;
    let config = load_config(&args.config, args.config_file.as_ref())?;
    let render_config = RenderConfig {
        preferred_backend,
        target_fps: args.fps,
        auto_start: true,
    };
    let surface = SurfaceHandle::offscreen(args.width, args.height).with_pixel_ratio(args.pixel_ratio);
    let mut studio = Studio::new(render_config, surface)?;
    studio.apply(kind, &config, !args.hidden)?;
    Ok((studio, kind))
}

fn mode_name(studio: &Studio) -> &'static str {
    studio.mode().map(|m| m.name()).unwrap_or("none")
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::List => {
            let kinds: Vec<&str> = BackgroundKind::all().iter().map(|k| k.name()).collect();
            let backends = [BackendKind::Accelerated.name(), BackendKind::Software2d.name()];
            if cli.json {
                let info = serde_json::json!({
                    "backgrounds": kinds,
                    "backends": backends,
                });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("Backgrounds:");
                for name in kinds {
                    println!("  {name}");
                }
                println!("Backends:");
                println!("  {}", backends.join(", "));
            }
        }
        Command::Defaults { kind } => {
            let kind = BackgroundKind::from_name(&kind)?;
            println!("{}", serde_json::to_string_pretty(&defaults::for_kind(kind))?);
        }
        Command::Render {
            scene,
            duration_ms,
            tick_ms,
            output,
        } => {
            if !tick_ms.is_finite() || tick_ms <= 0.0 || !duration_ms.is_finite() || duration_ms < 0.0 {
                return Err(CliError::Input(
                    "--tick-ms must be positive and --duration-ms non-negative".into(),
                ));
            }
            let (mut studio, kind) = build_studio(&scene)?;
            let stats = studio.run_for(duration_ms, tick_ms);
            let frame = studio
                .snapshot()
                .ok_or_else(|| CliError::Render(RenderError::NoBackendAvailable))?;
            write_png(&frame, &output)?;

            if cli.json {
                let info = serde_json::json!({
                    "background": kind.name(),
                    "backend": mode_name(&studio),
                    "width": frame.width(),
                    "height": frame.height(),
                    "durationMs": duration_ms,
                    "stats": stats,
                    "output": output.display().to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                eprintln!(
                    "rendered {} ({}x{}, {} frames on {}) -> {}",
                    kind.name(),
                    frame.width(),
                    frame.height(),
                    stats.frame_count,
                    mode_name(&studio),
                    output.display()
                );
            }
        }
        Command::Run { scene, seconds } => {
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(CliError::Input("--seconds must be a non-negative number".into()));
            }
            let (mut studio, kind) = build_studio(&scene)?;
            tracing::info!(background = kind.name(), backend = mode_name(&studio), "running");
            let started = Instant::now();
            let mut last = started;
            let mut last_report = started;
            while started.elapsed().as_secs_f64() < seconds {
                std::thread::sleep(Duration::from_millis(1));
                let now = Instant::now();
                studio.advance(now.duration_since(last).as_secs_f64() * 1000.0);
                last = now;
                if now.duration_since(last_report) >= Duration::from_secs(1) {
                    let stats = studio.stats();
                    tracing::info!(
                        fps = format!("{:.1}", stats.fps),
                        frame_ms = format!("{:.2}", stats.frame_time_ms),
                        draw_calls = stats.draw_calls,
                        frames = stats.frame_count,
                        "stats"
                    );
                    last_report = now;
                }
            }
            let stats = studio.stats();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                eprintln!(
                    "ran {} for {seconds:.1}s: {} frames, {:.1} fps",
                    kind.name(),
                    stats.frame_count,
                    stats.fps
                );
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let json_mode = cli.json;
    if let Err(e) = run(cli) {
        if json_mode {
            let j = serde_json::json!({"error": e.to_string(), "exit_code": e.exit_code()});
            eprintln!("{}", serde_json::to_string_pretty(&j).unwrap_or_default());
        } else {
            eprintln!("error: {e}");
        }
        process::exit(e.exit_code());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_render_with_shared_options() {
        let cli = Cli::try_parse_from([
            "backdrop", "render", "neural", "--width", "640", "--height", "360", "--fps", "30",
            "--config", r#"{"nodeCount": 30}"#, "--json",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Command::Render { scene, .. } => {
                assert_eq!((scene.width, scene.height), (640, 360));
                assert_eq!(scene.fps, 30.0);
                assert_eq!(scene.kind, "neural");
            }
            _ => panic!("expected render"),
        }
    }

    #[test]
    fn load_config_rejects_non_objects() {
        assert!(matches!(load_config("[1]", None), Err(CliError::Input(_))));
        assert!(matches!(load_config("{oops", None), Err(CliError::Input(_))));
        assert!(load_config(r##"{"color": "#000000"}"##, None).is_ok());
    }

    #[test]
    fn load_config_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(&path, r#"{"waveCount": 4}"#).unwrap();
        let value = load_config("{}", Some(&path)).unwrap();
        assert_eq!(value["waveCount"], 4);
        let missing = dir.path().join("missing.json");
        assert!(matches!(load_config("{}", Some(&missing)), Err(CliError::Io(_))));
    }

    fn render_args(extra: &[&str]) -> SceneArgs {
        let args = ["backdrop", "render"].iter().chain(extra).copied();
        match Cli::try_parse_from(args).unwrap().command {
            Command::Render { scene, .. } => scene,
            _ => panic!("expected render"),
        }
    }

    #[test]
    fn rejected_background_config_exits_as_input() {
        let cases: [&[&str]; 4] = [
            &["neural", "--config", r#"{"nodeCount": 99}"#],
            &["solid", "--config", r##"{"color": "#nothex"}"##],
            &["plasma"],
            &["gradient", "--width", "0"],
        ];
        for args in cases {
            let Err(err) = build_studio(&render_args(args)) else {
                panic!("{args:?} should be rejected");
            };
            assert!(matches!(err, CliError::Rejected(_)), "{args:?}: {err}");
            assert_eq!(err.exit_code(), 12);
        }
    }

    #[test]
    fn unknown_backend_is_input_error() {
        let cli = Cli::try_parse_from(["backdrop", "render", "solid", "--backend", "vulkan"]).unwrap();
        let Command::Render { scene, .. } = cli.command else {
            panic!("expected render");
        };
        assert!(matches!(build_studio(&scene), Err(CliError::Input(_))));
    }
}
