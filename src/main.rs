use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use glam::Vec2;
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tokio::time::MissedTickBehavior;

use housepulse::audio::{acquire, InputSource};
use housepulse::effects::{PresetManager, VisualParams};
use housepulse::graphics::{ParameterSink, UniformBlock};
use housepulse::{AnalysisMode, AudioReactiveEngine, EngineConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum InputKind {
    Mic,
    File,
    Synthetic,
}

#[derive(Parser)]
#[command(name = "housepulse")]
#[command(about = "Drive audio-reactive visual parameters from live or recorded audio")]
struct Args {
    /// Audio source
    #[arg(long, value_enum, default_value_t = InputKind::Synthetic)]
    input: InputKind,

    /// Audio file for --input file (WAV, MP3, M4A, OGG, etc.)
    #[arg(long)]
    file: Option<PathBuf>,

    /// JSON configuration file, reloaded when it changes
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Frame rate, overrides the configuration
    #[arg(long)]
    fps: Option<u32>,

    /// Analysis mode, overrides the configuration
    #[arg(long, value_enum)]
    mode: Option<AnalysisMode>,

    /// Seed for the synthetic source
    #[arg(long, default_value = "1")]
    seed: u64,

    /// Tempo of the synthetic source
    #[arg(long, default_value = "124")]
    bpm: f32,

    /// Visual preset (ambient, energetic, minimal, abstract, retro, organic)
    #[arg(long)]
    preset: Option<String>,

    /// Start from random visual parameters instead of a preset
    #[arg(long)]
    randomize: bool,

    /// Stop after this many seconds
    #[arg(long)]
    duration: Option<f64>,
}

const SURFACE_SIZE: Vec2 = Vec2::new(1280.0, 720.0);
const REPORT_INTERVAL: Duration = Duration::from_millis(500);
const CONFIG_POLL_INTERVAL: Duration = Duration::from_secs(1);

// Spectrum providers are not Send, so everything stays on one thread.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    info!("Starting HousePulse");

    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    apply_overrides(&args, &mut config);
    config.validate()?;

    let source = match args.input {
        InputKind::Mic => InputSource::Microphone,
        InputKind::File => match &args.file {
            Some(path) => InputSource::File(path.clone()),
            None => bail!("--input file needs --file <PATH>"),
        },
        InputKind::Synthetic => InputSource::Synthetic {
            seed: args.seed,
            bpm: args.bpm,
        },
    };

    let mut rng = rand::rng();
    let preset_name = args.preset.clone().unwrap_or_else(|| config.preset.clone());
    let baseline = if args.randomize {
        info!("🎲 Using randomized visual parameters");
        VisualParams::randomized(&mut rng)
    } else if preset_name.eq_ignore_ascii_case("default") {
        VisualParams::default()
    } else {
        let mut presets = PresetManager::new();
        if !presets.select(&preset_name) {
            warn!("⚠️  Unknown preset '{}', using '{}'", preset_name, presets.get_current_preset().name);
        }
        info!("🎨 Preset: {}", presets.get_current_preset().name);
        presets.get_current_preset().params.clone()
    };
    let params = VisualParams {
        seed: VisualParams::random_seed(&mut rng),
        ..baseline
    };

    let mut engine = AudioReactiveEngine::new(config.clone())?;
    match acquire(source, &config).await {
        Ok(provider) => engine.start_input(provider),
        Err(e) => warn!("⚠️  {}. Running without audio input.", e),
    }

    let fps = config.fps;
    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / fps as f64));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let started = Instant::now();
    let mut uniforms = UniformBlock::new();
    uniforms.set_vec2("resolution", SURFACE_SIZE);

    let mut frames_since_report = 0u32;
    let mut last_report = Instant::now();
    let mut last_config_poll = Instant::now();
    let mut config_mtime = args.config.as_deref().and_then(modified_time);

    info!("Running at {} fps, press Ctrl+C to stop", fps);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    warn!("Failed to listen for Ctrl+C: {}", e);
                }
                info!("Shutdown requested");
                break;
            }
            _ = ticker.tick() => {
                let elapsed = started.elapsed();
                if args.duration.is_some_and(|limit| elapsed.as_secs_f64() >= limit) {
                    info!("Reached requested duration");
                    break;
                }

                let now_ms = elapsed.as_secs_f64() * 1000.0;
                let output = engine.tick(now_ms);

                params
                    .modulated(&output.offsets)
                    .sanitised(&params)
                    .apply_to(&mut uniforms);
                uniforms.set_float("time", elapsed.as_secs_f32());
                frames_since_report += 1;

                if output.beat.is_some() {
                    log::debug!("💥 Beat at {:.0} ms (bloom {:.2})", now_ms, uniforms.bloom_strength);
                }

                if last_report.elapsed() >= REPORT_INTERVAL {
                    let measured_fps = frames_since_report as f64 / last_report.elapsed().as_secs_f64();
                    let status = engine.status();
                    info!(
                        "FPS: {:.0} | BPM: {} | beat: {} | bloom {:.2} pattern {:.1}",
                        measured_fps,
                        status.bpm_label(),
                        if status.beat_active { "●" } else { "○" },
                        uniforms.bloom_strength,
                        uniforms.pattern_amp
                    );
                    frames_since_report = 0;
                    last_report = Instant::now();
                }

                if let Some(path) = &args.config {
                    if last_config_poll.elapsed() >= CONFIG_POLL_INTERVAL {
                        last_config_poll = Instant::now();
                        reload_if_changed(path, &args, &mut config_mtime, &mut engine);
                    }
                }
            }
        }
    }

    engine.stop_input();
    info!("HousePulse stopped after {:.1}s", started.elapsed().as_secs_f64());
    Ok(())
}

fn apply_overrides(args: &Args, config: &mut EngineConfig) {
    if let Some(fps) = args.fps {
        config.fps = fps;
    }
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn reload_if_changed(
    path: &Path,
    args: &Args,
    last_mtime: &mut Option<SystemTime>,
    engine: &mut AudioReactiveEngine,
) {
    let mtime = modified_time(path);
    if mtime == *last_mtime {
        return;
    }
    *last_mtime = mtime;

    let result = EngineConfig::load(path).and_then(|mut config| {
        apply_overrides(args, &mut config);
        engine.apply_config(config)
    });
    match result {
        Ok(()) => info!("🔄 Reloaded configuration from {:?}", path),
        Err(e) => warn!("⚠️  Keeping previous configuration: {}", e),
    }
}
