use anyhow::Result;
use clap::Parser;
use log::info;
use std::path::PathBuf;

use housepulse::audio::PrescanProcessor;
use housepulse::{AnalysisMode, EngineConfig};

#[derive(Parser)]
#[command(name = "housepulse-prescan")]
#[command(about = "Analyse a whole audio file offline: beats, tempo and band statistics")]
struct Args {
    /// Audio file to pre-scan (WAV, MP3, M4A, OGG, etc.)
    #[arg()]
    input_file: PathBuf,

    /// Output JSON report
    #[arg(short, long, default_value = "prescan_report.json")]
    output: PathBuf,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Analysis frame rate
    #[arg(long)]
    fps: Option<u32>,

    /// Analysis mode
    #[arg(long, value_enum)]
    mode: Option<AnalysisMode>,

    /// Include per-frame bands and offsets in the report
    #[arg(long)]
    frames: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(fps) = args.fps {
        config.fps = fps;
    }
    if let Some(mode) = args.mode {
        config.mode = mode;
    }

    info!("HousePulse Pre-scan Tool");
    info!("Input file: {:?}", args.input_file);
    info!("Output file: {:?}", args.output);
    info!("Mode: {}, {} fps, FFT size {}", config.mode.label(), config.fps, config.analyser.fft_size);

    let processor = PrescanProcessor::new(config, args.frames);
    let report = processor.prescan_file(&args.input_file)?;
    let stats = &report.statistics;

    info!("\n=== PRE-SCAN RESULTS ===");
    info!("Duration: {:.2} seconds", report.file_info.duration_seconds);
    info!("Sample rate: {} Hz", report.file_info.sample_rate);
    info!("Total beats detected: {}", stats.total_beats);
    match stats.final_bpm {
        Some(bpm) => info!("Final BPM: {}", bpm),
        None => info!("Final BPM: ---"),
    }
    if let (Some(average), Some((low, high))) = (stats.average_bpm, stats.bpm_range) {
        info!("Average BPM: {:.1}", average);
        info!("BPM range: {} - {}", low, high);
    }
    info!("Dominant frequency range: {}", stats.dominant_frequency_range);

    info!("\n=== PEAK VALUES ===");
    info!("Peak kick: {:.6}", stats.peak_kick);
    info!("Peak bass: {:.6}", stats.peak_bass);
    info!("Peak mid: {:.6}", stats.peak_mid);
    info!("Peak treble: {:.6}", stats.peak_treble);
    info!("Peak overall: {:.6}", stats.peak_overall);

    PrescanProcessor::save_report(&report, &args.output)?;
    let file_size = std::fs::metadata(&args.output)?.len();
    info!("Report saved to {:?} ({:.1} KB)", args.output, file_size as f64 / 1024.0);

    info!("\n✅ Pre-scan complete!");
    Ok(())
}
