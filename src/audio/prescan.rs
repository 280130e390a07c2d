use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use log::info;

use super::{BandEnergies, DecodedTrack, TrackSpectrum};
use crate::config::EngineConfig;
use crate::effects::ModulationOffsets;
use crate::engine::AudioReactiveEngine;
use crate::error::Result;

/// Whole-file analysis: beats, tempo over time and band statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescanReport {
    /// File metadata
    pub file_info: FileInfo,

    /// Every honoured beat with the tempo estimate right after it
    pub beats: Vec<BeatMark>,

    /// Tempo estimate each time it changed
    pub bpm_history: Vec<TempoPoint>,

    pub statistics: AnalysisStatistics,

    /// Per-frame values, only when requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frames: Option<Vec<PrescanFrame>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub filename: String,
    pub duration_seconds: f32,
    pub sample_rate: u32,
    pub total_samples: usize,
    pub frame_rate: u32,
    pub fft_size: usize,
    pub mode: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatMark {
    pub timestamp_ms: f64,
    pub bpm: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoPoint {
    pub timestamp_ms: f64,
    pub bpm: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescanFrame {
    pub timestamp_ms: f64,
    pub bands: BandEnergies,
    pub offsets: ModulationOffsets,
    pub beat: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisStatistics {
    /// Peak raw band values
    pub peak_kick: f32,
    pub peak_bass: f32,
    pub peak_mid: f32,
    pub peak_treble: f32,
    pub peak_overall: f32,

    pub total_beats: u32,
    /// Tempo at the end of the file
    pub final_bpm: Option<u32>,
    pub average_bpm: Option<f32>,
    pub bpm_range: Option<(u32, u32)>,

    /// "Kick-Heavy", "Bass-Heavy", "Treble-Focused" or "Balanced"
    pub dominant_frequency_range: String,
}

impl Default for AnalysisStatistics {
    fn default() -> Self {
        Self {
            peak_kick: 0.0,
            peak_bass: 0.0,
            peak_mid: 0.0,
            peak_treble: 0.0,
            peak_overall: 0.0,
            total_beats: 0,
            final_bpm: None,
            average_bpm: None,
            bpm_range: None,
            dominant_frequency_range: "Unknown".to_string(),
        }
    }
}

/// Runs the live pipeline over a whole file at a fixed frame rate, using
/// synthetic timestamps instead of a wall clock.
pub struct PrescanProcessor {
    config: EngineConfig,
    include_frames: bool,
}

impl PrescanProcessor {
    pub fn new(config: EngineConfig, include_frames: bool) -> Self {
        Self {
            config,
            include_frames,
        }
    }

    /// Decode and analyse an audio file.
    pub fn prescan_file<P: AsRef<Path>>(&self, file_path: P) -> Result<PrescanReport> {
        let path_str = file_path.as_ref().to_string_lossy().to_string();
        info!("Pre-scanning audio file: {}", path_str);

        let track = DecodedTrack::decode(&file_path)?;
        self.prescan_track(track, &path_str)
    }

    pub fn prescan_track(&self, track: DecodedTrack, filename: &str) -> Result<PrescanReport> {
        let fps = self.config.fps;
        let total_samples = track.samples.len();
        let duration_seconds = track.duration_secs();
        let sample_rate = track.sample_rate;

        let provider = TrackSpectrum::new(Arc::new(track), &self.config.analyser, fps, false);
        // enough ticks for the cursor to reach the last sample
        let total_frames = (total_samples as u64 * fps.max(1) as u64)
            .div_ceil(sample_rate.max(1) as u64)
            .max(1) as usize;

        let mut engine = AudioReactiveEngine::new(self.config.clone())?;
        engine.start_input(Box::new(provider));

        let mut beats = Vec::new();
        let mut bpm_history: Vec<TempoPoint> = Vec::new();
        let mut frames = Vec::new();
        let mut statistics = AnalysisStatistics::default();
        let mut band_sums = BandEnergies::default();

        for frame_index in 0..total_frames {
            let timestamp_ms = frame_index as f64 * 1000.0 / fps as f64;
            let output = engine.tick(timestamp_ms);

            Self::update_peaks(&mut statistics, &output.bands);
            band_sums.kick += output.bands.kick;
            band_sums.bass += output.bands.bass;
            band_sums.mid += output.bands.mid;
            band_sums.treble += output.bands.treble;

            if output.beat.is_some() {
                beats.push(BeatMark { timestamp_ms, bpm: output.bpm });
            }

            if let Some(bpm) = output.bpm {
                if bpm_history.last().map_or(true, |p| p.bpm != bpm) {
                    bpm_history.push(TempoPoint { timestamp_ms, bpm });
                }
            }

            if self.include_frames {
                frames.push(PrescanFrame {
                    timestamp_ms,
                    bands: output.bands,
                    offsets: output.offsets,
                    beat: output.beat.is_some(),
                });
            }

            if (frame_index + 1) % 1000 == 0 {
                info!(
                    "Pre-scanned {} frames ({:.1}s of {:.1}s)",
                    frame_index + 1, timestamp_ms / 1000.0, duration_seconds
                );
            }
        }

        statistics.total_beats = beats.len() as u32;
        statistics.final_bpm = engine.status().bpm;
        Self::summarise_tempo(&mut statistics, &bpm_history);
        statistics.dominant_frequency_range = Self::classify(&band_sums);

        info!(
            "Pre-scan complete: {} frames, {} beats, final BPM {}",
            total_frames,
            statistics.total_beats,
            engine.status().bpm_label()
        );

        Ok(PrescanReport {
            file_info: FileInfo {
                filename: filename.to_string(),
                duration_seconds,
                sample_rate,
                total_samples,
                frame_rate: fps,
                fft_size: self.config.analyser.fft_size,
                mode: self.config.mode.label().to_string(),
            },
            beats,
            bpm_history,
            statistics,
            frames: self.include_frames.then_some(frames),
        })
    }

    /// Save report to JSON file
    pub fn save_report<P: AsRef<Path>>(report: &PrescanReport, output_path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(output_path, json)?;
        Ok(())
    }

    /// Load report from JSON file
    pub fn load_report<P: AsRef<Path>>(input_path: P) -> Result<PrescanReport> {
        let json = std::fs::read_to_string(input_path)?;
        let report: PrescanReport = serde_json::from_str(&json)?;
        Ok(report)
    }

    fn update_peaks(stats: &mut AnalysisStatistics, bands: &BandEnergies) {
        stats.peak_kick = stats.peak_kick.max(bands.kick);
        stats.peak_bass = stats.peak_bass.max(bands.bass);
        stats.peak_mid = stats.peak_mid.max(bands.mid);
        stats.peak_treble = stats.peak_treble.max(bands.treble);
        stats.peak_overall = stats.peak_overall.max(bands.overall);
    }

    fn summarise_tempo(stats: &mut AnalysisStatistics, history: &[TempoPoint]) {
        if history.is_empty() {
            return;
        }
        let sum: u32 = history.iter().map(|p| p.bpm).sum();
        stats.average_bpm = Some(sum as f32 / history.len() as f32);

        let min = history.iter().map(|p| p.bpm).min().unwrap_or_default();
        let max = history.iter().map(|p| p.bpm).max().unwrap_or_default();
        stats.bpm_range = Some((min, max));
    }

    fn classify(sums: &BandEnergies) -> String {
        let (kick, bass, mid, treble) = (sums.kick, sums.bass, sums.mid, sums.treble);
        if kick > bass && kick > mid && kick > treble {
            "Kick-Heavy".to_string()
        } else if bass > mid && bass > treble {
            "Bass-Heavy".to_string()
        } else if treble > bass && treble > mid {
            "Treble-Focused".to_string()
        } else {
            "Balanced".to_string()
        }
    }
}
