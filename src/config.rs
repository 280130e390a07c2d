use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::Path;
use log::info;

use crate::error::{AnalysisError, Result};

/// Which frequency profile, smoothing rule and modulation table the engine runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisMode {
    /// Recorded-file playback: weighted-mean bands, gentle modulation
    #[default]
    Standard,
    /// Microphone input: RMS bands, faster smoothing, beat bumps
    Live,
    /// Live analysis with kick drum tiers driving most outputs
    KickFocus,
}

impl AnalysisMode {
    pub fn label(&self) -> &'static str {
        match self {
            AnalysisMode::Standard => "standard",
            AnalysisMode::Live => "live",
            AnalysisMode::KickFocus => "kick-focus",
        }
    }
}

/// Top-level engine configuration, loaded from and saved to JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub mode: AnalysisMode,

    /// When off, smoothed values only decay and no offsets are produced
    pub audio_reactive: bool,

    /// When off, no beats and no tempo estimate are produced
    pub beat_detection: bool,

    /// Tick rate of the live runner and frame rate of offline analysis
    pub fps: u32,

    /// Name of the visual preset applied by the runner ("default" for the baseline)
    pub preset: String,

    pub modulation: ModulationConfig,
    pub smoothing: SmoothingConfig,
    pub detector: DetectorConfig,
    pub tempo: TempoConfig,
    pub analyser: AnalyserConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: AnalysisMode::Standard,
            audio_reactive: true,
            beat_detection: true,
            fps: 60,
            preset: "default".to_string(),
            modulation: ModulationConfig::default(),
            smoothing: SmoothingConfig::default(),
            detector: DetectorConfig::default(),
            tempo: TempoConfig::default(),
            analyser: AnalyserConfig::default(),
        }
    }
}

/// Runtime knobs read by the modulation stage every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulationConfig {
    /// Multiplier on overall energy
    pub audio_sensitivity: f32,
    pub bass_response: f32,
    pub mid_response: f32,
    pub treble_response: f32,
    /// Multiplier on the kick drum bands
    pub kick_response: f32,
    /// Base smoothing factor (0.0 to 1.0, higher follows the raw signal faster)
    pub audio_smoothing: f32,
    /// Scales every continuous offset
    pub audio_intensity: f32,
    /// Divides the beat thresholds (higher = more beats)
    pub beat_sensitivity: f32,
    /// Strength of the beat bump and flash
    pub visual_response: f32,
    /// How long the beat flash takes to fade out
    pub flash_window_ms: f64,
}

impl Default for ModulationConfig {
    fn default() -> Self {
        Self {
            audio_sensitivity: 1.5,
            bass_response: 2.0,
            mid_response: 1.0,
            treble_response: 0.8,
            kick_response: 1.5,
            audio_smoothing: 0.1,
            audio_intensity: 1.2,
            beat_sensitivity: 1.0,
            visual_response: 2.0,
            flash_window_ms: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Differences below this are treated as noise and decayed instead of followed
    pub threshold: f32,
    pub dampening: f32,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            threshold: 0.02,
            dampening: 0.95,
        }
    }
}

/// Onset detector tuning. Thresholds are `(intercept - slope * variance) * mean`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub general_history: usize,
    pub kick_history: usize,
    pub min_beat_interval_ms: f64,
    pub kick_weight: f32,
    pub bass_weight: f32,
    /// Upper edge of the bass range fed into the combined energy
    pub bass_cutoff_hz: f32,
    /// A general-energy onset also needs the kick above this fraction of its mean
    pub fallback_kick_ratio: f32,
    pub general_intercept: f32,
    pub general_slope: f32,
    pub kick_intercept: f32,
    pub kick_slope: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            general_history: 43,
            kick_history: 20,
            min_beat_interval_ms: 150.0,
            kick_weight: 0.8,
            bass_weight: 0.2,
            bass_cutoff_hz: 250.0,
            fallback_kick_ratio: 0.7,
            general_intercept: 1.514_285_7,
            general_slope: 2.5714,
            kick_intercept: 1.7,
            kick_slope: 3.2,
        }
    }
}

/// Most beat timestamps the tempo estimator may keep.
pub const MAX_TEMPO_HISTORY: usize = 8;

/// Tempo estimates always land in this house range.
pub const HOUSE_BPM_RANGE: RangeInclusive<u32> = 100..=140;

/// Tempo estimator tuning. `capacity` may not exceed `MAX_TEMPO_HISTORY` and
/// the BPM bounds must sit inside `HOUSE_BPM_RANGE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TempoConfig {
    pub capacity: usize,
    pub min_beats: usize,
    /// Intervals further than this fraction from the mean are dropped
    pub outlier_tolerance: f64,
    pub min_bpm: u32,
    pub max_bpm: u32,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            capacity: 8,
            min_beats: 4,
            outlier_tolerance: 0.3,
            min_bpm: 100,
            max_bpm: 140,
        }
    }
}

/// PCM to byte-spectrum conversion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyserConfig {
    pub fft_size: usize,
    /// Blend with the previous frame (0.0 = none, 1.0 = frozen)
    pub smoothing_time_constant: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            smoothing_time_constant: 0.3,
            min_decibels: -100.0,
            max_decibels: -10.0,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(&path)?;
        let config: EngineConfig = serde_json::from_str(&json)?;
        config.validate()?;
        info!("Loaded engine config from {:?} (mode: {})", path.as_ref(), config.mode.label());
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Reject settings that would make analysis meaningless.
    pub fn validate(&self) -> Result<()> {
        let degenerate = |msg: String| Err(AnalysisError::DegenerateConfiguration(msg));

        if self.fps == 0 {
            return degenerate("fps must be positive".to_string());
        }

        let fft_size = self.analyser.fft_size;
        if !fft_size.is_power_of_two() || !(32..=32768).contains(&fft_size) {
            return degenerate(format!("fft_size {} must be a power of two in 32..=32768", fft_size));
        }
        if self.analyser.min_decibels >= self.analyser.max_decibels {
            return degenerate(format!(
                "decibel range {}..{} is empty",
                self.analyser.min_decibels, self.analyser.max_decibels
            ));
        }
        if !(0.0..=1.0).contains(&self.analyser.smoothing_time_constant) {
            return degenerate("smoothing_time_constant must be within 0.0..=1.0".to_string());
        }

        if self.detector.general_history == 0 || self.detector.kick_history == 0 {
            return degenerate("energy histories need at least one slot".to_string());
        }
        if self.detector.min_beat_interval_ms < 0.0 {
            return degenerate("min_beat_interval_ms must not be negative".to_string());
        }

        let tempo = &self.tempo;
        if tempo.min_beats < 2 || tempo.capacity < tempo.min_beats || tempo.capacity > MAX_TEMPO_HISTORY {
            return degenerate(format!(
                "tempo needs 2 <= min_beats ({}) <= capacity ({}) <= {}",
                tempo.min_beats, tempo.capacity, MAX_TEMPO_HISTORY
            ));
        }
        if tempo.min_bpm > tempo.max_bpm
            || !HOUSE_BPM_RANGE.contains(&tempo.min_bpm)
            || !HOUSE_BPM_RANGE.contains(&tempo.max_bpm)
        {
            return degenerate(format!(
                "tempo range {}..={} must lie within {}..={}",
                tempo.min_bpm, tempo.max_bpm, HOUSE_BPM_RANGE.start(), HOUSE_BPM_RANGE.end()
            ));
        }

        if !(0.0..=1.0).contains(&self.smoothing.dampening) {
            return degenerate("dampening must be within 0.0..=1.0".to_string());
        }

        Ok(())
    }
}
