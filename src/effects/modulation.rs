use serde::{Deserialize, Serialize};

use crate::audio::{BeatEvent, SmoothedState};
use crate::config::{AnalysisMode, ModulationConfig};

/// How strongly each band drives each visual parameter in one mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModulationWeights {
    pub time_scale_overall: f32,
    pub bloom_bass: f32,
    pub bloom_kick: f32,
    pub pattern_overall: f32,
    pub pattern_kick: f32,
    pub distort_x_mid: f32,
    pub distort_x_kick_fundamental: f32,
    pub distort_y_treble: f32,
    pub distort_y_kick_harmonics: f32,

    /// Added to bloom on the frame of a beat, times `visual_response`
    pub beat_bloom: f32,
    /// Added to pattern amplitude on the frame of a beat, times `visual_response`
    pub beat_pattern: f32,
    /// Peak bloom of the fading flash after a beat
    pub flash_bloom: f32,
}

impl ModulationWeights {
    pub fn standard() -> Self {
        Self {
            time_scale_overall: 0.15,
            bloom_bass: 1.0,
            bloom_kick: 0.0,
            pattern_overall: 0.0,
            pattern_kick: 0.0,
            distort_x_mid: 5.0,
            distort_x_kick_fundamental: 0.0,
            distort_y_treble: 8.0,
            distort_y_kick_harmonics: 0.0,
            beat_bloom: 0.0,
            beat_pattern: 0.0,
            flash_bloom: 0.0,
        }
    }

    pub fn live() -> Self {
        Self {
            time_scale_overall: 0.3,
            bloom_bass: 2.5,
            bloom_kick: 2.5,
            pattern_overall: 15.0,
            pattern_kick: 0.0,
            distort_x_mid: 8.0,
            distort_x_kick_fundamental: 0.0,
            distort_y_treble: 12.0,
            distort_y_kick_harmonics: 0.0,
            beat_bloom: 3.0,
            beat_pattern: 20.0,
            flash_bloom: 2.0,
        }
    }

    pub fn kick_focused() -> Self {
        Self {
            time_scale_overall: 0.3,
            bloom_bass: 0.25,
            bloom_kick: 4.0,
            pattern_overall: 1.5,
            pattern_kick: 25.0,
            distort_x_mid: 0.8,
            distort_x_kick_fundamental: 15.0,
            distort_y_treble: 1.2,
            distort_y_kick_harmonics: 20.0,
            beat_bloom: 3.0,
            beat_pattern: 20.0,
            flash_bloom: 2.0,
        }
    }

    pub fn for_mode(mode: AnalysisMode) -> Self {
        match mode {
            AnalysisMode::Standard => Self::standard(),
            AnalysisMode::Live => Self::live(),
            AnalysisMode::KickFocus => Self::kick_focused(),
        }
    }

    pub fn reacts_to_beats(&self) -> bool {
        self.beat_bloom > 0.0 || self.beat_pattern > 0.0 || self.flash_bloom > 0.0
    }
}

/// Offsets added on top of the baseline visual parameters for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModulationOffsets {
    pub time_scale: f32,
    pub bloom: f32,
    pub pattern_amp: f32,
    pub distort_x: f32,
    pub distort_y: f32,
    /// `visual_response` on the frame of a beat, otherwise 0
    pub beat: f32,
    /// Flash strength, 1.0 right on the beat fading to 0.0
    pub beat_intensity: f32,
}

impl ModulationOffsets {
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// Maps smoothed band energies and beats onto visual parameter offsets.
///
/// Response multipliers from `ModulationConfig` are applied here, after
/// smoothing, so every output is `intensity * weight * response * band`.
/// Nothing is produced while the weighted overall energy is zero. Outputs are
/// not clamped: the rendering side decides what range it accepts.
pub struct ModulationEngine {
    weights: ModulationWeights,
    last_beat_ms: Option<f64>,
}

impl ModulationEngine {
    pub fn new(mode: AnalysisMode) -> Self {
        Self::with_weights(ModulationWeights::for_mode(mode))
    }

    pub fn with_weights(weights: ModulationWeights) -> Self {
        Self {
            weights,
            last_beat_ms: None,
        }
    }

    pub fn reset(&mut self) {
        self.last_beat_ms = None;
    }

    pub fn compute(
        &mut self,
        smoothed: &SmoothedState,
        beat: Option<BeatEvent>,
        now_ms: f64,
        config: &ModulationConfig,
    ) -> ModulationOffsets {
        if let Some(event) = beat {
            self.last_beat_ms = Some(event.timestamp_ms);
        }

        let overall = smoothed.overall * config.audio_sensitivity;
        if overall <= 0.0 {
            return ModulationOffsets::default();
        }

        let w = &self.weights;
        let intensity = config.audio_intensity;
        let bass = smoothed.bass * config.bass_response;
        let mid = smoothed.mid * config.mid_response;
        let treble = smoothed.treble * config.treble_response;
        let kick = smoothed.kick * config.kick_response;
        let kick_fundamental = smoothed.kick_fundamental * config.kick_response;
        let kick_harmonics = smoothed.kick_harmonics * config.kick_response;

        let mut offsets = ModulationOffsets {
            time_scale: w.time_scale_overall * overall * intensity,
            bloom: (w.bloom_bass * bass + w.bloom_kick * kick) * intensity,
            pattern_amp: (w.pattern_overall * overall + w.pattern_kick * kick) * intensity,
            distort_x: (w.distort_x_mid * mid + w.distort_x_kick_fundamental * kick_fundamental) * intensity,
            distort_y: (w.distort_y_treble * treble + w.distort_y_kick_harmonics * kick_harmonics) * intensity,
            beat: 0.0,
            beat_intensity: 0.0,
        };

        let response = config.visual_response;
        if !w.reacts_to_beats() || response <= 0.0 {
            return offsets;
        }

        if beat.is_some() {
            offsets.beat = response;
            offsets.bloom += w.beat_bloom * response;
            offsets.pattern_amp += w.beat_pattern * response;
        }

        if let Some(last) = self.last_beat_ms {
            let elapsed = now_ms - last;
            let window = config.flash_window_ms;
            if window > 0.0 && elapsed >= 0.0 && elapsed < window {
                let flash = (1.0 - elapsed / window) as f32;
                offsets.beat_intensity = flash;
                offsets.bloom += w.flash_bloom * flash;
            }
        }

        offsets
    }
}
