use super::BandEnergies;
use crate::config::{AnalysisMode, SmoothingConfig};

/// Smoothed band values, same fields as the raw extraction.
pub type SmoothedState = BandEnergies;

/// Exponential smoothing with a noise gate.
///
/// Small changes (below `threshold`) are treated as noise and the value decays
/// by `dampening`; larger changes are followed at rate `factor`.
#[derive(Debug, Clone, Copy)]
pub struct Smoother {
    threshold: f32,
    dampening: f32,
}

impl Smoother {
    pub fn new(config: &SmoothingConfig) -> Self {
        Self {
            threshold: config.threshold,
            dampening: config.dampening,
        }
    }

    pub fn smooth(&self, current: f32, raw: f32, factor: f32) -> f32 {
        let diff = (raw - current).abs();
        if diff < self.threshold {
            current * self.dampening
        } else {
            current + factor * (raw - current)
        }
    }

    /// Live modes follow the signal faster than file playback.
    pub fn factor_for(mode: AnalysisMode, audio_smoothing: f32) -> f32 {
        match mode {
            AnalysisMode::Standard => audio_smoothing,
            AnalysisMode::Live | AnalysisMode::KickFocus => (audio_smoothing * 0.5).max(0.05),
        }
    }

    pub fn apply(&self, state: &mut SmoothedState, raw: &BandEnergies, factor: f32) {
        state.kick = self.smooth(state.kick, raw.kick, factor);
        state.kick_fundamental = self.smooth(state.kick_fundamental, raw.kick_fundamental, factor);
        state.kick_harmonics = self.smooth(state.kick_harmonics, raw.kick_harmonics, factor);
        state.bass = self.smooth(state.bass, raw.bass, factor);
        state.mid = self.smooth(state.mid, raw.mid, factor);
        state.treble = self.smooth(state.treble, raw.treble, factor);
        state.overall = self.smooth(state.overall, raw.overall, factor);
    }

    /// Pure dampening, used while analysis is not running.
    pub fn decay(&self, state: &mut SmoothedState) {
        state.kick *= self.dampening;
        state.kick_fundamental *= self.dampening;
        state.kick_harmonics *= self.dampening;
        state.bass *= self.dampening;
        state.mid *= self.dampening;
        state.treble *= self.dampening;
        state.overall *= self.dampening;
    }
}

impl Default for Smoother {
    fn default() -> Self {
        Self::new(&SmoothingConfig::default())
    }
}
