use std::collections::VecDeque;
use std::ops::Range;
use log::debug;

use super::bands::{rms_energy, weighted_tiers, FrequencyProfile};
use super::SpectrumMeta;
use crate::config::DetectorConfig;

/// Fixed-length window of recent energies, pre-filled with zeros.
#[derive(Debug, Clone)]
pub struct EnergyHistory {
    values: VecDeque<f32>,
}

impl EnergyHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: std::iter::repeat(0.0).take(capacity.max(1)).collect(),
        }
    }

    pub fn push(&mut self, value: f32) {
        self.values.pop_front();
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn mean(&self) -> f32 {
        self.values.iter().sum::<f32>() / self.values.len() as f32
    }

    /// Population variance around `mean`.
    pub fn variance(&self, mean: f32) -> f32 {
        self.values.iter()
            .map(|&x| (x - mean).powi(2))
            .sum::<f32>()
            / self.values.len() as f32
    }

    pub fn reset(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RefractoryState {
    /// Next onset candidate is honoured
    Armed,
    /// Candidates are suppressed until `min_beat_interval_ms` has passed since `since`
    Refractory { since: f64 },
}

/// Energy-variance onset detector biased towards the kick drum.
///
/// Every call pushes the combined energy and the kick energy into their
/// histories, derives an adaptive threshold `(a - b * variance) * mean` for
/// each, and reports a beat when either the kick clears its threshold or the
/// combined energy clears its own while the kick is still reasonably strong.
/// A refractory period stops one drum hit from reading as several beats.
pub struct BeatDetector {
    config: DetectorConfig,
    kick_ranges: [Range<usize>; 3],
    kick_weights: [f32; 3],
    bass_range: Range<usize>,
    general_history: EnergyHistory,
    kick_history: EnergyHistory,
    state: RefractoryState,
    sensitivity: f32,
    last_energy: f32,
    last_kick: f32,
}

impl BeatDetector {
    pub fn new(config: &DetectorConfig, profile: &FrequencyProfile, meta: SpectrumMeta) -> Self {
        let kick_ranges = profile
            .kick_tiers
            .map(|tier| meta.bin_range(tier.low_hz, tier.high_hz));
        let kick_weights = profile.kick_tiers.map(|tier| tier.weight);

        Self {
            config: config.clone(),
            kick_ranges,
            kick_weights,
            bass_range: meta.bin_range(0.0, config.bass_cutoff_hz),
            general_history: EnergyHistory::new(config.general_history),
            kick_history: EnergyHistory::new(config.kick_history),
            state: RefractoryState::Armed,
            sensitivity: 1.0,
            last_energy: 0.0,
            last_kick: 0.0,
        }
    }

    /// Higher sensitivity lowers both thresholds.
    pub fn set_sensitivity(&mut self, sensitivity: f32) {
        self.sensitivity = sensitivity.max(0.01);
    }

    pub fn state(&self) -> RefractoryState {
        self.state
    }

    /// Combined and kick energy of the last analysed frame.
    pub fn last_energies(&self) -> (f32, f32) {
        (self.last_energy, self.last_kick)
    }

    pub fn detect_beat(&mut self, spectrum: &[u8], now_ms: f64) -> bool {
        let tiers: [(f32, f32, bool); 3] = std::array::from_fn(|i| {
            let range = self.kick_ranges[i].clone();
            let present = !range.is_empty();
            (rms_energy(spectrum, range), self.kick_weights[i], present)
        });
        let kick = weighted_tiers(&tiers);
        let bass = rms_energy(spectrum, self.bass_range.clone());
        let energy = self.config.kick_weight * kick + self.config.bass_weight * bass;

        self.general_history.push(energy);
        self.kick_history.push(kick);
        self.last_energy = energy;
        self.last_kick = kick;

        let general_mean = self.general_history.mean();
        let general_variance = self.general_history.variance(general_mean);
        let kick_mean = self.kick_history.mean();
        let kick_variance = self.kick_history.variance(kick_mean);

        let general_c = self.config.general_intercept - self.config.general_slope * general_variance;
        let kick_c = self.config.kick_intercept - self.config.kick_slope * kick_variance;

        let general_threshold = general_c * general_mean / self.sensitivity;
        let kick_threshold = kick_c * kick_mean / self.sensitivity;

        let kick_onset = kick > kick_threshold;
        let general_onset =
            energy > general_threshold && kick > self.config.fallback_kick_ratio * kick_mean;
        let candidate = kick_onset || general_onset;

        if let RefractoryState::Refractory { since } = self.state {
            if now_ms - since > self.config.min_beat_interval_ms {
                self.state = RefractoryState::Armed;
            }
        }

        if !candidate {
            return false;
        }

        match self.state {
            RefractoryState::Armed => {
                debug!(
                    "Beat at {:.0} ms: kick {:.3} (thr {:.3}), energy {:.3} (thr {:.3})",
                    now_ms, kick, kick_threshold, energy, general_threshold
                );
                self.state = RefractoryState::Refractory { since: now_ms };
                true
            }
            RefractoryState::Refractory { .. } => false,
        }
    }

    /// Zero both histories and re-arm.
    pub fn reset(&mut self) {
        self.general_history.reset();
        self.kick_history.reset();
        self.state = RefractoryState::Armed;
        self.last_energy = 0.0;
        self.last_kick = 0.0;
    }
}
