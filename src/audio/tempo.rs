use std::collections::VecDeque;
use log::debug;

use crate::config::TempoConfig;

/// Tempo estimate from the timestamps of recent beats.
///
/// Keeps the last `capacity` beat times. Once `min_beats` are present the
/// consecutive intervals are averaged, intervals further than
/// `outlier_tolerance` of that average are dropped, and the surviving average
/// is converted to BPM and clamped into the house range.
pub struct BpmEstimator {
    config: TempoConfig,
    timestamps: VecDeque<f64>,
    estimated_bpm: Option<u32>,
}

impl BpmEstimator {
    pub fn new(config: &TempoConfig) -> Self {
        Self {
            config: config.clone(),
            timestamps: VecDeque::with_capacity(config.capacity),
            estimated_bpm: None,
        }
    }

    pub fn add_beat(&mut self, timestamp_ms: f64) {
        self.timestamps.push_back(timestamp_ms);
        while self.timestamps.len() > self.config.capacity {
            self.timestamps.pop_front();
        }

        if self.timestamps.len() >= self.config.min_beats {
            self.recalculate();
        }
    }

    /// Current estimate, `None` until enough beats have been seen.
    pub fn bpm(&self) -> Option<u32> {
        self.estimated_bpm
    }

    pub fn timestamps(&self) -> impl Iterator<Item = f64> + '_ {
        self.timestamps.iter().copied()
    }

    pub fn reset(&mut self) {
        self.timestamps.clear();
        self.estimated_bpm = None;
    }

    fn recalculate(&mut self) {
        let intervals: Vec<f64> = self.timestamps.iter()
            .zip(self.timestamps.iter().skip(1))
            .map(|(a, b)| b - a)
            .collect();

        let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;
        let tolerance = mean * self.config.outlier_tolerance;

        let kept: Vec<f64> = intervals.iter()
            .copied()
            .filter(|interval| (interval - mean).abs() < tolerance)
            .collect();

        if kept.is_empty() {
            debug!("Every beat interval is an outlier around {:.1} ms; keeping {:?} BPM", mean, self.estimated_bpm);
            return;
        }

        let average = kept.iter().sum::<f64>() / kept.len() as f64;
        if average <= 0.0 {
            return;
        }

        let bpm = (60_000.0 / average).round();
        let clamped = bpm.clamp(self.config.min_bpm as f64, self.config.max_bpm as f64) as u32;
        self.estimated_bpm = Some(clamped);
    }
}
