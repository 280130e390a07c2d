use rustfft::{Fft, FftPlanner, num_complex::Complex};
use std::sync::Arc;

use super::SpectrumMeta;
use crate::config::AnalyserConfig;

/// Converts blocks of mono PCM into 8-bit magnitude spectra.
///
/// Each block is Blackman-windowed and transformed; bin magnitudes are scaled
/// by `1/N`, blended with the previous frame by the smoothing time constant,
/// converted to decibels and mapped linearly from `[min_decibels,
/// max_decibels]` onto 0-255.
pub struct SpectrumAnalyser {
    meta: SpectrumMeta,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    smoothing_time_constant: f32,
    min_decibels: f32,
    max_decibels: f32,
}

impl SpectrumAnalyser {
    pub fn new(sample_rate: f32, config: &AnalyserConfig) -> Self {
        let fft_size = config.fft_size;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        Self {
            meta: SpectrumMeta::new(sample_rate, fft_size),
            fft,
            window: Self::blackman_window(fft_size),
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            scratch,
            smoothed: vec![0.0; fft_size / 2],
            smoothing_time_constant: config.smoothing_time_constant.clamp(0.0, 1.0),
            min_decibels: config.min_decibels,
            max_decibels: config.max_decibels,
        }
    }

    fn blackman_window(size: usize) -> Vec<f32> {
        let alpha = 0.16;
        let a0 = 0.5 * (1.0 - alpha);
        let a1 = 0.5;
        let a2 = 0.5 * alpha;
        (0..size)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / size as f32;
                a0 - a1 * phase.cos() + a2 * (2.0 * phase).cos()
            })
            .collect()
    }

    pub fn meta(&self) -> SpectrumMeta {
        self.meta
    }

    pub fn fft_size(&self) -> usize {
        self.meta.fft_size
    }

    /// Analyse the last `fft_size` samples of `samples` (zero-padded at the
    /// front when shorter) and write bytes into `out`.
    pub fn process(&mut self, samples: &[f32], out: &mut [u8]) {
        let fft_size = self.meta.fft_size;
        let take = samples.len().min(fft_size);
        let offset = fft_size - take;
        let tail = &samples[samples.len() - take..];

        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = if i < offset { 0.0 } else { tail[i - offset] };
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        let tau = self.smoothing_time_constant;
        let scale = 1.0 / fft_size as f32;
        for (prev, bin) in self.smoothed.iter_mut().zip(self.buffer.iter()) {
            let magnitude = bin.norm() * scale;
            *prev = tau * *prev + (1.0 - tau) * magnitude;
        }

        self.write_bytes(out);
    }

    /// Fresh analyser state, as after construction.
    pub fn reset(&mut self) {
        self.smoothed.iter_mut().for_each(|v| *v = 0.0);
    }

    fn write_bytes(&self, out: &mut [u8]) {
        let range = self.max_decibels - self.min_decibels;
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = match self.smoothed.get(i) {
                Some(&magnitude) if magnitude > 0.0 && range > 0.0 => {
                    let db = 20.0 * magnitude.log10();
                    let scaled = 255.0 * (db - self.min_decibels) / range;
                    scaled.clamp(0.0, 255.0) as u8
                }
                _ => 0,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, amplitude: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_silence_maps_to_zero() {
        let mut analyser = SpectrumAnalyser::new(44100.0, &AnalyserConfig::default());
        let mut out = vec![7u8; 1024];
        analyser.process(&vec![0.0; 2048], &mut out);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_tone_peaks_at_its_bin() {
        let config = AnalyserConfig { smoothing_time_constant: 0.0, ..Default::default() };
        let mut analyser = SpectrumAnalyser::new(44100.0, &config);
        let mut out = vec![0u8; 1024];
        // bin 93 is centred on 2002.6 Hz
        let freq = 93.0 * 44100.0 / 2048.0;
        analyser.process(&tone(freq, 0.5, 44100.0, 2048), &mut out);

        let peak = out.iter().enumerate().max_by_key(|(_, &b)| b).map(|(i, _)| i);
        assert_eq!(peak, Some(93));
        assert!(out[93] > 200);
        assert_eq!(out[600], 0);
    }

    #[test]
    fn test_smoothing_carries_previous_frame() {
        let config = AnalyserConfig { smoothing_time_constant: 0.8, ..Default::default() };
        let mut analyser = SpectrumAnalyser::new(44100.0, &config);
        let mut loud = vec![0u8; 1024];
        let mut after = vec![0u8; 1024];
        let freq = 93.0 * 44100.0 / 2048.0;

        analyser.process(&tone(freq, 0.5, 44100.0, 2048), &mut loud);
        analyser.process(&vec![0.0; 2048], &mut after);
        assert!(after[93] > 0);
        assert!(after[93] < loud[93]);

        analyser.reset();
        analyser.process(&vec![0.0; 2048], &mut after);
        assert_eq!(after[93], 0);
    }

    #[test]
    fn test_short_input_is_zero_padded() {
        let mut analyser = SpectrumAnalyser::new(44100.0, &AnalyserConfig::default());
        let mut out = vec![0u8; 1024];
        analyser.process(&[0.25; 100], &mut out);
        assert!(out.iter().any(|&b| b > 0));
    }
}
