use serde::{Deserialize, Serialize};
use std::ops::Range;
use log::{debug, warn};

use super::SpectrumMeta;
use crate::config::AnalysisMode;

/// One slice of the kick drum region with its contribution weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KickTier {
    pub low_hz: f32,
    pub high_hz: f32,
    pub weight: f32,
}

/// Fundamental 40-60 Hz, lower harmonics 60-80 Hz, upper harmonics 80-100 Hz.
pub const KICK_TIERS: [KickTier; 3] = [
    KickTier { low_hz: 40.0, high_hz: 60.0, weight: 3.0 },
    KickTier { low_hz: 60.0, high_hz: 80.0, weight: 2.5 },
    KickTier { low_hz: 80.0, high_hz: 100.0, weight: 2.0 },
];

/// How bands are carved out of the spectrum and aggregated.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyProfile {
    pub mode: AnalysisMode,

    /// RMS aggregation instead of weighted mean
    pub rms: bool,

    pub kick_tiers: [KickTier; 3],

    /// Bass covers the first `bass_fraction` of the bins
    pub bass_fraction: f32,

    /// Mid runs from the end of bass up to `mid_fraction` of the bins
    pub mid_fraction: f32,

    /// Bass weight falls linearly from 1.0 to `1.0 - bass_weight_decay`
    pub bass_weight_decay: f32,

    /// Treble weight rises linearly from this value to 1.0
    pub treble_weight_start: f32,

    /// Weights of kick, bass, mid, treble in the overall energy
    pub overall_blend: [f32; 4],
}

impl FrequencyProfile {
    /// Recorded playback: weighted mean over wide bands.
    pub fn standard() -> Self {
        Self {
            mode: AnalysisMode::Standard,
            rms: false,
            kick_tiers: KICK_TIERS,
            bass_fraction: 0.15,
            mid_fraction: 0.60,
            bass_weight_decay: 0.5,
            treble_weight_start: 0.5,
            overall_blend: [0.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0],
        }
    }

    /// Microphone input: RMS over narrower low bands.
    pub fn live() -> Self {
        Self {
            mode: AnalysisMode::Live,
            rms: true,
            kick_tiers: KICK_TIERS,
            bass_fraction: 0.08,
            mid_fraction: 0.50,
            bass_weight_decay: 0.3,
            treble_weight_start: 1.0,
            overall_blend: [0.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0],
        }
    }

    /// Live profile with overall energy dominated by the kick drum.
    pub fn kick_focused() -> Self {
        Self {
            mode: AnalysisMode::KickFocus,
            overall_blend: [0.70, 0.20, 0.08, 0.02],
            ..Self::live()
        }
    }

    pub fn for_mode(mode: AnalysisMode) -> Self {
        match mode {
            AnalysisMode::Standard => Self::standard(),
            AnalysisMode::Live => Self::live(),
            AnalysisMode::KickFocus => Self::kick_focused(),
        }
    }
}

/// Per-frame band energies, each in 0.0-1.0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BandEnergies {
    /// All three kick tiers combined by tier weight
    pub kick: f32,
    pub kick_fundamental: f32,
    pub kick_harmonics: f32,
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    pub overall: f32,
}

/// Weighted energy of `spectrum[range]`, normalised to 0.0-1.0.
///
/// `weight(i, n)` gives the weight of the `i`-th bin out of `n`. Dividing by
/// the total weight maps a full-scale range to exactly 1.0.
pub(crate) fn band_energy<W>(spectrum: &[u8], range: Range<usize>, rms: bool, weight: W) -> f32
where
    W: Fn(usize, usize) -> f32,
{
    let end = range.end.min(spectrum.len());
    let start = range.start;
    if start >= end {
        return 0.0;
    }

    let n = end - start;
    let mut weighted = 0.0f32;
    let mut total_weight = 0.0f32;
    for (i, &byte) in spectrum[start..end].iter().enumerate() {
        let w = weight(i, n);
        let m = byte as f32;
        weighted += if rms { w * m * m } else { w * m };
        total_weight += w;
    }

    if total_weight <= 0.0 {
        return 0.0;
    }

    let value = if rms {
        (weighted / total_weight).sqrt()
    } else {
        weighted / total_weight
    };
    (value / 255.0).clamp(0.0, 1.0)
}

/// Unweighted RMS energy of a range.
pub(crate) fn rms_energy(spectrum: &[u8], range: Range<usize>) -> f32 {
    band_energy(spectrum, range, true, |_, _| 1.0)
}

/// Combine per-tier energies by tier weight.
///
/// Tiers flagged as absent (no bins at this resolution) are left out of both
/// sums, so a full-scale spectrum still reads 1.0.
pub(crate) fn weighted_tiers(tiers: &[(f32, f32, bool)]) -> f32 {
    let present = || tiers.iter().filter(|(_, _, has_bins)| *has_bins);
    let total: f32 = present().map(|(_, w, _)| w).sum();
    if total <= 0.0 {
        return 0.0;
    }
    present().map(|(e, w, _)| e * w).sum::<f32>() / total
}

/// Turns a byte spectrum into `BandEnergies` according to a `FrequencyProfile`.
pub struct BandExtractor {
    profile: FrequencyProfile,
    meta: SpectrumMeta,
    kick_ranges: [Range<usize>; 3],
    bass_range: Range<usize>,
    mid_range: Range<usize>,
    treble_range: Range<usize>,
}

impl BandExtractor {
    pub fn new(profile: FrequencyProfile, meta: SpectrumMeta) -> Self {
        let bins = meta.bin_count;
        let bass_end = (bins as f32 * profile.bass_fraction).floor() as usize;
        let mid_end = ((bins as f32 * profile.mid_fraction).floor() as usize).max(bass_end);

        let kick_ranges = profile
            .kick_tiers
            .map(|tier| meta.bin_range(tier.low_hz, tier.high_hz));

        for (tier, range) in profile.kick_tiers.iter().zip(kick_ranges.iter()) {
            if range.is_empty() {
                warn!(
                    "Kick tier {:.0}-{:.0} Hz maps to no bins at {:.1} Hz per bin; it is left out of the kick energy",
                    tier.low_hz, tier.high_hz, meta.bin_width()
                );
            }
        }

        debug!(
            "Band layout ({}): kick {:?}, bass 0..{}, mid {}..{}, treble {}..{}",
            profile.mode.label(), kick_ranges, bass_end, bass_end, mid_end, mid_end, bins
        );

        Self {
            profile,
            meta,
            kick_ranges,
            bass_range: 0..bass_end,
            mid_range: bass_end..mid_end,
            treble_range: mid_end..bins,
        }
    }

    pub fn meta(&self) -> SpectrumMeta {
        self.meta
    }

    pub fn extract(&self, spectrum: &[u8]) -> BandEnergies {
        let rms = self.profile.rms;

        let tiers: [(f32, f32, bool); 3] = std::array::from_fn(|i| {
            let range = self.kick_ranges[i].clone();
            let present = !range.is_empty();
            let energy = band_energy(spectrum, range, rms, |_, _| 1.0);
            (energy, self.profile.kick_tiers[i].weight, present)
        });

        let kick = weighted_tiers(&tiers);
        let kick_fundamental = tiers[0].0;
        let kick_harmonics = weighted_tiers(&tiers[1..]);

        let decay = self.profile.bass_weight_decay;
        let bass = band_energy(spectrum, self.bass_range.clone(), rms, |i, n| {
            1.0 - (i as f32 / n as f32) * decay
        });

        let mid = band_energy(spectrum, self.mid_range.clone(), rms, |_, _| 1.0);

        let start = self.profile.treble_weight_start;
        let treble = band_energy(spectrum, self.treble_range.clone(), rms, |i, n| {
            start + (1.0 - start) * (i as f32 / n as f32)
        });

        let [wk, wb, wm, wt] = self.profile.overall_blend;
        let overall = (kick * wk + bass * wb + mid * wm + treble * wt).clamp(0.0, 1.0);

        BandEnergies {
            kick,
            kick_fundamental,
            kick_harmonics,
            bass,
            mid,
            treble,
            overall,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> SpectrumMeta {
        SpectrumMeta::new(44100.0, 2048)
    }

    #[test]
    fn test_full_scale_spectrum_reads_one_everywhere() {
        let spectrum = vec![255u8; 1024];
        for profile in [
            FrequencyProfile::standard(),
            FrequencyProfile::live(),
            FrequencyProfile::kick_focused(),
        ] {
            let bands = BandExtractor::new(profile, meta()).extract(&spectrum);
            for value in [
                bands.kick,
                bands.kick_fundamental,
                bands.kick_harmonics,
                bands.bass,
                bands.mid,
                bands.treble,
                bands.overall,
            ] {
                assert!((value - 1.0).abs() < 1e-4, "expected ~1.0, got {}", value);
            }
        }
    }

    #[test]
    fn test_collapsed_tier_does_not_dilute_kick_at_48k() {
        let meta = SpectrumMeta::new(48000.0, 2048);
        assert!(meta.bin_range(60.0, 80.0).is_empty());

        let spectrum = vec![255u8; 1024];
        for profile in [
            FrequencyProfile::standard(),
            FrequencyProfile::live(),
            FrequencyProfile::kick_focused(),
        ] {
            let mode = profile.mode;
            let bands = BandExtractor::new(profile, meta).extract(&spectrum);
            for value in [
                bands.kick,
                bands.kick_fundamental,
                bands.kick_harmonics,
                bands.bass,
                bands.mid,
                bands.treble,
                bands.overall,
            ] {
                assert!((value - 1.0).abs() < 1e-4, "{:?}: {:?}", mode, bands);
            }
        }
    }

    #[test]
    fn test_weighted_tiers_skips_absent_tiers() {
        let tiers = [(1.0, 3.0, true), (0.0, 2.5, false), (0.5, 2.0, true)];
        assert!((weighted_tiers(&tiers) - 4.0 / 5.0).abs() < 1e-6);
        assert_eq!(weighted_tiers(&[(0.0, 2.5, false)]), 0.0);
    }

    #[test]
    fn test_silence_reads_zero() {
        let spectrum = vec![0u8; 1024];
        let bands = BandExtractor::new(FrequencyProfile::live(), meta()).extract(&spectrum);
        assert_eq!(bands, BandEnergies::default());
    }

    #[test]
    fn test_kick_tiers_split_fundamental_and_harmonics() {
        // 50 Hz lands in bin 2, the fundamental tier
        let mut spectrum = vec![0u8; 1024];
        spectrum[2] = 255;
        let bands = BandExtractor::new(FrequencyProfile::kick_focused(), meta()).extract(&spectrum);

        assert!((bands.kick_fundamental - 1.0).abs() < 1e-6);
        assert_eq!(bands.kick_harmonics, 0.0);
        assert!((bands.kick - 3.0 / 7.5).abs() < 1e-6);
        assert!(bands.overall > 0.7 * bands.kick - 1e-6);
    }

    #[test]
    fn test_mean_and_rms_aggregation_differ() {
        let mut spectrum = vec![0u8; 1024];
        for i in (0..1024).step_by(2) {
            spectrum[i] = 200;
        }
        let mean = band_energy(&spectrum, 200..400, false, |_, _| 1.0);
        let rms = band_energy(&spectrum, 200..400, true, |_, _| 1.0);
        assert!((mean - 100.0 / 255.0).abs() < 1e-5);
        assert!((rms - (20000.0f32).sqrt() / 255.0).abs() < 1e-5);
    }

    #[test]
    fn test_zero_width_range_reads_zero() {
        let spectrum = vec![255u8; 16];
        assert_eq!(band_energy(&spectrum, 5..5, true, |_, _| 1.0), 0.0);
        assert_eq!(band_energy(&spectrum, 20..30, false, |_, _| 1.0), 0.0);
    }

    #[test]
    fn test_short_spectrum_does_not_panic() {
        let spectrum = vec![255u8; 10];
        let bands = BandExtractor::new(FrequencyProfile::standard(), meta()).extract(&spectrum);
        assert!(bands.bass > 0.0);
        assert_eq!(bands.treble, 0.0);
    }
}
