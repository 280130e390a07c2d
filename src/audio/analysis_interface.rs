use std::ops::Range;

/// Shape of the byte spectra a provider produces.
///
/// Bin `k` covers frequencies around `k * sample_rate / fft_size`. Frequency
/// ranges are mapped to bins by rounding, so a range `[lo, hi)` in Hz covers
/// bins `[hz_to_bin(lo), hz_to_bin(hi))`.
///
/// # Example
/// ```rust
/// use housepulse::audio::SpectrumMeta;
///
/// let meta = SpectrumMeta::new(44100.0, 2048);
/// assert_eq!(meta.bin_count, 1024);
/// assert_eq!(meta.hz_to_bin(50.0), 2);
/// assert_eq!(meta.bin_range(0.0, 250.0), 0..12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumMeta {
    pub bin_count: usize,
    pub sample_rate: f32,
    pub fft_size: usize,
}

impl SpectrumMeta {
    pub fn new(sample_rate: f32, fft_size: usize) -> Self {
        Self {
            bin_count: fft_size / 2,
            sample_rate,
            fft_size,
        }
    }

    /// Width of one bin in Hz.
    pub fn bin_width(&self) -> f32 {
        if self.fft_size == 0 {
            return 0.0;
        }
        self.sample_rate / self.fft_size as f32
    }

    /// Nearest bin for a frequency, clamped to `bin_count`.
    pub fn hz_to_bin(&self, hz: f32) -> usize {
        let width = self.bin_width();
        if width <= 0.0 || hz <= 0.0 {
            return 0;
        }
        ((hz / width).round() as usize).min(self.bin_count)
    }

    /// Bins covering `[lo_hz, hi_hz)`. Empty when the range collapses.
    pub fn bin_range(&self, lo_hz: f32, hi_hz: f32) -> Range<usize> {
        let start = self.hz_to_bin(lo_hz);
        let end = self.hz_to_bin(hi_hz).max(start);
        start..end
    }
}

/// Common interface for everything that can feed the analysis pipeline.
///
/// A provider owns its capture or playback state and refills a caller-owned
/// byte buffer on each tick. Values are 8-bit magnitudes (0 = at or below the
/// analyser's decibel floor, 255 = at or above its ceiling).
///
/// # Implementation Requirements
/// - `magnitudes` must never block: drain whatever audio is available and return
/// - `out` may be shorter or longer than `meta().bin_count`; fill what overlaps
///   and zero the rest
///
/// # Available Implementations
/// - `LiveInput`: microphone capture (cpal)
/// - `FilePlayback`: decoded file played through the default output (rodio)
/// - `TrackSpectrum`: decoded file advanced a fixed step per tick (offline, tests)
/// - `SyntheticSpectrum`: seeded four-on-the-floor pattern, no device needed
///
/// Providers are not required to be `Send`: audio device handles stay on the
/// thread that created them.
pub trait SpectrumProvider {
    /// Spectrum shape, used to map frequency ranges to bins.
    fn meta(&self) -> SpectrumMeta;

    /// Write the current magnitude spectrum into `out`.
    fn magnitudes(&mut self, out: &mut [u8]);

    /// Short identification string ("microphone", "file", ...), used for logging.
    fn source_type(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bin_mapping_rounds() {
        let meta = SpectrumMeta::new(44100.0, 2048);
        // 21.53 Hz per bin
        assert_eq!(meta.hz_to_bin(40.0), 2);
        assert_eq!(meta.hz_to_bin(60.0), 3);
        assert_eq!(meta.hz_to_bin(80.0), 4);
        assert_eq!(meta.hz_to_bin(100.0), 5);
    }

    #[test]
    fn test_bin_mapping_clamps_to_bin_count() {
        let meta = SpectrumMeta::new(44100.0, 2048);
        assert_eq!(meta.hz_to_bin(96_000.0), 1024);
        assert_eq!(meta.hz_to_bin(-5.0), 0);
    }

    #[test]
    fn test_collapsed_range_is_empty() {
        let meta = SpectrumMeta::new(44100.0, 256);
        // 172 Hz per bin: both edges round to bin 0
        assert!(meta.bin_range(40.0, 60.0).is_empty());
        assert!(meta.bin_range(300.0, 200.0).is_empty());
    }
}
