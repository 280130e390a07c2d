use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{SpectrumMeta, SpectrumProvider};

/// Seeded four-on-the-floor pattern rendered straight into byte spectra.
///
/// Every beat a kick lands on the 50 Hz bin and its neighbours and decays
/// over a few ticks; off-beats carry an open hi-hat in the treble. A noise
/// floor with a downward tilt sits under everything. Same seed, same frames.
pub struct SyntheticSpectrum {
    meta: SpectrumMeta,
    rng: StdRng,
    bpm: f32,
    fps: u32,
    tick: u64,
    kick_bin: usize,
    hat_range: std::ops::Range<usize>,
}

impl SyntheticSpectrum {
    pub fn new(seed: u64, bpm: f32, fps: u32, meta: SpectrumMeta) -> Self {
        let kick_bin = meta.hz_to_bin(50.0);
        let hat_range = meta.bin_range(8000.0, 12000.0);
        Self {
            meta,
            rng: StdRng::seed_from_u64(seed),
            bpm: bpm.max(1.0),
            fps: fps.max(1),
            tick: 0,
            kick_bin,
            hat_range,
        }
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    /// Ticks since the most recent beat and the beat length in ticks.
    fn beat_phase(&self) -> (f32, f32) {
        let ticks_per_beat = self.fps as f32 * 60.0 / self.bpm;
        let beat_position = self.tick as f32 / ticks_per_beat;
        let since_beat = (beat_position - beat_position.floor()) * ticks_per_beat;
        (since_beat, ticks_per_beat)
    }
}

impl SpectrumProvider for SyntheticSpectrum {
    fn meta(&self) -> SpectrumMeta {
        self.meta
    }

    fn magnitudes(&mut self, out: &mut [u8]) {
        let (since_beat, ticks_per_beat) = self.beat_phase();
        let bins = out.len().max(1) as f32;

        for (i, byte) in out.iter_mut().enumerate() {
            let tilt = 1.0 - 0.6 * (i as f32 / bins);
            let noise: f32 = self.rng.random_range(10.0..30.0);
            *byte = (noise * tilt) as u8;
        }

        // kick: full scale on the beat, fading over four ticks
        if since_beat < 4.0 {
            let level = 255.0 * (1.0 - since_beat / 4.0);
            for offset in 0..3usize {
                let bin = self.kick_bin + offset;
                if let Some(byte) = out.get_mut(bin) {
                    let spread = 1.0 - 0.25 * offset as f32;
                    *byte = (*byte).max((level * spread) as u8);
                }
            }
        }

        // hat on the off-beat
        let off_beat = ticks_per_beat / 2.0;
        if since_beat >= off_beat && since_beat < off_beat + 2.0 {
            for bin in self.hat_range.clone() {
                if let Some(byte) = out.get_mut(bin) {
                    let level: f32 = self.rng.random_range(90.0..140.0);
                    *byte = (*byte).max(level as u8);
                }
            }
        }

        self.tick += 1;
    }

    fn source_type(&self) -> &'static str {
        "synthetic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> SpectrumMeta {
        SpectrumMeta::new(44100.0, 2048)
    }

    #[test]
    fn test_same_seed_same_frames() {
        let mut a = SyntheticSpectrum::new(7, 124.0, 60, meta());
        let mut b = SyntheticSpectrum::new(7, 124.0, 60, meta());
        let mut fa = vec![0u8; 1024];
        let mut fb = vec![0u8; 1024];
        for _ in 0..50 {
            a.magnitudes(&mut fa);
            b.magnitudes(&mut fb);
            assert_eq!(fa, fb);
        }
    }

    #[test]
    fn test_kick_lands_on_the_beat() {
        let mut source = SyntheticSpectrum::new(1, 120.0, 60, meta());
        let mut frame = vec![0u8; 1024];
        source.magnitudes(&mut frame);
        assert_eq!(frame[2], 255);

        for _ in 0..14 {
            source.magnitudes(&mut frame);
        }
        // tick 15 is the off-beat: no kick, hat present
        source.magnitudes(&mut frame);
        assert!(frame[2] < 40);
        assert!(frame[400] >= 90);
    }
}
