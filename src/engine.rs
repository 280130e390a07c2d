use log::{debug, info};

use crate::audio::{
    BandEnergies, BandExtractor, BeatDetector, BeatEvent, BpmEstimator, FrequencyProfile,
    SmoothedState, Smoother, SpectrumProvider,
};
use crate::config::{AnalysisMode, EngineConfig};
use crate::effects::{ModulationEngine, ModulationOffsets};
use crate::error::Result;

/// How long the beat indicator stays lit after a beat.
const BEAT_INDICATOR_MS: f64 = 100.0;

/// Everything one tick produced.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameOutput {
    pub bands: BandEnergies,
    pub smoothed: SmoothedState,
    pub offsets: ModulationOffsets,
    pub beat: Option<BeatEvent>,
    pub bpm: Option<u32>,
}

/// Snapshot for tempo and beat indicators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStatus {
    pub bpm: Option<u32>,
    pub beat_active: bool,
}

impl EngineStatus {
    /// BPM for display, "---" while unknown.
    pub fn bpm_label(&self) -> String {
        match self.bpm {
            Some(bpm) => bpm.to_string(),
            None => "---".to_string(),
        }
    }
}

/// Components that depend on the spectrum shape of the current input.
struct Analysis {
    provider: Box<dyn SpectrumProvider>,
    extractor: BandExtractor,
    detector: BeatDetector,
    spectrum: Vec<u8>,
}

/// The whole audio-reactive pipeline as one context object.
///
/// An external scheduler calls `tick` once per frame with a monotonically
/// increasing timestamp. Each tick reads one spectrum from the input (if any),
/// extracts and smooths bands, runs beat and tempo detection and computes the
/// modulation offsets. Without an input, smoothed values decay towards zero.
pub struct AudioReactiveEngine {
    config: EngineConfig,
    analysis: Option<Analysis>,
    tempo: BpmEstimator,
    modulation: ModulationEngine,
    smoothed: SmoothedState,
    last_beat_ms: Option<f64>,
    last_tick_ms: f64,
    tick_count: u64,
}

impl AudioReactiveEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        info!("Audio engine ready (mode: {}, {} fps)", config.mode.label(), config.fps);

        Ok(Self {
            tempo: BpmEstimator::new(&config.tempo),
            modulation: ModulationEngine::new(config.mode),
            config,
            analysis: None,
            smoothed: SmoothedState::default(),
            last_beat_ms: None,
            last_tick_ms: 0.0,
            tick_count: 0,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runtime knobs are read every tick, so edits take effect on the next one.
    /// Changes to mode, detector or tempo settings need `apply_config`.
    pub fn config_mut(&mut self) -> &mut EngineConfig {
        &mut self.config
    }

    /// Replace the configuration, rebuilding whatever depends on it.
    pub fn apply_config(&mut self, config: EngineConfig) -> Result<()> {
        config.validate()?;

        let rebuild = config.mode != self.config.mode
            || config.detector != self.config.detector
            || config.tempo != self.config.tempo;
        if config.analyser != self.config.analyser {
            info!("Analyser settings changed; they apply to the next input");
        }

        self.config = config;
        if rebuild {
            self.rebuild();
        }
        Ok(())
    }

    pub fn set_mode(&mut self, mode: AnalysisMode) {
        if mode != self.config.mode {
            self.config.mode = mode;
            self.rebuild();
        }
    }

    pub fn has_input(&self) -> bool {
        self.analysis.is_some()
    }

    pub fn input_type(&self) -> Option<&'static str> {
        self.analysis.as_ref().map(|a| a.provider.source_type())
    }

    /// Start analysing `provider`, replacing any current input.
    pub fn start_input(&mut self, provider: Box<dyn SpectrumProvider>) {
        let meta = provider.meta();
        let profile = FrequencyProfile::for_mode(self.config.mode);
        info!(
            "Starting {} input ({} bins, {:.1} Hz per bin)",
            provider.source_type(), meta.bin_count, meta.bin_width()
        );

        self.reset_detection();
        self.analysis = Some(Analysis {
            detector: BeatDetector::new(&self.config.detector, &profile, meta),
            extractor: BandExtractor::new(profile, meta),
            spectrum: vec![0; meta.bin_count],
            provider,
        });
    }

    /// Drop the current input and forget beat and tempo history.
    pub fn stop_input(&mut self) {
        if let Some(analysis) = self.analysis.take() {
            info!("Stopped {} input", analysis.provider.source_type());
        }
        self.reset_detection();
    }

    pub fn status(&self) -> EngineStatus {
        let beat_active = self
            .last_beat_ms
            .map_or(false, |t| self.last_tick_ms - t < BEAT_INDICATOR_MS);
        EngineStatus {
            bpm: self.tempo.bpm(),
            beat_active,
        }
    }

    pub fn tick(&mut self, timestamp_ms: f64) -> FrameOutput {
        self.tick_count += 1;
        self.last_tick_ms = timestamp_ms;

        let smoother = Smoother::new(&self.config.smoothing);

        let Some(analysis) = self.analysis.as_mut() else {
            smoother.decay(&mut self.smoothed);
            return FrameOutput {
                smoothed: self.smoothed,
                bpm: self.tempo.bpm(),
                ..Default::default()
            };
        };

        analysis.provider.magnitudes(&mut analysis.spectrum);
        let bands = analysis.extractor.extract(&analysis.spectrum);

        if self.config.audio_reactive {
            let factor = Smoother::factor_for(self.config.mode, self.config.modulation.audio_smoothing);
            smoother.apply(&mut self.smoothed, &bands, factor);
        } else {
            smoother.decay(&mut self.smoothed);
        }

        let mut beat = None;
        if self.config.beat_detection {
            analysis.detector.set_sensitivity(self.config.modulation.beat_sensitivity);
            if analysis.detector.detect_beat(&analysis.spectrum, timestamp_ms) {
                self.tempo.add_beat(timestamp_ms);
                self.last_beat_ms = Some(timestamp_ms);
                beat = Some(BeatEvent { timestamp_ms });
            }
        }

        let offsets = if self.config.audio_reactive {
            self.modulation.compute(&self.smoothed, beat, timestamp_ms, &self.config.modulation)
        } else {
            ModulationOffsets::default()
        };

        if self.tick_count % 120 == 0 {
            let (energy, kick) = analysis.detector.last_energies();
            debug!(
                "🔍 bands: kick={:.3} bass={:.3} mid={:.3} treble={:.3} overall={:.3} | energy={:.3} kick={:.3} | bpm={:?}",
                bands.kick, bands.bass, bands.mid, bands.treble, bands.overall, energy, kick, self.tempo.bpm()
            );
        }

        FrameOutput {
            bands,
            smoothed: self.smoothed,
            offsets,
            beat,
            bpm: self.tempo.bpm(),
        }
    }

    fn reset_detection(&mut self) {
        if let Some(analysis) = self.analysis.as_mut() {
            analysis.detector.reset();
        }
        self.tempo.reset();
        self.modulation.reset();
        self.last_beat_ms = None;
    }

    fn rebuild(&mut self) {
        info!("Rebuilding analysis for mode {}", self.config.mode.label());
        self.tempo = BpmEstimator::new(&self.config.tempo);
        self.modulation = ModulationEngine::new(self.config.mode);
        self.last_beat_ms = None;

        if let Some(analysis) = self.analysis.take() {
            self.start_input(analysis.provider);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SpectrumMeta;

    /// Replays a fixed list of spectra, then silence.
    struct ScriptedSpectrum {
        frames: Vec<Vec<u8>>,
        index: usize,
    }

    impl SpectrumProvider for ScriptedSpectrum {
        fn meta(&self) -> SpectrumMeta {
            SpectrumMeta::new(44100.0, 2048)
        }

        fn magnitudes(&mut self, out: &mut [u8]) {
            match self.frames.get(self.index) {
                Some(frame) => out.copy_from_slice(frame),
                None => out.iter_mut().for_each(|b| *b = 0),
            }
            self.index += 1;
        }

        fn source_type(&self) -> &'static str {
            "scripted"
        }
    }

    fn scripted(frames: Vec<Vec<u8>>) -> Box<dyn SpectrumProvider> {
        Box::new(ScriptedSpectrum { frames, index: 0 })
    }

    fn kick_frame() -> Vec<u8> {
        let mut frame = vec![0u8; 1024];
        frame[2] = 255;
        frame
    }

    #[test]
    fn test_without_input_smoothed_values_decay() {
        let mut engine = AudioReactiveEngine::new(EngineConfig::default()).unwrap();
        engine.smoothed = SmoothedState { bass: 1.0, ..Default::default() };

        let output = engine.tick(0.0);
        assert!((output.smoothed.bass - 0.95).abs() < 1e-6);
        assert!(output.offsets.is_zero());
        assert_eq!(output.beat, None);
        assert_eq!(output.bpm, None);
    }

    #[test]
    fn test_beat_lights_status_briefly() {
        let mut engine = AudioReactiveEngine::new(EngineConfig::default()).unwrap();
        engine.start_input(scripted(vec![kick_frame()]));

        let output = engine.tick(1000.0);
        assert_eq!(output.beat, Some(BeatEvent { timestamp_ms: 1000.0 }));
        assert!(engine.status().beat_active);

        engine.tick(1050.0);
        assert!(engine.status().beat_active);
        engine.tick(1100.0);
        assert!(!engine.status().beat_active);
        assert_eq!(engine.status().bpm_label(), "---");
    }

    #[test]
    fn test_beat_detection_toggle() {
        let mut config = EngineConfig::default();
        config.beat_detection = false;
        let mut engine = AudioReactiveEngine::new(config).unwrap();
        engine.start_input(scripted(vec![kick_frame()]));

        let output = engine.tick(0.0);
        assert_eq!(output.beat, None);
        assert!(output.bands.kick > 0.0);
    }

    #[test]
    fn test_reactivity_off_gives_no_offsets() {
        let mut config = EngineConfig::default();
        config.audio_reactive = false;
        let mut engine = AudioReactiveEngine::new(config).unwrap();
        engine.start_input(scripted(vec![vec![255u8; 1024]; 10]));

        for i in 0..10 {
            let output = engine.tick(i as f64 * 16.0);
            assert!(output.offsets.is_zero());
            assert_eq!(output.smoothed, SmoothedState::default());
        }
    }

    #[test]
    fn test_stop_input_resets_tempo() {
        let mut engine = AudioReactiveEngine::new(EngineConfig::default()).unwrap();
        let mut frames = Vec::new();
        for i in 0..150 {
            frames.push(if i % 30 == 0 { kick_frame() } else { vec![0u8; 1024] });
        }
        engine.start_input(scripted(frames));

        for i in 0..150 {
            engine.tick(i as f64 * 1000.0 / 60.0);
        }
        assert_eq!(engine.status().bpm, Some(120));

        engine.stop_input();
        assert!(!engine.has_input());
        assert_eq!(engine.status(), EngineStatus { bpm: None, beat_active: false });
    }

    #[test]
    fn test_set_mode_rebuilds_with_input_kept() {
        let mut engine = AudioReactiveEngine::new(EngineConfig::default()).unwrap();
        engine.start_input(scripted(vec![]));
        engine.set_mode(AnalysisMode::KickFocus);
        assert_eq!(engine.config().mode, AnalysisMode::KickFocus);
        assert_eq!(engine.input_type(), Some("scripted"));
    }

    #[test]
    fn test_apply_config_rejects_degenerate() {
        let mut engine = AudioReactiveEngine::new(EngineConfig::default()).unwrap();
        let mut config = EngineConfig::default();
        config.tempo.min_bpm = 150;
        assert!(engine.apply_config(config).is_err());
        assert_eq!(engine.config().tempo.min_bpm, 100);
    }
}
