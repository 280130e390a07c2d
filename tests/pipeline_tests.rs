use std::f32::consts::PI;

use housepulse::audio::{
    DecodedTrack, PrescanProcessor, SpectrumMeta, SpectrumProvider, SyntheticSpectrum,
};
use housepulse::effects::{PresetManager, VisualParams};
use housepulse::graphics::{ParameterSink, UniformBlock};
use housepulse::{AnalysisMode, AudioReactiveEngine, EngineConfig};

const SAMPLE_RATE: u32 = 44100;
const FRAME_MS: f64 = 1000.0 / 60.0;

/// Same spectrum on every frame.
struct ConstantSpectrum(u8);

impl SpectrumProvider for ConstantSpectrum {
    fn meta(&self) -> SpectrumMeta {
        SpectrumMeta::new(SAMPLE_RATE as f32, 2048)
    }

    fn magnitudes(&mut self, out: &mut [u8]) {
        out.iter_mut().for_each(|b| *b = self.0);
    }

    fn source_type(&self) -> &'static str {
        "constant"
    }
}

/// 60 ms bursts of a 50 Hz sine every half second, starting a quarter second in.
fn kick_track(bursts: usize) -> DecodedTrack {
    let period = SAMPLE_RATE as usize / 2;
    let offset = period / 2;
    let burst_len = SAMPLE_RATE as usize * 60 / 1000;

    let samples = (0..offset + bursts * period)
        .map(|i| {
            if i < offset || (i - offset) % period >= burst_len {
                return 0.0;
            }
            let t = i as f32 / SAMPLE_RATE as f32;
            0.8 * (2.0 * PI * 50.0 * t).sin()
        })
        .collect();
    DecodedTrack::from_samples(samples, SAMPLE_RATE)
}

fn unsmoothed_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.analyser.smoothing_time_constant = 0.0;
    config
}

/// Full-scale 50 Hz bin every `period` frames, silence otherwise.
struct PulseSpectrum {
    period: u64,
    frame: u64,
}

impl SpectrumProvider for PulseSpectrum {
    fn meta(&self) -> SpectrumMeta {
        SpectrumMeta::new(SAMPLE_RATE as f32, 2048)
    }

    fn magnitudes(&mut self, out: &mut [u8]) {
        out.iter_mut().for_each(|b| *b = 0);
        if self.frame % self.period == 0 {
            out[self.meta().hz_to_bin(50.0)] = 255;
        }
        self.frame += 1;
    }

    fn source_type(&self) -> &'static str {
        "pulse"
    }
}

#[test]
fn test_isolated_pulse_converges_to_120_bpm() {
    let mut engine = AudioReactiveEngine::new(EngineConfig::default()).unwrap();
    engine.start_input(Box::new(PulseSpectrum { period: 30, frame: 0 }));

    let mut beats = Vec::new();
    for i in 0..600 {
        let output = engine.tick(i as f64 * FRAME_MS);
        if output.beat.is_some() {
            beats.push(i);
        }
        if beats.len() >= 4 {
            let bpm = output.bpm.unwrap();
            assert!((118..=122).contains(&bpm), "frame {}: {}", i, bpm);
        }
    }
    assert_eq!(beats.len(), 20);
    assert!(beats.iter().all(|frame| frame % 30 == 0));
}

#[test]
fn test_kick_bursts_read_as_120_bpm() {
    let report = PrescanProcessor::new(unsmoothed_config(), false)
        .prescan_track(kick_track(6), "bursts.wav")
        .unwrap();

    assert_eq!(report.statistics.total_beats, 6);
    let bpm = report.statistics.final_bpm.unwrap();
    assert!((118..=122).contains(&bpm), "bpm {}", bpm);

    for pair in report.beats.windows(2) {
        let interval = pair[1].timestamp_ms - pair[0].timestamp_ms;
        assert!((interval - 500.0).abs() < 1.0, "interval {}", interval);
    }
}

#[test]
fn test_prescan_report_survives_json() {
    let report = PrescanProcessor::new(unsmoothed_config(), true)
        .prescan_track(kick_track(4), "bursts.wav")
        .unwrap();

    let path = std::env::temp_dir().join(format!("housepulse-report-{}.json", std::process::id()));
    PrescanProcessor::save_report(&report, &path).unwrap();
    let loaded = PrescanProcessor::load_report(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded.beats, report.beats);
    assert_eq!(loaded.statistics.total_beats, report.statistics.total_beats);
    assert_eq!(loaded.frames.map(|f| f.len()), report.frames.map(|f| f.len()));
    assert_eq!(loaded.file_info.mode, "standard");
}

#[test]
fn test_silent_track_never_beats() {
    let track = DecodedTrack::from_samples(vec![0.0; SAMPLE_RATE as usize * 10], SAMPLE_RATE);
    let report = PrescanProcessor::new(EngineConfig::default(), true)
        .prescan_track(track, "silence.wav")
        .unwrap();

    assert_eq!(report.statistics.total_beats, 0);
    assert_eq!(report.statistics.final_bpm, None);
    for frame in report.frames.unwrap() {
        assert!(!frame.beat);
        assert_eq!(frame.bands.overall, 0.0);
        assert!(frame.offsets.is_zero());
    }
}

#[test]
fn test_full_scale_spectrum_reads_full_energy_in_every_mode() {
    for mode in [AnalysisMode::Standard, AnalysisMode::Live, AnalysisMode::KickFocus] {
        let mut config = EngineConfig::default();
        config.mode = mode;
        let mut engine = AudioReactiveEngine::new(config).unwrap();
        engine.start_input(Box::new(ConstantSpectrum(255)));

        let bands = engine.tick(0.0).bands;
        for value in [bands.kick, bands.bass, bands.mid, bands.treble, bands.overall] {
            assert!((value - 1.0).abs() < 1e-4, "{:?}: {:?}", mode, bands);
        }
    }
}

#[test]
fn test_zero_responses_produce_no_modulation() {
    let mut config = EngineConfig::default();
    config.mode = AnalysisMode::Live;
    let m = &mut config.modulation;
    m.audio_sensitivity = 0.0;
    m.bass_response = 0.0;
    m.mid_response = 0.0;
    m.treble_response = 0.0;
    m.kick_response = 0.0;
    m.visual_response = 0.0;

    let mut engine = AudioReactiveEngine::new(config).unwrap();
    engine.start_input(Box::new(SyntheticSpectrum::new(3, 120.0, 60, SpectrumMeta::new(44100.0, 2048))));

    for i in 0..300 {
        let output = engine.tick(i as f64 * FRAME_MS);
        assert!(output.offsets.is_zero(), "frame {}", i);
    }
}

#[test]
fn test_synthetic_groove_drives_the_engine() {
    let config = EngineConfig { mode: AnalysisMode::Live, ..EngineConfig::default() };
    let meta = SpectrumMeta::new(44100.0, config.analyser.fft_size);
    let mut engine = AudioReactiveEngine::new(config).unwrap();
    engine.start_input(Box::new(SyntheticSpectrum::new(11, 120.0, 60, meta)));

    let params = PresetManager::new().get_current_preset().params.clone();
    let mut block = UniformBlock::new();
    let mut beats = 0;
    let mut peak_bloom: f32 = 0.0;

    for i in 0..600 {
        let output = engine.tick(i as f64 * FRAME_MS);
        if output.beat.is_some() {
            beats += 1;
        }
        params.modulated(&output.offsets).apply_to(&mut block);
        peak_bloom = peak_bloom.max(block.bloom_strength);
    }

    assert!(beats >= 10, "only {} beats", beats);
    let bpm = engine.status().bpm.unwrap();
    assert!((100..=140).contains(&bpm));
    assert!(peak_bloom > params.bloom_strength);
    assert_eq!(engine.input_type(), Some("synthetic"));
}

#[test]
fn test_config_changes_apply_between_ticks() {
    let mut engine = AudioReactiveEngine::new(EngineConfig::default()).unwrap();
    engine.start_input(Box::new(ConstantSpectrum(128)));
    let before = engine.tick(0.0).offsets;
    assert!(before.bloom > 0.0);

    let path = std::env::temp_dir().join(format!("housepulse-reload-{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "audio_reactive": false }"#).unwrap();
    let reloaded = EngineConfig::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    engine.apply_config(reloaded).unwrap();
    assert!(engine.tick(FRAME_MS).offsets.is_zero());
    assert_eq!(engine.input_type(), Some("constant"));
}

#[test]
fn test_parameter_sink_sees_modulated_values() {
    let base = VisualParams::default();
    let mut engine = AudioReactiveEngine::new(EngineConfig::default()).unwrap();
    engine.start_input(Box::new(ConstantSpectrum(200)));

    let mut block = UniformBlock::new();
    let output = engine.tick(0.0);
    base.modulated(&output.offsets).apply_to(&mut block);
    block.set_float("time", 0.0);

    assert!(block.time_scale > base.time_scale);
    assert!(block.distort_x > base.distort_x);
    assert_eq!(block.saturation, base.saturation);
}
