use glam::Vec3;
use rand::Rng;

use super::ModulationOffsets;
use crate::graphics::ParameterSink;

/// Baseline values of every shader parameter the engine drives.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualParams {
    pub time_scale: f32,
    pub pattern_amp: f32,
    pub pattern_freq: f32,
    pub bloom_strength: f32,
    pub saturation: f32,
    pub grain_amount: f32,
    pub color_tint: Vec3,
    pub overlay_color: Vec3,
    pub overlay_opacity: f32,
    pub background_color: Vec3,
    pub background_opacity: f32,
    pub min_circle_size: f32,
    pub circle_strength: f32,
    pub distort_x: f32,
    pub distort_y: f32,
    /// Pattern seed in [0, 1000)
    pub seed: f32,
}

impl Default for VisualParams {
    fn default() -> Self {
        Self {
            time_scale: 0.6,
            pattern_amp: 15.0,
            pattern_freq: 0.8,
            bloom_strength: 1.5,
            saturation: 1.1,
            grain_amount: 0.15,
            color_tint: Vec3::ONE,
            overlay_color: Vec3::ZERO,
            overlay_opacity: 0.0,
            background_color: Vec3::ZERO,
            background_opacity: 0.0,
            min_circle_size: 3.0,
            circle_strength: 1.0,
            distort_x: 5.0,
            distort_y: 20.0,
            seed: 0.0,
        }
    }
}

impl VisualParams {
    /// Baseline plus this frame's modulation.
    pub fn modulated(&self, offsets: &ModulationOffsets) -> Self {
        Self {
            time_scale: self.time_scale + offsets.time_scale,
            bloom_strength: self.bloom_strength + offsets.bloom,
            pattern_amp: self.pattern_amp + offsets.pattern_amp,
            distort_x: self.distort_x + offsets.distort_x,
            distort_y: self.distort_y + offsets.distort_y,
            ..self.clone()
        }
    }

    /// Make a modulated frame safe to hand to a renderer: non-finite values
    /// fall back to `baseline`, bloom and pattern amplitude never go negative.
    pub fn sanitised(&self, baseline: &VisualParams) -> Self {
        let finite_or = |value: f32, fallback: f32| if value.is_finite() { value } else { fallback };

        Self {
            time_scale: finite_or(self.time_scale, baseline.time_scale),
            bloom_strength: finite_or(self.bloom_strength, baseline.bloom_strength).max(0.0),
            pattern_amp: finite_or(self.pattern_amp, baseline.pattern_amp).max(0.0),
            distort_x: finite_or(self.distort_x, baseline.distort_x),
            distort_y: finite_or(self.distort_y, baseline.distort_y),
            ..self.clone()
        }
    }

    /// Random look within the usual ranges of each parameter, with a fresh seed.
    pub fn randomized<R: Rng>(rng: &mut R) -> Self {
        let color_tint = Vec3::new(
            rng.random::<f32>() * 1.5,
            rng.random::<f32>() * 1.5,
            rng.random::<f32>() * 1.5,
        );

        Self {
            time_scale: 0.1 + rng.random::<f32>() * 0.8,
            pattern_amp: 3.0 + rng.random::<f32>() * 17.0,
            pattern_freq: 0.2 + rng.random::<f32>() * 4.8,
            bloom_strength: rng.random::<f32>() * 3.0,
            saturation: rng.random::<f32>() * 2.0,
            grain_amount: rng.random::<f32>() * 0.5,
            color_tint,
            min_circle_size: rng.random::<f32>() * 5.0,
            circle_strength: rng.random::<f32>() * 3.0,
            distort_x: rng.random::<f32>() * 50.0,
            distort_y: rng.random::<f32>() * 50.0,
            seed: Self::random_seed(rng),
            ..Self::default()
        }
    }

    pub fn random_seed<R: Rng>(rng: &mut R) -> f32 {
        rng.random_range(0..1000u32) as f32
    }

    /// Write every parameter to a rendering surface.
    pub fn apply_to(&self, sink: &mut dyn ParameterSink) {
        sink.set_float("timeScale", self.time_scale);
        sink.set_float("patternAmp", self.pattern_amp);
        sink.set_float("patternFreq", self.pattern_freq);
        sink.set_float("bloomStrength", self.bloom_strength);
        sink.set_float("saturation", self.saturation);
        sink.set_float("grainAmount", self.grain_amount);
        sink.set_vec3("colorTint", self.color_tint);
        sink.set_vec3("overlayColor", self.overlay_color);
        sink.set_float("overlayOpacity", self.overlay_opacity);
        sink.set_vec3("backgroundColor", self.background_color);
        sink.set_float("backgroundOpacity", self.background_opacity);
        sink.set_float("minCircleSize", self.min_circle_size);
        sink.set_float("circleStrength", self.circle_strength);
        sink.set_float("distortX", self.distort_x);
        sink.set_float("distortY", self.distort_y);
        sink.set_float("seed", self.seed);
    }
}

#[derive(Debug, Clone)]
pub struct VisualizerPreset {
    pub name: String,
    pub params: VisualParams,
}

#[allow(clippy::too_many_arguments)]
fn preset(
    name: &str,
    motion: [f32; 3],
    finish: [f32; 3],
    tint: [f32; 3],
    overlay: ([f32; 3], f32),
    background: ([f32; 3], f32),
    circle: [f32; 2],
    distort: [f32; 2],
) -> VisualizerPreset {
    VisualizerPreset {
        name: name.to_string(),
        params: VisualParams {
            time_scale: motion[0],
            pattern_amp: motion[1],
            pattern_freq: motion[2],
            bloom_strength: finish[0],
            saturation: finish[1],
            grain_amount: finish[2],
            color_tint: Vec3::from_array(tint),
            overlay_color: Vec3::from_array(overlay.0),
            overlay_opacity: overlay.1,
            background_color: Vec3::from_array(background.0),
            background_opacity: background.1,
            min_circle_size: circle[0],
            circle_strength: circle[1],
            distort_x: distort[0],
            distort_y: distort[1],
            seed: 0.0,
        },
    }
}

/// House-music looks, selectable by name.
pub struct PresetManager {
    presets: Vec<VisualizerPreset>,
    current_preset: usize,
}

impl PresetManager {
    pub fn new() -> Self {
        let presets = vec![
            preset("ambient", [0.3, 12.0, 0.4], [2.0, 0.9, 0.08], [0.7, 0.9, 1.3],
                ([0.1, 0.3, 0.7], 0.2), ([0.02, 0.05, 0.15], 0.4), [3.5, 1.2], [4.0, 18.0]),
            preset("energetic", [0.8, 28.0, 1.2], [3.5, 1.4, 0.2], [1.4, 0.9, 0.5],
                ([0.9, 0.4, 0.1], 0.25), ([0.08, 0.02, 0.0], 0.3), [6.0, 2.5], [20.0, 40.0]),
            preset("minimal", [0.5, 10.0, 0.8], [1.2, 0.8, 0.12], [1.1, 1.1, 1.0],
                ([0.5, 0.5, 0.6], 0.15), ([0.1, 0.1, 0.1], 0.5), [2.5, 0.8], [8.0, 12.0]),
            preset("abstract", [1.0, 35.0, 1.8], [4.0, 1.8, 0.25], [1.5, 0.8, 1.4],
                ([1.2, 0.2, 1.0], 0.3), ([0.15, 0.05, 0.25], 0.2), [8.0, 3.0], [25.0, 45.0]),
            preset("retro", [0.7, 22.0, 1.0], [3.0, 1.6, 0.18], [0.3, 1.5, 1.8],
                ([0.0, 0.8, 1.0], 0.22), ([0.0, 0.05, 0.15], 0.4), [4.5, 2.0], [15.0, 35.0]),
            preset("organic", [0.6, 18.0, 0.9], [2.8, 1.3, 0.1], [0.4, 1.4, 1.6],
                ([0.2, 0.9, 1.2], 0.18), ([0.02, 0.08, 0.12], 0.3), [5.2, 1.8], [12.0, 30.0]),
        ];

        Self {
            presets,
            current_preset: 0,
        }
    }

    pub fn get_current_preset(&self) -> &VisualizerPreset {
        &self.presets[self.current_preset]
    }

    /// Select by name; returns false when no preset has that name.
    pub fn select(&mut self, name: &str) -> bool {
        match self.presets.iter().position(|p| p.name.eq_ignore_ascii_case(name)) {
            Some(index) => {
                self.current_preset = index;
                true
            }
            None => false,
        }
    }

    pub fn get_presets(&self) -> &[VisualizerPreset] {
        &self.presets
    }

    pub fn current_preset_index(&self) -> usize {
        self.current_preset
    }
}

impl Default for PresetManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    #[derive(Default)]
    struct RecordingSink {
        floats: HashMap<String, f32>,
        vectors: HashMap<String, Vec3>,
    }

    impl ParameterSink for RecordingSink {
        fn set_float(&mut self, name: &str, value: f32) {
            self.floats.insert(name.to_string(), value);
        }

        fn set_vec2(&mut self, _name: &str, _value: glam::Vec2) {}

        fn set_vec3(&mut self, name: &str, value: Vec3) {
            self.vectors.insert(name.to_string(), value);
        }
    }

    #[test]
    fn test_six_house_presets() {
        let manager = PresetManager::new();
        let names: Vec<&str> = manager.get_presets().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["ambient", "energetic", "minimal", "abstract", "retro", "organic"]);
    }

    #[test]
    fn test_select_by_name() {
        let mut manager = PresetManager::new();
        assert!(manager.select("Retro"));
        assert_eq!(manager.current_preset_index(), 4);
        assert_eq!(manager.get_current_preset().params.color_tint, Vec3::new(0.3, 1.5, 1.8));
        assert!(!manager.select("dubstep"));
        assert_eq!(manager.current_preset_index(), 4);
    }

    #[test]
    fn test_modulated_adds_offsets() {
        let base = VisualParams::default();
        let offsets = ModulationOffsets {
            time_scale: 0.1,
            bloom: 1.0,
            pattern_amp: 5.0,
            distort_x: 2.0,
            distort_y: 3.0,
            ..Default::default()
        };
        let frame = base.modulated(&offsets);
        assert!((frame.time_scale - 0.7).abs() < 1e-6);
        assert!((frame.bloom_strength - 2.5).abs() < 1e-6);
        assert_eq!(frame.pattern_amp, 20.0);
        assert_eq!(frame.distort_x, 7.0);
        assert_eq!(frame.distort_y, 23.0);
        assert_eq!(frame.saturation, base.saturation);
    }

    #[test]
    fn test_sanitised_replaces_non_finite_and_negative_values() {
        let base = VisualParams::default();
        let offsets = ModulationOffsets {
            time_scale: f32::NAN,
            bloom: -10.0,
            pattern_amp: f32::NEG_INFINITY,
            distort_x: f32::INFINITY,
            distort_y: 3.0,
            ..Default::default()
        };
        let frame = base.modulated(&offsets).sanitised(&base);

        assert_eq!(frame.time_scale, base.time_scale);
        assert_eq!(frame.bloom_strength, 0.0);
        assert_eq!(frame.pattern_amp, base.pattern_amp);
        assert_eq!(frame.distort_x, base.distort_x);
        assert_eq!(frame.distort_y, 23.0);
    }

    #[test]
    fn test_sanitised_keeps_sane_frames() {
        let base = VisualParams::default();
        let offsets = ModulationOffsets { bloom: 0.5, pattern_amp: 4.0, ..Default::default() };
        let frame = base.modulated(&offsets);
        assert_eq!(frame.sanitised(&base), frame);
    }

    #[test]
    fn test_randomized_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let params = VisualParams::randomized(&mut rng);
            assert!((0.1..=0.9).contains(&params.time_scale));
            assert!((3.0..=20.0).contains(&params.pattern_amp));
            assert!((0.2..=5.0).contains(&params.pattern_freq));
            assert!((0.0..=50.0).contains(&params.distort_y));
            assert!(params.color_tint.max_element() <= 1.5);
            assert!((0.0..1000.0).contains(&params.seed));
            assert_eq!(params.seed.fract(), 0.0);
        }
    }

    #[test]
    fn test_apply_writes_every_parameter() {
        let mut sink = RecordingSink::default();
        VisualParams::default().apply_to(&mut sink);
        assert_eq!(sink.floats.len(), 13);
        assert_eq!(sink.vectors.len(), 3);
        assert_eq!(sink.floats["distortY"], 20.0);
        assert_eq!(sink.vectors["colorTint"], Vec3::ONE);
    }
}
