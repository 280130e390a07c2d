use glam::{Vec2, Vec3};
use log::trace;

/// Anything that accepts named shader parameters.
///
/// The engine never talks to a GPU directly: a renderer implements this and
/// receives every parameter by its uniform name once per frame.
pub trait ParameterSink {
    fn set_float(&mut self, name: &str, value: f32);
    fn set_vec2(&mut self, name: &str, value: Vec2);
    fn set_vec3(&mut self, name: &str, value: Vec3);
}

/// Uniform buffer layout for the visual shader, ready to upload as bytes.
///
/// Vectors are padded to 16 bytes so the block can be bound as a std140
/// uniform.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct UniformBlock {
    pub resolution: [f32; 2],
    pub time: f32,
    pub time_scale: f32,
    pub pattern_amp: f32,
    pub pattern_freq: f32,
    pub bloom_strength: f32,
    pub saturation: f32,
    pub grain_amount: f32,
    pub min_circle_size: f32,
    pub circle_strength: f32,
    pub distort_x: f32,
    pub distort_y: f32,
    pub overlay_opacity: f32,
    pub background_opacity: f32,
    pub seed: f32,
    pub color_tint: [f32; 4],
    pub overlay_color: [f32; 4],
    pub background_color: [f32; 4],
}

impl UniformBlock {
    pub fn new() -> Self {
        bytemuck::Zeroable::zeroed()
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

impl Default for UniformBlock {
    fn default() -> Self {
        Self::new()
    }
}

fn padded(value: Vec3) -> [f32; 4] {
    value.extend(0.0).to_array()
}

impl ParameterSink for UniformBlock {
    fn set_float(&mut self, name: &str, value: f32) {
        let slot = match name {
            "time" => &mut self.time,
            "timeScale" => &mut self.time_scale,
            "patternAmp" => &mut self.pattern_amp,
            "patternFreq" => &mut self.pattern_freq,
            "bloomStrength" => &mut self.bloom_strength,
            "saturation" => &mut self.saturation,
            "grainAmount" => &mut self.grain_amount,
            "minCircleSize" => &mut self.min_circle_size,
            "circleStrength" => &mut self.circle_strength,
            "distortX" => &mut self.distort_x,
            "distortY" => &mut self.distort_y,
            "overlayOpacity" => &mut self.overlay_opacity,
            "backgroundOpacity" => &mut self.background_opacity,
            "seed" => &mut self.seed,
            _ => {
                trace!("Unknown float uniform {}", name);
                return;
            }
        };
        *slot = value;
    }

    fn set_vec2(&mut self, name: &str, value: Vec2) {
        match name {
            "resolution" => self.resolution = value.to_array(),
            _ => trace!("Unknown vec2 uniform {}", name),
        }
    }

    fn set_vec3(&mut self, name: &str, value: Vec3) {
        match name {
            "colorTint" => self.color_tint = padded(value),
            "overlayColor" => self.overlay_color = padded(value),
            "backgroundColor" => self.background_color = padded(value),
            _ => trace!("Unknown vec3 uniform {}", name),
        }
    }
}
