pub mod modulation;
pub mod preset;

pub use modulation::{ModulationEngine, ModulationOffsets, ModulationWeights};
pub use preset::{PresetManager, VisualParams, VisualizerPreset};
