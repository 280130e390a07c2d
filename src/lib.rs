//! Audio-reactive modulation core for house-music visuals.
//!
//! A [`SpectrumProvider`](audio::SpectrumProvider) supplies byte magnitude
//! spectra, the [`AudioReactiveEngine`] turns each one into band energies,
//! beats, a tempo estimate and offsets for the visual parameters, and a
//! renderer consumes those through a [`ParameterSink`](graphics::ParameterSink).

pub mod audio;
pub mod config;
pub mod effects;
pub mod engine;
pub mod error;
pub mod graphics;

pub use config::{AnalysisMode, EngineConfig};
pub use engine::{AudioReactiveEngine, EngineStatus, FrameOutput};
pub use error::{AnalysisError, Result};
