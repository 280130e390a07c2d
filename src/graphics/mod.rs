pub mod uniforms;

pub use uniforms::{ParameterSink, UniformBlock};
