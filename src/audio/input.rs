use std::path::PathBuf;
use log::info;

use super::{playback, DecodedTrack, SpectrumMeta, SpectrumProvider, SyntheticSpectrum};
use crate::config::EngineConfig;
use crate::error::{AnalysisError, Result};

/// Where the engine should take its audio from.
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    Microphone,
    File(PathBuf),
    Synthetic { seed: u64, bpm: f32 },
}

impl InputSource {
    pub fn describe(&self) -> String {
        match self {
            InputSource::Microphone => "microphone".to_string(),
            InputSource::File(path) => format!("file {:?}", path),
            InputSource::Synthetic { seed, bpm } => format!("synthetic (seed {}, {:.0} BPM)", seed, bpm),
        }
    }
}

/// Acquire a spectrum provider for `source`.
///
/// File decoding runs on the blocking pool; everything else is quick. Any
/// failure comes back as `InputUnavailable` (or `Decode`) and leaves no
/// partially opened device behind.
pub async fn acquire(source: InputSource, config: &EngineConfig) -> Result<Box<dyn SpectrumProvider>> {
    info!("Acquiring input: {}", source.describe());

    let provider: Box<dyn SpectrumProvider> = match source {
        InputSource::Microphone => open_microphone(config)?,
        InputSource::File(path) => {
            let track = tokio::task::spawn_blocking(move || DecodedTrack::decode(&path))
                .await
                .map_err(|e| AnalysisError::InputUnavailable(format!("Decoder task failed: {}", e)))??;
            playback::track_provider(track, &config.analyser, config.fps)
        }
        InputSource::Synthetic { seed, bpm } => {
            let meta = SpectrumMeta::new(44100.0, config.analyser.fft_size);
            Box::new(SyntheticSpectrum::new(seed, bpm, config.fps, meta))
        }
    };

    info!("✅ Input ready: {} ({} bins)", provider.source_type(), provider.meta().bin_count);
    Ok(provider)
}

#[cfg(feature = "device-io")]
fn open_microphone(config: &EngineConfig) -> Result<Box<dyn SpectrumProvider>> {
    Ok(Box::new(super::LiveInput::new(&config.analyser)?))
}

#[cfg(not(feature = "device-io"))]
fn open_microphone(_config: &EngineConfig) -> Result<Box<dyn SpectrumProvider>> {
    Err(AnalysisError::InputUnavailable(
        "microphone capture needs the device-io feature".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_acquire_synthetic() {
        let config = EngineConfig::default();
        let provider = acquire(InputSource::Synthetic { seed: 3, bpm: 126.0 }, &config)
            .await
            .unwrap();
        assert_eq!(provider.source_type(), "synthetic");
        assert_eq!(provider.meta().bin_count, 1024);
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let config = EngineConfig::default();
        let result = acquire(InputSource::File(PathBuf::from("/nonexistent/set.wav")), &config).await;
        assert!(matches!(result, Err(AnalysisError::InputUnavailable(_))));
    }
}
