pub mod analysis_interface;
pub mod bands;
pub mod beat_detector;
pub mod fft;
pub mod input;
pub mod playback;
pub mod prescan;
#[cfg(feature = "device-io")]
pub mod processor;
pub mod simulated;
pub mod smoothing;
pub mod tempo;

pub use analysis_interface::{SpectrumMeta, SpectrumProvider};
pub use bands::{BandEnergies, BandExtractor, FrequencyProfile, KickTier, KICK_TIERS};
pub use beat_detector::{BeatDetector, EnergyHistory, RefractoryState};
pub use fft::SpectrumAnalyser;
pub use input::{acquire, InputSource};
#[cfg(feature = "device-io")]
pub use playback::FilePlayback;
pub use playback::{DecodedTrack, TrackCursor, TrackSpectrum};
pub use prescan::{PrescanProcessor, PrescanReport};
#[cfg(feature = "device-io")]
pub use processor::LiveInput;
pub use simulated::SyntheticSpectrum;
pub use smoothing::{SmoothedState, Smoother};
pub use tempo::BpmEstimator;

/// An honoured beat.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BeatEvent {
    pub timestamp_ms: f64,
}
