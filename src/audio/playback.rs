use std::path::Path;
use std::sync::Arc;
use log::{info, warn};

use super::{SpectrumAnalyser, SpectrumMeta, SpectrumProvider};
use crate::config::AnalyserConfig;
use crate::error::{AnalysisError, Result};

/// A whole audio file mixed down to mono f32 samples.
#[derive(Debug, Clone)]
pub struct DecodedTrack {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedTrack {
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    /// Decode any supported file. WAV is always available; other formats
    /// need the `device-io` feature.
    pub fn decode<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let is_wav = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext.eq_ignore_ascii_case("wav"));

        if is_wav {
            Self::from_wav(path)
        } else {
            Self::from_compressed(path)
        }
    }

    pub fn from_wav<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = hound::WavReader::open(path).map_err(|e| match e {
            hound::Error::IoError(io) => AnalysisError::InputUnavailable(format!("{:?}: {}", path, io)),
            other => AnalysisError::from(other),
        })?;

        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1u64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<std::result::Result<_, _>>()?
            }
        };

        let samples = mix_to_mono(&interleaved, channels);
        info!("Decoded WAV {:?} ({}Hz, {} channels, {} samples)", path, spec.sample_rate, channels, samples.len());

        Ok(Self {
            samples,
            sample_rate: spec.sample_rate,
        })
    }

    #[cfg(feature = "device-io")]
    fn from_compressed(path: &Path) -> Result<Self> {
        use rodio::{Decoder, Source};
        use std::fs::File;
        use std::io::BufReader;

        let file = File::open(path)
            .map_err(|e| AnalysisError::InputUnavailable(format!("{:?}: {}", path, e)))?;
        let source = Decoder::new(BufReader::new(file))
            .map_err(|e| AnalysisError::Decode(format!("{:?}: {}", path, e)))?;

        let sample_rate = source.sample_rate();
        let channels = source.channels().max(1) as usize;

        let interleaved: Vec<f32> = source.map(|s| s as f32 / 32768.0).collect();
        let samples = mix_to_mono(&interleaved, channels);
        info!("Decoded {:?} ({}Hz, {} channels, {} samples)", path, sample_rate, channels, samples.len());

        Ok(Self { samples, sample_rate })
    }

    #[cfg(not(feature = "device-io"))]
    fn from_compressed(path: &Path) -> Result<Self> {
        Err(AnalysisError::Decode(format!(
            "{:?}: only WAV files are supported without the device-io feature",
            path
        )))
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

fn mix_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Read position within a decoded track.
///
/// The analysis window is the `len` samples ending at the current position.
/// Samples before the start read as silence; past the end the track either
/// wraps (looping) or reads as silence.
#[derive(Debug, Clone)]
pub struct TrackCursor {
    track: Arc<DecodedTrack>,
    position: usize,
    looping: bool,
}

impl TrackCursor {
    pub fn new(track: Arc<DecodedTrack>, looping: bool) -> Self {
        Self {
            track,
            position: 0,
            looping,
        }
    }

    pub fn track(&self) -> &DecodedTrack {
        &self.track
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn advance(&mut self, samples: usize) {
        self.position += samples;
        let len = self.track.samples.len();
        if self.looping && len > 0 && self.position >= 2 * len {
            // keep one lap of history so the window can still wrap
            self.position = len + self.position % len;
        }
    }

    pub fn seek(&mut self, position: usize) {
        self.position = position;
    }

    pub fn is_finished(&self) -> bool {
        !self.looping && self.position >= self.track.samples.len()
    }

    pub fn fill_window(&self, out: &mut [f32]) {
        let samples = &self.track.samples;
        let len = samples.len();
        let start = self.position as isize - out.len() as isize;

        for (i, slot) in out.iter_mut().enumerate() {
            let index = start + i as isize;
            *slot = if index < 0 || len == 0 {
                0.0
            } else if self.looping {
                samples[index as usize % len]
            } else {
                samples.get(index as usize).copied().unwrap_or(0.0)
            };
        }
    }
}

/// Decoded track advanced by `sample_rate / fps` samples per tick.
///
/// Tick `n` ends at sample `n * sample_rate / fps`, so a frame rate that does
/// not divide the sample rate still keeps pace with the audio.
/// Used for offline analysis and wherever no output device is wanted.
pub struct TrackSpectrum {
    cursor: TrackCursor,
    analyser: SpectrumAnalyser,
    window: Vec<f32>,
    sample_rate: u64,
    fps: u64,
    ticks: u64,
}

impl TrackSpectrum {
    pub fn new(track: Arc<DecodedTrack>, config: &AnalyserConfig, fps: u32, looping: bool) -> Self {
        let analyser = SpectrumAnalyser::new(track.sample_rate as f32, config);

        Self {
            window: vec![0.0; analyser.fft_size()],
            sample_rate: track.sample_rate as u64,
            fps: fps.max(1) as u64,
            ticks: 0,
            cursor: TrackCursor::new(track, looping),
            analyser,
        }
    }

    fn tick_end(&self, tick: u64) -> usize {
        (tick * self.sample_rate / self.fps) as usize
    }

    pub fn cursor(&self) -> &TrackCursor {
        &self.cursor
    }

    pub fn is_finished(&self) -> bool {
        self.cursor.is_finished()
    }
}

impl SpectrumProvider for TrackSpectrum {
    fn meta(&self) -> SpectrumMeta {
        self.analyser.meta()
    }

    fn magnitudes(&mut self, out: &mut [u8]) {
        self.cursor.fill_window(&mut self.window);
        self.analyser.process(&self.window, out);

        let start = self.tick_end(self.ticks);
        self.ticks += 1;
        self.cursor.advance(self.tick_end(self.ticks) - start);
    }

    fn source_type(&self) -> &'static str {
        "file"
    }
}

/// Decoded track played through the default output device, analysed at the
/// position playback has reached.
#[cfg(feature = "device-io")]
pub struct FilePlayback {
    _stream: rodio::OutputStream,
    sink: rodio::Sink,
    cursor: TrackCursor,
    analyser: SpectrumAnalyser,
    window: Vec<f32>,
    started: Option<std::time::Instant>,
}

#[cfg(feature = "device-io")]
impl FilePlayback {
    pub fn new(track: Arc<DecodedTrack>, config: &AnalyserConfig) -> Result<Self> {
        use rodio::{buffer::SamplesBuffer, OutputStream, Sink, Source};

        let (stream, handle) = OutputStream::try_default()
            .map_err(|e| AnalysisError::InputUnavailable(format!("No output device: {}", e)))?;
        let sink = Sink::try_new(&handle)
            .map_err(|e| AnalysisError::InputUnavailable(format!("Failed to open output: {}", e)))?;

        let source = SamplesBuffer::new(1, track.sample_rate, track.samples.clone()).repeat_infinite();
        sink.append(source);
        sink.pause();

        info!("Loaded track for playback ({}Hz, {:.1}s)", track.sample_rate, track.duration_secs());

        let analyser = SpectrumAnalyser::new(track.sample_rate as f32, config);
        Ok(Self {
            _stream: stream,
            sink,
            window: vec![0.0; analyser.fft_size()],
            cursor: TrackCursor::new(track, true),
            analyser,
            started: None,
        })
    }

    pub fn play(&mut self) {
        if self.started.is_none() {
            self.started = Some(std::time::Instant::now());
            self.sink.play();
            info!("Audio playback started");
        }
    }

    fn elapsed_samples(&self, started: std::time::Instant) -> usize {
        let rate = self.cursor.track().sample_rate as f64;
        (started.elapsed().as_secs_f64() * rate) as usize
    }
}

#[cfg(feature = "device-io")]
impl SpectrumProvider for FilePlayback {
    fn meta(&self) -> SpectrumMeta {
        self.analyser.meta()
    }

    fn magnitudes(&mut self, out: &mut [u8]) {
        let position = self.started.map_or(0, |started| self.elapsed_samples(started));
        self.cursor.seek(position);
        self.cursor.fill_window(&mut self.window);
        self.analyser.process(&self.window, out);
    }

    fn source_type(&self) -> &'static str {
        "file"
    }
}

#[cfg(feature = "device-io")]
impl Drop for FilePlayback {
    fn drop(&mut self) {
        self.sink.stop();
        if self.started.is_some() {
            info!("Audio playback stopped");
        }
    }
}

/// Best available way to analyse a decoded track in real time.
pub fn track_provider(track: DecodedTrack, config: &AnalyserConfig, fps: u32) -> Box<dyn SpectrumProvider> {
    let track = Arc::new(track);

    #[cfg(feature = "device-io")]
    {
        match FilePlayback::new(Arc::clone(&track), config) {
            Ok(mut playback) => {
                playback.play();
                return Box::new(playback);
            }
            Err(e) => warn!("⚠️  {}. Analysing the file without playback.", e),
        }
    }

    #[cfg(not(feature = "device-io"))]
    warn!("Built without device-io: analysing the file without playback");

    Box::new(TrackSpectrum::new(track, config, fps, true))
}
