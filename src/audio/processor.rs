use cpal::{Device, Stream, StreamConfig};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};
use std::collections::VecDeque;
use log::{info, warn};

use super::{SpectrumAnalyser, SpectrumMeta, SpectrumProvider};
use crate::config::AnalyserConfig;
use crate::error::{AnalysisError, Result};

/// Microphone spectrum source.
///
/// The capture callback mixes each block to mono and hands it over a channel;
/// `magnitudes` drains whatever has arrived into a rolling window of the last
/// `fft_size` samples and analyses that.
pub struct LiveInput {
    _stream: Stream,
    audio_receiver: Receiver<Vec<f32>>,
    window: VecDeque<f32>,
    frame: Vec<f32>,
    analyser: SpectrumAnalyser,
}

impl LiveInput {
    pub fn new(config: &AnalyserConfig) -> Result<Self> {
        let host = cpal::default_host();
        let device = host.default_input_device()
            .ok_or_else(|| AnalysisError::InputUnavailable("No input device available".to_string()))?;

        let input_config = device.default_input_config()
            .map_err(|e| AnalysisError::InputUnavailable(format!("Failed to get default input config: {}", e)))?;

        info!("Using audio device: {}", device.name().unwrap_or_else(|_| "Unknown".to_string()));
        info!("Audio config: {:?}", input_config);

        let sample_rate = input_config.sample_rate().0 as f32;
        let (audio_sender, audio_receiver) = crossbeam_channel::unbounded();

        let stream = Self::create_input_stream(&device, &input_config.into(), audio_sender)?;
        stream.play()
            .map_err(|e| AnalysisError::InputUnavailable(format!("Failed to start capture: {}", e)))?;

        let analyser = SpectrumAnalyser::new(sample_rate, config);
        let fft_size = analyser.fft_size();

        Ok(Self {
            _stream: stream,
            audio_receiver,
            window: std::iter::repeat(0.0).take(fft_size).collect(),
            frame: vec![0.0; fft_size],
            analyser,
        })
    }

    fn create_input_stream(
        device: &Device,
        config: &StreamConfig,
        sender: Sender<Vec<f32>>,
    ) -> Result<Stream> {
        let channels = config.channels as usize;
        let sample_rate = config.sample_rate.0;

        info!("Creating input stream with {} channels at {} Hz", channels, sample_rate);

        let stream = device.build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let mono_data: Vec<f32> = if channels <= 1 {
                    data.to_vec()
                } else {
                    data.chunks(channels)
                        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                        .collect()
                };

                if sender.send(mono_data).is_err() {
                    warn!("Failed to send audio data");
                }
            },
            |err| {
                warn!("Audio stream error: {}", err);
            },
            None,
        ).map_err(|e| AnalysisError::InputUnavailable(format!("Failed to open input stream: {}", e)))?;

        Ok(stream)
    }

    fn drain(&mut self) {
        let capacity = self.frame.len();
        while let Ok(block) = self.audio_receiver.try_recv() {
            self.window.extend(block);
        }
        while self.window.len() > capacity {
            self.window.pop_front();
        }
    }
}

impl SpectrumProvider for LiveInput {
    fn meta(&self) -> SpectrumMeta {
        self.analyser.meta()
    }

    fn magnitudes(&mut self, out: &mut [u8]) {
        self.drain();
        for (slot, &sample) in self.frame.iter_mut().zip(self.window.iter()) {
            *slot = sample;
        }
        self.analyser.process(&self.frame, out);
    }

    fn source_type(&self) -> &'static str {
        "microphone"
    }
}

impl Drop for LiveInput {
    fn drop(&mut self) {
        info!("Microphone capture stopped");
    }
}
