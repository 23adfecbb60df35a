//! WAV playback backend: one shared cpal output stream mixing all voices.
//!
//! Each voice plays an in-memory hound-decoded buffer with a per-sample
//! linear gain ramp, and feeds its post-gain output into an analysis window
//! for the taps. Loading is synchronous; a pipeline only starts once every
//! asset decoded successfully.

use std::path::Path;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::analysis::{AnalysisBuffer, MeterTap, SpectrumTap, WaveformTap};
use super::{AnalyzerKind, AnalyzerTap, AudioSource, PlaybackState};
use crate::error::PipelineError;

/// Analysis window per voice (samples); covers the largest tap read
const ANALYSIS_CAPACITY: usize = 4096;

struct Voice {
    samples: Vec<f32>,
    source_rate: u32,
    /// Fractional playhead in source samples
    head: f64,
    playing: bool,
    /// Linear amplitude, ramped toward `gain_target`
    gain: f32,
    gain_target: f32,
    gain_step: f32,
    ramp_remaining: usize,
    analysis: Arc<AnalysisBuffer>,
}

impl Voice {
    /// Produce one output sample, or None when the asset ran out (the
    /// voice stops and rewinds).
    fn next_sample(&mut self, device_rate: u32) -> Option<f32> {
        let index = self.head as usize;
        if index >= self.samples.len() {
            self.playing = false;
            self.head = 0.0;
            return None;
        }
        let sample = self.samples[index] * self.gain;
        if self.ramp_remaining > 0 {
            self.gain += self.gain_step;
            self.ramp_remaining -= 1;
            if self.ramp_remaining == 0 {
                self.gain = self.gain_target;
            }
        }
        self.head += self.source_rate as f64 / device_rate as f64;
        Some(sample)
    }
}

struct MixBus {
    voices: Vec<Voice>,
}

/// Shared audio output. Voices register at load time; the stream runs for
/// the mixer's lifetime.
pub struct Mixer {
    bus: Arc<Mutex<MixBus>>,
    device_rate: u32,
    _stream: cpal::Stream,
}

impl Mixer {
    pub fn new() -> Result<Self, PipelineError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| PipelineError::Audio("no audio output device found".to_string()))?;

        let config = device
            .default_output_config()
            .map_err(|e| PipelineError::Audio(format!("failed to get audio config: {e}")))?;

        let device_rate = config.sample_rate().0;
        let channels = config.channels() as usize;
        log::info!(
            "audio output: {} @ {}Hz",
            device.name().unwrap_or_else(|_| "unknown".to_string()),
            device_rate
        );

        let bus = Arc::new(Mutex::new(MixBus { voices: Vec::new() }));
        let bus_for_callback = Arc::clone(&bus);

        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    data.fill(0.0);
                    let mut bus = bus_for_callback.lock().unwrap();
                    let frames = data.len() / channels;
                    for voice in &mut bus.voices {
                        if !voice.playing {
                            continue;
                        }
                        let mut tap_block = Vec::with_capacity(frames);
                        for frame in 0..frames {
                            let Some(sample) = voice.next_sample(device_rate) else {
                                break;
                            };
                            tap_block.push(sample);
                            for slot in &mut data[frame * channels..(frame + 1) * channels] {
                                *slot += sample;
                            }
                        }
                        voice.analysis.push_block(&tap_block);
                    }
                },
                |err| log::error!("audio stream error: {err}"),
                None,
            )
            .map_err(|e| PipelineError::Audio(format!("failed to build audio stream: {e}")))?;

        stream
            .play()
            .map_err(|e| PipelineError::Audio(format!("failed to start audio stream: {e}")))?;

        Ok(Self {
            bus,
            device_rate,
            _stream: stream,
        })
    }
}

fn asset_error(path: &Path, source: hound::Error) -> PipelineError {
    PipelineError::AssetLoad {
        path: path.to_path_buf(),
        source,
    }
}

fn collect_mono(
    samples: impl Iterator<Item = Result<f32, hound::Error>>,
    channels: u16,
    path: &Path,
) -> Result<Vec<f32>, PipelineError> {
    let channels = channels.max(1) as usize;
    let mut mono = Vec::new();
    let mut frame = Vec::with_capacity(channels);
    for sample in samples {
        frame.push(sample.map_err(|e| asset_error(path, e))?);
        if frame.len() == channels {
            mono.push(frame.drain(..).sum::<f32>() / channels as f32);
        }
    }
    Ok(mono)
}

/// Decode a WAV file to mono f32 at its source rate
fn decode_wav(path: &Path) -> Result<(Vec<f32>, u32), PipelineError> {
    let mut reader = hound::WavReader::open(path).map_err(|e| asset_error(path, e))?;
    let spec = reader.spec();
    let mono = match spec.sample_format {
        hound::SampleFormat::Float => {
            collect_mono(reader.samples::<f32>(), spec.channels, path)?
        }
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            collect_mono(
                reader.samples::<i32>().map(|s| s.map(|v| v as f32 / scale)),
                spec.channels,
                path,
            )?
        }
    };
    Ok((mono, spec.sample_rate))
}

/// One playable WAV asset registered on the shared mixer.
pub struct WavPlayer {
    bus: Arc<Mutex<MixBus>>,
    voice: usize,
    device_rate: u32,
}

impl WavPlayer {
    pub fn load(mixer: &Mixer, path: &Path) -> Result<Self, PipelineError> {
        let (samples, source_rate) = decode_wav(path)?;
        log::info!(
            "loaded {} ({} samples @ {}Hz)",
            path.display(),
            samples.len(),
            source_rate
        );

        let mut bus = mixer.bus.lock().unwrap();
        bus.voices.push(Voice {
            samples,
            source_rate,
            head: 0.0,
            playing: false,
            gain: 1.0,
            gain_target: 1.0,
            gain_step: 0.0,
            ramp_remaining: 0,
            analysis: Arc::new(AnalysisBuffer::new(ANALYSIS_CAPACITY)),
        });

        Ok(Self {
            bus: Arc::clone(&mixer.bus),
            voice: bus.voices.len() - 1,
            device_rate: mixer.device_rate,
        })
    }
}

impl AudioSource for WavPlayer {
    fn start(&mut self) {
        let mut bus = self.bus.lock().unwrap();
        let voice = &mut bus.voices[self.voice];
        voice.head = 0.0;
        voice.playing = true;
    }

    fn stop(&mut self) {
        self.bus.lock().unwrap().voices[self.voice].playing = false;
    }

    fn state(&self) -> PlaybackState {
        if self.bus.lock().unwrap().voices[self.voice].playing {
            PlaybackState::Started
        } else {
            PlaybackState::Stopped
        }
    }

    fn set_gain(&mut self, level_db: f32, ramp_secs: f32) {
        let mut bus = self.bus.lock().unwrap();
        let voice = &mut bus.voices[self.voice];
        let target = 10.0_f32.powf(level_db / 20.0);
        let ramp_samples = ((ramp_secs * self.device_rate as f32) as usize).max(1);
        voice.gain_target = target;
        voice.gain_step = (target - voice.gain) / ramp_samples as f32;
        voice.ramp_remaining = ramp_samples;
    }

    fn attach_analyzer(&mut self, kind: AnalyzerKind, resolution: usize) -> Arc<dyn AnalyzerTap> {
        let bus = self.bus.lock().unwrap();
        let analysis = Arc::clone(&bus.voices[self.voice].analysis);
        match kind {
            AnalyzerKind::Waveform => Arc::new(WaveformTap::new(analysis, resolution)),
            AnalyzerKind::Spectrum => Arc::new(SpectrumTap::new(analysis, resolution)),
            AnalyzerKind::Meter => Arc::new(MeterTap::new(analysis, resolution)),
        }
    }
}
