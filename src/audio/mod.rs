//! Audio source abstraction and per-track wiring.
//!
//! The pipeline consumes audio through two small traits: a source that can
//! play, stop, and ramp its gain, and analyzer taps that hand back the
//! current sample vector on demand. The shipped cpal/hound backend lives in
//! [`playback`]; tests substitute scripted sources.

pub mod analysis;
pub mod playback;

use std::sync::Arc;

use crate::params::{AnalyzerConfig, MeasureMode};

/// Playback state of an audio source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Started,
}

/// What an analyzer tap measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzerKind {
    /// Recent waveform amplitudes in [-1, 1]
    Waveform,
    /// Spectrum magnitudes in decibels (windowed FFT)
    Spectrum,
    /// RMS level in [0, 1]; reads as a single element
    Meter,
}

/// Read handle on a source's current signal.
pub trait AnalyzerTap: Send + Sync {
    /// Latest sample vector. Length is the attached resolution (1 for
    /// meters). A source producing no signal reads as all zeros.
    fn read(&self) -> Vec<f32>;
}

/// A playable audio source with ramped gain and attachable analyzers.
pub trait AudioSource {
    /// Begin playback from the start of the asset
    fn start(&mut self);

    /// Stop playback
    fn stop(&mut self);

    fn state(&self) -> PlaybackState;

    /// Ramp the output gain to `level_db` over `ramp_secs` (no clicks)
    fn set_gain(&mut self, level_db: f32, ramp_secs: f32);

    /// Attach an analyzer of the given kind and resolution
    fn attach_analyzer(&mut self, kind: AnalyzerKind, resolution: usize) -> Arc<dyn AnalyzerTap>;
}

/// One track: an audio source plus the three taps the pipeline reads.
pub struct Track {
    pub index: usize,
    source: Box<dyn AudioSource>,
    signal: Arc<dyn AnalyzerTap>,
    wave: Arc<dyn AnalyzerTap>,
    meter: Arc<dyn AnalyzerTap>,
}

impl Track {
    pub fn new(
        mut source: Box<dyn AudioSource>,
        index: usize,
        measure: MeasureMode,
        analyzer: &AnalyzerConfig,
    ) -> Self {
        let signal_kind = match measure {
            MeasureMode::Waveform => AnalyzerKind::Waveform,
            MeasureMode::Spectrum => AnalyzerKind::Spectrum,
        };
        let signal = source.attach_analyzer(signal_kind, analyzer.resolution);
        let wave = source.attach_analyzer(AnalyzerKind::Waveform, analyzer.resolution);
        let meter = source.attach_analyzer(AnalyzerKind::Meter, analyzer.meter_window);
        Self {
            index,
            source,
            signal,
            wave,
            meter,
        }
    }

    pub fn start(&mut self) {
        self.source.start();
    }

    pub fn stop(&mut self) {
        self.source.stop();
    }

    pub fn state(&self) -> PlaybackState {
        self.source.state()
    }

    pub fn set_gain(&mut self, level_db: f32, ramp_secs: f32) {
        self.source.set_gain(level_db, ramp_secs);
    }

    /// Measurement-mode tap (waveform or spectrum per configuration)
    pub fn read_signal(&self) -> Vec<f32> {
        self.signal.read()
    }

    /// Waveform tap backing the radial rings
    pub fn read_wave(&self) -> Vec<f32> {
        self.wave.read()
    }

    /// Meter level in [0, 1]
    pub fn level(&self) -> f32 {
        self.meter.read().first().copied().unwrap_or(0.0)
    }
}
