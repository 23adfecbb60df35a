//! Analyzer tap implementations: waveform, RMS meter, and windowed FFT
//! spectrum over a shared post-gain sample window.

use std::collections::VecDeque;
use std::f32::consts::PI;
use std::sync::{Arc, Mutex};

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use super::AnalyzerTap;

/// Rolling window of the most recent post-gain samples of one voice.
///
/// The playback callback pushes blocks; taps read snapshots. Bounded: old
/// samples fall off the front once capacity is reached.
pub struct AnalysisBuffer {
    window: Mutex<VecDeque<f32>>,
    capacity: usize,
}

impl AnalysisBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            window: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn push_block(&self, block: &[f32]) {
        let mut window = self.window.lock().unwrap();
        for &sample in block {
            if window.len() == self.capacity {
                window.pop_front();
            }
            window.push_back(sample);
        }
    }

    /// Latest `n` samples, zero-padded at the front while the window is
    /// still filling
    pub fn latest(&self, n: usize) -> Vec<f32> {
        let window = self.window.lock().unwrap();
        let mut out = vec![0.0; n];
        let available = window.len().min(n);
        let start = window.len() - available;
        for (slot, &sample) in out[n - available..].iter_mut().zip(window.range(start..)) {
            *slot = sample;
        }
        out
    }
}

/// Hann window function for FFT analysis
pub fn hann_window(index: usize, size: usize) -> f32 {
    0.5 * (1.0 - ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos())
}

/// Amplitude to decibels; zero amplitude reads as -inf
pub fn amplitude_to_db(amplitude: f32) -> f32 {
    20.0 * amplitude.log10()
}

/// Raw amplitude window tap.
pub struct WaveformTap {
    buffer: Arc<AnalysisBuffer>,
    resolution: usize,
}

impl WaveformTap {
    pub fn new(buffer: Arc<AnalysisBuffer>, resolution: usize) -> Self {
        Self { buffer, resolution }
    }
}

impl AnalyzerTap for WaveformTap {
    fn read(&self) -> Vec<f32> {
        self.buffer.latest(self.resolution)
    }
}

/// RMS level tap, normal range [0, 1] for full-scale input.
pub struct MeterTap {
    buffer: Arc<AnalysisBuffer>,
    window: usize,
}

impl MeterTap {
    pub fn new(buffer: Arc<AnalysisBuffer>, window: usize) -> Self {
        Self { buffer, window }
    }
}

impl AnalyzerTap for MeterTap {
    fn read(&self) -> Vec<f32> {
        let samples = self.buffer.latest(self.window);
        let mean_square = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
        vec![mean_square.sqrt()]
    }
}

/// Windowed-FFT magnitude tap in decibels.
///
/// Reads twice the resolution in samples, applies a Hann window, and
/// returns the magnitudes of the first `resolution` bins. Silence reads as
/// all -inf.
pub struct SpectrumTap {
    buffer: Arc<AnalysisBuffer>,
    resolution: usize,
    fft: Arc<dyn Fft<f32>>,
}

impl SpectrumTap {
    pub fn new(buffer: Arc<AnalysisBuffer>, resolution: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(resolution * 2);
        Self {
            buffer,
            resolution,
            fft,
        }
    }
}

impl AnalyzerTap for SpectrumTap {
    fn read(&self) -> Vec<f32> {
        let size = self.resolution * 2;
        let samples = self.buffer.latest(size);

        let mut bins: Vec<Complex<f32>> = samples
            .iter()
            .enumerate()
            .map(|(i, &s)| Complex::new(s * hann_window(i, size), 0.0))
            .collect();
        self.fft.process(&mut bins);

        bins[..self.resolution]
            .iter()
            .map(|c| amplitude_to_db(c.norm() * 2.0 / size as f32))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_hann_window() {
        let size = 512;

        // Hann window is 0 at the edges, 1 at the center
        assert!((hann_window(0, size) - 0.0).abs() < 0.01);
        assert!((hann_window(size - 1, size) - 0.0).abs() < 0.01);
        assert!((hann_window(size / 2, size) - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_amplitude_to_db_silence_sentinel() {
        assert_eq!(amplitude_to_db(0.0), f32::NEG_INFINITY);
        assert_relative_eq!(amplitude_to_db(1.0), 0.0);
        assert_relative_eq!(amplitude_to_db(0.1), -20.0, epsilon = 1e-4);
    }

    #[test]
    fn test_analysis_buffer_keeps_latest() {
        let buffer = AnalysisBuffer::new(4);
        buffer.push_block(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(buffer.latest(4), vec![3.0, 4.0, 5.0, 6.0]);
        assert_eq!(buffer.latest(2), vec![5.0, 6.0]);
    }

    #[test]
    fn test_analysis_buffer_zero_pads_while_filling() {
        let buffer = AnalysisBuffer::new(8);
        buffer.push_block(&[0.5, -0.5]);
        assert_eq!(buffer.latest(4), vec![0.0, 0.0, 0.5, -0.5]);
    }

    #[test]
    fn test_meter_rms_of_constant_signal() {
        let buffer = Arc::new(AnalysisBuffer::new(64));
        buffer.push_block(&[0.5; 64]);
        let meter = MeterTap::new(Arc::clone(&buffer), 64);
        assert_relative_eq!(meter.read()[0], 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_waveform_tap_reads_resolution_samples() {
        let buffer = Arc::new(AnalysisBuffer::new(64));
        buffer.push_block(&[0.25; 64]);
        let tap = WaveformTap::new(Arc::clone(&buffer), 16);
        let read = tap.read();
        assert_eq!(read.len(), 16);
        assert!(read.iter().all(|&v| v == 0.25));
    }

    #[test]
    fn test_spectrum_of_silence_is_all_neg_infinity() {
        let buffer = Arc::new(AnalysisBuffer::new(512));
        let tap = SpectrumTap::new(Arc::clone(&buffer), 256);
        let read = tap.read();
        assert_eq!(read.len(), 256);
        assert!(read.iter().all(|&v| v == f32::NEG_INFINITY));
    }

    #[test]
    fn test_spectrum_peak_lands_on_tone_bin() {
        let size = 512;
        let buffer = Arc::new(AnalysisBuffer::new(size));
        let tone: Vec<f32> = (0..size)
            .map(|i| (2.0 * PI * 8.0 * i as f32 / size as f32).sin())
            .collect();
        buffer.push_block(&tone);

        let tap = SpectrumTap::new(Arc::clone(&buffer), 256);
        let read = tap.read();
        let peak = read
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 8);
    }
}
