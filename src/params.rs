//! Parameter definitions with physical units and documented semantics.
//!
//! Every magic number of the engine lives here with:
//! - Physical units (pixels, seconds, radians, decibels)
//! - Documented ranges and meanings
//! - A `Default` matching the reference tuning

use std::time::Duration;

/// What the per-track signal tap measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureMode {
    /// Waveform amplitudes in [-1, 1]
    Waveform,
    /// Spectrum magnitudes in decibels (0 dB ceiling, -inf floor)
    Spectrum,
}

/// Which visualization the pipeline drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// Stacked area chart of the accumulated signal history
    Area,
    /// Stacked radial volume arcs + waveform rings + control point
    Radial,
}

/// Top-level engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Signal measurement mode for the history dataset
    pub measure: MeasureMode,

    /// Active visualization
    pub view: ViewMode,

    /// Render surface width (pixels)
    pub width: f32,

    /// Tick rate driving the whole pipeline (Hz)
    /// reference value: 10
    pub frame_rate_hz: u32,

    /// Vertical margin reserved above and below the area chart in
    /// waveform mode (pixels); spectrum mode uses the full height
    pub waveform_margin_px: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            measure: MeasureMode::Spectrum,
            view: ViewMode::Area,
            width: 960.0,
            frame_rate_hz: 10,
            waveform_margin_px: 50.0,
        }
    }
}

impl EngineConfig {
    /// Surface height (pixels): golden-ratio landscape for the area view,
    /// square for the radial view
    pub fn height(&self) -> f32 {
        match self.view {
            ViewMode::Area => self.width * 0.618,
            ViewMode::Radial => self.width,
        }
    }

    /// Vertical margins (top, bottom) for the area chart
    pub fn margins(&self) -> (f32, f32) {
        match self.measure {
            MeasureMode::Waveform => (self.waveform_margin_px, self.waveform_margin_px),
            MeasureMode::Spectrum => (0.0, 0.0),
        }
    }

    /// Interval between ticks
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate_hz as f64)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.frame_rate_hz == 0 {
            return Err("frame rate must be > 0".to_string());
        }
        if self.width <= 0.0 {
            return Err(format!("width must be positive, got {}", self.width));
        }
        Ok(())
    }
}

/// Analyzer tap configuration
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Samples per analyzer read (power of two)
    /// reference value: 256
    pub resolution: usize,

    /// RMS window for the meter tap (samples)
    pub meter_window: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            resolution: 256,
            meter_window: 2048,
        }
    }
}

impl AnalyzerConfig {
    /// FFT window backing a spectrum read (two samples per output bin)
    pub fn window_size(&self) -> usize {
        self.resolution * 2
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.resolution.is_power_of_two() {
            return Err(format!(
                "analyzer resolution must be power of 2, got {}",
                self.resolution
            ));
        }
        if self.meter_window == 0 {
            return Err("meter window must be > 0".to_string());
        }
        Ok(())
    }
}

/// Radial layout geometry.
///
/// Rings from the center out: control disk, waveform rings, volume arcs.
#[derive(Debug, Clone)]
pub struct RadialLayout {
    /// Radius of the ring holding the per-track anchors (pixels)
    /// reference value: 120
    pub inner_radius_px: f32,

    /// Inner radius of the volume arc ring (pixels)
    /// reference value: 250
    pub middle_radius_px: f32,

    /// Linear gap between adjacent bands, measured at the middle radius
    /// (pixels); converted to a fixed angular pad
    /// reference value: 1.5
    pub pad_width_px: f32,
}

impl Default for RadialLayout {
    fn default() -> Self {
        Self {
            inner_radius_px: 120.0,
            middle_radius_px: 250.0,
            pad_width_px: 1.5,
        }
    }
}

impl RadialLayout {
    /// Outer radius of the volume arcs for a square surface of `width`
    pub fn outer_radius(&self, width: f32) -> f32 {
        width / 2.0
    }

    /// Radius of the disk constraining the control point
    pub fn control_radius(&self) -> f32 {
        self.inner_radius_px / 2.0
    }

    /// Angular pad between adjacent bands (radians)
    pub fn pad_angle(&self) -> f32 {
        self.pad_width_px / self.middle_radius_px
    }

    /// Radius band for the waveform rings: amplitude -1 maps to the low
    /// edge, +1 to the middle radius
    pub fn wave_band(&self) -> (f32, f32) {
        let d = self.middle_radius_px - self.inner_radius_px;
        (self.middle_radius_px - d * 2.0, self.middle_radius_px)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.inner_radius_px <= 0.0 || self.middle_radius_px <= self.inner_radius_px {
            return Err(format!(
                "radii must satisfy 0 < inner ({}) < middle ({})",
                self.inner_radius_px, self.middle_radius_px
            ));
        }
        Ok(())
    }
}

/// Mapping from control-point proximity to per-track gain
#[derive(Debug, Clone)]
pub struct GainMapParams {
    /// Distances at or below `near` control radii are full volume
    /// reference value: 2.0
    pub near_radius_factor: f32,

    /// Distances at or beyond `far` control radii are fully attenuated
    /// reference value: 3.0
    pub far_radius_factor: f32,

    /// Gain at full attenuation (decibels)
    /// reference value: -60
    pub floor_db: f32,

    /// Gain ramp duration, avoids audible clicks (seconds)
    pub ramp_secs: f32,
}

impl Default for GainMapParams {
    fn default() -> Self {
        Self {
            near_radius_factor: 2.0,
            far_radius_factor: 3.0,
            floor_db: -60.0,
            ramp_secs: 0.05,
        }
    }
}

/// Procedural wander of the idle control point
#[derive(Debug, Clone)]
pub struct NoiseWalkParams {
    /// Perlin seed; the angle walk uses `seed + 1`
    pub seed: u32,

    /// Noise-time advance per tick (dimensionless)
    /// reference value: 0.01
    pub step_per_tick: f32,
}

impl Default for NoiseWalkParams {
    fn default() -> Self {
        Self {
            seed: 42,
            step_per_tick: 0.01,
        }
    }
}

/// Everything the pipeline needs, bundled
#[derive(Debug, Clone, Default)]
pub struct PipelineParams {
    pub engine: EngineConfig,
    pub analyzer: AnalyzerConfig,
    pub layout: RadialLayout,
    pub gain: GainMapParams,
    pub walk: NoiseWalkParams,
}

impl PipelineParams {
    pub fn validate(&self) -> Result<(), String> {
        self.engine.validate()?;
        self.analyzer.validate()?;
        self.layout.validate()
    }
}

/// Frame capture configuration
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Duration to run (seconds)
    pub duration_secs: f32,

    /// Output directory for SVG frames
    pub output_dir: String,
}

impl CaptureConfig {
    pub fn new(duration_secs: f32) -> Self {
        Self {
            duration_secs,
            output_dir: "frames".to_string(),
        }
    }

    /// Frame directory path
    pub fn frames_dir(&self) -> String {
        self.output_dir.clone()
    }
}
