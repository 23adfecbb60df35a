//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use soundloom::params::{CaptureConfig, EngineConfig, MeasureMode, PipelineParams, ViewMode};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "soundloom")]
#[command(about = "Audio-reactive layered visualization engine", long_about = None)]
pub struct Args {
    /// Track audio files (WAV), bound to keys a/s/d/f in order
    #[arg(required = true, value_name = "TRACK")]
    pub tracks: Vec<PathBuf>,

    /// Cancel sound played when the history is reset with 'c'
    #[arg(long, value_name = "FILE")]
    pub cancel: Option<PathBuf>,

    /// Measurement mode: waveform or spectrum
    #[arg(long, value_name = "MODE", default_value = "spectrum")]
    pub measure: String,

    /// Visualization: area or radial
    #[arg(long, value_name = "VIEW", default_value = "area")]
    pub view: String,

    /// Render width (pixels)
    #[arg(long, value_name = "PIXELS", default_value = "960")]
    pub width: f32,

    /// Tick rate (frames per second)
    #[arg(long, value_name = "HZ", default_value = "10")]
    pub rate: u32,

    /// Run duration (seconds)
    #[arg(long, value_name = "SECONDS", default_value = "30")]
    pub duration: f32,

    /// Output directory for SVG frames
    #[arg(long, value_name = "DIR", default_value = "frames")]
    pub frames_dir: String,

    /// Scheduled key presses, e.g. "a@0,s@2.5,c@10"
    #[arg(long, value_name = "SCHEDULE")]
    pub keys: Option<String>,
}

impl Args {
    /// Parse the measurement mode, falling back to spectrum
    pub fn parse_measure(&self) -> MeasureMode {
        match self.measure.to_lowercase().as_str() {
            "waveform" => MeasureMode::Waveform,
            "spectrum" => MeasureMode::Spectrum,
            other => {
                eprintln!("Warning: Unknown measure mode '{}', using spectrum", other);
                MeasureMode::Spectrum
            }
        }
    }

    /// Parse the view mode, falling back to area
    pub fn parse_view(&self) -> ViewMode {
        match self.view.to_lowercase().as_str() {
            "area" => ViewMode::Area,
            "radial" => ViewMode::Radial,
            other => {
                eprintln!("Warning: Unknown view '{}', using area", other);
                ViewMode::Area
            }
        }
    }

    /// Assemble pipeline parameters from the flags
    pub fn pipeline_params(&self) -> PipelineParams {
        PipelineParams {
            engine: EngineConfig {
                measure: self.parse_measure(),
                view: self.parse_view(),
                width: self.width,
                frame_rate_hz: self.rate,
                ..EngineConfig::default()
            },
            ..PipelineParams::default()
        }
    }

    /// Create the capture configuration and its output directory
    pub fn capture_config(&self) -> std::io::Result<CaptureConfig> {
        let mut config = CaptureConfig::new(self.duration);
        config.output_dir = self.frames_dir.clone();
        std::fs::create_dir_all(config.frames_dir())?;
        Ok(config)
    }

    /// Parse the key schedule into (seconds, key) pairs
    pub fn parse_keys(&self) -> Result<Vec<(f32, char)>, String> {
        let Some(raw) = &self.keys else {
            return Ok(Vec::new());
        };
        let mut schedule = Vec::new();
        for entry in raw.split(',').filter(|e| !e.trim().is_empty()) {
            let (key, at) = entry
                .trim()
                .split_once('@')
                .ok_or_else(|| format!("expected KEY@SECONDS, got '{entry}'"))?;
            let mut chars = key.chars();
            let (Some(key), None) = (chars.next(), chars.next()) else {
                return Err(format!("expected a single key, got '{key}'"));
            };
            let at: f32 = at
                .parse()
                .map_err(|_| format!("bad time '{at}' in '{entry}'"))?;
            schedule.push((at, key));
        }
        Ok(schedule)
    }
}
