//! Soundloom - plays audio tracks and weaves their live signal into
//! layered geometry.
//!
//! Tracks pulse through stacked areas or a radial dashboard; the control
//! point wanders or follows a drag, mixing the tracks by proximity.

mod cli;

use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use soundloom::audio::playback::{Mixer, WavPlayer};
use soundloom::audio::{AudioSource, Track};
use soundloom::params::ViewMode;
use soundloom::pipeline::Pipeline;
use soundloom::rendering::SvgSurface;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = cli::Args::parse();
    let params = args.pipeline_params();
    let capture = args.capture_config().context("creating frame directory")?;
    let schedule = args.parse_keys().map_err(anyhow::Error::msg)?;

    println!("Soundloom - audio-reactive layered visualization engine");
    println!("Initializing systems...\n");

    // All assets decode up front; any failure aborts before the first tick
    let mixer = Mixer::new()?;
    let tracks: Vec<Track> = args
        .tracks
        .iter()
        .enumerate()
        .map(|(index, path)| {
            let player = WavPlayer::load(&mixer, path)?;
            Ok(Track::new(
                Box::new(player),
                index,
                params.engine.measure,
                &params.analyzer,
            ))
        })
        .collect::<Result<_, soundloom::error::PipelineError>>()?;

    let cancel_sound: Option<Box<dyn AudioSource>> = match &args.cancel {
        Some(path) => Some(Box::new(WavPlayer::load(&mixer, path)?)),
        None => None,
    };

    let width = params.engine.width;
    let height = params.engine.height();
    let view_box = match params.engine.view {
        ViewMode::Area => [0.0, 0.0, width, height],
        ViewMode::Radial => [-width / 2.0, -height / 2.0, width, height],
    };
    let surface = SvgSurface::new(width, height, view_box, capture.frames_dir().into())
        .context("creating render surface")?;

    let mut pipeline = Pipeline::create(params, tracks, cancel_sound, surface)?;

    println!("Soundloom is running!");
    println!("Frames: {}/\n", capture.output_dir);

    pipeline.run(Duration::from_secs_f32(capture.duration_secs), &schedule);
    pipeline.dispose();

    Ok(())
}
