//! Render loop driver.
//!
//! The pipeline owns every piece of mutable session state (dataset, control
//! point, burst counter) and runs the whole tick synchronously: drain queued
//! input intents, sample, accumulate, stack, scale, project, hand shapes to
//! the surface. Input handlers never mutate state directly; they enqueue
//! intents that the next tick applies.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use glam::Vec2;

use crate::audio::{AudioSource, PlaybackState, Track};
use crate::control::{ControlState, GainMapper};
use crate::error::PipelineError;
use crate::geometry::{self, Shape};
use crate::params::{MeasureMode, PipelineParams, ViewMode};
use crate::rendering::Surface;
use crate::scale::{extent, track_gradient, BandScale, LinearScale, RadialScale, Rgb, CATEGORICAL};
use crate::signal::{self, AccumulateMode, Dataset, SeriesId};
use crate::stack::{stack_layout, OffsetPolicy};

/// Keyboard triggers for the first four tracks
const TRACK_KEYS: [char; 4] = ['a', 's', 'd', 'f'];

/// Queued input event, applied at the start of the next tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intent {
    StartTrack(usize),
    TogglePlayback,
    /// Reset the history dataset and play the cancel sound
    Cancel,
    DragStart,
    DragMove { x: f32, y: f32 },
    DragEnd,
}

/// The sampling-to-geometry pipeline, driven by [`Pipeline::tick`].
pub struct Pipeline<S: Surface> {
    params: PipelineParams,
    tracks: Vec<Track>,
    cancel_sound: Option<Box<dyn AudioSource>>,
    dataset: Dataset,
    control: ControlState,
    gain: GainMapper,
    surface: S,
    intents: VecDeque<Intent>,
    /// Per-track colors for the history layers
    colors: Vec<Rgb>,
    next_burst: u64,
    ticks: u64,
    disposed: bool,
}

impl<S: Surface> Pipeline<S> {
    /// Validate configuration and assemble the pipeline. Fails fast before
    /// any tick runs; never constructs a partial pipeline.
    pub fn create(
        params: PipelineParams,
        tracks: Vec<Track>,
        cancel_sound: Option<Box<dyn AudioSource>>,
        mut surface: S,
    ) -> Result<Self, PipelineError> {
        params.validate().map_err(PipelineError::Config)?;
        if tracks.is_empty() {
            return Err(PipelineError::Config(
                "at least one track is required".to_string(),
            ));
        }

        surface.set_background("black");

        let colors = match params.engine.measure {
            MeasureMode::Waveform => CATEGORICAL
                .iter()
                .cycle()
                .take(tracks.len())
                .copied()
                .collect(),
            MeasureMode::Spectrum => track_gradient(tracks.len()),
        };

        let control = ControlState::new(&params.walk, params.layout.control_radius());
        let gain = GainMapper::new(tracks.len(), &params.layout, &params.gain);

        log::info!(
            "pipeline ready: {} tracks, {:?}/{:?}, {} Hz",
            tracks.len(),
            params.engine.measure,
            params.engine.view,
            params.engine.frame_rate_hz
        );

        Ok(Self {
            params,
            tracks,
            cancel_sound,
            dataset: Dataset::new(),
            control,
            gain,
            surface,
            intents: VecDeque::new(),
            colors,
            next_burst: 0,
            ticks: 0,
            disposed: false,
        })
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Queue an input intent for the next tick
    pub fn enqueue(&mut self, intent: Intent) {
        self.intents.push_back(intent);
    }

    /// Keyboard input: `a/s/d/f` start tracks 0-3, `c` cancels
    pub fn key_pressed(&mut self, key: char) {
        if let Some(index) = TRACK_KEYS.iter().position(|&k| k == key) {
            if index < self.tracks.len() {
                self.enqueue(Intent::StartTrack(index));
            }
            return;
        }
        if key == 'c' {
            self.enqueue(Intent::Cancel);
        }
    }

    fn playback_active(&self) -> bool {
        self.tracks
            .iter()
            .any(|t| t.state() == PlaybackState::Started)
    }

    fn apply_intent(&mut self, intent: Intent) {
        match intent {
            Intent::StartTrack(index) => {
                if let Some(track) = self.tracks.get_mut(index) {
                    track.start();
                }
            }
            Intent::TogglePlayback => {
                if self.playback_active() {
                    for track in &mut self.tracks {
                        track.stop();
                    }
                } else {
                    for track in &mut self.tracks {
                        track.start();
                    }
                }
            }
            Intent::Cancel => {
                self.dataset.reset();
                if let Some(cancel) = &mut self.cancel_sound {
                    cancel.start();
                }
                log::debug!("history reset");
            }
            Intent::DragStart => self.control.drag_start(),
            Intent::DragMove { x, y } => self.control.drag_move(Vec2::new(x, y)),
            Intent::DragEnd => self.control.drag_end(),
        }
    }

    /// Run one pipeline tick. A disposed pipeline ignores the call.
    pub fn tick(&mut self) {
        if self.disposed {
            return;
        }
        while let Some(intent) = self.intents.pop_front() {
            self.apply_intent(intent);
        }

        match self.params.engine.view {
            ViewMode::Area => self.tick_area(),
            ViewMode::Radial => self.tick_radial(),
        }

        let frame = self.ticks;
        self.ticks += 1;
        if let Err(e) = self.surface.present(frame) {
            log::warn!("frame {frame} not written: {e}");
        }
    }

    /// History view: append this tick's bursts and redraw the stacked areas.
    fn tick_area(&mut self) {
        let new = signal::sample_bursts(&self.tracks, &mut self.next_burst);
        self.dataset.accumulate(new, AccumulateMode::Append);
        if self.dataset.is_empty() {
            return;
        }

        let offset = match self.params.engine.measure {
            MeasureMode::Waveform => OffsetPolicy::Diverging,
            MeasureMode::Spectrum => OffsetPolicy::None,
        };
        let points: Vec<(usize, SeriesId, f32)> = self
            .dataset
            .samples()
            .iter()
            .map(|s| (s.position, s.series, s.value))
            .collect();
        let layers = stack_layout(&points, self.dataset.series_order(), offset);

        let engine = &self.params.engine;
        let x_domain = extent(self.dataset.samples().iter().map(|s| s.position as f32))
            .unwrap_or((0.0, 1.0));
        let x = LinearScale::new(x_domain, (0.0, engine.width));

        let boundaries = layers
            .iter()
            .flat_map(|l| l.points.iter().flat_map(|p| [p.lower, p.upper]));
        let y_domain = extent(boundaries).unwrap_or((0.0, 1.0));
        let (top, bottom) = engine.margins();
        let y = LinearScale::new(y_domain, (engine.height() - bottom, top));

        let paths = geometry::area_paths(&layers, &x, &y, &self.colors);
        self.surface
            .join("areas", paths.into_iter().map(Shape::Path).collect());
    }

    /// Radial view: wander/apply the control point, mix gains, and redraw
    /// volume arcs, waveform rings, and the marker.
    fn tick_radial(&mut self) {
        self.control.idle_step(self.playback_active());
        let point = self.control.point();

        let ramp = self.gain.ramp_secs;
        for index in 0..self.tracks.len() {
            let db = self.gain.gain_db(index, point);
            self.tracks[index].set_gain(db, ramp);
        }

        let layout = &self.params.layout;
        let bands = BandScale::new(self.tracks.len());

        // Stacked volume arcs, two levels per track
        let levels = signal::sample_levels(&self.tracks);
        let level_layers = stack_layout(&levels, &[0, 1], OffsetPolicy::None);
        let radius = RadialScale::new(
            (0.0, 1.0),
            (
                layout.middle_radius_px,
                layout.outer_radius(self.params.engine.width),
            ),
        );
        let arcs: Vec<Shape> = geometry::bar_arcs(&level_layers, &bands, &radius, layout)
            .into_iter()
            .flat_map(|group| group.arcs)
            .map(Shape::Path)
            .collect();
        self.surface.join("bars", arcs);

        // Waveform rings from the replace-mode dataset
        let waves = signal::sample_waveforms(&self.tracks);
        self.dataset.accumulate(waves, AccumulateMode::Replace);
        let rings = geometry::wave_rings(self.dataset.samples(), self.tracks.len(), layout);
        self.surface
            .join("rings", rings.into_iter().map(Shape::Path).collect());

        let marker =
            geometry::control_marker(point, layout.control_radius(), self.control.is_dragging());
        self.surface.join("control", vec![Shape::Circle(marker)]);
    }

    /// Drive ticks at the configured rate for `duration`, feeding scheduled
    /// key presses (`(seconds, key)`) as they come due.
    pub fn run(&mut self, duration: Duration, schedule: &[(f32, char)]) {
        let interval = self.params.engine.tick_interval();
        let rate = self.params.engine.frame_rate_hz as f64;
        let total_ticks = (duration.as_secs_f64() * rate).ceil() as u64;

        let mut events: Vec<(f32, char)> = schedule.to_vec();
        events.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        let mut next_event = 0;

        let start = Instant::now();
        for n in 0..total_ticks {
            if self.disposed {
                break;
            }
            let elapsed = (n as f64 / rate) as f32;
            while next_event < events.len() && events[next_event].0 <= elapsed {
                self.key_pressed(events[next_event].1);
                next_event += 1;
            }
            self.tick();

            let deadline = start + interval * (n as u32 + 1);
            if let Some(wait) = deadline.checked_duration_since(Instant::now()) {
                std::thread::sleep(wait);
            }
        }
    }

    /// Stop the ticker and all sources. Safe to call more than once; after
    /// disposal no tick runs and no shapes reach the surface.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        for track in &mut self.tracks {
            track.stop();
        }
        if let Some(cancel) = &mut self.cancel_sound {
            cancel.stop();
        }
        log::info!("pipeline disposed after {} ticks", self.ticks);
    }
}

impl<S: Surface> Drop for Pipeline<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::{MockSource, SourceLog};
    use crate::params::{AnalyzerConfig, EngineConfig};
    use crate::rendering::testing::RecordingSurface;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn params(measure: MeasureMode, view: ViewMode) -> PipelineParams {
        PipelineParams {
            engine: EngineConfig {
                measure,
                view,
                ..EngineConfig::default()
            },
            ..PipelineParams::default()
        }
    }

    fn spectrum_track(index: usize, resolution: usize, started: bool) -> Track {
        let mut source = MockSource::with_signal(vec![-30.0; resolution]);
        if started {
            source.start_now();
        }
        Track::new(
            Box::new(source),
            index,
            MeasureMode::Spectrum,
            &AnalyzerConfig {
                resolution,
                meter_window: resolution,
            },
        )
    }

    #[test]
    fn test_create_rejects_empty_track_list() {
        let result = Pipeline::create(
            params(MeasureMode::Spectrum, ViewMode::Area),
            Vec::new(),
            None,
            RecordingSurface::new(),
        );
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_scenario_a_five_ticks_single_started_track() {
        // 4 tracks, spectrum resolution 256, only track 0 started
        let tracks: Vec<Track> = (0..4).map(|i| spectrum_track(i, 256, i == 0)).collect();
        let mut pipeline = Pipeline::create(
            params(MeasureMode::Spectrum, ViewMode::Area),
            tracks,
            None,
            RecordingSurface::new(),
        )
        .unwrap();

        for _ in 0..5 {
            pipeline.tick();
        }

        let dataset = pipeline.dataset();
        assert_eq!(dataset.len(), 256 * 5);
        assert!(dataset.samples().iter().all(|s| s.series.track == 0));
        // One burst per tick, all distinct
        assert_eq!(dataset.series_order().len(), 5);
        assert_eq!(pipeline.surface().shapes("areas").len(), 5);
    }

    #[test]
    fn test_scenario_b_two_level_groups_of_three_arcs() {
        let levels = [0.2_f32, 0.4, 0.6];
        let tracks: Vec<Track> = levels
            .iter()
            .enumerate()
            .map(|(i, &level)| {
                Track::new(
                    Box::new(MockSource::with_level(level)),
                    i,
                    MeasureMode::Waveform,
                    &AnalyzerConfig::default(),
                )
            })
            .collect();
        let mut pipeline = Pipeline::create(
            params(MeasureMode::Waveform, ViewMode::Radial),
            tracks,
            None,
            RecordingSurface::new(),
        )
        .unwrap();

        pipeline.tick();

        let bars = pipeline.surface().shapes("bars");
        assert_eq!(bars.len(), 6);

        // Two stacked groups (levels 0 and 1), one arc per track in each
        for level in 0..2 {
            let group: Vec<&Shape> = bars
                .iter()
                .filter(|s| s.key().starts_with(&format!("bar-{level}-")))
                .collect();
            assert_eq!(group.len(), 3);
        }
    }

    #[test]
    fn test_scenario_c_cancel_resets_history_and_plays_cancel_sound() {
        let tracks = vec![spectrum_track(0, 4, true)];
        let cancel = MockSource::with_signal(vec![0.0; 4]);
        let cancel_log = Arc::clone(&cancel.log);
        let mut pipeline = Pipeline::create(
            params(MeasureMode::Spectrum, ViewMode::Area),
            tracks,
            Some(Box::new(cancel)),
            RecordingSurface::new(),
        )
        .unwrap();

        for _ in 0..5 {
            pipeline.tick();
        }
        assert_eq!(pipeline.dataset().len(), 20);

        pipeline.apply_intent(Intent::Cancel);
        assert_eq!(pipeline.dataset().len(), 0);
        assert!(pipeline.dataset().series_order().is_empty());
        assert_eq!(cancel_log.start_count(), 1);

        // Queued through the keymap, the reset lands at the next tick's
        // start, before that tick's burst is appended
        for _ in 0..3 {
            pipeline.tick();
        }
        pipeline.key_pressed('c');
        pipeline.tick();
        assert_eq!(pipeline.dataset().len(), 4);
        assert_eq!(cancel_log.start_count(), 2);
    }

    #[test]
    fn test_keymap_starts_matching_track() {
        let tracks: Vec<Track> = (0..4).map(|i| spectrum_track(i, 4, false)).collect();
        let mut pipeline = Pipeline::create(
            params(MeasureMode::Spectrum, ViewMode::Area),
            tracks,
            None,
            RecordingSurface::new(),
        )
        .unwrap();

        pipeline.key_pressed('s');
        pipeline.tick();

        let dataset = pipeline.dataset();
        assert!(!dataset.is_empty());
        assert!(dataset.samples().iter().all(|s| s.series.track == 1));
    }

    #[test]
    fn test_radial_tick_applies_proximity_gain_to_every_track() {
        let sources: Vec<MockSource> = (0..3).map(|_| MockSource::with_level(0.5)).collect();
        let logs: Vec<Arc<SourceLog>> = sources.iter().map(|s| Arc::clone(&s.log)).collect();
        let tracks: Vec<Track> = sources
            .into_iter()
            .enumerate()
            .map(|(i, source)| {
                Track::new(
                    Box::new(source),
                    i,
                    MeasureMode::Waveform,
                    &AnalyzerConfig::default(),
                )
            })
            .collect();
        let mut pipeline = Pipeline::create(
            params(MeasureMode::Waveform, ViewMode::Radial),
            tracks,
            None,
            RecordingSurface::new(),
        )
        .unwrap();

        pipeline.tick();

        for log in &logs {
            let (db, ramp) = log.last_gain().expect("gain applied");
            assert!((-60.0..=0.0).contains(&db));
            assert_relative_eq!(ramp, 0.05);
        }
    }

    #[test]
    fn test_drag_intents_route_to_control_point() {
        let tracks = vec![spectrum_track(0, 4, false)];
        let mut pipeline = Pipeline::create(
            params(MeasureMode::Waveform, ViewMode::Radial),
            tracks,
            None,
            RecordingSurface::new(),
        )
        .unwrap();

        pipeline.enqueue(Intent::DragStart);
        pipeline.enqueue(Intent::DragMove { x: 500.0, y: 0.0 });
        pipeline.tick();

        // Raw point far outside the disk lands on its boundary
        let marker = pipeline
            .surface()
            .shapes("control")
            .iter()
            .find_map(|s| match s {
                Shape::Circle(c) => Some(c.clone()),
                _ => None,
            })
            .unwrap();
        assert_relative_eq!(marker.cx, 60.0, epsilon = 1e-3);
        assert_relative_eq!(marker.cy, 0.0);
    }

    #[test]
    fn test_toggle_playback_flips_all_tracks() {
        let tracks: Vec<Track> = (0..2).map(|i| spectrum_track(i, 4, false)).collect();
        let mut pipeline = Pipeline::create(
            params(MeasureMode::Waveform, ViewMode::Radial),
            tracks,
            None,
            RecordingSurface::new(),
        )
        .unwrap();

        pipeline.apply_intent(Intent::TogglePlayback);
        assert!(pipeline.playback_active());

        pipeline.apply_intent(Intent::TogglePlayback);
        assert!(!pipeline.playback_active());
    }

    #[test]
    fn test_disposed_pipeline_never_joins_again() {
        let tracks = vec![spectrum_track(0, 4, true)];
        let mut pipeline = Pipeline::create(
            params(MeasureMode::Spectrum, ViewMode::Area),
            tracks,
            None,
            RecordingSurface::new(),
        )
        .unwrap();

        pipeline.tick();
        let joins_before = pipeline.surface().join_count;
        assert!(joins_before > 0);

        pipeline.dispose();
        assert!(pipeline.is_disposed());
        pipeline.tick();
        assert_eq!(pipeline.surface().join_count, joins_before);

        // Idempotent
        pipeline.dispose();
        assert!(pipeline.is_disposed());
    }
}
