//! Signal sampling and accumulation.
//!
//! Every tick the sampler pulls one analyzer read from each started track
//! and tags the elements with a structural series identity. The dataset
//! either grows by concatenation (history/area mode) or is replaced wholesale
//! (radial mode).

use std::collections::HashSet;

use crate::audio::{PlaybackState, Track};

/// Identity of one stackable series: the originating track plus a
/// per-acquisition burst counter. Grouped structurally; color lookup uses
/// only the track component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesId {
    pub track: usize,
    pub burst: u64,
}

impl SeriesId {
    pub fn new(track: usize, burst: u64) -> Self {
        Self { track, burst }
    }

    /// Stable string form used as the render join key
    pub fn label(&self) -> String {
        format!("{}-{}", self.track, self.burst)
    }
}

/// One tagged analyzer element. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub position: usize,
    pub series: SeriesId,
    pub value: f32,
}

/// How new samples merge into the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulateMode {
    /// Concatenate onto the session history. Growth is unbounded for the
    /// lifetime of the session; only an explicit reset empties it.
    Append,
    /// Discard the previous tick's samples entirely
    Replace,
}

/// Sample collection plus the explicit first-seen registry of series
/// identities that fixes stacking order.
#[derive(Debug, Default)]
pub struct Dataset {
    samples: Vec<Sample>,
    order: Vec<SeriesId>,
    seen: HashSet<SeriesId>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Series identities in first-seen order; never reordered mid-session
    pub fn series_order(&self) -> &[SeriesId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn accumulate(&mut self, new: Vec<Sample>, mode: AccumulateMode) {
        if mode == AccumulateMode::Replace {
            self.samples.clear();
            self.order.clear();
            self.seen.clear();
        }
        for sample in &new {
            if self.seen.insert(sample.series) {
                self.order.push(sample.series);
            }
        }
        self.samples.extend(new);
    }

    /// Empty the dataset and its series registry
    pub fn reset(&mut self) {
        self.samples.clear();
        self.order.clear();
        self.seen.clear();
    }
}

/// True when a read is the analyzer's "not yet producing signal" sentinel:
/// all elements zero, or -inf for silent spectrum bins.
pub fn is_silent(values: &[f32]) -> bool {
    values.iter().all(|&v| v == 0.0 || v == f32::NEG_INFINITY)
}

/// Pull one signal burst from every started track.
///
/// Each element of a track's read becomes one sample at its element index,
/// tagged with a fresh burst identity. All-silent reads contribute nothing
/// this tick; the remaining tracks still sample normally.
pub fn sample_bursts(tracks: &[Track], next_burst: &mut u64) -> Vec<Sample> {
    let mut out = Vec::new();
    for track in tracks {
        if track.state() != PlaybackState::Started {
            continue;
        }
        let values = track.read_signal();
        if is_silent(&values) {
            log::trace!("track {} silent, skipping burst", track.index);
            continue;
        }
        let series = SeriesId::new(track.index, *next_burst);
        *next_burst += 1;
        out.extend(values.iter().enumerate().map(|(position, &value)| Sample {
            position,
            series,
            value,
        }));
    }
    out
}

/// Pull the current waveform window from every track (radial rings).
///
/// Replace-mode data: one series per track, burst id pinned to zero.
pub fn sample_waveforms(tracks: &[Track]) -> Vec<Sample> {
    let mut out = Vec::new();
    for track in tracks {
        let values = track.read_wave();
        let series = SeriesId::new(track.index, 0);
        out.extend(values.iter().enumerate().map(|(position, &value)| Sample {
            position,
            series,
            value,
        }));
    }
    out
}

/// Per-track meter levels split in half across two stacked arc levels.
///
/// Points are (track position, level key, half the meter reading), ready for
/// the stack layout keyed by level.
pub fn sample_levels(tracks: &[Track]) -> Vec<(usize, u32, f32)> {
    tracks
        .iter()
        .flat_map(|track| {
            let half = track.level() / 2.0;
            [(track.index, 0u32, half), (track.index, 1u32, half)]
        })
        .collect()
}
