//! Geometry projector: turns stacked layers and waveform windows into
//! declarative shape descriptors for the render surface.
//!
//! Angular convention matches the radial scales: angle 0 points at
//! 12 o'clock and increases clockwise, so a point at radius r and angle a
//! lands at (r·sin a, -r·cos a).

use std::collections::BTreeMap;

use glam::Vec2;

use crate::params::RadialLayout;
use crate::scale::{ring_color, BandScale, LinearScale, RadialScale, Rgb, RADIAL_GOLD, RADIAL_PINE};
use crate::signal::{Sample, SeriesId};
use crate::stack::Layer;

/// Filled or stroked path, recreated every tick.
#[derive(Debug, Clone, PartialEq)]
pub struct PathDescriptor {
    /// Identity key for the surface join
    pub key: String,
    /// SVG path data
    pub d: String,
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub stroke_width: Option<f32>,
    pub stroke_opacity: Option<f32>,
}

impl PathDescriptor {
    pub fn filled(key: String, d: String, fill: Rgb) -> Self {
        Self {
            key,
            d,
            fill: Some(fill.to_hex()),
            stroke: None,
            stroke_width: None,
            stroke_opacity: None,
        }
    }
}

/// Circle marker (the control point).
#[derive(Debug, Clone, PartialEq)]
pub struct CircleDescriptor {
    pub key: String,
    pub cx: f32,
    pub cy: f32,
    pub r: f32,
    pub fill: String,
}

/// Declarative shape handed to the surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Path(PathDescriptor),
    Circle(CircleDescriptor),
}

impl Shape {
    pub fn key(&self) -> &str {
        match self {
            Shape::Path(p) => &p.key,
            Shape::Circle(c) => &c.key,
        }
    }
}

/// Radial position to screen coordinates
pub fn polar(radius: f32, angle: f32) -> Vec2 {
    Vec2::new(radius * angle.sin(), -radius * angle.cos())
}

fn fmt(v: f32) -> String {
    format!("{:.2}", v)
}

fn point_str(p: Vec2) -> String {
    format!("{},{}", fmt(p.x), fmt(p.y))
}

/// Filled area path for one layer: upper boundary left to right, lower
/// boundary back, closed.
fn area_path(layer: &Layer<SeriesId>, x: &LinearScale, y: &LinearScale) -> String {
    if layer.points.is_empty() {
        return String::new();
    }
    let mut d = String::new();
    for (i, p) in layer.points.iter().enumerate() {
        let command = if i == 0 { 'M' } else { 'L' };
        d.push(command);
        d.push_str(&format!("{},{}", fmt(x.map(p.position as f32)), fmt(y.map(p.upper))));
    }
    for p in layer.points.iter().rev() {
        d.push('L');
        d.push_str(&format!("{},{}", fmt(x.map(p.position as f32)), fmt(y.map(p.lower))));
    }
    d.push('Z');
    d
}

/// Project stacked history layers into filled area paths.
///
/// Fill color is keyed by the series' track identity only, so every burst
/// from the same track shares a color.
pub fn area_paths(
    layers: &[Layer<SeriesId>],
    x: &LinearScale,
    y: &LinearScale,
    colors: &[Rgb],
) -> Vec<PathDescriptor> {
    layers
        .iter()
        .map(|layer| {
            let fill = colors[layer.key.track % colors.len()];
            PathDescriptor::filled(layer.key.label(), area_path(layer, x, y), fill)
        })
        .collect()
}

/// Start and end angle of band `position`, shrunk by the fixed angular pad
pub fn padded_angles(bands: &BandScale, layout: &RadialLayout, position: usize) -> (f32, f32) {
    let pad = layout.pad_angle().min(bands.bandwidth());
    let a0 = bands.start(position) + pad / 2.0;
    let a1 = bands.start(position) + bands.bandwidth() - pad / 2.0;
    (a0, a1)
}

/// Annular arc path between two radii and two angles
pub fn annular_arc(r0: f32, r1: f32, a0: f32, a1: f32) -> String {
    let a1 = a1.max(a0);
    let large = if a1 - a0 > std::f32::consts::PI { 1 } else { 0 };
    let outer_start = polar(r1, a0);
    let outer_end = polar(r1, a1);
    let inner_end = polar(r0, a1);
    let inner_start = polar(r0, a0);
    format!(
        "M{}A{},{} 0 {} 1 {}L{}A{},{} 0 {} 0 {}Z",
        point_str(outer_start),
        fmt(r1),
        fmt(r1),
        large,
        point_str(outer_end),
        point_str(inner_end),
        fmt(r0),
        fmt(r0),
        large,
        point_str(inner_start),
    )
}

/// One stacked ring of volume arcs: a group per level, an arc per track.
#[derive(Debug, Clone)]
pub struct ArcGroup {
    pub level: u32,
    pub arcs: Vec<PathDescriptor>,
}

/// Project stacked level layers into annular arc groups.
pub fn bar_arcs(
    layers: &[Layer<u32>],
    bands: &BandScale,
    radius: &RadialScale,
    layout: &RadialLayout,
) -> Vec<ArcGroup> {
    layers
        .iter()
        .map(|layer| {
            let fill = [RADIAL_GOLD, RADIAL_PINE][(layer.key % 2) as usize];
            let arcs = layer
                .points
                .iter()
                .map(|p| {
                    let (a0, a1) = padded_angles(bands, layout, p.position);
                    PathDescriptor::filled(
                        format!("bar-{}-{}", layer.key, p.position),
                        annular_arc(radius.map(p.lower), radius.map(p.upper), a0, a1),
                        fill,
                    )
                })
                .collect();
            ArcGroup {
                level: layer.key,
                arcs,
            }
        })
        .collect()
}

/// Closed cardinal spline (tension 0) through the points
pub fn closed_cardinal_path(points: &[Vec2]) -> String {
    let n = points.len();
    if n < 3 {
        return String::new();
    }
    let at = |i: isize| points[i.rem_euclid(n as isize) as usize];
    let mut d = format!("M{}", point_str(points[0]));
    for i in 0..n as isize {
        let (p0, p1, p2, p3) = (at(i - 1), at(i), at(i + 1), at(i + 2));
        let c1 = p1 + (p2 - p0) / 6.0;
        let c2 = p2 - (p3 - p1) / 6.0;
        d.push_str(&format!(
            "C{} {} {}",
            point_str(c1),
            point_str(c2),
            point_str(p2)
        ));
    }
    d.push('Z');
    d
}

/// Project each track's waveform window into a closed radial trace.
///
/// Stroke width and opacity scale with the window's amplitude spread, so a
/// loud track draws a thick bright ring and a quiet one fades out.
pub fn wave_rings(
    samples: &[Sample],
    track_count: usize,
    layout: &RadialLayout,
) -> Vec<PathDescriptor> {
    let mut by_track: BTreeMap<usize, Vec<&Sample>> = BTreeMap::new();
    for sample in samples {
        by_track.entry(sample.series.track).or_default().push(sample);
    }

    let (band_lo, band_hi) = layout.wave_band();
    let stroke_scale = LinearScale::new((0.0, 1.0), (0.0, 6.0));
    let opacity_scale = LinearScale::new((0.0, 1.0), (0.75, 1.0));

    by_track
        .into_iter()
        .filter(|(_, samples)| !samples.is_empty())
        .map(|(track, samples)| {
            let angle = LinearScale::new((0.0, samples.len() as f32), (0.0, std::f32::consts::TAU));
            let radius = LinearScale::new((-1.0, 1.0), (band_lo, band_hi));
            let points: Vec<Vec2> = samples
                .iter()
                .map(|s| polar(radius.map(s.value), angle.map(s.position as f32)))
                .collect();

            let spread = match crate::scale::extent(samples.iter().map(|s| s.value)) {
                Some((lo, hi)) => (hi - lo).abs(),
                None => 0.0,
            };

            PathDescriptor {
                key: format!("ring-{}", track),
                d: closed_cardinal_path(&points),
                fill: None,
                stroke: Some(ring_color(track, track_count).to_hex()),
                stroke_width: Some(stroke_scale.map(spread)),
                stroke_opacity: Some(opacity_scale.map_clamped(spread)),
            }
        })
        .collect()
}

/// The control-point marker; gold while dragged, pine at rest.
pub fn control_marker(point: Vec2, radius: f32, dragging: bool) -> CircleDescriptor {
    let fill = if dragging { RADIAL_GOLD } else { RADIAL_PINE };
    CircleDescriptor {
        key: "control".to_string(),
        cx: point.x,
        cy: point.y,
        r: radius,
        fill: fill.to_hex(),
    }
}
