//! Interactive control point: drag state machine, procedural idle wander,
//! and the proximity-to-gain mapping that mixes the tracks.

use glam::Vec2;
use noise::{NoiseFn, Perlin};

use crate::params::{GainMapParams, NoiseWalkParams, RadialLayout};
use crate::scale::BandScale;

/// Rescale a point radially onto the disk boundary when it falls outside:
/// direction preserved, magnitude clamped.
pub fn constrain_to_disk(radius: f32, point: Vec2) -> Vec2 {
    let distance = point.length();
    if distance > radius {
        point * (radius / distance)
    } else {
        point
    }
}

/// Linear remap of `x` from [in_min, in_max] to [out_min, out_max],
/// unclamped.
fn map_range(x: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

/// Smooth pseudo-random trajectory: a pure function of elapsed tick count.
///
/// Same seed, same trajectory; the walk holds no hidden state beyond the
/// seeded permutation table.
pub struct NoiseWalk {
    perlin: Perlin,
    min: f32,
    max: f32,
    step: f32,
}

impl NoiseWalk {
    pub fn new(seed: u32, min: f32, max: f32, step: f32) -> Self {
        Self {
            perlin: Perlin::new(seed),
            min,
            max,
            step,
        }
    }

    /// Walk value after `ticks` elapsed ticks, in [min, max]
    pub fn at(&self, ticks: u64) -> f32 {
        let t = ticks as f64 * self.step as f64;
        let n = self.perlin.get([t, 0.0]) as f32;
        map_range(n, -1.0, 1.0, self.min, self.max)
    }
}

/// Control point state machine over {Idle, Dragging}.
///
/// While idle (and playback is active) the point follows two independent
/// noise walks, one for radius and one for angle, offset by the committed
/// drag displacement. The result always lies within the control disk.
pub struct ControlState {
    point: Vec2,
    offset: Vec2,
    drag_origin: Option<Vec2>,
    ticks: u64,
    disk_radius: f32,
    radius_walk: NoiseWalk,
    angle_walk: NoiseWalk,
}

impl ControlState {
    pub fn new(params: &NoiseWalkParams, disk_radius: f32) -> Self {
        Self {
            point: Vec2::ZERO,
            offset: Vec2::ZERO,
            drag_origin: None,
            ticks: 0,
            disk_radius,
            radius_walk: NoiseWalk::new(params.seed, 0.0, disk_radius, params.step_per_tick),
            angle_walk: NoiseWalk::new(
                params.seed + 1,
                0.0,
                std::f32::consts::TAU,
                params.step_per_tick,
            ),
        }
    }

    pub fn point(&self) -> Vec2 {
        self.point
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_origin.is_some()
    }

    /// Idle → Dragging: capture the current point as the drag origin
    pub fn drag_start(&mut self) {
        self.drag_origin = Some(self.point);
    }

    /// Move the point to the raw drag position, clamped to the disk
    pub fn drag_move(&mut self, raw: Vec2) {
        if self.drag_origin.is_none() {
            return;
        }
        self.point = constrain_to_disk(self.disk_radius, raw);
    }

    /// Dragging → Idle: fold the net displacement into the persistent
    /// offset so the rest position continues from where dragging left it
    pub fn drag_end(&mut self) {
        if let Some(origin) = self.drag_origin.take() {
            self.offset += self.point - origin;
        }
    }

    /// Advance the idle wander by one tick. No motion while dragging or
    /// while every track is stopped.
    pub fn idle_step(&mut self, playback_active: bool) {
        if self.is_dragging() || !playback_active {
            return;
        }
        let radius = self.radius_walk.at(self.ticks);
        let angle = self.angle_walk.at(self.ticks);
        let raw = Vec2::new(radius * angle.cos(), radius * angle.sin()) + self.offset;
        self.point = constrain_to_disk(self.disk_radius, raw);
        self.ticks += 1;
    }
}

/// Maps control-point proximity to per-track attenuation and gain.
pub struct GainMapper {
    anchors: Vec<Vec2>,
    near: f32,
    far: f32,
    floor_db: f32,
    pub ramp_secs: f32,
}

impl GainMapper {
    /// Anchors sit at the inner radius, at the angular center of each
    /// track's band (angle 0 at 12 o'clock, clockwise positive).
    pub fn new(track_count: usize, layout: &RadialLayout, params: &GainMapParams) -> Self {
        let bands = BandScale::new(track_count);
        let anchors = (0..track_count)
            .map(|i| {
                let angle = bands.center(i);
                Vec2::new(
                    layout.inner_radius_px * angle.sin(),
                    -layout.inner_radius_px * angle.cos(),
                )
            })
            .collect();
        let control = layout.control_radius();
        Self {
            anchors,
            near: params.near_radius_factor * control,
            far: params.far_radius_factor * control,
            floor_db: params.floor_db,
            ramp_secs: params.ramp_secs,
        }
    }

    pub fn anchor(&self, track: usize) -> Vec2 {
        self.anchors[track]
    }

    /// Attenuation in [0, 1]: 0 at or inside the near threshold, 1 at or
    /// beyond the far threshold, linear between
    pub fn attenuation(&self, track: usize, point: Vec2) -> f32 {
        let distance = (self.anchors[track] - point).length();
        map_range(distance, self.near, self.far, 0.0, 1.0).clamp(0.0, 1.0)
    }

    /// Gain for the track (decibels): unity at zero attenuation, the
    /// configured floor at full attenuation
    pub fn gain_db(&self, track: usize, point: Vec2) -> f32 {
        self.attenuation(track, point) * self.floor_db
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn walk_params() -> NoiseWalkParams {
        NoiseWalkParams::default()
    }

    #[test]
    fn test_constrain_preserves_direction_clamps_magnitude() {
        let raw = Vec2::new(30.0, 40.0); // distance 50
        let clamped = constrain_to_disk(10.0, raw);

        assert_relative_eq!(clamped.length(), 10.0, epsilon = 1e-4);
        // Direction preserved: x:y ratio unchanged
        assert_relative_eq!(clamped.x / clamped.y, raw.x / raw.y, epsilon = 1e-5);

        // Inside the disk, untouched
        let inside = Vec2::new(3.0, 4.0);
        assert_eq!(constrain_to_disk(10.0, inside), inside);
    }

    #[test]
    fn test_noise_walk_is_deterministic_and_bounded() {
        let a = NoiseWalk::new(7, 0.0, 60.0, 0.01);
        let b = NoiseWalk::new(7, 0.0, 60.0, 0.01);
        let c = NoiseWalk::new(8, 0.0, 60.0, 0.01);

        let trajectory: Vec<f32> = (0..100).map(|t| a.at(t)).collect();
        assert!(trajectory.iter().all(|v| (0.0..=60.0).contains(v)));
        assert_eq!(trajectory, (0..100).map(|t| b.at(t)).collect::<Vec<_>>());
        assert_ne!(trajectory, (0..100).map(|t| c.at(t)).collect::<Vec<_>>());
    }

    #[test]
    fn test_idle_step_only_moves_while_playing_and_not_dragging() {
        let mut control = ControlState::new(&walk_params(), 60.0);

        control.idle_step(false);
        assert_eq!(control.point(), Vec2::ZERO);

        control.idle_step(true);
        let wandered = control.point();

        control.drag_start();
        control.idle_step(true);
        assert_eq!(control.point(), wandered);
    }

    #[test]
    fn test_drag_commits_net_displacement_into_offset() {
        let mut control = ControlState::new(&walk_params(), 60.0);

        control.idle_step(true);
        let before = control.point();

        control.drag_start();
        control.drag_move(Vec2::new(20.0, -10.0));
        control.drag_end();
        let displacement = control.point() - before;
        assert_relative_eq!(displacement.x, control.offset.x, epsilon = 1e-5);
        assert_relative_eq!(displacement.y, control.offset.y, epsilon = 1e-5);
    }

    #[test]
    fn test_drag_move_clamps_to_disk() {
        let mut control = ControlState::new(&walk_params(), 60.0);
        control.drag_start();
        control.drag_move(Vec2::new(100.0, 0.0));
        assert_relative_eq!(control.point().length(), 60.0, epsilon = 1e-4);
    }

    #[test]
    fn test_idle_point_always_inside_disk() {
        let mut control = ControlState::new(&walk_params(), 60.0);
        // Push the offset to the rim, then wander
        control.drag_start();
        control.drag_move(Vec2::new(60.0, 0.0));
        control.drag_end();
        for _ in 0..200 {
            control.idle_step(true);
            assert!(control.point().length() <= 60.0 + 1e-3);
        }
    }

    #[test]
    fn test_attenuation_thresholds_and_monotonicity() {
        let layout = RadialLayout::default();
        let mapper = GainMapper::new(4, &layout, &GainMapParams::default());
        let anchor = mapper.anchor(0);
        let control = layout.control_radius(); // 60

        // Walk straight away from the anchor through both thresholds
        let direction = Vec2::new(0.0, 1.0);
        let at = |d: f32| mapper.attenuation(0, anchor + direction * d);

        assert_eq!(at(0.0), 0.0);
        assert_eq!(at(2.0 * control), 0.0);
        assert_eq!(at(3.0 * control), 1.0);
        assert_eq!(at(5.0 * control), 1.0);

        let mut previous = 0.0;
        for step in 0..=30 {
            let d = 2.0 * control + step as f32 * control / 30.0;
            let a = at(d);
            assert!((0.0..=1.0).contains(&a));
            assert!(a >= previous);
            previous = a;
        }
    }

    #[test]
    fn test_gain_spans_unity_to_floor() {
        let layout = RadialLayout::default();
        let mapper = GainMapper::new(2, &layout, &GainMapParams::default());
        let anchor = mapper.anchor(1);

        assert_eq!(mapper.gain_db(1, anchor), 0.0);
        let far = anchor + Vec2::new(0.0, 10.0 * layout.control_radius());
        assert_relative_eq!(mapper.gain_db(1, far), -60.0);
    }

    #[test]
    fn test_anchors_sit_on_band_centers() {
        let layout = RadialLayout::default();
        let mapper = GainMapper::new(4, &layout, &GainMapParams::default());

        // Track 0's band spans [0, π/2]; its center (π/4) is up-right
        let anchor = mapper.anchor(0);
        assert!(anchor.x > 0.0 && anchor.y < 0.0);
        assert_relative_eq!(anchor.length(), layout.inner_radius_px, epsilon = 1e-3);
    }
}
