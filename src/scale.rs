//! Continuous and discrete mappings from data space to screen space.
//!
//! Scales are cheap value types recomputed every tick from the current data
//! extent; nothing here caches across frames.

/// Extent (min, max) of the finite values in an iterator.
///
/// Non-finite values (silent spectrum bins read as -inf) are ignored, so a
/// handful of dead bins cannot collapse a whole frame's value scale.
pub fn extent(values: impl Iterator<Item = f32>) -> Option<(f32, f32)> {
    let mut result: Option<(f32, f32)> = None;
    for v in values {
        if !v.is_finite() {
            continue;
        }
        result = Some(match result {
            None => (v, v),
            Some((lo, hi)) => (lo.min(v), hi.max(v)),
        });
    }
    result
}

/// Linear map between a data domain and a pixel range.
#[derive(Debug, Clone, Copy)]
pub struct LinearScale {
    domain: (f32, f32),
    range: (f32, f32),
}

impl LinearScale {
    pub fn new(domain: (f32, f32), range: (f32, f32)) -> Self {
        Self { domain, range }
    }

    /// Normalized position of `x` in the domain; a degenerate (zero-width)
    /// domain maps everything to the midpoint
    fn normalize(&self, x: f32) -> f32 {
        let (d0, d1) = self.domain;
        if d1 == d0 {
            0.5
        } else {
            (x - d0) / (d1 - d0)
        }
    }

    pub fn map(&self, x: f32) -> f32 {
        let (r0, r1) = self.range;
        r0 + self.normalize(x) * (r1 - r0)
    }

    /// Map with the output pinned inside the range
    pub fn map_clamped(&self, x: f32) -> f32 {
        let (r0, r1) = self.range;
        let t = self.normalize(x).clamp(0.0, 1.0);
        r0 + t * (r1 - r0)
    }
}

/// Radial value scale: interpolates in squared-radius space so that equal
/// data differences cover equal annular area rather than equal radius.
#[derive(Debug, Clone, Copy)]
pub struct RadialScale {
    domain: (f32, f32),
    range: (f32, f32),
}

fn signed_square(x: f32) -> f32 {
    x.signum() * x * x
}

fn signed_sqrt(x: f32) -> f32 {
    x.signum() * x.abs().sqrt()
}

impl RadialScale {
    pub fn new(domain: (f32, f32), range: (f32, f32)) -> Self {
        Self { domain, range }
    }

    pub fn map(&self, x: f32) -> f32 {
        let (d0, d1) = self.domain;
        let t = if d1 == d0 { 0.5 } else { (x - d0) / (d1 - d0) };
        let (s0, s1) = (signed_square(self.range.0), signed_square(self.range.1));
        signed_sqrt(s0 + t * (s1 - s0))
    }
}

/// Full-turn band scale: one equal angular band per discrete index,
/// aligned at angle zero (12 o'clock, clockwise positive).
#[derive(Debug, Clone, Copy)]
pub struct BandScale {
    count: usize,
}

impl BandScale {
    pub fn new(count: usize) -> Self {
        Self { count }
    }

    pub fn bandwidth(&self) -> f32 {
        if self.count == 0 {
            0.0
        } else {
            std::f32::consts::TAU / self.count as f32
        }
    }

    /// Start angle of band `i` (radians)
    pub fn start(&self, i: usize) -> f32 {
        i as f32 * self.bandwidth()
    }

    /// Angular center of band `i` (radians)
    pub fn center(&self, i: usize) -> f32 {
        self.start(i) + self.bandwidth() / 2.0
    }
}

/// 8-bit RGB color with linear interpolation and hex formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn lerp(self, other: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Fixed categorical palette for small, stable sets of series identities
/// (one color per track in waveform mode).
pub const CATEGORICAL: [Rgb; 10] = [
    Rgb::new(0x42, 0x69, 0xd0), // blue
    Rgb::new(0xef, 0xb1, 0x18), // yellow
    Rgb::new(0xff, 0x72, 0x5c), // coral
    Rgb::new(0x6c, 0xc5, 0xb0), // teal
    Rgb::new(0x3c, 0xa9, 0x51), // green
    Rgb::new(0xff, 0x8a, 0xb7), // pink
    Rgb::new(0xa4, 0x63, 0xf2), // purple
    Rgb::new(0x97, 0xbb, 0xf5), // light blue
    Rgb::new(0x9c, 0x6b, 0x4e), // brown
    Rgb::new(0x94, 0x98, 0xa0), // gray
];

/// Stops sampled from the "cool" perceptual scheme (violet → cyan → lime),
/// interpolated piecewise for numerous/ephemeral series identities.
pub const COOL_STOPS: [Rgb; 5] = [
    Rgb::new(0x6e, 0x40, 0xaa),
    Rgb::new(0x41, 0x7d, 0xe0),
    Rgb::new(0x1a, 0xc7, 0xc2),
    Rgb::new(0x52, 0xf6, 0x67),
    Rgb::new(0xaf, 0xf0, 0x5b),
];

/// Two-color radial palette: gold for the active/drag accents, pine for the
/// rest state and the second arc level.
pub const RADIAL_GOLD: Rgb = Rgb::new(0xda, 0xb5, 0x5d);
pub const RADIAL_PINE: Rgb = Rgb::new(0x3a, 0x70, 0x5a);

/// Continuous color ramp over a fixed set of stops.
#[derive(Debug, Clone, Copy)]
pub struct GradientScale {
    stops: &'static [Rgb],
}

impl GradientScale {
    pub fn cool() -> Self {
        Self { stops: &COOL_STOPS }
    }

    /// Color at normalized position `t` in [0, 1]
    pub fn at(&self, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let segments = self.stops.len() - 1;
        let scaled = t * segments as f32;
        let i = (scaled.floor() as usize).min(segments - 1);
        self.stops[i].lerp(self.stops[i + 1], scaled - i as f32)
    }
}

/// One gradient color per track at normalized rank (i + 1) / (n + 1), so
/// the scheme's extremes are never assigned.
pub fn track_gradient(track_count: usize) -> Vec<Rgb> {
    let ramp = GradientScale::cool();
    (0..track_count)
        .map(|i| ramp.at((i + 1) as f32 / (track_count + 1) as f32))
        .collect()
}

/// Color for track `i`'s waveform ring: linear blend from gold to pine by
/// track rank.
pub fn ring_color(track: usize, track_count: usize) -> Rgb {
    let t = if track_count == 0 {
        0.0
    } else {
        track as f32 / track_count as f32
    };
    RADIAL_GOLD.lerp(RADIAL_PINE, t)
}
