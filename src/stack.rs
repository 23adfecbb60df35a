//! Stack layout engine: converts independent per-key values at each
//! position into non-overlapping boundary intervals.
//!
//! The layout is a pure function of its inputs. Key order is the explicit
//! order passed by the caller (first-seen registration order), never an
//! ambient map iteration order, so z-order and color assignment stay stable
//! for the whole session.

use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;

/// Rule for converting raw per-key values into stacked boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetPolicy {
    /// Cumulative stacking from zero in key order
    #[default]
    None,
    /// Normalize each position so the topmost boundary is exactly 1;
    /// a zero-sum position yields all-zero boundaries
    Expand,
    /// Positive values stack upward from zero, negative values downward
    Diverging,
}

/// Boundary pair for one key at one position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerPoint {
    pub position: usize,
    pub lower: f32,
    pub upper: f32,
}

/// Ordered boundary sequence for one series key.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer<K> {
    pub key: K,
    pub points: Vec<LayerPoint>,
}

/// Compute stacked layers for `(position, key, value)` points.
///
/// `order` fixes both the stacking order and the output layer order. Keys
/// present in the points but absent from `order` are ignored; (position,
/// key) pairs missing from the points contribute value 0. Duplicate pairs
/// resolve last-one-in-wins.
pub fn stack_layout<K>(
    points: &[(usize, K, f32)],
    order: &[K],
    policy: OffsetPolicy,
) -> Vec<Layer<K>>
where
    K: Clone + Eq + Hash,
{
    let mut positions = BTreeSet::new();
    let mut values: HashMap<(usize, &K), f32> = HashMap::new();
    for (position, key, value) in points {
        positions.insert(*position);
        values.insert((*position, key), *value);
    }

    let mut layers: Vec<Layer<K>> = order
        .iter()
        .map(|key| Layer {
            key: key.clone(),
            points: Vec::with_capacity(positions.len()),
        })
        .collect();

    for &position in &positions {
        let column: Vec<f32> = order
            .iter()
            .map(|key| values.get(&(position, key)).copied().unwrap_or(0.0))
            .collect();

        let bounds = match policy {
            OffsetPolicy::None => offset_none(&column),
            OffsetPolicy::Expand => offset_expand(&column),
            OffsetPolicy::Diverging => offset_diverging(&column),
        };

        for (layer, (lower, upper)) in layers.iter_mut().zip(bounds) {
            layer.points.push(LayerPoint {
                position,
                lower,
                upper,
            });
        }
    }

    layers
}

fn offset_none(column: &[f32]) -> Vec<(f32, f32)> {
    let mut acc = 0.0;
    column
        .iter()
        .map(|&v| {
            let lower = acc;
            acc += v;
            (lower, acc)
        })
        .collect()
}

fn offset_expand(column: &[f32]) -> Vec<(f32, f32)> {
    let stacked = offset_none(column);
    let total: f32 = column.iter().sum();
    if total == 0.0 {
        return vec![(0.0, 0.0); column.len()];
    }
    stacked
        .into_iter()
        .map(|(lower, upper)| (lower / total, upper / total))
        .collect()
}

fn offset_diverging(column: &[f32]) -> Vec<(f32, f32)> {
    let mut above = 0.0;
    let mut below = 0.0;
    column
        .iter()
        .map(|&v| {
            if v >= 0.0 {
                let lower = above;
                above += v;
                (lower, above)
            } else {
                let upper = below;
                below += v;
                (below, upper)
            }
        })
        .collect()
}
