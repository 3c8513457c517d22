//! Keyframed property curves.
//!
//! Curves are pure data: evaluating one never mutates the resource that owns
//! it, so animated values are derived on demand from `(time, curves)`.

use anyhow::ensure;
use serde::Deserialize;

use crate::math::Vec3;

/// Serialized curve: `{"path": "location", "index": 2, "keyframes": [[t, v], ...]}`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CurveDesc {
    pub path: String,
    #[serde(default)]
    pub index: usize,
    pub keyframes: Vec<[f32; 2]>,
}

/// Serialized animation block, shared by actions and inline animation data.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct AnimationDesc {
    #[serde(default)]
    pub curves: Vec<CurveDesc>,
}

/// Piecewise linear curve over one scalar property component.
#[derive(Debug, Clone, PartialEq)]
pub struct FCurve {
    path: String,
    index: usize,
    keys: Vec<(f32, f32)>,
}

impl FCurve {
    pub fn from_desc(desc: CurveDesc) -> anyhow::Result<Self> {
        ensure!(
            !desc.keyframes.is_empty(),
            "curve {}[{}] has no keyframes",
            desc.path,
            desc.index
        );
        ensure!(
            desc.keyframes
                .iter()
                .all(|[t, v]| t.is_finite() && v.is_finite()),
            "curve {}[{}] has non-finite keyframes",
            desc.path,
            desc.index
        );
        let mut keys: Vec<(f32, f32)> = desc.keyframes.iter().map(|[t, v]| (*t, *v)).collect();
        keys.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(Self {
            path: desc.path,
            index: desc.index,
            keys,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Value at `time`; clamps to the first/last key outside the keyed range.
    pub fn evaluate(&self, time: f32) -> f32 {
        let first = self.keys[0];
        let last = self.keys[self.keys.len() - 1];
        if time <= first.0 {
            return first.1;
        }
        if time >= last.0 {
            return last.1;
        }
        let next = self.keys.partition_point(|(t, _)| *t <= time);
        let (t0, v0) = self.keys[next - 1];
        let (t1, v1) = self.keys[next];
        if t1 <= t0 {
            return v1;
        }
        v0 + (v1 - v0) * ((time - t0) / (t1 - t0))
    }

    /// Last keyed time.
    pub fn end_time(&self) -> f32 {
        self.keys[self.keys.len() - 1].0
    }
}

/// A set of curves targeting properties by path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Animation {
    curves: Vec<FCurve>,
}

impl Animation {
    pub fn from_desc(desc: AnimationDesc) -> anyhow::Result<Self> {
        let curves = desc
            .curves
            .into_iter()
            .map(FCurve::from_desc)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self { curves })
    }

    pub fn curves(&self) -> &[FCurve] {
        &self.curves
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    pub fn duration(&self) -> f32 {
        self.curves
            .iter()
            .map(FCurve::end_time)
            .fold(0.0, f32::max)
    }

    /// Overwrites `value` with the curve keyed on `(path, 0)`, if any.
    pub fn apply_scalar(&self, path: &str, time: f32, value: &mut f32) {
        for curve in self.curves.iter().filter(|c| c.path == path && c.index == 0) {
            *value = curve.evaluate(time);
        }
    }

    /// Overwrites the components of `value` keyed under `path`.
    pub fn apply_vec3(&self, path: &str, time: f32, value: &mut Vec3) {
        for curve in self.curves.iter().filter(|c| c.path == path) {
            value.set(curve.index, curve.evaluate(time));
        }
    }
}

/// Parses an optional inline animation block.
pub fn parse_optional(desc: Option<AnimationDesc>) -> anyhow::Result<Option<Animation>> {
    desc.map(Animation::from_desc).transpose()
}
