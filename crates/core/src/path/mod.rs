use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{FlythroughError, Result};

const MIN_DISTINCT_POINTS: usize = 3;
const ARC_LENGTH_DIVISIONS: usize = 200;
const CLOSE_EPSILON: f32 = 1e-5;
/// Knot spacing below this is treated as coincident points.
const MIN_KNOT_SPACING: f32 = 1e-4;

/// A single path vertex on the ground plane. Serialised as `[x, z]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 2]", into = "[f32; 2]")]
pub struct ControlPoint {
    pub x: f32,
    pub z: f32,
}

impl ControlPoint {
    pub const fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x, 0.0, self.z)
    }
}

impl From<[f32; 2]> for ControlPoint {
    fn from([x, z]: [f32; 2]) -> Self {
        Self { x, z }
    }
}

impl From<ControlPoint> for [f32; 2] {
    fn from(point: ControlPoint) -> Self {
        [point.x, point.z]
    }
}

/// Closed centripetal Catmull-Rom curve, sampled by arc length.
///
/// The curve is immutable once built. [`PathCurve::point_at`] takes a
/// normalised distance along the loop in `[0, 1]`; callers that may hold
/// values outside that range use [`PathCurve::point_at_wrapped`].
#[derive(Debug, Clone)]
pub struct PathCurve {
    knots: Vec<Vec3>,
    arc_lengths: Vec<f32>,
}

impl PathCurve {
    /// Builds the curve from a closed control point list (first point repeated
    /// as the last one).
    pub fn new(control_points: &[ControlPoint]) -> Result<Self> {
        if let Some(index) = control_points
            .iter()
            .position(|p| !p.x.is_finite() || !p.z.is_finite())
        {
            return Err(FlythroughError::NonFiniteControlPoint { index });
        }

        let distinct = count_distinct(control_points);
        if distinct < MIN_DISTINCT_POINTS {
            return Err(FlythroughError::DegenerateCurve {
                found: distinct,
                required: MIN_DISTINCT_POINTS,
            });
        }

        let (Some(first), Some(last)) = (control_points.first(), control_points.last()) else {
            return Err(FlythroughError::OpenCurve);
        };
        if first.to_vec3().distance(last.to_vec3()) > CLOSE_EPSILON {
            return Err(FlythroughError::OpenCurve);
        }

        let knots: Vec<Vec3> = control_points[..control_points.len() - 1]
            .iter()
            .map(|p| p.to_vec3())
            .collect();

        let mut curve = Self {
            knots,
            arc_lengths: Vec::with_capacity(ARC_LENGTH_DIVISIONS + 1),
        };
        curve.arc_lengths = curve.tabulate_arc_lengths();
        Ok(curve)
    }

    /// Samples the point at normalised distance `t`. Values outside `[0, 1]`
    /// are clamped; the curve does not wrap on its own.
    pub fn point_at(&self, t: f64) -> Vec3 {
        let t = t.clamp(0.0, 1.0) as f32;
        self.point_at_parameter(self.parameter_for_distance(t))
    }

    /// Samples at `t mod 1`, so any real value lands on the loop.
    pub fn point_at_wrapped(&self, t: f64) -> Vec3 {
        self.point_at(t.rem_euclid(1.0))
    }

    /// Approximate arc length of the whole loop.
    pub fn length(&self) -> f32 {
        self.arc_lengths.last().copied().unwrap_or(0.0)
    }

    /// The distinct knots the curve passes through, closing repeat removed.
    pub fn knots(&self) -> &[Vec3] {
        &self.knots
    }

    fn tabulate_arc_lengths(&self) -> Vec<f32> {
        let mut lengths = Vec::with_capacity(ARC_LENGTH_DIVISIONS + 1);
        let mut previous = self.point_at_parameter(0.0);
        let mut total = 0.0;
        lengths.push(total);

        for step in 1..=ARC_LENGTH_DIVISIONS {
            let current = self.point_at_parameter(step as f32 / ARC_LENGTH_DIVISIONS as f32);
            total += current.distance(previous);
            lengths.push(total);
            previous = current;
        }

        lengths
    }

    /// Maps a normalised distance onto the spline's own parameter.
    fn parameter_for_distance(&self, t: f32) -> f32 {
        let last = self.arc_lengths.len() - 1;
        let target = t * self.length();

        let upper = self.arc_lengths.partition_point(|&len| len <= target);
        let index = upper.saturating_sub(1);
        if index >= last {
            return 1.0;
        }

        let before = self.arc_lengths[index];
        let segment = self.arc_lengths[index + 1] - before;
        let fraction = if segment > 0.0 {
            (target - before) / segment
        } else {
            0.0
        };

        (index as f32 + fraction) / last as f32
    }

    fn point_at_parameter(&self, u: f32) -> Vec3 {
        let count = self.knots.len() as isize;
        let scaled = u * count as f32;
        let segment = scaled.floor();
        let weight = scaled - segment;
        let segment = segment as isize;

        let knot = |offset: isize| self.knots[(segment + offset).rem_euclid(count) as usize];
        centripetal(knot(-1), knot(0), knot(1), knot(2), weight)
    }
}

fn count_distinct(points: &[ControlPoint]) -> usize {
    let mut seen: Vec<Vec3> = Vec::with_capacity(points.len());
    for point in points.iter().map(|p| p.to_vec3()) {
        if !seen.iter().any(|other| other.distance(point) <= CLOSE_EPSILON) {
            seen.push(point);
        }
    }
    seen.len()
}

/// Centripetal Catmull-Rom between `p1` and `p2`, using the knot spacing
/// `|p_{i+1} - p_i|^0.5`.
fn centripetal(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, weight: f32) -> Vec3 {
    let mut dt0 = p0.distance_squared(p1).powf(0.25);
    let mut dt1 = p1.distance_squared(p2).powf(0.25);
    let mut dt2 = p2.distance_squared(p3).powf(0.25);

    if dt1 < MIN_KNOT_SPACING {
        dt1 = 1.0;
    }
    if dt0 < MIN_KNOT_SPACING {
        dt0 = dt1;
    }
    if dt2 < MIN_KNOT_SPACING {
        dt2 = dt1;
    }

    let tangent1 = ((p1 - p0) / dt0 - (p2 - p0) / (dt0 + dt1) + (p2 - p1) / dt1) * dt1;
    let tangent2 = ((p2 - p1) / dt1 - (p3 - p1) / (dt1 + dt2) + (p3 - p2) / dt2) * dt1;

    hermite(p1, p2, tangent1, tangent2, weight)
}

fn hermite(x0: Vec3, x1: Vec3, t0: Vec3, t1: Vec3, w: f32) -> Vec3 {
    let c2 = x0 * -3.0 + x1 * 3.0 - t0 * 2.0 - t1;
    let c3 = x0 * 2.0 - x1 * 2.0 + t0 + t1;
    let w2 = w * w;
    x0 + t0 * w + c2 * w2 + c3 * (w2 * w)
}
