use serde::{Deserialize, Serialize};

use crate::error::PathError;
use crate::tire::{Vec3, EPSILON};

/// Ordered waypoints; travel direction is sequence order. Immutable once a
/// driver holds it (shared as `Arc<PathSpec>`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathSpec {
    waypoints: Vec<Vec3>,
    closed: bool,
}

#[inline]
fn planar(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

#[inline]
fn planar_dir(from: Vec3, to: Vec3) -> Option<Vec3> {
    let d = planar(to - from);
    let n = d.norm();
    if n > EPSILON { Some(d / n) } else { None }
}

impl PathSpec {
    pub fn new(waypoints: Vec<Vec3>, closed: bool) -> Self {
        Self { waypoints, closed }
    }

    /// Closed ellipse in the XZ plane, counter-clockwise seen from above.
    pub fn oval(center: Vec3, radius_x: f32, radius_z: f32, count: usize) -> Self {
        let waypoints = (0..count)
            .map(|i| {
                let t = i as f32 / count as f32 * std::f32::consts::TAU;
                center + Vec3::new(radius_x * t.cos(), 0.0, radius_z * t.sin())
            })
            .collect();
        Self { waypoints, closed: true }
    }

    pub fn validate(&self) -> Result<(), PathError> {
        if self.waypoints.is_empty() {
            return Err(PathError::Empty);
        }
        Ok(())
    }

    pub fn waypoints(&self) -> &[Vec3] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Full scan for the waypoint closest to `position` in the ground plane.
    pub fn nearest_index(&self, position: Vec3) -> Option<usize> {
        self.waypoints
            .iter()
            .enumerate()
            .map(|(i, w)| (i, planar(*w - position).norm_squared()))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    pub fn next_index(&self, index: usize) -> usize {
        let n = self.waypoints.len();
        if n == 0 {
            return 0;
        }
        if self.closed {
            (index + 1) % n
        } else {
            (index + 1).min(n - 1)
        }
    }

    pub fn prev_index(&self, index: usize) -> usize {
        let n = self.waypoints.len();
        if n == 0 {
            return 0;
        }
        match (index, self.closed) {
            (0, true) => n - 1,
            (0, false) => 0,
            (i, _) => (i - 1).min(n - 1),
        }
    }

    /// Radius of the circle through the waypoints before, at and after
    /// `index` (ground plane). None on straights, at open ends and for
    /// degenerate spacing.
    pub fn turn_radius(&self, index: usize) -> Option<f32> {
        if index >= self.waypoints.len() {
            return None;
        }
        let (prev, next) = (self.prev_index(index), self.next_index(index));
        if prev == index || next == index || prev == next {
            return None;
        }
        let a = planar(self.waypoints[prev]);
        let b = planar(self.waypoints[index]);
        let c = planar(self.waypoints[next]);

        let twice_area = (b - a).cross(&(c - a)).norm();
        if twice_area < EPSILON {
            return None;
        }
        let r = (b - a).norm() * (c - b).norm() * (a - c).norm() / (2.0 * twice_area);
        if r.is_finite() { Some(r) } else { None }
    }

    /// Planar length of the segment leaving `index` (zero at an open end).
    pub fn segment_length(&self, index: usize) -> f32 {
        let next = self.next_index(index);
        if index >= self.waypoints.len() || next == index {
            return 0.0;
        }
        planar(self.waypoints[next] - self.waypoints[index]).norm()
    }

    /// Direction of travel through `index`: the outgoing segment, or the
    /// incoming one at the end of an open path.
    pub fn direction_at(&self, index: usize) -> Option<Vec3> {
        let n = self.waypoints.len();
        if index >= n {
            return None;
        }
        let next = self.next_index(index);
        if next != index {
            return planar_dir(self.waypoints[index], self.waypoints[next]);
        }
        if index > 0 {
            return planar_dir(self.waypoints[index - 1], self.waypoints[index]);
        }
        None
    }

    /// Point `distance` beyond the waypoint after `index`, along the path
    /// direction there. Falls back to the waypoint itself when the direction
    /// is degenerate.
    pub fn lookahead_target(&self, index: usize, distance: f32) -> Option<Vec3> {
        if index >= self.waypoints.len() {
            return None;
        }
        let next = self.next_index(index);
        let anchor = self.waypoints[next];
        let dir = if next != index {
            planar_dir(self.waypoints[index], anchor)
        } else {
            self.direction_at(next)
        };
        Some(match dir {
            Some(d) => anchor + d * distance,
            None => anchor,
        })
    }

    fn segment_count(&self) -> usize {
        match (self.waypoints.len(), self.closed) {
            (0 | 1, _) => 0,
            (n, true) => n,
            (n, false) => n - 1,
        }
    }

    fn segment(&self, i: usize) -> (Vec3, Vec3) {
        let n = self.waypoints.len();
        (self.waypoints[i], self.waypoints[(i + 1) % n])
    }

    pub fn total_length(&self) -> f32 {
        (0..self.segment_count())
            .map(|i| {
                let (a, b) = self.segment(i);
                planar(b - a).norm()
            })
            .sum()
    }

    /// Position and travel direction at arc length `s` from the first
    /// waypoint. Wraps on closed paths, clamps on open ones.
    pub fn sample(&self, s: f32) -> Option<(Vec3, Vec3)> {
        let first = *self.waypoints.first()?;
        let total = self.total_length();
        let fallback_dir = self.direction_at(0).unwrap_or(Vec3::new(0.0, 0.0, 1.0));
        if total <= EPSILON {
            return Some((first, fallback_dir));
        }

        let mut s = if s.is_finite() { s } else { 0.0 };
        s = if self.closed { s.rem_euclid(total) } else { s.clamp(0.0, total) };

        for i in 0..self.segment_count() {
            let (a, b) = self.segment(i);
            let len = planar(b - a).norm();
            if len <= EPSILON {
                continue;
            }
            if s <= len {
                let dir = planar(b - a) / len;
                return Some((a + (b - a) * (s / len), dir));
            }
            s -= len;
        }

        let last = self.segment_count() - 1;
        let (a, b) = self.segment(last);
        Some((b, planar_dir(a, b).unwrap_or(fallback_dir)))
    }
}
