// Copyright © 2018 Cormac O'Brien
//
// Permission is hereby granted, free of charge, to any person obtaining a copy of this software
// and associated documentation files (the "Software"), to deal in the Software without
// restriction, including without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all copies or
// substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING
// BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
// DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use std::ops::Neg;

use cgmath::{InnerSpace, Vector3, Zero};

/// Which side of a [`Plane`] a point falls on. A point exactly on the plane
/// (within the caller's epsilon) is conventionally `Front`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlaneSide {
    Front,
    Back,
}

impl Neg for PlaneSide {
    type Output = PlaneSide;

    fn neg(self) -> Self::Output {
        match self {
            PlaneSide::Front => PlaneSide::Back,
            PlaneSide::Back => PlaneSide::Front,
        }
    }
}

/// A plane in point-normal form: the set of points `p` satisfying
/// `n . p + d == 0`. `n` is always unit length.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    normal: Vector3<f32>,
    dist: f32,
}

impl Neg for Plane {
    type Output = Plane;

    fn neg(self) -> Self::Output {
        Plane {
            normal: -self.normal,
            dist: -self.dist,
        }
    }
}

impl Plane {
    /// Builds a plane from an (already or not yet normalized) normal and a
    /// signed distance such that `n . p + d == 0` on the plane.
    pub fn new(normal: Vector3<f32>, dist: f32) -> Plane {
        Plane {
            normal: normal.normalize(),
            dist,
        }
    }

    /// Builds the plane containing three non-collinear points, with the
    /// normal given by the right-hand rule around `a -> b -> c`.
    pub fn from_points(a: Vector3<f32>, b: Vector3<f32>, c: Vector3<f32>) -> Plane {
        let normal = (b - a).cross(c - a).normalize();
        let dist = -normal.dot(a);
        Plane { normal, dist }
    }

    pub fn normal(&self) -> Vector3<f32> {
        self.normal
    }

    pub fn dist(&self) -> f32 {
        self.dist
    }

    /// Signed distance from `point` to the plane: positive in front.
    pub fn point_dist(&self, point: Vector3<f32>) -> f32 {
        self.normal.dot(point) + self.dist
    }

    /// Classifies `point` relative to the plane using `epsilon` as the
    /// zero band (points within `epsilon` of the plane are `Front`, matching
    /// the convention used by BSP3 classification in §4.A/§4.C).
    pub fn classify_point(&self, point: Vector3<f32>, epsilon: f32) -> PlaneSide {
        if self.point_dist(point) >= -epsilon {
            PlaneSide::Front
        } else {
            PlaneSide::Back
        }
    }

    /// Two planes are the same plane (not flipped) if their normals agree
    /// and their distances agree, within `epsilon`.
    pub fn approx_coincident(&self, other: &Plane, epsilon: f32) -> bool {
        self.normal.dot(other.normal) > 1.0 - epsilon && (self.dist - other.dist).abs() < epsilon
    }

    /// The same plane but with the opposite orientation (same geometric
    /// plane, normal reversed).
    pub fn approx_flipped(&self, other: &Plane, epsilon: f32) -> bool {
        self.normal.dot(other.normal) < -(1.0 - epsilon) && (self.dist + other.dist).abs() < epsilon
    }

    /// Intersects the line segment `start..end` with this plane.
    pub fn line_segment_intersection(
        &self,
        start: Vector3<f32>,
        end: Vector3<f32>,
    ) -> LinePlaneIntersect {
        let start_dist = self.point_dist(start);
        let end_dist = self.point_dist(end);

        let start_side = side_from_dist(start_dist);
        let end_side = side_from_dist(end_dist);

        if start_side == end_side {
            return LinePlaneIntersect::NoIntersection(start_side);
        }

        let ratio = start_dist / (start_dist - end_dist);
        let point = start + ratio * (end - start);

        LinePlaneIntersect::PointIntersection(PointIntersection {
            ratio,
            point,
            plane: *self,
        })
    }
}

fn side_from_dist(dist: f32) -> PlaneSide {
    if dist >= 0.0 {
        PlaneSide::Front
    } else {
        PlaneSide::Back
    }
}

/// The intersection of a line segment with a [`Plane`] at a single point.
#[derive(Debug, Clone, Copy)]
pub struct PointIntersection {
    ratio: f32,
    point: Vector3<f32>,
    plane: Plane,
}

impl PointIntersection {
    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    pub fn point(&self) -> Vector3<f32> {
        self.point
    }

    pub fn plane(&self) -> &Plane {
        &self.plane
    }
}

/// The intersection of a line segment with a plane: either it never
/// crosses (both ends on the same side) or it crosses at one point.
#[derive(Debug, Clone, Copy)]
pub enum LinePlaneIntersect {
    NoIntersection(PlaneSide),
    PointIntersection(PointIntersection),
}

impl Default for Plane {
    fn default() -> Self {
        Plane {
            normal: Vector3::unit_z(),
            dist: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_side_basic() {
        let plane = Plane::new(Vector3::unit_x(), -1.0);
        assert_eq!(
            plane.classify_point(Vector3::unit_x() * 2.0, 1e-4),
            PlaneSide::Front
        );
        assert_eq!(
            plane.classify_point(Vector3::zero(), 1e-4),
            PlaneSide::Back
        );
    }

    #[test]
    fn segment_intersection_midpoint() {
        let plane = Plane::new(Vector3::unit_x(), -1.0);
        let start = Vector3::new(0.0, 0.5, 0.5);
        let end = Vector3::new(2.0, 0.5, 0.5);
        match plane.line_segment_intersection(start, end) {
            LinePlaneIntersect::PointIntersection(pi) => {
                assert!((pi.ratio() - 0.5).abs() < 1e-6);
                assert!((pi.point() - Vector3::new(1.0, 0.5, 0.5)).magnitude() < 1e-6);
            }
            _ => panic!("expected an intersection"),
        }
    }

    #[test]
    fn coincident_vs_flipped() {
        let a = Plane::new(Vector3::unit_z(), -1.0);
        let b = Plane::new(Vector3::unit_z(), -1.0);
        let c = Plane::new(-Vector3::unit_z(), 1.0);
        assert!(a.approx_coincident(&b, 1e-5));
        assert!(a.approx_flipped(&c, 1e-5));
        assert!(!a.approx_coincident(&c, 1e-5));
    }
}
