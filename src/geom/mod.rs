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

//! Convex polygon classification, splitting and T-vertex repair (§4.A).
//!
//! A [`Polygon`] is an ordered ring of 3D vertices lying (up to tolerance)
//! in a single plane, carrying an identifier tag that survives splitting so
//! fragments can be traced back to their source.

mod tvertex;

pub use self::tvertex::remove_t_vertices;

use crate::math::{Plane, PlaneSide, Tolerances};

use cgmath::{InnerSpace, Vector3};

/// How a polygon classifies against a plane (§4.A).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PolyClass {
    /// Coplanar with matching orientation.
    On,
    /// Coplanar with opposite orientation.
    OnFlipped,
    Front,
    Back,
    Spanning,
}

/// A planar, convex polygon: an ordered vertex ring plus cached plane and
/// identifier tag. The tag is inherited by every fragment produced by
/// [`split`].
#[derive(Clone, Debug)]
pub struct Polygon {
    vertices: Vec<Vector3<f32>>,
    plane: Plane,
    tag: u32,
}

impl Polygon {
    /// Builds a polygon from a vertex ring, computing its plane from the
    /// first three vertices. `vertices.len()` must be at least 3.
    pub fn new(vertices: Vec<Vector3<f32>>, tag: u32) -> Polygon {
        assert!(vertices.len() >= 3, "a polygon needs at least 3 vertices");
        let plane = Plane::from_points(vertices[0], vertices[1], vertices[2]);
        Polygon {
            vertices,
            plane,
            tag,
        }
    }

    pub fn with_plane(vertices: Vec<Vector3<f32>>, plane: Plane, tag: u32) -> Polygon {
        assert!(vertices.len() >= 3, "a polygon needs at least 3 vertices");
        Polygon {
            vertices,
            plane,
            tag,
        }
    }

    pub fn vertices(&self) -> &[Vector3<f32>] {
        &self.vertices
    }

    pub fn vertices_mut(&mut self) -> &mut Vec<Vector3<f32>> {
        &mut self.vertices
    }

    pub fn plane(&self) -> &Plane {
        &self.plane
    }

    pub fn normal(&self) -> Vector3<f32> {
        self.plane.normal()
    }

    pub fn tag(&self) -> u32 {
        self.tag
    }

    /// Reverses vertex order and flips the cached plane, producing the
    /// polygon's geometric complement. Used by BSP3 difference, which is
    /// implemented as intersection with the complement (§4.C).
    pub fn flipped(&self) -> Polygon {
        let mut vertices = self.vertices.clone();
        vertices.reverse();
        Polygon {
            vertices,
            plane: -self.plane,
            tag: self.tag,
        }
    }

    /// Classifies this polygon against `plane` per §4.A: tracks the min/max
    /// signed distance across all vertices and applies the ON / ON_FLIPPED /
    /// FRONT / BACK / SPANNING rules.
    pub fn classify(&self, plane: &Plane, epsilon: f32) -> PolyClass {
        if self.plane.approx_coincident(plane, epsilon) {
            return PolyClass::On;
        }
        if self.plane.approx_flipped(plane, epsilon) {
            return PolyClass::OnFlipped;
        }

        let mut min_dist = f32::INFINITY;
        let mut max_dist = f32::NEG_INFINITY;
        for v in &self.vertices {
            let d = plane.point_dist(*v);
            min_dist = min_dist.min(d);
            max_dist = max_dist.max(d);
        }

        if min_dist > -epsilon {
            PolyClass::Front
        } else if max_dist < epsilon {
            PolyClass::Back
        } else {
            PolyClass::Spanning
        }
    }

    /// Splits a SPANNING polygon by `plane`, returning `(front, back)`
    /// fragments. Fragments with fewer than 3 vertices are discarded
    /// (returned as `None`) per the "Failure semantics" of §4.C: a
    /// degenerate split is silently dropped rather than erroring.
    ///
    /// Both fragments inherit this polygon's tag and the splitting plane's
    /// orientation relative to their own original plane is *not* altered —
    /// each retains `self.plane`.
    pub fn split(&self, plane: &Plane, epsilon: f32) -> (Option<Polygon>, Option<Polygon>) {
        let mut front = Vec::new();
        let mut back = Vec::new();

        let n = self.vertices.len();
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];

            let da = plane.point_dist(a);
            let db = plane.point_dist(b);

            let a_on = da.abs() <= epsilon;
            let b_on = db.abs() <= epsilon;

            if a_on {
                front.push(a);
                back.push(a);
            } else if da > epsilon {
                front.push(a);
            } else {
                back.push(a);
            }

            if b_on {
                // b will be appended to both sides below via its own
                // iteration, but we still need to record the crossing so the
                // loop that processes edge (a, b) terminates correctly when
                // the edge itself lies partially on the plane.
                continue;
            }

            // if a and b strictly straddle the plane, compute & append the
            // intersection point to both fragments.
            if !a_on && (da > epsilon) != (db > epsilon) {
                let denom = plane.normal().dot(b - a);
                if denom.abs() > 1e-12 {
                    let t = -da / denom;
                    let ix = a + t * (b - a);
                    front.push(ix);
                    back.push(ix);
                }
            }
        }

        let front_poly = if front.len() >= 3 {
            Some(Polygon::with_plane(front, self.plane, self.tag))
        } else {
            None
        };
        let back_poly = if back.len() >= 3 {
            Some(Polygon::with_plane(back, self.plane, self.tag))
        } else {
            None
        };

        (front_poly, back_poly)
    }

    /// Convenience wrapper combining [`classify`](Polygon::classify) and
    /// [`split`](Polygon::split): returns the polygon as front/back/both
    /// depending on its classification, splitting only if SPANNING.
    pub fn split_by_class(
        &self,
        plane: &Plane,
        tol: &Tolerances,
    ) -> SplitResult {
        match self.classify(plane, tol.epsilon) {
            PolyClass::On | PolyClass::OnFlipped => SplitResult::Coplanar,
            PolyClass::Front => SplitResult::Front(self.clone()),
            PolyClass::Back => SplitResult::Back(self.clone()),
            PolyClass::Spanning => {
                let (f, b) = self.split(plane, tol.epsilon);
                SplitResult::Spanning(f, b)
            }
        }
    }

    pub fn side_of(&self, plane: &Plane, epsilon: f32) -> PlaneSide {
        plane.classify_point(self.centroid(), epsilon)
    }

    pub fn centroid(&self) -> Vector3<f32> {
        let sum: Vector3<f32> = self.vertices.iter().fold(Vector3::new(0.0, 0.0, 0.0), |a, b| a + *b);
        sum / self.vertices.len() as f32
    }
}

/// Result of classifying + conditionally splitting a polygon against a
/// plane in one step.
pub enum SplitResult {
    Coplanar,
    Front(Polygon),
    Back(Polygon),
    Spanning(Option<Polygon>, Option<Polygon>),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(z: f32) -> Polygon {
        Polygon::new(
            vec![
                Vector3::new(-1.0, -1.0, z),
                Vector3::new(1.0, -1.0, z),
                Vector3::new(1.0, 1.0, z),
                Vector3::new(-1.0, 1.0, z),
            ],
            1,
        )
    }

    #[test]
    fn classify_on_and_flipped() {
        let p = square(0.0);
        let plane = Plane::new(Vector3::unit_z(), 0.0);
        assert_eq!(p.classify(&plane, 1e-4), PolyClass::On);

        let flipped_plane = Plane::new(-Vector3::unit_z(), 0.0);
        assert_eq!(p.classify(&flipped_plane, 1e-4), PolyClass::OnFlipped);
    }

    #[test]
    fn classify_front_back() {
        let p = square(1.0);
        let plane = Plane::new(Vector3::unit_z(), 0.0);
        assert_eq!(p.classify(&plane, 1e-4), PolyClass::Front);

        let p2 = square(-1.0);
        assert_eq!(p2.classify(&plane, 1e-4), PolyClass::Back);
    }

    #[test]
    fn classify_spanning_and_split() {
        let cube_side = Polygon::new(
            vec![
                Vector3::new(0.0, -1.0, -1.0),
                Vector3::new(0.0, 1.0, -1.0),
                Vector3::new(0.0, 1.0, 1.0),
                Vector3::new(0.0, -1.0, 1.0),
            ],
            2,
        );
        let plane = Plane::new(Vector3::unit_z(), 0.0);
        assert_eq!(cube_side.classify(&plane, 1e-4), PolyClass::Spanning);

        let (front, back) = cube_side.split(&plane, 1e-4);
        let front = front.expect("front fragment");
        let back = back.expect("back fragment");
        assert!(front.vertices().len() >= 3);
        assert!(back.vertices().len() >= 3);
        for v in front.vertices() {
            assert!(v.z >= -1e-4);
        }
        for v in back.vertices() {
            assert!(v.z <= 1e-4);
        }
    }

    #[test]
    fn flipped_reverses_winding_and_plane() {
        let p = square(0.0);
        let f = p.flipped();
        assert_eq!(f.vertices().len(), p.vertices().len());
        assert!(f.normal().dot(p.normal()) < 0.0);
    }
}
