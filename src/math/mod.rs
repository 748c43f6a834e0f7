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

//! Geometry primitives shared by every other module in the crate.
//!
//! Vectors, matrices and quaternions are not reimplemented here; we lean on
//! `cgmath` for those, the way the rest of the crate's numeric code always
//! has. What this module adds on top is the plane representation used
//! throughout the BSP and block-graph code, an axis-aligned box, and a
//! handful of tolerance-aware scalar helpers.

mod aabb;
mod plane;
mod tolerance;

pub use self::aabb::Aabb;
pub use self::plane::{LinePlaneIntersect, Plane, PlaneSide, PointIntersection};
pub use self::tolerance::Tolerances;

pub use cgmath::{
    InnerSpace, Matrix3, Matrix4, Quaternion, SquareMatrix, Vector2, Vector3, Vector4, Zero,
};

use std::cmp::Ordering;

/// Maximum allowed deviation (as a dot product of normalized directions)
/// between consecutive edge directions for them to be considered collinear.
///
/// See https://github.com/id-Software/Quake/blob/master/WinQuake/gl_rsurf.c#L1544
/// for the original engine's equivalent constant; we keep the name the
/// teacher gave it.
pub const COLLINEAR_EPSILON: f32 = 1e-5;

/// Determines whether every direction change between consecutive points in
/// `vs` is within [`COLLINEAR_EPSILON`] of the first.
///
/// Special cases:
/// - If `vs.len() < 2`, always returns `false`.
/// - If `vs.len() == 2`, always returns `true`.
pub fn collinear(vs: &[Vector3<f32>]) -> bool {
    match vs.len() {
        l if l < 2 => false,
        2 => true,
        _ => {
            let init = (vs[1] - vs[0]).normalize();
            for i in 2..vs.len() {
                let dir = (vs[i] - vs[i - 1]).normalize();
                if dir.dot(init) < 1.0 - COLLINEAR_EPSILON {
                    return false;
                }
            }
            true
        }
    }
}

/// Collapses consecutive collinear points in a closed polygon ring,
/// preserving winding order. Used by the reducer's retrace step (§4.C of
/// the spec) to merge edges whose normalized directions agree within
/// [`COLLINEAR_EPSILON`].
pub fn remove_collinear(vs: Vec<Vector3<f32>>) -> Vec<Vector3<f32>> {
    if vs.len() < 3 {
        return vs;
    }

    let mut out = Vec::with_capacity(vs.len());
    let mut it = vs.into_iter().cycle();
    let v_init = it.next().unwrap();
    let mut v1 = v_init;
    let mut v2 = it.next().unwrap();
    out.push(v1);

    for v3 in it {
        if !collinear(&[v1, v2, v3]) {
            out.push(v2);
        }

        if v3 == v_init {
            break;
        }

        v1 = v2;
        v2 = v3;
    }

    out
}

/// Computes the axis-aligned bounding box of a point set.
pub fn bounds<'a, I>(points: I) -> (Vector3<f32>, Vector3<f32>)
where
    I: IntoIterator<Item = &'a Vector3<f32>>,
{
    let mut min = Vector3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY);
    let mut max = Vector3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY);
    for p in points.into_iter() {
        for c in 0..3 {
            min[c] = p[c].min(min[c]);
            max[c] = p[c].max(max[c]);
        }
    }
    (min, max)
}

/// Two points are "the same vertex" iff every component differs by less than
/// `precision`. Used by the reducer's vertex-dedup pass and by T-vertex
/// reconstruction.
pub fn approx_eq(a: Vector3<f32>, b: Vector3<f32>, precision: f32) -> bool {
    (a.x - b.x).abs() < precision && (a.y - b.y).abs() < precision && (a.z - b.z).abs() < precision
}

/// Orders two scalars, treating NaN as greater than everything (never
/// produced by this crate's geometry, but keeps sort calls infallible).
pub fn total_cmp_f32(a: &f32, b: &f32) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collinear_rejects_bend() {
        let pts = [Vector3::unit_x(), Vector3::unit_y(), Vector3::unit_z()];
        assert!(!collinear(&pts));
    }

    #[test]
    fn collinear_accepts_straight_run() {
        let pts = [
            Vector3::unit_x(),
            Vector3::unit_x() * 2.0,
            Vector3::unit_x() * 3.0,
        ];
        assert!(collinear(&pts));
    }

    #[test]
    fn remove_collinear_merges_straight_edges() {
        let input: Vec<Vector3<f32>> = vec![
            [0.0, 0.0, 0.0].into(),
            [1.0, 0.0, 0.0].into(),
            [2.0, 0.0, 0.0].into(),
            [2.0, 1.0, 0.0].into(),
            [2.0, 2.0, 0.0].into(),
            [0.0, 2.0, 0.0].into(),
        ];
        let out = remove_collinear(input);
        assert_eq!(
            out,
            vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(2.0, 0.0, 0.0),
                Vector3::new(2.0, 2.0, 0.0),
                Vector3::new(0.0, 2.0, 0.0),
            ]
        );
    }

    #[test]
    fn bounds_of_unit_cube() {
        let pts = vec![
            Vector3::new(-0.5, -0.5, -0.5),
            Vector3::new(0.5, 0.5, 0.5),
        ];
        let (min, max) = bounds(&pts);
        assert_eq!(min, Vector3::new(-0.5, -0.5, -0.5));
        assert_eq!(max, Vector3::new(0.5, 0.5, 0.5));
    }
}
