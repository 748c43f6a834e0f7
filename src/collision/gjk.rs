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

//! Phase 1 of shape/shape collision (§4.E "Phase 1 — GJK"): walk the
//! Minkowski difference's simplex toward the origin, terminating in
//! separation, a touching contact, or a handoff to [`super::epa`].

use super::support::{Shape, Transform};

use cgmath::{InnerSpace, Vector3};

const MAX_ITERATIONS: u32 = 20;

/// A vertex of the Minkowski difference: the witness points on A and B that
/// produced it, the direction that was searched, and `p = witness_a -
/// witness_b` (§4.E "Minkowski-difference vertex").
#[derive(Copy, Clone, Debug)]
pub struct MinkowskiVertex {
    pub witness_a: Vector3<f32>,
    pub witness_b: Vector3<f32>,
    pub direction: Vector3<f32>,
    pub p: Vector3<f32>,
}

fn minkowski_support(
    shape_a: &Shape,
    xf_a: &Transform,
    margin_a: f32,
    shape_b: &Shape,
    xf_b: &Transform,
    margin_b: f32,
    d: Vector3<f32>,
) -> MinkowskiVertex {
    let witness_a = shape_a.support(xf_a, d, margin_a);
    let witness_b = shape_b.support(xf_b, -d, margin_b);
    MinkowskiVertex {
        witness_a,
        witness_b,
        direction: d,
        p: witness_a - witness_b,
    }
}

#[derive(Clone, Debug)]
pub enum GjkResult {
    /// Shapes are separated; `axis` is cached as next frame's seed
    /// direction.
    Separated { axis: Vector3<f32> },
    /// Within the combined margin: a touching contact.
    Touching {
        witness_a: Vector3<f32>,
        witness_b: Vector3<f32>,
        normal: Vector3<f32>,
    },
    /// The simplex enclosed the origin; hand off to EPA.
    Penetrating { simplex: [MinkowskiVertex; 4] },
}

pub fn gjk(
    shape_a: &Shape,
    xf_a: &Transform,
    margin_a: f32,
    shape_b: &Shape,
    xf_b: &Transform,
    margin_b: f32,
    seed: Vector3<f32>,
) -> GjkResult {
    let mut d = if seed.magnitude2() > 1e-12 {
        seed
    } else {
        Vector3::new(1.0, 0.0, 0.0)
    };

    let mut simplex: Vec<MinkowskiVertex> = Vec::with_capacity(4);
    simplex.push(minkowski_support(shape_a, xf_a, margin_a, shape_b, xf_b, margin_b, d));

    let combined_margin = margin_a + margin_b + 0.001;

    for _ in 0..MAX_ITERATIONS {
        if d.magnitude2() < 1e-12 {
            return GjkResult::Penetrating { simplex: pad_to_tetrahedron(&simplex, shape_a, xf_a, margin_a, shape_b, xf_b, margin_b) };
        }

        let p = minkowski_support(shape_a, xf_a, margin_a, shape_b, xf_b, margin_b, d);
        let dp = d.dot(p.p);

        if dp < 0.0 && dp * dp > combined_margin * combined_margin * d.magnitude2() {
            return GjkResult::Separated { axis: d };
        }

        let s0 = d.dot(simplex[0].p);
        if (s0 - dp) < 1e-6 * s0.abs().max(1e-12) {
            let (wa, wb) = reconstruct_witnesses(&simplex);
            let normal = if d.magnitude2() > 1e-12 { d.normalize() } else { Vector3::new(0.0, 1.0, 0.0) };
            return GjkResult::Touching { witness_a: wa, witness_b: wb, normal };
        }

        simplex.push(p);
        match reduce_simplex(&mut simplex) {
            SimplexState::ContainsOrigin => {
                return GjkResult::Penetrating {
                    simplex: pad_to_tetrahedron(&simplex, shape_a, xf_a, margin_a, shape_b, xf_b, margin_b),
                };
            }
            SimplexState::NewDirection(new_d) => d = new_d,
        }
    }

    // iteration cap reached (§4.E "Failure semantics"): report whatever the
    // current direction implies, biased toward separation so callers don't
    // apply a spurious correction.
    GjkResult::Separated { axis: d }
}

enum SimplexState {
    NewDirection(Vector3<f32>),
    ContainsOrigin,
}

/// Reduces `simplex` (2-4 points, most recent last) to the smallest
/// sub-simplex nearest the origin, returning the next search direction, or
/// reports that a tetrahedron already encloses the origin.
fn reduce_simplex(simplex: &mut Vec<MinkowskiVertex>) -> SimplexState {
    match simplex.len() {
        2 => {
            let a = simplex[1].p;
            let b = simplex[0].p;
            let ab = b - a;
            let ao = -a;
            if ab.dot(ao) > 0.0 {
                SimplexState::NewDirection(ab.cross(ao).cross(ab))
            } else {
                let keep = simplex[1];
                simplex.clear();
                simplex.push(keep);
                SimplexState::NewDirection(ao)
            }
        }
        3 => {
            let a = simplex[2].p;
            let b = simplex[1].p;
            let c = simplex[0].p;
            let ab = b - a;
            let ac = c - a;
            let ao = -a;
            let abc = ab.cross(ac);

            if abc.cross(ac).dot(ao) > 0.0 {
                if ac.dot(ao) > 0.0 {
                    let (va, vc) = (simplex[2], simplex[0]);
                    simplex.clear();
                    simplex.push(vc);
                    simplex.push(va);
                    SimplexState::NewDirection(ac.cross(ao).cross(ac))
                } else {
                    star_edge_case(simplex, ab, ao)
                }
            } else if ab.cross(abc).dot(ao) > 0.0 {
                star_edge_case(simplex, ab, ao)
            } else if abc.dot(ao) > 0.0 {
                SimplexState::NewDirection(abc)
            } else {
                // flip winding so the face normal points toward the origin
                // for the EPA seed later.
                simplex.swap(0, 1);
                SimplexState::NewDirection(-abc)
            }
        }
        4 => {
            let a = simplex[3].p;
            let b = simplex[2].p;
            let c = simplex[1].p;
            let d = simplex[0].p;
            let ao = -a;

            let abc = (b - a).cross(c - a);
            let acd = (c - a).cross(d - a);
            let adb = (d - a).cross(b - a);

            if abc.dot(ao) > 0.0 {
                let (va, vb, vc) = (simplex[3], simplex[2], simplex[1]);
                simplex.clear();
                simplex.push(vc);
                simplex.push(vb);
                simplex.push(va);
                return reduce_simplex(simplex);
            }
            if acd.dot(ao) > 0.0 {
                let (va, vc, vd) = (simplex[3], simplex[1], simplex[0]);
                simplex.clear();
                simplex.push(vd);
                simplex.push(vc);
                simplex.push(va);
                return reduce_simplex(simplex);
            }
            if adb.dot(ao) > 0.0 {
                let (va, vd, vb) = (simplex[3], simplex[0], simplex[2]);
                simplex.clear();
                simplex.push(vb);
                simplex.push(vd);
                simplex.push(va);
                return reduce_simplex(simplex);
            }
            SimplexState::ContainsOrigin
        }
        _ => unreachable!("simplex should never have fewer than 2 or more than 4 points here"),
    }
}

fn star_edge_case(simplex: &mut Vec<MinkowskiVertex>, ab: Vector3<f32>, ao: Vector3<f32>) -> SimplexState {
    if ab.dot(ao) > 0.0 {
        let (va, vb) = (simplex[2], simplex[1]);
        simplex.clear();
        simplex.push(vb);
        simplex.push(va);
        SimplexState::NewDirection(ab.cross(ao).cross(ab))
    } else {
        let va = simplex[2];
        simplex.clear();
        simplex.push(va);
        SimplexState::NewDirection(ao)
    }
}

/// Reconstructs approximate world witnesses by barycentric interpolation
/// over whatever simplex remains at convergence (§4.E step 3).
fn reconstruct_witnesses(simplex: &[MinkowskiVertex]) -> (Vector3<f32>, Vector3<f32>) {
    match simplex.len() {
        1 => (simplex[0].witness_a, simplex[0].witness_b),
        2 => {
            let (t, _) = closest_on_segment(simplex[0].p, simplex[1].p, Vector3::new(0.0, 0.0, 0.0));
            let wa = simplex[0].witness_a + (simplex[1].witness_a - simplex[0].witness_a) * t;
            let wb = simplex[0].witness_b + (simplex[1].witness_b - simplex[0].witness_b) * t;
            (wa, wb)
        }
        _ => {
            let (u, v, w) = barycentric_triangle(simplex[0].p, simplex[1].p, simplex[2].p, Vector3::new(0.0, 0.0, 0.0));
            let wa = simplex[0].witness_a * u + simplex[1].witness_a * v + simplex[2].witness_a * w;
            let wb = simplex[0].witness_b * u + simplex[1].witness_b * v + simplex[2].witness_b * w;
            (wa, wb)
        }
    }
}

pub(crate) fn closest_on_segment(a: Vector3<f32>, b: Vector3<f32>, p: Vector3<f32>) -> (f32, Vector3<f32>) {
    let ab = b - a;
    let len2 = ab.magnitude2();
    if len2 < 1e-12 {
        return (0.0, a);
    }
    let t = ((p - a).dot(ab) / len2).max(0.0).min(1.0);
    (t, a + ab * t)
}

pub(crate) fn barycentric_triangle(a: Vector3<f32>, b: Vector3<f32>, c: Vector3<f32>, p: Vector3<f32>) -> (f32, f32, f32) {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let d00 = v0.dot(v0);
    let d01 = v0.dot(v1);
    let d11 = v1.dot(v1);
    let d20 = v2.dot(v0);
    let d21 = v2.dot(v1);
    let denom = d00 * d11 - d01 * d01;
    if denom.abs() < 1e-12 {
        return (1.0, 0.0, 0.0);
    }
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    let u = 1.0 - v - w;
    (u, v, w)
}

/// GJK can terminate at the origin with fewer than four simplex points
/// (e.g. origin lying exactly on a triangle face). EPA needs a tetrahedron,
/// so pad the simplex with extra support points along directions away from
/// the existing hull until four affinely independent vertices are
/// collected.
fn pad_to_tetrahedron(
    simplex: &[MinkowskiVertex],
    shape_a: &Shape,
    xf_a: &Transform,
    margin_a: f32,
    shape_b: &Shape,
    xf_b: &Transform,
    margin_b: f32,
) -> [MinkowskiVertex; 4] {
    let mut verts: Vec<MinkowskiVertex> = simplex.to_vec();
    let probe_dirs = [
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(-1.0, 0.3, 0.0),
        Vector3::new(0.0, -1.0, 0.3),
        Vector3::new(0.3, 0.3, -1.0),
    ];
    let mut i = 0;
    while verts.len() < 4 && i < probe_dirs.len() {
        verts.push(minkowski_support(shape_a, xf_a, margin_a, shape_b, xf_b, margin_b, probe_dirs[i]));
        i += 1;
    }
    while verts.len() < 4 {
        verts.push(*verts.last().unwrap());
    }
    [verts[0], verts[1], verts[2], verts[3]]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::support::Shape;
    use cgmath::Quaternion;

    fn identity() -> Transform {
        Transform::identity()
    }

    #[test]
    fn separated_spheres_report_separation() {
        let a = Shape::Sphere { radius: 1.0 };
        let b = Shape::Sphere { radius: 1.0 };
        let xf_a = identity();
        let xf_b = Transform::new(Vector3::new(10.0, 0.0, 0.0), Quaternion::new(1.0, 0.0, 0.0, 0.0));
        match gjk(&a, &xf_a, 0.0, &b, &xf_b, 0.0, Vector3::new(1.0, 0.0, 0.0)) {
            GjkResult::Separated { .. } => {}
            other => panic!("expected separation, got {:?}", other),
        }
    }

    #[test]
    fn overlapping_spheres_report_penetration() {
        let a = Shape::Sphere { radius: 2.0 };
        let b = Shape::Sphere { radius: 2.0 };
        let xf_a = identity();
        let xf_b = Transform::new(Vector3::new(1.0, 0.0, 0.0), Quaternion::new(1.0, 0.0, 0.0, 0.0));
        match gjk(&a, &xf_a, 0.0, &b, &xf_b, 0.0, Vector3::new(1.0, 0.0, 0.0)) {
            GjkResult::Penetrating { .. } => {}
            GjkResult::Touching { .. } => {}
            other => panic!("expected penetration or touching, got {:?}", other),
        }
    }
}
