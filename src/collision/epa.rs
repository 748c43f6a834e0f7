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

//! Phase 2 of shape/shape collision (§4.E "Phase 2 — EPA"): expand the
//! GJK-terminal tetrahedron into the penetration depth and witness points.

use super::contact::Contact;
use super::gjk::{barycentric_triangle, MinkowskiVertex};
use super::support::{Shape, Transform};

use cgmath::{InnerSpace, Vector3};
use std::collections::HashMap;

const MAX_ITERATIONS: u32 = 30;
const RELATIVE_TOLERANCE: f32 = 0.005;

#[derive(Clone, Copy, Debug)]
struct Triangle {
    v: [usize; 3],
    /// (neighbor triangle index, edge index within that neighbor)
    neighbors: [(usize, usize); 3],
    normal: Vector3<f32>,
    dist: f32,
    active: bool,
}

const TETRA_FACES: [(usize, usize, usize, usize); 4] = [
    (0, 1, 2, 3),
    (0, 3, 1, 2),
    (0, 2, 3, 1),
    (1, 3, 2, 0),
];

fn face_triangle(points: &[MinkowskiVertex], i: usize, j: usize, k: usize, opposite: usize) -> Triangle {
    let (pi, pj, pk) = (points[i].p, points[j].p, points[k].p);
    let mut normal = (pj - pi).cross(pk - pi);
    let (mut vj, mut vk) = (j, k);
    if normal.magnitude2() > 1e-12 {
        normal = normal.normalize();
    }
    if normal.dot(pi - points[opposite].p) < 0.0 {
        normal = -normal;
        std::mem::swap(&mut vj, &mut vk);
    }
    let dist = normal.dot(pi);
    Triangle {
        v: [i, vj, vk],
        neighbors: [(0, 0); 3],
        normal,
        dist,
        active: true,
    }
}

fn build_initial_polytope(points: &[MinkowskiVertex]) -> Vec<Triangle> {
    let mut tris: Vec<Triangle> = TETRA_FACES
        .iter()
        .map(|&(i, j, k, o)| face_triangle(points, i, j, k, o))
        .collect();

    // stitch neighbors by matching each directed edge to its reverse on
    // another triangle.
    let mut edge_owner: HashMap<(usize, usize), (usize, usize)> = HashMap::new();
    for (ti, tri) in tris.iter().enumerate() {
        for e in 0..3 {
            let a = tri.v[e];
            let b = tri.v[(e + 1) % 3];
            edge_owner.insert((a, b), (ti, e));
        }
    }
    for ti in 0..tris.len() {
        for e in 0..3 {
            let a = tris[ti].v[e];
            let b = tris[ti].v[(e + 1) % 3];
            if let Some(&(nb, nb_edge)) = edge_owner.get(&(b, a)) {
                tris[ti].neighbors[e] = (nb, nb_edge);
            }
        }
    }
    tris
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

pub fn epa(
    shape_a: &Shape,
    xf_a: &Transform,
    margin_a: f32,
    shape_b: &Shape,
    xf_b: &Transform,
    margin_b: f32,
    simplex: [MinkowskiVertex; 4],
) -> Contact {
    let mut points: Vec<MinkowskiVertex> = simplex.to_vec();
    let mut tris = build_initial_polytope(&points);

    let mut converged: Option<usize> = None;

    for _ in 0..MAX_ITERATIONS {
        let closest = tris
            .iter()
            .enumerate()
            .filter(|(_, t)| t.active)
            .min_by(|a, b| a.1.dist.partial_cmp(&b.1.dist).unwrap());

        let idx = match closest {
            Some((i, _)) => i,
            None => break,
        };

        let tri = tris[idx];
        let w = minkowski_support(shape_a, xf_a, margin_a, shape_b, xf_b, margin_b, tri.normal);
        let w_dist = tri.normal.dot(w.p);

        if w_dist - tri.dist < RELATIVE_TOLERANCE * tri.dist.max(1e-6) {
            converged = Some(idx);
            break;
        }

        // flood-fill the region of active triangles visible from w.
        let mut visible = vec![idx];
        let mut visited = std::collections::HashSet::new();
        visited.insert(idx);
        let mut stack = vec![idx];
        while let Some(t) = stack.pop() {
            for &(nb, _) in &tris[t].neighbors {
                if tris[nb].active && !visited.contains(&nb) && tris[nb].normal.dot(w.p) > tris[nb].dist {
                    visited.insert(nb);
                    visible.push(nb);
                    stack.push(nb);
                }
            }
        }
        for &t in &visible {
            tris[t].active = false;
        }

        // collect horizon: directed edges whose neighbor lies outside the
        // visible region.
        let visible_set: std::collections::HashSet<usize> = visible.iter().cloned().collect();
        let mut edge_from: HashMap<usize, (usize, usize, usize)> = HashMap::new();
        for &t in &visible {
            for e in 0..3 {
                let (nb, nb_edge) = tris[t].neighbors[e];
                if !visible_set.contains(&nb) {
                    let a = tris[t].v[e];
                    let b = tris[t].v[(e + 1) % 3];
                    edge_from.insert(a, (b, nb, nb_edge));
                }
            }
        }
        if edge_from.is_empty() {
            converged = Some(idx);
            break;
        }

        let start = *edge_from.keys().next().unwrap();
        let mut ordered = Vec::new();
        let mut cur = start;
        loop {
            let (b, nb, nb_edge) = match edge_from.get(&cur) {
                Some(&e) => e,
                None => break,
            };
            ordered.push((cur, b, nb, nb_edge));
            cur = b;
            if cur == start {
                break;
            }
        }

        points.push(w);
        let new_idx = points.len() - 1;

        let n = ordered.len();
        let mut new_tri_indices = Vec::with_capacity(n);
        for &(a, b, nb, nb_edge) in &ordered {
            let normal_raw = (points[b].p - points[a].p).cross(points[new_idx].p - points[a].p);
            let normal = if normal_raw.magnitude2() > 1e-12 {
                normal_raw.normalize()
            } else {
                tris[nb].normal
            };
            let dist = normal.dot(points[a].p);
            let ti = tris.len();
            tris.push(Triangle {
                v: [a, b, new_idx],
                neighbors: [(nb, nb_edge), (0, 0), (0, 0)],
                normal,
                dist,
                active: true,
            });
            tris[nb].neighbors[nb_edge] = (ti, 0);
            new_tri_indices.push(ti);
        }
        for i in 0..n {
            let ti = new_tri_indices[i];
            let tj = new_tri_indices[(i + 1) % n];
            tris[ti].neighbors[1] = (tj, 2);
            tris[tj].neighbors[2] = (ti, 1);
        }
    }

    let final_idx = converged.unwrap_or_else(|| {
        tris.iter()
            .enumerate()
            .filter(|(_, t)| t.active)
            .min_by(|a, b| a.1.dist.partial_cmp(&b.1.dist).unwrap())
            .map(|(i, _)| i)
            .unwrap_or(0)
    });

    let tri = tris[final_idx];
    let origin = Vector3::new(0.0, 0.0, 0.0);
    let projected = tri.normal * tri.dist;
    let (u, v, w) = barycentric_triangle(points[tri.v[0]].p, points[tri.v[1]].p, points[tri.v[2]].p, projected);
    let _ = origin;

    let witness_a_world = points[tri.v[0]].witness_a * u + points[tri.v[1]].witness_a * v + points[tri.v[2]].witness_a * w;
    let witness_b_world = points[tri.v[0]].witness_b * u + points[tri.v[1]].witness_b * v + points[tri.v[2]].witness_b * w;

    Contact {
        witness_a_world,
        witness_b_world,
        witness_a_local: xf_a.inverse_point(witness_a_world),
        witness_b_local: xf_b.inverse_point(witness_b_world),
        normal: tri.normal,
        depth: tri.dist,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::gjk::{gjk, GjkResult};
    use cgmath::Quaternion;

    #[test]
    fn deeply_overlapping_spheres_produce_positive_depth() {
        let a = Shape::Sphere { radius: 2.0 };
        let b = Shape::Sphere { radius: 2.0 };
        let xf_a = Transform::identity();
        let xf_b = Transform::new(Vector3::new(1.0, 0.0, 0.0), Quaternion::new(1.0, 0.0, 0.0, 0.0));

        match gjk(&a, &xf_a, 0.0, &b, &xf_b, 0.0, Vector3::new(1.0, 0.0, 0.0)) {
            GjkResult::Penetrating { simplex } => {
                let contact = epa(&a, &xf_a, 0.0, &b, &xf_b, 0.0, simplex);
                assert!(contact.depth > 0.0);
            }
            GjkResult::Touching { .. } => {}
            other => panic!("expected penetration for deeply overlapping spheres, got {:?}", other),
        }
    }
}
