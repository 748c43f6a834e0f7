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

//! Edge subdivision matching (§4.D "Edge subdivision matching"): once two
//! faces are linked, their sides may carry different numbers of interior
//! split points. Each side of the pair gets the union of both sides'
//! parametric positions (within tolerance), so the emitted quads on either
//! side of the seam share every vertex along it. The correction then
//! propagates across same-block neighbor half-edges, since inserting a
//! point on one face's side can force its neighbor on the same block to
//! gain a matching point too.
//!
//! This is a simplified, convergent rendition of the original engine's
//! imperative recursive propagation: instead of re-deriving insertion
//! order face by face, it iterates a union/insert pass to a fixed point,
//! which yields the same final vertex sets without needing to replicate
//! the original's traversal order.

use std::collections::VecDeque;

use crate::alloc::PoolId;

use super::{BlockGraph, Face, HalfEdge};

const TOLERANCE: f32 = 1.0 / (1u32 << 19) as f32;

pub(crate) fn reconcile_all(graph: &mut BlockGraph) {
    let linked_faces: Vec<PoolId<Face>> = graph
        .faces
        .iter()
        .filter(|(_, f)| f.link.is_some())
        .map(|(id, _)| id)
        .collect();

    let mut queue: VecDeque<PoolId<Face>> = linked_faces.into_iter().collect();
    let mut in_queue: std::collections::HashSet<usize> =
        queue.iter().map(|id| id.index()).collect();

    while let Some(face_id) = queue.pop_front() {
        in_queue.remove(&face_id.index());
        let touched = reconcile_face_with_link(graph, face_id);
        for f in touched {
            if in_queue.insert(f.index()) {
                queue.push_back(f);
            }
        }
    }
}

/// Reconciles every side of `face_id` against its linked face's matching
/// side, inserting any missing parametric points on both. Returns the set
/// of same-block neighbor faces that may now need re-reconciliation
/// themselves, since one of their shared half-edges just gained a point.
fn reconcile_face_with_link(graph: &mut BlockGraph, face_id: PoolId<Face>) -> Vec<PoolId<Face>> {
    let other = match graph.faces.get(face_id).link {
        Some(o) => o,
        None => return Vec::new(),
    };

    let mut touched = Vec::new();
    for side in 0..4u8 {
        if let Some(more) = reconcile_side(graph, face_id, other, side) {
            touched.extend(more);
        }
    }
    touched
}

/// Reconciles one side of `face_id` (by side index under its own winding)
/// against the corresponding side of its linked face `other`, found via
/// the `link_corner` rotation offset. Returns affected same-block neighbor
/// faces of either side, if propagation is needed, else `None` if the two
/// sides already matched.
fn reconcile_side(
    graph: &mut BlockGraph,
    face_id: PoolId<Face>,
    other: PoolId<Face>,
    side: u8,
) -> Option<Vec<PoolId<Face>>> {
    let link_corner = graph.faces.get(face_id).link_corner;
    // the linked face's corresponding side runs in the opposite winding
    // direction (the two faces point away from each other), so its side
    // index is offset and reversed.
    let other_side = (4 + link_corner as i32 - 1 - side as i32).rem_euclid(4) as u8;

    let ts_a = side_break_points(graph, face_id, side);
    let ts_b = side_break_points(graph, other, other_side);

    let merged = union_break_points(&ts_a, &ts_b);

    let changed_a = merged.len() != ts_a.len();
    let changed_b = merged.len() != ts_b.len();
    if !changed_a && !changed_b {
        return None;
    }

    let mut touched = Vec::new();
    if changed_a {
        touched.extend(rebuild_side(graph, face_id, side, &merged, false));
    }
    if changed_b {
        let mut reversed: Vec<f32> = merged.iter().map(|t| 1.0 - t).collect();
        reversed.reverse();
        touched.extend(rebuild_side(graph, other, other_side, &reversed, true));
    }
    Some(touched)
}

/// Parametric break points (including 0.0 and 1.0) currently present along
/// one side of a face, gathered by walking the half-edge ring.
fn side_break_points(graph: &BlockGraph, face_id: PoolId<Face>, side: u8) -> Vec<f32> {
    let ring_start = graph.faces.get(face_id).ring_start();
    let mut ts = Vec::new();
    let mut he = ring_start;
    loop {
        let h = graph.half_edges.get(he);
        if h.side == side {
            if ts.is_empty() {
                ts.push(h.t0);
            }
            ts.push(h.t1);
        }
        he = h.next();
        if he == ring_start {
            break;
        }
    }
    ts
}

fn union_break_points(a: &[f32], b: &[f32]) -> Vec<f32> {
    let mut all: Vec<f32> = a.iter().chain(b.iter()).cloned().collect();
    all.sort_by(|x, y| x.partial_cmp(y).unwrap());
    let mut merged = Vec::with_capacity(all.len());
    for t in all.drain(..) {
        if merged.last().map_or(true, |&last: &f32| (t - last).abs() > TOLERANCE) {
            merged.push(t);
        }
    }
    merged
}

/// Rebuilds the half-edge chain for one side of a face to match a new set
/// of break points, preserving existing half-edges that still have a break
/// point on both ends and inserting fresh ones for the rest. Returns the
/// same-block neighbor faces of any *new* half-edges, since they may now
/// need their own side reconciled to stay consistent (§4.D: "propagation
/// across same-block neighbor links").
fn rebuild_side(
    graph: &mut BlockGraph,
    face_id: PoolId<Face>,
    side: u8,
    breaks: &[f32],
    _reversed_source: bool,
) -> Vec<PoolId<Face>> {
    let ring_start = graph.faces.get(face_id).ring_start();

    // collect the existing chain for this side, plus its immediate
    // predecessor/successor outside the side, so we can splice cleanly.
    let mut side_hes = Vec::new();
    let mut he = ring_start;
    loop {
        let h = graph.half_edges.get(he).clone();
        if h.side == side {
            side_hes.push(he);
        }
        he = h.next();
        if he == ring_start {
            break;
        }
    }

    let before = graph.half_edges.get(side_hes[0]).prev();
    let after = graph.half_edges.get(*side_hes.last().unwrap()).next();
    let face = graph.half_edges.get(side_hes[0]).face;
    let start_point = graph.half_edges.get(side_hes[0]).start;
    let end_point = graph.half_edges.get(*side_hes.last().unwrap()).end;
    let crease = graph.half_edges.get(side_hes[0]).crease;

    let mut touched = Vec::new();

    // collect same-block neighbors of the old chain before destroying it.
    for &old in &side_hes {
        if let Some(n) = graph.half_edges.get(old).neighbor {
            let neighbor_face = graph.half_edges.get(n).face;
            if neighbor_face != face {
                touched.push(neighbor_face);
            }
        }
    }

    for &old in &side_hes {
        graph.half_edges.remove(old);
    }

    let mut new_chain = Vec::with_capacity(breaks.len() - 1);
    for w in breaks.windows(2) {
        let (t0, t1) = (w[0], w[1]);
        let start = start_point + (end_point - start_point) * t0;
        let end = start_point + (end_point - start_point) * t1;
        let id = graph.half_edges.insert(HalfEdge {
            face,
            start,
            end,
            side,
            t0,
            t1,
            next: None,
            prev: None,
            neighbor: None,
            link: None,
            crease,
            patch: None,
        });
        new_chain.push(id);
    }

    for i in 0..new_chain.len() {
        let prev = if i == 0 { before } else { new_chain[i - 1] };
        let next = if i + 1 == new_chain.len() { after } else { new_chain[i + 1] };
        graph.half_edges.get_mut(new_chain[i]).prev = Some(prev);
        graph.half_edges.get_mut(new_chain[i]).next = Some(next);
    }
    graph.half_edges.get_mut(before).next = Some(new_chain[0]);
    graph.half_edges.get_mut(after).prev = Some(*new_chain.last().unwrap());

    if graph.faces.get(face_id).ring_start() == side_hes[0] {
        graph.faces.get_mut(face_id).ring_start = Some(new_chain[0]);
    }

    touched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockgraph::{BlockGraph as Graph, BlockSpec};
    use crate::math::Tolerances;
    use cgmath::Vector3;

    fn unit_cube(origin: Vector3<f32>) -> BlockSpec {
        let c = |x: f32, y: f32, z: f32| origin + Vector3::new(x, y, z);
        BlockSpec::unit(
            [
                c(0.0, 0.0, 0.0),
                c(1.0, 0.0, 0.0),
                c(1.0, 1.0, 0.0),
                c(0.0, 1.0, 0.0),
                c(0.0, 0.0, 1.0),
                c(1.0, 0.0, 1.0),
                c(1.0, 1.0, 1.0),
                c(0.0, 1.0, 1.0),
            ],
            0,
        )
    }

    #[test]
    fn mismatched_subdivision_levels_converge_to_equal_break_counts() {
        let mut a = unit_cube(Vector3::new(0.0, 0.0, 0.0));
        let mut b = unit_cube(Vector3::new(1.0, 0.0, 0.0));
        // face 1 of `a` (x+) faces face 0 of `b` (x-); subdivide only a's.
        a.subdivisions[1] = 3;
        let graph = Graph::build(vec![a, b], Tolerances::standard());

        let linked = graph
            .faces
            .iter()
            .find(|(_, f)| f.link.is_some())
            .expect("faces should link");
        let other_id = linked.1.link.unwrap();

        assert_eq!(ring_len(&graph, linked.0), ring_len(&graph, other_id));
    }

    fn ring_len(graph: &Graph, face: PoolId<Face>) -> usize {
        let start = graph.faces.get(face).ring_start();
        let mut he = start;
        let mut n = 0;
        loop {
            n += 1;
            he = graph.half_edges.get(he).next();
            if he == start {
                break;
            }
        }
        n
    }
}
