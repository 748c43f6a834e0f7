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

//! Face-to-face linking (§4.D "Face-to-face matching rules"): for each
//! candidate pair of blocks found by the spatial grid, test every pair of
//! their six faces and bond the ones that face each other closely enough.

use crate::alloc::PoolId;

use cgmath::{InnerSpace, Vector3};

use super::{grid::Grid, Block, BlockGraph, Face};

pub(crate) fn link_all(graph: &mut BlockGraph) {
    let blocks: Vec<(PoolId<Block>, crate::math::Aabb)> = graph
        .blocks
        .iter()
        .map(|(id, b)| (id, b.aabb))
        .collect();
    let grid = Grid::build(&blocks);

    for (a, b) in grid.candidate_pairs() {
        link_block_pair(graph, a, b);
    }
}

fn link_block_pair(graph: &mut BlockGraph, a: PoolId<Block>, b: PoolId<Block>) {
    for fa in 0..6 {
        for fb in 0..6 {
            let face_a = graph.blocks.get(a).face(fa);
            let face_b = graph.blocks.get(b).face(fb);
            try_link_faces(graph, face_a, face_b);
        }
    }
}

/// Tests and, if eligible, establishes a bond between two faces belonging
/// to different blocks (§4.D rules: attraction bit, direction opposition,
/// ray-cast proximity, force threshold, "strictly less than any prior
/// link").
fn try_link_faces(graph: &mut BlockGraph, fa: PoolId<Face>, fb: PoolId<Face>) {
    let (
        attr_a,
        attr_b,
        dir_a,
        dir_b,
        center_a,
        center_b,
        corners_a,
        corners_b,
        next_a,
        next_b,
        block_a,
        block_b,
    ) = {
        let a = graph.faces.get(fa);
        let b = graph.faces.get(fb);
        let block_a = graph.blocks.get(a.block);
        let block_b = graph.blocks.get(b.block);
        (
            block_a.spec.attraction[a.face_index as usize],
            block_b.spec.attraction[b.face_index as usize],
            a.direction,
            b.direction,
            a.center,
            b.center,
            face_corners(graph, fa),
            face_corners(graph, fb),
            a.next_subface,
            b.next_subface,
            a.block,
            b.block,
        )
    };

    if block_a == block_b {
        return;
    }
    if attr_a | attr_b != 2 {
        return;
    }
    if dir_a.dot(dir_b) >= 0.0 {
        return;
    }

    // rule 3: the ray each face casts in its own outward direction must
    // actually land on the other face's quad; when one side is subdivided,
    // the hit point picks which of its subfaces is the real bonding
    // endpoint (§4.D rule 3, ported from `DFBlocks.cpp`'s `blocksOverlap`).
    let (center_a, corners_a, center_b, corners_b) = match resolve_bond_endpoints(
        graph, center_a, dir_a, corners_a, next_a, center_b, dir_b, corners_b, next_b,
    ) {
        Some(endpoints) => endpoints,
        None => return,
    };

    let dist_sq = (center_b - center_a).magnitude2();
    let threshold = super::face_force(&corners_a) + super::face_force(&corners_b);
    if dist_sq > threshold {
        return;
    }

    // a face may only hold the single closest link it has seen so far.
    let existing_a = graph.faces.get(fa).link;
    let existing_b = graph.faces.get(fb).link;
    if let Some(prev) = existing_a {
        if existing_dist_sq(graph, fa, prev) <= dist_sq {
            return;
        }
    }
    if let Some(prev) = existing_b {
        if existing_dist_sq(graph, fb, prev) <= dist_sq {
            return;
        }
    }

    let link_corner = best_corner_pair(&corners_a, &corners_b);

    // break any link either face is giving up before establishing the new one.
    if let Some(prev) = existing_a {
        graph.faces.get_mut(prev).link = None;
    }
    if let Some(prev) = existing_b {
        graph.faces.get_mut(prev).link = None;
    }

    // the bond is always recorded between the two top-level faces, even
    // when a subface decided which corner rotation and force threshold to
    // use: subfaces are matching-only probes, never ring or link holders.
    graph.faces.get_mut(fa).link = Some(fb);
    graph.faces.get_mut(fa).link_corner = link_corner;
    graph.faces.get_mut(fb).link = Some(fa);
    graph.faces.get_mut(fb).link_corner = (4 - link_corner) % 4;
}

/// Resolves rule 3 for a candidate face pair, returning the effective
/// `(center, corners)` to bond at for each side. Both unsubdivided requires
/// a hit in both directions; one side subdivided requires only the hit
/// from the unsubdivided side, then walks the subdivided side's subface
/// chain for the nearest center to the hit point; both subdivided is left
/// unsupported, matching the original engine's own `blocksOverlap` (its
/// face-to-side branch skips outright when the other side is also
/// subdivided).
#[allow(clippy::too_many_arguments)]
fn resolve_bond_endpoints(
    graph: &BlockGraph,
    center_a: Vector3<f32>,
    dir_a: Vector3<f32>,
    corners_a: [Vector3<f32>; 4],
    next_a: Option<PoolId<Face>>,
    center_b: Vector3<f32>,
    dir_b: Vector3<f32>,
    corners_b: [Vector3<f32>; 4],
    next_b: Option<PoolId<Face>>,
) -> Option<(Vector3<f32>, [Vector3<f32>; 4], Vector3<f32>, [Vector3<f32>; 4])> {
    match (next_a, next_b) {
        (None, None) => {
            quad_ray_hit(center_a, dir_a, &corners_b)?;
            quad_ray_hit(center_b, dir_b, &corners_a)?;
            Some((center_a, corners_a, center_b, corners_b))
        }
        (None, Some(head_b)) => {
            let hit = quad_ray_hit(center_a, dir_a, &corners_b)?;
            let (center, corners) = nearest_subface(graph, head_b, hit);
            Some((center_a, corners_a, center, corners))
        }
        (Some(head_a), None) => {
            let hit = quad_ray_hit(center_b, dir_b, &corners_a)?;
            let (center, corners) = nearest_subface(graph, head_a, hit);
            Some((center, corners, center_b, corners_b))
        }
        (Some(_), Some(_)) => None,
    }
}

/// Walks a subface chain starting at `head`, returning the `(center,
/// corners)` of whichever subface's center lands closest to `hit`.
fn nearest_subface(graph: &BlockGraph, head: PoolId<Face>, hit: Vector3<f32>) -> (Vector3<f32>, [Vector3<f32>; 4]) {
    let first = graph.faces.get(head);
    let mut best_center = first.center;
    let mut best_corners = first.corners.expect("subface probes always carry their own corners");
    let mut best_dist = (best_center - hit).magnitude2();
    let mut cur = first.next_subface;

    while let Some(id) = cur {
        let f = graph.faces.get(id);
        let d = (f.center - hit).magnitude2();
        if d < best_dist {
            best_dist = d;
            best_center = f.center;
            best_corners = f.corners.expect("subface probes always carry their own corners");
        }
        cur = f.next_subface;
    }

    (best_center, best_corners)
}

const RAY_TMIN: f32 = -0.1;

/// A ray from `pos` along `dir` against quad `corners` split into triangles
/// `(p0,p1,p2)` and `(p0,p2,p3)` (§4.D rule 3, ported from `DFBlocks.cpp`'s
/// `intersect()`/`Intersector::trace`).
fn quad_ray_hit(pos: Vector3<f32>, dir: Vector3<f32>, corners: &[Vector3<f32>; 4]) -> Option<Vector3<f32>> {
    ray_triangle_hit(pos, dir, corners[0], corners[1], corners[2])
        .or_else(|| ray_triangle_hit(pos, dir, corners[0], corners[2], corners[3]))
}

/// Möller–Trumbore ray/triangle intersection. `RAY_TMIN` is slightly
/// negative so a ray whose origin sits right on the triangle's plane still
/// counts as a hit, matching the original's `hit._tmin = -0.1f`.
fn ray_triangle_hit(
    pos: Vector3<f32>,
    dir: Vector3<f32>,
    p0: Vector3<f32>,
    p1: Vector3<f32>,
    p2: Vector3<f32>,
) -> Option<Vector3<f32>> {
    let e1 = p1 - p0;
    let e2 = p2 - p0;
    let pvec = dir.cross(e2);
    let det = e1.dot(pvec);
    if det.abs() < 1e-8 {
        return None;
    }
    let inv_det = 1.0 / det;

    let tvec = pos - p0;
    let u = tvec.dot(pvec) * inv_det;
    if u < 0.0 || u > 1.0 {
        return None;
    }

    let qvec = tvec.cross(e1);
    let v = dir.dot(qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = e2.dot(qvec) * inv_det;
    if t < RAY_TMIN {
        return None;
    }
    Some(pos + dir * t)
}

fn existing_dist_sq(graph: &BlockGraph, face: PoolId<Face>, other: PoolId<Face>) -> f32 {
    let a = graph.faces.get(face).center;
    let b = graph.faces.get(other).center;
    (b - a).magnitude2()
}

/// Finds the rotation of face `b`'s corner ring against face `a`'s that
/// minimizes total corner-pair distance (§4.D: "exhaustive nearest-corner-
/// pair search over all 16 (ca, cb) combinations"), and returns the winning
/// `(cb + ca) % 4` as the shared `link_corner`, per the original `link()`.
fn best_corner_pair(corners_a: &[Vector3<f32>; 4], corners_b: &[Vector3<f32>; 4]) -> u8 {
    let mut best = (0u8, f32::INFINITY);
    for ca in 0..4usize {
        for cb in 0..4usize {
            let d = (corners_a[ca] - corners_b[cb]).magnitude2();
            if d < best.1 {
                best = (((cb + ca) % 4) as u8, d);
            }
        }
    }
    best.0
}

fn face_corners(graph: &BlockGraph, face: PoolId<Face>) -> [Vector3<f32>; 4] {
    let f = graph.faces.get(face);
    let block = graph.blocks.get(f.block);
    let verts = super::FACE_VERTEX[f.face_index as usize];
    [
        block.spec.corners[verts[0]],
        block.spec.corners[verts[1]],
        block.spec.corners[verts[2]],
        block.spec.corners[verts[3]],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockgraph::BlockSpec;
    use crate::math::Tolerances;

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
    fn non_attracting_faces_never_link() {
        let mut a = unit_cube(Vector3::new(0.0, 0.0, 0.0));
        let mut b = unit_cube(Vector3::new(1.0, 0.0, 0.0));
        a.attraction = [0; 6];
        b.attraction = [0; 6];
        let graph = BlockGraph::build(vec![a, b], Tolerances::standard());
        assert!(graph.faces.iter().all(|(_, f)| f.link.is_none()));
    }

    #[test]
    fn distant_blocks_do_not_link() {
        let a = unit_cube(Vector3::new(0.0, 0.0, 0.0));
        let b = unit_cube(Vector3::new(100.0, 0.0, 0.0));
        let graph = BlockGraph::build(vec![a, b], Tolerances::standard());
        assert!(graph.faces.iter().all(|(_, f)| f.link.is_none()));
    }

    #[test]
    fn ray_triangle_hit_detects_a_straight_on_intersection() {
        let p0 = Vector3::new(0.0, 0.0, 0.0);
        let p1 = Vector3::new(1.0, 0.0, 0.0);
        let p2 = Vector3::new(0.0, 1.0, 0.0);
        let hit = ray_triangle_hit(Vector3::new(0.2, 0.2, 1.0), Vector3::new(0.0, 0.0, -1.0), p0, p1, p2);
        let hit = hit.expect("ray through the triangle's interior should hit");
        assert!(hit.z.abs() < 1e-5);
    }

    #[test]
    fn ray_triangle_hit_misses_outside_the_triangle() {
        let p0 = Vector3::new(0.0, 0.0, 0.0);
        let p1 = Vector3::new(1.0, 0.0, 0.0);
        let p2 = Vector3::new(0.0, 1.0, 0.0);
        let hit = ray_triangle_hit(Vector3::new(5.0, 5.0, 1.0), Vector3::new(0.0, 0.0, -1.0), p0, p1, p2);
        assert!(hit.is_none());
    }

    #[test]
    fn quad_ray_hit_finds_a_hit_inside_either_triangle_half() {
        let corners = [
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        ];
        assert!(quad_ray_hit(Vector3::new(0.5, 0.5, 1.0), Vector3::new(0.0, 0.0, -1.0), &corners).is_some());
        assert!(quad_ray_hit(Vector3::new(5.0, 5.0, 1.0), Vector3::new(0.0, 0.0, -1.0), &corners).is_none());
    }

    #[test]
    fn nearest_subface_finds_the_closest_cell_center() {
        let mut a = unit_cube(Vector3::new(0.0, 0.0, 0.0));
        a.subdivisions[1] = 3;
        let b = unit_cube(Vector3::new(5.0, 0.0, 0.0));
        let graph = BlockGraph::build(vec![a, b], Tolerances::standard());

        let subdivided = graph
            .faces
            .iter()
            .find(|(_, f)| f.next_subface.is_some())
            .expect("level-3 subdivision should produce a subface chain")
            .0;
        let head = graph.faces.get(subdivided).next_subface.unwrap();

        // walk to the third cell in the chain and probe with its own center.
        let mut cur = head;
        for _ in 0..2 {
            cur = graph.faces.get(cur).next_subface.expect("a 3x3 grid has at least three cells");
        }
        let target_center = graph.faces.get(cur).center;

        let (center, _corners) = nearest_subface(&graph, head, target_center);
        assert!((center - target_center).magnitude2() < 1e-8);
    }

    #[test]
    fn laterally_offset_faces_stay_within_the_force_threshold_but_still_miss_the_ray() {
        // touching in x, but shifted far enough in y that neither face's
        // outward ray lands on the other's quad (a thin sliver of the two
        // quads' y-ranges still overlaps, and the centers are still close
        // enough to pass the force threshold alone) — exactly the corner-
        // to-corner case rule 3 exists to reject.
        let a = unit_cube(Vector3::new(0.0, 0.0, 0.0));
        let b = unit_cube(Vector3::new(1.0, 0.8, 0.0));
        let graph = BlockGraph::build(vec![a, b], Tolerances::standard());
        assert!(graph.faces.iter().all(|(_, f)| f.link.is_none()));
    }
}
