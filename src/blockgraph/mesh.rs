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

//! Quad emission and Catmull–Clark initial placement (§4.D "Quad emission"
//! and "Catmull-Clark initial placement"): every face's ring of half-edges
//! is split into one quad per half-edge (center, previous edge's midpoint,
//! the half-edge's start corner, its own midpoint), and those quads'
//! vertices are placed using the standard smooth/crease/corner rules
//! before the mesh is handed back to the caller.

use std::collections::HashMap;

use crate::alloc::PoolId;
use crate::math::approx_eq;

use cgmath::{Vector2, Vector3};

use super::{BlockGraph, Face, HalfEdge, FACE_UV};

/// One quad of the emitted control mesh, in winding order `[face center,
/// previous edge midpoint, corner, this edge's midpoint]` (§3
/// "Patch (control mesh)").
#[derive(Clone, Debug)]
pub struct Patch {
    pub vertices: [u32; 4],
    pub uvs: [Vector2<f32>; 4],
    pub material: Option<u32>,
    pub crease: [bool; 4],
    pub neighbor: [Option<u32>; 4],
}

/// The finished quad control mesh (§3 "Control mesh").
#[derive(Clone, Debug)]
pub struct ControlMesh {
    pub vertices: Vec<Vector3<f32>>,
    pub patches: Vec<Patch>,
}

impl BlockGraph {
    /// Emits the quad control mesh from the linked, subdivision-reconciled
    /// graph (§4.D "Quad emission" and "Catmull-Clark initial placement").
    pub fn emit_mesh(&self) -> ControlMesh {
        let mut vertices: Vec<Vector3<f32>> = Vec::new();

        // subface probes (`ring_start` is `None`) exist only for rule-3
        // matching and never take part in quad emission.
        let face_ids: Vec<PoolId<Face>> = self
            .faces
            .iter()
            .filter(|(_, f)| f.ring_start.is_some())
            .map(|(id, _)| id)
            .collect();
        let all_hes: Vec<PoolId<HalfEdge>> = self.half_edges.iter().map(|(id, _)| id).collect();

        let mut face_center_vertex: HashMap<usize, u32> = HashMap::new();
        for &f in &face_ids {
            let idx = vertices.len() as u32;
            vertices.push(self.faces.get(f).center);
            face_center_vertex.insert(f.index(), idx);
        }

        let mut edge_mid_vertex: HashMap<usize, u32> = HashMap::new();
        for &he in &all_hes {
            if edge_mid_vertex.contains_key(&he.index()) {
                continue;
            }
            let idx = vertices.len() as u32;
            vertices.push(self.edge_midpoint_raw(he));
            edge_mid_vertex.insert(he.index(), idx);
            if let Some(p) = self.canonical_partner(he) {
                edge_mid_vertex.insert(p.index(), idx);
            }
        }

        let corner_vertex = self.build_corner_vertices(&all_hes, &face_center_vertex, &edge_mid_vertex, &mut vertices);

        // refine edge midpoints now that face centers and corners are final
        // (§4.D: smooth edge = avg of 4 points, crease = avg of 2 endpoints).
        self.place_edge_vertices(&all_hes, &mut vertices, &face_center_vertex, &edge_mid_vertex, &corner_vertex);

        let mut patches = Vec::with_capacity(all_hes.len());
        let mut patch_of_he: HashMap<usize, u32> = HashMap::new();

        for &f in &face_ids {
            let face = self.faces.get(f);
            let material = self.blocks.get(face.block).spec.shape_id;
            let ring_start = face.ring_start();
            let mut he = ring_start;
            loop {
                let h = self.half_edges.get(he);
                let prev = h.prev();
                let center_id = face_center_vertex[&f.index()];
                let prev_mid_id = edge_mid_vertex[&prev.index()];
                let corner_id = corner_vertex[&he.index()];
                let this_mid_id = edge_mid_vertex[&he.index()];

                let center_uv = Vector2::new(0.5, 0.5);
                let prev_h = self.half_edges.get(prev);
                let prev_mid_uv = side_uv(prev_h.side, (prev_h.t0 + prev_h.t1) * 0.5);
                let corner_uv = side_uv(h.side, h.t0);
                let this_mid_uv = side_uv(h.side, (h.t0 + h.t1) * 0.5);

                let patch_index = patches.len() as u32;
                patches.push(Patch {
                    vertices: [center_id, prev_mid_id, corner_id, this_mid_id],
                    uvs: [center_uv, prev_mid_uv, corner_uv, this_mid_uv],
                    material,
                    crease: [false, prev_h.crease, h.crease, false],
                    neighbor: [None; 4],
                });
                patch_of_he.insert(he.index(), patch_index);

                he = h.next();
                if he == ring_start {
                    break;
                }
            }
        }

        link_patch_neighbors(&mut patches);

        ControlMesh { vertices, patches }
    }

    fn canonical_partner(&self, he: PoolId<HalfEdge>) -> Option<PoolId<HalfEdge>> {
        let h = self.half_edges.get(he);
        h.neighbor.or(h.link)
    }

    fn edge_midpoint_raw(&self, he: PoolId<HalfEdge>) -> Vector3<f32> {
        let h = self.half_edges.get(he);
        (h.start + h.end) * 0.5
    }

    /// Builds one output vertex per distinct half-edge start point,
    /// deduplicating same-block and cross-block partners, and further
    /// merging physically coincident block corners (§4.D "shared corner
    /// averaging pass") into a single joint vertex. Only joint corners
    /// (points where `t0 == 0`, i.e. actual block corners) get the
    /// Catmull-Clark corner treatment; interior subdivision split points
    /// keep their raw linear position.
    fn build_corner_vertices(
        &self,
        all_hes: &[PoolId<HalfEdge>],
        face_center_vertex: &HashMap<usize, u32>,
        edge_mid_vertex: &HashMap<usize, u32>,
        vertices: &mut Vec<Vector3<f32>>,
    ) -> HashMap<usize, u32> {
        let mut corner_vertex: HashMap<usize, u32> = HashMap::new();

        // interior split points: dedup only via same-edge partner.
        for &he in all_hes {
            let h = self.half_edges.get(he);
            if h.t0 == 0.0 {
                continue;
            }
            if corner_vertex.contains_key(&he.index()) {
                continue;
            }
            let idx = vertices.len() as u32;
            vertices.push(h.start);
            corner_vertex.insert(he.index(), idx);
            if let Some(p) = self.canonical_partner(he) {
                corner_vertex.insert(p.index(), idx);
            }
        }

        // true block corners: group by physical position.
        let precision = self.tol.precision;
        let corner_hes: Vec<PoolId<HalfEdge>> = all_hes
            .iter()
            .cloned()
            .filter(|&he| self.half_edges.get(he).t0 == 0.0)
            .collect();

        let mut groups: Vec<Vec<PoolId<HalfEdge>>> = Vec::new();
        for he in corner_hes {
            let p = self.half_edges.get(he).start;
            match groups.iter_mut().find(|g| approx_eq(self.half_edges.get(g[0]).start, p, precision)) {
                Some(g) => g.push(he),
                None => groups.push(vec![he]),
            }
        }

        for group in groups {
            let pos = self.place_corner(&group, face_center_vertex, edge_mid_vertex, vertices);
            let idx = vertices.len() as u32;
            vertices.push(pos);
            for &he in &group {
                corner_vertex.insert(he.index(), idx);
            }
        }

        corner_vertex
    }

    /// Computes the placed position of a joint corner (§4.D "Catmull-Clark
    /// initial placement", corner vertex rules): `crCount <= 1` uses the
    /// standard smooth vertex rule, `crCount == 2` averages the joint with
    /// its two crease-edge neighbors, `crCount >= 3` fixes the vertex at
    /// the joint average.
    fn place_corner(
        &self,
        group: &[PoolId<HalfEdge>],
        face_center_vertex: &HashMap<usize, u32>,
        edge_mid_vertex: &HashMap<usize, u32>,
        vertices: &[Vector3<f32>],
    ) -> Vector3<f32> {
        let n = group.len() as f32;
        let joint: Vector3<f32> =
            group.iter().map(|&he| self.half_edges.get(he).start).sum::<Vector3<f32>>() / n;

        // distinct incident edges, deduped by canonical partner: the
        // half-edge's own outgoing span and its predecessor's incoming span.
        let mut incident: HashMap<usize, (bool, Vector3<f32>)> = HashMap::new();
        for &he in group {
            let h = self.half_edges.get(he);
            let key = self.canonical_partner(he).map(|p| p.index().min(he.index())).unwrap_or(he.index());
            incident.insert(key, (h.crease, h.end));

            let prev = h.prev();
            let ph = self.half_edges.get(prev);
            let pkey = self.canonical_partner(prev).map(|p| p.index().min(prev.index())).unwrap_or(prev.index());
            incident.insert(pkey, (ph.crease, ph.start));
        }

        let crease_neighbors: Vec<Vector3<f32>> = incident
            .values()
            .filter(|(crease, _)| *crease)
            .map(|(_, pos)| *pos)
            .collect();
        let cr_count = crease_neighbors.len();

        if cr_count >= 3 {
            return joint;
        }
        if cr_count == 2 {
            return (joint * 6.0 + crease_neighbors[0] + crease_neighbors[1]) / 8.0;
        }

        // smooth rule: average face point, average edge midpoint, and the
        // joint itself, weighted by valence (n = number of incident wedges).
        let avg_face: Vector3<f32> = group
            .iter()
            .map(|&he| vertices[face_center_vertex[&self.half_edges.get(he).face.index()] as usize])
            .sum::<Vector3<f32>>()
            / n;

        let edge_positions: Vec<Vector3<f32>> = incident
            .keys()
            .filter_map(|k| edge_mid_vertex.get(k).map(|&i| vertices[i as usize]))
            .collect();
        let avg_edge_pos = if edge_positions.is_empty() {
            joint
        } else {
            edge_positions.iter().cloned().sum::<Vector3<f32>>() / edge_positions.len() as f32
        };

        if n < 3.0 {
            // a boundary/degenerate corner with fewer than 3 incident
            // wedges: not enough data for the full smooth rule, keep it at
            // the joint average.
            return joint;
        }

        (avg_face + avg_edge_pos * 2.0 + joint * (n - 3.0)) / n
    }

    fn place_edge_vertices(
        &self,
        all_hes: &[PoolId<HalfEdge>],
        vertices: &mut [Vector3<f32>],
        face_center_vertex: &HashMap<usize, u32>,
        edge_mid_vertex: &HashMap<usize, u32>,
        corner_vertex: &HashMap<usize, u32>,
    ) {
        let mut done: std::collections::HashSet<u32> = std::collections::HashSet::new();
        for &he in all_hes {
            let vid = edge_mid_vertex[&he.index()];
            if !done.insert(vid) {
                continue;
            }

            let h = self.half_edges.get(he);
            let start = vertices[corner_vertex[&he.index()] as usize];
            // `he.end` coincides with the next half-edge's start corner.
            let end = vertices[corner_vertex[&h.next().index()] as usize];

            let partner = self.canonical_partner(he);
            let crease = h.crease || partner.map_or(false, |p| self.half_edges.get(p).crease);

            let pos = if crease || partner.is_none() {
                (start + end) * 0.5
            } else {
                let this_face = vertices[face_center_vertex[&h.face.index()] as usize];
                let other_face = partner
                    .map(|p| vertices[face_center_vertex[&self.half_edges.get(p).face.index()] as usize])
                    .unwrap_or(this_face);
                (start + end + this_face + other_face) / 4.0
            };
            vertices[vid as usize] = pos;
        }
    }
}

fn side_uv(side: u8, t: f32) -> Vector2<f32> {
    let a = FACE_UV[side as usize];
    let b = FACE_UV[(side as usize + 1) % 4];
    a + (b - a) * t
}

/// Links patches that share two adjacent vertex ids (the shared edge
/// between them), setting each other's `neighbor` slot at the matching
/// edge index (§3 "mutual neighbor pointers").
fn link_patch_neighbors(patches: &mut [Patch]) {
    let mut by_edge: HashMap<(u32, u32), Vec<(usize, usize)>> = HashMap::new();
    for (pi, patch) in patches.iter().enumerate() {
        for edge in 0..4 {
            let a = patch.vertices[edge];
            let b = patch.vertices[(edge + 1) % 4];
            let key = if a < b { (a, b) } else { (b, a) };
            by_edge.entry(key).or_insert_with(Vec::new).push((pi, edge));
        }
    }

    for occupants in by_edge.values() {
        if occupants.len() == 2 {
            let (pa, ea) = occupants[0];
            let (pb, eb) = occupants[1];
            patches[pa].neighbor[ea] = Some(pb as u32);
            patches[pb].neighbor[eb] = Some(pa as u32);
        }
    }
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
    fn single_block_emits_twenty_four_patches() {
        let graph = BlockGraph::build(vec![unit_cube(Vector3::new(0.0, 0.0, 0.0))], Tolerances::standard());
        let mesh = graph.emit_mesh();
        // 6 faces * 4 half-edges each (unsubdivided).
        assert_eq!(mesh.patches.len(), 24);
    }

    #[test]
    fn every_patch_vertex_id_is_in_range() {
        let graph = BlockGraph::build(vec![unit_cube(Vector3::new(0.0, 0.0, 0.0))], Tolerances::standard());
        let mesh = graph.emit_mesh();
        for patch in &mesh.patches {
            for &v in &patch.vertices {
                assert!((v as usize) < mesh.vertices.len());
            }
        }
    }
}
