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

//! The block-graph control-mesh builder (§4.D): each "block" is a
//! topological hexahedron. Blocks go into a spatial grid, compatible faces
//! of neighboring blocks are linked into shared quads, non-matching
//! subdivided edges are reconciled, and the surviving exterior half-edges
//! are emitted as a quad control mesh with Catmull–Clark-ready crease tags.
//!
//! Faces, half-edges and blocks all live in [`alloc::Pool`](crate::alloc::Pool)s
//! and are addressed by index (§9 "Ownership cycles"), the same pattern
//! [`crate::bsp3`] uses for its tree nodes.

mod grid;
mod link;
mod mesh;
mod subdivide;

pub use self::mesh::{ControlMesh, Patch};

use crate::alloc::{Pool, PoolId};
use crate::math::{Aabb, Tolerances};

use cgmath::{InnerSpace, Vector2, Vector3};

/// Corner ordering for the six faces of a block, as vertex indices into
/// [`BlockSpec::corners`]. Ported verbatim from the original engine's
/// `faceVertex` table.
pub(crate) const FACE_VERTEX: [[usize; 4]; 6] = [
    [0, 4, 6, 2],
    [5, 1, 3, 7],
    [0, 1, 5, 4],
    [6, 7, 3, 2],
    [1, 0, 2, 3],
    [4, 5, 7, 6],
];

/// Edge-id ordering matching [`FACE_VERTEX`]: `FACE_EDGE[f][s]` is the
/// block-wide edge id (0..11) of the side from `FACE_VERTEX[f][s]` to
/// `FACE_VERTEX[f][(s+1)%4]`. Ported from the original engine's `faceEdge`
/// table. Two faces sharing a physical edge always agree on its id, which
/// is how per-block half-edge `neighbor` pointers are found.
pub(crate) const FACE_EDGE: [[usize; 4]; 6] = [
    [8, 5, 11, 4],
    [9, 7, 10, 6],
    [0, 9, 3, 8],
    [2, 10, 1, 11],
    [0, 4, 1, 7],
    [3, 6, 2, 5],
];

lazy_static! {
    /// Canonical corner UVs for a face ring, in winding order.
    pub(crate) static ref FACE_UV: [Vector2<f32>; 4] = [
        Vector2::new(0.0, 0.0),
        Vector2::new(1.0, 0.0),
        Vector2::new(1.0, 1.0),
        Vector2::new(0.0, 1.0),
    ];
}

/// Cumulative parametric split points for subdivision level `0..=4`,
/// ported from the original `subFracs` table. Level 0 and 1 both mean "no
/// interior split" (a bare 0..1 edge); level `n >= 2` adds `n - 1` interior
/// points at the listed fractions.
pub(crate) const SUB_FRACS: [[f32; 4]; 5] = [
    [1.0, 1.0, 1.0, 1.0],
    [1.0, 1.0, 1.0, 1.0],
    [0.5, 1.0, 1.0, 1.0],
    [1.0 / 3.0, 2.0 / 3.0, 1.0, 1.0],
    [0.25, 0.5, 0.75, 1.0],
];

/// Topological `t` coordinate of each of the 8 block corners (§3 "Block"),
/// used only to orient UV interpolation consistently across subdivided
/// faces.
pub(crate) const CORNER_T: [u8; 8] = [0, 1, 1, 2, 1, 2, 2, 3];

/// Input description of one block (§3 "Block"): eight corner positions, a
/// group id, an optional shape id, a crease mask (one bit per of the 12
/// edges), a per-face subdivision level (0..=4, indexing [`SUB_FRACS`]) and
/// a per-face attraction code (`2` enables face-to-face bonding, matching
/// the original engine's `(attrA | attrB) == 2` test).
#[derive(Clone, Debug)]
pub struct BlockSpec {
    pub corners: [Vector3<f32>; 8],
    pub group: u32,
    pub shape_id: Option<u32>,
    pub crease_mask: u16,
    pub subdivisions: [u8; 6],
    pub attraction: [u8; 6],
}

impl BlockSpec {
    /// A block with all 12 edges unflagged and every face eligible to bond.
    pub fn unit(corners: [Vector3<f32>; 8], group: u32) -> BlockSpec {
        BlockSpec {
            corners,
            group,
            shape_id: None,
            crease_mask: 0,
            subdivisions: [0; 6],
            attraction: [2; 6],
        }
    }

    fn edge_is_crease(&self, edge_id: usize) -> bool {
        self.crease_mask & (1 << edge_id) != 0
    }
}

/// A directed side of a face's subdivided ring. Unlike a fixed 4-sided
/// polygon, a face may have more than 4 half-edges once its sides are
/// subdivided (§4.D "Edge subdivision matching").
#[derive(Clone, Debug)]
pub(crate) struct HalfEdge {
    pub face: PoolId<Face>,
    pub start: Vector3<f32>,
    pub end: Vector3<f32>,
    /// Which of the face's 4 original sides (before subdivision) this
    /// half-edge lies on.
    pub side: u8,
    /// Parametric position of `start` along that original side, in `[0,1)`.
    pub t0: f32,
    pub t1: f32,
    /// `None` only for the instant between insertion and ring stitching;
    /// every half-edge that survives to be read by a caller has both set.
    pub next: Option<PoolId<HalfEdge>>,
    pub prev: Option<PoolId<HalfEdge>>,
    /// The companion half-edge on an adjacent face of the *same* block
    /// sharing this geometric edge.
    pub neighbor: Option<PoolId<HalfEdge>>,
    /// The matching half-edge on another block's linked face, set once the
    /// two faces are bonded and their subdivisions reconciled.
    pub link: Option<PoolId<HalfEdge>>,
    pub crease: bool,
    pub patch: Option<usize>,
}

/// A face of a block: a ring of half-edges plus the bonding state used by
/// the linker (§3 "Face (block graph)").
#[derive(Clone, Debug)]
pub(crate) struct Face {
    pub block: PoolId<Block>,
    pub face_index: u8,
    /// Set once [`BlockGraph::build_face`] finishes stitching the ring.
    /// Permanently `None` for a subface probe (see `next_subface`), which
    /// never has a ring of its own; every other method observes a fully
    /// built top-level face and may unwrap it.
    pub ring_start: Option<PoolId<HalfEdge>>,
    pub link: Option<PoolId<Face>>,
    pub link_corner: u8,
    pub center: Vector3<f32>,
    pub direction: Vector3<f32>,
    pub force: f32,
    /// Corner positions, for a subface probe only — a top-level face's
    /// corners are instead looked up from its block via [`FACE_VERTEX`].
    pub corners: Option<[Vector3<f32>; 4]>,
    /// The next subface produced by recursively splitting this face for
    /// the ray-cast matching rule (§3 "Face (block graph)": "a pointer to
    /// the next subface produced by recursive splitting"; §4.D rule 3).
    /// `None` on an unsubdivided face, and on the last subface of a chain.
    pub next_subface: Option<PoolId<Face>>,
}

impl Face {
    pub fn ring_start(&self) -> PoolId<HalfEdge> {
        self.ring_start.expect("face ring is built before it is ever read")
    }
}

impl HalfEdge {
    pub fn next(&self) -> PoolId<HalfEdge> {
        self.next.expect("half-edge ring is stitched before it is ever read")
    }

    pub fn prev(&self) -> PoolId<HalfEdge> {
        self.prev.expect("half-edge ring is stitched before it is ever read")
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Block {
    pub spec: BlockSpec,
    pub faces: [Option<PoolId<Face>>; 6],
    pub aabb: Aabb,
}

impl Block {
    pub fn face(&self, index: usize) -> PoolId<Face> {
        self.faces[index].expect("block faces are built before they are ever read")
    }
}

/// The block graph (§4.D): every input block's per-block topology, plus
/// the face links and subdivided edges produced by [`BlockGraph::build`].
pub struct BlockGraph {
    pub(crate) blocks: Pool<Block>,
    pub(crate) faces: Pool<Face>,
    pub(crate) half_edges: Pool<HalfEdge>,
    pub(crate) tol: Tolerances,
}

impl BlockGraph {
    /// Builds the full graph from a set of blocks: per-block topology,
    /// spatial-grid neighbor search, face-to-face linking, edge
    /// subdivision matching. Call [`BlockGraph::emit_mesh`] afterward to
    /// produce the quad control mesh.
    pub fn build(specs: Vec<BlockSpec>, tol: Tolerances) -> BlockGraph {
        let mut graph = BlockGraph {
            blocks: Pool::new(),
            faces: Pool::new(),
            half_edges: Pool::new(),
            tol,
        };
        for spec in specs {
            graph.add_block(spec);
        }
        link::link_all(&mut graph);
        subdivide::reconcile_all(&mut graph);
        graph
    }

    fn add_block(&mut self, spec: BlockSpec) -> PoolId<Block> {
        let aabb = Aabb::from_points(spec.corners.iter()).padded_by_fraction(0.25);

        let block_id = self.blocks.insert(Block {
            spec: spec.clone(),
            faces: [None; 6],
            aabb,
        });

        let mut faces = [None; 6];
        for (face_index, slot) in faces.iter_mut().enumerate() {
            *slot = Some(self.build_face(block_id, face_index as u8, &spec));
        }
        self.blocks.get_mut(block_id).faces = faces;

        let faces: [PoolId<Face>; 6] = [
            faces[0].unwrap(),
            faces[1].unwrap(),
            faces[2].unwrap(),
            faces[3].unwrap(),
            faces[4].unwrap(),
            faces[5].unwrap(),
        ];

        // wire same-block neighbor pointers: two half-edges with the same
        // edge id on different faces of this block are companions.
        self.link_same_block_neighbors(&faces);

        block_id
    }

    fn build_face(&mut self, block: PoolId<Block>, face_index: u8, spec: &BlockSpec) -> PoolId<Face> {
        let corners: [Vector3<f32>; 4] = [
            spec.corners[FACE_VERTEX[face_index as usize][0]],
            spec.corners[FACE_VERTEX[face_index as usize][1]],
            spec.corners[FACE_VERTEX[face_index as usize][2]],
            spec.corners[FACE_VERTEX[face_index as usize][3]],
        ];
        let center = (corners[0] + corners[1] + corners[2] + corners[3]) / 4.0;
        let direction = face_direction(&corners);
        let level = spec.subdivisions[face_index as usize].min(4) as usize;
        let force = face_force(&corners);

        let face_id = self.faces.insert(Face {
            block,
            face_index,
            ring_start: None,
            link: None,
            link_corner: 0,
            center,
            direction,
            force,
            corners: None,
            next_subface: None,
        });

        // build one half-edge chain per side, subdivided per SUB_FRACS.
        let mut side_chains: [Vec<PoolId<HalfEdge>>; 4] = Default::default();
        for side in 0..4usize {
            let a = corners[side];
            let b = corners[(side + 1) % 4];
            let edge_id = FACE_EDGE[face_index as usize][side];
            let crease = spec.edge_is_crease(edge_id);

            let mut fracs = vec![0.0f32];
            for i in 0..3 {
                let f = SUB_FRACS[level][i];
                if f < 1.0 - 1e-6 {
                    fracs.push(f);
                }
            }
            fracs.push(1.0);

            for w in fracs.windows(2) {
                let (t0, t1) = (w[0], w[1]);
                let start = a + (b - a) * t0;
                let end = a + (b - a) * t1;
                let he = self.half_edges.insert(HalfEdge {
                    face: face_id,
                    start,
                    end,
                    side: side as u8,
                    t0,
                    t1,
                    next: None,
                    prev: None,
                    neighbor: None,
                    link: None,
                    crease,
                    patch: None,
                });
                side_chains[side].push(he);
            }
        }

        // stitch next/prev around the whole ring (all 4 sides concatenated).
        let ring: Vec<PoolId<HalfEdge>> = side_chains.into_iter().flatten().collect();
        let n = ring.len();
        for i in 0..n {
            let cur = ring[i];
            let next = ring[(i + 1) % n];
            let prev = ring[(i + n - 1) % n];
            self.half_edges.get_mut(cur).next = Some(next);
            self.half_edges.get_mut(cur).prev = Some(prev);
        }
        self.faces.get_mut(face_id).ring_start = Some(ring[0]);

        let subfaces = self.build_subfaces(block, face_index, &corners, level);
        self.faces.get_mut(face_id).next_subface = subfaces;

        face_id
    }

    /// Builds the flat chain of geometric subface probes a subdivided face
    /// needs for the ray-cast matching rule (§4.D rule 3): a `level x
    /// level` grid of quads over the face's parameter space, none of which
    /// ever gains a half-edge ring or takes part in quad emission. Returns
    /// `None` for a face at subdivision level 0 or 1 (§9 SUB_FRACS: "no
    /// interior split"), since then the whole face is its own single cell.
    fn build_subfaces(
        &mut self,
        block: PoolId<Block>,
        face_index: u8,
        corners: &[Vector3<f32>; 4],
        level: usize,
    ) -> Option<PoolId<Face>> {
        let mut breaks = vec![0.0f32];
        for i in 0..3 {
            let f = SUB_FRACS[level][i];
            if f < 1.0 - 1e-6 {
                breaks.push(f);
            }
        }
        breaks.push(1.0);
        if breaks.len() <= 2 {
            return None;
        }

        let mut ids = Vec::new();
        for wv in breaks.windows(2) {
            for wu in breaks.windows(2) {
                let quad = [
                    bilerp(corners, wu[0], wv[0]),
                    bilerp(corners, wu[1], wv[0]),
                    bilerp(corners, wu[1], wv[1]),
                    bilerp(corners, wu[0], wv[1]),
                ];
                let center = (quad[0] + quad[1] + quad[2] + quad[3]) / 4.0;
                let direction = face_direction(&quad);
                let force = face_force(&quad);
                ids.push(self.faces.insert(Face {
                    block,
                    face_index,
                    ring_start: None,
                    link: None,
                    link_corner: 0,
                    center,
                    direction,
                    force,
                    corners: Some(quad),
                    next_subface: None,
                }));
            }
        }

        for i in 0..ids.len() - 1 {
            self.faces.get_mut(ids[i]).next_subface = Some(ids[i + 1]);
        }
        ids.first().cloned()
    }

    /// Within one block, two half-edges on different faces that share an
    /// edge id are each other's `neighbor` (§3 "Half-edge (block graph)").
    /// When a side is subdivided, only its single original (level-0) span
    /// has a same-length counterpart to pair with directly; finer pairing
    /// is left to edge-subdivision matching, which runs after all blocks'
    /// topology (and thus all same-block neighbor pointers) are in place.
    fn link_same_block_neighbors(&mut self, faces: &[PoolId<Face>; 6]) {
        let mut by_edge: std::collections::HashMap<usize, Vec<PoolId<HalfEdge>>> =
            std::collections::HashMap::new();
        for &face_id in faces {
            let ring_start = self.faces.get(face_id).ring_start();
            let mut he = ring_start;
            loop {
                let h = self.half_edges.get(he);
                let face_index = self.faces.get(h.face).face_index as usize;
                let edge_id = FACE_EDGE[face_index][h.side as usize];
                by_edge.entry(edge_id).or_insert_with(Vec::new).push(he);
                he = h.next();
                if he == ring_start {
                    break;
                }
            }
        }
        for (_edge_id, mut hes) in by_edge {
            // pair up whole-side (unsubdivided) half-edges belonging to
            // different faces; these are the only ones guaranteed to have
            // a single matching companion before subdivision reconciles
            // finer spans.
            hes.retain(|&id| {
                let h = self.half_edges.get(id);
                (h.t1 - h.t0 - 1.0).abs() < 1e-6
            });
            if hes.len() == 2 {
                let (a, b) = (hes[0], hes[1]);
                self.half_edges.get_mut(a).neighbor = Some(b);
                self.half_edges.get_mut(b).neighbor = Some(a);
            }
        }
    }
}

/// Outward direction of a quad reconstructed from its two mid-edge vectors
/// (§4.D "Face-to-face matching rules"): `normalize((p1-p0)/2 + (p2-p3)/2)
/// x ((p3-p0)/2 + (p2-p1)/2)`.
pub(crate) fn face_direction(corners: &[Vector3<f32>; 4]) -> Vector3<f32> {
    let tanu = (corners[1] - corners[0]) * 0.5 + (corners[2] - corners[3]) * 0.5;
    let tanv = (corners[3] - corners[0]) * 0.5 + (corners[2] - corners[1]) * 0.5;
    tanu.cross(tanv).normalize()
}

/// The force threshold controlling how far apart two faces' centers may be
/// and still bond (§4.D rule 4, §9 "the source sets those scalars
/// implicitly via a helper whose provenance is unclear... the spec treats
/// the threshold as an opaque input"): here, a fraction of the face's own
/// diagonal squared, so differently sized blocks bond at a distance
/// proportional to their own scale.
pub(crate) fn face_force(corners: &[Vector3<f32>; 4]) -> f32 {
    let diag = (corners[2] - corners[0]).magnitude();
    (diag * 0.5) * (diag * 0.5)
}

/// Bilinear interpolation over a face's four corners in its own `(u, v)`
/// parameter space (the same `p0=(0,0), p1=(1,0), p2=(1,1), p3=(0,1)`
/// winding as [`FACE_UV`]), used to carve a subdivided face into its grid
/// of subface probes.
fn bilerp(corners: &[Vector3<f32>; 4], u: f32, v: f32) -> Vector3<f32> {
    corners[0] * ((1.0 - u) * (1.0 - v))
        + corners[1] * (u * (1.0 - v))
        + corners[2] * (u * v)
        + corners[3] * ((1.0 - u) * v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_cube(origin: Vector3<f32>, group: u32) -> BlockSpec {
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
            group,
        )
    }

    #[test]
    fn single_block_has_six_faces_each_a_closed_quad_ring() {
        let graph = BlockGraph::build(vec![unit_cube(Vector3::new(0.0, 0.0, 0.0), 0)], Tolerances::standard());
        assert_eq!(graph.blocks.len(), 1);
        assert_eq!(graph.faces.len(), 6);
        for (_, face) in graph.faces.iter() {
            let ring_start = face.ring_start();
            let mut he = ring_start;
            let mut count = 0;
            loop {
                count += 1;
                he = graph.half_edges.get(he).next();
                if he == ring_start {
                    break;
                }
                assert!(count <= 4, "unsubdivided face should have exactly 4 half-edges");
            }
            assert_eq!(count, 4);
        }
    }

    #[test]
    fn same_block_neighbor_pointers_are_symmetric() {
        let graph = BlockGraph::build(vec![unit_cube(Vector3::new(0.0, 0.0, 0.0), 0)], Tolerances::standard());
        for (id, he) in graph.half_edges.iter() {
            if let Some(n) = he.neighbor {
                assert_eq!(graph.half_edges.get(n).neighbor, Some(id));
            }
        }
    }

    #[test]
    fn adjacent_blocks_link_their_facing_faces() {
        let a = unit_cube(Vector3::new(0.0, 0.0, 0.0), 0);
        let b = unit_cube(Vector3::new(1.0, 0.0, 0.0), 0);
        let graph = BlockGraph::build(vec![a, b], Tolerances::standard());

        let linked_pairs = graph
            .faces
            .iter()
            .filter(|(_, f)| f.link.is_some())
            .count();
        assert!(linked_pairs >= 2, "the two facing faces on each block should link");

        for (id, f) in graph.faces.iter() {
            if let Some(other) = f.link {
                assert_eq!(graph.faces.get(other).link, Some(id), "link relation must be symmetric");
            }
        }
    }
}
