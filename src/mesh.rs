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

//! The mesh interchange format (§6 "A mesh interchange"): the shape a
//! finished [`crate::blockgraph::ControlMesh`] (post external subdivision)
//! or any other triangulated asset is handed to the renderer in.
//!
//! Mirrors the vertex layout the teacher's `common::mdl`/`common::model`
//! alias-model loader builds from disk, generalized to the per-corner
//! attributes (normal, tangent+handedness, UV) and per-vertex skinning data
//! §6 calls for, plus the index-width and per-material partitioning rule.

use cgmath::{Vector2, Vector3, Vector4};

/// Per-vertex skin weights (§6 "per-vertex bone weights"): up to four bone
/// influences, with `count` giving how many of the four slots are live
/// (unused trailing slots carry weight 0 and are skipped by the skinner).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoneWeights {
    pub weights: [f32; 4],
    pub indices: [u8; 4],
    pub count: u8,
}

impl BoneWeights {
    pub const NONE: BoneWeights = BoneWeights {
        weights: [0.0; 4],
        indices: [0; 4],
        count: 0,
    };
}

impl Default for BoneWeights {
    fn default() -> Self {
        BoneWeights::NONE
    }
}

/// One mesh vertex (§6): position, per-corner normal, per-corner tangent
/// with handedness in `tangent.w`, per-corner UV, and skin weights.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
    pub position: Vector3<f32>,
    pub normal: Vector3<f32>,
    /// `xyz` is the tangent direction; `w` is ±1 handedness, used to
    /// reconstruct the bitangent as `normal.cross(tangent.xyz) * tangent.w`.
    pub tangent: Vector4<f32>,
    pub uv: Vector2<f32>,
    pub bones: BoneWeights,
}

/// Triangle indices for vertex counts that fit in 16 bits use the narrower
/// encoding (§6 "Indices are 16-bit when the vertex count fits, otherwise
/// 32-bit").
#[derive(Clone, Debug, PartialEq)]
pub enum Indices {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl Indices {
    /// Builds the narrowest representation that can hold every index in
    /// `flat`, given `vertex_count` total vertices in the mesh.
    pub fn pack(flat: &[u32], vertex_count: usize) -> Indices {
        if vertex_count <= u16::max_value() as usize + 1 {
            Indices::U16(flat.iter().map(|&i| i as u16).collect())
        } else {
            Indices::U32(flat.to_vec())
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Indices::U16(v) => v.len(),
            Indices::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter<'a>(&'a self) -> Box<dyn Iterator<Item = u32> + 'a> {
        match self {
            Indices::U16(v) => Box::new(v.iter().map(|&i| i as u32)),
            Indices::U32(v) => Box::new(v.iter().cloned()),
        }
    }
}

/// A contiguous run of triangles sharing one material (§6 "triangle indices
/// partitioned into per-material patches").
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialPatch {
    pub material_id: u32,
    pub indices: Indices,
}

/// A complete mesh ready for the GPU: one shared vertex buffer and a set of
/// per-material index partitions.
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub patches: Vec<MaterialPatch>,
}

impl Mesh {
    pub fn new(vertices: Vec<Vertex>) -> Mesh {
        Mesh {
            vertices,
            patches: Vec::new(),
        }
    }

    /// Adds a material patch, packing its indices at the narrowest width
    /// this mesh's current vertex count allows.
    pub fn add_patch(&mut self, material_id: u32, triangle_indices: &[u32]) {
        self.patches.push(MaterialPatch {
            material_id,
            indices: Indices::pack(triangle_indices, self.vertices.len()),
        });
    }

    pub fn triangle_count(&self) -> usize {
        self.patches.iter().map(|p| p.indices.len() / 3).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32, y: f32, z: f32) -> Vertex {
        Vertex {
            position: Vector3::new(x, y, z),
            normal: Vector3::new(0.0, 0.0, 1.0),
            tangent: Vector4::new(1.0, 0.0, 0.0, 1.0),
            uv: Vector2::new(0.0, 0.0),
            bones: BoneWeights::NONE,
        }
    }

    #[test]
    fn small_vertex_count_packs_to_u16() {
        let mesh = Mesh::new(vec![v(0.0, 0.0, 0.0), v(1.0, 0.0, 0.0), v(0.0, 1.0, 0.0)]);
        let idx = Indices::pack(&[0, 1, 2], mesh.vertices.len());
        match idx {
            Indices::U16(_) => {}
            Indices::U32(_) => panic!("expected u16 packing for 3 vertices"),
        }
    }

    #[test]
    fn large_vertex_count_packs_to_u32() {
        let idx = Indices::pack(&[0, 70000, 1], 70001);
        match idx {
            Indices::U32(_) => {}
            Indices::U16(_) => panic!("expected u32 packing above 65536 vertices"),
        }
    }

    #[test]
    fn add_patch_tracks_triangle_count() {
        let mut mesh = Mesh::new(vec![v(0.0, 0.0, 0.0), v(1.0, 0.0, 0.0), v(0.0, 1.0, 0.0)]);
        mesh.add_patch(0, &[0, 1, 2]);
        assert_eq!(mesh.triangle_count(), 1);
    }
}
