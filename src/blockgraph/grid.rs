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

//! A uniform spatial grid over padded block AABBs (§4.D "Neighborhood
//! search"), used to cut the O(n²) face-matching search down to pairs of
//! blocks whose padded bounds actually overlap.
//!
//! The original engine's grid is hierarchical (coarser cells for larger
//! blocks); this is a single uniform grid sized to the average block
//! extent, a simplification acceptable because it still produces an exact
//! candidate list, just with a slightly higher false-positive rate among
//! very unevenly sized blocks.

use crate::alloc::PoolId;
use crate::math::Aabb;

use std::collections::HashMap;

use cgmath::Vector3;

use super::Block;

type Cell = (i32, i32, i32);

/// Candidate-pair index over a set of blocks' padded AABBs.
pub(crate) struct Grid {
    cell_size: f32,
    cells: HashMap<Cell, Vec<PoolId<Block>>>,
}

impl Grid {
    pub fn build(blocks: &[(PoolId<Block>, Aabb)]) -> Grid {
        let cell_size = average_extent(blocks).max(1e-3);
        let mut cells: HashMap<Cell, Vec<PoolId<Block>>> = HashMap::new();
        for (id, aabb) in blocks {
            for cell in cells_touched(*aabb, cell_size) {
                cells.entry(cell).or_insert_with(Vec::new).push(*id);
            }
        }
        Grid { cell_size, cells }
    }

    /// All distinct unordered pairs of blocks sharing at least one grid
    /// cell, i.e. whose padded AABBs may overlap.
    pub fn candidate_pairs(&self) -> Vec<(PoolId<Block>, PoolId<Block>)> {
        let mut seen = std::collections::HashSet::new();
        let mut pairs = Vec::new();
        for occupants in self.cells.values() {
            for i in 0..occupants.len() {
                for j in (i + 1)..occupants.len() {
                    let (a, b) = (occupants[i], occupants[j]);
                    let key = if a.index() < b.index() { (a, b) } else { (b, a) };
                    if seen.insert((key.0.index(), key.1.index())) {
                        pairs.push(key);
                    }
                }
            }
        }
        pairs
    }

    #[cfg(test)]
    fn cell_size(&self) -> f32 {
        self.cell_size
    }
}

fn average_extent(blocks: &[(PoolId<Block>, Aabb)]) -> f32 {
    if blocks.is_empty() {
        return 1.0;
    }
    let total: Vector3<f32> = blocks.iter().map(|(_, a)| a.extent()).sum();
    let avg = total / blocks.len() as f32;
    (avg.x + avg.y + avg.z) / 3.0
}

fn cells_touched(aabb: Aabb, cell_size: f32) -> Vec<Cell> {
    let lo = to_cell(aabb.min(), cell_size);
    let hi = to_cell(aabb.max(), cell_size);
    let mut out = Vec::new();
    for x in lo.0..=hi.0 {
        for y in lo.1..=hi.1 {
            for z in lo.2..=hi.2 {
                out.push((x, y, z));
            }
        }
    }
    out
}

fn to_cell(p: Vector3<f32>, cell_size: f32) -> Cell {
    (
        (p.x / cell_size).floor() as i32,
        (p.y / cell_size).floor() as i32,
        (p.z / cell_size).floor() as i32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::Pool;

    #[test]
    fn adjacent_blocks_share_a_cell() {
        let mut pool: Pool<Block> = Pool::new();
        let a = Aabb::new(Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0));
        let b = Aabb::new(Vector3::new(0.9, 0.0, 0.0), Vector3::new(1.9, 1.0, 1.0));
        let far = Aabb::new(Vector3::new(50.0, 50.0, 50.0), Vector3::new(51.0, 51.0, 51.0));

        // block contents are irrelevant to the grid; only ids and AABBs matter.
        let id_a = pool.insert(dummy_block());
        let id_b = pool.insert(dummy_block());
        let id_far = pool.insert(dummy_block());

        let grid = Grid::build(&[(id_a, a), (id_b, b), (id_far, far)]);
        let pairs = grid.candidate_pairs();
        assert!(pairs.contains(&(id_a, id_b)) || pairs.contains(&(id_b, id_a)));
        assert!(!pairs.iter().any(|(x, y)| {
            (*x == id_a || *x == id_b) && *y == id_far || (*y == id_a || *y == id_b) && *x == id_far
        }));
        assert!(grid.cell_size() > 0.0);
    }

    fn dummy_block() -> Block {
        Block {
            spec: super::super::BlockSpec::unit(
                [Vector3::new(0.0, 0.0, 0.0); 8],
                0,
            ),
            faces: [None; 6],
            aabb: Aabb::new(Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0)),
        }
    }
}
