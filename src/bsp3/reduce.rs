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

//! Boundary reduction (§4.C "Reduction"): welding the polygon soup that
//! comes out of extraction back into minimal, non-overlapping faces.
//!
//! Fragments sharing a plane and identifier tag are grouped; within a
//! group, vertices are snapped together within `precision`, edges are
//! counted with multiplicity, and any edge shared by two fragments
//! (multiplicity > 1, meaning it's interior to the merged face) is
//! dropped. What's left retraces into the final polygon(s) for that group.

use crate::geom::{remove_t_vertices, Polygon};
use crate::math::Tolerances;

use cgmath::Vector3;
use std::collections::HashMap;

pub struct Reducer {
    tol: Tolerances,
}

impl Reducer {
    pub fn new(tol: Tolerances) -> Reducer {
        Reducer { tol }
    }

    /// Reduces a boundary soup into welded, T-vertex-clean polygons.
    pub fn reduce(&self, soup: Vec<Polygon>) -> Vec<Polygon> {
        let mut groups: HashMap<u32, Vec<Polygon>> = HashMap::new();
        for poly in soup {
            groups.entry(poly.tag()).or_insert_with(Vec::new).push(poly);
        }

        let mut result = Vec::new();
        for (_, group) in groups {
            result.extend(self.reduce_group(group));
        }

        remove_t_vertices(&mut result, &self.tol);
        result
    }

    fn reduce_group(&self, group: Vec<Polygon>) -> Vec<Polygon> {
        if group.is_empty() {
            return Vec::new();
        }
        let tag = group[0].tag();
        let plane = *group[0].plane();

        let mut canonical: Vec<Vector3<f32>> = Vec::new();
        let snap = |canonical: &mut Vec<Vector3<f32>>, p: Vector3<f32>, precision: f32| -> usize {
            for (i, c) in canonical.iter().enumerate() {
                if crate::math::approx_eq(*c, p, precision) {
                    return i;
                }
            }
            canonical.push(p);
            canonical.len() - 1
        };

        // directed edge -> occurrence count, keyed by the unordered vertex
        // pair so an edge traversed in opposite directions by two adjoining
        // fragments is recognized as the same edge.
        let mut edge_count: HashMap<(usize, usize), u32> = HashMap::new();
        // the last-seen directed orientation for each unordered key; only
        // meaningful for keys that end up with multiplicity 1.
        let mut edge_dir: HashMap<(usize, usize), (usize, usize)> = HashMap::new();

        for poly in &group {
            let idxs: Vec<usize> = poly
                .vertices()
                .iter()
                .map(|v| snap(&mut canonical, *v, self.tol.precision))
                .collect();
            let n = idxs.len();
            for i in 0..n {
                let a = idxs[i];
                let b = idxs[(i + 1) % n];
                if a == b {
                    continue;
                }
                let key = if a < b { (a, b) } else { (b, a) };
                *edge_count.entry(key).or_insert(0) += 1;
                edge_dir.insert(key, (a, b));
            }
        }

        // adjacency among surviving (multiplicity-1) edges, keyed by
        // originating vertex.
        let mut next: HashMap<usize, usize> = HashMap::new();
        for (key, count) in &edge_count {
            if *count == 1 {
                let (a, b) = edge_dir[key];
                next.insert(a, b);
            }
        }

        let mut visited: std::collections::HashSet<usize> = std::collections::HashSet::new();
        let mut polys = Vec::new();

        let starts: Vec<usize> = next.keys().cloned().collect();
        for start in starts {
            if visited.contains(&start) {
                continue;
            }
            let mut loop_verts = Vec::new();
            let mut cur = start;
            loop {
                if visited.contains(&cur) {
                    break;
                }
                visited.insert(cur);
                loop_verts.push(canonical[cur]);
                match next.get(&cur) {
                    Some(&n) => cur = n,
                    None => break,
                }
                if cur == start {
                    break;
                }
            }
            if loop_verts.len() >= 3 {
                polys.push(Polygon::with_plane(collapse_collinear(loop_verts), plane, tag));
            }
        }

        polys
    }
}

/// Merges consecutive edges whose normalized directions are nearly
/// identical (dot product within 1e-5 of 1.0), per §4.C "Reduction".
fn collapse_collinear(verts: Vec<Vector3<f32>>) -> Vec<Vector3<f32>> {
    use cgmath::InnerSpace;

    let n = verts.len();
    if n < 3 {
        return verts;
    }

    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let prev = verts[(i + n - 1) % n];
        let cur = verts[i];
        let next = verts[(i + 1) % n];

        let in_dir = (cur - prev).normalize();
        let out_dir = (next - cur).normalize();
        if (in_dir.dot(out_dir) - 1.0).abs() < 1e-5 {
            // cur lies on the straight run between prev and next; drop it.
            continue;
        }
        out.push(cur);
    }

    if out.len() >= 3 {
        out
    } else {
        verts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Plane;

    #[test]
    fn welds_two_triangles_sharing_an_edge_into_a_quad() {
        let plane = Plane::new(cgmath::Vector3::unit_z(), 0.0);
        let a = Polygon::with_plane(
            vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(1.0, 1.0, 0.0),
            ],
            plane,
            1,
        );
        let b = Polygon::with_plane(
            vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1.0, 1.0, 0.0),
                Vector3::new(0.0, 1.0, 0.0),
            ],
            plane,
            1,
        );

        let reducer = Reducer::new(Tolerances::standard());
        let result = reducer.reduce(vec![a, b]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].vertices().len(), 4);
    }

    #[test]
    fn single_polygon_group_passes_through_unchanged_in_vertex_count() {
        let plane = Plane::new(cgmath::Vector3::unit_z(), 0.0);
        let tri = Polygon::with_plane(
            vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(0.0, 1.0, 0.0),
            ],
            plane,
            2,
        );
        let reducer = Reducer::new(Tolerances::standard());
        let result = reducer.reduce(vec![tri]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].vertices().len(), 3);
    }
}
