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

//! T-vertex removal (§4.A): after joining fragments with mismatched
//! subdivisions, a vertex of one polygon can land in the interior of an
//! edge of another, coplanar, polygon. Left alone this is a cracked mesh;
//! this pass finds every such vertex and splices it into the edge it lies
//! on.

use super::Polygon;
use crate::math::Tolerances;

use cgmath::{InnerSpace, Vector3};

/// Walks every edge of every polygon in `polys` and, for every vertex of
/// every *other* polygon sharing the same tag, inserts that vertex into the
/// edge if it projects into the edge's interior within tolerance.
///
/// The parametric tolerance (`tol.t_vertex_parametric`, ~2^-14) is
/// deliberately tight to avoid inserting vertices that are really corners;
/// the reconstructed point is then checked against `tol.precision`, which is
/// a much looser bound. This asymmetric pair is intentional (§9).
pub fn remove_t_vertices(polys: &mut [Polygon], tol: &Tolerances) {
    // group indices by tag so we only test vertices against polygons that
    // actually share a plane tag (the spec scopes the check to "every other
    // polygon with the same plane tag").
    let n = polys.len();
    for i in 0..n {
        let mut insertions: Vec<(usize, Vector3<f32>)> = Vec::new();
        {
            let target = &polys[i];
            let tag = target.tag();
            let verts = target.vertices().to_vec();
            let edge_count = verts.len();

            for e in 0..edge_count {
                let a = verts[e];
                let b = verts[(e + 1) % edge_count];
                let edge = b - a;
                let edge_len2 = edge.dot(edge);
                if edge_len2 < 1e-20 {
                    continue;
                }

                for (j, other) in polys.iter().enumerate() {
                    if j == i || other.tag() != tag {
                        continue;
                    }
                    for &v in other.vertices() {
                        let t = (v - a).dot(edge) / edge_len2;
                        if t > tol.t_vertex_parametric && t < 1.0 - tol.t_vertex_parametric {
                            let reconstructed = a + edge * t;
                            if crate::math::approx_eq(reconstructed, v, tol.precision) {
                                insertions.push((e, v));
                            }
                        }
                    }
                }
            }
        }

        if insertions.is_empty() {
            continue;
        }

        // insert in descending edge-index order so earlier insertion indices
        // in the same polygon stay valid as we splice.
        insertions.sort_by(|a, b| b.0.cmp(&a.0));
        insertions.dedup_by(|a, b| a.0 == b.0 && crate::math::approx_eq(a.1, b.1, tol.precision));

        let verts = polys[i].vertices_mut();
        for (edge_idx, v) in insertions {
            // don't insert a duplicate of an existing vertex.
            let already_present = verts
                .iter()
                .any(|existing| crate::math::approx_eq(*existing, v, tol.precision));
            if already_present {
                continue;
            }
            verts.insert(edge_idx + 1, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Polygon;

    #[test]
    fn inserts_midpoint_t_vertex() {
        let coarse = Polygon::new(
            vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(2.0, 0.0, 0.0),
                Vector3::new(2.0, 2.0, 0.0),
                Vector3::new(0.0, 2.0, 0.0),
            ],
            7,
        );
        let fine = Polygon::new(
            vec![
                Vector3::new(2.0, 0.0, 0.0),
                Vector3::new(2.0, 2.0, 0.0),
                Vector3::new(1.0, 3.0, 0.0),
                Vector3::new(1.0, 0.0, 0.0),
            ],
            7,
        );

        let mut polys = vec![coarse, fine];
        let tol = Tolerances::standard();
        remove_t_vertices(&mut polys, &tol);

        let has_t_vertex = polys[0]
            .vertices()
            .iter()
            .any(|v| crate::math::approx_eq(*v, Vector3::new(1.0, 0.0, 0.0), tol.precision));
        assert!(has_t_vertex, "expected T-vertex to be spliced into the coarse polygon's edge");
    }

    #[test]
    fn does_not_insert_near_corner() {
        let a = Polygon::new(
            vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(2.0, 0.0, 0.0),
                Vector3::new(2.0, 2.0, 0.0),
                Vector3::new(0.0, 2.0, 0.0),
            ],
            9,
        );
        // a vertex that sits essentially right on a's corner.
        let b = Polygon::new(
            vec![
                Vector3::new(0.00001, 0.0, 0.0),
                Vector3::new(3.0, 0.0, 0.0),
                Vector3::new(3.0, 3.0, 0.0),
            ],
            9,
        );
        let before = a.vertices().len();
        let mut polys = vec![a, b];
        remove_t_vertices(&mut polys, &Tolerances::standard());
        assert_eq!(polys[0].vertices().len(), before);
    }
}
