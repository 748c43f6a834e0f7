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

//! Boundary extraction (§4.C "Boundary extraction"): walking a built
//! [`super::Bsp3Tree`] and turning its coplanar polygon lists back into a
//! disjoint surface.

use super::Node;
use crate::alloc::{Pool, PoolId};
use crate::bsp2::Bsp2Tree;
use crate::geom::{Polygon, PolyClass};
use crate::math::Tolerances;

use cgmath::{InnerSpace, Vector2, Vector3};

/// Clips a single polygon against the subtree rooted at `node`, pushing
/// every surviving fragment whose resting leaf label equals `keep_if_in`
/// into `out`. This is the primitive both boundary extraction and
/// [`super::Bsp3Tree::clip_polygons`] are built from.
pub(crate) fn clip_polygon(
    pool: &Pool<Node>,
    node: PoolId<Node>,
    poly: Polygon,
    tol: &Tolerances,
    keep_if_in: bool,
    out: &mut Vec<Polygon>,
) {
    match pool.get(node) {
        Node::Leaf(is_in) => {
            if *is_in == keep_if_in {
                out.push(poly);
            }
        }
        Node::Internal { plane, front, back, .. } => {
            match poly.classify(plane, tol.epsilon) {
                PolyClass::On | PolyClass::Front => clip_polygon(pool, *front, poly, tol, keep_if_in, out),
                PolyClass::OnFlipped | PolyClass::Back => clip_polygon(pool, *back, poly, tol, keep_if_in, out),
                PolyClass::Spanning => {
                    let (f, b) = poly.split(plane, tol.epsilon);
                    if let Some(f) = f {
                        clip_polygon(pool, *front, f, tol, keep_if_in, out);
                    }
                    if let Some(b) = b {
                        clip_polygon(pool, *back, b, tol, keep_if_in, out);
                    }
                }
            }
        }
    }
}

/// Walks the whole tree, collecting every node's coplanar polygons, clipping
/// each against the subtree on its own side and reconvexifying what
/// survives with a plane-local BSP2 pass (§4.C). Returns the unreduced
/// boundary soup; callers run it through [`super::reduce::Reducer`].
pub(crate) fn extract(pool: &Pool<Node>, root: PoolId<Node>, tol: &Tolerances) -> Vec<Polygon> {
    let mut soup = Vec::new();
    walk(pool, root, tol, &mut soup);
    soup
}

fn walk(pool: &Pool<Node>, node: PoolId<Node>, tol: &Tolerances, soup: &mut Vec<Polygon>) {
    let (plane, on, on_flipped, front, back) = match pool.get(node) {
        Node::Leaf(_) => return,
        Node::Internal { plane, on, on_flipped, front, back } => {
            (*plane, on.clone(), on_flipped.clone(), *front, *back)
        }
    };

    let mut outward_survivors = Vec::new();
    for poly in on {
        clip_polygon(pool, front, poly, tol, false, &mut outward_survivors);
    }
    let mut inward_survivors = Vec::new();
    for poly in on_flipped {
        clip_polygon(pool, back, poly, tol, true, &mut inward_survivors);
    }

    if !outward_survivors.is_empty() {
        soup.extend(reconvexify(&plane, outward_survivors, tol));
    }
    if !inward_survivors.is_empty() {
        soup.extend(reconvexify(&plane, inward_survivors, tol));
    }

    walk(pool, front, tol, soup);
    walk(pool, back, tol, soup);
}

/// Projects `polys` (all coplanar with `plane`) into the plane's local 2D
/// frame, runs them through a BSP2 union to eliminate double-cover, then
/// lifts the result back into 3D, preserving `polys`' common tag.
fn reconvexify(plane: &crate::math::Plane, polys: Vec<Polygon>, tol: &Tolerances) -> Vec<Polygon> {
    let tag = polys[0].tag();
    let normal = plane.normal();

    // build an orthonormal basis (u, v) for the plane.
    let helper = if normal.x.abs() < 0.9 { Vector3::unit_x() } else { Vector3::unit_y() };
    let u = normal.cross(helper).normalize();
    let v = normal.cross(u).normalize();
    let origin = normal * plane.dist();

    let to_2d = |p: Vector3<f32>| -> Vector2<f32> {
        let d = p - origin;
        Vector2::new(d.dot(u), d.dot(v))
    };
    let to_3d = |p: Vector2<f32>| -> Vector3<f32> { origin + u * p.x + v * p.y };

    let mut tree = Bsp2Tree::with_epsilon(tol.epsilon);
    for poly in &polys {
        let ring: Vec<Vector2<f32>> = poly.vertices().iter().map(|p| to_2d(*p)).collect();
        tree.add_polygon(ring);
    }

    // a bound comfortably larger than anything this group of coplanar
    // polygons could span.
    let mut radius = 1.0f32;
    for poly in &polys {
        for p in poly.vertices() {
            radius = radius.max((*p - origin).magnitude() * 2.0 + 1.0);
        }
    }

    tree.compute_convex_polygons(radius)
        .into_iter()
        .filter(|ring| ring.len() >= 3)
        .map(|ring| {
            let verts: Vec<Vector3<f32>> = ring.into_iter().map(to_3d).collect();
            Polygon::with_plane(verts, *plane, tag)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::Bsp3Tree;
    use crate::math::Tolerances;
    use cgmath::Vector3;

    fn cube_polys(min: f32, max: f32) -> Vec<crate::geom::Polygon> {
        use crate::geom::Polygon;
        let p = |x: f32, y: f32, z: f32| Vector3::new(x, y, z);
        vec![
            Polygon::new(vec![p(min, min, min), p(min, min, max), p(min, max, max), p(min, max, min)], 0),
            Polygon::new(vec![p(max, min, min), p(max, max, min), p(max, max, max), p(max, min, max)], 1),
            Polygon::new(vec![p(min, min, min), p(max, min, min), p(max, min, max), p(min, min, max)], 2),
            Polygon::new(vec![p(min, max, min), p(min, max, max), p(max, max, max), p(max, max, min)], 3),
            Polygon::new(vec![p(min, min, min), p(min, max, min), p(max, max, min), p(max, min, min)], 4),
            Polygon::new(vec![p(min, min, max), p(max, min, max), p(max, max, max), p(min, max, max)], 5),
        ]
    }

    #[test]
    fn extracted_boundary_vertices_lie_on_cube_faces() {
        let tree = Bsp3Tree::build(cube_polys(-1.0, 1.0), Tolerances::standard());
        let soup = super::extract(tree.pool(), tree.root(), tree.tolerances());
        assert!(!soup.is_empty());
        for poly in &soup {
            for v in poly.vertices() {
                let on_face = (v.x.abs() - 1.0).abs() < 1e-3
                    || (v.y.abs() - 1.0).abs() < 1e-3
                    || (v.z.abs() - 1.0).abs() < 1e-3;
                assert!(on_face, "vertex {:?} not on any cube face", v);
            }
        }
    }
}
