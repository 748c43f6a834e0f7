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

//! A 2D binary space partition (§4.C₂), used by BSP3 to reconvexify the
//! polygon soup produced at each plane during boundary extraction.
//!
//! Structurally identical to BSP3 (splitting line instead of splitting
//! plane, 2D polygon fragments instead of 3D ones), but built as a plain
//! recursive enum rather than an arena: BSP2 trees here are always
//! short-lived, rebuilt fresh for each BSP3 plane, so there's no pool
//! lifecycle to manage the way there is for BSP3 (§9 "Ownership cycles").

mod line;

pub use self::line::{Line2, Line2Side};

use cgmath::{InnerSpace, Vector2};

const DEFAULT_EPSILON: f32 = 1.0 / 32768.0;

/// A convex or simple fragment of a 2D polygon: an ordered vertex ring.
pub type Polygon2 = Vec<Vector2<f32>>;

fn classify(poly: &Polygon2, line: &Line2, epsilon: f32) -> Poly2Class {
    let mut min_d = f32::INFINITY;
    let mut max_d = f32::NEG_INFINITY;
    for v in poly {
        let d = line.point_dist(*v);
        min_d = min_d.min(d);
        max_d = max_d.max(d);
    }
    if min_d > -epsilon {
        Poly2Class::Front
    } else if max_d < epsilon {
        Poly2Class::Back
    } else {
        Poly2Class::Spanning
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Poly2Class {
    Front,
    Back,
    Spanning,
}

/// Splits a polygon by a 2D line, mirroring [`crate::geom::Polygon::split`].
fn split(poly: &Polygon2, line: &Line2, epsilon: f32) -> (Option<Polygon2>, Option<Polygon2>) {
    let mut front = Vec::new();
    let mut back = Vec::new();

    let n = poly.len();
    for i in 0..n {
        let a = poly[i];
        let b = poly[(i + 1) % n];

        let da = line.point_dist(a);
        let db = line.point_dist(b);
        let a_on = da.abs() <= epsilon;
        let b_on = db.abs() <= epsilon;

        if a_on {
            front.push(a);
            back.push(a);
        } else if da > epsilon {
            front.push(a);
        } else {
            back.push(a);
        }

        if b_on {
            continue;
        }

        if !a_on && (da > epsilon) != (db > epsilon) {
            let denom = line.normal().dot(b - a);
            if denom.abs() > 1e-12 {
                let t = -da / denom;
                let ix = a + t * (b - a);
                front.push(ix);
                back.push(ix);
            }
        }
    }

    let front = if front.len() >= 3 { Some(front) } else { None };
    let back = if back.len() >= 3 { Some(back) } else { None };
    (front, back)
}

fn line_of(poly: &Polygon2, edge: usize) -> Line2 {
    let n = poly.len();
    let a = poly[edge];
    let b = poly[(edge + 1) % n];
    Line2::from_points(a, b)
}

/// A node of a [`Bsp2Tree`]: either an internal split or one of the two
/// leaf sentinels.
#[derive(Clone, Debug)]
pub enum Node2 {
    Internal {
        line: Line2,
        coplanar: Vec<Polygon2>,
        back: Box<Node2>,
        front: Box<Node2>,
    },
    In,
    Out,
}

/// A 2D BSP tree over the plane, recording the convex decomposition induced
/// by whichever polygons have been added to it.
#[derive(Clone, Debug)]
pub struct Bsp2Tree {
    root: Node2,
    epsilon: f32,
}

impl Bsp2Tree {
    /// An empty tree: the whole plane is OUT.
    pub fn empty() -> Bsp2Tree {
        Bsp2Tree {
            root: Node2::Out,
            epsilon: DEFAULT_EPSILON,
        }
    }

    pub fn with_epsilon(epsilon: f32) -> Bsp2Tree {
        Bsp2Tree {
            root: Node2::Out,
            epsilon,
        }
    }

    /// Builds a tree whose IN region is the interior of `poly` (a simple,
    /// possibly non-convex polygon, wound counter-clockwise).
    pub fn build(poly: Polygon2, epsilon: f32) -> Bsp2Tree {
        let mut tree = Bsp2Tree::with_epsilon(epsilon);
        tree.add_polygon(poly);
        tree
    }

    /// Unions `poly`'s interior into this tree's IN region.
    pub fn add_polygon(&mut self, poly: Polygon2) {
        let epsilon = self.epsilon;
        let old_root = std::mem::replace(&mut self.root, Node2::Out);
        self.root = merge_union(old_root, vec![poly], epsilon);
    }

    /// Returns whether `p` lies in the IN region of the tree.
    pub fn point_in(&self, p: Vector2<f32>) -> bool {
        point_in_node(&self.root, p)
    }

    /// Emits the convex decomposition of the tree's IN region (§4.C₂
    /// "compute convex polygons"): one convex polygon per IN leaf, each the
    /// intersection of all ancestor half-planes, clipped against a large
    /// bounding square.
    pub fn compute_convex_polygons(&self, bound_radius: f32) -> Vec<Polygon2> {
        let bound = vec![
            Vector2::new(-bound_radius, -bound_radius),
            Vector2::new(bound_radius, -bound_radius),
            Vector2::new(bound_radius, bound_radius),
            Vector2::new(-bound_radius, bound_radius),
        ];
        let mut out = Vec::new();
        collect_convex(&self.root, bound, self.epsilon, &mut out);
        out
    }
}

fn point_in_node(node: &Node2, p: Vector2<f32>) -> bool {
    match node {
        Node2::In => true,
        Node2::Out => false,
        Node2::Internal { line, front, back, .. } => {
            if line.point_side(p) == Line2Side::Front {
                point_in_node(front, p)
            } else {
                point_in_node(back, p)
            }
        }
    }
}

fn collect_convex(node: &Node2, region: Polygon2, epsilon: f32, out: &mut Vec<Polygon2>) {
    match node {
        Node2::Out => {}
        Node2::In => {
            if region.len() >= 3 {
                out.push(region);
            }
        }
        Node2::Internal { line, front, back, .. } => {
            if let (Some(f), _) = split(&region, line, epsilon) {
                collect_convex(front, f, epsilon, out);
            }
            if let (_, Some(b)) = split(&region, line, epsilon) {
                collect_convex(back, b, epsilon, out);
            }
            // region entirely on one side: classify as a whole and recurse
            // into the side that keeps it, since `split` only returns
            // fragments when the region actually straddles the line.
            match classify(&region, line, epsilon) {
                Poly2Class::Front => collect_convex(front, region, epsilon, out),
                Poly2Class::Back => collect_convex(back, region, epsilon, out),
                Poly2Class::Spanning => {}
            }
        }
    }
}

/// Builds a fresh subtree from a set of coplanar (2D: all of them, trivially)
/// polygon fragments, analogous to BSP3's initial build.
fn build_node(polys: Vec<Polygon2>, epsilon: f32) -> Node2 {
    if polys.is_empty() {
        return Node2::Out;
    }

    let root_poly = &polys[0];
    let line = line_of(root_poly, 0);

    let mut coplanar = Vec::new();
    let mut front_polys = Vec::new();
    let mut back_polys = Vec::new();

    for poly in polys {
        match classify(&poly, &line, epsilon) {
            Poly2Class::Front => front_polys.push(poly),
            Poly2Class::Back => back_polys.push(poly),
            Poly2Class::Spanning => {
                let (f, b) = split(&poly, &line, epsilon);
                if let Some(f) = f {
                    front_polys.push(f);
                }
                if let Some(b) = b {
                    back_polys.push(b);
                }
            }
        }
    }
    coplanar.push(root_poly.clone());

    let front = if front_polys.is_empty() {
        Node2::In
    } else {
        build_node(front_polys, epsilon)
    };
    let back = if back_polys.is_empty() {
        Node2::Out
    } else {
        build_node(back_polys, epsilon)
    };

    Node2::Internal {
        line,
        coplanar,
        back: Box::new(back),
        front: Box::new(front),
    }
}

/// Incremental union merge, structurally the 2D analog of BSP3's
/// `merge(op, receiver, operands)` in §4.C.
fn merge_union(receiver: Node2, operands: Vec<Polygon2>, epsilon: f32) -> Node2 {
    match receiver {
        Node2::In => Node2::In,
        Node2::Out => {
            if operands.is_empty() {
                Node2::Out
            } else {
                build_node(operands, epsilon)
            }
        }
        Node2::Internal {
            line,
            mut coplanar,
            back,
            front,
        } => {
            let mut front_ops = Vec::new();
            let mut back_ops = Vec::new();

            for poly in operands {
                match classify(&poly, &line, epsilon) {
                    Poly2Class::Front => front_ops.push(poly),
                    Poly2Class::Back => back_ops.push(poly),
                    Poly2Class::Spanning => {
                        let (f, b) = split(&poly, &line, epsilon);
                        if let Some(f) = f {
                            front_ops.push(f);
                        }
                        if let Some(b) = b {
                            back_ops.push(b);
                        }
                    }
                }
            }

            let new_front = merge_union(*front, front_ops, epsilon);
            let new_back = merge_union(*back, back_ops, epsilon);

            if let (Node2::In, Node2::In) = (&new_front, &new_back) {
                return Node2::In;
            }
            if let (Node2::Out, Node2::Out) = (&new_front, &new_back) {
                return Node2::Out;
            }

            Node2::Internal {
                line,
                coplanar,
                back: Box::new(new_back),
                front: Box::new(new_front),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ccw_square(min: f32, max: f32) -> Polygon2 {
        vec![
            Vector2::new(min, min),
            Vector2::new(max, min),
            Vector2::new(max, max),
            Vector2::new(min, max),
        ]
    }

    #[test]
    fn build_classifies_interior_and_exterior() {
        let tree = Bsp2Tree::build(ccw_square(-1.0, 1.0), DEFAULT_EPSILON);
        assert!(tree.point_in(Vector2::new(0.0, 0.0)));
        assert!(!tree.point_in(Vector2::new(5.0, 5.0)));
    }

    #[test]
    fn union_of_overlapping_squares_covers_both() {
        let mut tree = Bsp2Tree::build(ccw_square(-1.0, 1.0), DEFAULT_EPSILON);
        tree.add_polygon(ccw_square(0.0, 2.0));
        assert!(tree.point_in(Vector2::new(-0.5, -0.5)));
        assert!(tree.point_in(Vector2::new(1.5, 1.5)));
        assert!(!tree.point_in(Vector2::new(3.0, 3.0)));
    }

    #[test]
    fn compute_convex_polygons_nonempty_for_nonempty_tree() {
        let tree = Bsp2Tree::build(ccw_square(-1.0, 1.0), DEFAULT_EPSILON);
        let convex = tree.compute_convex_polygons(100.0);
        assert!(!convex.is_empty());
    }
}
