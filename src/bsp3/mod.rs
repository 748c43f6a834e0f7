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

//! The 3D binary space partition at the heart of the procedural-solid
//! pipeline (§4.C): incremental CSG union/intersection/difference over a
//! tree of oriented cutting planes, point-in-solid classification, and
//! boundary extraction back into a polygon soup.
//!
//! Nodes live in an [`alloc::Pool`](crate::alloc::Pool) and are addressed by
//! index rather than pointer, so the tree has no ownership cycles to manage
//! and no `Rc`/`RefCell` bookkeeping (§9 "Ownership cycles"). A node is one
//! of two tagged variants, not a pair of singleton leaf objects (§9 "Node
//! polymorphism").

pub mod boundary;
pub mod reduce;

pub use self::reduce::Reducer;

use crate::alloc::{Pool, PoolId};
use crate::geom::{Polygon, PolyClass};
use crate::math::{Plane, Tolerances};

use cgmath::Vector3;

/// Which CSG operation a [`merge`](Bsp3Tree::merge) call is performing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum BspOp {
    Union,
    Intersection,
}

/// A node of a [`Bsp3Tree`]. Internal nodes store the polygons coplanar with
/// their splitting plane, split by orientation (`on` shares the plane's
/// normal, `on_flipped` opposes it); leaves carry only the IN/OUT label of
/// the region they represent.
#[derive(Clone, Debug)]
enum Node {
    Internal {
        plane: Plane,
        on: Vec<Polygon>,
        on_flipped: Vec<Polygon>,
        front: PoolId<Node>,
        back: PoolId<Node>,
    },
    Leaf(bool),
}

/// A 3D CSG tree (§4.C). `true` leaves are IN the solid, `false` leaves are
/// OUT, with the convention that an unflipped plane's front side is OUT and
/// back side is IN.
#[derive(Clone, Debug)]
pub struct Bsp3Tree {
    pool: Pool<Node>,
    root: PoolId<Node>,
    tol: Tolerances,
}

impl Bsp3Tree {
    /// An empty solid: every point is OUT.
    pub fn empty(tol: Tolerances) -> Bsp3Tree {
        let mut pool = Pool::new();
        let root = pool.insert(Node::Leaf(false));
        Bsp3Tree { pool, root, tol }
    }

    /// Builds a tree from a non-empty set of polygons (§4.C "Building a tree
    /// from polygons"). Concave input should be pre-decomposed via
    /// [`crate::bsp2`] before calling this; `build` itself only partitions
    /// by plane, it does not reconvexify.
    pub fn build(polys: Vec<Polygon>, tol: Tolerances) -> Bsp3Tree {
        let mut pool = Pool::new();
        let root = if polys.is_empty() {
            pool.insert(Node::Leaf(false))
        } else {
            build_node(&mut pool, polys, &tol)
        };
        Bsp3Tree { pool, root, tol }
    }

    pub fn tolerances(&self) -> &Tolerances {
        &self.tol
    }

    /// Point-in-solid test (§4.C "Point-in-solid"): descend following the
    /// plane-side test at each internal node, terminating at a leaf.
    pub fn point_in_solid(&self, point: Vector3<f32>) -> bool {
        let mut cur = self.root;
        loop {
            match &self.pool[cur] {
                Node::Leaf(is_in) => return *is_in,
                Node::Internal { plane, front, back, .. } => {
                    cur = if plane.point_dist(point) >= 0.0 {
                        *front
                    } else {
                        *back
                    };
                }
            }
        }
    }

    /// Unions `polys` into this solid.
    pub fn union(&mut self, polys: Vec<Polygon>) {
        self.merge(BspOp::Union, polys);
    }

    /// Intersects this solid with `polys`.
    pub fn intersect(&mut self, polys: Vec<Polygon>) {
        self.merge(BspOp::Intersection, polys);
    }

    /// Subtracts `polys` from this solid, implemented as intersection with
    /// the complement: every input polygon's vertex order (and cached
    /// plane) is reversed before merging (§4.C "Difference").
    pub fn difference(&mut self, polys: Vec<Polygon>) {
        let flipped: Vec<Polygon> = polys.iter().map(Polygon::flipped).collect();
        self.merge(BspOp::Intersection, flipped);
    }

    fn merge(&mut self, op: BspOp, polys: Vec<Polygon>) {
        if polys.is_empty() {
            return;
        }
        let operand_tree = Bsp3Tree::build(polys.clone(), self.tol);
        // the root's fallback pin, used only until recursion reaches a node
        // that already carries a coplanar polygon of its own (§4.C: "any
        // arbitrary operand point when none exists").
        let pinned_point = polys[0].vertices()[0];
        let new_root = merge_node(
            &mut self.pool,
            op,
            self.root,
            polys,
            &operand_tree,
            pinned_point,
            &self.tol,
        );
        self.root = new_root;
    }

    /// Clips `polys` against this tree, keeping only the fragments whose
    /// resting leaf has label `keep_if_in`. A general-purpose utility
    /// underlying boundary extraction, exposed directly because trimming
    /// arbitrary polygons against an existing solid is independently useful
    /// (mesh decals, portal carving).
    pub fn clip_polygons(&self, polys: Vec<Polygon>, keep_if_in: bool) -> Vec<Polygon> {
        let mut out = Vec::new();
        for poly in polys {
            boundary::clip_polygon(&self.pool, self.root, poly, &self.tol, keep_if_in, &mut out);
        }
        out
    }

    /// Surfaces the tree's boundary as a reduced, disjoint polygon soup
    /// (§4.C "Boundary extraction" + "Reduction").
    pub fn boundary(&self) -> Vec<Polygon> {
        let soup = boundary::extract(&self.pool, self.root, &self.tol);
        reduce::Reducer::new(self.tol).reduce(soup)
    }

    pub(crate) fn pool(&self) -> &Pool<Node> {
        &self.pool
    }

    pub(crate) fn root(&self) -> PoolId<Node> {
        self.root
    }
}

/// Builds a subtree from a non-empty polygon list, picking the first
/// polygon's plane as the splitting plane (§4.C).
fn build_node(pool: &mut Pool<Node>, polys: Vec<Polygon>, tol: &Tolerances) -> PoolId<Node> {
    debug_assert!(!polys.is_empty());
    let plane = *polys[0].plane();

    let mut on = Vec::new();
    let mut on_flipped = Vec::new();
    let mut front_polys = Vec::new();
    let mut back_polys = Vec::new();

    for poly in polys {
        match poly.classify(&plane, tol.epsilon) {
            PolyClass::On => on.push(poly),
            PolyClass::OnFlipped => on_flipped.push(poly),
            PolyClass::Front => front_polys.push(poly),
            PolyClass::Back => back_polys.push(poly),
            PolyClass::Spanning => {
                let (f, b) = poly.split(&plane, tol.epsilon);
                if let Some(f) = f {
                    front_polys.push(f);
                }
                if let Some(b) = b {
                    back_polys.push(b);
                }
            }
        }
    }

    // an on_flipped-only node (no normally-oriented coplanar polygon at all)
    // flips which side is IN versus OUT for whichever branch turns out
    // empty (§4.C: "ON_FLIPPED flips the same-orientation flag").
    let same_orientation = !on.is_empty() || on_flipped.is_empty();

    let front = if front_polys.is_empty() {
        pool.insert(Node::Leaf(!same_orientation))
    } else {
        build_node(pool, front_polys, tol)
    };
    let back = if back_polys.is_empty() {
        pool.insert(Node::Leaf(same_orientation))
    } else {
        build_node(pool, back_polys, tol)
    };

    pool.insert(Node::Internal {
        plane,
        on,
        on_flipped,
        front,
        back,
    })
}

/// The recursive `merge(op, receiver, operands)` of §4.C "Incremental CSG".
///
/// Callers always pass a non-empty `operands`: an empty operand list never
/// needs a recursive descent (there is nothing left to classify against
/// deeper planes), so it is resolved directly by [`resolve_empty_branch`]
/// without entering this function at all.
fn merge_node(
    pool: &mut Pool<Node>,
    op: BspOp,
    receiver: PoolId<Node>,
    operands: Vec<Polygon>,
    operand_tree: &Bsp3Tree,
    pinned_point: Vector3<f32>,
    tol: &Tolerances,
) -> PoolId<Node> {
    debug_assert!(!operands.is_empty());
    let node = pool.remove(receiver);
    match node {
        Node::Leaf(is_in) => {
            let keep_unconditionally = match op {
                BspOp::Union => is_in,
                BspOp::Intersection => !is_in,
            };
            if keep_unconditionally {
                pool.insert(Node::Leaf(is_in))
            } else {
                build_node(pool, operands, tol)
            }
        }
        Node::Internal {
            plane,
            mut on,
            mut on_flipped,
            front,
            back,
        } => {
            let mut front_ops = Vec::new();
            let mut back_ops = Vec::new();

            for poly in operands {
                match poly.classify(&plane, tol.epsilon) {
                    PolyClass::On => on.push(poly),
                    PolyClass::OnFlipped => on_flipped.push(poly),
                    PolyClass::Front => front_ops.push(poly),
                    PolyClass::Back => back_ops.push(poly),
                    PolyClass::Spanning => {
                        let (f, b) = poly.split(&plane, tol.epsilon);
                        if let Some(f) = f {
                            front_ops.push(f);
                        }
                        if let Some(b) = b {
                            back_ops.push(b);
                        }
                    }
                }
            }

            // the pin for this node: the centroid of any coplanar polygon
            // already attached here (old or newly merged), falling back to
            // whatever arbitrary operand point an ancestor passed down when
            // this node has never had one (§4.C "Incremental CSG").
            let pin = node_pin(&on, &on_flipped, pinned_point);

            let new_front = if front_ops.is_empty() {
                resolve_empty_branch(pool, op, front, operand_tree, pin)
            } else {
                merge_node(pool, op, front, front_ops, operand_tree, pin, tol)
            };
            let new_back = if back_ops.is_empty() {
                resolve_empty_branch(pool, op, back, operand_tree, pin)
            } else {
                merge_node(pool, op, back, back_ops, operand_tree, pin, tol)
            };

            // reduction: collapse to a single leaf if both children agree.
            if let (Node::Leaf(f), Node::Leaf(b)) = (pool.get(new_front), pool.get(new_back)) {
                if f == b {
                    let label = *f;
                    pool.remove(new_front);
                    pool.remove(new_back);
                    return pool.insert(Node::Leaf(label));
                }
            }

            pool.insert(Node::Internal {
                plane,
                on,
                on_flipped,
                front: new_front,
                back: new_back,
            })
        }
    }
}

/// The centroid of the first coplanar polygon attached to a node (`on`
/// checked before `on_flipped`), or `fallback` when the node carries
/// neither (§4.C "the centroid of any coplanar polygon on the current node,
/// or any arbitrary operand point when none exists").
fn node_pin(on: &[Polygon], on_flipped: &[Polygon], fallback: Vector3<f32>) -> Vector3<f32> {
    on.first()
        .or_else(|| on_flipped.first())
        .map(Polygon::centroid)
        .unwrap_or(fallback)
}

/// Resolves a branch whose operand list came back empty: no operand polygon
/// reaches this branch's region, so the operand solid is constant (all IN or
/// all OUT) over it, and the merge either leaves the receiver's existing
/// branch untouched or replaces it outright with a single leaf — it never
/// recurses into it (§4.C: "an unlabeled empty region only switches to IN
/// [union] / OUT [intersection] if the point test says so").
fn resolve_empty_branch(
    pool: &mut Pool<Node>,
    op: BspOp,
    branch: PoolId<Node>,
    operand_tree: &Bsp3Tree,
    pin: Vector3<f32>,
) -> PoolId<Node> {
    let operand_in = operand_tree.point_in_solid(pin);
    let switches = match op {
        BspOp::Union => operand_in,
        BspOp::Intersection => !operand_in,
    };
    if switches {
        free_subtree(pool, branch);
        pool.insert(Node::Leaf(match op {
            BspOp::Union => true,
            BspOp::Intersection => false,
        }))
    } else {
        branch
    }
}

/// Recursively releases every node of a subtree back to the pool (used when
/// [`resolve_empty_branch`] discards an existing branch wholesale rather
/// than reusing it).
fn free_subtree(pool: &mut Pool<Node>, id: PoolId<Node>) {
    if let Node::Internal { front, back, .. } = pool.remove(id) {
        free_subtree(pool, front);
        free_subtree(pool, back);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube_polys(min: f32, max: f32, tag_base: u32) -> Vec<Polygon> {
        let p = |x: f32, y: f32, z: f32| Vector3::new(x, y, z);
        vec![
            // -X
            Polygon::new(vec![p(min, min, min), p(min, min, max), p(min, max, max), p(min, max, min)], tag_base),
            // +X
            Polygon::new(vec![p(max, min, min), p(max, max, min), p(max, max, max), p(max, min, max)], tag_base + 1),
            // -Y
            Polygon::new(vec![p(min, min, min), p(max, min, min), p(max, min, max), p(min, min, max)], tag_base + 2),
            // +Y
            Polygon::new(vec![p(min, max, min), p(min, max, max), p(max, max, max), p(max, max, min)], tag_base + 3),
            // -Z
            Polygon::new(vec![p(min, min, min), p(min, max, min), p(max, max, min), p(max, min, min)], tag_base + 4),
            // +Z
            Polygon::new(vec![p(min, min, max), p(max, min, max), p(max, max, max), p(min, max, max)], tag_base + 5),
        ]
    }

    #[test]
    fn build_classifies_interior_and_exterior_points() {
        let tree = Bsp3Tree::build(cube_polys(-1.0, 1.0, 0), Tolerances::standard());
        assert!(tree.point_in_solid(Vector3::new(0.0, 0.0, 0.0)));
        assert!(!tree.point_in_solid(Vector3::new(5.0, 5.0, 5.0)));
    }

    #[test]
    fn union_of_disjoint_cubes_covers_both_interiors() {
        let mut tree = Bsp3Tree::build(cube_polys(-2.0, -1.0, 0), Tolerances::standard());
        tree.union(cube_polys(1.0, 2.0, 10));
        assert!(tree.point_in_solid(Vector3::new(-1.5, -1.5, -1.5)));
        assert!(tree.point_in_solid(Vector3::new(1.5, 1.5, 1.5)));
        assert!(!tree.point_in_solid(Vector3::new(0.0, 0.0, 0.0)));
    }

    #[test]
    fn intersection_of_overlapping_cubes_keeps_only_overlap() {
        let mut tree = Bsp3Tree::build(cube_polys(-1.0, 1.0, 0), Tolerances::standard());
        tree.intersect(cube_polys(0.0, 2.0, 10));
        assert!(tree.point_in_solid(Vector3::new(0.5, 0.5, 0.5)));
        assert!(!tree.point_in_solid(Vector3::new(-0.5, -0.5, -0.5)));
        assert!(!tree.point_in_solid(Vector3::new(1.5, 1.5, 1.5)));
    }

    #[test]
    fn difference_carves_out_overlap() {
        let mut tree = Bsp3Tree::build(cube_polys(-1.0, 1.0, 0), Tolerances::standard());
        tree.difference(cube_polys(0.0, 2.0, 10));
        assert!(tree.point_in_solid(Vector3::new(-0.5, -0.5, -0.5)));
        assert!(!tree.point_in_solid(Vector3::new(0.5, 0.5, 0.5)));
    }

    #[test]
    fn boundary_of_single_cube_is_nonempty_and_closed() {
        let tree = Bsp3Tree::build(cube_polys(-1.0, 1.0, 0), Tolerances::standard());
        let boundary = tree.boundary();
        assert!(!boundary.is_empty());
    }
}
