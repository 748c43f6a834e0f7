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

//! Convex shape/shape collision via GJK with an EPA fallback for
//! penetrating configurations (§4.E).

pub mod contact;
pub mod epa;
pub mod gjk;
pub mod support;

pub use self::contact::{CollisionResult, Contact, ContactSet, PersistentContact};
pub use self::gjk::{GjkResult, MinkowskiVertex};
pub use self::support::{Shape, Transform};

use cgmath::{InnerSpace, Vector3};

/// A stable ordinal used to decide which shape becomes "A" in a pair
/// (§4.E "Dispatcher": "swapping so the lower-typed shape is A").
fn type_rank(shape: &Shape) -> u32 {
    match shape {
        Shape::Sphere { .. } => 0,
        Shape::Box { .. } => 1,
        Shape::Cylinder { .. } => 2,
        Shape::Cone { .. } => 3,
        Shape::ConvexHull { .. } => 4,
        Shape::HullOfSpheres { .. } => 5,
        Shape::TriangleMesh { .. } => 6,
        Shape::Group { .. } => 7,
    }
}

/// Collides two shapes under their respective world transforms, with
/// optional per-shape margins and a cached separating-axis seed from the
/// previous frame.
pub fn collide(
    shape_a: &Shape,
    xf_a: &Transform,
    margin_a: f32,
    shape_b: &Shape,
    xf_b: &Transform,
    margin_b: f32,
    seed: Vector3<f32>,
) -> CollisionResult {
    // shape groups are handled ahead of the type-rank ordering below, since
    // a group has no single convex support function of its own: each part
    // recurses back through `collide` individually (§4.E "Dispatcher").
    if let Shape::Group { parts } = shape_a {
        return collide_group(parts, xf_a, margin_a, shape_b, xf_b, margin_b, seed);
    }
    if let Shape::Group { parts } = shape_b {
        return swap_result(collide_group(parts, xf_b, margin_b, shape_a, xf_a, margin_a, -seed));
    }

    if type_rank(shape_b) < type_rank(shape_a) {
        let result = collide_ordered(shape_b, xf_b, margin_b, shape_a, xf_a, margin_a, -seed);
        return swap_result(result);
    }
    collide_ordered(shape_a, xf_a, margin_a, shape_b, xf_b, margin_b, seed)
}

fn collide_ordered(
    shape_a: &Shape,
    xf_a: &Transform,
    margin_a: f32,
    shape_b: &Shape,
    xf_b: &Transform,
    margin_b: f32,
    seed: Vector3<f32>,
) -> CollisionResult {
    if let (Shape::Sphere { radius: ra }, Shape::Sphere { radius: rb }) = (shape_a, shape_b) {
        return sphere_sphere(*ra, xf_a, margin_a, *rb, xf_b, margin_b);
    }
    if let (Shape::Sphere { radius }, Shape::Box { half_extents }) = (shape_a, shape_b) {
        return sphere_box(*radius, xf_a, margin_a, *half_extents, xf_b, margin_b);
    }

    match gjk::gjk(shape_a, xf_a, margin_a, shape_b, xf_b, margin_b, seed) {
        GjkResult::Separated { axis } => CollisionResult::Separated { axis },
        GjkResult::Touching { witness_a, witness_b, normal } => CollisionResult::Contact(Contact {
            witness_a_world: witness_a,
            witness_b_world: witness_b,
            witness_a_local: xf_a.inverse_point(witness_a),
            witness_b_local: xf_b.inverse_point(witness_b),
            normal,
            depth: 0.0,
        }),
        GjkResult::Penetrating { simplex } => {
            let contact = epa::epa(shape_a, xf_a, margin_a, shape_b, xf_b, margin_b, simplex);
            CollisionResult::Contact(contact)
        }
    }
}

fn swap_result(result: CollisionResult) -> CollisionResult {
    match result {
        CollisionResult::Separated { axis } => CollisionResult::Separated { axis: -axis },
        CollisionResult::Contact(c) => CollisionResult::Contact(Contact {
            witness_a_world: c.witness_b_world,
            witness_b_world: c.witness_a_world,
            witness_a_local: c.witness_b_local,
            witness_b_local: c.witness_a_local,
            normal: -c.normal,
            depth: c.depth,
        }),
    }
}

fn collide_group(
    parts: &[(Box<Shape>, Transform)],
    group_xf: &Transform,
    group_margin: f32,
    other: &Shape,
    other_xf: &Transform,
    other_margin: f32,
    seed: Vector3<f32>,
) -> CollisionResult {
    let mut best: Option<CollisionResult> = None;
    for (shape, local_xf) in parts {
        let world_translation = group_xf.apply(local_xf.translation);
        let world_rotation = group_xf.rotation * local_xf.rotation;
        let part_xf = Transform::new(world_translation, world_rotation);

        let result = collide(shape, &part_xf, group_margin, other, other_xf, other_margin, seed);
        match &result {
            CollisionResult::Contact(c) => match &best {
                Some(CollisionResult::Contact(prev)) if prev.depth >= c.depth => {}
                _ => best = Some(result),
            },
            CollisionResult::Separated { .. } => {
                if best.is_none() {
                    best = Some(result);
                }
            }
        }
    }
    best.unwrap_or(CollisionResult::Separated { axis: seed })
}

/// Fast path: sphere/sphere against summed radii (§4.E "Dispatcher").
fn sphere_sphere(
    ra: f32,
    xf_a: &Transform,
    margin_a: f32,
    rb: f32,
    xf_b: &Transform,
    margin_b: f32,
) -> CollisionResult {
    let ca = xf_a.translation;
    let cb = xf_b.translation;
    let delta = ca - cb;
    let dist = delta.magnitude();
    let ra_eff = ra + margin_a;
    let rb_eff = rb + margin_b;
    let sum = ra_eff + rb_eff;

    if dist >= sum {
        let axis = if dist > 1e-9 { delta / dist } else { Vector3::new(1.0, 0.0, 0.0) };
        return CollisionResult::Separated { axis };
    }

    let normal = if dist > 1e-9 { delta / dist } else { Vector3::new(0.0, 1.0, 0.0) };
    let witness_a_world = ca - normal * ra_eff;
    let witness_b_world = cb + normal * rb_eff;
    CollisionResult::Contact(Contact {
        witness_a_world,
        witness_b_world,
        witness_a_local: xf_a.inverse_point(witness_a_world),
        witness_b_local: xf_b.inverse_point(witness_b_world),
        normal,
        depth: sum - dist,
    })
}

/// Fast path: sphere/box by clamping the sphere center into the box's
/// local AABB and classifying inside vs surface (§4.E "Dispatcher").
fn sphere_box(
    radius: f32,
    xf_sphere: &Transform,
    margin_sphere: f32,
    half_extents: Vector3<f32>,
    xf_box: &Transform,
    margin_box: f32,
) -> CollisionResult {
    let local_center = xf_box.inverse_point(xf_sphere.translation);
    let he = half_extents + Vector3::new(margin_box, margin_box, margin_box);

    let clamped = Vector3::new(
        local_center.x.max(-he.x).min(he.x),
        local_center.y.max(-he.y).min(he.y),
        local_center.z.max(-he.z).min(he.z),
    );

    let inside = clamped == local_center;
    let r_eff = radius + margin_sphere;

    if inside {
        // find the nearest face to push out along.
        let d = he - Vector3::new(local_center.x.abs(), local_center.y.abs(), local_center.z.abs());
        let (axis_local, penetration) = if d.x <= d.y && d.x <= d.z {
            (Vector3::new(local_center.x.signum(), 0.0, 0.0), d.x)
        } else if d.y <= d.z {
            (Vector3::new(0.0, local_center.y.signum(), 0.0), d.y)
        } else {
            (Vector3::new(0.0, 0.0, local_center.z.signum()), d.z)
        };
        let normal = xf_box.apply_vector(axis_local);
        let witness_b_local = local_center + Vector3::new(axis_local.x * d.x, axis_local.y * d.y, axis_local.z * d.z);
        let witness_b_world = xf_box.apply(witness_b_local);
        let witness_a_world = xf_sphere.translation - normal * r_eff;
        return CollisionResult::Contact(Contact {
            witness_a_world,
            witness_b_world,
            witness_a_local: xf_sphere.inverse_point(witness_a_world),
            witness_b_local,
            normal,
            depth: penetration + r_eff,
        });
    }

    let delta_local = local_center - clamped;
    let dist = delta_local.magnitude();
    if dist >= r_eff {
        let axis = xf_box.apply_vector(if dist > 1e-9 { delta_local / dist } else { Vector3::new(1.0, 0.0, 0.0) });
        return CollisionResult::Separated { axis };
    }

    let normal_local = if dist > 1e-9 { delta_local / dist } else { Vector3::new(1.0, 0.0, 0.0) };
    let normal = xf_box.apply_vector(normal_local);
    let witness_b_world = xf_box.apply(clamped);
    let witness_a_world = xf_sphere.translation - normal * r_eff;
    CollisionResult::Contact(Contact {
        witness_a_world,
        witness_b_world,
        witness_a_local: xf_sphere.inverse_point(witness_a_world),
        witness_b_local: clamped,
        normal,
        depth: r_eff - dist,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Quaternion;

    #[test]
    fn sphere_sphere_fast_path_detects_overlap() {
        let a = Shape::Sphere { radius: 1.0 };
        let b = Shape::Sphere { radius: 1.0 };
        let xf_a = Transform::identity();
        let xf_b = Transform::new(Vector3::new(1.5, 0.0, 0.0), Quaternion::new(1.0, 0.0, 0.0, 0.0));
        match collide(&a, &xf_a, 0.0, &b, &xf_b, 0.0, Vector3::new(1.0, 0.0, 0.0)) {
            CollisionResult::Contact(c) => assert!((c.depth - 0.5).abs() < 1e-4),
            other => panic!("expected contact, got {:?}", other),
        }
    }

    #[test]
    fn sphere_box_detects_surface_contact() {
        let sphere = Shape::Sphere { radius: 1.0 };
        let cube = Shape::Box { half_extents: Vector3::new(1.0, 1.0, 1.0) };
        let xf_sphere = Transform::new(Vector3::new(2.5, 0.0, 0.0), Quaternion::new(1.0, 0.0, 0.0, 0.0));
        let xf_box = Transform::identity();
        match collide(&sphere, &xf_sphere, 0.0, &cube, &xf_box, 0.0, Vector3::new(-1.0, 0.0, 0.0)) {
            CollisionResult::Contact(c) => assert!((c.depth - 0.5).abs() < 1e-3),
            other => panic!("expected surface contact, got {:?}", other),
        }
    }

    #[test]
    fn sphere_box_detects_separation() {
        let sphere = Shape::Sphere { radius: 1.0 };
        let cube = Shape::Box { half_extents: Vector3::new(1.0, 1.0, 1.0) };
        let xf_sphere = Transform::new(Vector3::new(10.0, 0.0, 0.0), Quaternion::new(1.0, 0.0, 0.0, 0.0));
        let xf_box = Transform::identity();
        match collide(&sphere, &xf_sphere, 0.0, &cube, &xf_box, 0.0, Vector3::new(-1.0, 0.0, 0.0)) {
            CollisionResult::Separated { .. } => {}
            other => panic!("expected separation, got {:?}", other),
        }
    }
}
