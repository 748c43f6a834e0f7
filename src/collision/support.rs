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

//! The closed shape sum type and its per-variant support function (§4.E
//! "Support function", §9 "Shape hierarchy"). A `enum` with one arm per
//! primitive, rather than a trait object, so the set of collidable shapes
//! is closed and every dispatch site is exhaustively checked by the
//! compiler.

use cgmath::{InnerSpace, Matrix3, Quaternion, Rotation, Vector3};

/// A rigid transform: orientation then translation.
#[derive(Copy, Clone, Debug)]
pub struct Transform {
    pub translation: Vector3<f32>,
    pub rotation: Quaternion<f32>,
}

impl Transform {
    pub fn identity() -> Transform {
        Transform {
            translation: Vector3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::new(1.0, 0.0, 0.0, 0.0),
        }
    }

    pub fn new(translation: Vector3<f32>, rotation: Quaternion<f32>) -> Transform {
        Transform { translation, rotation }
    }

    pub fn apply(&self, p: Vector3<f32>) -> Vector3<f32> {
        self.rotation.rotate_vector(p) + self.translation
    }

    pub fn apply_vector(&self, v: Vector3<f32>) -> Vector3<f32> {
        self.rotation.rotate_vector(v)
    }

    pub fn inverse_vector(&self, v: Vector3<f32>) -> Vector3<f32> {
        self.rotation.conjugate().rotate_vector(v)
    }

    pub fn inverse_point(&self, p: Vector3<f32>) -> Vector3<f32> {
        self.rotation.conjugate().rotate_vector(p - self.translation)
    }

    pub fn as_matrix(&self) -> Matrix3<f32> {
        Matrix3::from(self.rotation)
    }
}

/// The closed set of collidable primitives (§9 "Shape hierarchy").
/// Triangle-mesh and hull-of-spheres leaves carry their own local data
/// rather than referencing an external acceleration structure; broadphase
/// culling down to a leaf is the caller's responsibility.
#[derive(Clone, Debug)]
pub enum Shape {
    Sphere { radius: f32 },
    Box { half_extents: Vector3<f32> },
    Cylinder { radius: f32, half_height: f32 },
    Cone { radius: f32, half_height: f32 },
    ConvexHull { points: Vec<Vector3<f32>> },
    HullOfSpheres { spheres: Vec<(Vector3<f32>, f32)> },
    TriangleMesh { triangles: Vec<[Vector3<f32>; 3]> },
    /// A rigid group of sub-shapes, each collided in its own group-local
    /// frame (§4.E "Dispatcher").
    Group { parts: Vec<(Box<Shape>, Transform)> },
}

impl Shape {
    /// The local-space support point: the point of the shape furthest in
    /// direction `d` (which need not be normalized).
    pub fn local_support(&self, d: Vector3<f32>) -> Vector3<f32> {
        match self {
            Shape::Sphere { radius } => {
                let n = safe_normalize(d);
                n * *radius
            }
            Shape::Box { half_extents } => Vector3::new(
                half_extents.x * d.x.signum(),
                half_extents.y * d.y.signum(),
                half_extents.z * d.z.signum(),
            ),
            Shape::Cylinder { radius, half_height } => {
                let lateral = Vector3::new(d.x, 0.0, d.z);
                let lateral = if lateral.magnitude2() > 1e-12 {
                    lateral.normalize() * *radius
                } else {
                    Vector3::new(0.0, 0.0, 0.0)
                };
                Vector3::new(lateral.x, half_height * d.y.signum(), lateral.z)
            }
            Shape::Cone { radius, half_height } => {
                // support of a cone with apex at +half_height, base circle
                // at -half_height: compare apex against the furthest base
                // rim point.
                let apex = Vector3::new(0.0, *half_height, 0.0);
                let lateral = Vector3::new(d.x, 0.0, d.z);
                let rim = if lateral.magnitude2() > 1e-12 {
                    let l = lateral.normalize() * *radius;
                    Vector3::new(l.x, -half_height, l.z)
                } else {
                    Vector3::new(0.0, -half_height, 0.0)
                };
                if apex.dot(d) >= rim.dot(d) {
                    apex
                } else {
                    rim
                }
            }
            Shape::ConvexHull { points } => {
                let mut best = points.get(0).cloned().unwrap_or(Vector3::new(0.0, 0.0, 0.0));
                let mut best_dot = best.dot(d);
                for p in points.iter().skip(1) {
                    let dd = p.dot(d);
                    if dd > best_dot {
                        best_dot = dd;
                        best = *p;
                    }
                }
                best
            }
            Shape::HullOfSpheres { spheres } => {
                let n = safe_normalize(d);
                let mut best = Vector3::new(0.0, 0.0, 0.0);
                let mut best_dot = f32::NEG_INFINITY;
                for (center, radius) in spheres {
                    let candidate = *center + n * *radius;
                    let dd = candidate.dot(d);
                    if dd > best_dot {
                        best_dot = dd;
                        best = candidate;
                    }
                }
                best
            }
            Shape::TriangleMesh { triangles } => {
                let mut best = Vector3::new(0.0, 0.0, 0.0);
                let mut best_dot = f32::NEG_INFINITY;
                for tri in triangles {
                    for v in tri {
                        let dd = v.dot(d);
                        if dd > best_dot {
                            best_dot = dd;
                            best = *v;
                        }
                    }
                }
                best
            }
            Shape::Group { parts } => {
                // not generally convex; only meaningful as a coarse bound
                // (the dispatcher collides each part individually instead
                // of treating the group as one convex shape).
                let mut best = Vector3::new(0.0, 0.0, 0.0);
                let mut best_dot = f32::NEG_INFINITY;
                for (shape, local_xf) in parts {
                    let p = local_xf.apply(shape.local_support(local_xf.inverse_vector(d)));
                    let dd = p.dot(d);
                    if dd > best_dot {
                        best_dot = dd;
                        best = p;
                    }
                }
                best
            }
        }
    }

    /// World-space support point under `transform`, with margin `m`
    /// applied as `support + m * unit(d)` (§4.E).
    pub fn support(&self, transform: &Transform, d: Vector3<f32>, margin: f32) -> Vector3<f32> {
        let local_d = transform.inverse_vector(d);
        let local_p = self.local_support(local_d);
        let world_p = transform.apply(local_p);
        if margin > 0.0 {
            world_p + safe_normalize(d) * margin
        } else {
            world_p
        }
    }
}

fn safe_normalize(d: Vector3<f32>) -> Vector3<f32> {
    let len2 = d.magnitude2();
    if len2 > 1e-12 {
        d / len2.sqrt()
    } else {
        Vector3::new(0.0, 0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_support_scales_with_radius() {
        let s = Shape::Sphere { radius: 2.0 };
        let p = s.local_support(Vector3::new(1.0, 0.0, 0.0));
        assert!((p.magnitude() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn box_support_picks_correct_octant_corner() {
        let b = Shape::Box { half_extents: Vector3::new(1.0, 2.0, 3.0) };
        let p = b.local_support(Vector3::new(-1.0, 1.0, -1.0));
        assert_eq!(p, Vector3::new(-1.0, 2.0, -3.0));
    }

    #[test]
    fn world_support_respects_translation() {
        let s = Shape::Sphere { radius: 1.0 };
        let t = Transform::new(Vector3::new(5.0, 0.0, 0.0), Quaternion::new(1.0, 0.0, 0.0, 0.0));
        let p = s.support(&t, Vector3::new(1.0, 0.0, 0.0), 0.0);
        assert!((p.x - 6.0).abs() < 1e-5);
    }
}
