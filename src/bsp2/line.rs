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

use cgmath::{InnerSpace, Vector2};
use std::ops::Neg;

/// The 2D analog of [`crate::math::Plane`]: an oriented splitting line given
/// as a unit normal and signed distance from the origin.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Line2 {
    normal: Vector2<f32>,
    dist: f32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Line2Side {
    Front,
    Back,
}

impl Neg for Line2Side {
    type Output = Line2Side;
    fn neg(self) -> Line2Side {
        match self {
            Line2Side::Front => Line2Side::Back,
            Line2Side::Back => Line2Side::Front,
        }
    }
}

impl Line2 {
    pub fn new(normal: Vector2<f32>, dist: f32) -> Line2 {
        Line2 { normal, dist }
    }

    /// Builds the line through `a` and `b`, oriented so that the interior of
    /// a counter-clockwise-wound polygon lies on the front side.
    pub fn from_points(a: Vector2<f32>, b: Vector2<f32>) -> Line2 {
        let dir = b - a;
        // left-hand normal of (b - a): rotate -90 degrees, so a CCW ring's
        // interior (to the left of travel) reports as Front.
        let normal = Vector2::new(dir.y, -dir.x).normalize();
        let dist = normal.dot(a);
        Line2 { normal, dist }
    }

    pub fn normal(&self) -> Vector2<f32> {
        self.normal
    }

    pub fn dist(&self) -> f32 {
        self.dist
    }

    pub fn point_dist(&self, p: Vector2<f32>) -> f32 {
        self.normal.dot(p) - self.dist
    }

    pub fn point_side(&self, p: Vector2<f32>) -> Line2Side {
        if self.point_dist(p) >= 0.0 {
            Line2Side::Front
        } else {
            Line2Side::Back
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ccw_square_edge_has_interior_on_front() {
        // bottom edge of a CCW square from (-1,-1) to (1,-1): interior (0,0)
        // should be Front.
        let line = Line2::from_points(Vector2::new(-1.0, -1.0), Vector2::new(1.0, -1.0));
        assert_eq!(line.point_side(Vector2::new(0.0, 0.0)), Line2Side::Front);
        assert_eq!(line.point_side(Vector2::new(0.0, -5.0)), Line2Side::Back);
    }
}
