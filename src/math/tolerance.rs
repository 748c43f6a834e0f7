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

/// The numeric tolerances threaded through BSP3, the reducer, T-vertex
/// removal, and the block graph's edge-subdivision matcher.
///
/// `precision` and `epsilon` are kept deliberately distinct per §9 of the
/// spec: `precision` decides when two vertices are "the same point",
/// `epsilon` decides which side of a plane a point falls on. Conflating them
/// loses robustness on thin features, because a precision tight enough for
/// vertex identity is usually far tighter than the epsilon a plane test can
/// tolerate against float error accumulated over a deep tree.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerances {
    /// Distance below which two vertices are considered identical.
    pub precision: f32,
    /// Distance below which a point is considered to lie on a plane.
    pub epsilon: f32,
    /// Parametric tolerance (fraction of edge length) for T-vertex
    /// insertion; deliberately tight (~2^-14) to avoid inserting vertices
    /// that are really corners. See §4.A and §9's "Open questions".
    pub t_vertex_parametric: f32,
}

impl Tolerances {
    /// Defaults matching the ranges described in §4.C/§9 of the spec:
    /// `precision` an order of magnitude (or two) looser than `epsilon`.
    pub fn standard() -> Tolerances {
        Tolerances {
            precision: 1.0 / 1024.0,
            epsilon: 1.0 / 32768.0,
            t_vertex_parametric: 1.0 / 16384.0,
        }
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Tolerances::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precision_looser_than_epsilon() {
        let t = Tolerances::standard();
        assert!(t.precision > t.epsilon);
    }
}
