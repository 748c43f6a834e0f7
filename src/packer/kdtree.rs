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

//! The greedy kd-tree packer (§4.G "Greedy kd-tree"): a binary tree of
//! free rectangles. Inserting descends to a leaf that can contain the
//! rectangle (optionally rotated 90°) and splits it into the placed area
//! plus up to two leftover leaves.

use super::{grow, PackError, PackLimits, PackResult, PlacedRect, RectSpec};

/// A node of the free-space tree. Leaves that have already accepted a
/// rectangle are marked `used` rather than removed, so the tree never needs
/// to shrink.
enum KdNode {
    Leaf {
        x: u32,
        y: u32,
        w: u32,
        h: u32,
        used: bool,
    },
    Split {
        a: Box<KdNode>,
        b: Box<KdNode>,
    },
}

impl KdNode {
    fn root(w: u32, h: u32) -> KdNode {
        KdNode::Leaf { x: 0, y: 0, w, h, used: false }
    }

    /// Tries to place a `w x h` rectangle somewhere under this node,
    /// returning its placement (with `flipped` set if 90°-rotated) on
    /// success.
    fn insert(&mut self, w: u32, h: u32) -> Option<PlacedRect> {
        match self {
            KdNode::Split { a, b } => a.insert(w, h).or_else(|| b.insert(w, h)),
            KdNode::Leaf { x, y, w: lw, h: lh, used } => {
                if *used {
                    return None;
                }

                let (pw, ph, flipped) = if w <= *lw && h <= *lh {
                    (w, h, false)
                } else if h <= *lw && w <= *lh {
                    (h, w, true)
                } else {
                    return None;
                };

                let (x, y, lw_v, lh_v) = (*x, *y, *lw, *lh);

                if pw == lw_v && ph == lh_v {
                    *used = true;
                    return Some(PlacedRect { x, y, width: w, height: h, flipped });
                }

                // rule (§4.G): split vertically first (side-by-side) when
                // the leftover horizontal strip would be wider than the
                // leftover vertical strip, else split horizontally first.
                let dw = lw_v - pw;
                let dh = lh_v - ph;

                let (mut placed, mut rest) = if dw > dh {
                    (
                        KdNode::Leaf { x, y, w: pw, h: lh_v, used: false },
                        KdNode::Leaf { x: x + pw, y, w: dw, h: lh_v, used: false },
                    )
                } else {
                    (
                        KdNode::Leaf { x, y, w: lw_v, h: ph, used: false },
                        KdNode::Leaf { x, y: y + ph, w: lw_v, h: dh, used: false },
                    )
                };

                // `placed` may itself need a second split if it is wider or
                // taller than the rectangle we're placing (edge-exact on
                // only one axis): recurse into it once more.
                let result = placed.insert(w, h);
                *self = KdNode::Split { a: Box::new(placed), b: Box::new(rest) };
                result
            }
        }
    }
}

pub fn pack(rects: &[RectSpec], limits: &PackLimits) -> Result<PackResult, PackError> {
    let mut width = limits.initial_width;
    let mut height = limits.initial_height;

    loop {
        if let Some(result) = try_pack(rects, width, height) {
            return Ok(result);
        }

        let (nw, nh) = grow(width, height, limits.power_of_two, 1);
        if nw > limits.max_dim || nh > limits.max_dim {
            let atlas_so_far = try_pack_partial(rects, width, height);
            return Err(PackError { attempted_size: (nw, nh), atlas_so_far });
        }
        width = nw;
        height = nh;
    }
}

fn try_pack(rects: &[RectSpec], width: u32, height: u32) -> Option<PackResult> {
    let mut root = KdNode::root(width, height);
    let mut placements = Vec::with_capacity(rects.len());
    for r in rects {
        placements.push(root.insert(r.width, r.height)?);
    }
    Some(PackResult { width, height, placements })
}

/// Packs as many leading rectangles as fit at `width x height`, stopping at
/// the first one that doesn't — the "atlas-so-far" returned on exhaustion
/// (§7 "Resource exhaustion").
fn try_pack_partial(rects: &[RectSpec], width: u32, height: u32) -> PackResult {
    let mut root = KdNode::root(width, height);
    let mut placements = Vec::new();
    for r in rects {
        match root.insert(r.width, r.height) {
            Some(p) => placements.push(p),
            None => break,
        }
    }
    PackResult { width, height, placements }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(w: u32, h: u32) -> RectSpec {
        RectSpec { width: w, height: h }
    }

    #[test]
    fn packs_four_squares_without_overlap() {
        let rects = vec![rect(64, 32), rect(64, 32), rect(64, 32), rect(64, 32)];
        let limits = PackLimits::power_of_two(128, 128);
        let result = pack(&rects, &limits).expect("should fit");
        assert_eq!(result.placements.len(), 4);
        for i in 0..result.placements.len() {
            for j in (i + 1)..result.placements.len() {
                assert!(!overlaps(&result.placements[i], &result.placements[j]));
            }
        }
        for p in &result.placements {
            assert!(p.x + p.width <= result.width);
            assert!(p.y + p.height <= result.height);
        }
    }

    #[test]
    fn fifth_rectangle_exhausts_the_atlas_limit() {
        let rects = vec![rect(64, 32), rect(64, 32), rect(64, 32), rect(64, 32), rect(64, 32)];
        let limits = PackLimits::power_of_two(128, 128);
        let err = pack(&rects, &limits).unwrap_err();
        assert_eq!(err.atlas_so_far.width, 128);
    }

    #[test]
    fn flips_a_rectangle_that_only_fits_rotated() {
        // 20x150 only fits a 150x20 atlas when rotated 90°.
        let rects = vec![rect(20, 150)];
        let limits = PackLimits { initial_width: 150, initial_height: 20, max_dim: 150, power_of_two: false };
        let result = pack(&rects, &limits).expect("should fit rotated");
        assert!(result.placements[0].flipped);
    }

    fn overlaps(a: &PlacedRect, b: &PlacedRect) -> bool {
        a.x < b.x + b.width && b.x < a.x + a.width && a.y < b.y + b.height && b.y < a.y + a.height
    }
}
