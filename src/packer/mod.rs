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

//! Rectangle packing (§4.G): pack variably-sized rectangles — baked
//! surface detail patches — into a single atlas. Two strategies are
//! offered, [`kdtree`] and [`grouped`]; both report each input
//! rectangle's assigned position and whether it was rotated 90° to fit.

pub mod grouped;
pub mod kdtree;

use std::error::Error as StdError;
use std::fmt;

/// An input rectangle to be packed.
#[derive(Copy, Clone, Debug)]
pub struct RectSpec {
    pub width: u32,
    pub height: u32,
}

/// Where a rectangle landed in the atlas.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PlacedRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// True when the packer rotated the rectangle 90° to make it fit.
    pub flipped: bool,
}

/// Which packing strategy `pack` dispatches to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PackStrategy {
    KdTree,
    GroupedClass,
}

/// A finished atlas: its final dimensions plus one placement per input
/// rectangle, in input order.
#[derive(Clone, Debug)]
pub struct PackResult {
    pub width: u32,
    pub height: u32,
    pub placements: Vec<PlacedRect>,
}

/// Atlas growth policy (§4.G, §7 "Resource exhaustion"): the starting
/// size and the caller's declared ceiling. Packing fails once a retry
/// would exceed `max_dim`.
#[derive(Copy, Clone, Debug)]
pub struct PackLimits {
    pub initial_width: u32,
    pub initial_height: u32,
    pub max_dim: u32,
    /// Require both atlas dimensions to remain powers of two.
    pub power_of_two: bool,
}

impl PackLimits {
    pub fn power_of_two(initial: u32, max_dim: u32) -> PackLimits {
        PackLimits {
            initial_width: initial,
            initial_height: initial,
            max_dim,
            power_of_two: true,
        }
    }
}

/// Atlas resource exhaustion (§7 "Resource exhaustion"): the caller's
/// `max_dim` was reached without fitting every rectangle. Carries the best
/// atlas-so-far, matching the spec's "returns false and the atlas-so-far" —
/// the caller decides whether to retry with a larger limit or fail the
/// build.
#[derive(Debug)]
pub struct PackError {
    pub attempted_size: (u32, u32),
    pub atlas_so_far: PackResult,
}

impl fmt::Display for PackError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "rectangle packer exhausted atlas at {}x{}",
            self.attempted_size.0, self.attempted_size.1
        )
    }
}

impl StdError for PackError {
    fn description(&self) -> &str {
        "rectangle packer exceeded the caller's maximum atlas size"
    }
}

/// Packs `rects` using the chosen strategy, growing and retrying the
/// atlas from scratch on failure until `limits.max_dim` is exceeded.
pub fn pack(
    rects: &[RectSpec],
    strategy: PackStrategy,
    limits: &PackLimits,
) -> Result<PackResult, PackError> {
    match strategy {
        PackStrategy::KdTree => kdtree::pack(rects, limits),
        PackStrategy::GroupedClass => grouped::pack(rects, limits),
    }
}

/// Grows the smaller atlas dimension: doubles it if `power_of_two` is
/// required, otherwise extends it by exactly `deficit` pixels.
fn grow(width: u32, height: u32, power_of_two: bool, deficit: u32) -> (u32, u32) {
    if width <= height {
        (
            if power_of_two { width * 2 } else { width + deficit.max(1) },
            height,
        )
    } else {
        (
            width,
            if power_of_two { height * 2 } else { height + deficit.max(1) },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grow_doubles_the_smaller_dimension_under_power_of_two() {
        assert_eq!(grow(256, 512, true, 0), (512, 512));
        assert_eq!(grow(512, 256, true, 0), (512, 512));
    }

    #[test]
    fn grow_extends_by_deficit_when_not_power_of_two() {
        assert_eq!(grow(100, 200, false, 37), (137, 200));
    }
}
