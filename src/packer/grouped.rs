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

//! The greedy class/group packer (§4.G "Greedy class/group"): free regions
//! are filed into a dictionary keyed by their own `(max_side, min_side)`,
//! and each incoming rectangle donates the oldest region in the smallest
//! qualifying class/group pair.

use super::{grow, PackError, PackLimits, PackResult, PlacedRect, RectSpec};

use std::collections::{BTreeMap, VecDeque};

#[derive(Copy, Clone, Debug)]
struct Region {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

impl Region {
    fn max(&self) -> u32 {
        self.w.max(self.h)
    }
    fn min(&self) -> u32 {
        self.w.min(self.h)
    }
}

/// `class -> (group -> FIFO queue of regions)`, classes keyed by a region's
/// longer side, groups (within a class) keyed by its shorter side. Both
/// levels stay sorted by construction since `BTreeMap` iterates in key
/// order.
struct Dictionary {
    classes: BTreeMap<u32, BTreeMap<u32, VecDeque<Region>>>,
}

impl Dictionary {
    fn new() -> Dictionary {
        Dictionary { classes: BTreeMap::new() }
    }

    fn insert(&mut self, region: Region) {
        self.classes
            .entry(region.max())
            .or_insert_with(BTreeMap::new)
            .entry(region.min())
            .or_insert_with(VecDeque::new)
            .push_back(region);
    }

    /// Finds the smallest class whose max side accommodates
    /// `required_max`, then within it the smallest group whose min side
    /// accommodates `required_min`, and pops its oldest region.
    fn take(&mut self, required_max: u32, required_min: u32) -> Option<Region> {
        let class_key = *self
            .classes
            .range(required_max..)
            .find_map(|(k, groups)| {
                if groups.range(required_min..).any(|(_, q)| !q.is_empty()) {
                    Some(k)
                } else {
                    None
                }
            })?;

        let groups = self.classes.get_mut(&class_key).unwrap();
        let group_key = *groups
            .range(required_min..)
            .find(|(_, q)| !q.is_empty())
            .map(|(k, _)| k)
            .unwrap();

        let queue = groups.get_mut(&group_key).unwrap();
        queue.pop_front()
    }
}

pub fn pack(rects: &[RectSpec], limits: &PackLimits) -> Result<PackResult, PackError> {
    let mut width = limits.initial_width;
    let mut height = limits.initial_height;

    let mut order: Vec<usize> = (0..rects.len()).collect();
    order.sort_by(|&a, &b| {
        let ma = rects[a].width.max(rects[a].height);
        let mb = rects[b].width.max(rects[b].height);
        let na = rects[a].width.min(rects[a].height);
        let nb = rects[b].width.min(rects[b].height);
        mb.cmp(&ma).then(nb.cmp(&na))
    });

    loop {
        match try_pack(rects, &order, width, height) {
            Some(result) => return Ok(result),
            None => {
                let (nw, nh) = grow(width, height, limits.power_of_two, 1);
                if nw > limits.max_dim || nh > limits.max_dim {
                    let atlas_so_far = try_pack_partial(rects, &order, width, height);
                    return Err(PackError { attempted_size: (nw, nh), atlas_so_far });
                }
                width = nw;
                height = nh;
            }
        }
    }
}

fn try_pack(rects: &[RectSpec], order: &[usize], width: u32, height: u32) -> Option<PackResult> {
    let mut placements = vec![None; rects.len()];
    let mut dict = Dictionary::new();
    dict.insert(Region { x: 0, y: 0, w: width, h: height });

    for &i in order {
        let r = rects[i];
        let required_max = r.width.max(r.height);
        let required_min = r.width.min(r.height);
        let region = dict.take(required_max, required_min)?;
        let (placed, leftovers) = place_in_region(region, r);
        placements[i] = Some(placed);
        for l in leftovers {
            dict.insert(l);
        }
    }

    Some(PackResult {
        width,
        height,
        placements: placements.into_iter().map(|p| p.unwrap()).collect(),
    })
}

fn try_pack_partial(rects: &[RectSpec], order: &[usize], width: u32, height: u32) -> PackResult {
    let mut placements = vec![None; rects.len()];
    let mut dict = Dictionary::new();
    dict.insert(Region { x: 0, y: 0, w: width, h: height });

    for &i in order {
        let r = rects[i];
        let required_max = r.width.max(r.height);
        let required_min = r.width.min(r.height);
        match dict.take(required_max, required_min) {
            Some(region) => {
                let (placed, leftovers) = place_in_region(region, r);
                placements[i] = Some(placed);
                for l in leftovers {
                    dict.insert(l);
                }
            }
            None => break,
        }
    }

    PackResult {
        width,
        height,
        placements: placements.into_iter().flatten().collect(),
    }
}

/// Places `r` into `region` (flipping if the region's orientation demands
/// it), splitting the leftover into a right strip and a top strip (§4.G:
/// "split at most two ways (right strip, top strip)").
fn place_in_region(region: Region, r: RectSpec) -> (PlacedRect, Vec<Region>) {
    let region_wide = region.w >= region.h;
    let rect_wide = r.width >= r.height;
    let flipped = region_wide != rect_wide;
    let (pw, ph) = if flipped { (r.height, r.width) } else { (r.width, r.height) };

    let placed = PlacedRect {
        x: region.x,
        y: region.y,
        width: r.width,
        height: r.height,
        flipped,
    };

    let mut leftovers = Vec::new();
    if region.w > pw {
        leftovers.push(Region {
            x: region.x + pw,
            y: region.y,
            w: region.w - pw,
            h: region.h,
        });
    }
    if region.h > ph {
        leftovers.push(Region {
            x: region.x,
            y: region.y + ph,
            w: pw,
            h: region.h - ph,
        });
    }

    (placed, leftovers)
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
            let p = &result.placements[i];
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

    fn overlaps(a: &PlacedRect, b: &PlacedRect) -> bool {
        a.x < b.x + b.width && b.x < a.x + a.width && a.y < b.y + b.height && b.y < a.y + a.height
    }
}
