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

//! The result of a collision query: a touching or penetrating contact
//! carrying both witness points in world and local frames plus the unit
//! contact normal (§4.E "Phase 2 — EPA").

use cgmath::{InnerSpace, Vector3};

#[derive(Copy, Clone, Debug)]
pub struct Contact {
    pub witness_a_world: Vector3<f32>,
    pub witness_b_world: Vector3<f32>,
    pub witness_a_local: Vector3<f32>,
    pub witness_b_local: Vector3<f32>,
    /// Unit normal pointing from B toward A.
    pub normal: Vector3<f32>,
    /// Positive for penetration, zero (within margin) for a touching
    /// contact.
    pub depth: f32,
}

/// A full collision query's outcome (§4.E "Dispatcher").
#[derive(Clone, Debug)]
pub enum CollisionResult {
    Separated { axis: Vector3<f32> },
    Contact(Contact),
}

/// One persisted contact point, carrying a resolver-owned side channel
/// (accumulated normal/friction impulse) that survives frame to frame as
/// long as the point keeps matching.
#[derive(Copy, Clone, Debug)]
pub struct PersistentContact {
    pub contact: Contact,
    pub accumulated_normal_impulse: f32,
    pub accumulated_friction_impulse: [f32; 2],
}

impl PersistentContact {
    fn fresh(contact: Contact) -> PersistentContact {
        PersistentContact {
            contact,
            accumulated_normal_impulse: 0.0,
            accumulated_friction_impulse: [0.0, 0.0],
        }
    }
}

/// Distance within which an old and new contact point (in A's local frame)
/// are treated as "the same" point for impulse persistence.
const MATCH_RADIUS: f32 = 0.02;
const MATCH_RADIUS_SQ: f32 = MATCH_RADIUS * MATCH_RADIUS;

/// Per-pair contact cache (§3 supplemented feature "Contact manifold
/// caching of the separating axis"): keeps the last separating axis GJK
/// found for this pair as next frame's search seed, plus up to four
/// contact points whose accumulated impulses persist across frames via a
/// closest-point matching heuristic.
#[derive(Clone, Debug)]
pub struct ContactSet {
    seed: Vector3<f32>,
    points: Vec<PersistentContact>,
}

impl ContactSet {
    pub fn new() -> ContactSet {
        ContactSet {
            seed: Vector3::new(1.0, 0.0, 0.0),
            points: Vec::with_capacity(4),
        }
    }

    /// The axis to seed next frame's GJK query with.
    pub fn seed(&self) -> Vector3<f32> {
        self.seed
    }

    pub fn points(&self) -> &[PersistentContact] {
        &self.points
    }

    /// Folds one frame's collision outcome into the cache: on separation,
    /// remembers the axis and drops every point; on contact, matches the new
    /// point against whatever survived last frame (closest prior point
    /// within [`MATCH_RADIUS`] in A's local frame keeps its accumulated
    /// impulses) and keeps at most 4 points, evicting the one that
    /// contributes least to the manifold's spread when a 5th would land.
    pub fn update(&mut self, result: &CollisionResult) {
        match result {
            CollisionResult::Separated { axis } => {
                self.seed = *axis;
                self.points.clear();
            }
            CollisionResult::Contact(contact) => {
                self.seed = contact.normal;
                self.merge_point(*contact);
            }
        }
    }

    fn merge_point(&mut self, contact: Contact) {
        let matched = self
            .points
            .iter()
            .position(|p| (p.contact.witness_a_local - contact.witness_a_local).magnitude2() < MATCH_RADIUS_SQ);

        match matched {
            Some(i) => self.points[i].contact = contact,
            None if self.points.len() < 4 => self.points.push(PersistentContact::fresh(contact)),
            None => {
                let worst = least_significant_point(&self.points, &contact);
                self.points[worst] = PersistentContact::fresh(contact);
            }
        }
    }
}

impl Default for ContactSet {
    fn default() -> Self {
        ContactSet::new()
    }
}

/// Finds the index of the existing point whose removal (in favor of the
/// incoming one) shrinks the manifold's footprint the least, by dropping
/// whichever point is closest to the centroid of the rest (§3: a manifold
/// of 4 wants to keep its extremes, not its middle).
fn least_significant_point(points: &[PersistentContact], incoming: &Contact) -> usize {
    let mut best = 0;
    let mut best_score = f32::INFINITY;
    for i in 0..points.len() {
        let centroid: Vector3<f32> = points
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(_, p)| p.contact.witness_a_local)
            .chain(std::iter::once(incoming.witness_a_local))
            .sum::<Vector3<f32>>()
            / points.len() as f32;
        let score = (points[i].contact.witness_a_local - centroid).magnitude2();
        if score < best_score {
            best_score = score;
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact_at(x: f32, normal: Vector3<f32>) -> Contact {
        Contact {
            witness_a_world: Vector3::new(x, 0.0, 0.0),
            witness_b_world: Vector3::new(x, 0.0, 0.0),
            witness_a_local: Vector3::new(x, 0.0, 0.0),
            witness_b_local: Vector3::new(x, 0.0, 0.0),
            normal,
            depth: 0.1,
        }
    }

    #[test]
    fn separation_clears_points_but_keeps_the_axis_as_next_seed() {
        let mut set = ContactSet::new();
        set.update(&CollisionResult::Contact(contact_at(0.0, Vector3::new(0.0, 1.0, 0.0))));
        assert_eq!(set.points().len(), 1);

        set.update(&CollisionResult::Separated { axis: Vector3::new(0.0, 0.0, 1.0) });
        assert!(set.points().is_empty());
        assert_eq!(set.seed(), Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn a_nearby_point_matches_and_keeps_its_accumulated_impulse() {
        let mut set = ContactSet::new();
        set.update(&CollisionResult::Contact(contact_at(1.0, Vector3::new(0.0, 1.0, 0.0))));
        set.points[0].accumulated_normal_impulse = 42.0;

        // same point, nudged within the match radius.
        set.update(&CollisionResult::Contact(contact_at(1.005, Vector3::new(0.0, 1.0, 0.0))));
        assert_eq!(set.points().len(), 1);
        assert_eq!(set.points()[0].accumulated_normal_impulse, 42.0);
    }

    #[test]
    fn a_far_point_is_added_rather_than_matched() {
        let mut set = ContactSet::new();
        set.update(&CollisionResult::Contact(contact_at(0.0, Vector3::new(0.0, 1.0, 0.0))));
        set.update(&CollisionResult::Contact(contact_at(5.0, Vector3::new(0.0, 1.0, 0.0))));
        assert_eq!(set.points().len(), 2);
    }

    #[test]
    fn a_fifth_far_point_evicts_rather_than_overflowing() {
        let mut set = ContactSet::new();
        for x in &[0.0, 1.0, 2.0, 3.0] {
            set.update(&CollisionResult::Contact(contact_at(*x, Vector3::new(0.0, 1.0, 0.0))));
        }
        assert_eq!(set.points().len(), 4);
        set.update(&CollisionResult::Contact(contact_at(10.0, Vector3::new(0.0, 1.0, 0.0))));
        assert_eq!(set.points().len(), 4);
    }
}
