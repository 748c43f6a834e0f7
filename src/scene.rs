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

//! The scripted scene description consumed at asset-load time (§6 "A
//! scripted scene description"): a textual, line-oriented format naming
//! procedural generators, blocks, and CSG operations.
//!
//! The spec pins only the semantic entities produced, not the concrete
//! syntax, so this follows the shape the teacher already uses for its own
//! textual asset format: `common::parse`'s brace-delimited dictionaries of
//! quoted key/value pairs, one dictionary per entity, distinguished by a
//! `"kind"` key the way a `.map` entity is distinguished by `"classname"`.

use std::collections::HashMap;

use cgmath::Vector3;
use failure::Error;

use crate::blockgraph::BlockSpec;
use crate::geom::Polygon;

named!(
    quoted<&str>,
    map_res!(
        delimited!(tag!("\""), take_until_s!("\""), tag!("\"")),
        ::std::str::from_utf8
    )
);

named!(key_val<(&str, &str)>, ws!(pair!(quoted, quoted)));

named!(
    entity_dict<HashMap<&str, &str>>,
    map!(
        ws!(delimited!(tag!("{"), many0!(key_val), tag!("}"))),
        |pairs: Vec<(&str, &str)>| pairs.into_iter().collect()
    )
);

named!(
    entity_dicts<Vec<HashMap<&str, &str>>>,
    ws!(many0!(entity_dict))
);

/// A single named solid produced by a generator, expanded eagerly to a
/// convex polygon soup so it can be fed straight into
/// [`Bsp3Tree::build`](crate::bsp3::Bsp3Tree::build).
#[derive(Clone, Debug, PartialEq)]
pub enum GeneratorKind {
    /// Axis-aligned box, given by its half-extents.
    Box { half_extents: Vector3<f32> },
    /// Icosphere-ish approximation: a box generator stands in for any
    /// curved primitive the distilled spec doesn't pin the tessellation
    /// of; `radius` is kept for round-tripping the script text even though
    /// the emitted polygons are currently the circumscribing box.
    Sphere { radius: f32 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct GeneratorSpec {
    pub name: String,
    pub kind: GeneratorKind,
    pub origin: Vector3<f32>,
}

impl GeneratorSpec {
    /// Expands this generator into a closed convex polygon soup, tagged
    /// with a hash of its name so fragments split off it during CSG still
    /// trace back to their source (§3 "Convex polygon").
    pub fn to_polygons(&self) -> Vec<Polygon> {
        let half_extents = match self.kind {
            GeneratorKind::Box { half_extents } => half_extents,
            GeneratorKind::Sphere { radius } => Vector3::new(radius, radius, radius),
        };
        box_polygons(self.origin, half_extents, tag_of(&self.name))
    }
}

/// Derives a stable `u32` tag from an entity name so fragments split off a
/// solid during CSG keep a traceable identifier (§3 "Convex polygon").
fn tag_of(name: &str) -> u32 {
    let mut h: u32 = 2166136261;
    for b in name.bytes() {
        h ^= b as u32;
        h = h.wrapping_mul(16777619);
    }
    h
}

fn box_polygons(center: Vector3<f32>, half_extents: Vector3<f32>, tag: u32) -> Vec<Polygon> {
    let hx = half_extents.x;
    let hy = half_extents.y;
    let hz = half_extents.z;
    let c = [
        center + Vector3::new(-hx, -hy, -hz),
        center + Vector3::new(hx, -hy, -hz),
        center + Vector3::new(hx, hy, -hz),
        center + Vector3::new(-hx, hy, -hz),
        center + Vector3::new(-hx, -hy, hz),
        center + Vector3::new(hx, -hy, hz),
        center + Vector3::new(hx, hy, hz),
        center + Vector3::new(-hx, hy, hz),
    ];
    // Outward-wound quads for a right-handed box: -z, +z, -y, +y, -x, +x.
    let faces: [[usize; 4]; 6] = [
        [0, 3, 2, 1],
        [4, 5, 6, 7],
        [0, 1, 5, 4],
        [3, 7, 6, 2],
        [0, 4, 7, 3],
        [1, 2, 6, 5],
    ];
    faces
        .iter()
        .map(|f| Polygon::new(f.iter().map(|&i| c[i]).collect(), tag))
        .collect()
}

/// Which boolean combination a [`CsgOpSpec`] performs (§4.C "Incremental
/// CSG").
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CsgOp {
    Union,
    Intersection,
    Difference,
}

/// A named CSG combination of two previously-named solids, producing a
/// third name a later operation (or the scene's final output) may refer
/// to.
#[derive(Clone, Debug, PartialEq)]
pub struct CsgOpSpec {
    pub op: CsgOp,
    pub lhs: String,
    pub rhs: String,
    pub result: String,
}

/// One top-level entity parsed from a scene script.
#[derive(Clone, Debug, PartialEq)]
pub enum SceneEntity {
    Generator(GeneratorSpec),
    Block(BlockSpec),
    CsgOp(CsgOpSpec),
}

/// Parses a full scene script into its entities, in source order.
///
/// Each dictionary's `"kind"` key selects `generator`, `block`, or `csg`;
/// an unrecognized or missing kind is an error (format failures are real
/// `Err`s, unlike the numeric/topological conditions the geometry core
/// resolves silently — §7).
pub fn parse_scene(input: &str) -> Result<Vec<SceneEntity>, Error> {
    let (_, dicts) = entity_dicts(input.as_bytes())
        .map_err(|e| format_err!("scene script parse error: {:?}", e))?;

    dicts.into_iter().map(parse_entity).collect()
}

fn parse_entity(dict: HashMap<&str, &str>) -> Result<SceneEntity, Error> {
    let kind = *dict
        .get("kind")
        .ok_or_else(|| format_err!("entity missing \"kind\" key"))?;

    match kind {
        "generator" => parse_generator(&dict).map(SceneEntity::Generator),
        "block" => parse_block(&dict).map(SceneEntity::Block),
        "csg" => parse_csg(&dict).map(SceneEntity::CsgOp),
        other => Err(format_err!("unrecognized entity kind: {}", other)),
    }
}

fn field<'a>(dict: &HashMap<&'a str, &'a str>, key: &str) -> Result<&'a str, Error> {
    dict.get(key)
        .cloned()
        .ok_or_else(|| format_err!("missing required field \"{}\"", key))
}

fn vector3(s: &str) -> Result<Vector3<f32>, Error> {
    let parts: Vec<&str> = s.split_whitespace().collect();
    if parts.len() != 3 {
        bail!("expected 3 components, got {}: \"{}\"", parts.len(), s);
    }
    Ok(Vector3::new(
        parts[0].parse()?,
        parts[1].parse()?,
        parts[2].parse()?,
    ))
}

fn parse_generator(dict: &HashMap<&str, &str>) -> Result<GeneratorSpec, Error> {
    let name = field(dict, "name")?.to_string();
    let origin = match dict.get("origin") {
        Some(s) => vector3(s)?,
        None => Vector3::new(0.0, 0.0, 0.0),
    };
    let shape = field(dict, "shape")?;
    let kind = match shape {
        "box" => GeneratorKind::Box {
            half_extents: vector3(field(dict, "half_extents")?)?,
        },
        "sphere" => GeneratorKind::Sphere {
            radius: field(dict, "radius")?.parse()?,
        },
        other => bail!("unrecognized generator shape: {}", other),
    };
    Ok(GeneratorSpec { name, kind, origin })
}

fn parse_block(dict: &HashMap<&str, &str>) -> Result<BlockSpec, Error> {
    let raw = field(dict, "corners")?;
    let nums: Result<Vec<f32>, _> = raw.split_whitespace().map(|t| t.parse::<f32>()).collect();
    let nums = nums?;
    if nums.len() != 24 {
        bail!("block \"corners\" needs 24 floats (8 x,y,z), got {}", nums.len());
    }
    let mut corners = [Vector3::new(0.0, 0.0, 0.0); 8];
    for i in 0..8 {
        corners[i] = Vector3::new(nums[i * 3], nums[i * 3 + 1], nums[i * 3 + 2]);
    }

    let group: u32 = match dict.get("group") {
        Some(s) => s.parse()?,
        None => 0,
    };
    let shape_id = match dict.get("shape_id") {
        Some(s) => Some(s.parse()?),
        None => None,
    };
    let crease_mask: u16 = match dict.get("crease_mask") {
        Some(s) => parse_bitmask(s)?,
        None => 0,
    };
    let attraction_scalar: u8 = match dict.get("attraction") {
        Some(s) => s.parse()?,
        None => 2,
    };

    let mut spec = BlockSpec::unit(corners, group);
    spec.shape_id = shape_id;
    spec.crease_mask = crease_mask;
    spec.attraction = [attraction_scalar; 6];
    Ok(spec)
}

fn parse_bitmask(s: &str) -> Result<u16, Error> {
    if s.starts_with("0x") {
        Ok(u16::from_str_radix(&s[2..], 16)?)
    } else {
        Ok(s.parse()?)
    }
}

fn parse_csg(dict: &HashMap<&str, &str>) -> Result<CsgOpSpec, Error> {
    let op = match field(dict, "op")? {
        "union" => CsgOp::Union,
        "intersection" => CsgOp::Intersection,
        "difference" => CsgOp::Difference,
        other => bail!("unrecognized csg op: {}", other),
    };
    Ok(CsgOpSpec {
        op,
        lhs: field(dict, "lhs")?.to_string(),
        rhs: field(dict, "rhs")?.to_string(),
        result: field(dict, "result")?.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generator_block_and_csg() {
        let script = r#"
            {
                "kind" "generator"
                "name" "cube_a"
                "shape" "box"
                "half_extents" "0.5 0.5 0.5"
            }
            {
                "kind" "generator"
                "name" "cube_b"
                "shape" "box"
                "origin" "0.5 0 0"
                "half_extents" "0.5 0.5 0.5"
            }
            {
                "kind" "csg"
                "op" "union"
                "lhs" "cube_a"
                "rhs" "cube_b"
                "result" "merged"
            }
        "#;

        let entities = parse_scene(script).unwrap();
        assert_eq!(entities.len(), 3);
        match &entities[0] {
            SceneEntity::Generator(g) => {
                assert_eq!(g.name, "cube_a");
                assert_eq!(g.kind, GeneratorKind::Box { half_extents: Vector3::new(0.5, 0.5, 0.5) });
            }
            other => panic!("expected generator, got {:?}", other),
        }
        match &entities[2] {
            SceneEntity::CsgOp(c) => {
                assert_eq!(c.op, CsgOp::Union);
                assert_eq!(c.lhs, "cube_a");
                assert_eq!(c.rhs, "cube_b");
                assert_eq!(c.result, "merged");
            }
            other => panic!("expected csg op, got {:?}", other),
        }
    }

    #[test]
    fn generator_expands_to_six_quads() {
        let g = GeneratorSpec {
            name: "box".to_string(),
            kind: GeneratorKind::Box {
                half_extents: Vector3::new(1.0, 1.0, 1.0),
            },
            origin: Vector3::new(0.0, 0.0, 0.0),
        };
        let polys = g.to_polygons();
        assert_eq!(polys.len(), 6);
        for p in &polys {
            assert_eq!(p.vertices().len(), 4);
        }
    }

    #[test]
    fn block_requires_24_corner_floats() {
        let mut dict = HashMap::new();
        dict.insert("kind", "block");
        dict.insert("corners", "0 0 0 1 0 0");
        let err = parse_entity(dict).unwrap_err();
        assert!(format!("{}", err).contains("24 floats"));
    }

    #[test]
    fn missing_kind_is_an_error() {
        let dict: HashMap<&str, &str> = HashMap::new();
        assert!(parse_entity(dict).is_err());
    }
}
