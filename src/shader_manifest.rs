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

//! The shader-program manifest format (§6): the one bit-exact external
//! format in the core's surface. One keyword-plus-path directive per line;
//! `#`, `//`, and `--` introduce a comment that runs to end of line; blank
//! lines are ignored.
//!
//! Grounded in the teacher's `common::wad`/`common::pak` line-oriented
//! lump readers for the "keyword, then payload" shape, generalized to a
//! small fixed vocabulary of stage keywords instead of WAD lump names.

use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;

/// A shader pipeline stage (§6 "keywords for vertex/geometry/fragment/
/// fixed-function stages").
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    Vertex,
    Geometry,
    Fragment,
    FixedFunction,
}

/// The topology a geometry-stage program consumes and emits, plus the
/// maximum number of vertices one invocation may output (§6 "geometry
/// stage carries an input-primitive type, output-primitive type, and
/// maximum output vertex count").
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PrimitiveType {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
}

impl PrimitiveType {
    fn parse(s: &str) -> Option<PrimitiveType> {
        Some(match s {
            "points" => PrimitiveType::Points,
            "lines" => PrimitiveType::Lines,
            "line_strip" => PrimitiveType::LineStrip,
            "triangles" => PrimitiveType::Triangles,
            "triangle_strip" => PrimitiveType::TriangleStrip,
            _ => return None,
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GeometryStageInfo {
    pub input: PrimitiveType,
    pub output: PrimitiveType,
    pub max_output_vertices: u32,
}

/// One parsed directive: a stage, the path to its program source (absent
/// for `FixedFunction`, which names no file), and geometry-specific
/// topology info (present only for `Stage::Geometry`).
#[derive(Clone, Debug, PartialEq)]
pub struct StageEntry {
    pub stage: Stage,
    pub path: Option<PathBuf>,
    pub geometry: Option<GeometryStageInfo>,
}

#[derive(Debug)]
pub enum ManifestError {
    UnknownStage { line: usize, keyword: String },
    MissingPath { line: usize },
    MalformedGeometryStage { line: usize, reason: String },
}

impl fmt::Display for ManifestError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ManifestError::UnknownStage { line, keyword } => {
                write!(f, "line {}: unknown stage keyword \"{}\"", line, keyword)
            }
            ManifestError::MissingPath { line } => {
                write!(f, "line {}: stage directive is missing its path", line)
            }
            ManifestError::MalformedGeometryStage { line, reason } => {
                write!(f, "line {}: malformed geometry stage directive: {}", line, reason)
            }
        }
    }
}

impl StdError for ManifestError {}

/// Strips a trailing `#`, `//`, or `--` comment from a line.
fn strip_comment(line: &str) -> &str {
    let mut end = line.len();
    for marker in &["//", "--"] {
        if let Some(pos) = line.find(marker) {
            end = end.min(pos);
        }
    }
    if let Some(pos) = line.find('#') {
        end = end.min(pos);
    }
    &line[..end]
}

/// Parses a full manifest, one directive per non-blank, non-comment line.
pub fn parse(source: &str) -> Result<Vec<StageEntry>, ManifestError> {
    let mut entries = Vec::new();

    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let keyword = tokens.next().unwrap();

        let stage = match keyword {
            "vertex" => Stage::Vertex,
            "geometry" => Stage::Geometry,
            "fragment" => Stage::Fragment,
            "fixedfunction" => Stage::FixedFunction,
            other => {
                return Err(ManifestError::UnknownStage {
                    line: line_no,
                    keyword: other.to_string(),
                })
            }
        };

        if stage == Stage::FixedFunction {
            entries.push(StageEntry {
                stage,
                path: None,
                geometry: None,
            });
            continue;
        }

        let path = tokens
            .next()
            .map(PathBuf::from)
            .ok_or(ManifestError::MissingPath { line: line_no })?;

        let geometry = if stage == Stage::Geometry {
            let rest: Vec<&str> = tokens.collect();
            if rest.len() != 3 {
                return Err(ManifestError::MalformedGeometryStage {
                    line: line_no,
                    reason: format!(
                        "expected \"<input> <output> <max_vertices>\", got {} token(s)",
                        rest.len()
                    ),
                });
            }
            let input = PrimitiveType::parse(rest[0]).ok_or_else(|| {
                ManifestError::MalformedGeometryStage {
                    line: line_no,
                    reason: format!("unknown input primitive \"{}\"", rest[0]),
                }
            })?;
            let output = PrimitiveType::parse(rest[1]).ok_or_else(|| {
                ManifestError::MalformedGeometryStage {
                    line: line_no,
                    reason: format!("unknown output primitive \"{}\"", rest[1]),
                }
            })?;
            let max_output_vertices: u32 = rest[2].parse().map_err(|_| {
                ManifestError::MalformedGeometryStage {
                    line: line_no,
                    reason: format!("\"{}\" is not a vertex count", rest[2]),
                }
            })?;
            Some(GeometryStageInfo {
                input,
                output,
                max_output_vertices,
            })
        } else {
            None
        };

        entries.push(StageEntry {
            stage,
            path: Some(path),
            geometry,
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_vertex_and_fragment_stages() {
        let src = "vertex shaders/basic.vert\nfragment shaders/basic.frag\n";
        let entries = parse(src).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].stage, Stage::Vertex);
        assert_eq!(entries[0].path, Some(PathBuf::from("shaders/basic.vert")));
        assert_eq!(entries[1].stage, Stage::Fragment);
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let src = "# a comment\n\n// also a comment\nvertex a.vert -- trailing comment\n";
        let entries = parse(src).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, Some(PathBuf::from("a.vert")));
    }

    #[test]
    fn geometry_stage_parses_primitive_types_and_max_vertices() {
        let src = "geometry shaders/explode.geom points triangle_strip 12\n";
        let entries = parse(src).unwrap();
        let info = entries[0].geometry.unwrap();
        assert_eq!(info.input, PrimitiveType::Points);
        assert_eq!(info.output, PrimitiveType::TriangleStrip);
        assert_eq!(info.max_output_vertices, 12);
    }

    #[test]
    fn fixed_function_stage_has_no_path() {
        let src = "fixedfunction\n";
        let entries = parse(src).unwrap();
        assert_eq!(entries[0].stage, Stage::FixedFunction);
        assert_eq!(entries[0].path, None);
    }

    #[test]
    fn unknown_keyword_is_an_error() {
        let src = "tessellation a.tes\n";
        assert!(parse(src).is_err());
    }

    #[test]
    fn malformed_geometry_directive_is_an_error() {
        let src = "geometry a.geom points\n";
        match parse(src) {
            Err(ManifestError::MalformedGeometryStage { .. }) => {}
            other => panic!("expected MalformedGeometryStage, got {:?}", other),
        }
    }
}
