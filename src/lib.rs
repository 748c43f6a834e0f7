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

//! The procedural-solid geometry core: a CSG/BSP engine over convex
//! polytopes, a block-graph control-mesh builder, GJK/EPA collision, an
//! LRU cache, and a rectangle packer, plus the thin boundary modules
//! (`resource`, `scene`, `mesh`, `shader_manifest`) that connect the core
//! to the rest of a content pipeline.
//!
//! The core is single-threaded and synchronous: no module here blocks on
//! I/O or suspends mid-operation, and every type is owned by exactly one
//! caller at a time (no global mutable state, no ambient singletons).
//!
//! Module layout follows the dependency order of the system itself:
//!
//! - [`math`] and [`geom`]: vectors (re-exported from `cgmath`), planes,
//!   axis-aligned boxes, and convex polygon classification/splitting.
//! - [`alloc`]: the arena/pool allocator every tree and graph below is
//!   built from, so none of them carry reference-counting cycles.
//! - [`bsp2`] and [`bsp3`]: the CSG tree and its 2D reconvexification
//!   helper.
//! - [`blockgraph`]: the block-to-block control-mesh builder.
//! - [`collision`]: GJK/EPA convex collision detection and contact
//!   resolution.
//! - [`cache`]: the LRU used to memoize the above.
//! - [`packer`]: the rectangle packer for baked surface-detail atlases.
//! - [`resource`], [`scene`], [`mesh`], [`shader_manifest`]: the external
//!   interfaces this core consumes and produces (§6).

#[macro_use]
extern crate failure;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
#[macro_use]
extern crate nom;

pub mod alloc;
pub mod blockgraph;
pub mod bsp2;
pub mod bsp3;
pub mod cache;
pub mod collision;
pub mod geom;
pub mod math;
pub mod mesh;
pub mod packer;
pub mod resource;
pub mod scene;
pub mod shader_manifest;
