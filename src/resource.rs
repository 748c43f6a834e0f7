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

//! Resource identifier → filesystem path resolution (§6 "Resource
//! identifier → filesystem path mapping"), the same ordered-roots,
//! rightmost-first search `common::vfs::Vfs::open` uses over its stacked
//! pak/directory components, but resolving to a `PathBuf` rather than
//! opening a file.

use std::path::{Path, PathBuf};

use failure::Error;

const FILE_SCHEME: &str = "file://";

/// An ordered set of root directories an identifier is resolved against.
/// Roots are searched rightmost (most recently added) first, matching
/// `common::vfs::Vfs::open`'s `components.iter().rev()`.
pub struct Resolver {
    roots: Vec<PathBuf>,
    extensions: Vec<String>,
}

impl Resolver {
    pub fn new() -> Resolver {
        Resolver {
            roots: Vec::new(),
            extensions: Vec::new(),
        }
    }

    /// Adds a root directory, searched before any root added earlier.
    pub fn add_root<P: AsRef<Path>>(&mut self, root: P) {
        self.roots.push(root.as_ref().to_path_buf());
    }

    /// Adds an extension (without the leading dot) probed when an
    /// identifier has none of its own.
    pub fn add_extension<S: Into<String>>(&mut self, ext: S) {
        self.extensions.push(ext.into());
    }

    /// Resolves `identifier` to a path that exists on disk.
    ///
    /// `file://` is honored literally (the remainder is used as-is, no root
    /// search). Any other URL scheme (detected by a `"://"` substring) is
    /// rejected. A bare identifier is tried first as given, then with each
    /// configured extension appended, against each root in reverse order.
    pub fn resolve(&self, identifier: &str) -> Result<PathBuf, Error> {
        if identifier.starts_with("file://") {
            let path = PathBuf::from(&identifier[FILE_SCHEME.len()..]);
            if path.exists() {
                return Ok(path);
            }
            bail!("file:// resource not found: {}", identifier);
        }

        if let Some(scheme_end) = identifier.find("://") {
            bail!("unsupported resource scheme: {}", &identifier[..scheme_end]);
        }

        for root in self.roots.iter().rev() {
            let bare = root.join(identifier);
            if bare.exists() {
                return Ok(bare);
            }
            for ext in &self.extensions {
                let mut candidate = root.join(identifier);
                candidate.set_extension(ext);
                if candidate.exists() {
                    return Ok(candidate);
                }
                debug!("probed {:?}, not found", candidate);
            }
        }

        bail!("resource not found in any root: {}", identifier);
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Resolver::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("solidcraft-resource-test-{}", name));
        let _ = fs::create_dir_all(&dir);
        dir
    }

    #[test]
    fn later_root_shadows_earlier_one() {
        let base = scratch_dir("shadow");
        let low = base.join("low");
        let high = base.join("high");
        fs::create_dir_all(&low).unwrap();
        fs::create_dir_all(&high).unwrap();
        fs::write(low.join("a.txt"), b"low").unwrap();
        fs::write(high.join("a.txt"), b"high").unwrap();

        let mut r = Resolver::new();
        r.add_root(&low);
        r.add_root(&high);
        let resolved = r.resolve("a.txt").unwrap();
        assert_eq!(resolved, high.join("a.txt"));
    }

    #[test]
    fn extension_is_probed_when_bare_identifier_is_missing() {
        let base = scratch_dir("ext");
        fs::create_dir_all(&base).unwrap();
        fs::write(base.join("b.png"), b"x").unwrap();

        let mut r = Resolver::new();
        r.add_root(&base);
        r.add_extension("png");
        let resolved = r.resolve("b").unwrap();
        assert_eq!(resolved, base.join("b.png"));
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        let r = Resolver::new();
        assert!(r.resolve("http://example.com/x").is_err());
    }

    #[test]
    fn file_scheme_is_honored_literally() {
        let base = scratch_dir("literal");
        fs::create_dir_all(&base).unwrap();
        let target = base.join("c.txt");
        fs::write(&target, b"x").unwrap();

        let r = Resolver::new();
        let resolved = r.resolve(&format!("file://{}", target.display())).unwrap();
        assert_eq!(resolved, target);
    }
}
