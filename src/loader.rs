//! C1: package loader.
//!
//! Parses every file matched by a [`PackageSelector`] and hands back a
//! [`LoadedPackage`]: one [`SourceFile`] per file, each keeping its
//! original text next to its parsed [`syn::File`] so [`crate::edit`] can
//! later splice against the untouched original bytes.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::PackageSelector;
use crate::error::{InstrumentError, Result};

/// Holds a file's original text next to its parsed tree. Deliberately does
/// *not* own an [`EditList`]: the engine keeps one edit list per file in a
/// side table instead, so recursing from one function into a callee in a
/// different file never needs two live mutable borrows into the same
/// [`LoadedPackage`] (see `tracing_engine::Engine`).
pub struct SourceFile {
    pub path: PathBuf,
    pub original_text: String,
    pub ast: syn::File,
}

pub struct LoadedPackage {
    pub root: PathBuf,
    pub files: Vec<SourceFile>,
}

/// Finds `src/main.rs` / `src/lib.rs` directly under `root`, used by
/// [`PackageSelector::Here`]: the "current directory's package" case.
fn entry_points(root: &Path) -> Vec<PathBuf> {
    let src = root.join("src");
    ["main.rs", "lib.rs"]
        .iter()
        .map(|f| src.join(f))
        .filter(|p| p.exists())
        .collect()
}

fn discover_files(root: &Path, selector: &PackageSelector) -> Result<Vec<PathBuf>> {
    let files = match selector {
        PackageSelector::Here => entry_points(root),
        PackageSelector::Recursive => {
            let pattern = root.join("src").join("**").join("*.rs");
            let pattern = pattern.to_string_lossy().into_owned();
            glob::glob(&pattern)
                .map_err(|e| InstrumentError::NoFilesMatched {
                    root: root.to_path_buf(),
                    selector: e.to_string(),
                })?
                .filter_map(|r| r.ok())
                .collect()
        }
        PackageSelector::Path(p) => {
            let candidate = root.join(p);
            if candidate.exists() {
                vec![candidate]
            } else {
                vec![]
            }
        }
    };

    if files.is_empty() {
        return Err(InstrumentError::NoFilesMatched {
            root: root.to_path_buf(),
            selector: format!("{:?}", selector),
        });
    }
    Ok(files)
}

pub fn load(root: &Path, selector: &PackageSelector) -> Result<LoadedPackage> {
    if !root.exists() {
        return Err(InstrumentError::RootNotFound(root.to_path_buf()));
    }

    let paths = discover_files(root, selector)?;
    let mut files = Vec::with_capacity(paths.len());

    for path in paths {
        let original_text = fs::read_to_string(&path).map_err(|_| InstrumentError::NoFilesMatched {
            root: root.to_path_buf(),
            selector: format!("unreadable file {}", path.display()),
        })?;
        let ast = syn::parse_file(&original_text)
            .map_err(|source| InstrumentError::ParseFailure { path: path.clone(), source })?;

        files.push(SourceFile { path, original_text, ast });
    }

    Ok(LoadedPackage { root: root.to_path_buf(), files })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_failure_on_missing_root() {
        let err = load(Path::new("/does/not/exist"), &PackageSelector::Here).unwrap_err();
        assert!(matches!(err, InstrumentError::RootNotFound(_)));
    }

    #[test]
    fn load_failure_on_empty_package() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path(), &PackageSelector::Here).unwrap_err();
        assert!(matches!(err, InstrumentError::NoFilesMatched { .. }));
    }

    #[test]
    fn loads_main_rs() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        let mut f = fs::File::create(dir.path().join("src/main.rs")).unwrap();
        writeln!(f, "fn main() {{}}").unwrap();

        let pkg = load(dir.path(), &PackageSelector::Here).unwrap();
        assert_eq!(pkg.files.len(), 1);
    }
}
