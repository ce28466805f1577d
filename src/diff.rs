//! C6: format-preserving emitter & differ.
//!
//! Every rewrite recorded in a per-file [`crate::edit::EditList`] splices
//! directly against the original file's bytes, so "restoring" a tree to
//! source text is just applying its edit list: there is no separate
//! restorer step. This module's only job is comparing the result against
//! the original and rendering a unified diff, headers relative to the
//! user-supplied application root (spec.md §6).

use std::path::Path;

use similar::TextDiff;

use crate::edit::EditList;
use crate::loader::LoadedPackage;

/// Diffs every modified file in `pkg` against its original text. Files
/// whose edit list is empty (or whose edits happen to be no-ops) are
/// skipped entirely rather than emitting an empty hunk.
pub fn render_diff(pkg: &LoadedPackage, edits: Vec<EditList>, root: &Path) -> String {
    let mut out = String::new();

    for (file, edit_list) in pkg.files.iter().zip(edits.into_iter()) {
        if edit_list.is_empty() {
            continue;
        }
        let new_text = edit_list.apply(&file.original_text);
        if new_text == file.original_text {
            continue;
        }

        let rel = file.path.strip_prefix(root).unwrap_or(&file.path);
        let rel_display = rel.to_string_lossy();
        let a_header = format!("a/{rel_display}");
        let b_header = format!("b/{rel_display}");

        let diff = TextDiff::from_lines(&file.original_text, &new_text);
        out.push_str(
            &diff
                .unified_diff()
                .header(&a_header, &b_header)
                .to_string(),
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PackageSelector;
    use crate::edit::EditList;
    use std::fs;
    use std::io::Write;

    #[test]
    fn unmodified_files_produce_no_hunk() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        let mut f = fs::File::create(dir.path().join("src/main.rs")).unwrap();
        writeln!(f, "fn main() {{}}").unwrap();

        let pkg = crate::loader::load(dir.path(), &PackageSelector::Here).unwrap();
        let edits = vec![EditList::new()];
        let diff = render_diff(&pkg, edits, dir.path());
        assert!(diff.is_empty());
    }

    #[test]
    fn modified_file_produces_relative_headers() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        let mut f = fs::File::create(dir.path().join("src/main.rs")).unwrap();
        writeln!(f, "fn main() {{}}").unwrap();

        let pkg = crate::loader::load(dir.path(), &PackageSelector::Here).unwrap();
        let mut edit_list = EditList::new();
        edit_list.insert_after(pkg.files[0].original_text.find('{').unwrap() + 1, "\n    init();");
        let diff = render_diff(&pkg, vec![edit_list], dir.path());

        assert!(diff.contains("a/src/main.rs"));
        assert!(diff.contains("b/src/main.rs"));
        assert!(diff.contains("init();"));
    }
}
