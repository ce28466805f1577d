//! The cursor-style insert/replace primitive spec.md §4.4/§9 asks for,
//! implemented as byte-offset text splices rather than a tree restorer.
//!
//! Because [`crate::loader`] keeps every parsed node's byte range (via
//! `proc-macro2`'s span-locations fallback), a rewrite never needs to
//! re-print anything: it records *what* to splice in at *which* offset and
//! the original source text supplies everything in between, comments and
//! blank lines included. This is what makes spec.md §8 invariant 6 ("no
//! comment is ever deleted") hold by construction instead of by a careful
//! decoration-transfer pass.

/// One splice: replace `original[start..end]` with `text`. An insertion is
/// simply `start == end`.
#[derive(Debug, Clone)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub text: String,
    /// Breaks ties between edits that share a start position (e.g. two
    /// "insert before this statement" rewrites firing on the same cursor
    /// position); lower `seq` ends up earlier in the output.
    seq: usize,
}

impl Edit {
    pub fn is_insert(&self) -> bool {
        self.start == self.end
    }
}

/// Per-file accumulator. A statement-level rewrite never mutates the parsed
/// tree; it just appends here.
#[derive(Debug, Default)]
pub struct EditList {
    edits: Vec<Edit>,
    next_seq: usize,
}

impl EditList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Insert `text` immediately before byte `offset`. A no-op if `offset`
    /// doesn't fall inside the file (the "cursor index >= 0" precondition
    /// from spec.md §9, generalized to a valid byte position).
    pub fn insert_before(&mut self, offset: usize, text: impl Into<String>) {
        self.push(offset, offset, text);
    }

    /// Insert `text` immediately after byte `offset`.
    pub fn insert_after(&mut self, offset: usize, text: impl Into<String>) {
        self.push(offset, offset, text);
    }

    pub fn replace(&mut self, start: usize, end: usize, text: impl Into<String>) {
        self.push(start, end, text);
    }

    fn push(&mut self, start: usize, end: usize, text: impl Into<String>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.edits.push(Edit {
            start,
            end,
            text: text.into(),
            seq,
        });
    }

    /// Apply every recorded splice to `original`, left to right. Overlapping
    /// replace ranges are rejected defensively (should never occur: every
    /// rewrite in this crate targets disjoint statements or disjoint
    /// sub-expressions of one statement).
    pub fn apply(mut self, original: &str) -> String {
        self.edits.sort_by_key(|e| (e.start, e.seq));

        let mut out = String::with_capacity(original.len());
        let mut pos = 0usize;
        for edit in &self.edits {
            if edit.start < pos {
                // Overlap with an already-applied edit: skip rather than
                // panic, matching spec.md's "silent skip, other rewrites
                // continue" posture for malformed inputs.
                continue;
            }
            out.push_str(&original[pos..edit.start]);
            out.push_str(&edit.text);
            pos = edit.end.max(pos);
        }
        out.push_str(&original[pos..]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_before_and_after_preserve_surrounding_text() {
        let src = "fn main() {\n    do_work();\n}\n";
        let anchor = src.find("do_work").unwrap();
        let end = anchor + "do_work();".len();

        let mut edits = EditList::new();
        edits.insert_before(anchor, "// wrapped\n    ");
        edits.insert_after(end, "\n    after();");

        let result = edits.apply(src);
        assert_eq!(
            result,
            "fn main() {\n    // wrapped\n    do_work();\n    after();\n}\n"
        );
    }

    #[test]
    fn same_offset_inserts_respect_append_order() {
        let src = "x";
        let mut edits = EditList::new();
        edits.insert_before(0, "a");
        edits.insert_before(0, "b");
        assert_eq!(edits.apply(src), "abx");
    }

    #[test]
    fn replace_consumes_original_range() {
        let src = "http.HandleFunc(p, h)";
        let mut edits = EditList::new();
        let start = src.find("h)").unwrap();
        edits.replace(start, start + 1, "wrap(h)");
        assert_eq!(edits.apply(src), "http.HandleFunc(p, wrap(h))");
    }
}
