//! Unified diff generation for file mutations.
//!
//! Every mutating tool reports a unified diff plus addition/removal counts
//! in its response metadata, and the same diff is shown to the user inside
//! the permission prompt.

use similar::{ChangeTag, TextDiff};

/// Number of unchanged context lines around each hunk.
const CONTEXT_LINES: usize = 3;

/// Generate a unified diff between two text blobs.
///
/// Returns `(diff, additions, removals)`. Line endings are normalized to
/// LF before comparison, so a CRLF-only difference is treated as no change.
/// Identical inputs yield `("", 0, 0)`.
pub fn generate_diff(old: &str, new: &str, display_path: &str) -> (String, usize, usize) {
    let old = normalize_line_endings(old);
    let new = normalize_line_endings(new);
    if old == new {
        return (String::new(), 0, 0);
    }

    let diff = TextDiff::from_lines(old.as_str(), new.as_str());

    let mut additions = 0;
    let mut removals = 0;
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => additions += 1,
            ChangeTag::Delete => removals += 1,
            ChangeTag::Equal => {}
        }
    }

    let mut output = format!("--- a/{}\n+++ b/{}\n", display_path, display_path);

    for (idx, group) in diff.grouped_ops(CONTEXT_LINES).iter().enumerate() {
        if idx > 0 {
            output.push('\n');
        }

        let (old_start, old_count, new_start, new_count) = group.iter().fold(
            (usize::MAX, 0usize, usize::MAX, 0usize),
            |(os, oc, ns, nc), op| {
                let old_range = op.old_range();
                let new_range = op.new_range();
                (
                    os.min(old_range.start),
                    oc + old_range.len(),
                    ns.min(new_range.start),
                    nc + new_range.len(),
                )
            },
        );

        output.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            old_start + 1,
            old_count,
            new_start + 1,
            new_count
        ));

        for op in group {
            for change in diff.iter_changes(op) {
                let prefix = match change.tag() {
                    ChangeTag::Delete => "-",
                    ChangeTag::Insert => "+",
                    ChangeTag::Equal => " ",
                };

                output.push_str(prefix);
                output.push_str(change.value());
                if !change.value().ends_with('\n') {
                    output.push('\n');
                }
            }
        }
    }

    (output, additions, removals)
}

fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n")
}
