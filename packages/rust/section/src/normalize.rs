//! Whitespace passes applied around section edits.

use std::sync::LazyLock;

use regex::Regex;

/// Separator placed between the section and neighbouring text.
pub(crate) const BLOCK_SEPARATOR: &str = "\n\n";

/// Collapse runs of 3+ newlines into exactly 2.
pub(crate) fn collapse_blank_lines(text: &str) -> String {
    static MULTI_NEWLINE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    MULTI_NEWLINE_RE.replace_all(text, BLOCK_SEPARATOR).to_string()
}

/// Collapse blank-line runs, then trim both ends.
pub(crate) fn tidy(text: &str) -> String {
    collapse_blank_lines(text).trim().to_string()
}

/// Join non-empty parts with the block separator.
pub(crate) fn join_blocks<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapse_blank_lines_collapses_excess() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn collapse_blank_lines_keeps_double() {
        assert_eq!(collapse_blank_lines("a\n\nb\nc"), "a\n\nb\nc");
    }

    #[test]
    fn tidy_trims_after_collapsing() {
        assert_eq!(tidy("\n\n  text\n\n\n\nmore  \n\n"), "text\n\nmore");
        assert_eq!(tidy("   \n\t "), "");
    }

    #[test]
    fn join_blocks_skips_empty_parts() {
        assert_eq!(join_blocks(["", "block", "after"]), "block\n\nafter");
        assert_eq!(join_blocks(["only"]), "only");
        assert_eq!(join_blocks(["", ""]), "");
    }
}
