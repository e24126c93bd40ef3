//! Delimited-section editing for video descriptions.
//!
//! A description may carry one block of affiliate content bounded by a
//! literal start marker and a literal end marker. [`SectionEditor`] finds,
//! extracts, removes, and replaces that block while leaving the text around
//! it intact. Only the first start-to-end span (non-greedy, across newlines)
//! is ever recognized.
//!
//! All operations are pure string transforms with no I/O, so one editor can
//! be shared freely.

mod normalize;

use regex::Regex;
use tubekeeper_shared::{Result, SectionConfig, TubekeeperError, UpsertPolicy};

/// Marker used for both ends of the section unless configured otherwise.
pub const DEFAULT_MARKER: &str = "~~~~~~~~~~~~~~";

// ---------------------------------------------------------------------------
// Markers
// ---------------------------------------------------------------------------

/// The literal start/end pair that delimits a section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    start: String,
    end: String,
}

impl Markers {
    /// Create a marker pair. Both markers must contain non-whitespace text.
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Result<Self> {
        let start = start.into();
        let end = end.into();

        if start.trim().is_empty() || end.trim().is_empty() {
            return Err(TubekeeperError::validation(
                "section markers must not be empty or whitespace",
            ));
        }
        if start.contains('\n') || end.contains('\n') {
            return Err(TubekeeperError::validation(
                "section markers must fit on a single line",
            ));
        }

        Ok(Self { start, end })
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn end(&self) -> &str {
        &self.end
    }
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            start: DEFAULT_MARKER.into(),
            end: DEFAULT_MARKER.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// SplitSection
// ---------------------------------------------------------------------------

/// Three-way partition of a description around its section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitSection {
    /// Text before the start marker, right-trimmed.
    pub before: String,
    /// Trimmed section content, `None` when no bounded span exists.
    pub section: Option<String>,
    /// Text after the end marker, left-trimmed.
    pub after: String,
}

// ---------------------------------------------------------------------------
// SectionEditor
// ---------------------------------------------------------------------------

/// Locates and rewrites the delimited section of a description.
#[derive(Debug, Clone)]
pub struct SectionEditor {
    markers: Markers,
    policy: UpsertPolicy,
    span_re: Regex,
}

impl SectionEditor {
    /// Build an editor for one marker pair and placement policy.
    pub fn new(markers: Markers, policy: UpsertPolicy) -> Result<Self> {
        let pattern = format!(
            "(?s){}(.*?){}",
            regex::escape(markers.start()),
            regex::escape(markers.end())
        );
        let span_re = Regex::new(&pattern)
            .map_err(|e| TubekeeperError::validation(format!("invalid section markers: {e}")))?;

        Ok(Self {
            markers,
            policy,
            span_re,
        })
    }

    /// Build an editor from the `[section]` config table.
    pub fn from_config(config: &SectionConfig) -> Result<Self> {
        let markers = Markers::new(&config.start_marker, &config.end_marker)?;
        Self::new(markers, config.policy)
    }

    pub fn markers(&self) -> &Markers {
        &self.markers
    }

    pub fn policy(&self) -> UpsertPolicy {
        self.policy
    }

    /// Return the trimmed content of the first section, if any.
    pub fn extract(&self, body: &str) -> Option<String> {
        self.span_re
            .captures(body)
            .map(|caps| caps[1].trim().to_string())
    }

    /// Delete the first section (markers included) and tidy whitespace.
    ///
    /// Runs of three or more newlines collapse to two and the result is
    /// trimmed, so text without a section is only normalized.
    pub fn remove(&self, body: &str) -> String {
        let stripped = self.span_re.replacen(body, 1, "");
        normalize::tidy(&stripped)
    }

    /// Partition `body` into the text before, inside, and after the section.
    pub fn split_around(&self, body: &str) -> SplitSection {
        match self.span_re.captures(body) {
            Some(caps) => {
                let span = caps.get(0).expect("capture group 0 always exists");
                SplitSection {
                    before: body[..span.start()].trim_end().to_string(),
                    section: Some(caps[1].trim().to_string()),
                    after: body[span.end()..].trim_start().to_string(),
                }
            }
            None => SplitSection {
                before: body.trim_end().to_string(),
                section: None,
                after: String::new(),
            },
        }
    }

    /// Number of complete sections in `body`.
    ///
    /// Well-formed descriptions hold zero or one. More than one usually
    /// means an earlier edit used a different marker pair.
    pub fn section_count(&self, body: &str) -> usize {
        self.span_re.find_iter(body).count()
    }

    /// Insert `content` as the section of `body`, replacing any existing one.
    ///
    /// Idempotent: applying the same content twice gives the same text as
    /// applying it once. Content that itself contains a marker is rejected,
    /// since it would end the section early on the next read. A body with a
    /// marker outside its first section (a stray divider line, a second
    /// section) is rejected too: the marker would pair with the new block
    /// and swallow the text in between.
    ///
    /// The `"\n\n"` separator before the section is left out when nothing
    /// precedes it, so a body that is only a section never gains leading
    /// blank lines.
    pub fn upsert_section(&self, body: &str, content: &str) -> Result<String> {
        if self.contains_marker(content) {
            return Err(TubekeeperError::validation(
                "section content must not contain the section markers",
            ));
        }

        let split = self.split_around(body);
        if self.contains_marker(&split.before) || self.contains_marker(&split.after) {
            return Err(TubekeeperError::validation(
                "description has a section marker outside its section; \
                 remove the stray marker before updating",
            ));
        }

        let block = self.render_block(content);

        let updated = match self.policy {
            UpsertPolicy::PreservePosition => {
                normalize::join_blocks([split.before.as_str(), block.as_str(), split.after.as_str()])
            }
            UpsertPolicy::AppendAtEnd => {
                let base = self.remove(body);
                normalize::join_blocks([base.as_str(), block.as_str()])
            }
        };

        tracing::debug!(
            policy = %self.policy,
            old_len = body.len(),
            new_len = updated.len(),
            "section upserted"
        );

        Ok(updated)
    }

    fn contains_marker(&self, text: &str) -> bool {
        text.contains(self.markers.start()) || text.contains(self.markers.end())
    }

    /// Render `content` wrapped in the marker lines.
    fn render_block(&self, content: &str) -> String {
        format!("{}\n{content}\n{}", self.markers.start(), self.markers.end())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const M: &str = DEFAULT_MARKER;

    fn editor() -> SectionEditor {
        SectionEditor::new(Markers::default(), UpsertPolicy::PreservePosition).unwrap()
    }

    fn append_editor() -> SectionEditor {
        SectionEditor::new(Markers::default(), UpsertPolicy::AppendAtEnd).unwrap()
    }

    fn html_editor() -> SectionEditor {
        let markers = Markers::new("<!-- links -->", "<!-- /links -->").unwrap();
        SectionEditor::new(markers, UpsertPolicy::PreservePosition).unwrap()
    }

    fn with_section(before: &str, content: &str, after: &str) -> String {
        format!("{before}{M}\n{content}\n{M}{after}")
    }

    /// Bodies covering the interesting shapes: empty, plain, sectioned,
    /// whitespace-only surroundings, and messy blank lines.
    fn sample_bodies() -> Vec<String> {
        vec![
            String::new(),
            "Hello".into(),
            "Hello\n\n\n\nWorld\n".into(),
            "   \n\t".into(),
            with_section("Hello\n\n", "old content", "\n\nWorld"),
            with_section("", "only links", ""),
            with_section("Intro", "x", "Outro"),
            with_section("  \n\n", "old", "\n\n  "),
            format!("Timestamps:\n0:00 Intro\n\n\n\n{M}\nA\n\nB\n{M}\n\n\nThanks!\n"),
        ]
    }

    /// Bodies with a marker that has no partner, or a second section.
    fn stray_marker_bodies() -> Vec<String> {
        vec![
            format!("Chapters\n{M}\n0:00 Intro"),
            format!("{M}\nDivider at the top"),
            with_section("Intro\n\n", "links", &format!("\n\nOutro\n{M}")),
            format!("{}\n\n{}", with_section("", "a", ""), with_section("", "b", "")),
        ]
    }

    #[test]
    fn scenario_replaces_section_in_place() {
        let body = with_section("Hello\n\n", "old content", "\n\nWorld");
        let result = editor().upsert_section(&body, "new content").unwrap();
        assert_eq!(result, with_section("Hello\n\n", "new content", "\n\nWorld"));
    }

    #[test]
    fn extract_returns_trimmed_content() {
        let body = with_section("Hello\n\n", "  old content \n", "\n\nWorld");
        assert_eq!(editor().extract(&body).as_deref(), Some("old content"));
    }

    #[test]
    fn extract_matches_first_span_only() {
        let body = format!("{M} first {M} second {M}");
        assert_eq!(editor().extract(&body).as_deref(), Some("first"));

        let body = "A\n<!-- links -->\nx\n<!-- /links -->\nB\n<!-- links -->\ny\n<!-- /links -->";
        assert_eq!(html_editor().extract(body).as_deref(), Some("x"));
        assert_eq!(html_editor().section_count(body), 2);
    }

    #[test]
    fn dangling_marker_is_not_a_section() {
        let body = format!("Text {M} dangling");
        assert_eq!(editor().extract(&body), None);
        assert_eq!(editor().remove(&body), body);
        assert_eq!(editor().section_count(&body), 0);
    }

    #[test]
    fn bodies_without_sections() {
        let ed = editor();
        for body in ["", "Hello", "Hello\n\n\n\nWorld\n", "   \n\t", "  padded  "] {
            assert_eq!(ed.extract(body), None, "body: {body:?}");
            assert_eq!(ed.remove(body), normalize::tidy(body), "body: {body:?}");
        }
    }

    #[test]
    fn remove_deletes_section_and_collapses_newlines() {
        let body = with_section("Hello\n\n", "old content", "\n\nWorld");
        assert_eq!(editor().remove(&body), "Hello\n\nWorld");
    }

    #[test]
    fn remove_only_touches_first_section() {
        let body = "A\n<!-- links -->\nx\n<!-- /links -->\nB\n<!-- links -->\ny\n<!-- /links -->";
        assert_eq!(
            html_editor().remove(body),
            "A\n\nB\n<!-- links -->\ny\n<!-- /links -->"
        );
    }

    #[test]
    fn remove_preserves_surrounding_text() {
        let ed = editor();
        let before = "Chapters:\n0:00 Intro\n1:30 Main";
        let after = "Music by someone\nLicensed CC-BY";
        let body = with_section(&format!("{before}\n\n"), "links", &format!("\n{after}"));
        let removed = ed.remove(&body);
        assert!(removed.starts_with(before));
        assert!(removed.ends_with(after));
        assert!(!removed.contains(M));
    }

    #[test]
    fn split_around_partitions_body() {
        let body = with_section("Hello  \n\n", " links ", "\n\n World");
        let split = editor().split_around(&body);
        assert_eq!(split.before, "Hello");
        assert_eq!(split.section.as_deref(), Some("links"));
        assert_eq!(split.after, "World");
    }

    #[test]
    fn split_around_without_section() {
        let split = editor().split_around("  Hello world \n\n");
        assert_eq!(split.before, "  Hello world");
        assert_eq!(split.section, None);
        assert_eq!(split.after, "");
    }

    #[test]
    fn split_around_section_only_body() {
        let split = editor().split_around(&with_section("", "only links", ""));
        assert_eq!(split.before, "");
        assert_eq!(split.section.as_deref(), Some("only links"));
        assert_eq!(split.after, "");
    }

    #[test]
    fn upsert_appends_when_no_section() {
        let result = editor().upsert_section("Hello", "links").unwrap();
        assert_eq!(result, format!("Hello\n\n{M}\nlinks\n{M}"));
    }

    #[test]
    fn upsert_empty_content_gives_empty_section() {
        let result = editor().upsert_section("Intro", "").unwrap();
        assert_eq!(result, format!("Intro\n\n{M}\n\n{M}"));
        assert_eq!(editor().extract(&result).as_deref(), Some(""));
    }

    #[test]
    fn upsert_into_empty_or_blank_body_has_no_leading_separator() {
        for body in ["", "   \n\n\t"] {
            let result = editor().upsert_section(body, "links").unwrap();
            assert_eq!(result, format!("{M}\nlinks\n{M}"));
        }

        let body = with_section("  \n\n", "old", "\n\n  ");
        let result = editor().upsert_section(&body, "new").unwrap();
        assert_eq!(result, format!("{M}\nnew\n{M}"));
    }

    #[test]
    fn append_policy_moves_section_to_end() {
        let body = with_section("Hello\n\n", "old", "\n\nWorld");
        let result = append_editor().upsert_section(&body, "new").unwrap();
        assert_eq!(result, format!("Hello\n\nWorld\n\n{M}\nnew\n{M}"));
    }

    #[test]
    fn distinct_markers_round_trip() {
        let ed = html_editor();
        let result = ed.upsert_section("Intro\n\nOutro", "affiliate").unwrap();
        assert_eq!(
            result,
            "Intro\n\nOutro\n\n<!-- links -->\naffiliate\n<!-- /links -->"
        );
        assert_eq!(ed.extract(&result).as_deref(), Some("affiliate"));
    }

    #[test]
    fn content_containing_marker_is_rejected() {
        let err = editor()
            .upsert_section("Hello", &format!("links {M} more"))
            .unwrap_err();
        assert!(err.to_string().contains("must not contain"));
    }

    #[test]
    fn stray_marker_in_body_is_rejected() {
        for ed in [editor(), append_editor()] {
            for body in stray_marker_bodies() {
                let err = ed.upsert_section(&body, "links").unwrap_err();
                assert!(
                    matches!(err, TubekeeperError::Validation { .. }),
                    "policy {} body {body:?}",
                    ed.policy()
                );
                assert!(err.to_string().contains("stray marker"));
            }
        }
    }

    #[test]
    fn divider_line_keeps_user_text() {
        let body = format!("Chapters\n{M}\n0:00 Intro");
        assert!(editor().upsert_section(&body, "links").is_err());
        assert_eq!(editor().extract(&body), None);
        assert!(editor().remove(&body).contains("0:00 Intro"));
    }

    #[test]
    fn stray_marker_with_distinct_pair_is_rejected() {
        let body = "Intro\n<!-- /links -->\nOutro";
        assert!(html_editor().upsert_section(body, "affiliate").is_err());
    }

    #[test]
    fn round_trip_for_all_policies() {
        let contents = ["new content", "", "  padded\n\nlines  ", "Code: BRAIN10 - https://example.com"];
        for ed in [editor(), append_editor()] {
            for body in sample_bodies() {
                for content in contents {
                    let updated = ed.upsert_section(&body, content).unwrap();
                    assert_eq!(
                        ed.extract(&updated).as_deref(),
                        Some(content.trim()),
                        "policy {} body {body:?} content {content:?}",
                        ed.policy()
                    );
                    assert_eq!(ed.section_count(&updated), 1);
                }
            }
        }
    }

    #[test]
    fn upsert_is_idempotent_for_all_policies() {
        let contents = ["links", "", "multi\nline\n\n\nblock"];
        for ed in [editor(), append_editor()] {
            for body in sample_bodies() {
                for content in contents {
                    let once = ed.upsert_section(&body, content).unwrap();
                    let twice = ed.upsert_section(&once, content).unwrap();
                    assert_eq!(
                        once,
                        twice,
                        "policy {} body {body:?} content {content:?}",
                        ed.policy()
                    );
                }
            }
        }
    }

    #[test]
    fn empty_markers_are_rejected() {
        assert!(Markers::new("", M).is_err());
        assert!(Markers::new(M, "   ").is_err());
        assert!(Markers::new("a\nb", M).is_err());
    }

    #[test]
    fn from_config_uses_configured_pair() {
        let config = SectionConfig {
            start_marker: "[[links]]".into(),
            end_marker: "[[/links]]".into(),
            policy: UpsertPolicy::AppendAtEnd,
        };
        let ed = SectionEditor::from_config(&config).unwrap();
        assert_eq!(ed.markers().start(), "[[links]]");
        assert_eq!(ed.policy(), UpsertPolicy::AppendAtEnd);
        assert_eq!(ed.extract("a [[links]] b [[/links]] c").as_deref(), Some("b"));
    }
}
