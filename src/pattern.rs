//! Wikilink pattern construction for one retargeting operation.
//!
//! A [`Pattern`] recognizes every textual form a link to the old identifier can
//! take: `[[name]]`, `![[name]]`, `[[name|alias]]`, `[[name#^anchor]]`,
//! `[[name#heading]]`, and optionally a bare `^anchor` outside any link.

use std::ops::Range;

use regex::{Captures, Regex};

use crate::error::Error;
use crate::types::LinkKind;

/// Which file names a pattern accepts inside `[[...]]`.
#[derive(Debug, Clone)]
enum FileFilter {
    /// Any file name (anchor search).
    Any,
    /// Only the listed names, matched literally.
    Named(Vec<String>),
}

/// One occurrence found by a [`Pattern`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    /// Display alias after `|`, if present.
    pub alias: Option<String>,
    /// Whether the link carried the `!` embed marker.
    pub embed: bool,
    /// File name inside the link, trimmed. `None` for a bare anchor.
    pub file: Option<String>,
    /// Byte range of the hit in the searched text.
    pub range: Range<usize>,
    /// The matched substring.
    pub text: String,
}

/// A compiled matcher. Holds no search state, so the same pattern can be
/// applied to every line and node independently.
#[derive(Debug, Clone)]
pub struct Pattern {
    /// Bare anchor token (`^anchor`) to look for outside links.
    bare: Option<String>,
    /// Link-form regex.
    link: Regex,
}

/// Builds a [`Pattern`] from the old identifier, anchor, and link kind.
#[derive(Debug, Clone)]
pub struct PatternBuilder {
    /// Block id or heading text.
    anchor: Option<String>,
    /// Whether bare `^anchor` tokens are also matched.
    bare_anchors: bool,
    /// Accepted file names.
    files: FileFilter,
    /// Link shape.
    kind: LinkKind,
}

impl Pattern {
    /// Every hit in `text`, in text order. Bare anchors overlapping a link
    /// hit are not reported twice.
    pub fn hits(&self, text: &str) -> Vec<Hit> {
        let mut hits: Vec<Hit> = self.link.captures_iter(text).filter_map(|caps| return link_hit(&caps)).collect();

        if let Some(token) = &self.bare {
            for range in bare_anchor_ranges(text, token) {
                let overlaps = hits.iter().any(|h| return h.range.start < range.end && range.start < h.range.end);
                if overlaps {
                    continue;
                }
                hits.push(Hit {
                    alias: None,
                    embed: false,
                    file: None,
                    text: token.clone(),
                    range,
                });
            }
        }

        hits.sort_by_key(|h| return h.range.start);
        return hits;
    }
}

impl PatternBuilder {
    /// Accept links to any additional file name.
    #[must_use]
    pub fn also_file(mut self, name: &str) -> Self {
        if let FileFilter::Named(names) = &mut self.files {
            names.push(name.trim().to_string());
        }
        return self;
    }

    /// Set the block id (without `^`) or heading text.
    #[must_use]
    pub fn anchor(mut self, anchor: Option<&str>) -> Self {
        self.anchor = anchor.map(|a| return a.trim().trim_start_matches('^').to_string()).filter(|a| return !a.is_empty());
        return self;
    }

    /// Accept links to any file name.
    #[must_use]
    pub fn any_file(mut self) -> Self {
        self.files = FileFilter::Any;
        return self;
    }

    /// Also match bare `^anchor` tokens. Only meaningful for block links.
    #[must_use]
    pub const fn bare_anchors(mut self, enabled: bool) -> Self {
        self.bare_anchors = enabled;
        return self;
    }

    /// Compile the pattern.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingAnchor` for block or heading links without an
    /// anchor, `Error::MissingOldName` when no usable file name was given,
    /// or `Error::Pattern` if the regex fails to compile.
    pub fn build(self) -> Result<Pattern, Error> {
        let fragment = match (self.kind, self.anchor.as_deref()) {
            (LinkKind::Plain, _) => String::new(),
            (LinkKind::Block, Some(a)) => format!(r"\s*#\s*\^{}\s*", regex::escape(a)),
            (LinkKind::Heading, Some(h)) => format!(r"\s*#\s*{}\s*", regex::escape(h)),
            (LinkKind::Block | LinkKind::Heading, None) => {
                return Err(Error::MissingAnchor { kind: self.kind.name() });
            },
        };

        let file = match &self.files {
            FileFilter::Any => r"[^\]#|]+?".to_string(),
            FileFilter::Named(names) => {
                let escaped: Vec<String> = names.iter().filter(|n| return !n.is_empty()).map(|n| return regex::escape(n)).collect();
                if escaped.is_empty() {
                    return Err(Error::MissingOldName);
                }
                escaped.join("|")
            },
        };

        let link = Regex::new(&format!(
            r"(?P<embed>!)?\[\[\s*(?P<file>{file})\s*{fragment}(?:\|(?P<alias>[^\]]*))?\]\]"
        ))?;

        let bare = match (self.kind, self.bare_anchors, &self.anchor) {
            (LinkKind::Block, true, Some(a)) => Some(format!("^{a}")),
            _ => None,
        };

        return Ok(Pattern { bare, link });
    }

    /// Start a pattern for `old_name` with the given link kind.
    pub fn new(kind: LinkKind, old_name: &str) -> Self {
        return Self {
            anchor: None,
            bare_anchors: false,
            files: FileFilter::Named(vec![old_name.trim().to_string()]),
            kind,
        };
    }
}

/// Byte ranges of every standalone `token` (a `^anchor`) in `text`.
///
/// A token is standalone when it sits outside any `[[...]]`, is not directly
/// preceded by `#`, and is followed by whitespace, `]`, or the end of the
/// text, so `^abc` never matches the start of `^abc1`.
pub fn bare_anchor_ranges(text: &str, token: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    for (start, _) in text.match_indices(token) {
        let end = start.saturating_add(token.len());
        let before = text.get(..start).unwrap_or("");
        let preceded_by_hash = before.ends_with('#');
        let inside_link = before
            .rfind("[[")
            .is_some_and(|open| return before.rfind("]]").is_none_or(|close| return close < open));
        let next = text.get(end..).and_then(|after| return after.chars().next());
        let boundary = next.is_none_or(|c| return c.is_whitespace() || c == ']');
        if !preceded_by_hash && !inside_link && boundary {
            ranges.push(start..end);
        }
    }
    return ranges;
}

/// Convert a regex capture into a link hit.
fn link_hit(caps: &Captures<'_>) -> Option<Hit> {
    let whole = caps.get(0)?;
    return Some(Hit {
        alias: caps.name("alias").map(|a| return a.as_str().to_string()),
        embed: caps.name("embed").is_some(),
        file: caps.name("file").map(|f| return f.as_str().trim().to_string()),
        range: whole.range(),
        text: whole.as_str().to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(old: &str, anchor: &str) -> Pattern {
        return PatternBuilder::new(LinkKind::Block, old).anchor(Some(anchor)).build().unwrap();
    }

    #[test]
    fn plain_matches_link_alias_and_embed() {
        let pattern = PatternBuilder::new(LinkKind::Plain, "Old Note").build().unwrap();
        let hits = pattern.hits("See [[Old Note]], ![[Old Note|shown]] and [[Old Note#Intro]].");

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "[[Old Note]]");
        assert!(!hits[0].embed);
        assert_eq!(hits[1].alias.as_deref(), Some("shown"));
        assert!(hits[1].embed);
    }

    #[test]
    fn escapes_punctuation_in_names() {
        let pattern = PatternBuilder::new(LinkKind::Plain, "v1.2 (draft)").build().unwrap();
        assert!(!pattern.hits("[[v1.2 (draft)]]").is_empty());
        assert!(pattern.hits("[[v1x2 (draft)]]").is_empty());
    }

    #[test]
    fn block_tolerates_whitespace_around_hash() {
        let pattern = block("noteB", "xyz1");
        let hits = pattern.hits("a [[ noteB # ^xyz1 ]] b [[noteB#^xyz1|alias]]");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].file.as_deref(), Some("noteB"));
        assert_eq!(hits[1].alias.as_deref(), Some("alias"));
    }

    #[test]
    fn bare_anchor_respects_token_boundary() {
        let pattern = PatternBuilder::new(LinkKind::Block, "noteB")
            .anchor(Some("abc"))
            .bare_anchors(true)
            .build()
            .unwrap();

        assert!(pattern.hits("text ^abc1").is_empty());
        let hits = pattern.hits("para ^abc\nmore ^abc]");
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| return h.file.is_none()));
    }

    #[test]
    fn bare_anchor_inside_link_is_not_reported_twice() {
        let pattern = PatternBuilder::new(LinkKind::Block, "noteB")
            .any_file()
            .anchor(Some("abc"))
            .bare_anchors(true)
            .build()
            .unwrap();
        let hits = pattern.hits("[[noteC#^abc]] ^abc");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].file.as_deref(), Some("noteC"));
        assert_eq!(hits[1].file, None);
    }

    #[test]
    fn anchor_inside_spaced_link_is_not_bare() {
        assert!(bare_anchor_ranges("[[noteC # ^abc]]", "^abc").is_empty());
        assert_eq!(bare_anchor_ranges("[[noteC # ^abc]] ^abc", "^abc"), vec![17..21]);
        assert_eq!(bare_anchor_ranges("[[x]] ^abc", "^abc"), vec![6..10]);
    }

    #[test]
    fn heading_is_matched_verbatim_and_escaped() {
        let pattern = PatternBuilder::new(LinkKind::Heading, "guide")
            .anchor(Some("Step 1 (setup)"))
            .build()
            .unwrap();
        assert!(!pattern.hits("[[guide#Step 1 (setup)]]").is_empty());
        assert!(pattern.hits("[[guide#step 1 (setup)]]").is_empty());
    }

    #[test]
    fn also_file_accepts_second_name() {
        let pattern = PatternBuilder::new(LinkKind::Block, "noteB")
            .also_file("noteC")
            .anchor(Some("x"))
            .build()
            .unwrap();
        assert_eq!(pattern.hits("[[noteB#^x]] [[noteC#^x]] [[noteD#^x]]").len(), 2);
    }

    #[test]
    fn block_without_anchor_is_rejected() {
        let result = PatternBuilder::new(LinkKind::Block, "noteB").build();
        assert!(matches!(result, Err(Error::MissingAnchor { .. })));
    }

    #[test]
    fn empty_old_name_is_rejected() {
        let result = PatternBuilder::new(LinkKind::Plain, "  ").build();
        assert!(matches!(result, Err(Error::MissingOldName)));
    }
}
