//! Parse a block reference out of selected text.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::Error;

/// `note#^id` at the end of the selection.
#[allow(clippy::expect_used, reason = "hardcoded regex, checked by tests")]
static FILE_BLOCK_ID: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"([^#\^\[\]|]+)#\^([A-Za-z0-9-]+)\]*$").expect("valid regex"));

/// `^id` at the end of the selection.
#[allow(clippy::expect_used, reason = "hardcoded regex, checked by tests")]
static BLOCK_ID: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"\^([A-Za-z0-9-]+)\]*$").expect("valid regex"));

/// A block id and the note it lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSelection {
    /// Block id without the leading `^`.
    pub block_id: String,
    /// Note named by the selection, or the focused note for a bare `^id`.
    pub note: Option<String>,
}

/// Extract a block reference from selected text.
///
/// `note#^id` (optionally inside `[[...]]`) names its note directly; a bare
/// `^id` takes `context` as its note.
///
/// # Errors
///
/// Returns `Error::InvalidSelection` if the text holds neither form.
pub fn parse_selection(text: &str, context: Option<&str>) -> Result<BlockSelection, Error> {
    let trimmed = text.trim();

    if let Some(caps) = FILE_BLOCK_ID.captures(trimmed) {
        let note = caps.get(1).map(|m| return m.as_str().trim().to_string()).filter(|n| return !n.is_empty());
        if let Some(id) = caps.get(2) {
            return Ok(BlockSelection { block_id: id.as_str().to_string(), note });
        }
    }

    if let Some(caps) = BLOCK_ID.captures(trimmed) {
        if let Some(id) = caps.get(1) {
            return Ok(BlockSelection {
                block_id: id.as_str().to_string(),
                note: context.map(str::to_string),
            });
        }
    }

    return Err(Error::InvalidSelection { text: text.to_string() });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_and_block_id() {
        let sel = parse_selection("noteB#^xyz1", None).unwrap();
        assert_eq!(sel.block_id, "xyz1");
        assert_eq!(sel.note.as_deref(), Some("noteB"));
    }

    #[test]
    fn wrapped_link() {
        let sel = parse_selection("[[Project Plan#^a-1]]", None).unwrap();
        assert_eq!(sel.block_id, "a-1");
        assert_eq!(sel.note.as_deref(), Some("Project Plan"));
    }

    #[test]
    fn bare_block_id_uses_context() {
        let sel = parse_selection("Some paragraph ^blk9", Some("daily")).unwrap();
        assert_eq!(sel.block_id, "blk9");
        assert_eq!(sel.note.as_deref(), Some("daily"));
    }

    #[test]
    fn no_block_id() {
        assert!(matches!(parse_selection("just words", None), Err(Error::InvalidSelection { .. })));
    }
}
