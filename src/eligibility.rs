//! Decide which scanned matches should actually be rewritten.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::pattern::bare_anchor_ranges;
use crate::types::{DocumentKind, DocumentRef, LinkKind, ReferenceMatch, note_name};
use crate::vault::Vault;

/// What the filter checks for one operation.
#[derive(Debug, Clone, Copy)]
pub struct EligibilityRules<'a> {
    /// Block id or heading text of the operation.
    pub anchor: Option<&'a str>,
    /// Skip block links whose anchor still lives at its origin note.
    pub check_origin: bool,
    /// Rewrite even when the anchor still lives at its origin.
    pub force_override: bool,
    /// Link kind of the operation.
    pub kind: LinkKind,
    /// Note the links are being moved to.
    pub target: &'a str,
}

/// Matches that survived the filter, plus how many were already current.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filtered {
    /// Matches already pointing at the target.
    pub already_updated: usize,
    /// Matches to rewrite, in scan order.
    pub eligible: Vec<ReferenceMatch>,
}

/// Prune scanned matches.
///
/// Matches inside the target note are dropped. Matches whose link already
/// names the target are dropped and counted as already updated. With
/// `check_origin` set and no force override, block matches whose anchor is
/// still defined in the note they point at are dropped too.
pub fn filter(
    vault: &dyn Vault,
    documents: &[DocumentRef],
    matches: Vec<ReferenceMatch>,
    rules: &EligibilityRules<'_>,
) -> Filtered {
    let target = rules.target.trim();
    let mut origins: HashMap<String, bool> = HashMap::new();
    let mut filtered = Filtered::default();

    for candidate in matches {
        if note_name(&candidate.document) == target {
            continue;
        }

        if is_already_updated(&candidate, target) {
            filtered.already_updated = filtered.already_updated.saturating_add(1);
            continue;
        }

        if origin_still_holds_anchor(vault, documents, &candidate, rules, &mut origins) {
            tracing::debug!(
                path = %candidate.document.display(),
                text = %candidate.matched_text,
                "anchor still present at origin, skipping"
            );
            continue;
        }

        filtered.eligible.push(candidate);
    }

    return filtered;
}

/// Whether the matched link already names the target note.
pub fn is_already_updated(candidate: &ReferenceMatch, target: &str) -> bool {
    return candidate.source_file.as_deref().is_some_and(|f| return f.trim() == target.trim());
}

/// The note a block match points at. A bare anchor points at the focused
/// note, or failing that at the flat note it sits in.
fn origin_of(vault: &dyn Vault, documents: &[DocumentRef], candidate: &ReferenceMatch) -> Option<String> {
    if let Some(source) = &candidate.source_file {
        return Some(source.clone());
    }
    if let Some(context) = vault.contextual_document_name() {
        return Some(context);
    }
    let is_flat = documents
        .iter()
        .find(|d| return d.path == candidate.document)
        .is_none_or(|d| return d.kind == DocumentKind::Flat);
    if is_flat && !candidate.is_graph_node() {
        return Some(note_name(&candidate.document));
    }
    return None;
}

/// Check the origin rule, caching one read per origin note.
fn origin_still_holds_anchor(
    vault: &dyn Vault,
    documents: &[DocumentRef],
    candidate: &ReferenceMatch,
    rules: &EligibilityRules<'_>,
    origins: &mut HashMap<String, bool>,
) -> bool {
    if !rules.check_origin || rules.force_override || rules.kind != LinkKind::Block {
        return false;
    }
    let Some(anchor) = rules.anchor else {
        return false;
    };
    let Some(origin) = origin_of(vault, documents, candidate) else {
        return false;
    };

    if let Some(holds) = origins.get(&origin) {
        return *holds;
    }

    let token = format!("^{anchor}");
    let path = origin_path(documents, &origin);
    let holds = vault
        .read_document(&path)
        .is_ok_and(|content| return !bare_anchor_ranges(&content, &token).is_empty());
    origins.insert(origin, holds);
    return holds;
}

/// Locate an origin note among the listed flat documents, falling back to
/// `<name>.md` at the vault root.
fn origin_path(documents: &[DocumentRef], origin: &str) -> PathBuf {
    return documents
        .iter()
        .find(|d| return d.kind == DocumentKind::Flat && d.note_name() == origin)
        .map_or_else(|| return PathBuf::from(format!("{origin}.md")), |d| return d.path.clone());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::PatternBuilder;
    use crate::scanner;
    use crate::vault::memory::MemoryVault;

    fn anchor_search(vault: &MemoryVault, anchor: &str, target: &str, force: bool) -> Filtered {
        let pattern = PatternBuilder::new(LinkKind::Block, target)
            .any_file()
            .anchor(Some(anchor))
            .bare_anchors(true)
            .build()
            .unwrap();
        let docs = vault.list_documents().unwrap();
        let matches = scanner::scan(vault, &docs, &pattern);
        let rules = EligibilityRules {
            anchor: Some(anchor),
            check_origin: true,
            force_override: force,
            kind: LinkKind::Block,
            target,
        };
        return filter(vault, &docs, matches, &rules);
    }

    #[test]
    fn origin_with_anchor_blocks_unless_forced() {
        let vault = MemoryVault::with(&[
            ("noteA.md", "See [[noteB#^xyz1]] for details."),
            ("noteB.md", "^xyz1 Some content"),
        ]);

        let gated = anchor_search(&vault, "xyz1", "noteC", false);
        assert!(gated.eligible.is_empty());

        let forced = anchor_search(&vault, "xyz1", "noteC", true);
        assert_eq!(forced.eligible.len(), 2);
    }

    #[test]
    fn moved_block_makes_links_eligible() {
        let vault = MemoryVault::with(&[
            ("noteA.md", "See [[noteB#^xyz1]] for details."),
            ("noteB.md", "nothing left here"),
            ("noteC.md", "Moved paragraph ^xyz1"),
        ]);

        let result = anchor_search(&vault, "xyz1", "noteC", false);
        assert_eq!(result.eligible.len(), 1);
        assert_eq!(result.eligible[0].document, PathBuf::from("noteA.md"));
    }

    #[test]
    fn target_note_never_matches_itself() {
        let vault = MemoryVault::with(&[
            ("noteC.md", "Moved ^xyz1 and [[noteB#^xyz1]]"),
            ("noteA.md", "[[noteB#^xyz1]]"),
        ]);
        let result = anchor_search(&vault, "xyz1", "noteC", true);
        assert!(result.eligible.iter().all(|m| return m.document != PathBuf::from("noteC.md")));
        assert_eq!(result.eligible.len(), 1);
    }

    #[test]
    fn links_to_target_count_as_already_updated() {
        let vault = MemoryVault::with(&[("noteA.md", "[[noteC#^xyz1]] and [[noteC#^xyz1|alias]]")]);
        let result = anchor_search(&vault, "xyz1", "noteC", false);
        assert!(result.eligible.is_empty());
        assert_eq!(result.already_updated, 2);
    }

    #[test]
    fn bare_anchor_uses_contextual_note() {
        let mut vault = MemoryVault::with(&[
            ("board.canvas", r#"{"nodes":[{"id":"n1","type":"text","text":"^xyz1"}]}"#),
            ("noteB.md", "^xyz1 still here"),
        ]);
        vault.context = Some("noteB".to_string());

        let result = anchor_search(&vault, "xyz1", "noteC", false);
        assert!(result.eligible.is_empty());
    }

    #[test]
    fn missing_origin_does_not_block() {
        let vault = MemoryVault::with(&[("noteA.md", "[[gone#^xyz1]]")]);
        let result = anchor_search(&vault, "xyz1", "noteC", false);
        assert_eq!(result.eligible.len(), 1);
    }

    #[test]
    fn origin_is_read_once() {
        let vault = MemoryVault::with(&[
            ("a.md", "[[noteB#^q]] [[noteB#^q]]"),
            ("b.md", "[[noteB#^q]]"),
            ("noteB.md", "text"),
        ]);
        let result = anchor_search(&vault, "q", "noteC", false);
        assert_eq!(result.eligible.len(), 3);
        // One read from the scan, one from the origin check.
        assert_eq!(vault.reads("noteB.md"), 2);
    }
}
