//! Entry points: search for references, then apply an approved rewrite.

use crate::config::Config;
use crate::eligibility::{self, EligibilityRules};
use crate::error::Error;
use crate::ledger::Ledger;
use crate::pattern::{Pattern, PatternBuilder};
use crate::rewrite::{self, RewriteRequest};
use crate::scanner;
use crate::types::{DocumentRef, LinkKind, ReferenceMatch};
use crate::vault::Vault;

/// Result of applying a rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Documents were rewritten.
    Applied {
        /// Number of substitutions written.
        updated: usize,
    },
    /// The confirmation step rejected the batch; nothing was written.
    Cancelled,
}

/// Eligible matches and how many references were already current.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOutcome {
    /// References already pointing at the new note.
    pub already_updated: usize,
    /// References to rewrite.
    pub matches: Vec<ReferenceMatch>,
}

/// Asks the user to approve a pending rewrite.
pub trait Confirm {
    /// `true` to proceed with rewriting `matches`.
    fn confirm(&self, matches: &[ReferenceMatch], request: &RewriteRequest<'_>) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&[ReferenceMatch], &RewriteRequest<'_>) -> bool,
{
    fn confirm(&self, matches: &[ReferenceMatch], request: &RewriteRequest<'_>) -> bool {
        return self(matches, request);
    }
}

/// Runs searches and rewrites against one vault.
pub struct LinkMaintainer<'v> {
    /// Rewrite block links even when the block still exists at its origin.
    force_override: bool,
    /// Change log.
    ledger: Ledger,
    /// Ask before writing.
    require_confirmation: bool,
    /// Document store.
    vault: &'v dyn Vault,
}

impl<'v> LinkMaintainer<'v> {
    /// Rewrite approved matches to point at `new_name`.
    ///
    /// Opens a batch, asks `confirm` when confirmation is required (a
    /// rejection discards the batch before any write), rewrites, then
    /// flushes the batch to the change log.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingNewName` or `Error::MissingAnchor` for invalid
    /// input, or errors from listing the vault or writing the log.
    pub fn apply(
        &self,
        matches: &[ReferenceMatch],
        new_name: &str,
        anchor: Option<&str>,
        kind: LinkKind,
        confirm: &dyn Confirm,
    ) -> Result<ApplyOutcome, Error> {
        let anchor = clean_anchor(anchor);
        validate(new_name, anchor, kind)?;
        if matches.is_empty() {
            return Ok(ApplyOutcome::Applied { updated: 0 });
        }

        let request = RewriteRequest { anchor, kind, new_name: new_name.trim() };
        let subject = anchor
            .map(str::to_string)
            .or_else(|| return matches.first().and_then(|m| return m.source_file.clone()))
            .unwrap_or_default();
        let mut batch = Ledger::begin(&subject, request.new_name, kind);

        if self.require_confirmation && !confirm.confirm(matches, &request) {
            Ledger::discard(batch);
            return Ok(ApplyOutcome::Cancelled);
        }

        let documents = self.vault.list_documents()?;
        let outcome = rewrite::rewrite(self.vault, &documents, matches, &request, &self.ledger, Some(&mut batch));
        self.ledger.flush(batch, self.vault)?;

        return Ok(ApplyOutcome::Applied { updated: outcome.updated });
    }

    /// Build a maintainer from vault configuration.
    pub fn new(vault: &'v dyn Vault, config: &Config) -> Self {
        return Self {
            force_override: config.force_override,
            ledger: Ledger::new(config.enable_logging, config.log_path.clone()),
            require_confirmation: config.require_confirmation,
            vault,
        };
    }

    /// Find links to `old_name` (with the anchor, for block and heading
    /// links) that should be retargeted to `new_name`.
    ///
    /// Links that already name `new_name` are counted, not returned.
    ///
    /// # Errors
    ///
    /// Returns input validation errors before scanning, or errors from
    /// listing the vault or compiling the pattern.
    pub fn search(
        &self,
        old_name: &str,
        new_name: &str,
        anchor: Option<&str>,
        kind: LinkKind,
    ) -> Result<SearchOutcome, Error> {
        let anchor = clean_anchor(anchor);
        validate(new_name, anchor, kind)?;
        if old_name.trim().is_empty() {
            return Err(Error::MissingOldName);
        }

        let pattern = PatternBuilder::new(kind, old_name).also_file(new_name).anchor(anchor).build()?;
        let rules = EligibilityRules {
            anchor,
            check_origin: false,
            force_override: self.force_override,
            kind,
            target: new_name,
        };
        return self.run_search(&pattern, &rules);
    }

    /// Find every reference to block `anchor`, in any note, plus bare
    /// `^anchor` tokens, that should be retargeted to `exclude`, the note
    /// the block now lives in.
    ///
    /// Unless force override is configured, links whose origin note still
    /// defines the block are left alone.
    ///
    /// # Errors
    ///
    /// Returns input validation errors before scanning, or errors from
    /// listing the vault or compiling the pattern.
    pub fn search_by_anchor(&self, anchor: &str, exclude: &str) -> Result<SearchOutcome, Error> {
        let anchor = clean_anchor(Some(anchor));
        validate(exclude, anchor, LinkKind::Block)?;

        let pattern = PatternBuilder::new(LinkKind::Block, exclude)
            .any_file()
            .anchor(anchor)
            .bare_anchors(true)
            .build()?;
        let rules = EligibilityRules {
            anchor,
            check_origin: true,
            force_override: self.force_override,
            kind: LinkKind::Block,
            target: exclude,
        };
        return self.run_search(&pattern, &rules);
    }

    /// Scan the vault and filter the hits.
    ///
    /// # Errors
    ///
    /// Returns errors from listing the vault.
    fn run_search(
        &self,
        pattern: &Pattern,
        rules: &EligibilityRules<'_>,
    ) -> Result<SearchOutcome, Error> {
        let documents: Vec<DocumentRef> = self.vault.list_documents()?;
        let found = scanner::scan(self.vault, &documents, pattern);
        let filtered = eligibility::filter(self.vault, &documents, found, rules);
        return Ok(SearchOutcome {
            already_updated: filtered.already_updated,
            matches: filtered.eligible,
        });
    }
}

/// Trim an anchor and drop a leading `^`; empty anchors become `None`.
fn clean_anchor(anchor: Option<&str>) -> Option<&str> {
    return anchor.map(|a| return a.trim().trim_start_matches('^')).filter(|a| return !a.is_empty());
}

/// Reject missing input before any scanning or writing.
///
/// # Errors
///
/// Returns `Error::MissingNewName` or `Error::MissingAnchor`.
fn validate(new_name: &str, anchor: Option<&str>, kind: LinkKind) -> Result<(), Error> {
    if new_name.trim().is_empty() {
        return Err(Error::MissingNewName);
    }
    if anchor.is_none() && kind != LinkKind::Plain {
        return Err(Error::MissingAnchor { kind: kind.name() });
    }
    return Ok(());
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::path::PathBuf;

    use super::*;
    use crate::vault::memory::MemoryVault;

    fn always(matches: &[ReferenceMatch], _request: &RewriteRequest<'_>) -> bool {
        return !matches.is_empty();
    }

    fn scenario() -> MemoryVault {
        return MemoryVault::with(&[
            ("noteA.md", "See [[noteB#^xyz1]] for details."),
            ("noteB.md", "^xyz1 Some content"),
        ]);
    }

    #[test]
    fn block_move_scenario() {
        let vault = scenario();
        let config = Config::default();
        let maintainer = LinkMaintainer::new(&vault, &config);

        let found = maintainer.search("noteB", "noteC", Some("xyz1"), LinkKind::Block).unwrap();
        assert_eq!(found.matches.len(), 1);
        assert_eq!(found.matches[0].document, PathBuf::from("noteA.md"));

        let outcome = maintainer.apply(&found.matches, "noteC", Some("xyz1"), LinkKind::Block, &always).unwrap();
        assert_eq!(outcome, ApplyOutcome::Applied { updated: 1 });
        assert_eq!(vault.content("noteA.md"), "See [[noteC#^xyz1]] for details.");
        assert_eq!(vault.content("noteB.md"), "^xyz1 Some content");
        assert_eq!(vault.writes("noteB.md"), 0);

        let log = vault.log("link-maintainer-changes.md");
        assert!(log.contains("- [[noteA]] (Line 1)"));
        assert_eq!(log.matches("## Batch update at").count(), 1);

        let again = maintainer.search("noteB", "noteC", Some("xyz1"), LinkKind::Block).unwrap();
        assert!(again.matches.is_empty());
        assert_eq!(again.already_updated, 1);
    }

    #[test]
    fn apply_twice_updates_then_does_nothing() {
        let vault = MemoryVault::with(&[("a.md", "[[Old]] and ![[Old|x]]"), ("b.md", "[[Old]]")]);
        let config = Config::default();
        let maintainer = LinkMaintainer::new(&vault, &config);

        let found = maintainer.search("Old", "New", None, LinkKind::Plain).unwrap();
        let first = maintainer.apply(&found.matches, "New", None, LinkKind::Plain, &always).unwrap();
        let second = maintainer.apply(&found.matches, "New", None, LinkKind::Plain, &always).unwrap();

        assert_eq!(first, ApplyOutcome::Applied { updated: 3 });
        assert_eq!(second, ApplyOutcome::Applied { updated: 0 });
        assert_eq!(vault.content("a.md"), "[[New]] and ![[New|x]]");
        assert_eq!(vault.log("link-maintainer-changes.md").matches("## Batch update at").count(), 1);
    }

    #[test]
    fn cancelled_confirmation_writes_nothing() {
        let vault = scenario();
        let config = Config::default();
        let maintainer = LinkMaintainer::new(&vault, &config);
        let asked = Cell::new(0_u32);
        let reject = |_: &[ReferenceMatch], _: &RewriteRequest<'_>| {
            asked.set(asked.get().saturating_add(1));
            return false;
        };

        let found = maintainer.search("noteB", "noteC", Some("xyz1"), LinkKind::Block).unwrap();
        let outcome = maintainer.apply(&found.matches, "noteC", Some("xyz1"), LinkKind::Block, &reject).unwrap();

        assert_eq!(outcome, ApplyOutcome::Cancelled);
        assert_eq!(asked.get(), 1);
        assert_eq!(vault.writes("noteA.md"), 0);
        assert!(vault.log("link-maintainer-changes.md").is_empty());
    }

    #[test]
    fn confirmation_can_be_turned_off() {
        let vault = scenario();
        let mut config = Config::default();
        config.require_confirmation = false;
        let maintainer = LinkMaintainer::new(&vault, &config);
        let reject = |_: &[ReferenceMatch], _: &RewriteRequest<'_>| return false;

        let found = maintainer.search("noteB", "noteC", Some("xyz1"), LinkKind::Block).unwrap();
        let outcome = maintainer.apply(&found.matches, "noteC", Some("xyz1"), LinkKind::Block, &reject).unwrap();
        assert_eq!(outcome, ApplyOutcome::Applied { updated: 1 });
    }

    #[test]
    fn anchor_search_gated_by_origin() {
        let vault = scenario();
        let mut config = Config::default();
        let gated = LinkMaintainer::new(&vault, &config).search_by_anchor("xyz1", "noteC").unwrap();
        assert!(gated.matches.is_empty());

        config.force_override = true;
        let forced = LinkMaintainer::new(&vault, &config).search_by_anchor("^xyz1", "noteC").unwrap();
        assert_eq!(forced.matches.len(), 2);
    }

    #[test]
    fn link_and_bare_anchor_on_one_line_are_both_applied() {
        let vault = MemoryVault::with(&[("a.md", "[[noteB#^xyz1]] ^xyz1")]);
        let mut config = Config::default();
        config.force_override = true;
        let maintainer = LinkMaintainer::new(&vault, &config);

        let found = maintainer.search_by_anchor("xyz1", "noteC").unwrap();
        assert_eq!(found.matches.len(), 2);
        let outcome = maintainer.apply(&found.matches, "noteC", Some("xyz1"), LinkKind::Block, &always).unwrap();

        assert_eq!(outcome, ApplyOutcome::Applied { updated: 2 });
        assert_eq!(vault.content("a.md"), "[[noteC#^xyz1]] [[noteC#^xyz1]]");
    }

    #[test]
    fn anchor_boundary_is_exact() {
        let vault = MemoryVault::with(&[("a.md", "[[x#^abc1]] ^abc1\n^abc here"), ("noteC.md", "")]);
        let mut config = Config::default();
        config.force_override = true;
        let found = LinkMaintainer::new(&vault, &config).search_by_anchor("abc", "noteC").unwrap();

        assert_eq!(found.matches.len(), 1);
        assert_eq!(found.matches[0].matched_text, "^abc");
    }

    #[test]
    fn malformed_canvas_does_not_block_other_documents() {
        let vault = MemoryVault::with(&[
            ("bad.canvas", "{ not json"),
            ("a.md", "[[Old]]"),
            ("good.canvas", r#"{"nodes":[{"id":"n","type":"text","text":"[[Old]]"}]}"#),
        ]);
        let config = Config::default();
        let maintainer = LinkMaintainer::new(&vault, &config);

        let found = maintainer.search("Old", "New", None, LinkKind::Plain).unwrap();
        assert_eq!(found.matches.len(), 2);
        let outcome = maintainer.apply(&found.matches, "New", None, LinkKind::Plain, &always).unwrap();

        assert_eq!(outcome, ApplyOutcome::Applied { updated: 2 });
        assert_eq!(vault.content("bad.canvas"), "{ not json");
        assert!(vault.content("good.canvas").contains("[[New]]"));
    }

    #[test]
    fn missing_input_is_rejected_before_scanning() {
        let vault = scenario();
        let config = Config::default();
        let maintainer = LinkMaintainer::new(&vault, &config);

        assert!(matches!(maintainer.search("noteB", " ", Some("x"), LinkKind::Block), Err(Error::MissingNewName)));
        assert!(matches!(maintainer.search("noteB", "noteC", None, LinkKind::Heading), Err(Error::MissingAnchor { .. })));
        assert!(matches!(maintainer.search("", "noteC", None, LinkKind::Plain), Err(Error::MissingOldName)));
        assert!(matches!(maintainer.search_by_anchor("", "noteC"), Err(Error::MissingAnchor { .. })));
        assert_eq!(vault.reads("noteA.md"), 0);
    }

    #[test]
    fn heading_links_are_retargeted() {
        let vault = MemoryVault::with(&[("a.md", "[[guide#Setup (v2)|setup]] [[guide#Other]]")]);
        let config = Config::default();
        let maintainer = LinkMaintainer::new(&vault, &config);

        let found = maintainer.search("guide", "manual", Some("Setup (v2)"), LinkKind::Heading).unwrap();
        maintainer.apply(&found.matches, "manual", Some("Setup (v2)"), LinkKind::Heading, &always).unwrap();

        assert_eq!(vault.content("a.md"), "[[manual#Setup (v2)|setup]] [[guide#Other]]");
    }

    #[test]
    fn disabled_logging_still_rewrites() {
        let vault = scenario();
        let mut config = Config::default();
        config.enable_logging = false;
        let maintainer = LinkMaintainer::new(&vault, &config);

        let found = maintainer.search("noteB", "noteC", Some("xyz1"), LinkKind::Block).unwrap();
        maintainer.apply(&found.matches, "noteC", Some("xyz1"), LinkKind::Block, &always).unwrap();

        assert_eq!(vault.content("noteA.md"), "See [[noteC#^xyz1]] for details.");
        assert!(vault.log("link-maintainer-changes.md").is_empty());
    }
}
