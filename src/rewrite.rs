//! Rewrite engine: apply eligible matches to their documents.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::document::Document;
use crate::eligibility::is_already_updated;
use crate::error::Error;
use crate::ledger::{BatchLog, ChangeEntry, Ledger};
use crate::types::{DocumentKind, DocumentRef, LinkKind, Location, ReferenceMatch};
use crate::vault::Vault;

/// What one rewrite operation writes.
#[derive(Debug, Clone, Copy)]
pub struct RewriteRequest<'a> {
    /// Block id or heading text.
    pub anchor: Option<&'a str>,
    /// Link kind being rewritten.
    pub kind: LinkKind,
    /// Note the links should point at.
    pub new_name: &'a str,
}

/// Result of a rewrite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteOutcome {
    /// Number of text substitutions written.
    pub updated: usize,
}

impl RewriteRequest<'_> {
    /// The fully-qualified link the operation produces, e.g. `[[noteC#^xyz1]]`.
    pub fn target_form(&self) -> String {
        return format!("[[{}{}]]", self.new_name.trim(), self.kind.fragment(self.anchor));
    }
}

/// Compute the new text of the match's line or node without writing.
/// `None` when nothing would change.
pub fn preview(candidate: &ReferenceMatch, request: &RewriteRequest<'_>) -> Option<String> {
    return replace_in_text(&candidate.content, candidate, request);
}

/// Apply matches to their documents. Matches are grouped by document so each
/// document is read at most once and written at most once. Every change
/// that reaches disk is recorded into `batch`, if one is open.
///
/// Documents that vanished, are not documents, or no longer parse are
/// skipped; the remaining documents are still rewritten.
pub fn rewrite(
    vault: &dyn Vault,
    documents: &[DocumentRef],
    matches: &[ReferenceMatch],
    request: &RewriteRequest<'_>,
    ledger: &Ledger,
    mut batch: Option<&mut BatchLog>,
) -> RewriteOutcome {
    let mut outcome = RewriteOutcome::default();

    for (path, group) in group_by_document(matches) {
        let kind = documents
            .iter()
            .find(|d| return d.path == path)
            .map(|d| return d.kind)
            .or_else(|| return DocumentKind::for_path(&path));
        let Some(kind) = kind else {
            continue;
        };

        let changes = match rewrite_document(vault, &path, kind, &group, request) {
            Ok(c) => c,
            Err(Error::DocumentNotFound { .. }) => {
                tracing::debug!(path = %path.display(), "document vanished before rewrite, skipping");
                continue;
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping document");
                continue;
            },
        };

        outcome.updated = outcome.updated.saturating_add(changes.len());
        if let Some(open) = batch.as_deref_mut() {
            for change in changes {
                ledger.record(open, change);
            }
        }
    }

    return outcome;
}

/// Group matches by owning document, keeping first-seen document order.
fn group_by_document(matches: &[ReferenceMatch]) -> Vec<(PathBuf, Vec<&ReferenceMatch>)> {
    let mut groups: Vec<(PathBuf, Vec<&ReferenceMatch>)> = Vec::new();
    for candidate in matches {
        match groups.iter_mut().find(|(p, _)| return *p == candidate.document) {
            Some((_, group)) => group.push(candidate),
            None => groups.push((candidate.document.clone(), vec![candidate])),
        }
    }
    return groups;
}

/// Compute the replacement for one match within `text`. Only the match's own
/// span is touched, and only while it still holds the matched text.
fn replace_in_text(text: &str, candidate: &ReferenceMatch, request: &RewriteRequest<'_>) -> Option<String> {
    let new_name = request.new_name.trim();
    if text.get(candidate.span.clone())? != candidate.matched_text {
        return None;
    }

    let replacement = if candidate.source_file.is_some() {
        if is_already_updated(candidate, new_name) {
            return None;
        }
        let embed = if candidate.embed { "!" } else { "" };
        let alias = candidate.alias.as_ref().map(|a| return format!("|{a}")).unwrap_or_default();
        format!("{embed}[[{new_name}{}{alias}]]", request.kind.fragment(request.anchor))
    } else {
        let anchor = request.anchor?;
        if candidate.matched_text != format!("^{anchor}") {
            return None;
        }
        request.target_form()
    };

    let mut updated = String::with_capacity(text.len().saturating_add(replacement.len()));
    updated.push_str(text.get(..candidate.span.start)?);
    updated.push_str(&replacement);
    updated.push_str(text.get(candidate.span.end..)?);
    return Some(updated);
}

/// Read, rewrite, and write one document. Returns the applied changes in
/// document order.
///
/// Matches sharing a line or node are applied right to left so earlier
/// spans stay valid.
///
/// # Errors
///
/// Returns vault read/write errors and canvas parse errors.
fn rewrite_document(
    vault: &dyn Vault,
    path: &Path,
    kind: DocumentKind,
    group: &[&ReferenceMatch],
    request: &RewriteRequest<'_>,
) -> Result<Vec<ChangeEntry>, Error> {
    let content = vault.read_document(path)?;
    let mut document = Document::parse(path, kind, &content)?;

    let mut ordered: Vec<&ReferenceMatch> = group.to_vec();
    ordered.sort_by(|a, b| {
        return a.location.index().cmp(&b.location.index()).then(b.span.start.cmp(&a.span.start));
    });

    let mut applied: Vec<(usize, usize, ChangeEntry)> = Vec::new();
    for candidate in ordered {
        let Some(before) = text_at(&document, &candidate.location).map(str::to_string) else {
            continue;
        };
        let Some(after) = replace_in_text(&before, candidate, request) else {
            continue;
        };
        set_text_at(&mut document, &candidate.location, after.clone());

        applied.push((candidate.location.index(), candidate.span.start, ChangeEntry {
            after,
            before,
            document: path.to_path_buf(),
            location: candidate.location.clone(),
            timestamp: Utc::now(),
        }));
    }

    if !applied.is_empty() {
        vault.write_document(path, &document.render()?)?;
        tracing::debug!(path = %path.display(), changes = applied.len(), "rewrote document");
    }

    applied.sort_by_key(|(index, start, _)| return (*index, *start));
    return Ok(applied.into_iter().map(|(_, _, change)| return change).collect());
}

/// Overwrite the text of the line or node at `location`.
fn set_text_at(document: &mut Document, location: &Location, text: String) {
    match (document, location) {
        (Document::Flat(flat), Location::Line(index)) => {
            if let Some(line) = flat.lines.get_mut(*index) {
                *line = text;
            }
        },
        (Document::Structured(canvas), Location::Node { id, index }) => {
            if let Some(node) = canvas.nodes.get_mut(*index).filter(|n| return n.id() == id.as_str()) {
                node.set_text(text);
            }
        },
        (Document::Flat(_), Location::Node { .. }) | (Document::Structured(_), Location::Line(_)) => {},
    }
}

/// Text of the line or node at `location`. Canvas nodes are found by
/// position and must still carry the scanned id.
fn text_at<'d>(document: &'d Document, location: &Location) -> Option<&'d str> {
    return match (document, location) {
        (Document::Flat(flat), Location::Line(index)) => flat.lines.get(*index).map(String::as_str),
        (Document::Structured(canvas), Location::Node { id, index }) => {
            canvas.nodes.get(*index).filter(|n| return n.id() == id.as_str()).and_then(|n| return n.text())
        },
        (Document::Flat(_), Location::Node { .. }) | (Document::Structured(_), Location::Line(_)) => None,
    };
}
