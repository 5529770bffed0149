use std::path::Path;

use crate::document::{Canvas, Document};
use crate::pattern::{Hit, Pattern};
use crate::types::{DocumentRef, Location, ReferenceMatch};
use crate::vault::Vault;

/// Scan every listed document and collect each pattern hit.
/// Results follow listing order, then top to bottom within a document.
///
/// Documents that cannot be read, and canvases that cannot be parsed, are
/// logged and skipped; the rest of the corpus is still scanned.
pub fn scan(vault: &dyn Vault, documents: &[DocumentRef], pattern: &Pattern) -> Vec<ReferenceMatch> {
    let mut matches = Vec::new();

    for document in documents {
        let content = match vault.read_document(&document.path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(path = %document.path.display(), error = %e, "skipping unreadable document");
                continue;
            },
        };

        let parsed = match Document::parse(&document.path, document.kind, &content) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(path = %document.path.display(), error = %e, "skipping malformed document");
                continue;
            },
        };

        let before = matches.len();
        match &parsed {
            Document::Flat(flat) => extract_matches_from_lines(&flat.lines, &document.path, pattern, &mut matches),
            Document::Structured(canvas) => extract_matches_from_canvas(canvas, &document.path, pattern, &mut matches),
        }
        tracing::debug!(
            path = %document.path.display(),
            found = matches.len().saturating_sub(before),
            "scanned document"
        );
    }

    return matches;
}

/// Extract matches from every text-bearing node of a canvas.
fn extract_matches_from_canvas(canvas: &Canvas, path: &Path, pattern: &Pattern, matches: &mut Vec<ReferenceMatch>) {
    for (index, node) in canvas.nodes.iter().enumerate() {
        let Some(text) = node.text() else {
            continue;
        };
        for hit in pattern.hits(text) {
            let location = Location::Node {
                id: node.id().to_string(),
                index,
            };
            matches.push(reference_from_hit(hit, path, text, location));
        }
    }
}

/// Extract matches from each line of a flat document.
fn extract_matches_from_lines(lines: &[String], path: &Path, pattern: &Pattern, matches: &mut Vec<ReferenceMatch>) {
    for (index, line) in lines.iter().enumerate() {
        for hit in pattern.hits(line) {
            matches.push(reference_from_hit(hit, path, line, Location::Line(index)));
        }
    }
}

/// Turn a pattern hit into a match carrying its location.
fn reference_from_hit(hit: Hit, path: &Path, content: &str, location: Location) -> ReferenceMatch {
    return ReferenceMatch {
        alias: hit.alias,
        content: content.to_string(),
        document: path.to_path_buf(),
        embed: hit.embed,
        location,
        matched_text: hit.text,
        source_file: hit.file,
        span: hit.range,
    };
}
