//! Change ledger: batch handles, rendering, and the durable change log.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::Error;
use crate::types::{LinkKind, Location, note_name};
use crate::vault::Vault;

/// One text substitution that was actually applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEntry {
    /// Line or node text after the rewrite.
    pub after: String,
    /// Line or node text before the rewrite.
    pub before: String,
    /// Vault-relative path of the changed document.
    pub document: PathBuf,
    /// Line or node that changed.
    pub location: Location,
    /// When the change was applied.
    pub timestamp: DateTime<Utc>,
}

/// One approved rewrite operation. Obtained from [`Ledger::begin`] and
/// consumed by [`Ledger::flush`] or [`Ledger::discard`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchLog {
    /// Block id, heading, or note name the batch is about.
    pub anchor: String,
    /// Applied changes in order.
    pub changes: Vec<ChangeEntry>,
    /// One-line summary.
    pub description: String,
    /// Link kind of the operation.
    pub kind: LinkKind,
    /// When the batch was opened.
    pub started_at: DateTime<Utc>,
    /// Note the links now point at.
    pub target: String,
}

/// Records change batches and writes them, most recent first, to the log.
#[derive(Debug, Clone)]
pub struct Ledger {
    /// Whether batches are recorded and flushed at all.
    enabled: bool,
    /// Log destination, relative to the vault root.
    log_path: PathBuf,
}

impl BatchLog {
    /// Number of distinct documents touched by the batch.
    pub fn files_affected(&self) -> usize {
        return self.changes.iter().map(|c| return &c.document).collect::<BTreeSet<_>>().len();
    }
}

impl Ledger {
    /// Open a batch for one operation. Any earlier handle is simply replaced
    /// by the caller; batches never compose.
    pub fn begin(anchor: &str, target: &str, kind: LinkKind) -> BatchLog {
        return BatchLog {
            anchor: anchor.to_string(),
            changes: Vec::new(),
            description: format!("{}: `{anchor}` → `{}`", summary_label(kind), display_note(target)),
            kind,
            started_at: Utc::now(),
            target: target.to_string(),
        };
    }

    /// Drop a batch without writing anything.
    pub fn discard(batch: BatchLog) {
        tracing::debug!(changes = batch.changes.len(), "discarding batch");
        drop(batch);
    }

    /// Render the batch and prepend it to the log. Writes nothing when
    /// logging is disabled or the batch is empty.
    ///
    /// # Errors
    ///
    /// Returns errors from the vault's log write.
    pub fn flush(&self, batch: BatchLog, vault: &dyn Vault) -> Result<(), Error> {
        if !self.enabled || batch.changes.is_empty() {
            return Ok(());
        }
        let entry = render_batch(&batch);
        vault.prepend_to_log(&self.log_path, &entry)?;
        tracing::info!(
            log = %self.log_path.display(),
            changes = batch.changes.len(),
            "wrote batch to change log"
        );
        return Ok(());
    }

    /// Create a ledger writing to `log_path` when `enabled`.
    pub const fn new(enabled: bool, log_path: PathBuf) -> Self {
        return Self { enabled, log_path };
    }

    /// Append a change to the batch. Dropped when logging is disabled.
    pub fn record(&self, batch: &mut BatchLog, entry: ChangeEntry) {
        if self.enabled {
            batch.changes.push(entry);
        }
    }
}

/// Label for the anchor line of the details block.
const fn detail_label(kind: LinkKind) -> &'static str {
    return match kind {
        LinkKind::Block => "Block ID",
        LinkKind::Heading => "Heading",
        LinkKind::Plain => "Note",
    };
}

/// Note name for a file name or path given by the user.
fn display_note(name: &str) -> String {
    return note_name(Path::new(name.trim()));
}

/// The link target inside the first `[[...]]` of `text` (without alias), or
/// the first bare `^anchor`, or the trimmed text itself.
fn link_summary(text: &str) -> String {
    let trimmed = text.trim();
    if let Some(start) = trimmed.find("[[") {
        let inner = trimmed.get(start.saturating_add(2)..).unwrap_or("");
        let end = inner.find("]]").unwrap_or(inner.len());
        let link = inner.get(..end).unwrap_or(inner);
        let target = link.split('|').next().unwrap_or(link);
        return target.trim().to_string();
    }
    if let Some(start) = trimmed.find('^') {
        let rest = trimmed.get(start..).unwrap_or("");
        return rest.split_whitespace().next().unwrap_or(rest).to_string();
    }
    return trimmed.to_string();
}

/// Render one batch as a markdown log entry.
pub fn render_batch(batch: &BatchLog) -> String {
    let mut out = String::new();
    let timestamp = batch.started_at.to_rfc3339_opts(SecondsFormat::Millis, true);
    let first = batch.changes.first();
    let original = first.map(|c| return link_summary(&c.before)).unwrap_or_default();
    let updated = first.map(|c| return link_summary(&c.after)).unwrap_or_default();

    let _ = writeln!(out, "## Batch update at {timestamp}\n");
    let _ = writeln!(out, "> {}\n", batch.description);
    out.push_str("### Details\n\n");
    let _ = writeln!(out, "- **{}**: `{}`", detail_label(batch.kind), batch.anchor);
    let _ = writeln!(out, "- Original link: `{original}`");
    let _ = writeln!(out, "- Updated link: `{updated}`");
    let _ = writeln!(out, "- **Files affected**: {}\n", batch.files_affected());
    out.push_str("### Changes\n\n");

    let markdown: Vec<&ChangeEntry> = batch.changes.iter().filter(|c| return matches!(c.location, Location::Line(_))).collect();
    let canvas: Vec<&ChangeEntry> = batch.changes.iter().filter(|c| return matches!(c.location, Location::Node { .. })).collect();

    if !markdown.is_empty() {
        out.push_str("#### Markdown Files\n\n");
        for change in &markdown {
            let line = change.location.index().saturating_add(1);
            let _ = writeln!(out, "- [[{}]] (Line {line})", note_name(&change.document));
        }
        out.push('\n');
    }

    if !canvas.is_empty() {
        out.push_str("#### Canvas Files\n\n");
        for change in &canvas {
            let node = match &change.location {
                Location::Node { id, .. } => id.as_str(),
                Location::Line(_) => "",
            };
            let _ = writeln!(out, "- [[{}]] (Canvas node `{node}`)", note_name(&change.document));
        }
        out.push('\n');
    }

    out.push_str("---\n\n");
    return out;
}

/// Summary label for the quoted description line.
const fn summary_label(kind: LinkKind) -> &'static str {
    return match kind {
        LinkKind::Block => "Block reference update",
        LinkKind::Heading => "Heading reference update",
        LinkKind::Plain => "Link update",
    };
}
