//! CLI commands for linkmend: search-and-rewrite by name, and block moves.

use std::io::{BufRead as _, Write as _};
use std::path::PathBuf;

use crate::config::Config;
use crate::error::Error;
use crate::maintainer::{ApplyOutcome, LinkMaintainer, SearchOutcome};
use crate::rewrite::{self, RewriteRequest};
use crate::selection;
use crate::types::{LinkKind, ReferenceMatch};
use crate::vault::FsVault;

/// Flags shared by every command.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Note treated as the focused document for bare block ids.
    pub context: Option<String>,
    /// Rewrite block links even when the block still exists at its origin.
    pub force: bool,
    /// Skip the change log.
    pub no_log: bool,
    /// Vault root.
    pub root: PathBuf,
    /// Apply without asking.
    pub yes: bool,
}

/// Retarget every reference to the block named by `selection` at `new_name`.
///
/// # Errors
///
/// Returns `Error::InvalidSelection` if the selection holds no block id, or
/// errors from config loading, scanning, or writing.
pub fn block(options: &Options, selection_text: &str, new_name: &str) -> Result<(), Error> {
    let selected = selection::parse_selection(selection_text, options.context.as_deref())?;
    let context = options.context.clone().or_else(|| return selected.note.clone());
    let config = load_config(options)?;
    let vault = FsVault::new(options.root.clone(), config.clone(), context);
    let maintainer = LinkMaintainer::new(&vault, &config);

    tracing::debug!(block = %selected.block_id, note = ?selected.note, "parsed selection");
    let found = maintainer.search_by_anchor(&selected.block_id, new_name)?;
    return finish(&maintainer, options, &found, new_name, Some(selected.block_id.as_str()), LinkKind::Block);
}

/// Print what will change and ask on stdin. Anything but `y`/`yes` cancels.
fn confirm_on_stdin(matches: &[ReferenceMatch], request: &RewriteRequest<'_>) -> bool {
    eprintln!("## Pending changes\n");
    for candidate in matches {
        let after = rewrite::preview(candidate, request).unwrap_or_default();
        eprintln!("- {}", describe(candidate));
        eprintln!("  `{}` -> `{after}`", candidate.matched_text);
    }
    eprint!("\nApply {} changes? [y/N] ", matches.len());
    let _ = std::io::stderr().flush();

    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    return matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes");
}

/// `path:line` or `path (node id)` for a listing.
fn describe(candidate: &ReferenceMatch) -> String {
    if let Some(id) = candidate.node_id() {
        return format!("{} (node `{id}`)", candidate.document.display());
    }
    let line = candidate.location.index().saturating_add(1);
    return format!("{}:{line}", candidate.document.display());
}

/// Report the search result and apply it if anything is eligible.
///
/// # Errors
///
/// Returns errors from the rewrite or the change log.
fn finish(
    maintainer: &LinkMaintainer<'_>,
    options: &Options,
    found: &SearchOutcome,
    new_name: &str,
    anchor: Option<&str>,
    kind: LinkKind,
) -> Result<(), Error> {
    if found.matches.is_empty() {
        if found.already_updated > 0 {
            println!("All found references ({}) are already up to date", found.already_updated);
        } else {
            println!("No references found");
        }
        return Ok(());
    }

    let confirm = |matches: &[ReferenceMatch], request: &RewriteRequest<'_>| {
        if options.yes {
            return true;
        }
        return confirm_on_stdin(matches, request);
    };

    match maintainer.apply(&found.matches, new_name, anchor, kind, &confirm)? {
        ApplyOutcome::Applied { updated } => {
            println!("Updated {updated} references");
            if found.already_updated > 0 {
                println!("{} were already up to date", found.already_updated);
            }
        },
        ApplyOutcome::Cancelled => println!("Cancelled, no files changed"),
    }
    return Ok(());
}

/// Load `.linkmend.toml` from the vault root and apply flag overrides.
///
/// # Errors
///
/// Returns errors from reading or parsing the config file.
fn load_config(options: &Options) -> Result<Config, Error> {
    let mut config = Config::load(&options.root)?;
    if options.force {
        config.force_override = true;
    }
    if options.no_log {
        config.enable_logging = false;
    }
    return Ok(config);
}

/// Retarget links to `old_name` (with `anchor`, for block and heading links)
/// at `new_name`.
///
/// # Errors
///
/// Returns input validation errors, or errors from config loading, scanning,
/// or writing.
pub fn search(
    options: &Options,
    old_name: &str,
    new_name: &str,
    anchor: Option<&str>,
    kind: Option<LinkKind>,
) -> Result<(), Error> {
    let kind = kind.unwrap_or(if anchor.is_some() { LinkKind::Block } else { LinkKind::Plain });
    let config = load_config(options)?;
    let vault = FsVault::new(options.root.clone(), config.clone(), options.context.clone());
    let maintainer = LinkMaintainer::new(&vault, &config);

    let found = maintainer.search(old_name, new_name, anchor, kind)?;
    tracing::debug!(
        eligible = found.matches.len(),
        already_updated = found.already_updated,
        "search finished"
    );
    return finish(&maintainer, options, &found, new_name, anchor, kind);
}
