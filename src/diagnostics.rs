use crate::error::Error;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened and, where the user can
/// act on it, how to fix it.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::InvalidSelection { text } => render_invalid_selection(text),
        Error::MalformedCanvas { path, reason } => render_malformed_canvas(&path.display().to_string(), reason),
        Error::MissingAnchor { kind } => render_missing_anchor(kind),
        Error::MissingNewName | Error::MissingOldName => render_missing_name(e),
        Error::TomlDe(inner) => render_invalid_config(&inner.to_string()),
        Error::UnknownLinkKind { name } => render_unknown_kind(name),
        _ => render_generic(e),
    };
}

fn render_generic(e: &Error) -> String {
    return match e {
        Error::DocumentNotFound { path } => format!("\
# Error: Document Not Found

`{}` does not exist in the vault.
", path.display()),

        Error::Io(inner) => format!("\
# Error: I/O

{inner}
"),

        Error::Json(inner) => format!("\
# Error: Canvas Serialization

{inner}
"),

        _ => format!("\
# Error

{e}
"),
    };
}

fn render_invalid_config(reason: &str) -> String {
    return format!("\
# Error: Invalid Config

`.linkmend.toml` could not be read:

{reason}

## Fix

Known keys are `enable_logging`, `exclude`, `force_override`, `include`,
`log_path`, and `require_confirmation`.
");
}

fn render_invalid_selection(text: &str) -> String {
    return format!("\
# Error: No Block Id

`{text}` holds no block reference.

## Fix

Pass a link or a bare block id:

    linkmend block 'note#^block-id' new-note
    linkmend block '^block-id' new-note --context note
");
}

fn render_malformed_canvas(path: &str, reason: &str) -> String {
    return format!("\
# Error: Malformed Canvas

Could not parse `{path}`: {reason}
");
}

fn render_missing_anchor(kind: &str) -> String {
    return format!("\
# Error: Missing Anchor

Rewriting {kind} links needs the {kind} they point at.

## Fix

    linkmend search old-note new-note --anchor <{kind}> --kind {kind}
");
}

fn render_missing_name(e: &Error) -> String {
    return format!("\
# Error: Missing Note Name

{e}.

## Fix

    linkmend search old-note new-note
");
}

fn render_unknown_kind(name: &str) -> String {
    return format!("\
# Error: Unknown Link Kind

`{name}` is not a link kind.

## Supported kinds

- `plain` (or `note`): `[[note]]`
- `block`: `[[note#^id]]`
- `heading`: `[[note#Heading]]`
");
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn selection_error_shows_both_forms() {
        let out = render_error(&Error::InvalidSelection { text: "words".to_string() });
        assert!(out.starts_with("# Error: No Block Id"));
        assert!(out.contains("`words`"));
        assert!(out.contains("## Fix"));
    }

    #[test]
    fn missing_anchor_names_kind() {
        let out = render_error(&Error::MissingAnchor { kind: "heading" });
        assert!(out.contains("--anchor <heading> --kind heading"));
    }

    #[test]
    fn unknown_kind_lists_supported() {
        let out = render_error(&Error::UnknownLinkKind { name: "tag".to_string() });
        assert!(out.contains("`tag`"));
        assert!(out.contains("- `block`"));
    }

    #[test]
    fn missing_document_is_generic() {
        let out = render_error(&Error::DocumentNotFound { path: PathBuf::from("a/b.md") });
        assert!(out.contains("`a/b.md` does not exist"));
    }

    #[test]
    fn missing_name_message() {
        let out = render_error(&Error::MissingNewName);
        assert!(out.contains("a new note name is required."));
    }
}
