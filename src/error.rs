/// Crate-level error types for linkmend diagnostics.
use std::path::PathBuf;

/// All errors in linkmend carry enough context to produce a useful diagnostic
/// without a debugger. Each variant names the document, input, or reason for failure.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A document that was expected to exist could not be found.
    #[error("document not found: {}", path.display())]
    DocumentNotFound {
        /// Vault-relative path of the missing document.
        path: PathBuf,
    },

    /// The selected text holds no `note#^id` or `^id` block reference.
    #[error("no block id found in selection: `{text}`")]
    InvalidSelection {
        /// The selection as given by the user.
        text: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON serialization of a canvas failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped JSON error.
        #[from]
        serde_json::Error,
    ),

    /// A canvas document could not be parsed as a node graph.
    #[error("malformed canvas: {}: {reason}", path.display())]
    MalformedCanvas {
        /// Vault-relative path of the canvas.
        path: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// A block or heading operation was requested without an anchor.
    #[error("an anchor is required for {kind} links")]
    MissingAnchor {
        /// Display name of the link kind that needs the anchor.
        kind: &'static str,
    },

    /// No new note name was supplied.
    #[error("a new note name is required")]
    MissingNewName,

    /// No old note name was supplied.
    #[error("an old note name is required")]
    MissingOldName,

    /// The link pattern could not be compiled.
    #[error("pattern: {0}")]
    Pattern(
        /// The wrapped regex build error.
        #[from]
        regex::Error,
    ),

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// The link kind string is not one of the known kinds.
    #[error("unknown link kind: `{name}`")]
    UnknownLinkKind {
        /// The unrecognized kind as given.
        name: String,
    },
}
