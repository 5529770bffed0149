/// Core domain types for linkmend references and documents.
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::Error;

/// How a vault document stores its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Line-oriented markdown.
    Flat,
    /// Canvas: a JSON graph of nodes, each optionally carrying text.
    Structured,
}

impl DocumentKind {
    /// Classify a path by extension. Anything other than `.md` or `.canvas`
    /// is not a document.
    pub fn for_path(path: &Path) -> Option<Self> {
        return match path.extension().and_then(|e| return e.to_str()) {
            Some("canvas") => Some(DocumentKind::Structured),
            Some("md") => Some(DocumentKind::Flat),
            _ => None,
        };
    }
}

/// The shape of link an operation looks for and writes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// `[[name#^anchor]]`
    Block,
    /// `[[name#heading]]`
    Heading,
    /// `[[name]]`
    Plain,
}

impl LinkKind {
    /// Lowercase name used in messages.
    pub const fn name(self) -> &'static str {
        return match self {
            LinkKind::Block => "block",
            LinkKind::Heading => "heading",
            LinkKind::Plain => "note",
        };
    }

    /// The fragment that follows the file name in a link of this kind.
    pub fn fragment(self, anchor: Option<&str>) -> String {
        return match (self, anchor) {
            (LinkKind::Block, Some(a)) => format!("#^{a}"),
            (LinkKind::Heading, Some(h)) => format!("#{h}"),
            (LinkKind::Block | LinkKind::Heading | LinkKind::Plain, _) => String::new(),
        };
    }
}

impl FromStr for LinkKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        return match s.trim().to_ascii_lowercase().as_str() {
            "block" => Ok(LinkKind::Block),
            "heading" => Ok(LinkKind::Heading),
            "note" | "plain" => Ok(LinkKind::Plain),
            other => Err(Error::UnknownLinkKind { name: other.to_string() }),
        };
    }
}

/// Where in its document a match lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Zero-based line of a flat document.
    Line(usize),
    /// Node of a canvas.
    Node {
        /// Canvas node identifier.
        id: String,
        /// Position of the node in the canvas node list.
        index: usize,
    },
}

impl Location {
    /// Zero-based line number or node index.
    pub const fn index(&self) -> usize {
        return match self {
            Location::Line(i) => *i,
            Location::Node { index, .. } => *index,
        };
    }
}

/// A document as listed by the vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    /// Flat or structured.
    pub kind: DocumentKind,
    /// Vault-relative path.
    pub path: PathBuf,
}

impl DocumentRef {
    /// The note name: file name without folders or extension.
    pub fn note_name(&self) -> String {
        return note_name(&self.path);
    }
}

/// One occurrence of a link or anchor in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceMatch {
    /// Display alias captured from `[[name|alias]]`.
    pub alias: Option<String>,
    /// Raw text of the line, or of the canvas node's text field.
    pub content: String,
    /// Vault-relative path of the owning document.
    pub document: PathBuf,
    /// Whether the link was an embed (`![[...]]`).
    pub embed: bool,
    /// Line or node holding the match.
    pub location: Location,
    /// The exact matched substring.
    pub matched_text: String,
    /// File name captured from a full link; `None` for a bare anchor.
    pub source_file: Option<String>,
    /// Byte range of `matched_text` within `content`.
    pub span: Range<usize>,
}

impl ReferenceMatch {
    /// Whether this match lives inside a canvas node.
    pub const fn is_graph_node(&self) -> bool {
        return matches!(self.location, Location::Node { .. });
    }

    /// Canvas node id, if the match lives in a canvas.
    pub fn node_id(&self) -> Option<&str> {
        return match &self.location {
            Location::Line(_) => None,
            Location::Node { id, .. } => Some(id.as_str()),
        };
    }
}

/// Strip folders and the extension from a path, leaving the note name.
pub fn note_name(path: &Path) -> String {
    return path
        .file_stem()
        .map_or_else(|| return path.display().to_string(), |s| return s.to_string_lossy().into_owned());
}
