//! Parsed documents: flat markdown lines or a canvas node graph.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;
use crate::types::DocumentKind;

/// A canvas: nodes plus whatever else the file carries (edges, metadata).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    /// Canvas nodes in file order.
    #[serde(default)]
    pub nodes: Vec<CanvasNode>,
    /// Every other top-level field, kept so a rewrite does not drop them.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// One positioned canvas node, held as its raw JSON object so a rewrite keeps
/// every field in its original order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanvasNode {
    /// The node's fields (id, type, position, size, text, ...).
    pub fields: Map<String, Value>,
}

/// A parsed vault document.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    /// Line-oriented markdown.
    Flat(FlatDocument),
    /// Canvas node graph.
    Structured(Canvas),
}

/// Markdown split into lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatDocument {
    /// Lines without their terminators.
    pub lines: Vec<String>,
    /// Whether the original content ended with a newline.
    pub trailing_newline: bool,
}

impl CanvasNode {
    /// Node identifier, empty when the node has none.
    pub fn id(&self) -> &str {
        return self.fields.get("id").and_then(Value::as_str).unwrap_or("");
    }

    /// Replace the node's text in place. Nodes without text are left alone.
    pub fn set_text(&mut self, text: String) {
        if let Some(slot) = self.fields.get_mut("text") {
            *slot = Value::String(text);
        }
    }

    /// Free text carried by text nodes.
    pub fn text(&self) -> Option<&str> {
        return self.fields.get("text").and_then(Value::as_str);
    }
}

impl Document {
    /// Parse raw content according to the document kind.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedCanvas` if a structured document is not valid
    /// canvas JSON.
    pub fn parse(path: &Path, kind: DocumentKind, content: &str) -> Result<Self, Error> {
        return match kind {
            DocumentKind::Flat => Ok(Document::Flat(FlatDocument::parse(content))),
            DocumentKind::Structured => {
                let canvas: Canvas = serde_json::from_str(content).map_err(|e| {
                    return Error::MalformedCanvas {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    };
                })?;
                Ok(Document::Structured(canvas))
            },
        };
    }

    /// Serialize back to raw content. Canvases are written as pretty JSON
    /// with two-space indentation.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if canvas serialization fails.
    pub fn render(&self) -> Result<String, Error> {
        return match self {
            Document::Flat(flat) => Ok(flat.render()),
            Document::Structured(canvas) => Ok(serde_json::to_string_pretty(canvas)?),
        };
    }
}

impl FlatDocument {
    /// Split content on `\n`, remembering whether it ended with one.
    pub fn parse(content: &str) -> Self {
        let trailing_newline = content.ends_with('\n');
        let body = content.strip_suffix('\n').unwrap_or(content);
        let lines = if content.is_empty() {
            Vec::new()
        } else {
            body.split('\n').map(String::from).collect()
        };
        return Self { lines, trailing_newline };
    }

    /// Join lines back together, restoring the trailing newline.
    pub fn render(&self) -> String {
        let mut output = self.lines.join("\n");
        if self.trailing_newline {
            output.push('\n');
        }
        return output;
    }
}
