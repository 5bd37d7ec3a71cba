//! Content blocks and their textual projection.
//!
//! A [`Block`] is the atomic unit of document content, exactly as the editing
//! widget emits it: an optional stable id, a type tag and an opaque data map.
//! [`project_to_text`] renders a block as plain text for diff display. It is
//! never used to decide which operation a block change is; the structural
//! diff compares type tags and projections together.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::types::BlockId;

// ---------------------------------------------------------------------------
// BlockKind
// ---------------------------------------------------------------------------

/// The type tag of a block.
///
/// Unknown tags are preserved verbatim in [`BlockKind::Other`] so that a
/// round-trip through the engine never loses content.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlockKind {
    /// Plain paragraph (`data.text`).
    Paragraph,
    /// Heading (`data.text`, `data.level`).
    Header,
    /// Bulleted or numbered list (`data.items`, `data.style` / `data.ordered`).
    List,
    /// Block quote (`data.text`).
    Quote,
    /// Code listing (`data.code`).
    Code,
    /// Horizontal separator, no data.
    Delimiter,
    /// Image reference (`data.file.url`, `data.caption`).
    Image,
    /// Any other tag.
    Other(String),
}

impl BlockKind {
    /// The wire tag for this kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Paragraph => "paragraph",
            Self::Header => "header",
            Self::List => "list",
            Self::Quote => "quote",
            Self::Code => "code",
            Self::Delimiter => "delimiter",
            Self::Image => "image",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for BlockKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "paragraph" => Self::Paragraph,
            "header" => Self::Header,
            "list" => Self::List,
            "quote" => Self::Quote,
            "code" => Self::Code,
            "delimiter" => Self::Delimiter,
            "image" => Self::Image,
            _ => Self::Other(tag),
        }
    }
}

impl From<&str> for BlockKind {
    fn from(tag: &str) -> Self {
        Self::from(tag.to_owned())
    }
}

impl From<BlockKind> for String {
    fn from(kind: BlockKind) -> Self {
        match kind {
            BlockKind::Other(tag) => tag,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// An immutable content block.
///
/// Editing a block produces a new `Block` with the same `id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Stable id used to correlate the block across snapshots. Blocks without
    /// an id are never correlated with an earlier block at merge time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<BlockId>,
    /// Type tag.
    #[serde(rename = "type")]
    pub kind: BlockKind,
    /// Type-specific fields.
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Block {
    /// Create a block with an id.
    pub fn new(id: impl Into<String>, kind: impl Into<BlockKind>, data: Map<String, Value>) -> Self {
        Self {
            id: Some(BlockId::new(id)),
            kind: kind.into(),
            data,
        }
    }

    /// Create a block that has no id.
    pub fn anonymous(kind: impl Into<BlockKind>, data: Map<String, Value>) -> Self {
        Self {
            id: None,
            kind: kind.into(),
            data,
        }
    }

    /// Shorthand for a paragraph block with the given text.
    pub fn paragraph(id: impl Into<String>, text: &str) -> Self {
        let mut data = Map::new();
        data.insert("text".to_owned(), Value::String(text.to_owned()));
        Self::new(id, BlockKind::Paragraph, data)
    }

    /// Shorthand for a header block.
    pub fn header(id: impl Into<String>, level: u8, text: &str) -> Self {
        let mut data = Map::new();
        data.insert("text".to_owned(), Value::String(text.to_owned()));
        data.insert("level".to_owned(), Value::from(level));
        Self::new(id, BlockKind::Header, data)
    }

    /// True if this block has the given id.
    #[must_use]
    pub fn has_id(&self, id: &BlockId) -> bool {
        self.id.as_ref() == Some(id)
    }

    /// Plain-text projection of this block. See [`project_to_text`].
    #[must_use]
    pub fn text(&self) -> String {
        project_to_text(self)
    }

    fn str_field(&self, key: &str) -> &str {
        self.data.get(key).and_then(Value::as_str).unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// Text projection
// ---------------------------------------------------------------------------

/// Highest heading level rendered as a run of `#` markers.
const MAX_HEADER_LEVEL: u64 = 6;

/// Project a block to plain text.
///
/// Deterministic and total:
///
/// - `paragraph` → its text
/// - `header` → `"## text"` with one `#` per level (level 1 when absent)
/// - `list` → one line per item, prefixed `"1. "` / `"2. "` when ordered,
///   `"• "` otherwise
/// - `quote` → `"> text"`
/// - `code` → the body fenced by triple backticks
/// - `delimiter` → `"---"`
/// - `image` → `"![caption](url)"` with `Image` as the fallback caption
/// - anything else → the data map serialized as JSON with sorted keys
#[must_use]
pub fn project_to_text(block: &Block) -> String {
    match &block.kind {
        BlockKind::Paragraph => block.str_field("text").to_owned(),
        BlockKind::Header => {
            let level = block
                .data
                .get("level")
                .and_then(Value::as_u64)
                .unwrap_or(1)
                .clamp(1, MAX_HEADER_LEVEL);
            let marker = "#".repeat(usize::try_from(level).unwrap_or(1));
            format!("{marker} {}", block.str_field("text"))
        }
        BlockKind::List => project_list(block),
        BlockKind::Quote => format!("> {}", block.str_field("text")),
        BlockKind::Code => format!("```\n{}\n```", block.str_field("code")),
        BlockKind::Delimiter => "---".to_owned(),
        BlockKind::Image => {
            let caption = match block.str_field("caption") {
                "" => "Image",
                c => c,
            };
            let url = block
                .data
                .get("file")
                .and_then(|f| f.get("url"))
                .and_then(Value::as_str)
                .unwrap_or("");
            format!("![{caption}]({url})")
        }
        BlockKind::Other(_) => canonical_json(&block.data),
    }
}

fn project_list(block: &Block) -> String {
    let ordered = block.data.get("style").and_then(Value::as_str) == Some("ordered")
        || block.data.get("ordered").and_then(Value::as_bool) == Some(true);
    let Some(items) = block.data.get("items").and_then(Value::as_array) else {
        return String::new();
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let text = list_item_text(item);
            if ordered {
                format!("{}. {text}", i + 1)
            } else {
                format!("• {text}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// List items are plain strings, or objects carrying `content` / `text`.
fn list_item_text(item: &Value) -> String {
    match item {
        Value::String(s) => s.clone(),
        Value::Object(obj) => obj
            .get("content")
            .or_else(|| obj.get("text"))
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_owned(),
        other => other.to_string(),
    }
}

/// `serde_json::Map` keeps keys sorted, so this is canonical as long as the
/// `preserve_order` feature stays off.
fn canonical_json(data: &Map<String, Value>) -> String {
    Value::Object(data.clone()).to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
