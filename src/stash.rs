//! Content protection store.
//!
//! Stages that produce verbatim output (rendered code blocks, typographic
//! entities) must not have it rescanned or escaped by later stages. They
//! [`store`](ContentStash::store) the content and put the returned
//! placeholder into the text stream instead. Placeholders are resolved when
//! the tree is serialized, after every stage has run.
//!
//! The placeholder format is internal: `STX` + `zmd:` + index + `ETX`.
//! Input documents are stripped of `STX`/`ETX` before any stage runs, so a
//! user cannot forge one.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::error;

/// Start-of-text marker opening every placeholder.
pub const STX: char = '\u{2}';
/// End-of-text marker closing every placeholder.
pub const ETX: char = '\u{3}';

static RE_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new("\u{2}zmd:([0-9]+)\u{3}").unwrap());

/// One stored block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StashedContent {
    pub content: String,
    /// When `false` the content is escaped on resolution.
    pub safe: bool,
}

/// Append-only table of stored content, reset per conversion.
#[derive(Debug, Default, Clone)]
pub struct ContentStash {
    blocks: Vec<StashedContent>,
}

impl ContentStash {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `content` and return its placeholder.
    pub fn store(&mut self, content: impl Into<String>, safe: bool) -> String {
        self.blocks.push(StashedContent {
            content: content.into(),
            safe,
        });
        placeholder(self.blocks.len() - 1)
    }

    pub fn get(&self, index: usize) -> Option<&StashedContent> {
        self.blocks.get(index)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn reset(&mut self) {
        self.blocks.clear();
    }

    /// Index encoded by `text` if it is exactly one placeholder.
    pub fn parse_placeholder(text: &str) -> Option<usize> {
        let caps = RE_PLACEHOLDER.captures(text)?;
        let whole = caps.get(0)?;
        if whole.start() != 0 || whole.end() != text.len() {
            return None;
        }
        caps[1].parse().ok()
    }

    /// Replace every placeholder in `text` with its content.
    ///
    /// Unsafe content goes through `escape`. An index with no stored content
    /// is a bug in a stage; it panics in debug builds and is left literal
    /// otherwise.
    pub fn resolve(&self, text: &str, escape: impl Fn(&str) -> String) -> String {
        RE_PLACEHOLDER
            .replace_all(text, |caps: &Captures<'_>| {
                let stored = caps[1].parse::<usize>().ok().and_then(|i| self.get(i));
                match stored {
                    Some(s) if s.safe => s.content.clone(),
                    Some(s) => escape(&s.content),
                    None => {
                        error!(placeholder = &caps[1], "unresolved placeholder");
                        debug_assert!(false, "unresolved placeholder {}", &caps[1]);
                        caps[0].to_string()
                    }
                }
            })
            .into_owned()
    }
}

/// Placeholder token for the stored block at `index`.
pub fn placeholder(index: usize) -> String {
    format!("{STX}zmd:{index}{ETX}")
}

/// Remove the reserved delimiters from user input.
pub fn strip_reserved(input: &str) -> String {
    input.replace([STX, ETX], "")
}
