//! Core block stages.
//!
//! | name           | handles                                   |
//! |----------------|-------------------------------------------|
//! | `empty`        | blank chunks and chunks opening with `\n` |
//! | `hashheader`   | `# Title` lines anywhere in a chunk       |
//! | `setextheader` | `Title` underlined with `===` or `---`    |
//! | `paragraph`    | everything else                           |

use crate::error::{BoxError, MarkupError};
use crate::node::{Node, Text};
use crate::pipeline::block::{append_paragraph, BlockParser};
use crate::pipeline::stage::BlockProcessor;
use crate::pipeline::ConversionContext;
use crate::registry::{Location, OrderedRegistry};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::VecDeque;

static RE_SETEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^.*?\n[=-]+[ ]*(\n|$)").unwrap());

/// Hash-header regexes indexed by maximum level minus one.
static RE_HASH: Lazy<Vec<Regex>> = Lazy::new(|| {
    (1..=6)
        .map(|max| {
            Regex::new(&format!(
                r"(?:^|\n)(?P<level>#{{1,{max}}})(?P<header>.*?)#*(?:\n|$)"
            ))
            .unwrap()
        })
        .collect()
});

/// Register the core block stages in their canonical order.
pub fn register_core(reg: &mut OrderedRegistry<Box<dyn BlockProcessor>>) -> Result<(), MarkupError> {
    reg.add("empty", Box::new(EmptyBlockProcessor), Location::End)?;
    reg.add("hashheader", Box::new(HashHeaderProcessor::new()), Location::End)?;
    reg.add("setextheader", Box::new(SetextHeaderProcessor), Location::End)?;
    reg.add("paragraph", Box::new(ParagraphProcessor), Location::End)?;
    Ok(())
}

// ── Empty ────────────────────────────────────────────────────────────────────

/// Swallows blank chunks; a chunk opening with a newline loses it.
pub struct EmptyBlockProcessor;

impl BlockProcessor for EmptyBlockProcessor {
    fn test(&self, _parent: &Node, block: &str) -> bool {
        block.is_empty() || block.starts_with('\n')
    }

    fn run(
        &self,
        _parser: &BlockParser<'_>,
        _parent: &mut Node,
        blocks: &mut VecDeque<String>,
        _ctx: &mut ConversionContext,
    ) -> Result<bool, BoxError> {
        let Some(block) = blocks.pop_front() else {
            return Ok(false);
        };
        if let Some(rest) = block.strip_prefix('\n') {
            if !rest.is_empty() {
                blocks.push_front(rest.to_string());
            }
        }
        Ok(true)
    }
}

// ── Hash headers ─────────────────────────────────────────────────────────────

/// `#`-prefixed headings, up to a maximum level.
///
/// Only runs of at most `max_level` hashes are recognised; any extra hashes
/// stay in the heading text. The heading-offset extension lowers the
/// maximum so that shifted levels never exceed `h6`.
pub struct HashHeaderProcessor {
    max_level: usize,
}

impl HashHeaderProcessor {
    pub fn new() -> Self {
        Self::with_max_level(6)
    }

    /// `max_level` is clamped to `1..=6`.
    pub fn with_max_level(max_level: usize) -> Self {
        Self {
            max_level: max_level.clamp(1, 6),
        }
    }

    pub fn max_level(&self) -> usize {
        self.max_level
    }

    fn regex(&self) -> &'static Regex {
        &RE_HASH[self.max_level - 1]
    }
}

impl Default for HashHeaderProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockProcessor for HashHeaderProcessor {
    fn test(&self, _parent: &Node, block: &str) -> bool {
        self.regex().is_match(block)
    }

    fn run(
        &self,
        parser: &BlockParser<'_>,
        parent: &mut Node,
        blocks: &mut VecDeque<String>,
        ctx: &mut ConversionContext,
    ) -> Result<bool, BoxError> {
        let Some(caps) = blocks.front().and_then(|b| self.regex().captures(b)) else {
            return Ok(false);
        };
        let (Some(whole), Some(level), Some(header)) =
            (caps.get(0), caps.name("level"), caps.name("header"))
        else {
            return Ok(false);
        };
        let block = &blocks[0];
        let before = block[..whole.start()].to_string();
        let after = block[whole.end()..].to_string();
        let heading = Node::new(format!("h{}", level.len()))
            .with_text(Text::plain(header.as_str().trim()));
        blocks.pop_front();

        if !before.is_empty() {
            parser.parse_blocks(parent, VecDeque::from([before]), ctx)?;
        }
        parent.push_child(heading);
        if !after.is_empty() {
            blocks.push_front(after);
        }
        Ok(true)
    }
}

// ── Setext headers ───────────────────────────────────────────────────────────

/// A line underlined with `=` (h1) or `-` (h2), at the start of a chunk.
pub struct SetextHeaderProcessor;

impl BlockProcessor for SetextHeaderProcessor {
    fn test(&self, _parent: &Node, block: &str) -> bool {
        RE_SETEXT.find(block).is_some_and(|m| m.start() == 0)
    }

    fn run(
        &self,
        _parser: &BlockParser<'_>,
        parent: &mut Node,
        blocks: &mut VecDeque<String>,
        _ctx: &mut ConversionContext,
    ) -> Result<bool, BoxError> {
        let Some(block) = blocks.pop_front() else {
            return Ok(false);
        };
        let lines: Vec<&str> = block.split('\n').collect();
        if lines.len() < 2 {
            blocks.push_front(block);
            return Ok(false);
        }
        let tag = if lines[1].starts_with('=') { "h1" } else { "h2" };
        parent.push_child(Node::new(tag).with_text(Text::plain(lines[0].trim())));
        if lines.len() > 2 {
            blocks.push_front(lines[2..].join("\n"));
        }
        Ok(true)
    }
}

// ── Paragraph ────────────────────────────────────────────────────────────────

/// Catch-all: every chunk becomes a `p`.
pub struct ParagraphProcessor;

impl BlockProcessor for ParagraphProcessor {
    fn test(&self, _parent: &Node, _block: &str) -> bool {
        true
    }

    fn run(
        &self,
        _parser: &BlockParser<'_>,
        parent: &mut Node,
        blocks: &mut VecDeque<String>,
        _ctx: &mut ConversionContext,
    ) -> Result<bool, BoxError> {
        let Some(block) = blocks.pop_front() else {
            return Ok(false);
        };
        append_paragraph(parent, &block);
        Ok(true)
    }
}
