//! Stage interfaces, one per pipeline kind.
//!
//! Stages are stored as boxed trait objects in an ordered registry. Each
//! one is stateless from the engine's point of view: anything it
//! accumulates goes into [`ConversionContext`], and [`reset`] hooks run at
//! the start of every conversion so a stage can (re)initialise the metadata
//! keys it owns.
//!
//! [`reset`]: Preprocessor::reset

use crate::error::BoxError;
use crate::metadata::Metadata;
use crate::node::{Node, Text};
use crate::pipeline::block::BlockParser;
use crate::pipeline::ConversionContext;
use regex::{Captures, Regex};
use std::collections::VecDeque;

/// Whole-document line transform.
pub trait Preprocessor: Send {
    fn run(&self, lines: Vec<String>, ctx: &mut ConversionContext) -> Result<Vec<String>, BoxError>;

    fn reset(&mut self, _metadata: &mut Metadata) {}
}

/// Builds tree nodes from the chunk queue.
pub trait BlockProcessor: Send {
    /// Cheap check on the front chunk. Registry order decides which
    /// accepting stage gets to [`run`](Self::run) first.
    fn test(&self, parent: &Node, block: &str) -> bool;

    /// Consume chunks from the front of `blocks` and append to `parent`.
    ///
    /// Returning `Ok(false)` means "not mine after all": `blocks` must be
    /// left untouched and the next accepting stage is tried.
    fn run(
        &self,
        parser: &BlockParser<'_>,
        parent: &mut Node,
        blocks: &mut VecDeque<String>,
        ctx: &mut ConversionContext,
    ) -> Result<bool, BoxError>;

    fn reset(&mut self, _metadata: &mut Metadata) {}
}

/// A candidate inline match, with the text around it.
pub struct InlineMatch<'h> {
    haystack: &'h str,
    captures: Captures<'h>,
}

impl<'h> InlineMatch<'h> {
    pub(crate) fn new(haystack: &'h str, captures: Captures<'h>) -> Self {
        Self { haystack, captures }
    }

    pub fn start(&self) -> usize {
        self.captures.get(0).map_or(0, |m| m.start())
    }

    pub fn end(&self) -> usize {
        self.captures.get(0).map_or(0, |m| m.end())
    }

    pub fn as_str(&self) -> &'h str {
        self.captures.get(0).map_or("", |m| m.as_str())
    }

    /// Capture group by index, `None` when it did not participate.
    pub fn group(&self, i: usize) -> Option<&'h str> {
        self.captures.get(i).map(|m| m.as_str())
    }

    pub fn name(&self, name: &str) -> Option<&'h str> {
        self.captures.name(name).map(|m| m.as_str())
    }

    /// Character just before the match.
    pub fn char_before(&self) -> Option<char> {
        self.haystack[..self.start()].chars().next_back()
    }

    /// Character just after the match.
    pub fn char_after(&self) -> Option<char> {
        self.haystack[self.end()..].chars().next()
    }
}

/// What an inline stage puts in place of its match.
#[derive(Debug, Clone, PartialEq)]
pub enum Replacement {
    /// A new node. Its unprotected text is processed by the inline
    /// pipeline in turn.
    Node(Node),
    /// Literal text, inserted as-is and never rescanned by this pass.
    Text(Text),
}

impl Replacement {
    pub fn protected(value: impl Into<String>) -> Self {
        Replacement::Text(Text::protected(value))
    }
}

/// Regex-driven inline rewrite.
pub trait InlinePattern: Send {
    fn regex(&self) -> &Regex;

    /// Context check the regex cannot express (what precedes or follows the
    /// match). A rejected candidate is retried one character further on.
    fn accepts(&self, _m: &InlineMatch<'_>) -> bool {
        true
    }

    /// Build the replacement, or `None` to decline this match.
    fn handle_match(
        &self,
        m: &InlineMatch<'_>,
        ctx: &mut ConversionContext,
    ) -> Result<Option<Replacement>, BoxError>;

    fn reset(&mut self, _metadata: &mut Metadata) {}
}

/// Whole-tree transform, run after inline processing.
pub trait TreeProcessor: Send {
    fn run(&self, root: Node, ctx: &mut ConversionContext) -> Result<Node, BoxError>;

    fn reset(&mut self, _metadata: &mut Metadata) {}
}
