//! Block pipeline: chunk queue and dispatch loop.
//!
//! The document is joined into one string and split on blank lines
//! (`"\n\n"`) into *chunks*. The parser repeatedly looks at the front chunk
//! and offers it to each block stage in registry order; the first stage
//! whose `test` accepts it and whose `run` returns `true` has consumed one
//! or more chunks. Stages may push chunks back onto the front of the queue
//! (the unconsumed remainder of a chunk) and may re-enter the parser to
//! build nested content.

use crate::error::{MarkupError, PipelineKind};
use crate::node::{Node, Text};
use crate::pipeline::stage::BlockProcessor;
use crate::pipeline::ConversionContext;
use crate::registry::OrderedRegistry;
use std::collections::VecDeque;
use tracing::trace;

/// Split `text` into chunks on blank lines.
pub fn split_chunks(text: &str) -> VecDeque<String> {
    text.split("\n\n").map(str::to_string).collect()
}

/// Runs block stages over a chunk queue.
///
/// Holds the registry immutably, so stages can call back into the same
/// parser for nested content while the tree is borrowed mutably.
pub struct BlockParser<'r> {
    processors: &'r OrderedRegistry<Box<dyn BlockProcessor>>,
}

impl<'r> BlockParser<'r> {
    pub fn new(processors: &'r OrderedRegistry<Box<dyn BlockProcessor>>) -> Self {
        Self { processors }
    }

    /// Build a fresh root `div` from the document lines.
    pub fn parse_document(
        &self,
        lines: &[String],
        ctx: &mut ConversionContext,
    ) -> Result<Node, MarkupError> {
        let mut root = Node::new("div");
        self.parse_chunk(&mut root, &lines.join("\n"), ctx)?;
        Ok(root)
    }

    /// Split `text` into chunks and parse them into `parent`.
    pub fn parse_chunk(
        &self,
        parent: &mut Node,
        text: &str,
        ctx: &mut ConversionContext,
    ) -> Result<(), MarkupError> {
        self.parse_blocks(parent, split_chunks(text), ctx)
    }

    /// Drain `blocks` into `parent`.
    pub fn parse_blocks(
        &self,
        parent: &mut Node,
        mut blocks: VecDeque<String>,
        ctx: &mut ConversionContext,
    ) -> Result<(), MarkupError> {
        while !blocks.is_empty() {
            if !self.dispatch(parent, &mut blocks, ctx)? {
                // No registered stage claimed the chunk.
                if let Some(block) = blocks.pop_front() {
                    append_paragraph(parent, &block);
                }
            }
        }
        Ok(())
    }

    fn dispatch(
        &self,
        parent: &mut Node,
        blocks: &mut VecDeque<String>,
        ctx: &mut ConversionContext,
    ) -> Result<bool, MarkupError> {
        for (name, processor) in self.processors.iter() {
            if !processor.test(parent, &blocks[0]) {
                continue;
            }
            let consumed = processor
                .run(self, parent, blocks, ctx)
                .map_err(|e| MarkupError::stage(PipelineKind::Block, name, e))?;
            if consumed {
                trace!(stage = name, remaining = blocks.len(), "block consumed");
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Append `block` as a paragraph, unless it is blank.
///
/// Surrounding whitespace is dropped; inner newlines are kept.
pub fn append_paragraph(parent: &mut Node, block: &str) {
    let block = block.trim();
    if block.is_empty() {
        return;
    }
    parent.push_child(Node::new("p").with_text(Text::plain(block)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;

    struct Quote;

    impl BlockProcessor for Quote {
        fn test(&self, _parent: &Node, block: &str) -> bool {
            block.starts_with("> ")
        }

        fn run(
            &self,
            parser: &BlockParser<'_>,
            parent: &mut Node,
            blocks: &mut VecDeque<String>,
            ctx: &mut ConversionContext,
        ) -> Result<bool, BoxError> {
            let Some(block) = blocks.pop_front() else {
                return Ok(false);
            };
            let quote = parent.push_child(Node::new("blockquote"));
            parser.parse_chunk(quote, &block[2..], ctx)?;
            Ok(true)
        }
    }

    struct Declines;

    impl BlockProcessor for Declines {
        fn test(&self, _parent: &Node, _block: &str) -> bool {
            true
        }

        fn run(
            &self,
            _parser: &BlockParser<'_>,
            _parent: &mut Node,
            _blocks: &mut VecDeque<String>,
            _ctx: &mut ConversionContext,
        ) -> Result<bool, BoxError> {
            Ok(false)
        }
    }

    fn registry() -> OrderedRegistry<Box<dyn BlockProcessor>> {
        let mut reg: OrderedRegistry<Box<dyn BlockProcessor>> = OrderedRegistry::new();
        reg.add_at("declines", Box::new(Declines), "_begin").unwrap();
        reg.add_at("quote", Box::new(Quote), "_end").unwrap();
        reg
    }

    #[test]
    fn split_on_blank_lines() {
        assert_eq!(split_chunks("a\nb\n\nc"), ["a\nb", "c"]);
        assert_eq!(split_chunks("a\n\n\nb"), ["a", "\nb"]);
    }

    #[test]
    fn unclaimed_chunks_become_paragraphs() {
        let reg = registry();
        let parser = BlockParser::new(&reg);
        let mut ctx = ConversionContext::new();
        let root = parser
            .parse_document(&["  first".to_string(), String::new(), "second".to_string()], &mut ctx)
            .unwrap();
        let texts: Vec<_> = root.children.iter().map(Node::text_content).collect();
        assert_eq!(texts, ["first", "second"]);
    }

    #[test]
    fn stages_reenter_the_parser() {
        let reg = registry();
        let parser = BlockParser::new(&reg);
        let mut ctx = ConversionContext::new();
        let root = parser
            .parse_document(&["> inner".to_string()], &mut ctx)
            .unwrap();
        assert_eq!(root.children[0].tag, "blockquote");
        assert_eq!(root.children[0].children[0].tag, "p");
        assert_eq!(root.children[0].children[0].text_content(), "inner");
    }

    #[test]
    fn blank_chunk_adds_nothing() {
        let mut parent = Node::new("div");
        append_paragraph(&mut parent, "  \n ");
        assert!(parent.children.is_empty());
    }

    #[test]
    fn paragraph_text_is_trimmed() {
        let mut parent = Node::new("div");
        append_paragraph(&mut parent, " one\ntwo\n");
        assert_eq!(parent.children[0].text_content(), "one\ntwo");
    }
}
