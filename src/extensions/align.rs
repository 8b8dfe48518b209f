//! Right-aligned and centered blocks.
//!
//! ```text
//! ->This paragraph is right aligned->
//!
//! ->This one is centered<-
//! ```
//!
//! A block opens with `->` at the start of a line and closes with `->`
//! (right) or `<-` (center) at the end of a line, possibly several
//! paragraphs later. Consecutive blocks with the same alignment share one
//! `div`.

use crate::engine::Engine;
use crate::error::{BoxError, MarkupError};
use crate::extensions::Extension;
use crate::node::Node;
use crate::pipeline::block::BlockParser;
use crate::pipeline::segment::{merge_target, Segmenter};
use crate::pipeline::stage::BlockProcessor;
use crate::pipeline::ConversionContext;
use crate::registry::Location;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::VecDeque;

static SEGMENTER: Lazy<Segmenter<Alignment>> = Lazy::new(|| {
    Segmenter::new(
        Regex::new(r"(^|\n)->").unwrap(),
        vec![
            (Regex::new(r"->(\n|$)").unwrap(), Alignment::Right),
            (Regex::new(r"<-(\n|$)").unwrap(), Alignment::Center),
        ],
    )
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Right,
    Center,
}

impl Alignment {
    pub fn as_str(self) -> &'static str {
        match self {
            Alignment::Right => "right",
            Alignment::Center => "center",
        }
    }
}

pub struct AlignExtension;

impl Extension for AlignExtension {
    fn name(&self) -> &'static str {
        "align"
    }

    fn extend(&self, engine: &mut Engine) -> Result<(), MarkupError> {
        engine
            .block_processors_mut()
            .add("align", Box::new(AlignProcessor), Location::Begin)
    }
}

pub struct AlignProcessor;

impl BlockProcessor for AlignProcessor {
    fn test(&self, _parent: &Node, block: &str) -> bool {
        SEGMENTER.starts(block)
    }

    fn run(
        &self,
        parser: &BlockParser<'_>,
        parent: &mut Node,
        blocks: &mut VecDeque<String>,
        ctx: &mut ConversionContext,
    ) -> Result<bool, BoxError> {
        let Some(segment) = SEGMENTER.take(blocks) else {
            return Ok(false);
        };
        if !segment.before.is_empty() {
            parser.parse_blocks(parent, VecDeque::from([segment.before]), ctx)?;
        }
        let container = merge_target(parent, "div", "align", segment.outcome.as_str());
        parser.parse_chunk(container, &segment.content, ctx)?;
        if !segment.after.is_empty() {
            blocks.push_front(segment.after);
        }
        Ok(true)
    }
}
