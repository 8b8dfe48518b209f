//! TeX math for MathJax: `$inline$` spans and `$$display$$` blocks.
//!
//! The TeX source is kept verbatim (protected) for the client-side renderer.
//! The inline stage runs before `escape` so backslashes reach TeX intact.

use crate::engine::Engine;
use crate::error::{BoxError, MarkupError};
use crate::extensions::Extension;
use crate::node::{Node, Text};
use crate::pipeline::block::BlockParser;
use crate::pipeline::stage::{BlockProcessor, InlineMatch, InlinePattern, Replacement};
use crate::pipeline::ConversionContext;
use crate::registry::Location;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::VecDeque;

static RE_INLINE_MATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$((?:\\.|[^\n\\$])+)\$").unwrap());
static RE_DISPLAY_MATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?ms)(?:^|\n)\$\$.+\$\$(?:\n|$)").unwrap());

pub struct MathJaxExtension;

impl Extension for MathJaxExtension {
    fn name(&self) -> &'static str {
        "mathjax"
    }

    fn extend(&self, engine: &mut Engine) -> Result<(), MarkupError> {
        engine
            .inline_patterns_mut()
            .add("mathjax", Box::new(InlineMathPattern), Location::before("escape"))?;
        engine
            .block_processors_mut()
            .add("mathjax", Box::new(DisplayMathProcessor), Location::after("empty"))
    }
}

/// `$x^2$` → `<span>$x^2$</span>`.
pub struct InlineMathPattern;

impl InlinePattern for InlineMathPattern {
    fn regex(&self) -> &Regex {
        &RE_INLINE_MATH
    }

    fn accepts(&self, m: &InlineMatch<'_>) -> bool {
        m.char_before() != Some('\\')
    }

    fn handle_match(&self, m: &InlineMatch<'_>, _ctx: &mut ConversionContext) -> Result<Option<Replacement>, BoxError> {
        Ok(Some(Replacement::Node(
            Node::new("span").with_text(Text::protected(m.as_str())),
        )))
    }
}

/// `$$..$$` → `<div class="mathjax-wrapper"><mathjax>$$..$$</mathjax></div>`.
pub struct DisplayMathProcessor;

impl BlockProcessor for DisplayMathProcessor {
    fn test(&self, _parent: &Node, block: &str) -> bool {
        RE_DISPLAY_MATH.is_match(block)
    }

    fn run(
        &self,
        parser: &BlockParser<'_>,
        parent: &mut Node,
        blocks: &mut VecDeque<String>,
        ctx: &mut ConversionContext,
    ) -> Result<bool, BoxError> {
        let Some(range) = blocks.front().and_then(|b| RE_DISPLAY_MATH.find(b)).map(|m| m.range()) else {
            return Ok(false);
        };
        let Some(block) = blocks.pop_front() else {
            return Ok(false);
        };
        let before = &block[..range.start];
        let after = &block[range.end..];
        let tex = block[range].trim();

        if !before.is_empty() {
            parser.parse_blocks(parent, VecDeque::from([before.to_string()]), ctx)?;
        }
        let wrapper = parent.push_child(Node::new("div").with_attr("class", "mathjax-wrapper"));
        wrapper.push_child(Node::new("mathjax").with_text(Text::protected(tex)));
        if !after.is_empty() {
            blocks.push_front(after.to_string());
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(source: &str) -> String {
        let mut engine = Engine::new().unwrap();
        engine.register(&MathJaxExtension).unwrap();
        engine.convert(source).unwrap().html
    }

    #[test]
    fn inline_math_is_verbatim() {
        assert_eq!(
            convert(r"so $a_1 * b_2 \cdot c$ holds"),
            r"<p>so <span>$a_1 * b_2 \cdot c$</span> holds</p>"
        );
    }

    #[test]
    fn escaped_dollar_is_not_math() {
        assert_eq!(convert(r"costs \$5 and $6"), r"<p>costs \$5 and $6</p>");
    }

    #[test]
    fn display_math_block() {
        assert_eq!(
            convert("text\n$$\n\\int_0^1 x\\,dx\n$$\nmore"),
            "<p>text</p>\n<div class=\"mathjax-wrapper\"><mathjax>$$\n\\int_0^1 x\\,dx\n$$</mathjax></div>\n<p>more</p>"
        );
    }
}
