//! Shift every heading down by a fixed number of levels.
//!
//! With an offset of 2, `# Title` renders as `<h3>`. Levels saturate at
//! `h6`, and the hash-header stage is narrowed to `6 - offset` hashes so a
//! line like `###### x` keeps the surplus hashes as text instead of
//! claiming a level that would collapse into `h6` anyway.

use crate::engine::Engine;
use crate::error::{BoxError, MarkupError};
use crate::extensions::Extension;
use crate::node::Node;
use crate::pipeline::blocks::HashHeaderProcessor;
use crate::pipeline::stage::TreeProcessor;
use crate::pipeline::ConversionContext;
use crate::registry::Location;

pub struct HeaderOffsetExtension {
    offset: usize,
}

impl HeaderOffsetExtension {
    pub fn new(offset: usize) -> Result<Self, MarkupError> {
        if !(1..=5).contains(&offset) {
            return Err(MarkupError::InvalidConfig(format!(
                "header offset must be 1–5, got {offset}"
            )));
        }
        Ok(Self { offset })
    }
}

impl Extension for HeaderOffsetExtension {
    fn name(&self) -> &'static str {
        "header_offset"
    }

    fn extend(&self, engine: &mut Engine) -> Result<(), MarkupError> {
        engine.block_processors_mut().replace(
            "hashheader",
            Box::new(HashHeaderProcessor::with_max_level(6 - self.offset)),
        )?;
        engine.tree_processors_mut().add(
            "header_offset",
            Box::new(HeaderOffsetProcessor {
                offset: self.offset,
            }),
            Location::End,
        )
    }
}

pub struct HeaderOffsetProcessor {
    offset: usize,
}

/// Level of an `h1`..`h6` tag.
pub fn heading_level(tag: &str) -> Option<usize> {
    let level = tag.strip_prefix('h')?.parse::<usize>().ok()?;
    (1..=6).contains(&level).then_some(level)
}

impl TreeProcessor for HeaderOffsetProcessor {
    fn run(&self, mut root: Node, _ctx: &mut ConversionContext) -> Result<Node, BoxError> {
        for path in root.paths() {
            let Some(node) = root.at_path_mut(&path) else {
                continue;
            };
            if let Some(level) = heading_level(&node.tag) {
                node.tag = format!("h{}", (level + self.offset).min(6));
            }
        }
        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TITLES: &str = "# Title 1\n## Title 2\n### Title 3\n#### Title 4\n##### Title 5\n\
                          ###### Title 6\n####### Title 7\nTitle 1b\n========\nTitle 2b\n--------\n";

    fn convert(offset: usize) -> String {
        let mut engine = Engine::new().unwrap();
        engine
            .register(&HeaderOffsetExtension::new(offset).unwrap())
            .unwrap();
        engine.convert(TITLES).unwrap().html
    }

    #[test]
    fn offset_one() {
        assert_eq!(
            convert(1),
            "<h2>Title 1</h2>\n<h3>Title 2</h3>\n<h4>Title 3</h4>\n<h5>Title 4</h5>\n\
             <h6>Title 5</h6>\n<h6># Title 6</h6>\n<h6>## Title 7</h6>\n\
             <h2>Title 1b</h2>\n<h3>Title 2b</h3>"
        );
    }

    #[test]
    fn offset_two() {
        assert_eq!(
            convert(2),
            "<h3>Title 1</h3>\n<h4>Title 2</h4>\n<h5>Title 3</h5>\n<h6>Title 4</h6>\n\
             <h6># Title 5</h6>\n<h6>## Title 6</h6>\n<h6>### Title 7</h6>\n\
             <h3>Title 1b</h3>\n<h4>Title 2b</h4>"
        );
    }

    #[test]
    fn offset_range() {
        assert!(HeaderOffsetExtension::new(0).is_err());
        assert!(HeaderOffsetExtension::new(6).is_err());
    }

    #[test]
    fn levels() {
        assert_eq!(heading_level("h3"), Some(3));
        assert_eq!(heading_level("h7"), None);
        assert_eq!(heading_level("hr"), None);
        assert_eq!(heading_level("html"), None);
    }
}
