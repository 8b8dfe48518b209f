//! Pipeline stages and the runners that drive them.
//!
//! A conversion runs four sub-pipelines in a fixed sequence, each backed by
//! one [`crate::registry::OrderedRegistry`]:
//!
//! ```text
//! lines ──▶ preprocess ──▶ block ──▶ inline ──▶ tree ──▶ serialize
//!          (Vec<String>)   (Node)    (Node)     (Node)    (String)
//! ```
//!
//! 1. [`preprocess`]  whole-document line transforms, run in registry order
//! 2. [`block`]       chunk the lines on blank lines and build the tree;
//!    [`segment`] lets one block stage claim several chunks at once
//! 3. [`inline`]      rewrite unprotected text and tails into inline nodes
//! 4. tree stages     whole-tree mutations (heading shifts, anchors)
//! 5. [`serialize`]   HTML output with placeholders resolved
//!
//! [`blocks`] and [`patterns`] hold the core stages every engine starts with.

pub mod block;
pub mod blocks;
pub mod inline;
pub mod patterns;
pub mod preprocess;
pub mod segment;
pub mod serialize;
pub mod stage;

use crate::metadata::Metadata;
use crate::stash::ContentStash;

/// Mutable state shared by every stage of one conversion.
///
/// Stages receive it for the duration of a single call and cannot hold on
/// to it afterwards.
#[derive(Debug, Default)]
pub struct ConversionContext {
    pub stash: ContentStash,
    pub metadata: Metadata,
}

impl ConversionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty the protection store and the metadata channel.
    pub fn reset(&mut self) {
        self.stash.reset();
        self.metadata.reset();
    }
}
