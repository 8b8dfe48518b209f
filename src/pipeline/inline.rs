//! Inline pipeline: pattern scanning over text and tails.
//!
//! Every text and tail in the tree is scanned once, left to right. At each
//! position the candidate match of every pattern is computed and the
//! leftmost one wins; patterns starting at the same offset are ordered by
//! registry position. The winner's replacement (a node, or literal text) is
//! spliced in and scanning resumes after the match, so replaced text is
//! never rescanned by the pass that replaced it. A pattern that declines a
//! match is not offered a start at or before that offset again.
//!
//! Protected spans are copied through untouched, and matches never cross a
//! span boundary. Nodes produced by a pattern have their own text processed
//! recursively before they are inserted.

use crate::error::{MarkupError, PipelineKind};
use crate::node::{Node, Text};
use crate::pipeline::stage::{InlineMatch, InlinePattern, Replacement};
use crate::pipeline::ConversionContext;
use crate::registry::OrderedRegistry;

enum Piece {
    Text(Text),
    Node(Node),
}

/// Applies an inline pattern registry to a tree.
pub struct InlineProcessor<'r> {
    patterns: &'r OrderedRegistry<Box<dyn InlinePattern>>,
}

impl<'r> InlineProcessor<'r> {
    pub fn new(patterns: &'r OrderedRegistry<Box<dyn InlinePattern>>) -> Self {
        Self { patterns }
    }

    /// Process every text and tail below (and including) `root`.
    pub fn run(&self, root: &mut Node, ctx: &mut ConversionContext) -> Result<(), MarkupError> {
        if self.patterns.is_empty() {
            return Ok(());
        }
        self.process_node(root, ctx)
    }

    fn process_node(&self, node: &mut Node, ctx: &mut ConversionContext) -> Result<(), MarkupError> {
        let original = std::mem::take(&mut node.children);
        let mut children = Vec::with_capacity(original.len());

        if let Some(text) = node.text.take() {
            let pieces = self.scan(text, ctx)?;
            let (lead, produced) = self.assemble(pieces, ctx)?;
            node.text = lead;
            children.extend(produced);
        }

        for mut child in original {
            self.process_node(&mut child, ctx)?;
            let produced = match child.tail.take() {
                Some(tail) => {
                    let pieces = self.scan(tail, ctx)?;
                    let (lead, produced) = self.assemble(pieces, ctx)?;
                    child.tail = lead;
                    produced
                }
                None => Vec::new(),
            };
            children.push(child);
            children.extend(produced);
        }

        node.children = children;
        Ok(())
    }

    /// Turn scanned pieces into leading text plus a run of sibling nodes,
    /// literal pieces after a node becoming its tail.
    fn assemble(
        &self,
        pieces: Vec<Piece>,
        ctx: &mut ConversionContext,
    ) -> Result<(Option<Text>, Vec<Node>), MarkupError> {
        let mut lead: Option<Text> = None;
        let mut nodes: Vec<Node> = Vec::new();
        for piece in pieces {
            match piece {
                Piece::Text(text) => match nodes.last_mut() {
                    Some(last) => last.append_tail(text),
                    None => lead.get_or_insert_with(Text::new).append(text),
                },
                Piece::Node(mut node) => {
                    self.process_node(&mut node, ctx)?;
                    nodes.push(node);
                }
            }
        }
        Ok((lead.filter(|t| !t.is_empty()), nodes))
    }

    fn scan(&self, text: Text, ctx: &mut ConversionContext) -> Result<Vec<Piece>, MarkupError> {
        let mut pieces = Vec::new();
        for span in text.into_spans() {
            if span.protected {
                pieces.push(Piece::Text(Text::protected(span.value)));
            } else {
                self.scan_str(&span.value, ctx, &mut pieces)?;
            }
        }
        Ok(pieces)
    }

    fn scan_str(
        &self,
        s: &str,
        ctx: &mut ConversionContext,
        pieces: &mut Vec<Piece>,
    ) -> Result<(), MarkupError> {
        let mut floors = vec![0usize; self.patterns.len()];
        let mut pos = 0;
        let mut literal_from = 0;

        while pos <= s.len() {
            let mut best: Option<(usize, InlineMatch<'_>)> = None;
            for (idx, (_, pattern)) in self.patterns.iter().enumerate() {
                let from = pos.max(floors[idx]);
                let Some(m) = find_accepted(pattern.as_ref(), s, from) else {
                    continue;
                };
                if best.as_ref().map_or(true, |(_, b)| m.start() < b.start()) {
                    best = Some((idx, m));
                }
            }
            let Some((idx, m)) = best else { break };

            let Some((name, pattern)) = self.patterns.iter().nth(idx) else {
                break;
            };
            let replacement = pattern
                .handle_match(&m, ctx)
                .map_err(|e| MarkupError::stage(PipelineKind::Inline, name, e))?;
            match replacement {
                Some(rep) => {
                    if m.start() > literal_from {
                        pieces.push(Piece::Text(Text::plain(&s[literal_from..m.start()])));
                    }
                    pieces.push(match rep {
                        Replacement::Node(node) => Piece::Node(node),
                        Replacement::Text(text) => Piece::Text(text),
                    });
                    pos = m.end();
                    literal_from = pos;
                }
                None => floors[idx] = next_boundary(s, m.start()),
            }
        }

        if literal_from < s.len() {
            pieces.push(Piece::Text(Text::plain(&s[literal_from..])));
        }
        Ok(())
    }
}

/// First non-empty match of `pattern` at or after `from` that its context
/// guard accepts.
fn find_accepted<'h>(pattern: &dyn InlinePattern, s: &'h str, mut from: usize) -> Option<InlineMatch<'h>> {
    while from <= s.len() {
        let caps = pattern.regex().captures_at(s, from)?;
        let m = InlineMatch::new(s, caps);
        if m.end() > m.start() && pattern.accepts(&m) {
            return Some(m);
        }
        from = next_boundary(s, m.start());
    }
    None
}

/// Byte offset of the character after the one at `i`.
fn next_boundary(s: &str, i: usize) -> usize {
    s[i..].chars().next().map_or(s.len() + 1, |c| i + c.len_utf8())
}
