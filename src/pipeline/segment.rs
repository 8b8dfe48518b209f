//! Multi-chunk segmentation for block stages.
//!
//! Some constructs open with a marker in one chunk and close with one of
//! several end markers possibly several chunks later, with blank lines in
//! between. A [`Segmenter`] finds the extent of such a construct at the
//! front of the chunk queue and splits it into:
//!
//! - `before`: text of the first chunk preceding the start marker
//! - `content`: everything between the markers, chunks rejoined with `"\n\n"`
//! - `after`: text of the closing chunk following the end marker
//!
//! The end marker is searched chunk by chunk starting in the first chunk,
//! just past the start marker. Within a chunk the leftmost end marker wins;
//! on a tie, the one declared first. The outcome attached to the winning
//! end marker (an alignment, say) is reported back to the caller.
//!
//! When no end marker exists anywhere in the queue the construct does not
//! exist: nothing is consumed and the stage should decline the chunk.

use crate::node::Node;
use regex::Regex;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// A construct located at the front of a chunk queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<O> {
    /// Outcome of the end marker that closed the construct.
    pub outcome: O,
    pub before: String,
    pub content: String,
    pub after: String,
    /// Number of chunks consumed from the queue.
    pub chunks: usize,
}

/// Start marker plus an ordered list of end markers with their outcomes.
#[derive(Debug, Clone)]
pub struct Segmenter<O> {
    start: Regex,
    ends: Vec<(Regex, O)>,
}

struct EndMatch {
    chunk: usize,
    start: usize,
    end: usize,
    which: usize,
}

impl<O: Clone> Segmenter<O> {
    pub fn new(start: Regex, ends: Vec<(Regex, O)>) -> Self {
        Self { start, ends }
    }

    /// `true` when `block` contains the start marker.
    pub fn starts(&self, block: &str) -> bool {
        self.start.is_match(block)
    }

    /// Locate the construct without touching the queue.
    ///
    /// Returns the start match range in the first chunk and the end match.
    fn locate(&self, blocks: &VecDeque<String>) -> Option<((usize, usize), EndMatch)> {
        let first = blocks.front()?;
        let Some(open) = self.start.find(first) else {
            warn!("segment start marker missing from the front chunk");
            debug_assert!(false, "segment start marker missing from the front chunk");
            return None;
        };
        // Scanning resumes one character past the start marker.
        let skip = first[open.end()..]
            .chars()
            .next()
            .map_or(first.len(), |c| open.end() + c.len_utf8());

        for (i, chunk) in blocks.iter().enumerate() {
            let offset = if i == 0 { skip } else { 0 };
            let text = &chunk[offset..];
            let best = self
                .ends
                .iter()
                .enumerate()
                .filter_map(|(which, (re, _))| re.find(text).map(|m| (m.start(), which, m.end())))
                .min_by_key(|&(start, which, _)| (start, which));
            if let Some((start, which, end)) = best {
                return Some((
                    (open.start(), open.end()),
                    EndMatch {
                        chunk: i,
                        start: start + offset,
                        end: end + offset,
                        which,
                    },
                ));
            }
        }
        debug!(chunks = blocks.len(), "segment has no end marker");
        None
    }

    /// Remove the construct from the front of `blocks`.
    ///
    /// Returns `None`, leaving `blocks` untouched, when no end marker
    /// closes it. The `after` remainder is returned, not re-queued.
    pub fn take(&self, blocks: &mut VecDeque<String>) -> Option<Segment<O>> {
        let ((open_start, open_end), close) = self.locate(blocks)?;

        let mut parts = Vec::with_capacity(close.chunk + 1);
        let mut before = String::new();
        let mut after = String::new();
        for i in 0..=close.chunk {
            let chunk = blocks.pop_front()?;
            let from = if i == 0 { open_end } else { 0 };
            let to = if i == close.chunk { close.start } else { chunk.len() };
            parts.push(chunk[from..to].to_string());
            if i == 0 {
                before = chunk[..open_start].to_string();
            }
            if i == close.chunk {
                after = chunk[close.end..].to_string();
            }
        }

        Some(Segment {
            outcome: self.ends[close.which].1.clone(),
            before,
            content: parts.join("\n\n"),
            after,
            chunks: close.chunk + 1,
        })
    }
}

/// The container a segment's content goes into.
///
/// A directly preceding sibling with the same tag and the same value for
/// `attr` is reused, so consecutive constructs with identical outcomes form
/// one container; a newline is appended to its text if it has any.
/// Otherwise a new container is appended.
pub fn merge_target<'a>(parent: &'a mut Node, tag: &str, attr: &str, value: &str) -> &'a mut Node {
    let mergeable = parent
        .last_child()
        .is_some_and(|last| last.tag == tag && last.get(attr) == Some(value));
    if mergeable {
        let idx = parent.children.len() - 1;
        let last = &mut parent.children[idx];
        if let Some(text) = last.text.as_mut().filter(|t| !t.is_empty()) {
            text.push_plain("\n");
        }
        return last;
    }
    parent.push_child(Node::new(tag).with_attr(attr, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Side {
        Right,
        Center,
    }

    fn segmenter() -> Segmenter<Side> {
        Segmenter::new(
            Regex::new(r"(^|\n)->").unwrap(),
            vec![
                (Regex::new(r"->(\n|$)").unwrap(), Side::Right),
                (Regex::new(r"<-(\n|$)").unwrap(), Side::Center),
            ],
        )
    }

    fn queue(chunks: &[&str]) -> VecDeque<String> {
        chunks.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn single_chunk() {
        let mut blocks = queue(&["->centered<-", "next"]);
        let seg = segmenter().take(&mut blocks).unwrap();
        assert_eq!(seg.outcome, Side::Center);
        assert_eq!(seg.content, "centered");
        assert_eq!((seg.before.as_str(), seg.after.as_str()), ("", ""));
        assert_eq!(seg.chunks, 1);
        assert_eq!(blocks, queue(&["next"]));
    }

    #[test]
    fn spans_three_chunks() {
        let mut blocks = queue(&["->start", "middle", "end->"]);
        let seg = segmenter().take(&mut blocks).unwrap();
        assert_eq!(seg.outcome, Side::Right);
        assert_eq!(seg.content, "start\n\nmiddle\n\nend");
        assert_eq!(seg.chunks, 3);
        assert!(blocks.is_empty());
    }

    #[test]
    fn before_and_after_are_split_off() {
        let mut blocks = queue(&["intro\n->body", "tail->\noutro"]);
        let seg = segmenter().take(&mut blocks).unwrap();
        assert_eq!(seg.before, "intro");
        assert_eq!(seg.content, "body\n\ntail");
        assert_eq!(seg.after, "outro");
    }

    #[test]
    fn end_search_uses_absolute_offsets_after_leading_text() {
        // The end marker must be located relative to the whole chunk even
        // when the start marker is not at position 0.
        let mut blocks = queue(&["some intro text\n->x<-\nrest"]);
        let seg = segmenter().take(&mut blocks).unwrap();
        assert_eq!(seg.before, "some intro text");
        assert_eq!(seg.content, "x");
        assert_eq!(seg.after, "rest");
    }

    #[test]
    fn leftmost_end_marker_wins() {
        let mut blocks = queue(&["->a<-\nb->"]);
        let seg = segmenter().take(&mut blocks).unwrap();
        assert_eq!(seg.outcome, Side::Center);
        assert_eq!(seg.content, "a");
        assert_eq!(seg.after, "b->");
    }

    #[test]
    fn tie_goes_to_first_declared() {
        let seg = Segmenter::new(
            Regex::new(r"^>>").unwrap(),
            vec![
                (Regex::new(r"<<").unwrap(), "first"),
                (Regex::new(r"<<<?").unwrap(), "second"),
            ],
        )
        .take(&mut queue(&[">>x<<"]))
        .unwrap();
        assert_eq!(seg.outcome, "first");
    }

    #[test]
    fn missing_end_consumes_nothing() {
        let mut blocks = queue(&["->never closed", "plain"]);
        assert!(segmenter().take(&mut blocks).is_none());
        assert_eq!(blocks, queue(&["->never closed", "plain"]));
    }

    #[test]
    fn merge_reuses_matching_sibling() {
        let mut parent = Node::new("div");
        merge_target(&mut parent, "div", "align", "right").text = Some("a".into());
        let again = merge_target(&mut parent, "div", "align", "right");
        assert_eq!(again.text.as_ref().unwrap().as_string(), "a\n");
        merge_target(&mut parent, "div", "align", "center");
        assert_eq!(parent.children.len(), 2);
    }
}
