//! Markup tree nodes and protected text.
//!
//! A [`Node`] mirrors an XML element: a tag, ordered attributes, leading
//! text, child nodes, and a *tail*, the text that follows the node inside
//! its parent and precedes the next sibling. Inline runs such as
//! `a <em>b</em> c` are stored as `text = "a "`, child `em` with
//! `tail = " c"`.
//!
//! Text values are [`Text`]: a sequence of [`Span`]s, each flagged as
//! protected or not. Inline stages only ever scan unprotected spans, and
//! because protection lives on the span, concatenating texts or moving them
//! into tail positions can never lose it.

use serde::Serialize;

/// One run of characters with a single protection flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Span {
    pub value: String,
    pub protected: bool,
}

/// A text value made of ordinary and protected spans.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Text {
    spans: Vec<Span>,
}

impl Text {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ordinary text, open to inline processing.
    pub fn plain(value: impl Into<String>) -> Self {
        let mut text = Self::new();
        text.push_plain(value);
        text
    }

    /// Text that no inline stage will rescan.
    pub fn protected(value: impl Into<String>) -> Self {
        let mut text = Self::new();
        text.push_protected(value);
        text
    }

    pub fn push_plain(&mut self, value: impl Into<String>) {
        self.push_span(value.into(), false);
    }

    pub fn push_protected(&mut self, value: impl Into<String>) {
        self.push_span(value.into(), true);
    }

    /// Append another text, keeping each span's flag.
    pub fn append(&mut self, other: Text) {
        for span in other.spans {
            self.push_span(span.value, span.protected);
        }
    }

    fn push_span(&mut self, value: String, protected: bool) {
        if value.is_empty() {
            return;
        }
        match self.spans.last_mut() {
            Some(last) if last.protected == protected => last.value.push_str(&value),
            _ => self.spans.push(Span { value, protected }),
        }
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub(crate) fn into_spans(self) -> Vec<Span> {
        self.spans
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// `true` when every character is protected (and there is at least one).
    pub fn is_protected(&self) -> bool {
        !self.spans.is_empty() && self.spans.iter().all(|s| s.protected)
    }

    /// The full string, flags dropped.
    pub fn as_string(&self) -> String {
        self.spans.iter().map(|s| s.value.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.spans.iter().map(|s| s.value.len()).sum()
    }

    /// Strip leading whitespace from the first span(s).
    pub fn trim_start(mut self) -> Self {
        while let Some(first) = self.spans.first_mut() {
            let trimmed = first.value.trim_start();
            if trimmed.is_empty() {
                self.spans.remove(0);
            } else {
                first.value = trimmed.to_string();
                break;
            }
        }
        self
    }
}

impl From<&str> for Text {
    fn from(value: &str) -> Self {
        Text::plain(value)
    }
}

impl From<String> for Text {
    fn from(value: String) -> Self {
        Text::plain(value)
    }
}

/// A markup tree element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Node {
    pub tag: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attrs: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Text>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tail: Option<Text>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<Text>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Set an attribute, keeping its position if it already exists.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Append a child and return a handle to it.
    pub fn push_child(&mut self, child: Node) -> &mut Node {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.children.last()
    }

    pub fn last_child_mut(&mut self) -> Option<&mut Node> {
        self.children.last_mut()
    }

    /// Append to the leading text.
    pub fn append_text(&mut self, text: Text) {
        match &mut self.text {
            Some(existing) => existing.append(text),
            None => self.text = Some(text),
        }
    }

    /// Append to the tail.
    pub fn append_tail(&mut self, text: Text) {
        match &mut self.tail {
            Some(existing) => existing.append(text),
            None => self.tail = Some(text),
        }
    }

    /// Paths (child index sequences) of every descendant, pre-order.
    ///
    /// Tree stages collect these before mutating so that no traversal is
    /// live while nodes change. The empty path is `self`.
    pub fn paths(&self) -> Vec<Vec<usize>> {
        let mut out = vec![Vec::new()];
        collect_paths(self, &mut Vec::new(), &mut out);
        out
    }

    pub fn at_path(&self, path: &[usize]) -> Option<&Node> {
        path.iter().try_fold(self, |node, &i| node.children.get(i))
    }

    pub fn at_path_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        path.iter()
            .try_fold(self, |node, &i| node.children.get_mut(i))
    }

    /// All text inside this node (not its own tail), flags dropped.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        push_text_content(self, &mut out);
        out
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Node::count).sum::<usize>()
    }
}

fn collect_paths(node: &Node, prefix: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
    for (i, child) in node.children.iter().enumerate() {
        prefix.push(i);
        out.push(prefix.clone());
        collect_paths(child, prefix, out);
        prefix.pop();
    }
}

fn push_text_content(node: &Node, out: &mut String) {
    if let Some(text) = &node.text {
        out.push_str(&text.as_string());
    }
    for child in &node.children {
        push_text_content(child, out);
        if let Some(tail) = &child.tail {
            out.push_str(&tail.as_string());
        }
    }
}
