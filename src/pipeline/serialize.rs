//! HTML serialisation and placeholder resolution.
//!
//! The root node is a wrapper and is not emitted; only its content is.
//! Block-level elements are laid out one per line, `br` is followed by a
//! newline, and `br`, `hr`, `img` are written as void elements. Text and
//! attribute values are escaped. Placeholders are resolved last: a
//! paragraph holding nothing but a placeholder for block-level safe content
//! is replaced by that content, so raw blocks are not wrapped in `<p>`.

use crate::node::Node;
use crate::stash::ContentStash;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static RE_PARAGRAPH_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new("<p>\u{2}zmd:([0-9]+)\u{3}</p>").unwrap());
static RE_LEADING_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^</?([^ >/]+)").unwrap());

const VOID_TAGS: &[&str] = &["br", "hr", "img"];

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "dd", "del", "details", "div", "dl",
    "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5",
    "h6", "header", "hr", "ins", "li", "main", "math", "nav", "noscript", "ol", "p", "pre",
    "section", "table", "tbody", "td", "tfoot", "th", "thead", "tr", "ul", "video",
];

/// `true` for tags laid out on their own line.
pub fn is_block_level(tag: &str) -> bool {
    BLOCK_TAGS.contains(&tag.to_ascii_lowercase().as_str())
}

/// `true` when raw HTML opens with a block-level tag (or a comment,
/// doctype or processing instruction).
pub fn is_block_html(html: &str) -> bool {
    RE_LEADING_TAG
        .captures(html)
        .and_then(|caps| caps.get(1))
        .is_some_and(|tag| {
            let tag = tag.as_str();
            tag.starts_with(['!', '?', '@', '%']) || is_block_level(tag)
        })
}

/// Escape text content.
pub fn escape_text(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

/// Escape raw markup that was stored as unsafe, quotes included.
pub fn escape_raw(raw: &str) -> String {
    html_escape::encode_double_quoted_attribute(raw).into_owned()
}

/// Serialise the content of `root` and resolve placeholders against `stash`.
pub fn to_html(root: &Node, stash: &ContentStash) -> String {
    let mut out = String::new();
    write_content(root, true, &mut out);
    let unwrapped = RE_PARAGRAPH_PLACEHOLDER.replace_all(out.trim(), |caps: &Captures<'_>| {
        let block = caps[1]
            .parse::<usize>()
            .ok()
            .and_then(|i| stash.get(i))
            .filter(|s| s.safe && is_block_html(&s.content));
        match block {
            Some(s) => s.content.clone(),
            None => caps[0].to_string(),
        }
    });
    stash.resolve(&unwrapped, escape_raw).trim().to_string()
}

fn write_node(node: &Node, out: &mut String) {
    out.push('<');
    out.push_str(&node.tag);
    for (key, value) in &node.attrs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&html_escape::encode_double_quoted_attribute(value));
        out.push('"');
    }
    out.push('>');
    if VOID_TAGS.contains(&node.tag.as_str()) {
        return;
    }
    let pretty = is_block_level(&node.tag) && !matches!(node.tag.as_str(), "pre" | "code");
    write_content(node, pretty, out);
    out.push_str("</");
    out.push_str(&node.tag);
    out.push('>');
}

/// Text and children of `node`, each child followed by its tail.
fn write_content(node: &Node, pretty: bool, out: &mut String) {
    let text = node.text.as_ref().map(|t| t.as_string()).unwrap_or_default();
    let first_is_block = node.children.first().is_some_and(|c| is_block_level(&c.tag));
    if pretty && first_is_block && text.trim().is_empty() {
        out.push('\n');
    } else {
        out.push_str(&escape_text(&text));
    }

    for child in &node.children {
        write_node(child, out);
        let tail = child.tail.as_ref().map(|t| t.as_string()).unwrap_or_default();
        if child.tag == "br" {
            out.push('\n');
            if !tail.trim().is_empty() {
                out.push_str(&escape_text(&tail));
            }
        } else if pretty && is_block_level(&child.tag) && tail.trim().is_empty() {
            out.push('\n');
        } else {
            out.push_str(&escape_text(&tail));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Text;

    fn root_with(children: Vec<Node>) -> Node {
        let mut root = Node::new("div");
        root.children = children;
        root
    }

    #[test]
    fn blocks_one_per_line() {
        let root = root_with(vec![
            Node::new("h1").with_text("Title"),
            Node::new("p").with_text("a < b & c"),
        ]);
        assert_eq!(
            to_html(&root, &ContentStash::new()),
            "<h1>Title</h1>\n<p>a &lt; b &amp; c</p>"
        );
    }

    #[test]
    fn nested_blocks_open_on_new_line() {
        let mut div = Node::new("div").with_attr("align", "right");
        div.push_child(Node::new("p").with_text("a"));
        div.push_child(Node::new("p").with_text("b"));
        let root = root_with(vec![div]);
        assert_eq!(
            to_html(&root, &ContentStash::new()),
            "<div align=\"right\">\n<p>a</p>\n<p>b</p>\n</div>"
        );
    }

    #[test]
    fn inline_children_and_void_tags() {
        let mut p = Node::new("p").with_text("one");
        let br = p.push_child(Node::new("br"));
        br.tail = Some(Text::plain("two "));
        let img = p.push_child(Node::new("img").with_attr("src", "/smile.png").with_attr("alt", ":)"));
        img.tail = Some(Text::plain(" end"));
        let root = root_with(vec![p]);
        assert_eq!(
            to_html(&root, &ContentStash::new()),
            "<p>one<br>\ntwo <img src=\"/smile.png\" alt=\":)\"> end</p>"
        );
    }

    #[test]
    fn attribute_values_are_escaped() {
        let root = root_with(vec![Node::new("a").with_attr("title", "say \"hi\"")]);
        assert_eq!(
            to_html(&root, &ContentStash::new()),
            "<a title=\"say &quot;hi&quot;\"></a>"
        );
    }

    #[test]
    fn placeholders_resolve_with_escaping() {
        let mut stash = ContentStash::new();
        let unsafe_ph = stash.store("<b>\"x\"</b>", false);
        let safe_ph = stash.store("&hellip;", true);
        let root = root_with(vec![Node::new("p").with_text(format!("{unsafe_ph} and{safe_ph}"))]);
        assert_eq!(
            to_html(&root, &stash),
            "<p>&lt;b&gt;&quot;x&quot;&lt;/b&gt; and&hellip;</p>"
        );
    }

    #[test]
    fn block_placeholder_is_unwrapped() {
        let mut stash = ContentStash::new();
        let ph = stash.store("<pre><code>x\n</code></pre>", true);
        let inline_ph = stash.store("<span>y</span>", true);
        let root = root_with(vec![
            Node::new("p").with_text(ph),
            Node::new("p").with_text(inline_ph),
        ]);
        assert_eq!(
            to_html(&root, &stash),
            "<pre><code>x\n</code></pre>\n<p><span>y</span></p>"
        );
    }

    #[test]
    fn block_html_detection() {
        assert!(is_block_html("<div class=\"x\">"));
        assert!(is_block_html("<!-- comment -->"));
        assert!(!is_block_html("<span>"));
        assert!(!is_block_html("plain"));
    }
}
