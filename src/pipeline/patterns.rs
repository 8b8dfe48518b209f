//! Core inline patterns.
//!
//! Registered in this order, which also breaks ties between patterns
//! matching at the same offset:
//!
//! `backtick`, `escape`, `link`, `autolink`, `linebreak`, `not_strong`,
//! `strong`, `emphasis`, `emphasis2`.

use crate::error::{BoxError, MarkupError};
use crate::node::{Node, Text};
use crate::pipeline::stage::{InlineMatch, InlinePattern, Replacement};
use crate::pipeline::ConversionContext;
use crate::registry::{Location, OrderedRegistry};
use once_cell::sync::Lazy;
use regex::Regex;

static RE_BACKTICK: Lazy<Regex> = Lazy::new(|| Regex::new(r"``(.+?)``|`([^`\n]+)`").unwrap());
static RE_ESCAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\(.)").unwrap());
static RE_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\[([^\]]+)\]\(\s*<?([^)\s>]*)>?(?:\s+"([^"]*)")?\s*\)"#).unwrap()
});
static RE_AUTOLINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<((?:[Ff]|[Hh][Tt])[Tt][Pp][Ss]?://[^>]*)>").unwrap()
});
static RE_LINEBREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"  \n").unwrap());
static RE_NOT_STRONG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:^| )[*_](?: |$)").unwrap());
static RE_STRONG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*|__(.+?)__").unwrap());
static RE_EMPHASIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*]+)\*").unwrap());
static RE_SMART_EMPHASIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"_([^_]|[^_].*?[^_])_").unwrap());

/// Characters a backslash turns into literals.
pub const ESCAPED_CHARS: &str = "\\`*_{}[]()>#+-.!";

/// Register the core inline patterns in their canonical order.
pub fn register_core(reg: &mut OrderedRegistry<Box<dyn InlinePattern>>) -> Result<(), MarkupError> {
    reg.add("backtick", Box::new(BacktickPattern), Location::End)?;
    reg.add("escape", Box::new(EscapePattern::new()), Location::End)?;
    reg.add("link", Box::new(LinkPattern), Location::End)?;
    reg.add("autolink", Box::new(AutolinkPattern), Location::End)?;
    reg.add("linebreak", Box::new(LineBreakPattern), Location::End)?;
    reg.add("not_strong", Box::new(NotStrongPattern), Location::End)?;
    reg.add("strong", Box::new(SimpleTagPattern::strong()), Location::End)?;
    reg.add("emphasis", Box::new(SimpleTagPattern::emphasis()), Location::End)?;
    reg.add("emphasis2", Box::new(SmartEmphasisPattern), Location::End)?;
    Ok(())
}

fn first_group<'h>(m: &InlineMatch<'h>, groups: &[usize]) -> Option<&'h str> {
    groups.iter().find_map(|&g| m.group(g))
}

// ── Code spans ───────────────────────────────────────────────────────────────

/// `` `code` `` and ``` ``code`` ```; the content is protected.
pub struct BacktickPattern;

impl InlinePattern for BacktickPattern {
    fn regex(&self) -> &Regex {
        &RE_BACKTICK
    }

    fn accepts(&self, m: &InlineMatch<'_>) -> bool {
        m.char_before() != Some('\\')
    }

    fn handle_match(&self, m: &InlineMatch<'_>, _ctx: &mut ConversionContext) -> Result<Option<Replacement>, BoxError> {
        Ok(first_group(m, &[1, 2]).map(|code| {
            Replacement::Node(Node::new("code").with_text(Text::protected(code.trim())))
        }))
    }
}

// ── Backslash escapes ────────────────────────────────────────────────────────

/// `\*` and friends become a protected literal character.
pub struct EscapePattern {
    chars: String,
}

impl EscapePattern {
    pub fn new() -> Self {
        Self::with_chars(ESCAPED_CHARS)
    }

    pub fn with_chars(chars: impl Into<String>) -> Self {
        Self { chars: chars.into() }
    }

    /// The default set plus `extra`.
    pub fn extended(extra: &str) -> Self {
        Self::with_chars(format!("{ESCAPED_CHARS}{extra}"))
    }

    pub fn chars(&self) -> &str {
        &self.chars
    }
}

impl Default for EscapePattern {
    fn default() -> Self {
        Self::new()
    }
}

impl InlinePattern for EscapePattern {
    fn regex(&self) -> &Regex {
        &RE_ESCAPE
    }

    fn handle_match(&self, m: &InlineMatch<'_>, _ctx: &mut ConversionContext) -> Result<Option<Replacement>, BoxError> {
        Ok(m.group(1)
            .filter(|c| self.chars.contains(c))
            .map(Replacement::protected))
    }
}

// ── Links ────────────────────────────────────────────────────────────────────

/// `[text](url "title")`.
pub struct LinkPattern;

impl InlinePattern for LinkPattern {
    fn regex(&self) -> &Regex {
        &RE_LINK
    }

    fn handle_match(&self, m: &InlineMatch<'_>, _ctx: &mut ConversionContext) -> Result<Option<Replacement>, BoxError> {
        let (Some(text), Some(href)) = (m.group(1), m.group(2)) else {
            return Ok(None);
        };
        let mut link = Node::new("a").with_attr("href", href).with_text(text);
        if let Some(title) = m.group(3) {
            link.set("title", title);
        }
        Ok(Some(Replacement::Node(link)))
    }
}

/// `<http://example.com>`.
pub struct AutolinkPattern;

impl InlinePattern for AutolinkPattern {
    fn regex(&self) -> &Regex {
        &RE_AUTOLINK
    }

    fn handle_match(&self, m: &InlineMatch<'_>, _ctx: &mut ConversionContext) -> Result<Option<Replacement>, BoxError> {
        Ok(m.group(1).map(|url| {
            Replacement::Node(
                Node::new("a")
                    .with_attr("href", url)
                    .with_text(Text::protected(url)),
            )
        }))
    }
}

// ── Line breaks ──────────────────────────────────────────────────────────────

/// Two trailing spaces force a `br`.
pub struct LineBreakPattern;

impl InlinePattern for LineBreakPattern {
    fn regex(&self) -> &Regex {
        &RE_LINEBREAK
    }

    fn handle_match(&self, _m: &InlineMatch<'_>, _ctx: &mut ConversionContext) -> Result<Option<Replacement>, BoxError> {
        Ok(Some(Replacement::Node(Node::new("br"))))
    }
}

// ── Emphasis ─────────────────────────────────────────────────────────────────

/// A lone `*` or `_` between spaces stays literal.
pub struct NotStrongPattern;

impl InlinePattern for NotStrongPattern {
    fn regex(&self) -> &Regex {
        &RE_NOT_STRONG
    }

    fn handle_match(&self, m: &InlineMatch<'_>, _ctx: &mut ConversionContext) -> Result<Option<Replacement>, BoxError> {
        Ok(Some(Replacement::protected(m.as_str())))
    }
}

/// Wraps the first participating group of a regex in a tag.
pub struct SimpleTagPattern {
    regex: &'static Lazy<Regex>,
    tag: &'static str,
    groups: &'static [usize],
}

impl SimpleTagPattern {
    /// `**strong**` and `__strong__`.
    pub fn strong() -> Self {
        Self {
            regex: &RE_STRONG,
            tag: "strong",
            groups: &[1, 2],
        }
    }

    /// `*em*`.
    pub fn emphasis() -> Self {
        Self {
            regex: &RE_EMPHASIS,
            tag: "em",
            groups: &[1],
        }
    }
}

impl InlinePattern for SimpleTagPattern {
    fn regex(&self) -> &Regex {
        self.regex
    }

    fn handle_match(&self, m: &InlineMatch<'_>, _ctx: &mut ConversionContext) -> Result<Option<Replacement>, BoxError> {
        Ok(first_group(m, self.groups).map(|text| Replacement::Node(Node::new(self.tag).with_text(text))))
    }
}

/// `_em_`, only at word boundaries so `snake_case_names` stay intact.
pub struct SmartEmphasisPattern;

impl InlinePattern for SmartEmphasisPattern {
    fn regex(&self) -> &Regex {
        &RE_SMART_EMPHASIS
    }

    fn accepts(&self, m: &InlineMatch<'_>) -> bool {
        let is_word = |c: char| c.is_alphanumeric() || c == '_';
        !m.char_before().is_some_and(is_word) && !m.char_after().is_some_and(is_word)
    }

    fn handle_match(&self, m: &InlineMatch<'_>, _ctx: &mut ConversionContext) -> Result<Option<Replacement>, BoxError> {
        Ok(m.group(1).map(|text| Replacement::Node(Node::new("em").with_text(text))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::inline::InlineProcessor;

    fn run(text: &str) -> Node {
        let mut reg: OrderedRegistry<Box<dyn InlinePattern>> = OrderedRegistry::new();
        register_core(&mut reg).unwrap();
        let mut p = Node::new("p").with_text(text);
        InlineProcessor::new(&reg)
            .run(&mut p, &mut ConversionContext::new())
            .unwrap();
        p
    }

    fn tags(node: &Node) -> Vec<&str> {
        node.children.iter().map(|c| c.tag.as_str()).collect()
    }

    #[test]
    fn core_order() {
        let mut reg: OrderedRegistry<Box<dyn InlinePattern>> = OrderedRegistry::new();
        register_core(&mut reg).unwrap();
        assert_eq!(
            reg.names().collect::<Vec<_>>(),
            [
                "backtick",
                "escape",
                "link",
                "autolink",
                "linebreak",
                "not_strong",
                "strong",
                "emphasis",
                "emphasis2"
            ]
        );
    }

    #[test]
    fn code_span_is_protected() {
        let p = run("use `*ptr*` here");
        assert_eq!(tags(&p), ["code"]);
        assert!(p.children[0].text.as_ref().unwrap().is_protected());
        assert_eq!(p.children[0].text_content(), "*ptr*");
    }

    #[test]
    fn escaped_backtick_is_not_code() {
        let p = run(r"\`not code`");
        assert!(tags(&p).is_empty());
        assert_eq!(p.text_content(), "`not code`");
    }

    #[test]
    fn unknown_escape_stays_literal() {
        assert_eq!(run(r"a\qb").text_content(), r"a\qb");
        assert_eq!(run(r"a\*b").text_content(), "a*b");
    }

    #[test]
    fn link_with_nested_emphasis() {
        let p = run(r#"see [the *docs*](/help "Help") now"#);
        let link = &p.children[0];
        assert_eq!(link.tag, "a");
        assert_eq!(link.get("href"), Some("/help"));
        assert_eq!(link.get("title"), Some("Help"));
        assert_eq!(tags(link), ["em"]);
    }

    #[test]
    fn autolink() {
        let p = run("go <https://example.com/x>");
        assert_eq!(p.children[0].get("href"), Some("https://example.com/x"));
    }

    #[test]
    fn strong_and_emphasis() {
        let p = run("**bold** and *it* and __also__");
        assert_eq!(tags(&p), ["strong", "em", "strong"]);
    }

    #[test]
    fn lone_star_is_literal() {
        let p = run("2 * 3 *is* six");
        assert_eq!(tags(&p), ["em"]);
        assert_eq!(p.text.as_ref().unwrap().as_string(), "2 * 3 ");
    }

    #[test]
    fn smart_emphasis_skips_identifiers() {
        assert!(tags(&run("snake_case_name")).is_empty());
        assert_eq!(tags(&run("an _em_ word")), ["em"]);
    }

    #[test]
    fn line_break() {
        let p = run("one  \ntwo");
        assert_eq!(tags(&p), ["br"]);
        assert_eq!(p.children[0].tail.as_ref().unwrap().as_string(), "two");
    }
}
