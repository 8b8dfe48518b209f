//! Emoticons: `:)` → `<img src="smile.png" alt=":)">`.
//!
//! A symbol only matches between whitespace (or the text edges), so `:)`
//! inside `f(:))` is left alone. Longer symbols win over their prefixes.

use crate::engine::Engine;
use crate::error::{BoxError, MarkupError};
use crate::extensions::Extension;
use crate::node::Node;
use crate::pipeline::stage::{InlineMatch, InlinePattern, Replacement};
use crate::pipeline::ConversionContext;
use crate::registry::Location;
use regex::Regex;
use std::collections::BTreeMap;

pub struct EmoticonsExtension {
    emoticons: BTreeMap<String, String>,
}

impl EmoticonsExtension {
    pub fn new(emoticons: BTreeMap<String, String>) -> Self {
        Self { emoticons }
    }
}

impl Extension for EmoticonsExtension {
    fn name(&self) -> &'static str {
        "emoticons"
    }

    fn extend(&self, engine: &mut Engine) -> Result<(), MarkupError> {
        if self.emoticons.is_empty() {
            return Ok(());
        }
        let pattern = EmoticonPattern::new(self.emoticons.clone())?;
        engine
            .inline_patterns_mut()
            .add("emoticons", Box::new(pattern), Location::before("linebreak"))
    }
}

pub struct EmoticonPattern {
    regex: Regex,
    emoticons: BTreeMap<String, String>,
}

impl EmoticonPattern {
    pub fn new(emoticons: BTreeMap<String, String>) -> Result<Self, MarkupError> {
        let mut symbols: Vec<&str> = emoticons.keys().map(String::as_str).collect();
        symbols.sort_by_key(|s| std::cmp::Reverse(s.len()));
        let alternation = symbols
            .iter()
            .map(|s| regex::escape(s))
            .collect::<Vec<_>>()
            .join("|");
        let regex = Regex::new(&format!("(?:{alternation})"))
            .map_err(|e| MarkupError::InvalidConfig(format!("emoticons: {e}")))?;
        Ok(Self { regex, emoticons })
    }
}

impl InlinePattern for EmoticonPattern {
    fn regex(&self) -> &Regex {
        &self.regex
    }

    fn accepts(&self, m: &InlineMatch<'_>) -> bool {
        m.char_before().map_or(true, char::is_whitespace)
            && m.char_after().map_or(true, char::is_whitespace)
    }

    fn handle_match(&self, m: &InlineMatch<'_>, _ctx: &mut ConversionContext) -> Result<Option<Replacement>, BoxError> {
        Ok(self.emoticons.get(m.as_str()).map(|src| {
            Replacement::Node(
                Node::new("img")
                    .with_attr("src", src.as_str())
                    .with_attr("alt", m.as_str()),
            )
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(source: &str) -> String {
        let mut engine = Engine::new().unwrap();
        engine
            .register(&EmoticonsExtension::new(BTreeMap::from([
                (":)".to_string(), "/smile.png".to_string()),
                (":))".to_string(), "/laugh.png".to_string()),
            ])))
            .unwrap();
        engine.convert(source).unwrap().html
    }

    #[test]
    fn whitespace_delimited() {
        assert_eq!(
            convert(":) hello :)) f(:))"),
            "<p><img src=\"/smile.png\" alt=\":)\"> hello <img src=\"/laugh.png\" alt=\":))\"> f(:))</p>"
        );
    }

    #[test]
    fn empty_map_registers_nothing() {
        let mut engine = Engine::new().unwrap();
        engine.register(&EmoticonsExtension::new(BTreeMap::new())).unwrap();
        assert!(!engine.inline_patterns().contains("emoticons"));
    }
}
