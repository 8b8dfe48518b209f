//! `@member` mentions.
//!
//! `@name` (letters, digits, `-`, `_`) or `@[long name]`, at the start of
//! the text or after whitespace. A resolver decides whether the name can be
//! pinged and where its profile lives; unresolved names stay plain text.
//! Every pinged name is recorded once, in order, under the `ping`
//! metadata key.

use crate::engine::Engine;
use crate::error::{BoxError, MarkupError};
use crate::extensions::Extension;
use crate::metadata::Metadata;
use crate::node::{Node, Text};
use crate::pipeline::stage::{InlineMatch, InlinePattern, Replacement};
use crate::pipeline::ConversionContext;
use crate::registry::Location;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

static RE_PING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@(?:([-_\w]+)|\[([^\[\]\n]+)\])").unwrap());

/// Metadata key holding the set of pinged names.
pub const PING_KEY: &str = "ping";

/// Maps a name to its profile URL, or `None` when it cannot be pinged.
pub type PingResolver = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

pub struct PingExtension {
    resolver: PingResolver,
}

impl PingExtension {
    pub fn new(resolver: PingResolver) -> Self {
        Self { resolver }
    }

    /// Resolve through a URL template where `{}` stands for the name.
    /// With `members`, only those names resolve.
    pub fn from_template(url_template: &str, members: Option<Vec<String>>) -> Self {
        let template = url_template.to_string();
        let members: Option<HashSet<String>> = members.map(|m| m.into_iter().collect());
        Self::new(Arc::new(move |name: &str| {
            let allowed = members.as_ref().map_or(true, |m| m.contains(name));
            allowed.then(|| template.replace("{}", name))
        }))
    }
}

impl Extension for PingExtension {
    fn name(&self) -> &'static str {
        "ping"
    }

    fn extend(&self, engine: &mut Engine) -> Result<(), MarkupError> {
        engine.inline_patterns_mut().add(
            "ping",
            Box::new(PingPattern {
                resolver: Arc::clone(&self.resolver),
            }),
            Location::before("not_strong"),
        )
    }
}

pub struct PingPattern {
    resolver: PingResolver,
}

impl InlinePattern for PingPattern {
    fn regex(&self) -> &Regex {
        &RE_PING
    }

    fn accepts(&self, m: &InlineMatch<'_>) -> bool {
        m.char_before().map_or(true, char::is_whitespace)
    }

    fn handle_match(&self, m: &InlineMatch<'_>, ctx: &mut ConversionContext) -> Result<Option<Replacement>, BoxError> {
        let Some(name) = m.group(1).or(m.group(2)) else {
            return Ok(None);
        };
        let Some(url) = (self.resolver)(name) else {
            return Ok(None);
        };
        ctx.metadata.add_to_set(PING_KEY, name);
        let link = Node::new("a")
            .with_attr("class", "ping")
            .with_attr("href", url)
            .with_text(Text::protected(format!("@{name}")));
        Ok(Some(Replacement::Node(link)))
    }

    fn reset(&mut self, metadata: &mut Metadata) {
        metadata.reset_key(PING_KEY, json!([]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Engine {
        let mut engine = Engine::new().unwrap();
        engine
            .register(&PingExtension::from_template(
                "/membres/voir/{}/",
                Some(vec!["Clem".into(), "A member".into()]),
            ))
            .unwrap();
        engine
    }

    #[test]
    fn short_and_long_names() {
        let out = engine()
            .convert("Hi @Clem, and @[A member] but not @Zozor or me@Clem.")
            .unwrap();
        assert_eq!(
            out.html,
            "<p>Hi <a class=\"ping\" href=\"/membres/voir/Clem/\">@Clem</a>, and \
             <a class=\"ping\" href=\"/membres/voir/A member/\">@A member</a> \
             but not @Zozor or me@Clem.</p>"
        );
        assert_eq!(out.metadata.strings(PING_KEY), ["Clem", "A member"]);
    }

    #[test]
    fn names_are_recorded_once() {
        let out = engine().convert("@Clem @Clem\n\n@Clem").unwrap();
        assert_eq!(out.metadata.strings(PING_KEY), ["Clem"]);
    }

    #[test]
    fn key_is_present_when_nobody_is_pinged() {
        let out = engine().convert("nobody here").unwrap();
        assert_eq!(out.metadata.get(PING_KEY), Some(&json!([])));
    }

    #[test]
    fn pinged_name_is_protected_from_emphasis() {
        let out = engine().convert("@[A member] *x*").unwrap();
        assert!(out.html.contains(">@A member</a> <em>x</em>"), "got: {}", out.html);
    }
}
