//! Keyboard keys: `||Ctrl||` → `<kbd>Ctrl</kbd>`.

use crate::engine::Engine;
use crate::error::{BoxError, MarkupError};
use crate::extensions::Extension;
use crate::node::Node;
use crate::pipeline::stage::{InlineMatch, InlinePattern, Replacement};
use crate::pipeline::ConversionContext;
use crate::registry::Location;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_KBD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\|\|(.+?)\|\|").unwrap());

pub struct KbdExtension;

impl Extension for KbdExtension {
    fn name(&self) -> &'static str {
        "kbd"
    }

    fn extend(&self, engine: &mut Engine) -> Result<(), MarkupError> {
        engine
            .inline_patterns_mut()
            .add("kbd", Box::new(KbdPattern), Location::before("not_strong"))
    }
}

pub struct KbdPattern;

impl InlinePattern for KbdPattern {
    fn regex(&self) -> &Regex {
        &RE_KBD
    }

    fn handle_match(&self, m: &InlineMatch<'_>, _ctx: &mut ConversionContext) -> Result<Option<Replacement>, BoxError> {
        Ok(m.group(1).map(|key| Replacement::Node(Node::new("kbd").with_text(key))))
    }
}
