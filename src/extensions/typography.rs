//! French typography.
//!
//! Runs after the main inline pass as a tree stage with its own ordered set
//! of substitutions. Each substitution is an HTML entity sequence, stored in
//! the content stash as safe so the serializer does not escape it. Code
//! spans, escapes and every other protected text are left alone, and a
//! backslash in front of any trigger character keeps it literal.

use crate::config::TypographyOptions;
use crate::engine::Engine;
use crate::error::{BoxError, MarkupError};
use crate::extensions::Extension;
use crate::node::Node;
use crate::pipeline::inline::InlineProcessor;
use crate::pipeline::patterns::EscapePattern;
use crate::pipeline::stage::{InlineMatch, InlinePattern, Replacement, TreeProcessor};
use crate::pipeline::ConversionContext;
use crate::registry::{Location, OrderedRegistry};
use regex::Regex;

/// Characters that become escapable once typography is on.
const TYPOGRAPHY_ESCAPES: &str = "'<%«»";

pub struct TypographyExtension {
    options: TypographyOptions,
}

impl TypographyExtension {
    pub fn new(options: TypographyOptions) -> Self {
        Self { options }
    }

    /// The substitution registry for these options.
    pub fn substitutions(&self) -> Result<OrderedRegistry<Box<dyn InlinePattern>>, MarkupError> {
        let o = &self.options;
        let mut reg: OrderedRegistry<Box<dyn InlinePattern>> = OrderedRegistry::new();
        if o.apostrophes {
            add(&mut reg, "apostrophes", Substitution::literal("'", "&rsquo;")?, Location::Begin)?;
        }
        if o.em_dashes {
            add(&mut reg, "em_dashes", Substitution::literal("---", "&mdash;")?.isolated('-'), Location::Begin)?;
        }
        if o.en_dashes {
            add(&mut reg, "en_dashes", Substitution::literal("--", "&ndash;")?.isolated('-'), Location::Begin)?;
        }
        if o.spaces {
            // Each one goes in front of the previous, so the chain ends up
            // reversed at the tail of the registry.
            let chain = [
                ("space_semicolon", " ; ", "&nbsp;; "),
                ("space_colon", " : ", "&nbsp;: "),
                ("space_question", " ?", "&nbsp;?"),
                ("space_exclamation", " !", "&nbsp;!"),
                ("space_percent", " %", "&nbsp;%"),
                ("space_permille", " ‰", "&nbsp;&permil;"),
                ("space_guillemet_open", "« ", "&laquo;&nbsp;"),
                ("space_guillemet_close", " »", "&nbsp;&raquo;"),
            ];
            let mut previous: Option<&str> = None;
            for (name, from, to) in chain {
                let at = previous.map_or(Location::End, Location::before);
                add(&mut reg, name, Substitution::literal(from, to)?, at)?;
                previous = Some(name);
            }
        }
        if o.guillemets {
            let (open, close) = if o.spaces {
                (
                    Substitution::literal("<< ", "&laquo;&nbsp;")?,
                    Substitution::literal(" >>", "&nbsp;&raquo;")?,
                )
            } else {
                (
                    Substitution::literal("<<", "&laquo;")?,
                    Substitution::literal(">>", "&raquo;")?,
                )
            };
            add(&mut reg, "guillemets_open", open, Location::Begin)?;
            add(&mut reg, "guillemets_close", close, Location::after("guillemets_open"))?;
        }
        if o.permille {
            let sub = if o.spaces {
                Substitution::literal(" %o", "&nbsp;&permil;")?
            } else {
                Substitution::literal("%o", "&permil;")?
            };
            add(&mut reg, "permille", sub, Location::Begin)?;
        }
        if o.ellipsis {
            add(&mut reg, "ellipsis", Substitution::literal("...", "&hellip;")?.isolated('.'), Location::Begin)?;
        }
        Ok(reg)
    }
}

fn add(
    reg: &mut OrderedRegistry<Box<dyn InlinePattern>>,
    name: &str,
    sub: Substitution,
    at: Location,
) -> Result<(), MarkupError> {
    reg.add(name, Box::new(sub), at)
}

impl Extension for TypographyExtension {
    fn name(&self) -> &'static str {
        "typography"
    }

    fn extend(&self, engine: &mut Engine) -> Result<(), MarkupError> {
        if engine.inline_patterns().contains("escape") {
            engine
                .inline_patterns_mut()
                .replace("escape", Box::new(EscapePattern::extended(TYPOGRAPHY_ESCAPES)))?;
        }
        let processor = TypographyProcessor {
            substitutions: self.substitutions()?,
        };
        engine
            .tree_processors_mut()
            .add("typography", Box::new(processor), Location::End)
    }
}

/// Fixed text replaced by an entity sequence.
pub struct Substitution {
    regex: Regex,
    replacement: &'static str,
    /// Reject the match when this character touches either side.
    isolated: Option<char>,
}

impl Substitution {
    pub fn literal(from: &str, replacement: &'static str) -> Result<Self, MarkupError> {
        let regex = Regex::new(&regex::escape(from))
            .map_err(|e| MarkupError::InvalidConfig(format!("typography: {e}")))?;
        Ok(Self {
            regex,
            replacement,
            isolated: None,
        })
    }

    pub fn isolated(mut self, c: char) -> Self {
        self.isolated = Some(c);
        self
    }
}

impl InlinePattern for Substitution {
    fn regex(&self) -> &Regex {
        &self.regex
    }

    fn accepts(&self, m: &InlineMatch<'_>) -> bool {
        match self.isolated {
            Some(c) => m.char_before() != Some(c) && m.char_after() != Some(c),
            None => true,
        }
    }

    fn handle_match(&self, _m: &InlineMatch<'_>, ctx: &mut ConversionContext) -> Result<Option<Replacement>, BoxError> {
        let placeholder = ctx.stash.store(self.replacement, true);
        Ok(Some(Replacement::protected(placeholder)))
    }
}

pub struct TypographyProcessor {
    substitutions: OrderedRegistry<Box<dyn InlinePattern>>,
}

impl TreeProcessor for TypographyProcessor {
    fn run(&self, mut root: Node, ctx: &mut ConversionContext) -> Result<Node, BoxError> {
        InlineProcessor::new(&self.substitutions).run(&mut root, ctx)?;
        Ok(root)
    }
}
