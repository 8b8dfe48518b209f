//! Author comments, removed before parsing.
//!
//! Everything from a start tag to the next end tag is dropped, across lines.
//! Removal repeats until no start/end pair remains, so a removal that joins
//! a new pair is handled too.

use crate::engine::Engine;
use crate::error::{BoxError, MarkupError};
use crate::extensions::Extension;
use crate::pipeline::stage::Preprocessor;
use crate::pipeline::ConversionContext;
use crate::registry::Location;
use regex::Regex;

pub struct CommentsExtension {
    start_tag: String,
    end_tag: String,
}

impl CommentsExtension {
    pub fn new(start_tag: impl Into<String>, end_tag: impl Into<String>) -> Self {
        Self {
            start_tag: start_tag.into(),
            end_tag: end_tag.into(),
        }
    }
}

impl Extension for CommentsExtension {
    fn name(&self) -> &'static str {
        "comments"
    }

    fn extend(&self, engine: &mut Engine) -> Result<(), MarkupError> {
        let stage = CommentsPreprocessor::new(&self.start_tag, &self.end_tag)?;
        // Fenced code is stashed first, so comment tags inside code survive.
        let location = if engine.preprocessors().contains("fenced_code_block") {
            Location::after("fenced_code_block")
        } else {
            Location::Begin
        };
        engine
            .preprocessors_mut()
            .add("comments", Box::new(stage), location)
    }
}

pub struct CommentsPreprocessor {
    regex: Regex,
}

impl CommentsPreprocessor {
    pub fn new(start_tag: &str, end_tag: &str) -> Result<Self, MarkupError> {
        let pattern = format!("(?s){}.*?{}", regex::escape(start_tag), regex::escape(end_tag));
        let regex = Regex::new(&pattern)
            .map_err(|e| MarkupError::InvalidConfig(format!("comment tags: {e}")))?;
        Ok(Self { regex })
    }
}

impl Preprocessor for CommentsPreprocessor {
    fn run(&self, lines: Vec<String>, _ctx: &mut ConversionContext) -> Result<Vec<String>, BoxError> {
        let mut text = lines.join("\n");
        while let Some(range) = self.regex.find(&text).map(|m| m.range()) {
            text.replace_range(range, "");
        }
        Ok(text.split('\n').map(str::to_string).collect())
    }
}
