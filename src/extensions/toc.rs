//! Heading anchors and a table of contents.
//!
//! Every `h1`..`h6` gets an `id` slug, unique within the document, unless it
//! already carries one. The headings are recorded in document order under
//! the `toc` metadata key as `{level, id, title}` objects.

use crate::engine::Engine;
use crate::error::{BoxError, MarkupError};
use crate::extensions::header_offset::heading_level;
use crate::extensions::Extension;
use crate::metadata::Metadata;
use crate::node::Node;
use crate::pipeline::stage::TreeProcessor;
use crate::pipeline::ConversionContext;
use crate::registry::Location;
use serde_json::json;
use std::collections::HashSet;

/// Metadata key holding the heading records.
pub const TOC_KEY: &str = "toc";

pub struct TocExtension;

impl Extension for TocExtension {
    fn name(&self) -> &'static str {
        "toc"
    }

    fn extend(&self, engine: &mut Engine) -> Result<(), MarkupError> {
        // Levels are final once header_offset has run.
        let location = if engine.tree_processors().contains("header_offset") {
            Location::after("header_offset")
        } else {
            Location::End
        };
        engine
            .tree_processors_mut()
            .add("toc", Box::new(TocProcessor), location)
    }
}

pub struct TocProcessor;

impl TreeProcessor for TocProcessor {
    fn run(&self, mut root: Node, ctx: &mut ConversionContext) -> Result<Node, BoxError> {
        let paths = root.paths();
        let mut used: HashSet<String> = paths
            .iter()
            .filter_map(|p| root.at_path(p))
            .filter(|n| heading_level(&n.tag).is_some())
            .filter_map(|n| n.get("id").map(str::to_string))
            .collect();

        for path in paths {
            let Some(node) = root.at_path_mut(&path) else {
                continue;
            };
            let Some(level) = heading_level(&node.tag) else {
                continue;
            };
            let resolved = ctx.stash.resolve(&node.text_content(), |s| s.to_string());
            let title = html_escape::decode_html_entities(&resolved).into_owned();
            let id = match node.get("id") {
                Some(id) => id.to_string(),
                None => {
                    let id = unique_slug(&title, &mut used);
                    node.set("id", id.as_str());
                    id
                }
            };
            ctx.metadata.push(
                TOC_KEY,
                json!({ "level": level, "id": id, "title": title.trim() }),
            );
        }
        Ok(root)
    }

    fn reset(&mut self, metadata: &mut Metadata) {
        metadata.reset_key(TOC_KEY, json!([]));
    }
}

/// Lower-case alphanumerics, with runs of anything else collapsed to `-`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("section");
    }
    slug
}

fn unique_slug(title: &str, used: &mut HashSet<String>) -> String {
    let base = slugify(title);
    let mut candidate = base.clone();
    let mut n = 1;
    while used.contains(&candidate) {
        candidate = format!("{base}-{n}");
        n += 1;
    }
    used.insert(candidate.clone());
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TypographyOptions;
    use crate::extensions::{HeaderOffsetExtension, TypographyExtension};

    #[test]
    fn slugs() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Été 2024  "), "été-2024");
        assert_eq!(slugify("***"), "section");
    }

    #[test]
    fn anchors_and_records() {
        let mut engine = Engine::new().unwrap();
        engine.register(&TocExtension).unwrap();
        let out = engine
            .convert("# Intro\n\ntext\n\n## Usage *now*\n\n# Intro\n")
            .unwrap();
        assert_eq!(
            out.html,
            "<h1 id=\"intro\">Intro</h1>\n<p>text</p>\n\
             <h2 id=\"usage-now\">Usage <em>now</em></h2>\n<h1 id=\"intro-1\">Intro</h1>"
        );
        assert_eq!(
            out.metadata.get(TOC_KEY),
            Some(&json!([
                { "level": 1, "id": "intro", "title": "Intro" },
                { "level": 2, "id": "usage-now", "title": "Usage now" },
                { "level": 1, "id": "intro-1", "title": "Intro" },
            ]))
        );
    }

    #[test]
    fn runs_after_header_offset() {
        let mut engine = Engine::new().unwrap();
        engine.register(&HeaderOffsetExtension::new(1).unwrap()).unwrap();
        engine.register(&TocExtension).unwrap();
        let names: Vec<&str> = engine.tree_processors().names().collect();
        assert_eq!(names, ["header_offset", "toc"]);
        let out = engine.convert("# Top").unwrap();
        assert_eq!(out.html, "<h2 id=\"top\">Top</h2>");
        assert_eq!(out.metadata.get(TOC_KEY).unwrap()[0]["level"], json!(2));
    }

    #[test]
    fn titles_are_decoded_after_typography() {
        let mut engine = Engine::new().unwrap();
        engine
            .register(&TypographyExtension::new(TypographyOptions::default()))
            .unwrap();
        engine.register(&TocExtension).unwrap();
        let out = engine.convert("# C'est l'heure").unwrap();
        assert_eq!(
            out.html,
            "<h1 id=\"c-est-l-heure\">C&rsquo;est l&rsquo;heure</h1>"
        );
        assert_eq!(
            out.metadata.get(TOC_KEY),
            Some(&json!([{ "level": 1, "id": "c-est-l-heure", "title": "C\u{2019}est l\u{2019}heure" }]))
        );
    }

    #[test]
    fn records_are_reset() {
        let mut engine = Engine::new().unwrap();
        engine.register(&TocExtension).unwrap();
        engine.convert("# One").unwrap();
        let out = engine.convert("no headings").unwrap();
        assert_eq!(out.metadata.get(TOC_KEY), Some(&json!([])));
    }
}
