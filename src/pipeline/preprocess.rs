//! Source normalisation and the preprocess pipeline.
//!
//! Before any stage sees the document, [`normalize`] applies fixed rules
//! (in order):
//!
//! 1. Strip the reserved placeholder delimiters (`STX`, `ETX`)
//! 2. Normalise line endings (CRLF and lone CR → LF)
//! 3. Expand tabs to the next multiple of the tab width
//! 4. Blank out lines containing only whitespace
//!
//! The result is split into lines and handed to the registered
//! preprocessors in registry order.

use crate::error::{MarkupError, PipelineKind};
use crate::pipeline::stage::Preprocessor;
use crate::pipeline::ConversionContext;
use crate::registry::OrderedRegistry;
use crate::stash::strip_reserved;
use tracing::trace;

/// Normalise `source` and split it into lines.
pub fn normalize(source: &str, tab_length: usize) -> Vec<String> {
    let s = strip_reserved(source);
    let s = normalise_line_endings(&s);
    s.split('\n')
        .map(|line| blank_whitespace_line(expand_tabs(line, tab_length)))
        .collect()
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Expand tabs ──────────────────────────────────────────────────────

fn expand_tabs(line: &str, tab_length: usize) -> String {
    if !line.contains('\t') {
        return line.to_string();
    }
    let tab_length = tab_length.max(1);
    let mut out = String::with_capacity(line.len() + tab_length);
    let mut column = 0;
    for c in line.chars() {
        if c == '\t' {
            let pad = tab_length - column % tab_length;
            out.extend(std::iter::repeat(' ').take(pad));
            column += pad;
        } else {
            out.push(c);
            column += 1;
        }
    }
    out
}

// ── Rule 4: Blank whitespace-only lines ──────────────────────────────────────

fn blank_whitespace_line(line: String) -> String {
    if line.trim().is_empty() {
        String::new()
    } else {
        line
    }
}

// ── Pipeline ─────────────────────────────────────────────────────────────────

/// Run every registered preprocessor over `lines`, in order.
pub fn run_preprocessors(
    registry: &OrderedRegistry<Box<dyn Preprocessor>>,
    mut lines: Vec<String>,
    ctx: &mut ConversionContext,
) -> Result<Vec<String>, MarkupError> {
    for (name, stage) in registry.iter() {
        lines = stage
            .run(lines, ctx)
            .map_err(|e| MarkupError::stage(PipelineKind::Preprocess, name, e))?;
        trace!(stage = name, lines = lines.len(), "preprocessor done");
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::stash::{ETX, STX};

    #[test]
    fn crlf_and_cr_become_lf() {
        assert_eq!(normalize("a\r\nb\rc", 4), ["a", "b", "c"]);
    }

    #[test]
    fn reserved_delimiters_are_stripped() {
        let forged = format!("x{STX}zmd:0{ETX}y");
        assert_eq!(normalize(&forged, 4), ["xzmd:0y"]);
    }

    #[test]
    fn tabs_expand_to_tab_stops() {
        assert_eq!(normalize("\ta\tb", 4), ["    a   b"]);
        assert_eq!(normalize("ab\tc", 2), ["ab  c"]);
    }

    #[test]
    fn whitespace_lines_are_blanked() {
        assert_eq!(normalize("a\n  \t \nb", 4), ["a", "", "b"]);
    }

    struct Upper;

    impl Preprocessor for Upper {
        fn run(&self, lines: Vec<String>, _ctx: &mut ConversionContext) -> Result<Vec<String>, BoxError> {
            Ok(lines.into_iter().map(|l| l.to_uppercase()).collect())
        }
    }

    struct Fails;

    impl Preprocessor for Fails {
        fn run(&self, _lines: Vec<String>, _ctx: &mut ConversionContext) -> Result<Vec<String>, BoxError> {
            Err("boom".into())
        }
    }

    #[test]
    fn stages_run_in_order_and_errors_name_the_stage() {
        let mut reg: OrderedRegistry<Box<dyn Preprocessor>> = OrderedRegistry::new();
        reg.add_at("upper", Box::new(Upper), "_end").unwrap();
        let mut ctx = ConversionContext::new();
        let out = run_preprocessors(&reg, vec!["a".into()], &mut ctx).unwrap();
        assert_eq!(out, ["A"]);

        reg.add_at("fails", Box::new(Fails), "_end").unwrap();
        let err = run_preprocessors(&reg, vec!["a".into()], &mut ctx).unwrap_err();
        assert!(matches!(
            err,
            MarkupError::Stage { kind: PipelineKind::Preprocess, ref stage, .. } if stage == "fails"
        ));
    }
}
