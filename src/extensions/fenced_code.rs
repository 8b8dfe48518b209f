//! Fenced code blocks.
//!
//! ````text
//! ```rust
//! let x = 1;
//! ```
//! ````
//!
//! A fence is three or more backticks or tildes; the block ends at the next
//! line holding exactly the same fence. The rendered `<pre><code>` is stored
//! as safe content and the block is replaced by its placeholder, alone in
//! its own chunk. An unclosed fence is left as ordinary text.

use crate::engine::Engine;
use crate::error::{BoxError, MarkupError};
use crate::extensions::Extension;
use crate::pipeline::serialize::escape_raw;
use crate::pipeline::stage::Preprocessor;
use crate::pipeline::ConversionContext;
use crate::registry::Location;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

static RE_FENCE_OPEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<fence>`{3,}|~{3,})[ ]*\{?\.?(?P<lang>[A-Za-z0-9_+-]*)\}?[ ]*$").unwrap()
});

pub struct FencedCodeExtension;

impl Extension for FencedCodeExtension {
    fn name(&self) -> &'static str {
        "fenced_code"
    }

    fn extend(&self, engine: &mut Engine) -> Result<(), MarkupError> {
        engine
            .preprocessors_mut()
            .add("fenced_code_block", Box::new(FencedBlockPreprocessor), Location::Begin)
    }
}

pub struct FencedBlockPreprocessor;

impl Preprocessor for FencedBlockPreprocessor {
    fn run(&self, mut lines: Vec<String>, ctx: &mut ConversionContext) -> Result<Vec<String>, BoxError> {
        let mut out = Vec::with_capacity(lines.len());
        let mut i = 0;
        while i < lines.len() {
            let open = RE_FENCE_OPEN
                .captures(&lines[i])
                .map(|caps| (caps["fence"].to_string(), caps["lang"].to_string()));
            if let Some((fence, lang)) = open {
                let close = lines[i + 1..]
                    .iter()
                    .position(|l| l.trim_end_matches(' ') == fence);
                if let Some(len) = close {
                    let html = render_block(&lang, &lines[i + 1..i + 1 + len]);
                    trace!(lang = %lang, lines = len, "fenced block");
                    out.push(String::new());
                    out.push(ctx.stash.store(html, true));
                    out.push(String::new());
                    i += len + 2;
                    continue;
                }
            }
            out.push(std::mem::take(&mut lines[i]));
            i += 1;
        }
        Ok(out)
    }
}

fn render_block(lang: &str, code: &[String]) -> String {
    let mut body = String::new();
    for line in code {
        body.push_str(&escape_raw(line));
        body.push('\n');
    }
    if lang.is_empty() {
        format!("<pre><code>{body}</code></pre>")
    } else {
        format!("<pre><code class=\"language-{lang}\">{body}</code></pre>")
    }
}
