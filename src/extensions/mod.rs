//! Optional syntax extensions.
//!
//! An extension is a bundle of stages registered into an [`Engine`]'s
//! registries at chosen locations. Registration is explicit: an engine only
//! carries what [`Engine::register`] (or [`Engine::from_config`]) added.
//!
//! | extension       | kind       | stage name          | location                        |
//! |-----------------|------------|---------------------|---------------------------------|
//! | `fenced_code`   | preprocess | `fenced_code_block` | `_begin`                        |
//! | `comments`      | preprocess | `comments`          | `>fenced_code_block` / `_begin` |
//! | `align`         | block      | `align`             | `_begin`                        |
//! | `mathjax`       | inline     | `mathjax`           | `<escape`                       |
//! |                 | block      | `mathjax`           | `>empty`                        |
//! | `ping`          | inline     | `ping`              | `<not_strong`                   |
//! | `emoticons`     | inline     | `emoticons`         | `<linebreak`                    |
//! | `kbd`           | inline     | `kbd`               | `<not_strong`                   |
//! | `header_offset` | block      | `hashheader`        | replaced in place               |
//! |                 | tree       | `header_offset`     | `_end`                          |
//! | `typography`    | tree       | `typography`        | `_end`                          |
//! | `toc`           | tree       | `toc`               | `>header_offset` / `_end`       |

pub mod align;
pub mod comments;
pub mod emoticons;
pub mod fenced_code;
pub mod header_offset;
pub mod kbd;
pub mod mathjax;
pub mod ping;
pub mod toc;
pub mod typography;

use crate::config::ExtensionConfig;
use crate::engine::Engine;
use crate::error::MarkupError;

pub use align::AlignExtension;
pub use comments::CommentsExtension;
pub use emoticons::EmoticonsExtension;
pub use fenced_code::FencedCodeExtension;
pub use header_offset::HeaderOffsetExtension;
pub use kbd::KbdExtension;
pub use mathjax::MathJaxExtension;
pub use ping::{PingExtension, PingResolver};
pub use toc::TocExtension;
pub use typography::TypographyExtension;

/// A bundle of stages.
pub trait Extension {
    fn name(&self) -> &'static str;

    /// Register this extension's stages into `engine`.
    fn extend(&self, engine: &mut Engine) -> Result<(), MarkupError>;
}

/// Instantiate the extension a descriptor names.
pub fn build(config: &ExtensionConfig) -> Result<Box<dyn Extension>, MarkupError> {
    Ok(match config {
        ExtensionConfig::FencedCode => Box::new(FencedCodeExtension),
        ExtensionConfig::Comments { start_tag, end_tag } => {
            Box::new(CommentsExtension::new(start_tag, end_tag))
        }
        ExtensionConfig::Align => Box::new(AlignExtension),
        ExtensionConfig::MathJax => Box::new(MathJaxExtension),
        ExtensionConfig::Ping {
            url_template,
            members,
        } => Box::new(PingExtension::from_template(url_template, members.clone())),
        ExtensionConfig::Emoticons { emoticons } => {
            Box::new(EmoticonsExtension::new(emoticons.clone()))
        }
        ExtensionConfig::Kbd => Box::new(KbdExtension),
        ExtensionConfig::HeaderOffset { offset } => {
            Box::new(HeaderOffsetExtension::new(usize::from(*offset))?)
        }
        ExtensionConfig::Typography { options } => Box::new(TypographyExtension::new(*options)),
        ExtensionConfig::Toc => Box::new(TocExtension),
    })
}
