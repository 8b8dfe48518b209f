//! # zmarkdown
//!
//! An extensible Markdown-to-HTML translator built from ordered, named
//! processing stages.
//!
//! ## Pipeline Overview
//!
//! ```text
//! source text
//!  │
//!  ├─ 0. Normalise   strip reserved chars, unify newlines, expand tabs
//!  ├─ 1. Preprocess  whole-document line transforms (fenced code, comments)
//!  ├─ 2. Block       chunk queue → element tree (headers, paragraphs, align)
//!  ├─ 3. Inline      regex patterns over every text and tail
//!  ├─ 4. Tree        whole-tree rewrites (header offset, typography, toc)
//!  └─ 5. Serialise   HTML, with protected content restored from the stash
//! ```
//!
//! Each pipeline is an [`OrderedRegistry`] of stages. An extension inserts
//! its stages relative to existing ones (`_begin`, `_end`, `<name`,
//! `>name`), so extensions compose without knowing about each other.
//! Stages that emit verbatim HTML put it in the [`ContentStash`] and leave
//! a placeholder in the tree, which later stages never rescan. Anything a
//! stage learns about the document (pinged members, headings) goes to the
//! [`Metadata`] channel, reset at the start of every conversion.
//!
//! ## Quick Start
//!
//! ```rust
//! use zmarkdown::{convert, EngineConfig, ExtensionConfig};
//!
//! let config = EngineConfig::builder()
//!     .extension(ExtensionConfig::Ping {
//!         url_template: "/members/{}/".into(),
//!         members: None,
//!     })
//!     .build()
//!     .unwrap();
//! let output = convert("Thanks @alice!", &config).unwrap();
//! assert_eq!(
//!     output.html,
//!     "<p>Thanks <a class=\"ping\" href=\"/members/alice/\">@alice</a>!</p>"
//! );
//! assert_eq!(output.metadata.strings("ping"), ["alice"]);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `zmd` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! zmarkdown = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod extensions;
pub mod metadata;
pub mod node;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod registry;
pub mod stash;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{EngineConfig, EngineConfigBuilder, ExtensionConfig, TypographyOptions};
pub use convert::{convert, convert_to_file};
pub use engine::Engine;
pub use error::{BoxError, MarkupError, PipelineKind};
pub use extensions::Extension;
pub use metadata::Metadata;
pub use node::{Node, Text};
pub use output::{ConversionOutput, ConversionStats};
pub use progress::{ConversionObserver, NoopObserver, Observer};
pub use registry::{Location, OrderedRegistry};
pub use stash::ContentStash;
