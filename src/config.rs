//! Engine configuration.
//!
//! An engine is described by [`EngineConfig`]: the list of extensions to
//! register (in order), whether it runs in inline mode, and the tab width
//! used by normalisation. Build one via [`EngineConfig::builder()`], start
//! from a preset such as [`EngineConfig::zds`], or deserialise one from
//! JSON:
//!
//! ```json
//! {
//!   "inline": false,
//!   "extensions": [
//!     { "name": "fenced_code" },
//!     { "name": "ping", "url_template": "/members/{}/" },
//!     { "name": "header_offset", "offset": 1 }
//!   ]
//! }
//! ```
//!
//! Missing fields take the same defaults as the builder.

use crate::error::MarkupError;
use crate::progress::Observer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Configuration for an [`crate::Engine`].
///
/// # Example
/// ```rust
/// use zmarkdown::{EngineConfig, ExtensionConfig};
///
/// let config = EngineConfig::builder()
///     .extension(ExtensionConfig::Align)
///     .extension(ExtensionConfig::HeaderOffset { offset: 1 })
///     .build()
///     .unwrap();
/// assert_eq!(config.extensions.len(), 2);
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Extensions, registered in list order. Default: none.
    pub extensions: Vec<ExtensionConfig>,

    /// Inline mode: only extensions that make sense inside a single line of
    /// text are registered, and the `link` and `linebreak` inline stages are
    /// removed. Default: false.
    pub inline: bool,

    /// Tab stop width used when expanding tabs. Range: 1–16. Default: 4.
    pub tab_length: usize,

    /// Conversion event observer. Not serialised.
    #[serde(skip)]
    pub observer: Option<Observer>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            extensions: Vec::new(),
            inline: false,
            tab_length: 4,
            observer: None,
        }
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("extensions", &self.extensions)
            .field("inline", &self.inline)
            .field("tab_length", &self.tab_length)
            .field(
                "observer",
                &self.observer.as_ref().map(|_| "<dyn ConversionObserver>"),
            )
            .finish()
    }
}

impl EngineConfig {
    /// Create a new builder for `EngineConfig`.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder {
            config: Self::default(),
        }
    }

    /// The extension bundle used for community content: every extension
    /// with its community defaults, headings shifted down two levels.
    pub fn zds(inline: bool) -> Self {
        Self {
            extensions: vec![
                ExtensionConfig::Ping {
                    url_template: default_ping_url(),
                    members: None,
                },
                ExtensionConfig::Typography {
                    options: TypographyOptions::default(),
                },
                ExtensionConfig::Kbd,
                ExtensionConfig::Emoticons {
                    emoticons: default_emoticons(),
                },
                ExtensionConfig::Align,
                ExtensionConfig::HeaderOffset { offset: 2 },
                ExtensionConfig::MathJax,
                ExtensionConfig::FencedCode,
                ExtensionConfig::Comments {
                    start_tag: "<--COMMENT".into(),
                    end_tag: "COMMENT-->".into(),
                },
            ],
            inline,
            ..Self::default()
        }
    }

    /// Parse a JSON configuration and validate it.
    pub fn from_json(json: &str) -> Result<Self, MarkupError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| MarkupError::InvalidConfig(format!("bad configuration JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every constraint the builder enforces.
    pub fn validate(&self) -> Result<(), MarkupError> {
        if !(1..=16).contains(&self.tab_length) {
            return Err(MarkupError::InvalidConfig(format!(
                "tab_length must be 1–16, got {}",
                self.tab_length
            )));
        }
        let mut seen = HashSet::new();
        for ext in &self.extensions {
            if !seen.insert(ext.name()) {
                return Err(MarkupError::InvalidConfig(format!(
                    "extension '{}' listed twice",
                    ext.name()
                )));
            }
            ext.validate()?;
        }
        Ok(())
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn extension(mut self, ext: ExtensionConfig) -> Self {
        self.config.extensions.push(ext);
        self
    }

    pub fn extensions(mut self, exts: impl IntoIterator<Item = ExtensionConfig>) -> Self {
        self.config.extensions.extend(exts);
        self
    }

    pub fn inline(mut self, v: bool) -> Self {
        self.config.inline = v;
        self
    }

    pub fn tab_length(mut self, n: usize) -> Self {
        self.config.tab_length = n;
        self
    }

    pub fn observer(mut self, observer: Observer) -> Self {
        self.config.observer = Some(observer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<EngineConfig, MarkupError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ── Extension descriptors ────────────────────────────────────────────────

/// One extension and its options, tagged by `name` in serialised form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum ExtensionConfig {
    /// Fenced code blocks (```` ``` ```` or `~~~`).
    FencedCode,
    /// Strip text between two tags.
    Comments {
        #[serde(default = "default_comment_start")]
        start_tag: String,
        #[serde(default = "default_comment_end")]
        end_tag: String,
    },
    /// `->right->` and `->center<-` blocks.
    Align,
    /// `$inline$` and `$$display$$` math.
    #[serde(rename = "mathjax")]
    MathJax,
    /// `@name` mentions. `{}` in the template is replaced by the name.
    /// With a member list, only members can be pinged.
    Ping {
        #[serde(default = "default_ping_url")]
        url_template: String,
        #[serde(default)]
        members: Option<Vec<String>>,
    },
    /// Symbol-to-image substitutions.
    Emoticons {
        #[serde(default = "default_emoticons")]
        emoticons: BTreeMap<String, String>,
    },
    /// `||key||`.
    Kbd,
    /// Shift every heading down by `offset` levels (1–5).
    HeaderOffset {
        #[serde(default = "default_offset")]
        offset: u8,
    },
    /// French typography substitutions.
    Typography {
        #[serde(default)]
        options: TypographyOptions,
    },
    /// Heading anchors and a `toc` metadata record.
    Toc,
}

impl ExtensionConfig {
    /// The extension's name, as used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            ExtensionConfig::FencedCode => "fenced_code",
            ExtensionConfig::Comments { .. } => "comments",
            ExtensionConfig::Align => "align",
            ExtensionConfig::MathJax => "mathjax",
            ExtensionConfig::Ping { .. } => "ping",
            ExtensionConfig::Emoticons { .. } => "emoticons",
            ExtensionConfig::Kbd => "kbd",
            ExtensionConfig::HeaderOffset { .. } => "header_offset",
            ExtensionConfig::Typography { .. } => "typography",
            ExtensionConfig::Toc => "toc",
        }
    }

    /// An extension by name, with default options.
    pub fn from_name(name: &str) -> Result<Self, MarkupError> {
        serde_json::from_value(serde_json::json!({ "name": name }))
            .map_err(|_| MarkupError::InvalidConfig(format!("unknown extension '{name}'")))
    }

    /// `true` when the extension is registered in inline mode.
    pub fn available_inline(&self) -> bool {
        matches!(
            self,
            ExtensionConfig::Ping { .. } | ExtensionConfig::Typography { .. }
        )
    }

    fn validate(&self) -> Result<(), MarkupError> {
        match self {
            ExtensionConfig::Comments { start_tag, end_tag } => {
                if start_tag.is_empty() || end_tag.is_empty() {
                    return Err(MarkupError::InvalidConfig(
                        "comment tags must not be empty".into(),
                    ));
                }
            }
            ExtensionConfig::HeaderOffset { offset } => {
                if !(1..=5).contains(offset) {
                    return Err(MarkupError::InvalidConfig(format!(
                        "header offset must be 1–5, got {offset}"
                    )));
                }
            }
            ExtensionConfig::Ping { url_template, .. } => {
                if !url_template.contains("{}") {
                    return Err(MarkupError::InvalidConfig(format!(
                        "ping url_template must contain '{{}}', got '{url_template}'"
                    )));
                }
            }
            ExtensionConfig::Emoticons { emoticons } => {
                if emoticons.keys().any(|k| k.trim().is_empty()) {
                    return Err(MarkupError::InvalidConfig(
                        "emoticon symbols must not be blank".into(),
                    ));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Which typography substitutions run. All on by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypographyOptions {
    /// `'` → right single quote.
    pub apostrophes: bool,
    /// `---` → em dash.
    pub em_dashes: bool,
    /// `--` → en dash.
    pub en_dashes: bool,
    /// Non-breaking space before `;`, `:`, `?`, `!`, `%`, `‰` and inside
    /// guillemets.
    pub spaces: bool,
    /// `<<` and `>>` → guillemets.
    pub guillemets: bool,
    /// `%o` → per-mille sign.
    pub permille: bool,
    /// `...` → ellipsis.
    pub ellipsis: bool,
}

impl Default for TypographyOptions {
    fn default() -> Self {
        Self {
            apostrophes: true,
            em_dashes: true,
            en_dashes: true,
            spaces: true,
            guillemets: true,
            permille: true,
            ellipsis: true,
        }
    }
}

fn default_comment_start() -> String {
    "<--COMMENTS".to_string()
}

fn default_comment_end() -> String {
    "COMMENTS-->".to_string()
}

fn default_ping_url() -> String {
    "/membres/voir/{}/".to_string()
}

fn default_emoticons() -> BTreeMap<String, String> {
    BTreeMap::from([(":)".to_string(), "test.png".to_string())])
}

fn default_offset() -> u8 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = EngineConfig::builder().build().unwrap();
        assert!(config.extensions.is_empty());
        assert!(!config.inline);
        assert_eq!(config.tab_length, 4);
    }

    #[test]
    fn zds_preset_is_valid() {
        EngineConfig::zds(false).validate().unwrap();
        EngineConfig::zds(true).validate().unwrap();
    }

    #[test]
    fn bad_tab_length_is_rejected() {
        let err = EngineConfig::builder().tab_length(0).build().unwrap_err();
        assert!(matches!(err, MarkupError::InvalidConfig(_)));
    }

    #[test]
    fn duplicate_extension_is_rejected() {
        let err = EngineConfig::builder()
            .extension(ExtensionConfig::Align)
            .extension(ExtensionConfig::Align)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("align"), "got: {err}");
    }

    #[test]
    fn header_offset_range() {
        for offset in [0, 6] {
            assert!(EngineConfig::builder()
                .extension(ExtensionConfig::HeaderOffset { offset })
                .build()
                .is_err());
        }
    }

    #[test]
    fn ping_template_needs_slot() {
        let err = EngineConfig::builder()
            .extension(ExtensionConfig::Ping {
                url_template: "/members/".into(),
                members: None,
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, MarkupError::InvalidConfig(_)));
    }

    #[test]
    fn json_fills_defaults() {
        let config = EngineConfig::from_json(
            r#"{"extensions": [{"name": "comments"}, {"name": "header_offset", "offset": 2}, {"name": "mathjax"}]}"#,
        )
        .unwrap();
        assert_eq!(
            config.extensions,
            vec![
                ExtensionConfig::Comments {
                    start_tag: "<--COMMENTS".into(),
                    end_tag: "COMMENTS-->".into()
                },
                ExtensionConfig::HeaderOffset { offset: 2 },
                ExtensionConfig::MathJax,
            ]
        );
        assert_eq!(config.tab_length, 4);
    }

    #[test]
    fn json_round_trip_keeps_tags() {
        let config = EngineConfig::zds(false);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains(r#""name":"header_offset""#), "got: {json}");
        let back = EngineConfig::from_json(&json).unwrap();
        assert_eq!(back.extensions, config.extensions);
    }

    #[test]
    fn unknown_extension_name() {
        assert_eq!(ExtensionConfig::from_name("kbd").unwrap(), ExtensionConfig::Kbd);
        assert!(ExtensionConfig::from_name("nope").is_err());
    }

    #[test]
    fn typography_options_partial_json() {
        let ext: ExtensionConfig =
            serde_json::from_str(r#"{"name": "typography", "options": {"ellipsis": false}}"#).unwrap();
        let ExtensionConfig::Typography { options } = ext else {
            panic!("wrong variant");
        };
        assert!(!options.ellipsis);
        assert!(options.apostrophes);
    }

    #[test]
    fn debug_hides_observer() {
        let config = EngineConfig::builder()
            .observer(std::sync::Arc::new(crate::progress::NoopObserver))
            .build()
            .unwrap();
        assert!(format!("{config:?}").contains("<dyn ConversionObserver>"));
    }
}
