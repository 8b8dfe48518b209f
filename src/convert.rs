//! One-shot conversion entry points.
//!
//! These build a fresh [`Engine`] per call. To convert many documents with
//! the same configuration, build the engine once with
//! [`Engine::from_config`] and call [`Engine::convert`] repeatedly; the
//! engine resets its conversion state between documents.

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::error::MarkupError;
use crate::output::{ConversionOutput, ConversionStats};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Convert a Markdown document to HTML.
///
/// # Errors
/// Setup errors ([`MarkupError::is_setup_error`]) when the configuration
/// cannot be turned into an engine, and [`MarkupError::Stage`] when a stage
/// fails during the conversion. No partial output is returned.
pub fn convert(source: impl AsRef<str>, config: &EngineConfig) -> Result<ConversionOutput, MarkupError> {
    let mut engine = Engine::from_config(config)?;
    debug!(extensions = ?engine.extensions(), "engine ready");
    engine.convert(source.as_ref())
}

/// Convert a document and write the HTML to `output_path`.
///
/// Uses atomic write (temp file + rename) so a reader never sees a partial
/// file. Parent directories are created as needed.
pub fn convert_to_file(
    source: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &EngineConfig,
) -> Result<ConversionStats, MarkupError> {
    let output = convert(source, config)?;
    let path = output_path.as_ref();
    let write_failed = |source: std::io::Error| MarkupError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_failed)?;
    }

    let tmp_path = path.with_extension("html.tmp");
    fs::write(&tmp_path, &output.html).map_err(write_failed)?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(write_failed(e));
    }

    info!(path = %path.display(), bytes = output.html.len(), "output written");
    Ok(output.stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtensionConfig;

    #[test]
    fn convert_with_default_config() {
        let out = convert("Hello *world*", &EngineConfig::default()).unwrap();
        assert_eq!(out.html, "<p>Hello <em>world</em></p>");
        assert_eq!(out.stats.input_lines, 1);
    }

    #[test]
    fn writes_file_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("doc.html");
        let config = EngineConfig::builder()
            .extension(ExtensionConfig::Kbd)
            .build()
            .unwrap();
        let stats = convert_to_file("||Esc||", &path, &config).unwrap();
        assert_eq!(stats.chunks, 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "<p><kbd>Esc</kbd></p>");
        assert!(!path.with_extension("html.tmp").exists());
    }

    #[test]
    fn unwritable_target_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be replaced by a file.
        let err = convert_to_file("x", dir.path(), &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, MarkupError::OutputWriteFailed { .. }));
    }
}
