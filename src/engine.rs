//! The conversion engine.
//!
//! An [`Engine`] owns one ordered registry per pipeline kind plus the
//! per-conversion context (protection store and metadata). A conversion runs
//! normalise → preprocess → block → inline → tree → serialise, strictly
//! sequentially. Everything conversion-scoped is reset before each run, so
//! an engine can be reused for any number of documents; it is not meant to
//! be shared between threads while converting (build one per thread).

use crate::config::EngineConfig;
use crate::error::{MarkupError, PipelineKind};
use crate::extensions::{self, Extension};
use crate::metadata::Metadata;
use crate::node::Node;
use crate::output::{ConversionOutput, ConversionStats};
use crate::pipeline::block::{split_chunks, BlockParser};
use crate::pipeline::inline::InlineProcessor;
use crate::pipeline::preprocess::{normalize, run_preprocessors};
use crate::pipeline::serialize::to_html;
use crate::pipeline::stage::{BlockProcessor, InlinePattern, Preprocessor, TreeProcessor};
use crate::pipeline::{blocks, patterns, ConversionContext};
use crate::progress::Observer;
use crate::registry::OrderedRegistry;
use crate::stash::ContentStash;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A configured document translator.
///
/// # Example
/// ```rust
/// use zmarkdown::{Engine, EngineConfig, ExtensionConfig};
///
/// let config = EngineConfig::builder()
///     .extension(ExtensionConfig::Kbd)
///     .build()
///     .unwrap();
/// let mut engine = Engine::from_config(&config).unwrap();
/// let out = engine.convert("Press ||Ctrl||").unwrap();
/// assert_eq!(out.html, "<p>Press <kbd>Ctrl</kbd></p>");
/// ```
pub struct Engine {
    preprocessors: OrderedRegistry<Box<dyn Preprocessor>>,
    block_processors: OrderedRegistry<Box<dyn BlockProcessor>>,
    inline_patterns: OrderedRegistry<Box<dyn InlinePattern>>,
    tree_processors: OrderedRegistry<Box<dyn TreeProcessor>>,
    ctx: ConversionContext,
    observer: Option<Observer>,
    extensions: Vec<&'static str>,
    tab_length: usize,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("preprocessors", &self.preprocessors)
            .field("block_processors", &self.block_processors)
            .field("inline_patterns", &self.inline_patterns)
            .field("tree_processors", &self.tree_processors)
            .field("extensions", &self.extensions)
            .finish()
    }
}

impl Engine {
    /// An engine with the core block and inline stages and no extensions.
    pub fn new() -> Result<Self, MarkupError> {
        let mut engine = Self::empty();
        blocks::register_core(&mut engine.block_processors)?;
        patterns::register_core(&mut engine.inline_patterns)?;
        Ok(engine)
    }

    /// An engine with every registry empty.
    ///
    /// Unclaimed chunks still become paragraphs.
    pub fn empty() -> Self {
        Self {
            preprocessors: OrderedRegistry::new(),
            block_processors: OrderedRegistry::new(),
            inline_patterns: OrderedRegistry::new(),
            tree_processors: OrderedRegistry::new(),
            ctx: ConversionContext::new(),
            observer: None,
            extensions: Vec::new(),
            tab_length: 4,
        }
    }

    /// Build an engine from a configuration: core stages, inline-mode
    /// adjustments, then each extension in list order.
    pub fn from_config(config: &EngineConfig) -> Result<Self, MarkupError> {
        config.validate()?;
        let mut engine = Self::new()?;
        engine.tab_length = config.tab_length;
        engine.observer = config.observer.clone();

        if config.inline {
            engine.inline_patterns.remove("link")?;
            engine.inline_patterns.remove("linebreak")?;
        }
        for ext in &config.extensions {
            if config.inline && !ext.available_inline() {
                debug!(extension = ext.name(), "skipped in inline mode");
                continue;
            }
            let built = extensions::build(ext)?;
            engine.register(built.as_ref())?;
        }
        Ok(engine)
    }

    /// Let `ext` register its stages.
    pub fn register(&mut self, ext: &dyn Extension) -> Result<(), MarkupError> {
        ext.extend(self)?;
        self.extensions.push(ext.name());
        debug!(extension = ext.name(), "extension registered");
        Ok(())
    }

    /// Names of the registered extensions, in registration order.
    pub fn extensions(&self) -> &[&'static str] {
        &self.extensions
    }

    pub fn set_observer(&mut self, observer: Option<Observer>) {
        self.observer = observer;
    }

    pub fn tab_length(&self) -> usize {
        self.tab_length
    }

    pub fn set_tab_length(&mut self, n: usize) {
        self.tab_length = n.max(1);
    }

    // ── Registries ───────────────────────────────────────────────────────

    pub fn preprocessors(&self) -> &OrderedRegistry<Box<dyn Preprocessor>> {
        &self.preprocessors
    }

    pub fn preprocessors_mut(&mut self) -> &mut OrderedRegistry<Box<dyn Preprocessor>> {
        &mut self.preprocessors
    }

    pub fn block_processors(&self) -> &OrderedRegistry<Box<dyn BlockProcessor>> {
        &self.block_processors
    }

    pub fn block_processors_mut(&mut self) -> &mut OrderedRegistry<Box<dyn BlockProcessor>> {
        &mut self.block_processors
    }

    pub fn inline_patterns(&self) -> &OrderedRegistry<Box<dyn InlinePattern>> {
        &self.inline_patterns
    }

    pub fn inline_patterns_mut(&mut self) -> &mut OrderedRegistry<Box<dyn InlinePattern>> {
        &mut self.inline_patterns
    }

    pub fn tree_processors(&self) -> &OrderedRegistry<Box<dyn TreeProcessor>> {
        &self.tree_processors
    }

    pub fn tree_processors_mut(&mut self) -> &mut OrderedRegistry<Box<dyn TreeProcessor>> {
        &mut self.tree_processors
    }

    // ── Conversion ───────────────────────────────────────────────────────

    /// Metadata recorded by the last conversion.
    pub fn metadata(&self) -> &Metadata {
        &self.ctx.metadata
    }

    /// Protection store of the last conversion.
    pub fn stash(&self) -> &ContentStash {
        &self.ctx.stash
    }

    /// Clear conversion state and let every stage re-initialise its
    /// metadata keys.
    pub fn reset(&mut self) {
        self.ctx.reset();
        let meta = &mut self.ctx.metadata;
        for (_, stage) in self.preprocessors.iter_mut() {
            stage.reset(meta);
        }
        for (_, stage) in self.block_processors.iter_mut() {
            stage.reset(meta);
        }
        for (_, stage) in self.inline_patterns.iter_mut() {
            stage.reset(meta);
        }
        for (_, stage) in self.tree_processors.iter_mut() {
            stage.reset(meta);
        }
    }

    /// Convert `source` to HTML.
    ///
    /// On failure the conversion state is reset before the error is
    /// returned, so a failed run leaves no partial metadata behind.
    pub fn convert(&mut self, source: &str) -> Result<ConversionOutput, MarkupError> {
        let start = Instant::now();
        let mut stats = ConversionStats::default();
        let root = match self.run(source, &mut stats) {
            Ok(root) => root,
            Err(e) => {
                warn!("conversion failed: {e}");
                if let Some(obs) = &self.observer {
                    obs.on_conversion_error(&e.to_string());
                }
                self.reset();
                return Err(e);
            }
        };

        let html = self.render(&root);
        stats.nodes = root.count() - 1;
        stats.placeholders = self.ctx.stash.len();
        stats.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            lines = stats.input_lines,
            nodes = stats.nodes,
            duration_ms = stats.duration_ms,
            "conversion complete"
        );
        if let Some(obs) = &self.observer {
            obs.on_conversion_complete(&stats);
        }
        Ok(ConversionOutput {
            html,
            metadata: self.ctx.metadata.clone(),
            stats,
        })
    }

    /// Run every pipeline and return the final tree, without serialising.
    ///
    /// The protection store stays populated until the next conversion, so
    /// the tree can be passed to [`render`](Self::render) afterwards.
    pub fn parse(&mut self, source: &str) -> Result<Node, MarkupError> {
        let mut stats = ConversionStats::default();
        self.run(source, &mut stats).inspect_err(|_| self.reset())
    }

    /// Serialise a tree produced by [`parse`](Self::parse).
    pub fn render(&self, root: &Node) -> String {
        to_html(root, &self.ctx.stash)
    }

    fn run(&mut self, source: &str, stats: &mut ConversionStats) -> Result<Node, MarkupError> {
        self.reset();
        if source.trim().is_empty() {
            return Ok(Node::new("div"));
        }

        let lines = normalize(source, self.tab_length);
        stats.input_lines = lines.len();
        debug!(lines = lines.len(), "conversion started");
        if let Some(obs) = &self.observer {
            obs.on_conversion_start(lines.len());
        }

        let t = Instant::now();
        let lines = run_preprocessors(&self.preprocessors, lines, &mut self.ctx)?;
        self.pipeline_done(PipelineKind::Preprocess, t);

        let t = Instant::now();
        let text = lines.join("\n");
        stats.chunks = split_chunks(&text).len();
        let parser = BlockParser::new(&self.block_processors);
        let mut root = Node::new("div");
        parser.parse_chunk(&mut root, &text, &mut self.ctx)?;
        self.pipeline_done(PipelineKind::Block, t);

        let t = Instant::now();
        InlineProcessor::new(&self.inline_patterns).run(&mut root, &mut self.ctx)?;
        self.pipeline_done(PipelineKind::Inline, t);

        let t = Instant::now();
        for (name, stage) in self.tree_processors.iter() {
            root = stage
                .run(root, &mut self.ctx)
                .map_err(|e| MarkupError::stage(PipelineKind::Tree, name, e))?;
        }
        self.pipeline_done(PipelineKind::Tree, t);

        Ok(root)
    }

    fn pipeline_done(&self, kind: PipelineKind, started: Instant) {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        debug!(pipeline = %kind, elapsed_ms, "pipeline complete");
        if let Some(obs) = &self.observer {
            obs.on_pipeline_complete(kind, elapsed_ms);
        }
    }
}
