//! Conversion results.

use crate::metadata::Metadata;
use serde::Serialize;

/// Result of one conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutput {
    /// Rendered HTML, placeholders resolved.
    pub html: String,
    /// Metadata recorded by stages during this conversion.
    pub metadata: Metadata,
    pub stats: ConversionStats,
}

/// Counters collected while converting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionStats {
    /// Lines after normalisation, before preprocessing.
    pub input_lines: usize,
    /// Top-level chunks handed to the block pipeline.
    pub chunks: usize,
    /// Nodes in the final tree, excluding the root.
    pub nodes: usize,
    /// Entries stored in the protection store.
    pub placeholders: usize,
    pub duration_ms: u64,
}
