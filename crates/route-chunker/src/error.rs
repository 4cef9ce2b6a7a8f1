use thiserror::Error;

/// Error taxonomy for the route-chunking analyzer (see spec §7).
///
/// None of these are meant to be retried: a `Parse` failure means the input
/// wasn't a module, and the other two variants mean the AST contained (or the
/// analyzer produced) something the classification rules don't cover.
#[derive(Debug, Clone, Error)]
pub enum ChunkError {
    /// The AST Gateway could not parse the source as a module.
    #[error("failed to parse module source: {0}")]
    Parse(String),

    /// A structural invariant violation: a destructuring export declarator,
    /// an anonymous exported function/class, or an export sub-kind the
    /// analyzer does not classify.
    #[error("unsupported export pattern in `{node}`: {detail}")]
    UnsupportedExportPattern { node: String, detail: String },

    /// An internal consistency violation, e.g. the Chunk Emitter pruned every
    /// specifier off a surviving import declaration. Indicates a bug in the
    /// analyzer rather than bad input.
    #[error("analyzer invariant violated for export `{export_name}`: {detail}")]
    AnalyzerInvariant { export_name: String, detail: String },
}
