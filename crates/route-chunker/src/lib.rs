//! A module-level static analysis and AST-rewriting engine that decides
//! whether named exports of a JS/TS source file can be split into
//! independent output chunks, and emits the rewritten source for each
//! resulting chunk.
//!
//! The seven components line up with the design document: [`gateway`]
//! (parse/print/structural-equivalence), [`cache`] (the memoization layer),
//! [`analyzer`] (per-export dependency sets), [`oracle`] (the chunkability
//! decision), [`chunk_emitter`] and [`main_emitter`] (the two rewrite
//! passes), and [`facade`] (the entry point most callers want).

pub mod analyzer;
pub mod cache;
pub mod chunk_emitter;
pub mod error;
pub mod facade;
pub mod gateway;
pub mod main_emitter;
pub mod oracle;

pub use analyzer::{ExportDependencies, ExportDescriptor};
pub use cache::Cache;
pub use error::ChunkError;
pub use facade::{CHUNK_EXPORT_NAMES, ChunkDetection, RouteChunkFacade};
pub use gateway::{EcmaTarget, PrinterOptions};
