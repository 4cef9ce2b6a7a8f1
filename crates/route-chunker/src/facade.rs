//! Route Chunk Facade (spec §4.7).

use std::collections::HashMap;

use crate::cache::Cache;
use crate::chunk_emitter;
use crate::error::ChunkError;
use crate::gateway::PrinterOptions;
use crate::main_emitter;
use crate::oracle;

/// The closed list of chunkable export names (spec §3, "Chunk Name"). Kept
/// as data, per the teacher's own `page_config`-style constants, so a caller
/// embedding this crate can see the recognized set without reading the
/// Oracle.
pub const CHUNK_EXPORT_NAMES: &[&str] = &["clientAction", "clientLoader"];

/// `detect(source) -> { hasChunkX, hasChunkY, hasAny }`, generalized from the
/// fixed `x`/`y` pair in spec §4.7 to the full [`CHUNK_EXPORT_NAMES`] list:
/// one flag per configured name plus their disjunction.
#[derive(Debug, Clone)]
pub struct ChunkDetection {
    pub has_chunk: HashMap<&'static str, bool>,
    pub has_any: bool,
}

/// Stateful entry point: owns the Memoization Layer caches for both emitters
/// so repeated `get_chunk`/`detect` calls on the same `cacheKey` benefit from
/// the cache contract (spec §4.2).
#[derive(Default)]
pub struct RouteChunkFacade {
    chunk_cache: Cache<Result<Option<String>, ChunkError>>,
    main_cache: Cache<Result<Option<String>, ChunkError>>,
}

impl RouteChunkFacade {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_known_chunk_name(name: &str) -> bool {
        name == "main" || CHUNK_EXPORT_NAMES.contains(&name)
    }

    pub fn detect(&self, source: &str) -> Result<ChunkDetection, ChunkError> {
        let mut has_chunk = HashMap::with_capacity(CHUNK_EXPORT_NAMES.len());
        let mut has_any = false;

        for &name in CHUNK_EXPORT_NAMES {
            let chunkable = oracle::is_chunkable(source, name)?;
            has_any |= chunkable;
            has_chunk.insert(name, chunkable);
        }

        tracing::info!(has_any, "detected chunkable exports");
        Ok(ChunkDetection { has_chunk, has_any })
    }

    pub fn get_chunk(
        &self,
        cache_key: &str,
        source: &str,
        chunk_name: &str,
        options: &PrinterOptions,
    ) -> Result<Option<String>, ChunkError> {
        tracing::info!(cache_key = %cache_key, chunk_name = %chunk_name, "get_chunk");

        if chunk_name == "main" {
            let omitted: Vec<String> = CHUNK_EXPORT_NAMES.iter().map(|s| s.to_string()).collect();
            return main_emitter::emit_main(&self.main_cache, cache_key, source, &omitted, options);
        }

        chunk_emitter::emit_chunk(&self.chunk_cache, cache_key, source, chunk_name, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_chunk_names() {
        assert!(RouteChunkFacade::is_known_chunk_name("main"));
        assert!(RouteChunkFacade::is_known_chunk_name("clientAction"));
        assert!(!RouteChunkFacade::is_known_chunk_name("clientWhatever"));
    }

    #[test]
    fn detect_reports_per_chunk_flags() {
        let facade = RouteChunkFacade::new();
        let src = r#"import { a } from "a";
                     export const clientAction = a;
                     export const other = 1;"#;
        let detection = facade.detect(src).unwrap();
        assert_eq!(detection.has_chunk.get("clientAction"), Some(&true));
        assert_eq!(detection.has_chunk.get("clientLoader"), Some(&false));
        assert!(detection.has_any);
    }

    #[test]
    fn get_chunk_dispatches_to_chunk_emitter() {
        let facade = RouteChunkFacade::new();
        let src = r#"import { a } from "a"; export const clientAction = a;"#;
        let code = facade
            .get_chunk("route.tsx", src, "clientAction", &PrinterOptions::default())
            .unwrap()
            .unwrap();
        assert!(code.contains("clientAction"));
    }

    #[test]
    fn get_chunk_main_dispatches_to_main_emitter() {
        let facade = RouteChunkFacade::new();
        let src = r#"import { a } from "a";
                     export const clientAction = a;
                     export const other = 1;"#;
        let code = facade
            .get_chunk("route.tsx", src, "main", &PrinterOptions::default())
            .unwrap()
            .unwrap();
        assert!(!code.contains("clientAction"));
        assert!(code.contains("other"));
    }

    #[test]
    fn repeated_calls_hit_the_cache() {
        let facade = RouteChunkFacade::new();
        let src = r#"import { a } from "a"; export const clientAction = a;"#;
        let first = facade
            .get_chunk("route.tsx", src, "clientAction", &PrinterOptions::default())
            .unwrap();
        let second = facade
            .get_chunk("route.tsx", src, "clientAction", &PrinterOptions::default())
            .unwrap();
        assert_eq!(first, second);
    }
}
