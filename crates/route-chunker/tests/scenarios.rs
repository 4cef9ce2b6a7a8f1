//! End-to-end scenarios from spec §8, run through the public facade.

use route_chunker::{PrinterOptions, RouteChunkFacade};

fn chunk(facade: &RouteChunkFacade, source: &str, name: &str) -> Option<String> {
    facade
        .get_chunk("scenario.tsx", source, name, &PrinterOptions::default())
        .unwrap()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[test]
fn facade_logs_are_readable_under_a_test_subscriber() {
    init_tracing();
    let facade = RouteChunkFacade::new();
    let source = r#"import { a } from "a"; export const clientAction = a;"#;
    let detection = facade.detect(source).unwrap();
    assert!(detection.has_chunk.get("clientAction").copied().unwrap_or(false));
}

#[test]
fn two_fully_independent_exports() {
    let facade = RouteChunkFacade::new();
    let source = r#"import { a } from "a"; import { b } from "b";
                     export const x = a();
                     export const y = b();"#;

    let chunk_x = chunk(&facade, source, "x").unwrap();
    assert!(chunk_x.contains(r#"import { a } from "a""#));
    assert!(chunk_x.contains("export const x = a()"));
    assert!(!chunk_x.contains(r#"import { b } from "b""#));

    let chunk_y = chunk(&facade, source, "y").unwrap();
    assert!(chunk_y.contains(r#"import { b } from "b""#));
    assert!(chunk_y.contains("export const y = b()"));

    // Exercised directly rather than via the facade's "main", since the
    // facade always omits the configured clientAction/clientLoader pair
    // rather than the scenario's x/y.
    let main = route_chunker::main_emitter::emit_main(
        &route_chunker::Cache::new(),
        "scenario.tsx",
        source,
        &["x".to_string(), "y".to_string()],
        &PrinterOptions::default(),
    )
    .unwrap();
    assert!(main.is_none());
}

#[test]
fn shared_helper_blocks_chunking() {
    let source = r#"function h() {}
                     export const x = h();
                     export const y = h();"#;

    assert!(!route_chunker::oracle::is_chunkable(source, "x").unwrap());
    assert!(!route_chunker::oracle::is_chunkable(source, "y").unwrap());

    let main = route_chunker::main_emitter::emit_main(
        &route_chunker::Cache::new(),
        "scenario.tsx",
        source,
        &["x".to_string(), "y".to_string()],
        &PrinterOptions::default(),
    )
    .unwrap()
    .unwrap();
    assert!(main.contains("function h"));
    assert!(main.contains("export const x"));
    assert!(main.contains("export const y"));
}

#[test]
fn shared_import_specifier_blocks_chunking() {
    let source = r#"import { k } from "k"; export const x = k; export const y = k;"#;
    assert!(!route_chunker::oracle::is_chunkable(source, "x").unwrap());
    assert!(!route_chunker::oracle::is_chunkable(source, "y").unwrap());
}

#[test]
fn default_export_chunking() {
    let source = r#"import d from "d"; export default d; export const x = 1;"#;

    let default_chunk = route_chunker::chunk_emitter::emit_chunk(
        &route_chunker::Cache::new(),
        "scenario.tsx",
        source,
        "default",
        &PrinterOptions::default(),
    )
    .unwrap()
    .unwrap();
    assert!(default_chunk.contains(r#"import d from "d""#));
    assert!(default_chunk.contains("export default d"));
    assert!(!default_chunk.contains("export const x"));

    let main = route_chunker::main_emitter::emit_main(
        &route_chunker::Cache::new(),
        "scenario.tsx",
        source,
        &["default".to_string()],
        &PrinterOptions::default(),
    )
    .unwrap()
    .unwrap();
    assert!(!main.contains("export default"));
    assert!(main.contains("export const x = 1"));
}

#[test]
fn side_effect_import_preserved_in_main() {
    let source = r#"import "side"; export const x = 1; export const y = 2;"#;

    let main = route_chunker::main_emitter::emit_main(
        &route_chunker::Cache::new(),
        "scenario.tsx",
        source,
        &["x".to_string()],
        &PrinterOptions::default(),
    )
    .unwrap()
    .unwrap();

    assert!(main.contains(r#"import "side""#));
    assert!(main.contains("export const y = 2"));
    assert!(!main.contains("export const x"));
}

#[test]
fn re_export_passthrough() {
    let source = r#"export * from "a"; export const x = 1;"#;

    assert!(route_chunker::oracle::is_chunkable(source, "x").unwrap());

    let chunk_x = route_chunker::chunk_emitter::emit_chunk(
        &route_chunker::Cache::new(),
        "scenario.tsx",
        source,
        "x",
        &PrinterOptions::default(),
    )
    .unwrap()
    .unwrap();
    assert!(!chunk_x.contains("export *"));
    assert!(chunk_x.contains("export const x = 1"));

    let main = route_chunker::main_emitter::emit_main(
        &route_chunker::Cache::new(),
        "scenario.tsx",
        source,
        &["x".to_string()],
        &PrinterOptions::default(),
    )
    .unwrap()
    .unwrap();
    assert!(main.contains(r#"export * from "a""#));
    assert!(!main.contains("export const x"));
}

#[test]
fn analysis_is_idempotent() {
    let source = r#"import { a } from "a"; export const x = a();"#;
    let first = route_chunker::analyzer::analyze(source).unwrap();
    let second = route_chunker::analyzer::analyze(source).unwrap();
    assert_eq!(first.exports.len(), second.exports.len());
    for (name, descriptor) in &first.exports {
        let other = second.exports.get(name).unwrap();
        assert_eq!(descriptor.top_level_statements, other.top_level_statements);
        assert_eq!(descriptor.imported_identifier_names, other.imported_identifier_names);
    }
}
