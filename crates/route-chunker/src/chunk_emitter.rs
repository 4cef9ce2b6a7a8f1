//! Chunk Emitter (spec §4.5).

use rustc_hash::FxHashSet;
use swc_core::atoms::Atom;
use swc_core::common::DUMMY_SP;
use swc_core::ecma::ast::*;

use crate::analyzer::{self, ExportDescriptor};
use crate::cache::{Cache, compose_key};
use crate::error::ChunkError;
use crate::gateway::{self, PrinterOptions};
use crate::oracle;

/// Operation `emitChunk(source, exportName, printerOptions) -> { code } | none`
/// (spec §4.5), memoized under `(cacheKey, "getChunkedExport", exportName,
/// serialized printer options)`.
pub fn emit_chunk(
    cache: &Cache<Result<Option<String>, ChunkError>>,
    cache_key: &str,
    source: &str,
    export_name: &str,
    options: &PrinterOptions,
) -> Result<Option<String>, ChunkError> {
    let key = compose_key(
        cache_key,
        "getChunkedExport",
        &[export_name, &options.cache_fragment()],
    );

    tracing::info!(cache_key = %cache_key, export_name = %export_name, "emitting chunk");
    cache.get_or_set(&key, source, || {
        emit_chunk_uncached(source, export_name, options)
    })
}

fn emit_chunk_uncached(
    source: &str,
    export_name: &str,
    options: &PrinterOptions,
) -> Result<Option<String>, ChunkError> {
    let deps = analyzer::analyze(source)?;
    if !oracle::is_chunkable_in(&deps, export_name) {
        tracing::debug!(export_name = %export_name, "export is not chunkable");
        return Ok(None);
    }

    let descriptor = deps
        .get(export_name)
        .expect("chunkable export always has a descriptor");

    let fresh = gateway::parse(source)?;
    let body = keep_dependency_statements(fresh.body, descriptor, &deps.body);
    let body = prune_imports(body, &descriptor.imported_identifier_names, export_name)?;
    let body = restrict_exports(body, export_name)?;

    let module = Module {
        span: DUMMY_SP,
        body,
        shebang: None,
    };
    gateway::generate(&module, options).map(Some)
}

/// Pass 1: keep only statements structurally equivalent to a member of
/// `descriptor.top_level_statements`.
fn keep_dependency_statements(
    body: Vec<ModuleItem>,
    descriptor: &ExportDescriptor,
    analyzed_body: &[ModuleItem],
) -> Vec<ModuleItem> {
    let targets: Vec<&ModuleItem> = descriptor
        .top_level_statements
        .iter()
        .map(|&idx| &analyzed_body[idx])
        .collect();

    body.into_iter()
        .filter(|item| targets.iter().any(|t| gateway::structural_equals(item, t)))
        .collect()
}

/// Pass 2: drop surviving imports entirely if the export has no imported
/// dependencies; otherwise keep only specifiers whose local name is in
/// `imported_names`.
fn prune_imports(
    body: Vec<ModuleItem>,
    imported_names: &FxHashSet<Atom>,
    export_name: &str,
) -> Result<Vec<ModuleItem>, ChunkError> {
    let mut out = Vec::with_capacity(body.len());

    for item in body {
        match item {
            ModuleItem::ModuleDecl(ModuleDecl::Import(mut import)) => {
                if imported_names.is_empty() {
                    continue;
                }

                let had_specifiers = !import.specifiers.is_empty();
                import.specifiers.retain(|specifier| {
                    imported_names.contains(&local_name(specifier).sym)
                });

                if import.specifiers.is_empty() && had_specifiers {
                    return Err(ChunkError::AnalyzerInvariant {
                        export_name: export_name.to_string(),
                        detail: "import declaration retained with zero surviving specifiers"
                            .to_string(),
                    });
                }

                out.push(ModuleItem::ModuleDecl(ModuleDecl::Import(import)));
            }
            other => out.push(other),
        }
    }

    Ok(out)
}

fn local_name(specifier: &ImportSpecifier) -> &Ident {
    match specifier {
        ImportSpecifier::Named(s) => &s.local,
        ImportSpecifier::Default(s) => &s.local,
        ImportSpecifier::Namespace(s) => &s.local,
    }
}

/// Pass 3: restrict every surviving export declaration to `export_name`.
fn restrict_exports(body: Vec<ModuleItem>, export_name: &str) -> Result<Vec<ModuleItem>, ChunkError> {
    let mut out = Vec::with_capacity(body.len());

    for item in body {
        match item {
            ModuleItem::ModuleDecl(ModuleDecl::ExportAll(_)) => continue,

            ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultDecl(_))
            | ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultExpr(_)) => {
                if export_name == "default" {
                    out.push(item);
                }
            }

            ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(mut export_decl)) => {
                let keep = match &mut export_decl.decl {
                    Decl::Var(var_decl) => {
                        let mut kept = Vec::new();
                        for declarator in var_decl.decls.drain(..) {
                            let Pat::Ident(binding) = &declarator.name else {
                                return Err(ChunkError::UnsupportedExportPattern {
                                    node: "export variable declarator".to_string(),
                                    detail: "destructuring declarator ids are unsupported"
                                        .to_string(),
                                });
                            };
                            if binding.id.sym.as_str() == export_name {
                                kept.push(declarator);
                            }
                        }
                        let any_kept = !kept.is_empty();
                        var_decl.decls = kept;
                        any_kept
                    }
                    Decl::Fn(f) => f.ident.sym.as_str() == export_name,
                    Decl::Class(c) => c.ident.sym.as_str() == export_name,
                    other => {
                        return Err(ChunkError::UnsupportedExportPattern {
                            node: "export declaration".to_string(),
                            detail: format!("unrecognized export sub-kind {other:?}"),
                        });
                    }
                };
                if keep {
                    out.push(ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export_decl)));
                }
            }

            ModuleItem::ModuleDecl(ModuleDecl::ExportNamed(mut named)) => {
                named.specifiers.retain(|s| specifier_exported_name(s) == export_name);
                if !named.specifiers.is_empty() {
                    out.push(ModuleItem::ModuleDecl(ModuleDecl::ExportNamed(named)));
                }
            }

            other => out.push(other),
        }
    }

    Ok(out)
}

fn specifier_exported_name(specifier: &ExportSpecifier) -> String {
    match specifier {
        ExportSpecifier::Named(n) => match n.exported.as_ref().unwrap_or(&n.orig) {
            ModuleExportName::Ident(i) => i.sym.to_string(),
            ModuleExportName::Str(s) => s.value.to_string(),
        },
        ExportSpecifier::Default(d) => d.exported.sym.to_string(),
        ExportSpecifier::Namespace(n) => match &n.name {
            ModuleExportName::Ident(i) => i.sym.to_string(),
            ModuleExportName::Str(s) => s.value.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emit(source: &str, export_name: &str) -> Option<String> {
        emit_chunk_uncached(source, export_name, &PrinterOptions::default()).unwrap()
    }

    #[test]
    fn two_independent_exports() {
        let src = r#"import { a } from "a"; import { b } from "b";
                     export const x = a();
                     export const y = b();"#;
        let chunk_x = emit(src, "x").unwrap();
        assert!(chunk_x.contains(r#"import { a } from "a""#));
        assert!(chunk_x.contains("export const x"));
        assert!(!chunk_x.contains(r#"import { b } from "b""#));
    }

    #[test]
    fn non_chunkable_export_returns_none() {
        let src = r#"function h() {}
                     export const x = h();
                     export const y = h();"#;
        assert!(emit(src, "x").is_none());
    }

    #[test]
    fn default_export_chunk() {
        let src = r#"import d from "d"; export default d; export const x = 1;"#;
        let chunk = emit(src, "default").unwrap();
        assert!(chunk.contains(r#"import d from "d""#));
        assert!(chunk.contains("export default d"));
        assert!(!chunk.contains("export const x"));
    }

    #[test]
    fn re_export_passthrough_excluded_from_chunk() {
        let src = r#"export * from "a"; export const x = 1;"#;
        let chunk = emit(src, "x").unwrap();
        assert!(!chunk.contains("export *"));
        assert!(chunk.contains("export const x"));
    }

    #[test]
    fn renamed_specifier_export_chunk() {
        let src = r#"const a = 1; export { a as b };"#;
        let chunk = emit(src, "b").unwrap();
        assert!(chunk.contains("const a = 1"));
        assert!(chunk.contains("a as b"));
    }
}
