//! Main Emitter (spec §4.6).

use rustc_hash::FxHashSet;
use swc_core::atoms::Atom;
use swc_core::common::DUMMY_SP;
use swc_core::ecma::ast::*;

use crate::analyzer::{self, ExportDependencies};
use crate::cache::{Cache, compose_key};
use crate::error::ChunkError;
use crate::gateway::{self, PrinterOptions};
use crate::oracle;

/// Operation `emitMain(source, omittedExportNames, printerOptions) -> { code }
/// | none` (spec §4.6), memoized under `(cacheKey, "omitChunkedExports",
/// sorted omitted names joined by ",", serialized printer options)`.
pub fn emit_main(
    cache: &Cache<Result<Option<String>, ChunkError>>,
    cache_key: &str,
    source: &str,
    omitted_export_names: &[String],
    options: &PrinterOptions,
) -> Result<Option<String>, ChunkError> {
    let mut sorted_names = omitted_export_names.to_vec();
    sorted_names.sort();
    let joined = sorted_names.join(",");
    let key = compose_key(
        cache_key,
        "omitChunkedExports",
        &[&joined, &options.cache_fragment()],
    );

    tracing::info!(cache_key = %cache_key, omitted = %joined, "emitting main");
    cache.get_or_set(&key, source, || {
        emit_main_uncached(source, omitted_export_names, options)
    })
}

fn emit_main_uncached(
    source: &str,
    omitted_export_names: &[String],
    options: &PrinterOptions,
) -> Result<Option<String>, ChunkError> {
    let deps = analyzer::analyze(source)?;
    let actually_omitted = actually_omitted_names(&deps, omitted_export_names);

    if actually_omitted.is_empty() {
        let fresh = gateway::parse(source)?;
        return if fresh.body.is_empty() {
            Ok(None)
        } else {
            gateway::generate(&fresh, options).map(Some)
        };
    }

    let omitted_statement_idx: FxHashSet<usize> = actually_omitted
        .iter()
        .flat_map(|name| deps.get(name).unwrap().top_level_non_module_statements.iter().copied())
        .collect();
    let omitted_imported_names: FxHashSet<Atom> = actually_omitted
        .iter()
        .flat_map(|name| deps.get(name).unwrap().imported_identifier_names.iter().cloned())
        .collect();

    let fresh = gateway::parse(source)?;
    let body = remove_omitted_statements(fresh.body, &omitted_statement_idx, &deps.body);
    let body = prune_import_specifiers(body, &omitted_imported_names);
    let body = prune_export_declarations(body, &actually_omitted)?;

    if body.is_empty() {
        return Ok(None);
    }

    let module = Module {
        span: DUMMY_SP,
        body,
        shebang: None,
    };
    gateway::generate(&module, options).map(Some)
}

/// An omitted export name is "actually omitted" only when it is both listed
/// and chunkable; non-chunkable listed names remain in the main output.
fn actually_omitted_names(deps: &ExportDependencies, listed: &[String]) -> Vec<String> {
    listed
        .iter()
        .filter(|name| oracle::is_chunkable_in(deps, name))
        .cloned()
        .collect()
}

/// Pass 1: drop every top-level node structurally equivalent to a member of
/// `omitted_statement_idx`. Module statements (imports/exports) are handled
/// at finer granularity by the later passes, so this only removes
/// non-module code.
fn remove_omitted_statements(
    body: Vec<ModuleItem>,
    omitted_statement_idx: &FxHashSet<usize>,
    analyzed_body: &[ModuleItem],
) -> Vec<ModuleItem> {
    let targets: Vec<&ModuleItem> = omitted_statement_idx
        .iter()
        .map(|&idx| &analyzed_body[idx])
        .collect();

    body.into_iter()
        .filter(|item| !targets.iter().any(|t| gateway::structural_equals(item, t)))
        .collect()
}

/// Pass 2: side-effect-only imports (zero specifiers) are kept unchanged.
/// Otherwise drop specifiers whose local name belongs to an actually-omitted
/// export; drop the declaration if every specifier is removed.
fn prune_import_specifiers(
    body: Vec<ModuleItem>,
    omitted_imported_names: &FxHashSet<Atom>,
) -> Vec<ModuleItem> {
    let mut out = Vec::with_capacity(body.len());

    for item in body {
        match item {
            ModuleItem::ModuleDecl(ModuleDecl::Import(mut import)) => {
                if import.specifiers.is_empty() {
                    out.push(ModuleItem::ModuleDecl(ModuleDecl::Import(import)));
                    continue;
                }

                import.specifiers.retain(|specifier| {
                    !omitted_imported_names.contains(&local_name(specifier).sym)
                });

                if !import.specifiers.is_empty() {
                    out.push(ModuleItem::ModuleDecl(ModuleDecl::Import(import)));
                }
            }
            other => out.push(other),
        }
    }

    out
}

fn local_name(specifier: &ImportSpecifier) -> &Ident {
    match specifier {
        ImportSpecifier::Named(s) => &s.local,
        ImportSpecifier::Default(s) => &s.local,
        ImportSpecifier::Namespace(s) => &s.local,
    }
}

/// Pass 3: drop the actually-omitted exports from surviving export
/// declarations.
fn prune_export_declarations(
    body: Vec<ModuleItem>,
    actually_omitted: &[String],
) -> Result<Vec<ModuleItem>, ChunkError> {
    let omitted: FxHashSet<&str> = actually_omitted.iter().map(String::as_str).collect();
    let mut out = Vec::with_capacity(body.len());

    for item in body {
        match item {
            // Re-export-all can't be attributed to a single export; always kept.
            ModuleItem::ModuleDecl(ModuleDecl::ExportAll(_)) => out.push(item),

            ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultDecl(_))
            | ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultExpr(_)) => {
                if !omitted.contains("default") {
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
                            if !omitted.contains(binding.id.sym.as_str()) {
                                kept.push(declarator);
                            }
                        }
                        let any_kept = !kept.is_empty();
                        var_decl.decls = kept;
                        any_kept
                    }
                    Decl::Fn(f) => !omitted.contains(f.ident.sym.as_str()),
                    Decl::Class(c) => !omitted.contains(c.ident.sym.as_str()),
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
                if named.specifiers.is_empty() {
                    out.push(ModuleItem::ModuleDecl(ModuleDecl::ExportNamed(named)));
                    continue;
                }
                named
                    .specifiers
                    .retain(|s| !omitted.contains(specifier_exported_name(s).as_str()));
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

    fn emit(source: &str, omitted: &[&str]) -> Option<String> {
        let owned: Vec<String> = omitted.iter().map(|s| s.to_string()).collect();
        emit_main_uncached(source, &owned, &PrinterOptions::default()).unwrap()
    }

    #[test]
    fn two_independent_exports_fully_omitted_yields_none() {
        let src = r#"import { a } from "a"; import { b } from "b";
                     export const x = a();
                     export const y = b();"#;
        assert!(emit(src, &["x", "y"]).is_none());
    }

    #[test]
    fn non_chunkable_listed_export_stays_in_main() {
        let src = r#"function h() {}
                     export const x = h();
                     export const y = h();"#;
        let main = emit(src, &["x", "y"]).unwrap();
        assert!(main.contains("export const x"));
        assert!(main.contains("export const y"));
    }

    #[test]
    fn default_export_omission() {
        let src = r#"import d from "d"; export default d; export const x = 1;"#;
        let main = emit(src, &["default"]).unwrap();
        assert!(!main.contains("export default"));
        assert!(main.contains("export const x"));
    }

    #[test]
    fn side_effect_import_survives() {
        let src = r#"import "side"; export const x = 1; export const y = 2;"#;
        let main = emit(src, &["x"]).unwrap();
        assert!(main.contains(r#"import "side""#));
        assert!(main.contains("export const y"));
        assert!(!main.contains("export const x"));
    }

    #[test]
    fn re_export_passthrough_survives() {
        let src = r#"export * from "a"; export const x = 1;"#;
        let main = emit(src, &["x"]).unwrap();
        assert!(main.contains(r#"export * from "a""#));
        assert!(!main.contains("export const x"));
    }
}
