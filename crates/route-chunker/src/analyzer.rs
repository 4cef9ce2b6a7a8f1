//! Export Dependency Analyzer (spec §4.3).
//!
//! Walks a module's top-level body once, classifies every recognized export,
//! and computes — per export — the set of top-level statements it depends
//! on, the non-module subset of those, and the imported local names it
//! references. The approach mirrors `next_ssg.rs`'s two-role split (an
//! `Analyzer` that records references, a separate pass that acts on them):
//! here the "recording" role walks from each export's own starting path and
//! follows bindings outward via a `resolver()`-assigned [`Id`], rather than
//! next_ssg's single whole-module data/non-data classification.

use std::collections::VecDeque;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use swc_core::{
    atoms::Atom,
    common::{GLOBALS, Globals, Mark},
    ecma::{
        ast::*,
        transforms::base::resolver,
        visit::{FoldWith, Visit, VisitWith, noop_visit_type},
    },
};

use crate::error::ChunkError;
use crate::gateway::{self, BindingKind, BindingTable, Id, collect_pat_idents};

/// Per-export dependency record (spec §3, "Export Descriptor").
#[derive(Debug, Clone)]
pub struct ExportDescriptor {
    pub top_level_statements: FxHashSet<usize>,
    pub top_level_non_module_statements: FxHashSet<usize>,
    pub imported_identifier_names: FxHashSet<Atom>,
}

/// The result of analyzing one file: its (resolved, cloned) top-level body,
/// and a descriptor per recognized export name. Opaque to callers beyond the
/// read-only accessors they need — nothing here should be mutated; doing so
/// would corrupt whatever the Memoization Layer is holding.
#[derive(Debug, Clone)]
pub struct ExportDependencies {
    pub(crate) body: Vec<ModuleItem>,
    pub exports: IndexMap<String, ExportDescriptor>,
}

impl ExportDependencies {
    pub fn get(&self, export_name: &str) -> Option<&ExportDescriptor> {
        self.exports.get(export_name)
    }
}

/// Operation `analyze(source) -> ExportDependencies` (spec §4.3).
pub fn analyze(source: &str) -> Result<ExportDependencies, ChunkError> {
    GLOBALS.set(&Globals::new(), || {
        let mut module = gateway::parse(source)?;

        let unresolved_mark = Mark::new();
        let top_level_mark = Mark::new();
        module = module.fold_with(&mut resolver(unresolved_mark, top_level_mark, true));

        analyze_module(module)
    })
}

fn analyze_module(module: Module) -> Result<ExportDependencies, ChunkError> {
    let body = module.body;
    let bindings = BindingTable::build(&body);

    let mut exports = IndexMap::new();

    for (idx, item) in body.iter().enumerate() {
        match item {
            ModuleItem::ModuleDecl(ModuleDecl::ExportAll(_)) => continue,

            ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultDecl(edd)) => {
                let seeds = match &edd.decl {
                    DefaultDecl::Fn(f) => collect_identifier_uses(f),
                    DefaultDecl::Class(c) => collect_identifier_uses(c),
                    DefaultDecl::TsInterfaceDecl(i) => collect_identifier_uses(i),
                };
                exports.insert(
                    "default".to_string(),
                    build_descriptor(idx, seeds, &body, &bindings),
                );
            }

            ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultExpr(ede)) => {
                let seeds = collect_identifier_uses(&*ede.expr);
                exports.insert(
                    "default".to_string(),
                    build_descriptor(idx, seeds, &body, &bindings),
                );
            }

            ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(ed)) => {
                classify_export_decl(idx, &ed.decl, &body, &bindings, &mut exports)?;
            }

            ModuleItem::ModuleDecl(ModuleDecl::ExportNamed(named)) => {
                for specifier in &named.specifiers {
                    let (exported_name, orig) = classify_specifier(specifier)?;
                    let seeds = if named.src.is_some() {
                        // `export { a as b } from "x"` re-exports a binding
                        // that lives in another module entirely; there is no
                        // local identifier for it to depend on.
                        Vec::new()
                    } else {
                        orig.map(|id| vec![id]).unwrap_or_default()
                    };
                    exports.insert(exported_name, build_descriptor(idx, seeds, &body, &bindings));
                }
            }

            _ => continue,
        }
    }

    Ok(ExportDependencies { body, exports })
}

fn classify_export_decl(
    idx: usize,
    decl: &Decl,
    body: &[ModuleItem],
    bindings: &BindingTable,
    exports: &mut IndexMap<String, ExportDescriptor>,
) -> Result<(), ChunkError> {
    match decl {
        Decl::Var(var_decl) => {
            for declarator in &var_decl.decls {
                let Pat::Ident(binding) = &declarator.name else {
                    tracing::debug!(
                        statement = idx,
                        "aborting analysis: destructuring declarator ids are unsupported"
                    );
                    return Err(ChunkError::UnsupportedExportPattern {
                        node: "export variable declarator".to_string(),
                        detail: "destructuring declarator ids are unsupported".to_string(),
                    });
                };
                let name = binding.id.sym.to_string();
                let seeds = match &declarator.init {
                    Some(init) => collect_identifier_uses(&**init),
                    None => Vec::new(),
                };
                exports.insert(name, build_descriptor(idx, seeds, body, bindings));
            }
            Ok(())
        }
        Decl::Fn(f) => {
            let name = f.ident.sym.to_string();
            let seeds = collect_identifier_uses(&*f.function);
            exports.insert(name, build_descriptor(idx, seeds, body, bindings));
            Ok(())
        }
        Decl::Class(c) => {
            let name = c.ident.sym.to_string();
            let seeds = collect_identifier_uses(&*c.class);
            exports.insert(name, build_descriptor(idx, seeds, body, bindings));
            Ok(())
        }
        other => {
            tracing::debug!(
                statement = idx,
                "aborting analysis: unrecognized export sub-kind"
            );
            Err(ChunkError::UnsupportedExportPattern {
                node: "export declaration".to_string(),
                detail: format!("unrecognized export sub-kind {other:?}"),
            })
        }
    }
}

fn classify_specifier(specifier: &ExportSpecifier) -> Result<(String, Option<Id>), ChunkError> {
    match specifier {
        ExportSpecifier::Named(n) => {
            let exported_name = match n.exported.as_ref().unwrap_or(&n.orig) {
                ModuleExportName::Ident(i) => i.sym.to_string(),
                ModuleExportName::Str(s) => s.value.to_string(),
            };
            let orig = match &n.orig {
                ModuleExportName::Ident(i) => Some(i.to_id()),
                ModuleExportName::Str(_) => None,
            };
            Ok((exported_name, orig))
        }
        ExportSpecifier::Default(d) => Ok((d.exported.sym.to_string(), None)),
        ExportSpecifier::Namespace(n) => {
            let exported_name = match &n.name {
                ModuleExportName::Ident(i) => i.sym.to_string(),
                ModuleExportName::Str(s) => s.value.to_string(),
            };
            Ok((exported_name, None))
        }
    }
}

fn build_descriptor(
    stmt_idx: usize,
    seeds: Vec<Id>,
    body: &[ModuleItem],
    bindings: &BindingTable,
) -> ExportDescriptor {
    let mut visited: FxHashSet<Id> = FxHashSet::default();
    let mut top_level_statements: FxHashSet<usize> = FxHashSet::default();
    top_level_statements.insert(stmt_idx);
    let mut imported_identifier_names: FxHashSet<Atom> = FxHashSet::default();
    let mut queue: VecDeque<Id> = seeds.into_iter().collect();

    while let Some(id) = queue.pop_front() {
        if !visited.insert(id.clone()) {
            continue;
        }

        let Some((decl_idx, kind)) = bindings.scope_binding(&id) else {
            // Not a top-level binding: a parameter, a block-scoped local, or
            // a global/builtin. Nothing further to follow.
            continue;
        };
        top_level_statements.insert(decl_idx);

        match kind {
            BindingKind::Import => {
                imported_identifier_names.insert(id.0.clone());
            }
            BindingKind::Local => {
                for next in identifiers_owned_by(&body[decl_idx], &id) {
                    if !visited.contains(&next) {
                        queue.push_back(next);
                    }
                }
            }
        }
    }

    let top_level_non_module_statements = top_level_statements
        .iter()
        .copied()
        .filter(|&i| !is_module_statement(&body[i]))
        .collect();

    ExportDescriptor {
        top_level_statements,
        top_level_non_module_statements,
        imported_identifier_names,
    }
}

/// Given the top-level statement that declares `id`, finds the narrower
/// subtree that's actually "owned" by that one binding (e.g. a single
/// declarator's initializer out of a `const a = 1, b = 2;`) and collects the
/// identifiers it references.
fn identifiers_owned_by(item: &ModuleItem, id: &Id) -> Vec<Id> {
    let decl = match item {
        ModuleItem::Stmt(Stmt::Decl(decl)) => decl,
        ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(ExportDecl { decl, .. })) => decl,
        _ => return Vec::new(),
    };

    match decl {
        Decl::Fn(f) if &f.ident.to_id() == id => collect_identifier_uses(&*f.function),
        Decl::Class(c) if &c.ident.to_id() == id => collect_identifier_uses(&*c.class),
        Decl::Var(var_decl) => var_decl
            .decls
            .iter()
            .find(|declarator| collect_pat_idents(&declarator.name).contains(id))
            .and_then(|declarator| declarator.init.as_deref())
            .map(collect_identifier_uses)
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn is_module_statement(item: &ModuleItem) -> bool {
    matches!(item, ModuleItem::ModuleDecl(_))
}

fn collect_identifier_uses<N>(node: &N) -> Vec<Id>
where
    N: VisitWith<Collector>,
{
    let mut collector = Collector::default();
    node.visit_with(&mut collector);
    collector.ids
}

/// Records every identifier *use* (not binding position) reachable from a
/// node: bare identifier expressions, shorthand object properties, and JSX
/// element/member names. Mirrors the set of positions `next_ssg.rs`'s
/// `Analyzer` treats as references.
#[derive(Default)]
struct Collector {
    ids: Vec<Id>,
}

impl Visit for Collector {
    noop_visit_type!();

    fn visit_expr(&mut self, e: &Expr) {
        e.visit_children_with(self);
        if let Expr::Ident(i) = e {
            self.ids.push(i.to_id());
        }
    }

    fn visit_prop(&mut self, p: &Prop) {
        p.visit_children_with(self);
        if let Prop::Shorthand(i) = p {
            self.ids.push(i.to_id());
        }
    }

    fn visit_jsx_element(&mut self, jsx: &JSXElement) {
        fn leftmost_id(e: &JSXMemberExpr) -> Id {
            match &e.obj {
                JSXObject::Ident(i) => i.to_id(),
                JSXObject::JSXMemberExpr(e) => leftmost_id(e),
            }
        }

        match &jsx.opening.name {
            JSXElementName::Ident(i) => self.ids.push(i.to_id()),
            JSXElementName::JSXMemberExpr(e) => self.ids.push(leftmost_id(e)),
            _ => {}
        }

        jsx.visit_children_with(self);
    }
}
