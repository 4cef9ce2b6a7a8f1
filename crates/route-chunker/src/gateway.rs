//! AST Gateway (spec §4.1): parse/print, the structural-equivalence
//! primitive the Chunk/Main Emitters use to locate "the same" statement in a
//! freshly parsed AST copy, and the binding table backing `scopeBinding`.

use rustc_hash::FxHashMap;
use serde::Serialize;
use swc_core::common::{FileName, SourceMap, sync::Lrc};
use swc_core::ecma::ast::*;
use swc_core::ecma::codegen::{Config as CodegenConfig, Emitter, text_writer::JsWriter};
use swc_core::ecma::parser::{Lexer, Parser, StringInput, Syntax, TsSyntax};

use crate::error::ChunkError;

/// Opaque printer-options record, forwarded unchanged to the codegen
/// backend. Participates in emitter cache keys via its `Serialize` impl
/// (spec §6) but never in analysis cache keys (design notes:
/// "printer-option coupling").
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrinterOptions {
    pub minify: bool,
    pub ascii_only: bool,
    pub target: EcmaTarget,
}

impl Default for PrinterOptions {
    fn default() -> Self {
        Self {
            minify: false,
            ascii_only: false,
            target: EcmaTarget::EsNext,
        }
    }
}

impl PrinterOptions {
    /// Canonical serialization used to fold these options into a composite
    /// cache key. Two structurally equal option sets always produce the same
    /// string.
    pub fn cache_fragment(&self) -> String {
        serde_json::to_string(self).expect("PrinterOptions is always serializable")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EcmaTarget {
    Es5,
    Es2015,
    Es2020,
    EsNext,
}

impl From<EcmaTarget> for EsVersion {
    fn from(target: EcmaTarget) -> Self {
        match target {
            EcmaTarget::Es5 => EsVersion::Es5,
            EcmaTarget::Es2015 => EsVersion::Es2015,
            EcmaTarget::Es2020 => EsVersion::Es2020,
            EcmaTarget::EsNext => EsVersion::EsNext,
        }
    }
}

fn module_syntax() -> Syntax {
    // The corpus this analyzer runs over is route modules: plain JS, JSX, or
    // TSX. TypeScript-with-tsx is a strict syntactic superset of the other
    // two, so parsing everything with it keeps the gateway single-shot.
    Syntax::Typescript(TsSyntax {
        tsx: true,
        decorators: true,
        ..Default::default()
    })
}

/// Parses `source` into a module AST. Each call produces an AST that is
/// entirely independent of any other parse of the same text — no shared
/// interning, no shared arena — which is what lets emitters "parse a fresh
/// copy" per spec §4.5/§4.6 without any risk of mutating something the
/// Analyzer or the cache still holds.
pub fn parse(source: &str) -> Result<Module, ChunkError> {
    let cm: Lrc<SourceMap> = Default::default();
    let fm = cm.new_source_file(Lrc::new(FileName::Anon), source.to_string());

    let lexer = Lexer::new(
        module_syntax(),
        EsVersion::EsNext,
        StringInput::from(&*fm),
        None,
    );
    let mut parser = Parser::new_from(lexer);

    parser
        .parse_module()
        .map_err(|err| ChunkError::Parse(format!("{err:?}")))
}

/// Serializes `module` back to source text using `options`.
pub fn generate(module: &Module, options: &PrinterOptions) -> Result<String, ChunkError> {
    let cm: Lrc<SourceMap> = Default::default();
    let mut buf = Vec::new();

    {
        let mut emitter = Emitter {
            cfg: CodegenConfig::default()
                .with_target(options.target.into())
                .with_minify(options.minify)
                .with_ascii_only(options.ascii_only),
            cm: cm.clone(),
            comments: None,
            wr: JsWriter::new(cm.clone(), "\n", &mut buf, None),
        };
        emitter
            .emit_module(module)
            .map_err(|err| ChunkError::Parse(format!("failed to print module: {err:?}")))?;
    }

    String::from_utf8(buf).map_err(|err| ChunkError::Parse(format!("non-utf8 output: {err}")))
}

/// Deep equivalence of two top-level statements, ignoring source positions
/// and comments (spec §4.1). Implemented by printing each node with a fixed,
/// minimal configuration and comparing the resulting text: two statements
/// that print identically are, for chunking purposes, the same statement.
/// As the design notes observe, this is weaker than a true structural walk
/// (two textually-identical-but-distinct statements are indistinguishable),
/// but real top-level code is rarely byte-identical across declarations, and
/// it sidesteps needing two independently-parsed ASTs to share any syntax
/// context/hygiene state.
pub fn structural_equals(a: &ModuleItem, b: &ModuleItem) -> bool {
    print_item(a) == print_item(b)
}

fn print_item(item: &ModuleItem) -> String {
    let module = Module {
        span: swc_core::common::DUMMY_SP,
        body: vec![item.clone()],
        shebang: None,
    };
    generate(&module, &PrinterOptions::default()).unwrap_or_default()
}

/// A binding's identity after `resolver()`: (local name, syntax context).
/// Shadowing two bindings of the same name in different scopes always
/// produces distinct `Id`s, so identifier resolution here is exact rather
/// than textual (design notes, "Scope binding requirement").
pub type Id = swc_core::ecma::ast::Id;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Import,
    Local,
}

/// `scopeBinding(path) -> declarationPath | none` (spec §4.1), backed by a
/// flat map from resolved `Id` to the top-level statement index that
/// declares it. Built once per analysis over a resolved module body and
/// queried by the Analyzer while it walks dependency chains outward from an
/// export's seeds.
#[derive(Debug, Default)]
pub struct BindingTable {
    bindings: FxHashMap<Id, (usize, BindingKind)>,
}

impl BindingTable {
    pub fn build(body: &[ModuleItem]) -> Self {
        let mut bindings = FxHashMap::default();

        for (idx, item) in body.iter().enumerate() {
            match item {
                ModuleItem::ModuleDecl(ModuleDecl::Import(import)) => {
                    for specifier in &import.specifiers {
                        let local = match specifier {
                            ImportSpecifier::Named(s) => &s.local,
                            ImportSpecifier::Default(s) => &s.local,
                            ImportSpecifier::Namespace(s) => &s.local,
                        };
                        bindings.insert(local.to_id(), (idx, BindingKind::Import));
                    }
                }
                ModuleItem::Stmt(Stmt::Decl(decl))
                | ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(ExportDecl { decl, .. })) => {
                    index_decl(decl, idx, &mut bindings);
                }
                _ => {}
            }
        }

        Self { bindings }
    }

    /// Looks up the declaring top-level statement for a resolved binding
    /// identity. Returns `None` for parameters, block-scoped locals, and
    /// globals/builtins — anything that isn't a top-level declaration.
    pub fn scope_binding(&self, id: &Id) -> Option<(usize, BindingKind)> {
        self.bindings.get(id).copied()
    }
}

fn index_decl(decl: &Decl, idx: usize, bindings: &mut FxHashMap<Id, (usize, BindingKind)>) {
    match decl {
        Decl::Fn(f) => {
            bindings.insert(f.ident.to_id(), (idx, BindingKind::Local));
        }
        Decl::Class(c) => {
            bindings.insert(c.ident.to_id(), (idx, BindingKind::Local));
        }
        Decl::Var(var_decl) => {
            for declarator in &var_decl.decls {
                for id in collect_pat_idents(&declarator.name) {
                    bindings.insert(id, (idx, BindingKind::Local));
                }
            }
        }
        _ => {}
    }
}

pub fn collect_pat_idents(pat: &Pat) -> Vec<Id> {
    let mut ids = Vec::new();
    collect_pat_idents_into(pat, &mut ids);
    ids
}

fn collect_pat_idents_into(pat: &Pat, ids: &mut Vec<Id>) {
    match pat {
        Pat::Ident(b) => ids.push(b.id.to_id()),
        Pat::Array(arr) => {
            for elem in arr.elems.iter().flatten() {
                collect_pat_idents_into(elem, ids);
            }
        }
        Pat::Object(obj) => {
            for prop in &obj.props {
                match prop {
                    ObjectPatProp::KeyValue(kv) => collect_pat_idents_into(&kv.value, ids),
                    ObjectPatProp::Assign(a) => ids.push(a.key.to_id()),
                    ObjectPatProp::Rest(r) => collect_pat_idents_into(&r.arg, ids),
                }
            }
        }
        Pat::Rest(r) => collect_pat_idents_into(&r.arg, ids),
        Pat::Assign(a) => collect_pat_idents_into(&a.left, ids),
        Pat::Expr(_) | Pat::Invalid(_) => {}
    }
}
