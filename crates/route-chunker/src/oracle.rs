//! Chunkability Oracle (spec §4.4).

use rustc_hash::FxHashSet;

use crate::analyzer::{self, ExportDependencies};
use crate::error::ChunkError;

/// Operation `isChunkable(source, exportName) -> bool` (spec §4.4).
///
/// Absence of `export_name` from the file's Export Dependencies is a normal,
/// silent `false` (spec §7 point 3) — never an error.
pub fn is_chunkable(source: &str, export_name: &str) -> Result<bool, ChunkError> {
    let deps = analyzer::analyze(source)?;
    Ok(is_chunkable_in(&deps, export_name))
}

/// Same decision, operating on an already-computed [`ExportDependencies`] so
/// callers who need to check several exports in one file only analyze once.
pub fn is_chunkable_in(deps: &ExportDependencies, export_name: &str) -> bool {
    let Some(descriptor) = deps.get(export_name) else {
        return false;
    };

    for (other_name, other) in &deps.exports {
        if other_name == export_name {
            continue;
        }

        if !disjoint(
            &descriptor.top_level_non_module_statements,
            &other.top_level_non_module_statements,
        ) {
            return false;
        }

        if !descriptor.imported_identifier_names.is_empty()
            && !disjoint(
                &descriptor.imported_identifier_names,
                &other.imported_identifier_names,
            )
        {
            return false;
        }
    }

    true
}

/// Set intersection, iterating the smaller set against the larger (spec
/// §4.4, "bounds worst-case to `O(min(|A|,|B|))`").
fn disjoint<T: std::hash::Hash + Eq>(a: &FxHashSet<T>, b: &FxHashSet<T>) -> bool {
    let (smaller, larger) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    smaller.iter().all(|item| !larger.contains(item))
}
