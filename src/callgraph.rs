//! C2: call-graph indexer.
//!
//! A loaded package is flat: every free `fn` across every loaded file
//! shares one namespace, exactly like functions inside one Go package. The
//! indexer's only job is therefore to map `name -> (file, item)` and, given
//! a call expression, say whether its callee is one of those names.

use indexmap::IndexMap;
use syn::{Expr, Item, Stmt};

use crate::error::{InstrumentError, Result};
use crate::loader::LoadedPackage;

#[derive(Debug, Clone, Copy)]
pub struct FunctionLocation {
    pub file: usize,
    pub item: usize,
}

#[derive(Debug, Default)]
pub struct CallGraph {
    functions: IndexMap<String, FunctionLocation>,
}

impl CallGraph {
    pub fn build(pkg: &LoadedPackage) -> Self {
        let mut functions = IndexMap::new();
        for (file_idx, file) in pkg.files.iter().enumerate() {
            for (item_idx, item) in file.ast.items.iter().enumerate() {
                if let Item::Fn(f) = item {
                    // "Duplicate names within a package inherit the last
                    // declaration", defensive, matches spec.md §4.2.
                    functions.insert(f.sig.ident.to_string(), FunctionLocation { file: file_idx, item: item_idx });
                }
            }
        }
        Self { functions }
    }

    pub fn verify_entrypoint(&self) -> Result<()> {
        if self.functions.contains_key("main") {
            Ok(())
        } else {
            Err(InstrumentError::NoEntrypoint)
        }
    }

    pub fn location_of(&self, name: &str) -> Option<FunctionLocation> {
        self.functions.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names_in_source_order(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(|s| s.as_str())
    }
}

/// Descends into `expr` but not into nested block bodies, looking for the
/// outermost call expression, unwrapping `?`, `.await` and parens along
/// the way, since none of those change which function is actually called.
pub fn outermost_call(expr: &Expr) -> Option<&syn::ExprCall> {
    match expr {
        Expr::Call(call) => Some(call),
        Expr::Try(t) => outermost_call(&t.expr),
        Expr::Await(a) => outermost_call(&a.base),
        Expr::Paren(p) => outermost_call(&p.expr),
        _ => None,
    }
}

/// The expression a statement is "about", for the handful of rewriters that
/// don't care whether a call sits bare (`f();`), bound (`let x = f();`) or
/// reassigned (`x = f();`): all three are "the same statement shape" as
/// far as C4/C5 are concerned.
pub fn statement_expr(stmt: &Stmt) -> Option<&Expr> {
    match stmt {
        Stmt::Local(local) => local.init.as_ref().map(|i| &*i.expr),
        Stmt::Expr(Expr::Assign(a), _) => Some(&a.right),
        Stmt::Expr(expr, _) => Some(expr),
        _ => None,
    }
}

/// `resolve_invocation` from spec.md §4.2: given a call expression, return
/// the name of the callee if (and only if) it is an unqualified identifier
/// naming a function in this package's `decls`.
pub fn resolve_invocation<'a>(call: &syn::ExprCall, graph: &'a CallGraph) -> Option<(&'a str, FunctionLocation)> {
    let Expr::Path(p) = &*call.func else { return None };
    if p.path.segments.len() != 1 {
        // A qualified path (`other_pkg::func`) is, by construction, not in
        // the loaded package's flat namespace.
        return None;
    }
    let name = p.path.segments[0].ident.to_string();
    graph.functions.get_key_value(&name).map(|(k, v)| (k.as_str(), *v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PackageSelector;
    use std::fs;
    use std::io::Write;

    fn load_src(src: &str) -> (tempfile::TempDir, LoadedPackage) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        let mut f = fs::File::create(dir.path().join("src/main.rs")).unwrap();
        write!(f, "{src}").unwrap();
        let pkg = crate::loader::load(dir.path(), &PackageSelector::Here).unwrap();
        (dir, pkg)
    }

    fn first_stmt_call(pkg: &LoadedPackage) -> &syn::ExprCall {
        let Item::Fn(main_fn) = &pkg.files[0].ast.items[0] else { panic!("expected a fn") };
        let syn::Stmt::Expr(expr, _) = &main_fn.block.stmts[0] else { panic!("expected an expr stmt") };
        outermost_call(expr).expect("expected a call expression")
    }

    #[test]
    fn finds_main_and_fails_without_it() {
        let (_dir, pkg) = load_src("fn helper() {}\n");
        let graph = CallGraph::build(&pkg);
        assert!(graph.verify_entrypoint().is_err());

        let (_dir, pkg) = load_src("fn main() {}\n");
        let graph = CallGraph::build(&pkg);
        assert!(graph.verify_entrypoint().is_ok());
    }

    #[test]
    fn resolves_unqualified_call_to_local_function() {
        let (_dir, pkg) = load_src("fn main() { helper(); }\nfn helper() {}\n");
        let graph = CallGraph::build(&pkg);

        let call = first_stmt_call(&pkg);
        let (name, _loc) = resolve_invocation(call, &graph).unwrap();
        assert_eq!(name, "helper");
    }

    #[test]
    fn qualified_path_never_resolves() {
        let (_dir, pkg) = load_src("fn main() { other::helper(); }\n");
        let graph = CallGraph::build(&pkg);

        let call = first_stmt_call(&pkg);
        assert!(resolve_invocation(call, &graph).is_none());
    }
}
