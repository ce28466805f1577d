//! C5 §4.5.3: HTTP client construction.
//!
//! Retargeted from "pointer-to-`*http.Client`" onto `reqwest::Client`. No
//! transaction context is needed here: this rewriter runs once per
//! top-level function regardless of whether that function is being traced.

use syn::spanned::Spanned;
use syn::{Local, Pat};

use crate::edit::EditList;
use crate::oracle::TypeOracle;

fn bound_name(local: &Local) -> Option<String> {
    match &local.pat {
        Pat::Ident(id) => Some(id.ident.to_string()),
        Pat::Type(pt) => match &*pt.pat {
            Pat::Ident(id) => Some(id.ident.to_string()),
            _ => None,
        },
        _ => None,
    }
}

/// `true` iff `local` binds a single identifier whose resolved type is
/// `reqwest::Client` (by ascription, as `reqwest::Client::new()`/`::builder()`
/// would already have been recorded in `oracle` by the caller's
/// `observe_let`).
pub fn rewrite(edits: &mut EditList, local: &Local, oracle: &TypeOracle) -> bool {
    let Some(name) = bound_name(local) else { return false };
    let Some(ty) = oracle.type_of(&name) else { return false };
    if ty != "reqwest::Client" {
        return false;
    }

    let stmt_end = local.span().byte_range().end;
    edits.insert_after(
        stmt_end,
        format!(
            "\n    let {name} = reqwest_middleware::ClientBuilder::new({name}).with(telemetry::TracingMiddleware::new()).build();"
        ),
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn wraps_client_binding_with_tracing_middleware() {
        let local: Local = parse_quote! { let client = reqwest::Client::new(); };
        let mut oracle = TypeOracle::new();
        oracle.observe_let(&local);

        let mut edits = EditList::new();
        assert!(rewrite(&mut edits, &local, &oracle));

        let src = "let client = reqwest::Client::new();";
        let out = edits.apply(src);
        assert!(out.contains("reqwest_middleware::ClientBuilder::new(client)"));
        assert!(out.contains("telemetry::TracingMiddleware::new()"));
    }

    #[test]
    fn ignores_unrelated_bindings() {
        let local: Local = parse_quote! { let count = 0; };
        let oracle = TypeOracle::new();
        let mut edits = EditList::new();
        assert!(!rewrite(&mut edits, &local, &oracle));
    }
}
