//! C5 §4.5.5: uninstrumentable HTTP methods.
//!
//! `reqwest::get`/`reqwest::Client::new().get(..).send()` one-shot forms have
//! no client/builder value a caller can attach middleware to. No tracing
//! context is needed; this runs once per top-level function regardless of
//! whether it is traced, exactly as spec.md states.

use syn::spanned::Spanned;
use syn::{Expr, Stmt};

use crate::callgraph::statement_expr;
use crate::edit::EditList;

const COMMENT: &str = "// txninject: this call cannot be instrumented: it builds and\n\
     // sends a request in one step, with no client value to attach\n\
     // tracing middleware to. See telemetry-agent's HTTP guide.\n";

const ONE_SHOT_METHODS: &[&str] = &["get", "post", "post_form", "head"];

fn unwrap(expr: &Expr) -> &Expr {
    match expr {
        Expr::Await(a) => unwrap(&a.base),
        Expr::Try(t) => unwrap(&t.expr),
        Expr::Paren(p) => unwrap(&p.expr),
        other => other,
    }
}

fn is_free_function_call(expr: &Expr) -> bool {
    let Expr::Call(call) = unwrap(expr) else { return false };
    let Expr::Path(p) = &*call.func else { return false };
    let segs: Vec<String> = p.path.segments.iter().map(|s| s.ident.to_string()).collect();
    segs.len() == 2 && segs[0] == "reqwest" && ONE_SHOT_METHODS.contains(&segs[1].as_str())
}

/// `reqwest::Client::new().get(url).send()`: a client built and used
/// inline, never bound to a name, so there is nothing for the client
/// rewriter (§4.5.3) to have attached middleware to.
fn is_inline_client_chain(expr: &Expr) -> bool {
    let Expr::MethodCall(send) = unwrap(expr) else { return false };
    if send.method != "send" {
        return false;
    }
    let Expr::MethodCall(one_shot) = unwrap(&send.receiver) else { return false };
    if !ONE_SHOT_METHODS.contains(&one_shot.method.to_string().as_str()) {
        return false;
    }
    let Expr::Call(ctor) = unwrap(&one_shot.receiver) else { return false };
    let Expr::Path(p) = &*ctor.func else { return false };
    let segs: Vec<String> = p.path.segments.iter().map(|s| s.ident.to_string()).collect();
    segs == ["reqwest", "Client", "new"]
}

pub fn rewrite(edits: &mut EditList, stmt: &Stmt) -> bool {
    let Some(expr) = statement_expr(stmt) else { return false };
    if !is_free_function_call(expr) && !is_inline_client_chain(expr) {
        return false;
    }
    let start = stmt.span().byte_range().start;
    edits.insert_before(start, COMMENT);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn flags_free_function_get() {
        let stmt: Stmt = parse_quote! { let resp = reqwest::get(url).await; };
        let mut edits = EditList::new();
        assert!(rewrite(&mut edits, &stmt));
    }

    #[test]
    fn flags_inline_client_chain() {
        let stmt: Stmt = parse_quote! { let resp = reqwest::Client::new().get(url).send().await; };
        let mut edits = EditList::new();
        assert!(rewrite(&mut edits, &stmt));
    }

    #[test]
    fn ignores_bound_client_calls() {
        let stmt: Stmt = parse_quote! { let resp = client.get(url).send().await; };
        let mut edits = EditList::new();
        assert!(!rewrite(&mut edits, &stmt));
    }
}
