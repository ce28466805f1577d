//! C5 §4.5.4: outbound calls.
//!
//! Go's `client.Do(req)` takes an explicit, already-built request value and
//! returns `(*Response, error)`; `reqwest::Client::execute(request)` is the
//! direct analog (unlike the builder's `.get(url).send()` shorthand, which
//! has no standalone request value to wrap). Runs only inside
//! [`crate::tracing_engine`]'s traversal, where a transaction is in scope.

use syn::spanned::Spanned;
use syn::{Expr, ExprMethodCall, Local, Pat, Stmt};

use crate::callgraph::statement_expr;
use crate::edit::EditList;

fn unwrap(expr: &Expr) -> &Expr {
    match expr {
        Expr::Await(a) => unwrap(&a.base),
        Expr::Try(t) => unwrap(&t.expr),
        Expr::Paren(p) => unwrap(&p.expr),
        other => other,
    }
}

fn is_inline_client(expr: &Expr) -> bool {
    let Expr::Call(call) = unwrap(expr) else { return false };
    let Expr::Path(p) = &*call.func else { return false };
    let segs: Vec<String> = p.path.segments.iter().map(|s| s.ident.to_string()).collect();
    segs == ["reqwest", "Client", "new"]
}

/// Finds a `.execute(<request>)` call anywhere in `expr`'s own method chain
/// (not descending into its arguments), and says whether the receiver is an
/// inline, never-bound client.
fn find_execute<'e>(expr: &'e Expr) -> Option<(&'e ExprMethodCall, bool)> {
    let Expr::MethodCall(mc) = unwrap(expr) else { return None };
    if mc.method != "execute" || mc.args.len() != 1 {
        return None;
    }
    Some((mc, is_inline_client(&mc.receiver)))
}

/// The simple identifier a `Local` binds, if any: used to recognize "this
/// statement captures the response" (spec.md §4.5.4's `responseVar`).
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

pub fn rewrite(edits: &mut EditList, stmt: &Stmt, txn_var: &str) -> bool {
    let Some(expr) = statement_expr(stmt) else { return false };
    let Some((call, is_default)) = find_execute(expr) else { return false };

    use quote::ToTokens;
    let request_text = call.args[0].to_token_stream().to_string();
    let start = stmt.span().byte_range().start;
    let end = stmt.span().byte_range().end;

    if is_default {
        edits.insert_before(
            start,
            format!("let segment = telemetry::start_external_segment(&{txn_var}, &{request_text});\n    "),
        );
        let response_var = match stmt {
            Stmt::Local(local) => bound_name(local),
            _ => None,
        };
        let mut tail = String::new();
        if let Some(resp) = response_var {
            tail.push_str(&format!("\n    segment.set_response(&{resp});"));
        }
        tail.push_str("\n    segment.end();");
        edits.insert_after(end, tail);
    } else {
        edits.insert_before(start, format!("{request_text} = telemetry::request_with_transaction({request_text}, &{txn_var});\n    "));
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn wraps_inline_client_execute_with_segment() {
        let stmt: Stmt = parse_quote! { let resp = reqwest::Client::new().execute(req).await; };
        let mut edits = EditList::new();
        assert!(rewrite(&mut edits, &stmt, "nrTxn"));

        let src = "let resp = reqwest::Client::new().execute(req).await;";
        let out = edits.apply(src);
        assert!(out.contains("start_external_segment(&nrTxn, &req)"));
        assert!(out.contains("segment.set_response(&resp)"));
        assert!(out.contains("segment.end()"));
    }

    #[test]
    fn wraps_named_client_execute_with_request_rewrite() {
        let stmt: Stmt = parse_quote! { let resp = client.execute(req).await; };
        let mut edits = EditList::new();
        assert!(rewrite(&mut edits, &stmt, "nrTxn"));

        let src = "let resp = client.execute(req).await;";
        let out = edits.apply(src);
        assert!(out.contains("req = telemetry::request_with_transaction(req, &nrTxn);"));
    }

    #[test]
    fn ignores_unrelated_statements() {
        let stmt: Stmt = parse_quote! { let x = 1 + 1; };
        let mut edits = EditList::new();
        assert!(!rewrite(&mut edits, &stmt, "nrTxn"));
    }
}
