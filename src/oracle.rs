//! The type-resolution oracle from spec.md §3/§4.1.
//!
//! A real `go/types`-style oracle needs a full type checker; Rust has one
//! (`rustc`), but it isn't embeddable here. This oracle is deliberately
//! best-effort: it resolves the handful of shapes the rewriters in
//! [`crate::http`] and [`crate::tracing_engine`] actually need: local
//! variable types from explicit ascriptions or recognized constructor
//! calls, and a function's parameter/return types straight from its
//! `syn::Signature`. Anything else resolves to `None`, which callers treat
//! as spec.md §7's `unresolved-type`: skip that rewrite site, keep going.

use std::collections::HashMap;

use quote::ToTokens;
use syn::{FnArg, Local, Pat, ReturnType, Signature, Type};

/// Print a `syn::Type` back to a single-line textual path, e.g.
/// `reqwest::Client` or `Result<Response, Error>`.
pub fn type_to_string(ty: &Type) -> String {
    ty.to_token_stream().to_string().replace(' ', "")
}

fn expr_type_string(expr: &syn::Expr) -> Option<String> {
    ctor_type(expr)
}

/// Recognize a handful of "constructor calls whose return type we happen to
/// know" shapes: `Type::new(...)`, `Type::default()`, and `&Type { .. }` /
/// `Type { .. }` struct literals. This is the oracle's only source of type
/// inference; everything else requires an explicit ascription.
fn ctor_type(expr: &syn::Expr) -> Option<String> {
    match expr {
        syn::Expr::Call(call) => {
            if let syn::Expr::Path(p) = &*call.func {
                let segs = &p.path.segments;
                if segs.len() >= 2 {
                    let last = segs.last().unwrap();
                    if last.ident == "new" || last.ident == "default" || last.ident == "builder" {
                        let owner: Vec<String> =
                            segs[..segs.len() - 1].iter().map(|s| s.ident.to_string()).collect();
                        return Some(owner.join("::"));
                    }
                }
            }
            None
        }
        syn::Expr::MethodCall(mc) => {
            // `reqwest::Client::builder().build().unwrap()` and similar
            // chains resolve to the receiver's constructor type when the
            // method is a passthrough (`build`, `unwrap`, `expect`).
            if matches!(mc.method.to_string().as_str(), "build" | "unwrap" | "expect") {
                return expr_type_string(&mc.receiver);
            }
            None
        }
        syn::Expr::Reference(r) => ctor_type(&r.expr),
        syn::Expr::Struct(s) => Some(
            s.path
                .segments
                .iter()
                .map(|s| s.ident.to_string())
                .collect::<Vec<_>>()
                .join("::"),
        ),
        syn::Expr::Await(a) => ctor_type(&a.base),
        _ => None,
    }
}

/// Per-function local type environment, rebuilt fresh for each top-level
/// function since Rust scoping is function-local and this crate never needs
/// to reason about a variable across function boundaries.
#[derive(Debug, Default)]
pub struct TypeOracle {
    bindings: HashMap<String, String>,
}

impl TypeOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the environment with a function's own parameters (needed to
    /// recognize e.g. a handler's `req: Request<Body>` parameter).
    pub fn seed_from_signature(&mut self, sig: &Signature) {
        for arg in &sig.inputs {
            if let FnArg::Typed(pt) = arg {
                if let Pat::Ident(id) = &*pt.pat {
                    self.bindings.insert(id.ident.to_string(), type_to_string(&pt.ty));
                }
            }
        }
    }

    /// Observe a `let` statement, recording the bound name's type if it can
    /// be determined from an ascription or a recognized constructor call.
    pub fn observe_let(&mut self, local: &Local) {
        let name = match &local.pat {
            Pat::Ident(id) => id.ident.to_string(),
            Pat::Type(pt) => {
                if let Pat::Ident(id) = &*pt.pat {
                    self.bindings.insert(id.ident.to_string(), type_to_string(&pt.ty));
                }
                return;
            }
            _ => return,
        };

        if let Some(init) = &local.init {
            if let Some(ty) = expr_type_string(&init.expr) {
                self.bindings.insert(name, ty);
            }
        }
    }

    pub fn type_of(&self, name: &str) -> Option<&str> {
        self.bindings.get(name).map(|s| s.as_str())
    }
}

/// `true` if `ty` is textually `Result<..>` (spec.md §4.4.2 step 3's "right
/// hand side ... returns an error type").
pub fn is_result_type(ty: &str) -> bool {
    ty.starts_with("Result<") || ty.starts_with("std::result::Result<") || ty.starts_with("::std::result::Result<")
}

pub fn return_type_string(sig: &Signature) -> Option<String> {
    match &sig.output {
        ReturnType::Default => None,
        ReturnType::Type(_, ty) => Some(type_to_string(ty)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn recognizes_explicit_ascription() {
        let local: Local = parse_quote! { let client: reqwest::Client = make_client(); };
        let mut oracle = TypeOracle::new();
        oracle.observe_let(&local);
        assert_eq!(oracle.type_of("client"), Some("reqwest::Client"));
    }

    #[test]
    fn infers_constructor_call() {
        let local: Local = parse_quote! { let client = reqwest::Client::new(); };
        let mut oracle = TypeOracle::new();
        oracle.observe_let(&local);
        assert_eq!(oracle.type_of("client"), Some("reqwest::Client"));
    }

    #[test]
    fn infers_struct_literal() {
        let local: Local = parse_quote! { let client = Client { timeout: None }; };
        let mut oracle = TypeOracle::new();
        oracle.observe_let(&local);
        assert_eq!(oracle.type_of("client"), Some("Client"));
    }

    #[test]
    fn result_return_type_detected() {
        let sig: Signature = parse_quote! { fn do_thing() -> Result<String, std::io::Error> };
        let ty = return_type_string(&sig).unwrap();
        assert!(is_result_type(&ty));
    }
}
