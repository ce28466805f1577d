//! C5 §4.5.2: HTTP-handler function detection.
//!
//! Go's handler shape is a fixed two-parameter signature
//! (`http.ResponseWriter`, `*http.Request`); axum's raw-request handler form
//! is the direct analog: a function taking (optionally after a `State<_>`
//! extractor) an `axum::http::Request<axum::body::Body>`.

use once_cell::sync::Lazy;
use regex::Regex;
use syn::{FnArg, Pat, Signature};

use crate::oracle::type_to_string;

/// Matches a (possibly path-qualified) `Request<...Body...>` suffix. A
/// plain `.contains` pair can't tell `Request<SomeBodyLikeThing>` apart
/// from the real extractor, nor require `Request` to actually be the outer
/// type rather than a substring buried in an unrelated generic; anchoring
/// on the closing `>` and requiring `Body` to appear between the brackets
/// is what the handler shape actually looks like regardless of how many
/// module segments `type_to_string` printed in front of it.
static REQUEST_BODY_TYPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(^|::)Request<[^<>]*Body[^<>]*>$").unwrap());

fn looks_like_request_type(ty: &str) -> bool {
    REQUEST_BODY_TYPE.is_match(ty)
}

/// `true` if `sig` matches the recognized handler shape.
pub fn is_handler(sig: &Signature) -> bool {
    sig.inputs.iter().any(|arg| match arg {
        FnArg::Typed(pt) => looks_like_request_type(&type_to_string(&pt.ty)),
        FnArg::Receiver(_) => false,
    })
}

/// The identifier bound to the request parameter, used to emit
/// `req.extensions()` in the `FromContext` retrieval. Falls back to `req`
/// when the parameter isn't a simple identifier pattern (destructured
/// extractors aren't common for the raw-request parameter itself).
pub fn request_binding(sig: &Signature) -> String {
    for arg in &sig.inputs {
        if let FnArg::Typed(pt) = arg {
            if looks_like_request_type(&type_to_string(&pt.ty)) {
                if let Pat::Ident(id) = &*pt.pat {
                    return id.ident.to_string();
                }
            }
        }
    }
    "req".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn recognizes_raw_request_handler() {
        let sig: Signature = parse_quote! { async fn handler(req: axum::http::Request<axum::body::Body>) -> impl IntoResponse };
        assert!(is_handler(&sig));
        assert_eq!(request_binding(&sig), "req");
    }

    #[test]
    fn recognizes_handler_with_state_extractor() {
        let sig: Signature =
            parse_quote! { async fn handler(State(db): State<Pool>, req: Request<Body>) -> impl IntoResponse };
        assert!(is_handler(&sig));
    }

    #[test]
    fn rejects_unrelated_signature() {
        let sig: Signature = parse_quote! { fn helper(n: i32) -> i32 };
        assert!(!is_handler(&sig));
    }
}
