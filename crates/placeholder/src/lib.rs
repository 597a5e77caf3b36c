//! Placeholder tokens and the scalar resolver shared by every fill engine.
//!
//! A placeholder is `{{ key }}` (or `{ key }` in word-processing templates)
//! where `key` is a plain name or a dotted path into the request data. The
//! engines differ only in which token syntax they accept and in what they do
//! with a cell or run once the text is substituted; resolution, formatting and
//! diagnostics live here.

pub mod diagnostics;
pub mod resolve;
pub mod token;

pub use diagnostics::{Diagnostics, Warning};
pub use resolve::{resolve, resolve_in, value_to_string};
pub use token::{Lookup, TokenSyntax, fill_text, substitute, table_tokens};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fill_nested_scalar() {
        let data = json!({ "client": { "name": "Acme" } });
        let map = data.as_object().unwrap();
        let mut diags = Diagnostics::new();
        let out = fill_text("{{ client.name }}", TokenSyntax::Scalar, map, &mut diags, "A1");
        assert_eq!(out, "Acme");
        assert!(diags.is_empty());
    }

    #[test]
    fn test_unresolved_token_kept_with_one_warning() {
        let data = json!({});
        let map = data.as_object().unwrap();
        let mut diags = Diagnostics::new();
        let out = fill_text("{{ foo.bar }}", TokenSyntax::Scalar, map, &mut diags, "A1");
        assert_eq!(out, "{{ foo.bar }}");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags.warnings()[0].key, "foo.bar");
    }

    #[test]
    fn test_refill_is_noop() {
        let data = json!({ "a": "x", "b": { "c": 2 }, "d": null });
        let map = data.as_object().unwrap();
        let mut diags = Diagnostics::new();
        let once = fill_text(
            "{a} and {{ b.c }} then {{d}}.",
            TokenSyntax::Markup,
            map,
            &mut diags,
            "body",
        )
        .into_owned();
        let twice = fill_text(&once, TokenSyntax::Markup, map, &mut diags, "body");
        assert_eq!(once, "x and 2 then .");
        assert_eq!(twice, once);
        assert!(diags.is_empty());
    }
}
