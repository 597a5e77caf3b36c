//! Token syntaxes and text substitution.

use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::sync::LazyLock;

use crate::{Diagnostics, resolve, value_to_string};

/// One or two braces on each side; the key is anything up to the first `}`.
static MARKUP_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{?\s*([^}]+)\s*\}?\}").expect("BUG: invalid MARKUP_TOKEN_RE regex literal")
});

/// Double braces around a word-character dotted key.
static SCALAR_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([\w.]+)\s*\}\}").expect("BUG: invalid SCALAR_TOKEN_RE regex literal")
});

/// Exactly two segments: `{{ table.field }}`.
static TABLE_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*(\w+)\.(\w+)\s*\}\}").expect("BUG: invalid TABLE_TOKEN_RE regex literal")
});

/// Which placeholder grammar a template format uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSyntax {
    /// `{key}` or `{{ key }}`, key is any text without `}`. Word-processing runs.
    Markup,
    /// `{{ key }}` with a `[\w.]+` key. Spreadsheet cells and HTML templates.
    Scalar,
}

impl TokenSyntax {
    pub fn regex(self) -> &'static Regex {
        match self {
            TokenSyntax::Markup => &MARKUP_TOKEN_RE,
            TokenSyntax::Scalar => &SCALAR_TOKEN_RE,
        }
    }

    /// Cheap pre-check before running the regex.
    pub fn may_contain_token(self, text: &str) -> bool {
        match self {
            TokenSyntax::Markup => text.contains('{'),
            TokenSyntax::Scalar => text.contains("{{"),
        }
    }

    /// Returns the key when `text` (ignoring surrounding whitespace) is exactly
    /// one token.
    pub fn single_token(self, text: &str) -> Option<&str> {
        let trimmed = text.trim();
        let caps = self.regex().captures(trimmed)?;
        let whole = caps.get(0)?;
        if whole.start() == 0 && whole.end() == trimmed.len() {
            caps.get(1).map(|k| k.as_str().trim())
        } else {
            None
        }
    }
}

/// What a lookup decided for one token.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Substitute this text.
    Value(String),
    /// Leave the token for a later pass without reporting it.
    Defer,
    /// Leave the token and report it as unresolved.
    Missing,
}

/// Replaces every token of `syntax` in `text` using `lookup`.
///
/// `lookup` receives the trimmed key. Tokens it does not resolve stay verbatim
/// and, for [`Lookup::Missing`], are reported to `diagnostics`.
pub fn substitute<'t, F>(
    text: &'t str,
    syntax: TokenSyntax,
    diagnostics: &mut Diagnostics,
    location: &str,
    mut lookup: F,
) -> Cow<'t, str>
where
    F: FnMut(&str) -> Lookup,
{
    if !syntax.may_contain_token(text) {
        return Cow::Borrowed(text);
    }
    syntax.regex().replace_all(text, |caps: &Captures| {
        let token = &caps[0];
        let key = caps[1].trim();
        match lookup(key) {
            Lookup::Value(v) => v,
            Lookup::Defer => token.to_string(),
            Lookup::Missing => {
                diagnostics.unresolved(key, token, location);
                token.to_string()
            }
        }
    })
}

/// Substitutes every token with its resolved value from `data`.
pub fn fill_text<'t>(
    text: &'t str,
    syntax: TokenSyntax,
    data: &Map<String, Value>,
    diagnostics: &mut Diagnostics,
    location: &str,
) -> Cow<'t, str> {
    substitute(text, syntax, diagnostics, location, |key| {
        match resolve(data, key) {
            Some(value) => Lookup::Value(value_to_string(value).into_owned()),
            None => Lookup::Missing,
        }
    })
}

/// Every `{{ table.field }}` token in `text` as `(table, field)` pairs.
pub fn table_tokens(text: &str) -> Vec<(&str, &str)> {
    if !text.contains("{{") {
        return Vec::new();
    }
    TABLE_TOKEN_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let table = caps.get(1)?.as_str();
            let field = caps.get(2)?.as_str();
            Some((table, field))
        })
        .collect()
}
