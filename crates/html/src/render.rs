//! Renders HTML templates with Handlebars.
//!
//! Before rendering, the template's mustaches are checked against the request
//! data. A top-level `{{ key }}` whose key is missing, or names a table or
//! record rather than a value, is reported and kept in the output verbatim.
//! Fields read inside `{{#each table}}` are checked against every record.

use std::sync::LazyLock;

use handlebars::Handlebars;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use stencil_placeholder::{Diagnostics, resolve, resolve_in};

use crate::HtmlError;

static PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][\w-]*(\.[A-Za-z_][\w-]*)*$").expect("BUG: invalid PATH_RE regex literal")
});

static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("\u{E000}([0-9]+)\u{E001}").expect("BUG: invalid MARKER_RE regex literal")
});

const LOCATION: &str = "html";

#[derive(Debug, Clone)]
pub struct RenderedHtml {
    pub html: String,
    pub diagnostics: Diagnostics,
}

/// Renders an HTML template against request data.
///
/// Values are HTML-escaped. Unknown tokens never fail the render; they are
/// recorded in the returned diagnostics.
pub fn render_template(
    template: &str,
    data: &Map<String, Value>,
) -> Result<RenderedHtml, HtmlError> {
    let mut diagnostics = Diagnostics::new();
    if !template.contains("{{") {
        return Ok(RenderedHtml {
            html: template.to_string(),
            diagnostics,
        });
    }

    let checked = check_tokens(template, data, &mut diagnostics);
    let registry = Handlebars::new();
    let rendered = registry
        .render_template(&checked.template, data)
        .map_err(|e| HtmlError::Template(e.to_string()))?;
    let html = checked.restore(&rendered);

    log::debug!(
        "Rendered HTML template: {} bytes, {} unresolved",
        html.len(),
        diagnostics.len()
    );
    Ok(RenderedHtml { html, diagnostics })
}

#[derive(Debug, PartialEq)]
enum Mustache<'t> {
    Open { helper: &'t str, param: Option<&'t str> },
    Close,
    Value(&'t str),
    Other,
}

struct Token<'t> {
    start: usize,
    end: usize,
    text: &'t str,
    kind: Mustache<'t>,
}

/// The mustaches of `template` in order. Escaped `\{{` openers are skipped.
fn scan(template: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    while let Some(found) = template[pos..].find("{{") {
        let start = pos + found;
        if template[..start].ends_with('\\') {
            pos = start + 2;
            continue;
        }
        let rest = &template[start..];
        let closer = if rest.starts_with("{{!--") {
            "--}}"
        } else if rest.starts_with("{{{") {
            "}}}"
        } else {
            "}}"
        };
        let Some(len) = rest.find(closer) else {
            break;
        };
        let end = start + len + closer.len();
        let text = &template[start..end];
        tokens.push(Token {
            start,
            end,
            text,
            kind: classify(text),
        });
        pos = end;
    }
    tokens
}

fn classify(text: &str) -> Mustache<'_> {
    let inner = text
        .trim_start_matches('{')
        .trim_end_matches('}')
        .trim()
        .trim_matches('~')
        .trim();
    if let Some(block) = inner.strip_prefix('#').or_else(|| inner.strip_prefix('^')) {
        let mut words = block.split_whitespace();
        return match words.next() {
            Some(helper) => Mustache::Open {
                helper,
                param: words.next(),
            },
            None => Mustache::Other,
        };
    }
    if inner.starts_with('/') {
        return Mustache::Close;
    }
    if inner.contains(char::is_whitespace) || inner == "else" || inner.starts_with(['!', '>', '^']) {
        return Mustache::Other;
    }
    Mustache::Value(inner)
}

/// The data path a mustache reads relative to its context, if it is a plain one.
fn data_path(path: &str) -> Option<&str> {
    let path = path
        .strip_prefix("this.")
        .or_else(|| path.strip_prefix("./"))
        .unwrap_or(path);
    PATH_RE.is_match(path).then_some(path)
}

struct Frame<'t, 'd> {
    each: Option<(&'t str, &'d [Value])>,
}

struct Checked {
    template: String,
    kept: Vec<String>,
}

impl Checked {
    /// Puts the kept tokens back where their markers were rendered.
    fn restore(&self, rendered: &str) -> String {
        if self.kept.is_empty() {
            return rendered.to_string();
        }
        MARKER_RE
            .replace_all(rendered, |caps: &Captures| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| self.kept.get(i))
                    .cloned()
                    .unwrap_or_default()
            })
            .into_owned()
    }
}

fn check_tokens(template: &str, data: &Map<String, Value>, diagnostics: &mut Diagnostics) -> Checked {
    let mut out = String::with_capacity(template.len());
    let mut kept = Vec::new();
    let mut frames: Vec<Frame<'_, '_>> = Vec::new();
    let mut copied = 0;

    for token in scan(template) {
        match token.kind {
            Mustache::Open { helper, param } => {
                let each = match (helper, param.and_then(data_path)) {
                    ("each", Some(path)) if frames.is_empty() => match resolve(data, path) {
                        Some(Value::Array(records)) => Some((path, records.as_slice())),
                        Some(_) => None,
                        None => {
                            diagnostics.unresolved(path, token.text, LOCATION);
                            None
                        }
                    },
                    _ => None,
                };
                frames.push(Frame { each });
            }
            Mustache::Close => {
                frames.pop();
            }
            Mustache::Value(path) => {
                if let Some(root_path) = path.strip_prefix("@root.") {
                    if PATH_RE.is_match(root_path) && !is_scalar(resolve(data, root_path)) {
                        diagnostics.unresolved(root_path, token.text, LOCATION);
                        out.push_str(&template[copied..token.start]);
                        push_marker(&mut out, &mut kept, token.text);
                        copied = token.end;
                    }
                    continue;
                }
                let Some(path) = data_path(path) else {
                    continue;
                };
                match frames.as_slice() {
                    [] => {
                        if !is_scalar(resolve(data, path)) {
                            diagnostics.unresolved(path, token.text, LOCATION);
                            out.push_str(&template[copied..token.start]);
                            push_marker(&mut out, &mut kept, token.text);
                            copied = token.end;
                        }
                    }
                    [Frame {
                        each: Some((table, records)),
                    }] => {
                        for (i, record) in records.iter().enumerate() {
                            if resolve_in(record, path).is_none() {
                                diagnostics.unresolved(
                                    &format!("{}.{}", table, path),
                                    token.text,
                                    &format!("{}[{}]", table, i),
                                );
                            }
                        }
                    }
                    _ => {}
                }
            }
            Mustache::Other => {}
        }
    }
    out.push_str(&template[copied..]);
    Checked {
        template: out,
        kept,
    }
}

fn is_scalar(value: Option<&Value>) -> bool {
    !matches!(value, None | Some(Value::Array(_)) | Some(Value::Object(_)))
}

fn push_marker(out: &mut String, kept: &mut Vec<String>, token: &str) {
    out.push_str(&format!("\u{E000}{}\u{E001}", kept.len()));
    kept.push(token.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn data(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_scalar_substitution() -> TestResult {
        let out = render_template("Hello {{ name }}!", &data(json!({ "name": "World" })))?;
        assert_eq!(out.html, "Hello World!");
        assert!(out.diagnostics.is_empty());
        Ok(())
    }

    #[test]
    fn test_values_are_escaped() -> TestResult {
        let out = render_template(
            "<p>{{ client.name }}</p>",
            &data(json!({ "client": { "name": "Smith & <Sons>" } })),
        )?;
        assert_eq!(out.html, "<p>Smith &amp; &lt;Sons&gt;</p>");
        Ok(())
    }

    #[test]
    fn test_single_braces_are_left_alone() -> TestResult {
        let template = "<style>p { color: red }</style><p>{name}</p>";
        let out = render_template(template, &data(json!({ "name": "x" })))?;
        assert_eq!(out.html, template);
        assert!(out.diagnostics.is_empty());
        Ok(())
    }

    #[test]
    fn test_unresolved_token_is_kept_and_warns() -> TestResult {
        let out = render_template("<p>{{ foo.bar }} / {{ here }}</p>", &data(json!({ "here": 1 })))?;
        assert_eq!(out.html, "<p>{{ foo.bar }} / 1</p>");
        assert_eq!(out.diagnostics.missing_keys(), vec!["foo.bar"]);
        assert_eq!(out.diagnostics.warnings()[0].location, "html");
        Ok(())
    }

    #[test]
    fn test_table_field_outside_a_loop_warns() -> TestResult {
        let out = render_template(
            "<p>{{ rows.desc }}</p><p>{{ rows }}</p>",
            &data(json!({ "rows": [{ "desc": "x" }] })),
        )?;
        assert_eq!(out.html, "<p>{{ rows.desc }}</p><p>{{ rows }}</p>");
        assert_eq!(out.diagnostics.missing_keys(), vec!["rows.desc", "rows"]);
        Ok(())
    }

    #[test]
    fn test_each_repeats_rows_per_record() -> TestResult {
        let template = "<table><tr><th>Item</th></tr>{{#each rows}}<tr><td>{{desc}}</td><td>{{this.amt}}</td><td>{{@root.currency}}</td></tr>{{/each}}</table>";
        let out = render_template(
            template,
            &data(json!({
                "currency": "EUR",
                "rows": [{ "desc": "x", "amt": 1 }, { "desc": "y", "amt": 2 }]
            })),
        )?;
        assert_eq!(
            out.html,
            "<table><tr><th>Item</th></tr><tr><td>x</td><td>1</td><td>EUR</td></tr><tr><td>y</td><td>2</td><td>EUR</td></tr></table>"
        );
        assert!(out.diagnostics.is_empty());
        Ok(())
    }

    #[test]
    fn test_two_tables_in_one_template() -> TestResult {
        let template = "{{#each a}}<i>{{n}}</i>{{/each}}|{{#each b}}<b>{{n}}</b>{{/each}}";
        let out = render_template(
            template,
            &data(json!({ "a": [{ "n": 1 }, { "n": 2 }], "b": [{ "n": 3 }] })),
        )?;
        assert_eq!(out.html, "<i>1</i><i>2</i>|<b>3</b>");
        assert!(out.diagnostics.is_empty());
        Ok(())
    }

    #[test]
    fn test_empty_array_renders_nothing_without_warning() -> TestResult {
        let out = render_template(
            "<table>{{#each rows}}<tr><td>{{desc}}</td></tr>{{/each}}</table>",
            &data(json!({ "rows": [] })),
        )?;
        assert_eq!(out.html, "<table></table>");
        assert!(out.diagnostics.is_empty());
        Ok(())
    }

    #[test]
    fn test_missing_record_field_warns_per_record() -> TestResult {
        let out = render_template(
            "{{#each rows}}<td>{{desc}}</td>{{/each}}",
            &data(json!({ "rows": [{ "desc": "a" }, {}] })),
        )?;
        assert_eq!(out.html, "<td>a</td><td></td>");
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics.warnings()[0].key, "rows.desc");
        assert_eq!(out.diagnostics.warnings()[0].location, "rows[1]");
        Ok(())
    }

    #[test]
    fn test_missing_each_table_warns() -> TestResult {
        let out = render_template("<ul>{{#each items}}<li>{{name}}</li>{{/each}}</ul>", &Map::new())?;
        assert_eq!(out.html, "<ul></ul>");
        assert_eq!(out.diagnostics.missing_keys(), vec!["items"]);
        Ok(())
    }

    #[test]
    fn test_conditionals_are_not_reported() -> TestResult {
        let out = render_template(
            "{{#if note}}<p>{{note}}</p>{{else}}<p>none</p>{{/if}}",
            &Map::new(),
        )?;
        assert_eq!(out.html, "<p>none</p>");
        assert!(out.diagnostics.is_empty());
        Ok(())
    }

    #[test]
    fn test_unbalanced_block_is_an_error() {
        let out = render_template("{{#each rows}}<td>{{desc}}</td>", &Map::new());
        assert!(matches!(out, Err(HtmlError::Template(_))));
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("{{ a.b }}"), Mustache::Value("a.b"));
        assert_eq!(classify("{{{ raw }}}"), Mustache::Value("raw"));
        assert_eq!(classify("{{~ a ~}}"), Mustache::Value("a"));
        assert_eq!(
            classify("{{#each rows}}"),
            Mustache::Open {
                helper: "each",
                param: Some("rows")
            }
        );
        assert_eq!(classify("{{/each}}"), Mustache::Close);
        assert_eq!(classify("{{else}}"), Mustache::Other);
        assert_eq!(classify("{{!-- note --}}"), Mustache::Other);
        assert_eq!(classify("{{upper name}}"), Mustache::Other);
    }
}
