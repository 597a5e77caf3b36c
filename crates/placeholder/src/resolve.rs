use serde_json::{Map, Value};
use std::borrow::Cow;

/// Looks up a dotted key in the request data.
///
/// Every segment but the last must land on an object; the last segment's
/// value is returned untouched. Returns `None` when a segment is missing or
/// an intermediate value is not an object.
pub fn resolve<'a>(data: &'a Map<String, Value>, dotted_key: &str) -> Option<&'a Value> {
    let mut segments = dotted_key.split('.');
    let first = segments.next()?;
    let mut current = data.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Same as [`resolve`] but rooted at an arbitrary value, which must be an
/// object for anything to be found.
pub fn resolve_in<'a>(root: &'a Value, dotted_key: &str) -> Option<&'a Value> {
    resolve(root.as_object()?, dotted_key)
}

/// Default textual form of a resolved value.
///
/// Strings are verbatim, numbers use their JSON form, `null` is empty, and
/// arrays and objects are compact JSON.
pub fn value_to_string(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s),
        Value::Null => Cow::Borrowed(""),
        Value::Bool(true) => Cow::Borrowed("true"),
        Value::Bool(false) => Cow::Borrowed("false"),
        Value::Number(n) => Cow::Owned(n.to_string()),
        Value::Array(_) | Value::Object(_) => Cow::Owned(value.to_string()),
    }
}
