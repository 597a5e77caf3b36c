use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{OutputFormat, TemplateCode};

/// Errors for requests that can never be rendered as sent.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RequestError {
    #[error("malformed request: {0}")]
    Malformed(String),

    #[error("unsupported format '{0}'")]
    UnsupportedFormat(String),

    #[error("invalid template code '{0}'")]
    InvalidCode(String),

    #[error("request data must be a JSON object, got {0}")]
    DataNotObject(&'static str),
}

/// The inbound request exactly as it arrives on the wire.
///
/// `format` stays a plain string here so that an unknown format surfaces as
/// [`RequestError::UnsupportedFormat`] instead of a generic decode error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderRequest {
    pub code: String,
    pub format: String,
    #[serde(default)]
    pub data: Value,
}

impl RenderRequest {
    pub fn new(code: impl Into<String>, format: impl Into<String>, data: Value) -> Self {
        Self {
            code: code.into(),
            format: format.into(),
            data,
        }
    }

    /// Builds a request from any serializable payload.
    ///
    /// The payload is pushed through the generic JSON model, so anything that
    /// is not a tree of maps, sequences and scalars is rejected here.
    pub fn from_serializable<T: Serialize>(
        code: impl Into<String>,
        format: impl Into<String>,
        payload: &T,
    ) -> Result<Self, RequestError> {
        let data =
            serde_json::to_value(payload).map_err(|e| RequestError::Malformed(e.to_string()))?;
        Ok(Self::new(code, format, data))
    }

    pub fn from_json(json: &str) -> Result<Self, RequestError> {
        serde_json::from_str(json).map_err(|e| RequestError::Malformed(e.to_string()))
    }

    /// Checks the request and converts it into its typed form.
    pub fn validate(self) -> Result<ValidatedRequest, RequestError> {
        let code = TemplateCode::from(self.code.trim().to_string());
        if !code.is_valid() {
            return Err(RequestError::InvalidCode(self.code));
        }
        let format: OutputFormat = self.format.parse()?;
        let data = match self.data {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => return Err(RequestError::DataNotObject(value_kind(&other))),
        };
        Ok(ValidatedRequest { code, format, data })
    }
}

/// A request that passed validation. Owned by a single render call.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub code: TemplateCode,
    pub format: OutputFormat,
    pub data: Map<String, Value>,
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_ok() {
        let req = RenderRequest::new("statement", "xlsx", json!({ "name": "Acme" }));
        let valid = req.validate().unwrap();
        assert_eq!(valid.code.as_str(), "statement");
        assert_eq!(valid.format, OutputFormat::Xlsx);
        assert_eq!(valid.data.get("name"), Some(&json!("Acme")));
    }

    #[test]
    fn test_validate_missing_data_is_empty_object() {
        let req = RenderRequest::from_json(r#"{"code":"a","format":"html"}"#).unwrap();
        let valid = req.validate().unwrap();
        assert!(valid.data.is_empty());
    }

    #[test]
    fn test_validate_rejects_unsupported_format() {
        let req = RenderRequest::new("a", "odt", json!({}));
        assert_eq!(
            req.validate().unwrap_err(),
            RequestError::UnsupportedFormat("odt".into())
        );
    }

    #[test]
    fn test_validate_rejects_non_object_data() {
        let req = RenderRequest::new("a", "pdf", json!([1, 2]));
        assert_eq!(
            req.validate().unwrap_err(),
            RequestError::DataNotObject("an array")
        );
    }

    #[test]
    fn test_validate_rejects_bad_code() {
        let req = RenderRequest::new("../etc/passwd", "html", json!({}));
        assert!(matches!(
            req.validate().unwrap_err(),
            RequestError::InvalidCode(_)
        ));
    }

    #[test]
    fn test_malformed_json() {
        let err = RenderRequest::from_json("{ not json").unwrap_err();
        assert!(matches!(err, RequestError::Malformed(_)));
    }

    #[derive(Serialize)]
    struct Statement {
        #[serde(rename = "clientName")]
        client_name: String,
        rows: Vec<Row>,
    }

    #[derive(Serialize)]
    struct Row {
        desc: String,
        amt: f64,
    }

    #[test]
    fn test_from_serializable_struct_becomes_nested_map() {
        let payload = Statement {
            client_name: "Jane".into(),
            rows: vec![Row {
                desc: "coffee".into(),
                amt: 3.5,
            }],
        };
        let req = RenderRequest::from_serializable("s", "xlsx", &payload).unwrap();
        assert_eq!(
            req.data,
            json!({ "clientName": "Jane", "rows": [{ "desc": "coffee", "amt": 3.5 }] })
        );
    }

    #[test]
    fn test_from_serializable_rejects_non_string_keys() {
        let mut payload = std::collections::HashMap::new();
        payload.insert((1, 2), "tuple key");
        let err = RenderRequest::from_serializable("s", "xlsx", &payload).unwrap_err();
        assert!(matches!(err, RequestError::Malformed(_)));
    }
}
