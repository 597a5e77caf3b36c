use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde_json::{Map, Value};
use stencil_types::{TemplateCode, TemplateKind};

use crate::BackendError;
use crate::http::{join_url, read_success};

const SERVICE: &str = "template service";

/// Client for a remote templating service that fills `.docx` and `.xlsx`
/// templates itself.
///
/// The template goes up as a multipart `template` file, the data as a `data`
/// form field holding JSON; the route is `/<ext>/render`.
#[derive(Debug, Clone)]
pub struct TemplateServiceClient {
    client: Client,
    base_url: String,
}

impl TemplateServiceClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn endpoint(&self, kind: TemplateKind) -> String {
        join_url(&self.base_url, &format!("/{}/render", kind.extension()))
    }

    pub async fn render(
        &self,
        code: &TemplateCode,
        kind: TemplateKind,
        template: Vec<u8>,
        data: &Map<String, Value>,
    ) -> Result<Vec<u8>, BackendError> {
        let json = serde_json::to_string(data)?;
        let part = Part::bytes(template).file_name(code.file_name(kind));
        let form = Form::new().part("template", part).text("data", json);

        let endpoint = self.endpoint(kind);
        log::info!("Sending template {} to {}", code, endpoint);
        let response = self
            .client
            .post(&endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| BackendError::request(SERVICE, e))?;
        read_success(SERVICE, response).await
    }
}
