use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};

use crate::{BackendError, Converter};

/// Gotenberg's Chromium HTML conversion route.
pub const GOTENBERG_HTML_ROUTE: &str = "/forms/chromium/convert/html";

/// Longest collaborator error body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

/// Builds the client shared by every HTTP collaborator.
pub fn build_client(timeout: Duration) -> Result<Client, BackendError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| BackendError::request("http client", e))
}

/// Posts rendered HTML as a multipart `files` upload named `index.html`.
#[derive(Debug, Clone)]
pub struct HttpConverter {
    client: Client,
    endpoint: String,
    name: String,
}

impl HttpConverter {
    pub fn new(client: Client, endpoint: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            name: name.into(),
        }
    }

    /// HTML to PDF through a Gotenberg instance at `base_url`.
    pub fn gotenberg(client: Client, base_url: &str) -> Self {
        Self::new(client, join_url(base_url, GOTENBERG_HTML_ROUTE), "gotenberg")
    }

    /// HTML to DOCX through an office conversion service.
    pub fn office(client: Client, base_url: &str, route: &str) -> Self {
        Self::new(client, join_url(base_url, route), "office converter")
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Converter for HttpConverter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn convert(&self, html: &str) -> Result<Vec<u8>, BackendError> {
        let part = Part::bytes(html.as_bytes().to_vec())
            .file_name("index.html")
            .mime_str("text/html")
            .map_err(|e| BackendError::request(&self.name, e))?;
        let form = Form::new().part("files", part);

        log::info!("Sending {} bytes of HTML to {} ({})", html.len(), self.name, self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| BackendError::request(&self.name, e))?;
        read_success(&self.name, response).await
    }
}

pub(crate) fn join_url(base: &str, route: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        route.trim_start_matches('/')
    )
}

/// Body bytes of a 2xx response; any other status becomes an error carrying
/// the start of the collaborator's body.
pub(crate) async fn read_success(service: &str, response: Response) -> Result<Vec<u8>, BackendError> {
    let status = response.status();
    if !status.is_success() {
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        log::warn!("{} returned status {}", service, status.as_u16());
        return Err(BackendError::Status {
            service: service.to_string(),
            status: status.as_u16(),
            body,
        });
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| BackendError::request(service, e))?;
    log::info!("{} returned {} bytes", service, bytes.len());
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://g:3000/", "/forms/x"), "http://g:3000/forms/x");
        assert_eq!(join_url("http://g:3000", "forms/x"), "http://g:3000/forms/x");
    }

    #[test]
    fn test_gotenberg_endpoint() {
        let client = Client::new();
        let converter = HttpConverter::gotenberg(client, "http://localhost:3100");
        assert_eq!(
            converter.endpoint(),
            "http://localhost:3100/forms/chromium/convert/html"
        );
        assert_eq!(converter.name(), "gotenberg");
    }
}
