//! The document service: one validated request in, one rendered document out.

use std::sync::Arc;

use serde_json::{Map, Value};
use stencil_backend::{
    Converter, HttpConverter, ProcessConverter, TemplateServiceClient, build_client,
};
use stencil_grid::fill_workbook;
use stencil_html::{layout_workbook, render_template};
use stencil_markup::fill_document;
use stencil_resource::FilesystemTemplateStore;
use stencil_traits::{SharedTemplateData, TemplateStore};
use stencil_types::{
    OutputFormat, RenderRequest, RenderedDocument, TemplateCode, TemplateEntry, TemplateKind,
    ValidatedRequest,
};

use crate::config::{Config, DocxStrategy, StrategiesConfig, XlsxStrategy};
use crate::error::{RenderError, Result};

/// The external collaborators a render may call.
#[derive(Debug, Clone)]
pub struct Backends {
    /// HTML to PDF.
    pub pdf: Arc<dyn Converter>,
    /// HTML to DOCX over HTTP.
    pub office: Arc<dyn Converter>,
    /// HTML to DOCX with a local binary.
    pub process: Arc<dyn Converter>,
    pub remote: TemplateServiceClient,
}

impl Backends {
    /// Builds every collaborator around one shared HTTP client.
    pub fn from_config(config: &Config) -> Result<Self> {
        let backends = &config.backends;
        let client = build_client(backends.timeout())?;
        Ok(Self {
            pdf: Arc::new(HttpConverter::gotenberg(client.clone(), &backends.gotenberg_url)),
            office: Arc::new(HttpConverter::office(
                client.clone(),
                &backends.office_url,
                &backends.office_route,
            )),
            process: Arc::new(ProcessConverter::new(
                backends.soffice_path.clone(),
                backends.timeout(),
            )),
            remote: TemplateServiceClient::new(client, backends.template_service_url.clone()),
        })
    }
}

#[derive(Debug, Clone)]
pub struct DocumentService {
    store: Arc<dyn TemplateStore>,
    backends: Backends,
    strategies: StrategiesConfig,
}

impl DocumentService {
    pub fn new(store: Arc<dyn TemplateStore>, backends: Backends, strategies: StrategiesConfig) -> Self {
        Self {
            store,
            backends,
            strategies,
        }
    }

    /// A service over the configured template directory and collaborators.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = FilesystemTemplateStore::new(&config.templates.dir);
        log::info!(
            "Templates from {} (docx: {:?}, xlsx: {:?})",
            config.templates.dir.display(),
            config.strategies.docx,
            config.strategies.xlsx
        );
        Ok(Self::new(
            Arc::new(store),
            Backends::from_config(config)?,
            config.strategies,
        ))
    }

    pub fn strategies(&self) -> StrategiesConfig {
        self.strategies
    }

    /// Every template the store can serve.
    pub fn list_templates(&self) -> Result<Vec<TemplateEntry>> {
        Ok(self.store.list()?)
    }

    /// Renders one request.
    ///
    /// Validation happens before any template is loaded or any collaborator
    /// is called.
    pub async fn render(&self, request: RenderRequest) -> Result<RenderedDocument> {
        let ValidatedRequest { code, format, data } = request.validate()?;
        log::info!("Rendering template '{}' as {}", code, format);

        let bytes = match format {
            OutputFormat::Html => self.render_html(&code, &data)?.into_bytes(),
            OutputFormat::Pdf => {
                let html = self.render_html(&code, &data)?;
                self.backends.pdf.convert(&html).await?
            }
            OutputFormat::Docx => match self.strategies.docx {
                DocxStrategy::OfficeService => {
                    let html = self.render_html(&code, &data)?;
                    self.backends.office.convert(&html).await?
                }
                DocxStrategy::LocalProcess => {
                    let html = self.render_html(&code, &data)?;
                    self.backends.process.convert(&html).await?
                }
                DocxStrategy::NativeTemplate => {
                    let template = self.load(&code, TemplateKind::Docx)?;
                    blocking(move || {
                        let filled = fill_document(&template, &data)?;
                        Ok(filled.bytes)
                    })
                    .await?
                }
                DocxStrategy::RemoteTemplate => {
                    let template = self.load(&code, TemplateKind::Docx)?;
                    self.backends
                        .remote
                        .render(&code, TemplateKind::Docx, template.to_vec(), &data)
                        .await?
                }
            },
            OutputFormat::Xlsx => match self.strategies.xlsx {
                XlsxStrategy::NativeTemplate => {
                    let template = self.load(&code, TemplateKind::Xlsx)?;
                    blocking(move || {
                        let filled = fill_workbook(&template, &data)?;
                        Ok(filled.bytes)
                    })
                    .await?
                }
                XlsxStrategy::RemoteTemplate => {
                    let template = self.load(&code, TemplateKind::Xlsx)?;
                    self.backends
                        .remote
                        .render(&code, TemplateKind::Xlsx, template.to_vec(), &data)
                        .await?
                }
                XlsxStrategy::HtmlLayout => {
                    let html = self.render_html(&code, &data)?;
                    blocking(move || Ok(layout_workbook(&html)?)).await?
                }
            },
        };

        let filename = format!("{}.{}", code, format.extension());
        log::info!("Rendered {} ({} bytes)", filename, bytes.len());
        Ok(RenderedDocument::new(bytes, format, filename))
    }

    fn load(&self, code: &TemplateCode, kind: TemplateKind) -> Result<SharedTemplateData> {
        Ok(self.store.load(code, kind)?)
    }

    fn render_html(&self, code: &TemplateCode, data: &Map<String, Value>) -> Result<String> {
        let template = self.load(code, TemplateKind::Html)?;
        let text = std::str::from_utf8(&template)
            .map_err(|e| RenderError::TemplateEncoding(e.to_string()))?;
        Ok(render_template(text, data)?.html)
    }
}

/// Runs a CPU-bound fill on the blocking pool.
async fn blocking<F>(work: F) -> Result<Vec<u8>>
where
    F: FnOnce() -> Result<Vec<u8>> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| RenderError::Worker(e.to_string()))?
}
