use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an alternative configuration file.
pub const CONFIG_ENV: &str = "STENCIL_CONFIG";

const DEFAULT_CONFIG: &str = "config/default";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub templates: TemplatesConfig,
    #[serde(default)]
    pub backends: BackendsConfig,
    #[serde(default)]
    pub strategies: StrategiesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplatesConfig {
    #[serde(default = "default_template_dir")]
    pub dir: PathBuf,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            dir: default_template_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendsConfig {
    #[serde(default = "default_gotenberg_url")]
    pub gotenberg_url: String,
    #[serde(default = "default_office_url")]
    pub office_url: String,
    #[serde(default = "default_office_route")]
    pub office_route: String,
    #[serde(default = "default_template_service_url")]
    pub template_service_url: String,
    #[serde(default = "default_soffice_path")]
    pub soffice_path: PathBuf,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl BackendsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            gotenberg_url: default_gotenberg_url(),
            office_url: default_office_url(),
            office_route: default_office_route(),
            template_service_url: default_template_service_url(),
            soffice_path: default_soffice_path(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// How `.docx` output is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocxStrategy {
    /// Render the HTML template and post it to the office conversion service.
    OfficeService,
    /// Render the HTML template and convert it with a local `soffice`.
    LocalProcess,
    /// Fill `<code>.docx` in process.
    #[default]
    NativeTemplate,
    /// Send `<code>.docx` and the data to the remote templating service.
    RemoteTemplate,
}

/// How `.xlsx` output is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XlsxStrategy {
    /// Fill `<code>.xlsx` in process.
    #[default]
    NativeTemplate,
    /// Send `<code>.xlsx` and the data to the remote templating service.
    RemoteTemplate,
    /// Render the HTML template and lay it out on a fresh sheet.
    HtmlLayout,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct StrategiesConfig {
    #[serde(default)]
    pub docx: DocxStrategy,
    #[serde(default)]
    pub xlsx: XlsxStrategy,
}

fn default_template_dir() -> PathBuf {
    PathBuf::from("./templates")
}

fn default_gotenberg_url() -> String {
    "http://localhost:3100".to_string()
}

fn default_office_url() -> String {
    "http://localhost:3200".to_string()
}

fn default_office_route() -> String {
    "/convert/docx".to_string()
}

fn default_template_service_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_soffice_path() -> PathBuf {
    PathBuf::from("soffice")
}

fn default_timeout_secs() -> u64 {
    60
}

impl Config {
    /// Loads configuration from `path`, else `$STENCIL_CONFIG`, else an
    /// optional `config/default.toml`, with `STENCIL__*` environment
    /// variables layered on top.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_ENV).ok().filter(|p| !p.is_empty()).map(PathBuf::from));
        builder = match explicit {
            Some(file) => {
                log::info!("Loading configuration from {}", file.display());
                builder.add_source(config::File::from(file))
            }
            None => builder.add_source(config::File::with_name(DEFAULT_CONFIG).required(false)),
        };

        builder = builder.add_source(config::Environment::with_prefix("STENCIL").separator("__"));
        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let config = Config::default();
        assert_eq!(config.templates.dir, PathBuf::from("./templates"));
        assert_eq!(config.backends.gotenberg_url, "http://localhost:3100");
        assert_eq!(config.backends.timeout(), Duration::from_secs(60));
        assert_eq!(config.strategies.docx, DocxStrategy::NativeTemplate);
        assert_eq!(config.strategies.xlsx, XlsxStrategy::NativeTemplate);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[templates]
dir = "/srv/templates"

[backends]
gotenberg_url = "http://gotenberg:3000"
timeout_secs = 5

[strategies]
docx = "local_process"
xlsx = "html_layout"
"#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.templates.dir, PathBuf::from("/srv/templates"));
        assert_eq!(config.backends.gotenberg_url, "http://gotenberg:3000");
        assert_eq!(config.backends.timeout_secs, 5);
        assert_eq!(config.backends.soffice_path, PathBuf::from("soffice"));
        assert_eq!(config.strategies.docx, DocxStrategy::LocalProcess);
        assert_eq!(config.strategies.xlsx, XlsxStrategy::HtmlLayout);
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[strategies]\ndocx = \"carrier_pigeon\"").unwrap();
        assert!(Config::load(Some(file.path())).is_err());
    }
}
