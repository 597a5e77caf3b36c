use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::{BackendError, Converter};

/// HTML to DOCX through a local headless office binary (`soffice`).
///
/// Each conversion gets its own temporary work area holding the input file
/// and the output directory; both are removed when the conversion ends.
#[derive(Debug, Clone)]
pub struct ProcessConverter {
    binary: PathBuf,
    timeout: Duration,
}

impl ProcessConverter {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

#[async_trait]
impl Converter for ProcessConverter {
    fn name(&self) -> &str {
        "office process"
    }

    async fn convert(&self, html: &str) -> Result<Vec<u8>, BackendError> {
        let work = tempfile::tempdir()?;
        let input = work.path().join("document.html");
        let outdir = work.path().join("out");
        tokio::fs::write(&input, html).await?;
        tokio::fs::create_dir(&outdir).await?;

        log::info!("Running {} on {}", self.binary.display(), input.display());
        let child = Command::new(&self.binary)
            .arg("--headless")
            .arg("--convert-to")
            .arg("docx")
            .arg(&input)
            .arg("--outdir")
            .arg(&outdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => return Err(BackendError::Timeout(self.binary.display().to_string())),
        };
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(BackendError::Process(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                output.status,
                stderr
            )));
        }

        let produced = find_docx(&outdir).await?.ok_or_else(|| {
            BackendError::Process(format!("no .docx file was produced, stderr: {}", stderr))
        })?;
        let bytes = tokio::fs::read(&produced).await?;
        log::info!("{} produced {} bytes", self.binary.display(), bytes.len());
        Ok(bytes)
    }
}

async fn find_docx(dir: &Path) -> Result<Option<PathBuf>, BackendError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "docx") {
            return Ok(Some(path));
        }
    }
    Ok(None)
}
