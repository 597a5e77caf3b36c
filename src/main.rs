use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use stencil::{Config, DocumentService, RenderError, RenderRequest, RequestError};

#[derive(Parser)]
#[command(name = "stencil")]
#[command(about = "Render documents from templates and JSON data")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, env = "STENCIL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one request file
    Render {
        /// JSON file holding `{code, format, data}`
        request: PathBuf,

        /// Directory the document is written to
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// List available templates
    Templates,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.to_body());
            log::error!("{} (status {})", e, e.status_code());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), RenderError> {
    let config = Config::load(cli.config.as_deref())?;
    let service = DocumentService::from_config(&config)?;

    match cli.command {
        Commands::Render { request, out } => render(&service, &request, &out).await,
        Commands::Templates => {
            for entry in service.list_templates()? {
                println!("{}\t{}", entry.name, entry.format);
            }
            Ok(())
        }
    }
}

async fn render(service: &DocumentService, request: &Path, out: &Path) -> Result<(), RenderError> {
    let json = std::fs::read_to_string(request).map_err(|e| {
        RequestError::Malformed(format!("{}: {}", request.display(), e))
    })?;
    let request = RenderRequest::from_json(&json)?;
    let document = service.render(request).await?;

    let path = out.join(document.filename());
    std::fs::create_dir_all(out)?;
    std::fs::write(&path, document.bytes())?;
    println!(
        "{} ({}, {} bytes)",
        path.display(),
        document.content_type(),
        document.len()
    );
    Ok(())
}
