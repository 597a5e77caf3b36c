use std::path::Path;
use std::process::{Command, Output};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn stencil(templates: &Path, args: &[&str]) -> std::io::Result<Output> {
    Command::new(env!("CARGO_BIN_EXE_stencil"))
        .args(args)
        .env("STENCIL__TEMPLATES__DIR", templates)
        .env_remove("STENCIL_CONFIG")
        .env("RUST_LOG", "warn")
        .output()
}

#[test]
fn test_render_writes_named_document() -> TestResult {
    let dir = tempfile::tempdir()?;
    let templates = dir.path().join("templates");
    std::fs::create_dir(&templates)?;
    std::fs::write(templates.join("greeting.html"), "<p>Hello {{ name }}!</p>")?;
    let request = dir.path().join("request.json");
    std::fs::write(
        &request,
        r#"{"code":"greeting","format":"html","data":{"name":"World"}}"#,
    )?;
    let out = dir.path().join("out");

    let output = stencil(
        &templates,
        &["render", request.to_str().ok_or("path")?, "--out", out.to_str().ok_or("path")?],
    )?;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        std::fs::read_to_string(out.join("greeting.html"))?,
        "<p>Hello World!</p>"
    );
    Ok(())
}

#[test]
fn test_failed_render_prints_error_body() -> TestResult {
    let dir = tempfile::tempdir()?;
    let request = dir.path().join("request.json");
    std::fs::write(&request, r#"{"code":"greeting","format":"odt"}"#)?;

    let output = stencil(dir.path(), &["render", request.to_str().ok_or("path")?])?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains(r#"{"error":"unsupported format 'odt'"}"#));
    Ok(())
}

#[test]
fn test_templates_lists_directory() -> TestResult {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("invoice.xlsx"), b"PK")?;
    std::fs::write(dir.path().join("invoice.html"), "<p/>")?;

    let output = stencil(dir.path(), &["templates"])?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert_eq!(stdout, "invoice\thtml\ninvoice\txlsx\n");
    Ok(())
}
