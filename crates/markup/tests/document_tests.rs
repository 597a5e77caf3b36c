use serde_json::{Map, Value, json};
use stencil_markup::{MarkupError, Region, fill_document};
use stencil_ooxml::Package;

type TestResult = Result<(), Box<dyn std::error::Error>>;

const W: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main""#;

fn run(text: &str) -> String {
    format!(r#"<w:r><w:rPr><w:i/></w:rPr><w:t>{text}</w:t></w:r>"#)
}

fn docx() -> Vec<u8> {
    let body = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document {W}><w:body><w:p>{}</w:p><w:tbl><w:tr><w:tc><w:p>{}</w:p></w:tc></w:tr></w:tbl><w:p>{}</w:p><w:sectPr/></w:body></w:document>"#,
        run("Invoice for {{ client.name }}"),
        run("{ missing.cell }"),
        run("Total: {total}"),
    );
    let header = format!(r#"<w:hdr {W}><w:p>{}</w:p></w:hdr>"#, run("{{ nope }}"));
    let footer = format!(r#"<w:ftr {W}><w:p>{}</w:p></w:ftr>"#, run("Page for {client.name}"));

    let mut package = Package::new();
    package.set_part("[Content_Types].xml", b"<Types/>".to_vec());
    package.set_part("word/document.xml", body.into_bytes());
    package.set_part("word/footer1.xml", footer.into_bytes());
    package.set_part("word/header1.xml", header.into_bytes());
    package.set_part("word/media/logo.png", vec![0x89, b'P', b'N', b'G']);
    package.to_bytes().expect("fixture package")
}

fn data() -> Map<String, Value> {
    match json!({ "client": { "name": "Acme" }, "total": 42 }) {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn part_text(bytes: &[u8], part: &str) -> Result<String, Box<dyn std::error::Error>> {
    let package = Package::read(bytes)?;
    let data = package.part(part).ok_or("missing part")?;
    Ok(String::from_utf8(data.to_vec())?)
}

#[test]
fn test_every_region_is_filled() -> TestResult {
    let _ = env_logger::builder().is_test(true).try_init();

    let out = fill_document(&docx(), &data())?;
    let document = part_text(&out.bytes, "word/document.xml")?;
    assert!(document.contains(r#"<w:t xml:space="preserve">Invoice for Acme</w:t>"#));
    assert!(document.contains("Total: 42"));
    assert!(document.contains("<w:rPr><w:i/></w:rPr>"));
    assert!(document.contains("{ missing.cell }"));

    let footer = part_text(&out.bytes, "word/footer1.xml")?;
    assert!(footer.contains("Page for Acme"));
    let header = part_text(&out.bytes, "word/header1.xml")?;
    assert!(header.contains("{{ nope }}"));
    Ok(())
}

#[test]
fn test_regions_visited_in_order() -> TestResult {
    let _ = env_logger::builder().is_test(true).try_init();

    let out = fill_document(&docx(), &data())?;
    assert_eq!(
        out.regions,
        vec![
            Region::Body,
            Region::Header("word/header1.xml".to_string()),
            Region::Footer("word/footer1.xml".to_string()),
            Region::Tables,
        ]
    );
    let warned: Vec<(&str, &str)> = out
        .diagnostics
        .warnings()
        .iter()
        .map(|w| (w.key.as_str(), w.location.as_str()))
        .collect();
    assert_eq!(
        warned,
        vec![("nope", "word/header1.xml"), ("missing.cell", "tables")]
    );
    Ok(())
}

#[test]
fn test_untouched_parts_are_preserved() -> TestResult {
    let _ = env_logger::builder().is_test(true).try_init();

    let out = fill_document(&docx(), &data())?;
    let package = Package::read(&out.bytes)?;
    assert_eq!(
        package.part("word/media/logo.png"),
        Some(&[0x89, b'P', b'N', b'G'][..])
    );
    let original = Package::read(&docx())?;
    assert_eq!(
        package.part("word/header1.xml"),
        original.part("word/header1.xml")
    );
    Ok(())
}

#[test]
fn test_refill_is_noop() -> TestResult {
    let _ = env_logger::builder().is_test(true).try_init();

    let full = match json!({ "client": { "name": "Acme" }, "total": 42, "nope": "n", "missing": { "cell": "c" } }) {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    let once = fill_document(&docx(), &full)?;
    assert!(once.diagnostics.is_empty());
    let twice = fill_document(&once.bytes, &full)?;
    assert!(twice.diagnostics.is_empty());
    for part in ["word/document.xml", "word/header1.xml", "word/footer1.xml"] {
        assert_eq!(part_text(&once.bytes, part)?, part_text(&twice.bytes, part)?);
    }
    Ok(())
}

#[test]
fn test_package_without_document_part_is_rejected() -> TestResult {
    let mut package = Package::new();
    package.set_part("xl/workbook.xml", b"<workbook/>".to_vec());
    let err = fill_document(&package.to_bytes()?, &data()).unwrap_err();
    assert!(matches!(err, MarkupError::NotADocument(_)));
    Ok(())
}
