use serde_json::{Map, Value};
use stencil_ooxml::{NodeId, Package, XmlDocument};
use stencil_placeholder::{Diagnostics, TokenSyntax, fill_text};

use crate::MarkupError;

const DOCUMENT_PART: &str = "word/document.xml";

/// The structural areas of a document, in the order they are filled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Region {
    /// Paragraphs of the main body outside any table.
    Body,
    /// One `word/header*.xml` part.
    Header(String),
    /// One `word/footer*.xml` part.
    Footer(String),
    /// Paragraphs inside body tables.
    Tables,
}

impl Region {
    pub fn label(&self) -> &str {
        match self {
            Region::Body => "body",
            Region::Header(part) | Region::Footer(part) => part,
            Region::Tables => "tables",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilledDocument {
    pub bytes: Vec<u8>,
    pub diagnostics: Diagnostics,
    /// Regions in the order they were visited.
    pub regions: Vec<Region>,
}

/// Fills every region of a `.docx` template.
pub fn fill_document(
    template: &[u8],
    data: &Map<String, Value>,
) -> Result<FilledDocument, MarkupError> {
    let mut package = Package::read(template)?;
    if !package.contains(DOCUMENT_PART) {
        return Err(MarkupError::NotADocument(DOCUMENT_PART.to_string()));
    }
    let mut diagnostics = Diagnostics::new();
    let mut regions = Vec::new();

    let mut document = package.xml_part(DOCUMENT_PART)?;
    let (body_runs, table_runs) = split_body_runs(&document);

    let mut changed = fill_runs(&mut document, &body_runs, data, &mut diagnostics, Region::Body.label());
    regions.push(Region::Body);

    for part in parts_with_prefix(&package, "word/header") {
        fill_part(&mut package, &part, data, &mut diagnostics)?;
        regions.push(Region::Header(part));
    }
    for part in parts_with_prefix(&package, "word/footer") {
        fill_part(&mut package, &part, data, &mut diagnostics)?;
        regions.push(Region::Footer(part));
    }

    changed += fill_runs(&mut document, &table_runs, data, &mut diagnostics, Region::Tables.label());
    regions.push(Region::Tables);

    if changed > 0 {
        package.set_xml_part(DOCUMENT_PART, &document);
    }

    log::info!(
        "Filled document: {} regions, {} unresolved placeholders",
        regions.len(),
        diagnostics.len()
    );
    Ok(FilledDocument {
        bytes: package.to_bytes()?,
        diagnostics,
        regions,
    })
}

/// Runs of the body, split into those outside and inside tables.
fn split_body_runs(doc: &XmlDocument) -> (Vec<NodeId>, Vec<NodeId>) {
    let Some(root) = doc.root_element() else {
        return (Vec::new(), Vec::new());
    };
    let Some(body) = doc.first_child_named(root, "w:body") else {
        return (Vec::new(), Vec::new());
    };
    doc.descendants_named(body, "w:r")
        .into_iter()
        .partition(|&r| doc.ancestor_named(r, "w:tbl").is_none())
}

/// `word/header1.xml`, `word/header2.xml`, ... in numeric order.
fn parts_with_prefix(package: &Package, prefix: &str) -> Vec<String> {
    let mut parts: Vec<String> = package
        .part_names()
        .filter(|n| n.starts_with(prefix) && n.ends_with(".xml") && !n[prefix.len()..].contains('/'))
        .map(str::to_string)
        .collect();
    parts.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    parts
}

fn fill_part(
    package: &mut Package,
    part: &str,
    data: &Map<String, Value>,
    diagnostics: &mut Diagnostics,
) -> Result<(), MarkupError> {
    let mut doc = package.xml_part(part)?;
    let runs = match doc.root_element() {
        Some(root) => doc.descendants_named(root, "w:r"),
        None => Vec::new(),
    };
    if fill_runs(&mut doc, &runs, data, diagnostics, part) > 0 {
        package.set_xml_part(part, &doc);
    }
    Ok(())
}

/// Substitutes placeholders in each run. Returns how many runs changed.
pub fn fill_runs(
    doc: &mut XmlDocument,
    runs: &[NodeId],
    data: &Map<String, Value>,
    diagnostics: &mut Diagnostics,
    location: &str,
) -> usize {
    let mut changed = 0;
    for &run in runs {
        let texts: Vec<NodeId> = doc.children_named(run, "w:t").collect();
        let Some(&first) = texts.first() else {
            continue;
        };
        let text: String = texts.iter().map(|&t| doc.text(t)).collect();
        if !text.contains('{') {
            continue;
        }
        let filled = fill_text(&text, TokenSyntax::Markup, data, diagnostics, location);
        if filled == text {
            continue;
        }
        let filled = filled.into_owned();
        doc.set_text(first, filled);
        doc.set_attr(first, "xml:space", "preserve");
        for &extra in &texts[1..] {
            doc.detach(extra);
        }
        changed += 1;
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fill_runs_merges_text_and_keeps_properties() {
        let mut doc = XmlDocument::parse(
            r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Dear {</w:t><w:t>name}</w:t></w:r><w:r><w:t>static</w:t></w:r></w:p>"#,
        )
        .unwrap();
        let root = doc.root_element().unwrap();
        let runs = doc.descendants_named(root, "w:r");
        let data = json!({ "name": "Ann" });
        let mut d = Diagnostics::new();

        let changed = fill_runs(&mut doc, &runs, data.as_object().unwrap(), &mut d, "body");
        assert_eq!(changed, 1);
        assert_eq!(
            doc.node_to_string(root),
            r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">Dear Ann</w:t></w:r><w:r><w:t>static</w:t></w:r></w:p>"#
        );
    }

    #[test]
    fn test_split_body_runs() {
        let doc = XmlDocument::parse(
            r#"<w:document><w:body><w:p><w:r><w:t>a</w:t></w:r></w:p><w:tbl><w:tr><w:tc><w:p><w:r><w:t>b</w:t></w:r></w:p></w:tc></w:tr></w:tbl></w:body></w:document>"#,
        )
        .unwrap();
        let (body, tables) = split_body_runs(&doc);
        assert_eq!(body.len(), 1);
        assert_eq!(tables.len(), 1);
        assert_eq!(doc.text(body[0]), "a");
        assert_eq!(doc.text(tables[0]), "b");
    }

    #[test]
    fn test_region_labels() {
        assert_eq!(Region::Body.label(), "body");
        assert_eq!(Region::Header("word/header1.xml".into()).label(), "word/header1.xml");
    }
}
