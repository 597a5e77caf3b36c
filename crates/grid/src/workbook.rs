use stencil_ooxml::{Package, XmlDocument};

use crate::sheet::{Sheet, rich_text};
use crate::GridError;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const CALC_CHAIN_PART: &str = "xl/calcChain.xml";
const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

/// The shared string table, read once per workbook.
#[derive(Debug, Clone, Default)]
pub struct SharedStrings {
    strings: Vec<String>,
}

impl SharedStrings {
    pub fn parse(bytes: &[u8]) -> Result<Self, GridError> {
        let doc = XmlDocument::parse_bytes(bytes)?;
        let strings = match doc.root_element() {
            Some(root) => doc
                .children_named(root, "si")
                .map(|si| rich_text(&doc, si))
                .collect(),
            None => Vec::new(),
        };
        Ok(Self { strings })
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.strings.get(idx).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetEntry {
    pub name: String,
    pub part: String,
}

/// An opened `.xlsx` package with its sheet list resolved.
#[derive(Debug)]
pub struct Workbook {
    package: Package,
    sheets: Vec<SheetEntry>,
    shared: SharedStrings,
}

impl Workbook {
    pub fn open(bytes: &[u8]) -> Result<Self, GridError> {
        let package = Package::read(bytes)?;
        let sheets = sheet_entries(&package)?;
        let shared = match package.part(SHARED_STRINGS_PART) {
            Some(data) => SharedStrings::parse(data)?,
            None => SharedStrings::default(),
        };
        log::debug!(
            "Opened workbook with {} sheets and {} shared strings",
            sheets.len(),
            shared.len()
        );
        Ok(Self {
            package,
            sheets,
            shared,
        })
    }

    pub fn sheets(&self) -> &[SheetEntry] {
        &self.sheets
    }

    pub fn shared_strings(&self) -> &SharedStrings {
        &self.shared
    }

    pub fn load_sheet(&self, entry: &SheetEntry) -> Result<Sheet, GridError> {
        let data = self
            .package
            .part(&entry.part)
            .ok_or_else(|| GridError::Structure(format!("missing sheet part {}", entry.part)))?;
        Sheet::parse(entry.name.clone(), entry.part.clone(), data)
    }

    /// Puts a sheet back. Unmodified sheets keep their original bytes.
    pub fn store_sheet(&mut self, sheet: &Sheet) {
        if sheet.is_modified() {
            self.package.set_part(sheet.part(), sheet.to_bytes());
        }
    }

    /// Removes the calculation chain so the spreadsheet application rebuilds
    /// it. Needed once any formula cell has moved.
    pub fn drop_calc_chain(&mut self) -> Result<(), GridError> {
        if !self.package.remove_part(CALC_CHAIN_PART) {
            return Ok(());
        }
        if self.package.contains(CONTENT_TYPES_PART) {
            let mut types = self.package.xml_part(CONTENT_TYPES_PART)?;
            if let Some(root) = types.root_element() {
                let stale: Vec<_> = types
                    .children_named(root, "Override")
                    .filter(|&o| types.attr(o, "PartName") == Some("/xl/calcChain.xml"))
                    .collect();
                for o in stale {
                    types.detach(o);
                }
            }
            self.package.set_xml_part(CONTENT_TYPES_PART, &types);
        }
        if self.package.contains(WORKBOOK_RELS_PART) {
            let mut rels = self.package.xml_part(WORKBOOK_RELS_PART)?;
            if let Some(root) = rels.root_element() {
                let stale: Vec<_> = rels
                    .children_named(root, "Relationship")
                    .filter(|&r| {
                        rels.attr(r, "Target")
                            .is_some_and(|t| t.ends_with("calcChain.xml"))
                    })
                    .collect();
                for r in stale {
                    rels.detach(r);
                }
            }
            self.package.set_xml_part(WORKBOOK_RELS_PART, &rels);
        }
        log::debug!("Dropped calcChain after row insertion");
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, GridError> {
        Ok(self.package.to_bytes()?)
    }
}

/// Resolves `<sheet name r:id>` entries through the workbook relationships.
fn sheet_entries(package: &Package) -> Result<Vec<SheetEntry>, GridError> {
    let workbook = package.xml_part(WORKBOOK_PART)?;
    let rels = package.xml_part(WORKBOOK_RELS_PART)?;

    let rel_root = rels
        .root_element()
        .ok_or_else(|| GridError::Structure("empty workbook relationships".to_string()))?;
    let targets: Vec<(String, String)> = rels
        .children_named(rel_root, "Relationship")
        .filter_map(|r| {
            Some((
                rels.attr(r, "Id")?.to_string(),
                rels.attr(r, "Target")?.to_string(),
            ))
        })
        .collect();

    let root = workbook
        .root_element()
        .ok_or_else(|| GridError::Structure("empty workbook part".to_string()))?;
    let mut entries = Vec::new();
    for sheet in workbook.descendants_named(root, "sheet") {
        let name = workbook.attr(sheet, "name").unwrap_or_default().to_string();
        let Some(rid) = workbook.attr(sheet, "r:id") else {
            log::warn!("Sheet '{}' has no relationship id, skipping", name);
            continue;
        };
        let Some((_, target)) = targets.iter().find(|(id, _)| id == rid) else {
            log::warn!("Sheet '{}' points at unknown relationship {}", name, rid);
            continue;
        };
        let part = match target.strip_prefix('/') {
            Some(absolute) => absolute.to_string(),
            None => format!("xl/{}", target),
        };
        entries.push(SheetEntry { name, part });
    }
    Ok(entries)
}
