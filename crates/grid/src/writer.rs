//! Writes a fresh single-sheet workbook from laid-out cells.

use std::collections::BTreeMap;

use stencil_ooxml::{Package, XmlDocument};

use crate::cellref::CellRef;
use crate::value::{CellValue, format_number};
use crate::GridError;

/// Style index of the bold cell format in the generated `styles.xml`.
pub const BOLD_STYLE: u32 = 1;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

const SPREADSHEET_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const RELATIONSHIPS_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

#[derive(Debug, Clone, PartialEq)]
pub struct GridCell {
    pub value: CellValue,
    pub bold: bool,
}

impl GridCell {
    pub fn plain(value: CellValue) -> Self {
        Self { value, bold: false }
    }

    pub fn bold(value: CellValue) -> Self {
        Self { value, bold: true }
    }
}

/// A sparse sheet under construction.
#[derive(Debug, Clone)]
pub struct NewSheet {
    name: String,
    cells: BTreeMap<CellRef, GridCell>,
    widths: BTreeMap<u32, f64>,
}

impl NewSheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
            widths: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set(&mut self, at: CellRef, cell: GridCell) {
        self.cells.insert(at, cell);
    }

    pub fn get(&self, at: CellRef) -> Option<&GridCell> {
        self.cells.get(&at)
    }

    pub fn set_width(&mut self, col: u32, width: f64) {
        self.widths.insert(col, width);
    }

    pub fn width(&self, col: u32) -> Option<f64> {
        self.widths.get(&col).copied()
    }

    /// `(max_row, max_col)` over all set cells, `(0, 0)` when empty.
    pub fn used_range(&self) -> (u32, u32) {
        self.cells.keys().fold((0, 0), |(r, c), at| (r.max(at.row), c.max(at.col)))
    }

    /// Cells of one row, ascending by column.
    pub fn row(&self, row: u32) -> Vec<(u32, &GridCell)> {
        self.cells
            .range(CellRef::new(0, row)..CellRef::new(0, row + 1))
            .map(|(at, cell)| (at.col, cell))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn worksheet_xml(&self) -> XmlDocument {
        let mut doc = XmlDocument::new();
        let root = doc.create_element(
            "worksheet",
            vec![
                ("xmlns".to_string(), SPREADSHEET_NS.to_string()),
                ("xmlns:r".to_string(), RELATIONSHIPS_NS.to_string()),
            ],
        );
        let document = doc.document();
        doc.append_child(document, root);

        let (max_row, max_col) = self.used_range();
        let dimension = if max_row == 0 {
            "A1".to_string()
        } else {
            format!("A1:{}", CellRef::new(max_col.max(1), max_row))
        };
        let dim = doc.create_element("dimension", vec![("ref".to_string(), dimension)]);
        doc.append_child(root, dim);

        if !self.widths.is_empty() {
            let cols = doc.create_element("cols", Vec::new());
            for (&col, &width) in &self.widths {
                let c = doc.create_element(
                    "col",
                    vec![
                        ("min".to_string(), col.to_string()),
                        ("max".to_string(), col.to_string()),
                        ("width".to_string(), format_number((width * 100.0).round() / 100.0)),
                        ("customWidth".to_string(), "1".to_string()),
                    ],
                );
                doc.append_child(cols, c);
            }
            doc.append_child(root, cols);
        }

        let sheet_data = doc.create_element("sheetData", Vec::new());
        doc.append_child(root, sheet_data);
        let mut current_row: Option<(u32, _)> = None;
        for (at, cell) in &self.cells {
            let row_node = match current_row {
                Some((r, node)) if r == at.row => node,
                _ => {
                    let node =
                        doc.create_element("row", vec![("r".to_string(), at.row.to_string())]);
                    doc.append_child(sheet_data, node);
                    current_row = Some((at.row, node));
                    node
                }
            };
            let mut attrs = vec![("r".to_string(), at.to_string())];
            if cell.bold {
                attrs.push(("s".to_string(), BOLD_STYLE.to_string()));
            }
            let c = doc.create_element("c", attrs);
            match &cell.value {
                CellValue::Empty => {}
                CellValue::Text(s) => {
                    doc.set_attr(c, "t", "inlineStr");
                    let is = doc.create_element("is", Vec::new());
                    let t = doc.create_element(
                        "t",
                        vec![("xml:space".to_string(), "preserve".to_string())],
                    );
                    doc.set_text(t, s.as_str());
                    doc.append_child(is, t);
                    doc.append_child(c, is);
                }
                CellValue::Number(n) => {
                    let v = doc.create_element("v", Vec::new());
                    doc.set_text(v, format_number(*n));
                    doc.append_child(c, v);
                }
                CellValue::Bool(b) => {
                    doc.set_attr(c, "t", "b");
                    let v = doc.create_element("v", Vec::new());
                    doc.set_text(v, if *b { "1" } else { "0" });
                    doc.append_child(c, v);
                }
            }
            doc.append_child(row_node, c);
        }
        doc
    }

    /// Serializes the sheet as a complete `.xlsx` package.
    pub fn to_xlsx(&self) -> Result<Vec<u8>, GridError> {
        let mut workbook = XmlDocument::new();
        let root = workbook.create_element(
            "workbook",
            vec![
                ("xmlns".to_string(), SPREADSHEET_NS.to_string()),
                ("xmlns:r".to_string(), RELATIONSHIPS_NS.to_string()),
            ],
        );
        let document = workbook.document();
        workbook.append_child(document, root);
        let sheets = workbook.create_element("sheets", Vec::new());
        workbook.append_child(root, sheets);
        let sheet = workbook.create_element(
            "sheet",
            vec![
                ("name".to_string(), self.name.clone()),
                ("sheetId".to_string(), "1".to_string()),
                ("r:id".to_string(), "rId1".to_string()),
            ],
        );
        workbook.append_child(sheets, sheet);

        let mut package = Package::new();
        package.set_part("[Content_Types].xml", CONTENT_TYPES.as_bytes().to_vec());
        package.set_part("_rels/.rels", ROOT_RELS.as_bytes().to_vec());
        package.set_xml_part("xl/workbook.xml", &workbook);
        package.set_part("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.as_bytes().to_vec());
        package.set_part("xl/styles.xml", STYLES.as_bytes().to_vec());
        package.set_xml_part("xl/worksheets/sheet1.xml", &self.worksheet_xml());
        Ok(package.to_bytes()?)
    }
}
