//! One worksheet part as an editable grid.
//!
//! The worksheet XML stays the source of truth. Rows are indexed by number so
//! lookups during expansion do not rescan `sheetData`; cells are found by a
//! scan of their (short) row. Elements the engine never writes to are left
//! exactly as parsed.

use std::collections::BTreeMap;

use stencil_ooxml::{NodeId, XmlDocument};

use crate::cellref::{CellRef, column_name, shift_range_list};
use crate::formula::shift_formula_rows;
use crate::value::{CellValue, format_number};
use crate::workbook::SharedStrings;
use crate::GridError;

/// Row attributes carried over to inserted rows.
const COPIED_ROW_ATTRS: [&str; 7] = [
    "spans",
    "s",
    "customFormat",
    "ht",
    "customHeight",
    "thickBot",
    "x14ac:dyDescent",
];

#[derive(Debug, Clone)]
pub struct Sheet {
    name: String,
    part: String,
    doc: XmlDocument,
    sheet_data: NodeId,
    rows: BTreeMap<u32, NodeId>,
    modified: bool,
}

impl Sheet {
    pub fn parse(
        name: impl Into<String>,
        part: impl Into<String>,
        bytes: &[u8],
    ) -> Result<Self, GridError> {
        let part = part.into();
        let doc = XmlDocument::parse_bytes(bytes)?;
        let root = doc
            .root_element()
            .ok_or_else(|| GridError::Structure(format!("{} has no root element", part)))?;
        let sheet_data = doc
            .first_child_named(root, "sheetData")
            .ok_or_else(|| GridError::Structure(format!("{} has no sheetData", part)))?;
        let mut sheet = Self {
            name: name.into(),
            part,
            doc,
            sheet_data,
            rows: BTreeMap::new(),
            modified: false,
        };
        sheet.index_rows()?;
        Ok(sheet)
    }

    /// Builds the row index, filling in implicit `r` attributes.
    fn index_rows(&mut self) -> Result<(), GridError> {
        let mut next_row = 1;
        let row_nodes: Vec<NodeId> = self.doc.children_named(self.sheet_data, "row").collect();
        for row_node in row_nodes {
            let row = match self.doc.attr(row_node, "r") {
                Some(r) => r
                    .parse::<u32>()
                    .map_err(|_| GridError::InvalidCellRef(r.to_string()))?,
                None => {
                    self.doc.set_attr(row_node, "r", next_row.to_string());
                    next_row
                }
            };
            let mut next_col = 1;
            let cells: Vec<NodeId> = self.doc.children_named(row_node, "c").collect();
            for cell in cells {
                let col = match self.doc.attr(cell, "r") {
                    Some(r) => r.parse::<CellRef>()?.col,
                    None => {
                        let at = CellRef::new(next_col, row);
                        self.doc.set_attr(cell, "r", at.to_string());
                        next_col
                    }
                };
                next_col = col + 1;
            }
            self.rows.insert(row, row_node);
            next_row = row + 1;
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn part(&self) -> &str {
        &self.part
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.doc.to_bytes()
    }

    /// `Sheet!B4`, used in diagnostics.
    pub fn location(&self, at: CellRef) -> String {
        format!("{}!{}", self.name, at)
    }

    pub fn row_numbers(&self) -> Vec<u32> {
        self.rows.keys().copied().collect()
    }

    pub fn max_row(&self) -> u32 {
        self.rows.keys().next_back().copied().unwrap_or(0)
    }

    fn cell_ref_of(&self, cell: NodeId) -> Option<CellRef> {
        self.doc.attr(cell, "r")?.parse().ok()
    }

    /// Every cell element in row-major order.
    pub fn cells(&self) -> Vec<(CellRef, NodeId)> {
        let mut out = Vec::new();
        for &row_node in self.rows.values() {
            for cell in self.doc.children_named(row_node, "c") {
                if let Some(at) = self.cell_ref_of(cell) {
                    out.push((at, cell));
                }
            }
        }
        out
    }

    pub fn cell_node(&self, at: CellRef) -> Option<NodeId> {
        let row_node = *self.rows.get(&at.row)?;
        self.doc
            .children_named(row_node, "c")
            .find(|&c| self.cell_ref_of(c).map(|r| r.col) == Some(at.col))
    }

    /// Text of a string cell. Formula cells, numbers and booleans have none.
    pub fn cell_text(&self, at: CellRef, shared: &SharedStrings) -> Option<String> {
        self.cell_node(at)
            .and_then(|cell| self.node_text(cell, shared))
    }

    fn node_text(&self, cell: NodeId, shared: &SharedStrings) -> Option<String> {
        if self.doc.first_child_named(cell, "f").is_some() {
            return None;
        }
        match self.doc.attr(cell, "t") {
            Some("s") => {
                let v = self.doc.first_child_named(cell, "v")?;
                let idx: usize = self.doc.text(v).trim().parse().ok()?;
                shared.get(idx).map(str::to_string)
            }
            Some("inlineStr") => {
                let is = self.doc.first_child_named(cell, "is")?;
                Some(rich_text(&self.doc, is))
            }
            Some("str") => {
                let v = self.doc.first_child_named(cell, "v")?;
                Some(self.doc.text(v))
            }
            _ => None,
        }
    }

    /// All string cells with their text, row-major. Used as the discovery
    /// snapshot before any cell is rewritten.
    pub fn text_cells(&self, shared: &SharedStrings) -> Vec<(CellRef, String)> {
        self.cells()
            .into_iter()
            .filter_map(|(at, cell)| self.node_text(cell, shared).map(|t| (at, t)))
            .collect()
    }

    fn ensure_row(&mut self, row: u32) -> NodeId {
        if let Some(&node) = self.rows.get(&row) {
            return node;
        }
        let node = self
            .doc
            .create_element("row", vec![("r".to_string(), row.to_string())]);
        match self.rows.range(row + 1..).next().map(|(_, &n)| n) {
            Some(next) => {
                let idx = self.doc.index_in_parent(next).unwrap_or(0);
                self.doc.insert_child(self.sheet_data, idx, node);
            }
            None => self.doc.append_child(self.sheet_data, node),
        }
        self.rows.insert(row, node);
        node
    }

    fn ensure_cell(&mut self, at: CellRef) -> NodeId {
        if let Some(cell) = self.cell_node(at) {
            return cell;
        }
        let row_node = self.ensure_row(at.row);
        let cell = self
            .doc
            .create_element("c", vec![("r".to_string(), at.to_string())]);
        let after = self
            .doc
            .children(row_node)
            .iter()
            .position(|&c| {
                self.doc.is(c, "c") && self.cell_ref_of(c).is_some_and(|r| r.col > at.col)
            });
        match after {
            Some(idx) => self.doc.insert_child(row_node, idx, cell),
            None => self.doc.append_child(row_node, cell),
        }
        cell
    }

    /// Writes a value, keeping the cell's style. Strings are written inline.
    pub fn set_value(&mut self, at: CellRef, value: &CellValue) {
        let cell = self.ensure_cell(at);
        let keep: Vec<NodeId> = self
            .doc
            .children(cell)
            .iter()
            .copied()
            .filter(|&c| self.doc.is(c, "extLst"))
            .collect();
        self.doc.clear_children(cell);
        self.doc.remove_attr(cell, "t");

        match value {
            CellValue::Empty => {}
            CellValue::Text(s) => {
                self.doc.set_attr(cell, "t", "inlineStr");
                let is = self.doc.create_element("is", Vec::new());
                let t = self.doc.create_element("t", preserve_attr(s));
                self.doc.set_text(t, s.as_str());
                self.doc.append_child(is, t);
                self.doc.append_child(cell, is);
            }
            CellValue::Number(n) => {
                let v = self.doc.create_element("v", Vec::new());
                self.doc.set_text(v, format_number(*n));
                self.doc.append_child(cell, v);
            }
            CellValue::Bool(b) => {
                self.doc.set_attr(cell, "t", "b");
                let v = self.doc.create_element("v", Vec::new());
                self.doc.set_text(v, if *b { "1" } else { "0" });
                self.doc.append_child(cell, v);
            }
        }
        for ext in keep {
            self.doc.append_child(cell, ext);
        }
        self.modified = true;
    }

    /// Copies the style index of `from` onto `to`, creating `to` if needed.
    pub fn copy_style(&mut self, from: CellRef, to: CellRef) -> Result<(), GridError> {
        let source = self
            .cell_node(from)
            .ok_or_else(|| GridError::MissingCell(from.to_string()))?;
        let style = self.doc.attr(source, "s").map(str::to_string);
        let target = self.ensure_cell(to);
        match style {
            Some(s) => self.doc.set_attr(target, "s", s),
            None => {
                self.doc.remove_attr(target, "s");
            }
        }
        self.modified = true;
        Ok(())
    }

    /// Inserts `count` blank rows directly below `after`.
    ///
    /// Rows and cells below move down, as do same-sheet formula references,
    /// merged ranges, the dimension, and other sheet-level range lists. The new
    /// rows take the height and row formatting of `after`.
    pub fn insert_rows(&mut self, after: u32, count: u32) {
        if count == 0 {
            return;
        }
        let at = after + 1;

        let moved: Vec<(u32, NodeId)> = self
            .rows
            .range(at..)
            .map(|(&r, &n)| (r, n))
            .collect();
        for (r, _) in &moved {
            self.rows.remove(r);
        }
        for (r, node) in moved {
            let new_row = r + count;
            self.doc.set_attr(node, "r", new_row.to_string());
            let cells: Vec<NodeId> = self.doc.children_named(node, "c").collect();
            for cell in cells {
                if let Some(old) = self.cell_ref_of(cell) {
                    self.doc
                        .set_attr(cell, "r", old.with_row(new_row).to_string());
                }
            }
            self.rows.insert(new_row, node);
        }

        self.shift_formulas(at, count);
        self.shift_sheet_ranges(at, count);

        let template = self.rows.get(&after).copied();
        let mut anchor = template;
        for i in 0..count {
            let row = at + i;
            let mut attrs = vec![("r".to_string(), row.to_string())];
            if let Some(t) = template {
                for key in COPIED_ROW_ATTRS {
                    if let Some(v) = self.doc.attr(t, key) {
                        attrs.push((key.to_string(), v.to_string()));
                    }
                }
            }
            let node = self.doc.create_element("row", attrs);
            match anchor {
                Some(a) => self.doc.insert_after(a, node),
                None => {
                    let idx = self
                        .rows
                        .range(row + 1..)
                        .next()
                        .and_then(|(_, &n)| self.doc.index_in_parent(n))
                        .unwrap_or(self.doc.children(self.sheet_data).len());
                    self.doc.insert_child(self.sheet_data, idx, node);
                }
            }
            self.rows.insert(row, node);
            anchor = Some(node);
        }
        self.modified = true;
    }

    fn shift_formulas(&mut self, at: u32, by: u32) {
        for (_, cell) in self.cells() {
            let Some(f) = self.doc.first_child_named(cell, "f") else {
                continue;
            };
            let text = self.doc.text(f);
            if !text.is_empty() {
                let shifted = shift_formula_rows(&text, at, by);
                if shifted != text {
                    self.doc.set_text(f, shifted);
                }
            }
            if let Some(range) = self.doc.attr(f, "ref").map(str::to_string) {
                self.doc.set_attr(f, "ref", shift_range_list(&range, at, by));
            }
        }
    }

    fn shift_sheet_ranges(&mut self, at: u32, by: u32) {
        let Some(root) = self.doc.root_element() else {
            return;
        };
        let mut targets: Vec<(NodeId, &'static str)> = Vec::new();
        for id in self.doc.descendants(root) {
            match self.doc.name(id) {
                Some("dimension") | Some("mergeCell") | Some("hyperlink") => {
                    targets.push((id, "ref"))
                }
                Some("conditionalFormatting") | Some("dataValidation") => {
                    targets.push((id, "sqref"))
                }
                _ => {}
            }
        }
        for (id, key) in targets {
            if let Some(range) = self.doc.attr(id, key).map(str::to_string) {
                self.doc.set_attr(id, key, shift_range_list(&range, at, by));
            }
        }
    }

    /// Text of every cell in `row`, keyed by column letters. Test helper and
    /// debug aid.
    pub fn row_texts(&self, row: u32, shared: &SharedStrings) -> Vec<(String, String)> {
        let Some(&row_node) = self.rows.get(&row) else {
            return Vec::new();
        };
        self.doc
            .children_named(row_node, "c")
            .filter_map(|cell| {
                let at = self.cell_ref_of(cell)?;
                let text = self.node_text(cell, shared).or_else(|| {
                    self.doc
                        .first_child_named(cell, "v")
                        .map(|v| self.doc.text(v))
                })?;
                Some((column_name(at.col), text))
            })
            .collect()
    }

    /// Style index of a cell, if it has one.
    pub fn style_of(&self, at: CellRef) -> Option<&str> {
        self.cell_node(at).and_then(|c| self.doc.attr(c, "s"))
    }

    /// Serialized `<row>` element, for comparing rows before and after a fill.
    pub fn row_xml(&self, row: u32) -> Option<String> {
        self.rows.get(&row).map(|&n| self.doc.node_to_string(n))
    }

    /// Attribute of a sheet-level element, e.g. `("dimension", "ref")`.
    pub fn element_attr(&self, element: &str, key: &str) -> Vec<String> {
        let Some(root) = self.doc.root_element() else {
            return Vec::new();
        };
        self.doc
            .descendants_named(root, element)
            .into_iter()
            .filter_map(|id| self.doc.attr(id, key).map(str::to_string))
            .collect()
    }

    /// Formula text of a cell.
    pub fn formula(&self, at: CellRef) -> Option<String> {
        let cell = self.cell_node(at)?;
        self.doc
            .first_child_named(cell, "f")
            .map(|f| self.doc.text(f))
    }

    /// Height attribute of a row.
    pub fn row_height(&self, row: u32) -> Option<&str> {
        self.rows.get(&row).and_then(|&n| self.doc.attr(n, "ht"))
    }
}

/// Text of an `<si>` or `<is>` element: plain `<t>` plus rich-text runs,
/// without phonetic hints.
pub(crate) fn rich_text(doc: &XmlDocument, node: NodeId) -> String {
    let mut out = String::new();
    for id in doc.descendants(node) {
        if doc.is(id, "t") && doc.ancestor_named(id, "rPh").is_none() {
            out.push_str(&doc.text(id));
        }
    }
    out
}

fn preserve_attr(s: &str) -> Vec<(String, String)> {
    if s.starts_with(char::is_whitespace) || s.ends_with(char::is_whitespace) {
        vec![("xml:space".to_string(), "preserve".to_string())]
    } else {
        Vec::new()
    }
}
