//! Lays rendered HTML out on a spreadsheet grid.
//!
//! The body's element children are walked top to bottom with a row cursor.
//! Tables, headings, text blocks and lists each claim rows; any other element
//! is descended into at the same cursor.

use std::collections::VecDeque;

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use stencil_grid::cellref::MAX_COLUMN;
use stencil_grid::{CellRef, CellValue, GridCell, NewSheet};

use crate::HtmlError;
use crate::numeric::parse_number;

/// Maximum HTML size accepted for layout (10MB)
const MAX_HTML_SIZE: usize = 10_000_000;

pub const SHEET_NAME: &str = "Document";

const MIN_WIDTH: f64 = 8.0;
const MAX_WIDTH: f64 = 50.0;
const WIDTH_PER_CHAR: f64 = 1.2;

const MAX_COLSPAN: u32 = 1000;

/// Cells laid out on one sheet row. Columns are 1-based.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedRow {
    pub row: u32,
    pub cells: Vec<(u32, GridCell)>,
}

impl MappedRow {
    fn single(row: u32, col: u32, cell: GridCell) -> Self {
        Self {
            row,
            cells: vec![(col, cell)],
        }
    }
}

struct Frame {
    nodes: Vec<Handle>,
    next: usize,
    level: u32,
}

/// Lazy traversal of a document body. Each call to `next` walks only as far
/// as needed to produce the next row; once exhausted it stays exhausted.
pub struct BodyRows {
    frames: Vec<Frame>,
    cursor: u32,
    pending: VecDeque<MappedRow>,
    // Dropping the dom empties every node's children, handles included.
    _dom: RcDom,
}

impl BodyRows {
    fn new(dom: RcDom) -> Result<Self, HtmlError> {
        let body = find_element(&dom.document, "body")
            .ok_or_else(|| HtmlError::Parse("document has no body".to_string()))?;
        Ok(Self {
            frames: vec![Frame {
                nodes: element_children(&body),
                next: 0,
                level: 0,
            }],
            cursor: 1,
            pending: VecDeque::new(),
            _dom: dom,
        })
    }

    /// The next row the traversal would write to.
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    fn next_node(&mut self) -> Option<(Handle, u32)> {
        loop {
            let frame = self.frames.last_mut()?;
            if let Some(node) = frame.nodes.get(frame.next) {
                frame.next += 1;
                return Some((node.clone(), frame.level));
            }
            self.frames.pop();
        }
    }

    fn visit(&mut self, node: &Handle, level: u32) {
        let Some(tag) = tag_name(node) else {
            return;
        };
        match tag.as_str() {
            "table" => self.table(node, level),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let text = text_content(node);
                let text = text.trim();
                if text.is_empty() {
                    return;
                }
                self.pending.push_back(MappedRow::single(
                    self.cursor,
                    level + 1,
                    GridCell::bold(CellValue::text(text)),
                ));
                self.cursor += 2;
            }
            "p" | "div" | "span" => self.text_block(node, level),
            "ul" | "ol" => {
                self.list(node, tag == "ol", level);
                self.cursor += 1;
            }
            "script" | "style" | "template" => {}
            _ => self.frames.push(Frame {
                nodes: element_children(node),
                next: 0,
                level,
            }),
        }
    }

    fn text_block(&mut self, node: &Handle, level: u32) {
        let text = text_content(node);
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let col = level + 1;
        let cells = match text.split_once(':') {
            Some((key, value)) if !text.contains('\n') => {
                let mut cells = vec![(col, GridCell::bold(CellValue::text(format!("{}:", key.trim()))))];
                let value = value.trim();
                if !value.is_empty() {
                    cells.push((col + 1, GridCell::plain(typed_value(value))));
                }
                cells
            }
            _ => vec![(col, GridCell::plain(CellValue::text(text)))],
        };
        self.pending.push_back(MappedRow {
            row: self.cursor,
            cells,
        });
        self.cursor += 1;
    }

    fn table(&mut self, table: &Handle, level: u32) {
        let mut header = Vec::new();
        let mut body = Vec::new();
        collect_rows(table, false, &mut header, &mut body);

        for (tr, in_header) in header
            .iter()
            .map(|tr| (tr, true))
            .chain(body.iter().map(|tr| (tr, false)))
        {
            let mut cells = Vec::new();
            let mut col = level + 1;
            for cell in element_children(tr) {
                let Some(tag) = tag_name(&cell) else {
                    continue;
                };
                if tag != "td" && tag != "th" {
                    continue;
                }
                if col > MAX_COLUMN {
                    break;
                }
                let text = text_content(&cell);
                let text = text.trim();
                if !text.is_empty() {
                    let value = if in_header {
                        CellValue::text(text)
                    } else {
                        typed_value(text)
                    };
                    let bold = in_header || tag == "th";
                    cells.push((col, GridCell { value, bold }));
                }
                col = col.saturating_add(colspan(&cell));
            }
            if !cells.is_empty() {
                self.pending.push_back(MappedRow {
                    row: self.cursor,
                    cells,
                });
            }
            self.cursor += 1;
        }
        self.cursor += 1;
    }

    fn list(&mut self, list: &Handle, ordered: bool, level: u32) {
        let items = element_children(list)
            .into_iter()
            .filter(|c| tag_name(c).as_deref() == Some("li"));
        for (i, item) in items.enumerate() {
            let mut text = String::new();
            let mut nested = Vec::new();
            item_text(&item, &mut text, &mut nested);
            let text = text.trim();
            if !text.is_empty() {
                let label = if ordered {
                    format!("{}. {}", i + 1, text)
                } else {
                    format!("• {}", text)
                };
                self.pending.push_back(MappedRow::single(
                    self.cursor,
                    level + 1,
                    GridCell::plain(CellValue::text(label)),
                ));
                self.cursor += 1;
            }
            for (sublist, sub_ordered) in nested {
                self.list(&sublist, sub_ordered, level + 1);
            }
        }
    }
}

impl Iterator for BodyRows {
    type Item = MappedRow;

    fn next(&mut self) -> Option<MappedRow> {
        loop {
            if let Some(row) = self.pending.pop_front() {
                return Some(row);
            }
            let (node, level) = self.next_node()?;
            self.visit(&node, level);
        }
    }
}

fn typed_value(text: &str) -> CellValue {
    match parse_number(text) {
        Some(n) => CellValue::Number(n),
        None => CellValue::text(text),
    }
}

fn tag_name(handle: &Handle) -> Option<String> {
    match &handle.data {
        NodeData::Element { name, .. } => {
            let local: &str = &name.local;
            Some(local.to_ascii_lowercase())
        }
        _ => None,
    }
}

fn element_children(handle: &Handle) -> Vec<Handle> {
    handle
        .children
        .borrow()
        .iter()
        .filter(|c| matches!(c.data, NodeData::Element { .. }))
        .cloned()
        .collect()
}

fn colspan(handle: &Handle) -> u32 {
    let NodeData::Element { attrs, .. } = &handle.data else {
        return 1;
    };
    attrs
        .borrow()
        .iter()
        .find(|a| &*a.name.local == "colspan")
        .and_then(|a| a.value.trim().parse::<u32>().ok())
        .filter(|&n| n > 0)
        .map_or(1, |n| n.min(MAX_COLSPAN))
}

/// Concatenated text of all descendants, skipping scripts and styles.
fn text_content(handle: &Handle) -> String {
    let mut out = String::new();
    push_text(handle, &mut out);
    out
}

fn push_text(handle: &Handle, out: &mut String) {
    match &handle.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        NodeData::Element { name, .. }
            if matches!(&*name.local, "script" | "style" | "template") => {}
        _ => {
            for child in handle.children.borrow().iter() {
                push_text(child, out);
            }
        }
    }
}

/// Text of a list item without its nested lists, which are collected instead.
fn item_text(handle: &Handle, out: &mut String, nested: &mut Vec<(Handle, bool)>) {
    for child in handle.children.borrow().iter() {
        match tag_name(child).as_deref() {
            Some("ul") => nested.push((child.clone(), false)),
            Some("ol") => nested.push((child.clone(), true)),
            Some(_) => item_text(child, out, nested),
            None => push_text(child, out),
        }
    }
}

/// Rows of `table` split into header and body, ignoring nested tables.
fn collect_rows(handle: &Handle, in_header: bool, header: &mut Vec<Handle>, body: &mut Vec<Handle>) {
    for child in element_children(handle) {
        match tag_name(&child).as_deref() {
            Some("tr") if in_header => header.push(child),
            Some("tr") => body.push(child),
            Some("thead") => collect_rows(&child, true, header, body),
            Some("table") => {}
            _ => collect_rows(&child, in_header, header, body),
        }
    }
}

fn find_element(handle: &Handle, tag: &str) -> Option<Handle> {
    for child in handle.children.borrow().iter() {
        if tag_name(child).as_deref() == Some(tag) {
            return Some(child.clone());
        }
        if let Some(found) = find_element(child, tag) {
            return Some(found);
        }
    }
    None
}

fn parse(html: &str) -> Result<RcDom, HtmlError> {
    if html.len() > MAX_HTML_SIZE {
        return Err(HtmlError::TooLarge(html.len()));
    }
    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
        .map_err(|e| HtmlError::Parse(e.to_string()))
}

/// Starts a lazy row traversal over the `<body>` of `html`.
pub fn map_body(html: &str) -> Result<BodyRows, HtmlError> {
    BodyRows::new(parse(html)?)
}

/// Lays `html` out on a one-sheet workbook named `Document`.
pub fn layout_workbook(html: &str) -> Result<Vec<u8>, HtmlError> {
    let mut sheet = NewSheet::new(SHEET_NAME);
    let mut rows = 0;
    for mapped in map_body(html)? {
        for (col, cell) in mapped.cells {
            sheet.set(CellRef::new(col, mapped.row), cell);
        }
        rows += 1;
    }
    autosize_columns(&mut sheet);
    log::info!("Laid out HTML on {} rows", rows);
    Ok(sheet.to_xlsx()?)
}

/// Sizes each used column from a sample of rows.
pub fn autosize_columns(sheet: &mut NewSheet) {
    let (max_row, max_col) = sheet.used_range();
    if max_row == 0 {
        return;
    }
    let mut samples = vec![1, max_row / 4, max_row / 2, max_row * 3 / 4, max_row];
    samples.retain(|&r| r > 0);
    samples.dedup();

    let mut widest = vec![0usize; max_col as usize + 1];
    for &row in &samples {
        for (col, cell) in sheet.row(row) {
            let slot = &mut widest[col as usize];
            *slot = (*slot).max(cell.value.display_len());
        }
    }
    for col in 1..=max_col {
        let width = (widest[col as usize] as f64 * WIDTH_PER_CHAR).clamp(MIN_WIDTH, MAX_WIDTH);
        sheet.set_width(col, width);
    }
}
