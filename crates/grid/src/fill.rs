//! The two-pass fill over every worksheet of a template workbook.

use serde_json::{Map, Value};
use stencil_placeholder::{Diagnostics, Lookup, TokenSyntax, resolve, substitute, value_to_string};

use crate::cellref::CellRef;
use crate::sheet::Sheet;
use crate::table::{TableBinding, discover_tables, expand_table};
use crate::value::CellValue;
use crate::workbook::{SharedStrings, Workbook};
use crate::GridError;

/// Output of a workbook fill.
#[derive(Debug, Clone)]
pub struct FilledWorkbook {
    pub bytes: Vec<u8>,
    pub diagnostics: Diagnostics,
    /// Rows inserted across all sheets.
    pub inserted_rows: u32,
}

/// Fills a `.xlsx` template with `data`.
///
/// Each sheet gets the scalar pass and then the table pass. Table discovery
/// works from the cell texts as they were before the scalar pass.
pub fn fill_workbook(
    template: &[u8],
    data: &Map<String, Value>,
) -> Result<FilledWorkbook, GridError> {
    let mut workbook = Workbook::open(template)?;
    let mut diagnostics = Diagnostics::new();
    let mut inserted_rows = 0;

    let entries = workbook.sheets().to_vec();
    for entry in &entries {
        let mut sheet = workbook.load_sheet(entry)?;
        inserted_rows += fill_sheet(
            &mut sheet,
            workbook.shared_strings(),
            data,
            &mut diagnostics,
        )?;
        workbook.store_sheet(&sheet);
    }
    if inserted_rows > 0 {
        workbook.drop_calc_chain()?;
    }

    log::info!(
        "Filled workbook: {} sheets, {} rows inserted, {} unresolved placeholders",
        entries.len(),
        inserted_rows,
        diagnostics.len()
    );
    Ok(FilledWorkbook {
        bytes: workbook.to_bytes()?,
        diagnostics,
        inserted_rows,
    })
}

/// Runs both passes on one sheet. Returns the number of rows inserted.
pub fn fill_sheet(
    sheet: &mut Sheet,
    shared: &SharedStrings,
    data: &Map<String, Value>,
    diagnostics: &mut Diagnostics,
) -> Result<u32, GridError> {
    let snapshot = sheet.text_cells(shared);
    scalar_pass(sheet, &snapshot, data, diagnostics);
    table_pass(sheet, shared, &snapshot, data, diagnostics)
}

/// `rows.desc` where `rows` is an array in `data`: left for the table pass.
fn is_table_token(key: &str, data: &Map<String, Value>) -> bool {
    match key.split_once('.') {
        Some((table, field)) => !field.contains('.') && data.get(table).is_some_and(Value::is_array),
        None => false,
    }
}

fn scalar_pass(
    sheet: &mut Sheet,
    snapshot: &[(CellRef, String)],
    data: &Map<String, Value>,
    diagnostics: &mut Diagnostics,
) {
    for (at, text) in snapshot {
        if !TokenSyntax::Scalar.may_contain_token(text) {
            continue;
        }
        let location = sheet.location(*at);

        if let Some(key) = TokenSyntax::Scalar.single_token(text) {
            if is_table_token(key, data) {
                continue;
            }
            match resolve(data, key) {
                Some(value) => sheet.set_value(*at, &CellValue::from_json(value)),
                None => diagnostics.unresolved(key, text.trim(), &location),
            }
            continue;
        }

        let filled = substitute(text, TokenSyntax::Scalar, diagnostics, &location, |key| {
            if is_table_token(key, data) {
                return Lookup::Defer;
            }
            match resolve(data, key) {
                Some(value) => Lookup::Value(value_to_string(value).into_owned()),
                None => Lookup::Missing,
            }
        });
        if filled.as_ref() != text.as_str() {
            sheet.set_value(*at, &CellValue::Text(filled.into_owned()));
        }
    }
}

fn table_pass(
    sheet: &mut Sheet,
    shared: &SharedStrings,
    snapshot: &[(CellRef, String)],
    data: &Map<String, Value>,
    diagnostics: &mut Diagnostics,
) -> Result<u32, GridError> {
    let mut tables: Vec<(TableBinding, &Vec<Value>)> = discover_tables(snapshot)
        .into_iter()
        .filter_map(|binding| match data.get(&binding.table) {
            Some(Value::Array(records)) => Some((binding, records)),
            Some(_) => {
                log::info!(
                    "Table '{}' in sheet '{}' is not bound to an array, skipping",
                    binding.table,
                    sheet.name()
                );
                None
            }
            None => {
                log::info!(
                    "Table '{}' in sheet '{}' has no data, skipping",
                    binding.table,
                    sheet.name()
                );
                None
            }
        })
        .collect();

    tables.sort_by_key(|(binding, _)| binding.template_row());
    for pair in tables.windows(2) {
        let (first, second) = (&pair[0].0, &pair[1].0);
        if first.template_row() == second.template_row() {
            return Err(GridError::OverlappingTables {
                first: first.table.clone(),
                second: second.table.clone(),
                row: first.template_row(),
            });
        }
    }

    // Expand top to bottom, pushing later tables down by what was inserted.
    let mut inserted_total = 0;
    for idx in 0..tables.len() {
        let (binding, records) = (tables[idx].0.clone(), tables[idx].1);
        let expansion = expand_table(sheet, shared, &binding, records, diagnostics)?;
        if expansion.inserted_rows > 0 {
            let at = binding.template_row() + 1;
            for later in tables.iter_mut().skip(idx + 1) {
                later.0.shift_rows(at, expansion.inserted_rows);
            }
            inserted_total += expansion.inserted_rows;
        }
    }
    Ok(inserted_total)
}
