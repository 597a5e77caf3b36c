//! Table discovery and row expansion.

use serde_json::Value;
use stencil_placeholder::{Diagnostics, Lookup, TokenSyntax, substitute, table_tokens, value_to_string};

use crate::cellref::CellRef;
use crate::sheet::Sheet;
use crate::value::CellValue;
use crate::workbook::SharedStrings;
use crate::GridError;

/// Grid position of one placeholder occurrence.
pub type CellLocation = CellRef;

/// Every `{{ table.field }}` occurrence for one table name.
#[derive(Debug, Clone, PartialEq)]
pub struct TableBinding {
    pub table: String,
    /// Field bindings in scan order. A field seen twice keeps its first cell.
    pub fields: Vec<(String, CellLocation)>,
}

impl TableBinding {
    /// The single row that gets duplicated: the lowest row any field sits on.
    pub fn template_row(&self) -> u32 {
        self.fields.iter().map(|(_, l)| l.row).min().unwrap_or(0)
    }

    /// Distinct bound columns, ascending.
    pub fn columns(&self) -> Vec<u32> {
        let mut cols: Vec<u32> = self.fields.iter().map(|(_, l)| l.col).collect();
        cols.sort_unstable();
        cols.dedup();
        cols
    }

    /// Moves every location at or below `at` down by `by` rows.
    pub fn shift_rows(&mut self, at: u32, by: u32) {
        for (_, loc) in &mut self.fields {
            if loc.row >= at {
                loc.row += by;
            }
        }
    }
}

/// Groups table tokens by table name, in order of first appearance.
pub fn discover_tables(snapshot: &[(CellRef, String)]) -> Vec<TableBinding> {
    let mut bindings: Vec<TableBinding> = Vec::new();
    for (at, text) in snapshot {
        for (table, field) in table_tokens(text) {
            let idx = match bindings.iter().position(|b| b.table == table) {
                Some(idx) => idx,
                None => {
                    bindings.push(TableBinding {
                        table: table.to_string(),
                        fields: Vec::new(),
                    });
                    bindings.len() - 1
                }
            };
            let binding = &mut bindings[idx];
            if binding.fields.iter().any(|(f, _)| f == field) {
                log::debug!("Field '{}.{}' bound twice, keeping first at {}", table, field, at);
                continue;
            }
            binding.fields.push((field.to_string(), *at));
        }
    }
    bindings
}

/// Counts from one expansion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Expansion {
    pub inserted_rows: u32,
    pub populated_rows: u32,
}

/// How a bound column is written for each record.
#[derive(Debug, Clone)]
enum ColumnFill {
    /// The cell holds exactly one token: write the typed field value.
    Field(String),
    /// Other text around the tokens: substitute into this template text.
    Composite(String),
}

/// Duplicates the template row once per record and fills the bound columns.
///
/// With no records nothing changes. With one record the template row is filled
/// in place. Otherwise `records.len() - 1` rows are inserted below the
/// template row and each new row takes the bound columns' styles first.
pub fn expand_table(
    sheet: &mut Sheet,
    shared: &SharedStrings,
    binding: &TableBinding,
    records: &[Value],
    diagnostics: &mut Diagnostics,
) -> Result<Expansion, GridError> {
    if records.is_empty() || binding.fields.is_empty() {
        log::info!(
            "Table '{}' has no records, leaving template row untouched",
            binding.table
        );
        return Ok(Expansion::default());
    }
    let template_row = binding.template_row();
    let columns = column_fills(sheet, shared, binding, template_row);

    let n = records.len() as u32;
    if n > 1 {
        sheet.insert_rows(template_row, n - 1);
    }

    for (i, record) in records.iter().enumerate() {
        let target_row = template_row + i as u32;
        if i > 0 {
            for &(col, _) in &columns {
                let from = CellRef::new(col, template_row);
                let to = CellRef::new(col, target_row);
                if let Err(e) = sheet.copy_style(from, to) {
                    log::warn!("Skipping style copy {} -> {}: {}", from, to, e);
                }
            }
        }
        for (col, fill) in &columns {
            let at = CellRef::new(*col, target_row);
            let location = sheet.location(at);
            match fill {
                ColumnFill::Field(field) => match record.get(field.as_str()) {
                    Some(value) => sheet.set_value(at, &CellValue::from_json(value)),
                    None if i == 0 => diagnostics.unresolved(
                        &format!("{}.{}", binding.table, field),
                        &format!("{{{{ {}.{} }}}}", binding.table, field),
                        &location,
                    ),
                    None => {}
                },
                ColumnFill::Composite(text) => {
                    let table = binding.table.as_str();
                    let filled = substitute(
                        text,
                        TokenSyntax::Scalar,
                        diagnostics,
                        &location,
                        |key| match key.split_once('.') {
                            Some((t, field)) if t == table => match record.get(field) {
                                Some(v) => Lookup::Value(value_to_string(v).into_owned()),
                                None => Lookup::Missing,
                            },
                            _ => Lookup::Defer,
                        },
                    );
                    sheet.set_value(at, &CellValue::Text(filled.into_owned()));
                }
            }
        }
    }

    log::debug!(
        "Expanded table '{}' at row {} into {} rows",
        binding.table,
        template_row,
        n
    );
    Ok(Expansion {
        inserted_rows: n - 1,
        populated_rows: n,
    })
}

/// Reads the current template-row text of each bound column.
fn column_fills(
    sheet: &Sheet,
    shared: &SharedStrings,
    binding: &TableBinding,
    template_row: u32,
) -> Vec<(u32, ColumnFill)> {
    binding
        .columns()
        .into_iter()
        .filter_map(|col| {
            let text = sheet.cell_text(CellRef::new(col, template_row), shared);
            let fill = match text {
                Some(text) => match TokenSyntax::Scalar.single_token(&text) {
                    Some(key) => match key.split_once('.') {
                        Some((t, field)) if t == binding.table && !field.contains('.') => {
                            ColumnFill::Field(field.to_string())
                        }
                        _ => ColumnFill::Composite(text),
                    },
                    None => ColumnFill::Composite(text),
                },
                // The token sits on a lower row; write the plain field value.
                None => {
                    let (field, _) = binding.fields.iter().find(|(_, l)| l.col == col)?;
                    ColumnFill::Field(field.clone())
                }
            };
            Some((col, fill))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_groups_by_table() {
        let snapshot = vec![
            (CellRef::new(1, 2), "{{ title }}".to_string()),
            (CellRef::new(1, 5), "{{ rows.desc }}".to_string()),
            (CellRef::new(2, 5), "{{ rows.amt }}".to_string()),
            (CellRef::new(1, 9), "{{ notes.text }}".to_string()),
            (CellRef::new(3, 6), "{{ rows.desc }}".to_string()),
        ];
        let tables = discover_tables(&snapshot);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].table, "rows");
        assert_eq!(
            tables[0].fields,
            vec![
                ("desc".to_string(), CellRef::new(1, 5)),
                ("amt".to_string(), CellRef::new(2, 5)),
            ]
        );
        assert_eq!(tables[0].template_row(), 5);
        assert_eq!(tables[1].template_row(), 9);
    }

    #[test]
    fn test_template_row_is_minimum_row() {
        let binding = TableBinding {
            table: "t".into(),
            fields: vec![
                ("a".into(), CellRef::new(1, 8)),
                ("b".into(), CellRef::new(3, 4)),
            ],
        };
        assert_eq!(binding.template_row(), 4);
        assert_eq!(binding.columns(), vec![1, 3]);
    }

    #[test]
    fn test_shift_rows() {
        let mut binding = TableBinding {
            table: "t".into(),
            fields: vec![("a".into(), CellRef::new(1, 8))],
        };
        binding.shift_rows(6, 3);
        assert_eq!(binding.template_row(), 11);
        binding.shift_rows(20, 3);
        assert_eq!(binding.template_row(), 11);
    }
}
