//! A1-style cell addressing.

use std::fmt;
use std::str::FromStr;

use crate::GridError;

/// Largest column Excel addresses (`XFD`).
pub const MAX_COLUMN: u32 = 16_384;

/// A 1-based `(column, row)` cell position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub fn new(col: u32, row: u32) -> Self {
        Self { row, col }
    }

    pub fn with_row(self, row: u32) -> Self {
        Self { row, ..self }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_name(self.col), self.row)
    }
}

impl FromStr for CellRef {
    type Err = GridError;

    /// Accepts `B7` and absolute forms such as `$B$7`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_cell_ref(s)
            .map(|(col, _, row, _)| CellRef { row, col })
            .ok_or_else(|| GridError::InvalidCellRef(s.to_string()))
    }
}

/// Column letters for a 1-based index: 1 is `A`, 27 is `AA`.
pub fn column_name(mut col: u32) -> String {
    let mut out = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        out.push(b'A' + rem as u8);
        col = (col - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// 1-based index for column letters, case-insensitive.
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut idx: u32 = 0;
    for b in letters.bytes() {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        idx = idx * 26 + u32::from(b.to_ascii_uppercase() - b'A' + 1);
    }
    (idx <= MAX_COLUMN).then_some(idx)
}

/// Splits `$B$7` into `(col, col_absolute, row, row_absolute)`.
pub(crate) fn parse_cell_ref(s: &str) -> Option<(u32, bool, u32, bool)> {
    let bytes = s.as_bytes();
    let mut i = 0;
    let col_abs = bytes.first() == Some(&b'$');
    if col_abs {
        i += 1;
    }
    let letters_start = i;
    while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
        i += 1;
    }
    let col = column_index(&s[letters_start..i])?;
    let row_abs = bytes.get(i) == Some(&b'$');
    if row_abs {
        i += 1;
    }
    let digits = &s[i..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let row: u32 = digits.parse().ok()?;
    (row > 0).then_some((col, col_abs, row, row_abs))
}

/// Shifts every cell in an `A1`, `A1:C4`, or space separated list of ranges
/// whose row is at or below `at` by `by` rows.
pub fn shift_range_list(list: &str, at: u32, by: u32) -> String {
    list.split(' ')
        .map(|range| {
            range
                .split(':')
                .map(|part| shift_ref(part, at, by))
                .collect::<Vec<_>>()
                .join(":")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Shifts a single reference, keeping `$` markers. Anything that is not a
/// cell reference (a whole column such as `A`) comes back unchanged.
pub(crate) fn shift_ref(part: &str, at: u32, by: u32) -> String {
    match parse_cell_ref(part) {
        Some((col, col_abs, row, row_abs)) if row >= at => format!(
            "{}{}{}{}",
            if col_abs { "$" } else { "" },
            column_name(col),
            if row_abs { "$" } else { "" },
            row + by
        ),
        _ => part.to_string(),
    }
}
