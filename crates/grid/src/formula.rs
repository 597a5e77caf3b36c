//! Row shifting for same-sheet references inside cell formulas.
//!
//! The scanner copies string literals and quoted sheet names untouched,
//! skips any reference qualified with `Sheet!`, and leaves function names
//! and defined names alone. Unqualified `A1` references and whole-row
//! references such as `7:9` at or below the insertion point move down.

use crate::cellref::{parse_cell_ref, shift_ref};

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.' || b == b'$' || b == b'\\'
}

/// Rewrites `formula` as if `by` rows were inserted starting at row `at`.
pub fn shift_formula_rows(formula: &str, at: u32, by: u32) -> String {
    if by == 0 {
        return formula.to_string();
    }
    let bytes = formula.as_bytes();
    let mut out = String::with_capacity(formula.len() + 4);
    let mut i = 0;
    // Set after `Sheet!` so the next token is copied verbatim.
    let mut qualified = false;

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'"' => {
                let end = quoted_end(bytes, i, b'"');
                out.push_str(&formula[i..end]);
                i = end;
                qualified = false;
            }
            b'\'' => {
                let end = quoted_end(bytes, i, b'\'');
                out.push_str(&formula[i..end]);
                i = end;
                if bytes.get(i) == Some(&b'!') {
                    out.push('!');
                    i += 1;
                    qualified = true;
                }
            }
            _ if is_ident_byte(b) => {
                let start = i;
                while i < bytes.len() && is_ident_byte(bytes[i]) {
                    i += 1;
                }
                let token = &formula[start..i];
                let next = bytes.get(i).copied();
                if next == Some(b'!') {
                    out.push_str(token);
                    out.push('!');
                    i += 1;
                    qualified = true;
                    continue;
                }
                if qualified || next == Some(b'(') {
                    out.push_str(token);
                } else if parse_cell_ref(token).is_some() {
                    out.push_str(&shift_ref(token, at, by));
                } else if is_row_ref(token, bytes, start, i) {
                    out.push_str(&shift_row_number(token, at, by));
                } else {
                    out.push_str(token);
                }
                // A qualified range keeps its qualifier across the colon.
                if !(qualified && next == Some(b':')) {
                    qualified = false;
                }
            }
            _ => {
                // Multi-byte characters only appear inside names or strings;
                // copy them through whole.
                let ch_len = formula[i..].chars().next().map_or(1, char::len_utf8);
                out.push_str(&formula[i..i + ch_len]);
                if b != b':' {
                    qualified = false;
                }
                i += ch_len;
            }
        }
    }
    out
}

/// Index just past the closing quote, honouring doubled quotes as escapes.
fn quoted_end(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

/// A bare row number that is one side of a `7:9` row range.
fn is_row_ref(token: &str, bytes: &[u8], start: usize, end: usize) -> bool {
    let digits = token.strip_prefix('$').unwrap_or(token);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let before = start.checked_sub(1).and_then(|p| bytes.get(p)).copied();
    let after = bytes.get(end).copied();
    before == Some(b':') || after == Some(b':')
}

fn shift_row_number(token: &str, at: u32, by: u32) -> String {
    let (abs, digits) = match token.strip_prefix('$') {
        Some(rest) => ("$", rest),
        None => ("", token),
    };
    match digits.parse::<u32>() {
        Ok(row) if row >= at => format!("{}{}", abs, row + by),
        _ => token.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shifts_refs_below_insertion_point() {
        assert_eq!(shift_formula_rows("SUM(B5:B9)", 6, 2), "SUM(B5:B11)");
        assert_eq!(shift_formula_rows("A6+$B$7*C4", 6, 1), "A7+$B$8*C4");
        assert_eq!(shift_formula_rows("B10", 6, 0), "B10");
    }

    #[test]
    fn test_leaves_strings_and_functions_alone() {
        assert_eq!(
            shift_formula_rows(r#"IF(A8>0,"A8 ""B9""",LOG10(A9))"#, 6, 1),
            r#"IF(A9>0,"A8 ""B9""",LOG10(A10))"#
        );
    }

    #[test]
    fn test_skips_sheet_qualified_refs() {
        assert_eq!(
            shift_formula_rows("Other!A9+'My Sheet'!B9:B12+A9", 6, 1),
            "Other!A9+'My Sheet'!B9:B12+A10"
        );
    }

    #[test]
    fn test_whole_row_ranges() {
        assert_eq!(shift_formula_rows("SUM(7:9)", 6, 3), "SUM(10:12)");
        assert_eq!(shift_formula_rows("SUM(A:A)", 6, 3), "SUM(A:A)");
        assert_eq!(shift_formula_rows("ROUND(A7,2)", 6, 1), "ROUND(A8,2)");
    }

    #[test]
    fn test_names_are_not_refs() {
        assert_eq!(shift_formula_rows("TaxRate2024*A7", 6, 1), "TaxRate2024*A8");
        assert_eq!(shift_formula_rows("Table1[Amount]", 1, 1), "Table1[Amount]");
    }
}
