//! Spreadsheet extraction backed by `calamine`.
//!
//! Every sheet is rendered as pipe-delimited rows under a `Sheet: <name>`
//! header. Row numbers are the row's absolute position in the sheet, so
//! "Row 5" in the extracted text always means sheet row 5 even when earlier
//! rows are blank. Sheets whose rows are all blank are dropped entirely so
//! they do not pollute the embedding space with empty content.

use super::ExtractError;
use calamine::{Reader, open_workbook_auto_from_rs};
use std::io::Cursor;

pub(super) fn extract_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook = open_workbook_auto_from_rs(cursor)?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names().to_owned() {
        let range = workbook.worksheet_range(&name)?;
        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();
        sheets.push((name, rows));
    }

    Ok(render_sheets(&sheets))
}

/// Render workbook sheets as delimited text, skipping all-blank sheets.
///
/// Every row of a surviving sheet is rendered, blanks included, and numbered
/// by its absolute position starting at 1.
fn render_sheets(sheets: &[(String, Vec<Vec<String>>)]) -> String {
    let mut rendered = Vec::new();

    for (name, rows) in sheets {
        let has_data = rows
            .iter()
            .any(|row| row.iter().any(|cell| !cell.trim().is_empty()));
        if !has_data {
            tracing::debug!(sheet = %name, "Skipping sheet with no data");
            continue;
        }

        let body = rows
            .iter()
            .enumerate()
            .map(|(idx, row)| format!("Row {}: {}", idx + 1, row.join(" | ")))
            .collect::<Vec<_>>()
            .join("\n");
        rendered.push(format!("Sheet: {name}\n{body}"));
    }

    rendered.join("\n\n")
}
