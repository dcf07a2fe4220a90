// Primitives for reading workbooks into raw cell grids.

use calamine::{open_workbook, DataType, Reader, Xlsx};
use snafu::prelude::*;
use std::path::Path;

use crate::registry::*;

/// Reads every sheet of a workbook into an untyped grid, in the
/// workbook's own sheet order. Per-sheet failures are reported
/// individually so the remaining sheets still load.
pub fn read_workbook_grids(
    path: &Path,
) -> RegistryResult<Vec<(String, RegistryResult<RawGrid>)>> {
    let path_str = path.display().to_string();
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu {
        path: path_str.clone(),
    })?;
    let sheet_names = workbook.sheet_names().to_owned();
    debug!(
        "read_workbook_grids: {}: sheets {:?}",
        path_str, sheet_names
    );

    let mut out: Vec<(String, RegistryResult<RawGrid>)> = Vec::new();
    for sheet_name in sheet_names {
        let grid = match workbook.worksheet_range(&sheet_name) {
            Some(range_result) => range_result
                .context(SheetRangeSnafu {
                    sheet: sheet_name.clone(),
                })
                .map(|range| to_grid(&range)),
            // A listed sheet without a range has no cells at all.
            None => Ok(Vec::new()),
        };
        out.push((sheet_name, grid));
    }
    Ok(out)
}

fn to_grid(range: &calamine::Range<DataType>) -> RawGrid {
    range
        .rows()
        .map(|row| row.iter().map(to_cell).collect())
        .collect()
}

fn to_cell(cell: &DataType) -> CellValue {
    match cell {
        DataType::String(s) => CellValue::Text(s.clone()),
        DataType::Float(f) => CellValue::Number(*f),
        DataType::Int(i) => CellValue::Number(*i as f64),
        DataType::Bool(b) => CellValue::Text(b.to_string()),
        _ => CellValue::Empty,
    }
}
