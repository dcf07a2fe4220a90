mod config;
pub mod manual;
mod query;

use log::{debug, warn};

pub use crate::config::*;
pub use crate::query::*;

// **** Header text normalization ****

/// Normalizes raw header text for alias comparison: trims, collapses
/// internal whitespace and lower-cases. Idempotent.
pub fn normalize_header_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_lowercase()
}

// The second-chance comparison form: parenthetical qualifiers, common
// punctuation and all whitespace removed. "उमेर(वर्ष)" and "उमेर"
// compare equal under this form.
fn compact_header_text(text: &str) -> String {
    let mut out = String::new();
    let mut depth: usize = 0;
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth > 0 => {}
            c if c.is_whitespace() => {}
            c if is_header_punctuation(c) => {}
            c => out.extend(c.to_lowercase()),
        }
    }
    out
}

fn is_header_punctuation(c: char) -> bool {
    // '।' is the Devanagari danda.
    matches!(c, '.' | ',' | ':' | ';' | '/' | '-' | '_' | '।')
}

/// Finds the canonical field a raw header cell refers to, if any.
///
/// Exact equality on the normalized form is tried for every alias first;
/// the compacted form is only a fallback so that a punctuation variant
/// can never shadow an exact alias of another field.
fn match_header_cell(dict: &AliasDictionary, raw: &str) -> Option<CanonicalField> {
    let normalized = normalize_header_text(raw);
    if normalized.is_empty() {
        return None;
    }
    for (field, aliases) in dict.entries() {
        if aliases
            .iter()
            .any(|alias| normalize_header_text(alias) == normalized)
        {
            return Some(field);
        }
    }
    let compacted = compact_header_text(raw);
    if compacted.is_empty() {
        return None;
    }
    for (field, aliases) in dict.entries() {
        if aliases
            .iter()
            .any(|alias| compact_header_text(alias) == compacted)
        {
            return Some(field);
        }
    }
    None
}

// **** Header resolver ****

/// Locates the header row of a raw sheet.
///
/// Rows are scanned from the top, up to `options.header_look_ahead`. The
/// first row containing at least `options.min_header_matches` cells that
/// match a known alias wins. Decorative title rows above the table match
/// at most one alias in practice, so the earliest-match policy keeps them
/// from shadowing the real header while still skipping them.
pub fn resolve_header(
    grid: &[Vec<CellValue>],
    dict: &AliasDictionary,
    options: &LoadOptions,
) -> Result<usize, SheetError> {
    if grid.is_empty() {
        return Err(SheetError::EmptySheet);
    }
    for (idx, row) in grid.iter().take(options.header_look_ahead).enumerate() {
        let matches = row
            .iter()
            .filter(|cell| {
                cell.as_text()
                    .and_then(|t| match_header_cell(dict, t))
                    .is_some()
            })
            .count();
        if matches >= options.min_header_matches {
            debug!(
                "resolve_header: row {} qualifies with {} alias matches",
                idx, matches
            );
            return Ok(idx);
        }
    }
    Err(SheetError::NoHeaderFound)
}

// **** Column mapper ****

/// Maps the cells of a detected header row onto canonical fields.
///
/// Columns matching no alias are dropped. When two columns claim the
/// same field, the later one wins and the collision is reported back for
/// the caller's warning list.
pub fn map_columns(
    header_cells: &[CellValue],
    dict: &AliasDictionary,
) -> (HeaderMap, Vec<ColumnCollision>) {
    let mut map = HeaderMap::default();
    let mut collisions: Vec<ColumnCollision> = Vec::new();
    for (idx, cell) in header_cells.iter().enumerate() {
        let text = match cell.as_text() {
            Some(t) => t,
            None => continue,
        };
        let field = match match_header_cell(dict, text) {
            Some(f) => f,
            None => continue,
        };
        if let Some(previous) = map.insert(field, idx) {
            warn!(
                "map_columns: columns {} and {} both map to {:?}, keeping column {}",
                previous, idx, field, idx
            );
            collisions.push(ColumnCollision {
                field,
                kept_column: idx,
                discarded_column: previous,
            });
        }
    }
    (map, collisions)
}

// **** Record normalizer ****

// Integer coercion for serial_no / voter_no / age. Registries contain
// stray non-numeric artifacts in numeric columns, so a failed parse is
// an absent value, never an error.
fn coerce_int(cell: &CellValue) -> Option<i64> {
    match cell {
        CellValue::Number(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i64),
        CellValue::Text(s) => {
            let t = s.trim();
            t.parse::<i64>().ok().or_else(|| {
                t.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i64)
            })
        }
        _ => None,
    }
}

// Text coercion: end-trim only, internal spacing is data. Numeric cells
// are rendered without a trailing ".0" so serial columns stored as
// floats read back as they were typed.
fn coerce_text(cell: &CellValue) -> Option<String> {
    match cell {
        CellValue::Text(s) => {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        }
        CellValue::Number(f) if f.is_finite() && f.fract() == 0.0 => {
            Some(format!("{}", *f as i64))
        }
        CellValue::Number(f) => Some(f.to_string()),
        CellValue::Empty => None,
    }
}

fn apply_field(record: &mut VoterRecord, field: CanonicalField, cell: &CellValue) {
    match field {
        CanonicalField::SerialNo => record.serial_no = coerce_int(cell),
        CanonicalField::VoterNo => record.voter_no = coerce_int(cell),
        CanonicalField::Age => {
            record.age = coerce_int(cell).and_then(|v| u32::try_from(v).ok())
        }
        CanonicalField::Name => record.name = coerce_text(cell),
        CanonicalField::Gender => record.gender = coerce_text(cell),
        CanonicalField::SpouseName => record.spouse_name = coerce_text(cell),
        CanonicalField::ParentName => record.parent_name = coerce_text(cell),
        CanonicalField::Caste => record.caste = coerce_text(cell),
        CanonicalField::Address => record.address = coerce_text(cell),
        CanonicalField::Details => record.details = coerce_text(cell),
    }
}

const EMPTY_CELL: CellValue = CellValue::Empty;

/// Converts the rows strictly below the header into records in the
/// canonical schema, stamping each with its provenance.
///
/// Cells past the end of a short row are absent, not errors. A row is
/// dropped only when every canonical field came up absent AND the raw
/// row is entirely blank; a partially-filled real record always
/// survives.
pub fn normalize_rows(
    grid: &[Vec<CellValue>],
    header_row: usize,
    header_map: &HeaderMap,
    provenance: &Provenance,
) -> Vec<VoterRecord> {
    let mut records: Vec<VoterRecord> = Vec::new();
    for row in grid.iter().skip(header_row + 1) {
        let mut record = VoterRecord::empty(provenance);
        for (field, column) in header_map.fields() {
            let cell = row.get(column).unwrap_or(&EMPTY_CELL);
            apply_field(&mut record, field, cell);
        }
        if !record.has_any_field() && row.iter().all(|c| c.is_blank()) {
            continue;
        }
        records.push(record);
    }
    records
}

// **** Per-sheet pipeline ****

/// The outcome of normalizing one sheet.
#[derive(PartialEq, Debug, Clone)]
pub struct NormalizedSheet {
    pub header_row: usize,
    pub records: Vec<VoterRecord>,
    pub collisions: Vec<ColumnCollision>,
}

/// Runs the full per-sheet pipeline: header detection, column mapping
/// and row normalization.
pub fn normalize_sheet(
    grid: &[Vec<CellValue>],
    dict: &AliasDictionary,
    options: &LoadOptions,
    provenance: &Provenance,
) -> Result<NormalizedSheet, SheetError> {
    let header_row = resolve_header(grid, dict, options)?;
    let (header_map, collisions) = map_columns(&grid[header_row], dict);
    let records = normalize_rows(grid, header_row, &header_map, provenance);
    debug!(
        "normalize_sheet: {} / {} / {}: header at row {}, {} columns mapped, {} records",
        provenance.unit,
        provenance.sub_unit,
        provenance.source_section,
        header_row,
        header_map.len(),
        records.len()
    );
    Ok(NormalizedSheet {
        header_row,
        records,
        collisions,
    })
}
