use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use voter_registry::*;

use crate::args::Args;

pub mod aliases;
pub mod export;
pub mod io_xlsx;
pub mod summary;

#[derive(Debug, Snafu)]
pub enum RegistryError {
    #[snafu(display("Cannot read the data root directory {path}"))]
    RootMissing {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Error reading sheet {sheet}"))]
    SheetRange {
        source: calamine::XlsxError,
        sheet: String,
    },
    #[snafu(display("Error opening alias file {path}"))]
    OpeningAliases {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing alias file {path}"))]
    ParsingAliases {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Unknown canonical field {name} in alias file, expected one of: {expected}"))]
    UnknownAliasField { name: String, expected: String },
    #[snafu(display("Error writing output file {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing CSV export"))]
    WritingCsv { source: csv::Error },
    #[snafu(display("Error opening summary file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error processing summary JSON"))]
    ParsingJson { source: serde_json::Error },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// A non-fatal problem found during a corpus load, tied to the sheet or
/// file it came from. Warnings degrade the dataset's completeness; they
/// never abort the load.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct LoadWarning {
    pub unit: String,
    pub sub_unit: String,
    /// The sheet name, or "*" when the whole file was unreadable.
    pub source_section: String,
    pub reason: WarningReason,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum WarningReason {
    NoHeaderFound,
    UnreadableSource {
        message: String,
    },
    AmbiguousColumnMapping {
        field: CanonicalField,
        kept_column: usize,
        discarded_column: usize,
    },
}

impl std::fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} / {} / {}: ",
            self.unit, self.sub_unit, self.source_section
        )?;
        match &self.reason {
            WarningReason::NoHeaderFound => write!(f, "no header row found"),
            WarningReason::UnreadableSource { message } => {
                write!(f, "unreadable source: {}", message)
            }
            WarningReason::AmbiguousColumnMapping {
                field,
                kept_column,
                discarded_column,
            } => write!(
                f,
                "columns {} and {} both map to {}, kept column {}",
                discarded_column,
                kept_column,
                field.key(),
                kept_column
            ),
        }
    }
}

// **** Corpus loader ****

/// Walks the unit / sub-unit hierarchy under `root` and loads every
/// sheet of every workbook into one dataset. Failures below the root are
/// demoted to [LoadWarning]s so a single bad file or sheet cannot abort
/// the load; only an unreadable root is fatal.
pub fn load_corpus(
    root: &Path,
    dict: &AliasDictionary,
    options: &LoadOptions,
) -> RegistryResult<(Dataset, Vec<LoadWarning>)> {
    let mut records: Vec<VoterRecord> = Vec::new();
    let mut warnings: Vec<LoadWarning> = Vec::new();

    for (unit, file_path) in discover_spreadsheets(root)? {
        let sub_unit = normalize_sub_unit(&file_path);
        info!(
            "load_corpus: reading {:?} as {} / {}",
            file_path, unit, sub_unit
        );
        let sheets = match io_xlsx::read_workbook_grids(&file_path) {
            Ok(sheets) => sheets,
            Err(e) => {
                warn!("load_corpus: cannot open {:?}: {}", file_path, e);
                warnings.push(LoadWarning {
                    unit: unit.clone(),
                    sub_unit: sub_unit.clone(),
                    source_section: "*".to_string(),
                    reason: WarningReason::UnreadableSource {
                        message: e.to_string(),
                    },
                });
                continue;
            }
        };
        ingest_workbook(
            &unit,
            &sub_unit,
            sheets,
            dict,
            options,
            &mut records,
            &mut warnings,
        );
    }
    info!(
        "load_corpus: {} records, {} warnings",
        records.len(),
        warnings.len()
    );
    Ok((Dataset::new(records), warnings))
}

// Runs one workbook's sheets through the per-sheet pipeline, appending
// records and warnings. Sheet-level failures stay scoped to their sheet.
fn ingest_workbook(
    unit: &str,
    sub_unit: &str,
    sheets: Vec<(String, RegistryResult<RawGrid>)>,
    dict: &AliasDictionary,
    options: &LoadOptions,
    records: &mut Vec<VoterRecord>,
    warnings: &mut Vec<LoadWarning>,
) {
    for (source_section, grid_result) in sheets {
        let provenance = Provenance {
            unit: unit.to_string(),
            sub_unit: sub_unit.to_string(),
            source_section: source_section.clone(),
        };
        let grid = match grid_result {
            Ok(grid) => grid,
            Err(e) => {
                warn!("ingest_workbook: cannot read sheet {}: {}", source_section, e);
                warnings.push(LoadWarning {
                    unit: provenance.unit,
                    sub_unit: provenance.sub_unit,
                    source_section: provenance.source_section,
                    reason: WarningReason::UnreadableSource {
                        message: e.to_string(),
                    },
                });
                continue;
            }
        };
        match normalize_sheet(&grid, dict, options, &provenance) {
            Ok(sheet) => {
                for c in sheet.collisions {
                    warnings.push(LoadWarning {
                        unit: provenance.unit.clone(),
                        sub_unit: provenance.sub_unit.clone(),
                        source_section: provenance.source_section.clone(),
                        reason: WarningReason::AmbiguousColumnMapping {
                            field: c.field,
                            kept_column: c.kept_column,
                            discarded_column: c.discarded_column,
                        },
                    });
                }
                records.extend(sheet.records);
            }
            Err(SheetError::EmptySheet) => {
                debug!("ingest_workbook: skipping empty sheet {}", source_section);
            }
            Err(SheetError::NoHeaderFound) => {
                warnings.push(LoadWarning {
                    unit: provenance.unit,
                    sub_unit: provenance.sub_unit,
                    source_section: provenance.source_section,
                    reason: WarningReason::NoHeaderFound,
                });
            }
        }
    }
}

// Units in sorted folder order, workbooks sorted within each unit, so
// two loads of the same tree see the same discovery order.
fn discover_spreadsheets(root: &Path) -> RegistryResult<Vec<(String, PathBuf)>> {
    let entries = fs::read_dir(root).context(RootMissingSnafu {
        path: root.display().to_string(),
    })?;
    let mut unit_dirs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    unit_dirs.sort();

    let mut out: Vec<(String, PathBuf)> = Vec::new();
    for unit_dir in unit_dirs {
        let unit = match unit_dir.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        let listing = match fs::read_dir(&unit_dir) {
            Ok(listing) => listing,
            Err(e) => {
                warn!("discover_spreadsheets: cannot list {:?}: {}", unit_dir, e);
                continue;
            }
        };
        let mut files: Vec<PathBuf> = listing
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && has_spreadsheet_extension(p))
            .collect();
        files.sort();
        for file in files {
            out.push((unit.clone(), file));
        }
    }
    Ok(out)
}

fn has_spreadsheet_extension(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => {
            let ext = ext.to_lowercase();
            ext == "xlsx" || ext == "xlsm"
        }
        None => false,
    }
}

/// Extracts a clean sub-unit identifier from a workbook file name such
/// as "ward_01.xlsx", "ward-01.xlsx" or "ward no _2.xlsx": the first
/// all-digit token, with leading zeros removed. Falls back to the raw
/// file stem when no number is present.
pub fn normalize_sub_unit(path: &Path) -> String {
    let stem = match path.file_stem().and_then(|s| s.to_str()) {
        Some(stem) => stem,
        None => return String::new(),
    };
    let mut cleaned = stem.to_lowercase();
    for token in ["ward", "no", "_", "-"] {
        cleaned = cleaned.replace(token, " ");
    }
    if let Some(number) = cleaned
        .split_whitespace()
        .find(|p| p.chars().all(|c| c.is_ascii_digit()))
    {
        let trimmed = number.trim_start_matches('0');
        return if trimmed.is_empty() {
            "0".to_string()
        } else {
            trimmed.to_string()
        };
    }
    stem.to_string()
}

// **** Command line entry point ****

pub fn run(args: &Args) -> RegistryResult<()> {
    let root = data_root(args)?;

    let mut dict = AliasDictionary::default();
    if let Some(path) = &args.aliases {
        aliases::read_alias_file(path, &mut dict)?;
    }
    let options = LoadOptions {
        header_look_ahead: args
            .look_ahead
            .unwrap_or(LoadOptions::DEFAULT.header_look_ahead),
        min_header_matches: args
            .min_header_matches
            .unwrap_or(LoadOptions::DEFAULT.min_header_matches),
    };

    info!("run: loading corpus from {}", root);
    let (dataset, warnings) = load_corpus(Path::new(&root), &dict, &options)?;
    println!(
        "Loaded {} voter(s) from {} unit(s).",
        dataset.len(),
        dataset.list_units().len()
    );
    if !warnings.is_empty() {
        eprintln!("{} problem(s) during load, see warnings:", warnings.len());
        for w in &warnings {
            eprintln!("  {}", w);
        }
    }

    if let Some(what) = &args.list {
        return print_listing(&dataset, what, args);
    }

    let criteria = build_criteria(args);
    let view = dataset.filter(&criteria);
    println!("Matching voters: {}", view.len());

    let by = aggregate_key(args)?;
    if let Some(by) = by {
        for (key, count) in view.aggregate(by) {
            println!("{:>8}  {}", count, key);
        }
    }

    if let Some(target) = &args.export {
        export::write_csv(&view, target)?;
        if target != "stdout" {
            println!("Exported {} record(s) to {}", view.len(), target);
        }
    }

    let produced = summary::build_summary(&dataset, &view, &warnings, by);
    if let Some(out) = &args.out {
        let pretty = serde_json::to_string_pretty(&produced).context(ParsingJsonSnafu {})?;
        if out == "stdout" {
            println!("{}", pretty);
        } else {
            fs::write(out, pretty).context(WritingOutputSnafu {
                path: out.as_str(),
            })?;
        }
    }
    if let Some(reference) = &args.reference {
        summary::check_reference(reference, &produced)?;
        println!("Summary matches the reference.");
    }
    Ok(())
}

fn data_root(args: &Args) -> RegistryResult<String> {
    if let Some(data) = &args.data {
        return Ok(data.clone());
    }
    match std::env::var("VOTER_DATA_DIR") {
        Ok(dir) if !dir.is_empty() => Ok(dir),
        _ => whatever!("No data directory given: pass --data or set VOTER_DATA_DIR"),
    }
}

fn print_listing(dataset: &Dataset, what: &str, args: &Args) -> RegistryResult<()> {
    let values = match what {
        "units" => dataset.list_units(),
        "sub-units" => match args.unit.as_deref() {
            Some(unit) => dataset.list_sub_units(unit),
            None => whatever!("--list sub-units requires --unit"),
        },
        "sections" => match (args.unit.as_deref(), args.sub_unit.as_deref()) {
            (Some(unit), Some(sub_unit)) => dataset.list_sections(unit, sub_unit),
            _ => whatever!("--list sections requires --unit and --sub-unit"),
        },
        x => whatever!(
            "Unknown listing {:?}: expected units, sub-units or sections",
            x
        ),
    };
    for value in values {
        println!("{}", value);
    }
    Ok(())
}

fn build_criteria(args: &Args) -> FilterCriteria {
    let age_range = match (args.min_age, args.max_age) {
        (None, None) => None,
        (min, max) => Some((min.unwrap_or(0), max.unwrap_or(u32::MAX))),
    };
    FilterCriteria {
        unit: args.unit.clone(),
        sub_unit: args.sub_unit.clone(),
        source_section: args.section.clone(),
        age_range,
        genders: to_set(&args.gender),
        castes: to_set(&args.caste),
    }
}

fn to_set(values: &[String]) -> Option<HashSet<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().cloned().collect())
    }
}

fn aggregate_key(args: &Args) -> RegistryResult<Option<AggregateKey>> {
    let key = match args.by.as_deref() {
        None => None,
        Some("gender") => Some(AggregateKey::Gender),
        Some("age") => Some(AggregateKey::AgeBand),
        Some("caste") => Some(AggregateKey::Caste),
        Some("location") => Some(AggregateKey::Location),
        Some(x) => whatever!(
            "Unknown breakdown {:?}: expected gender, age, caste or location",
            x
        ),
    };
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn scratch_dir(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!("namawali-{}-{}", label, std::process::id()))
    }

    #[test]
    fn sub_unit_name_normalization() {
        let cases = [
            ("ward_01.xlsx", "1"),
            ("ward-01.xlsx", "1"),
            ("ward no_1.xlsx", "1"),
            ("ward no _2.xlsx", "2"),
            ("3.xlsx", "3"),
            ("ward_00.xlsx", "0"),
            ("Birgunj.xlsx", "Birgunj"),
        ];
        for (file, expected) in cases {
            assert_eq!(
                normalize_sub_unit(Path::new(file)),
                expected,
                "file {}",
                file
            );
        }
    }

    #[test]
    fn missing_root_is_fatal() {
        let root = scratch_dir("missing");
        let res = load_corpus(&root, &AliasDictionary::default(), &LoadOptions::DEFAULT);
        assert!(matches!(res, Err(RegistryError::RootMissing { .. })));
    }

    #[test]
    fn empty_corpus_loads_cleanly() {
        let root = scratch_dir("empty");
        let unit_dir = root.join("Birgunj");
        fs::create_dir_all(&unit_dir).unwrap();
        fs::write(unit_dir.join("notes.txt"), "not a spreadsheet").unwrap();
        let (dataset, warnings) =
            load_corpus(&root, &AliasDictionary::default(), &LoadOptions::DEFAULT).unwrap();
        assert!(dataset.is_empty());
        assert!(warnings.is_empty());
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn unreadable_workbook_becomes_warning() {
        let root = scratch_dir("bad");
        let unit_dir = root.join("Kalaiya");
        fs::create_dir_all(&unit_dir).unwrap();
        fs::write(unit_dir.join("ward_04.xlsx"), b"this is not a workbook").unwrap();
        let (dataset, warnings) =
            load_corpus(&root, &AliasDictionary::default(), &LoadOptions::DEFAULT).unwrap();
        assert!(dataset.is_empty());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].unit, "Kalaiya");
        assert_eq!(warnings[0].sub_unit, "4");
        assert_eq!(warnings[0].source_section, "*");
        assert!(matches!(
            warnings[0].reason,
            WarningReason::UnreadableSource { .. }
        ));
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn bad_sheets_do_not_abort_the_workbook() {
        let header = vec![
            CellValue::Text("सि.नं.".to_string()),
            CellValue::Text("मतदाताको नाम".to_string()),
        ];
        let good_grid: RawGrid = vec![
            header,
            vec![
                CellValue::Number(1.0),
                CellValue::Text("राम थापा".to_string()),
            ],
        ];
        let headerless_grid: RawGrid = vec![vec![CellValue::Text("यो तालिका होइन".to_string())]];
        let sheets: Vec<(String, RegistryResult<RawGrid>)> = vec![
            ("Booth1".to_string(), Ok(good_grid)),
            ("Booth2".to_string(), Ok(headerless_grid)),
            ("Booth3".to_string(), Ok(Vec::new())),
            (
                "Booth4".to_string(),
                Err(RegistryError::Whatever {
                    message: "truncated sheet".to_string(),
                    source: None,
                }),
            ),
        ];
        let mut records: Vec<VoterRecord> = Vec::new();
        let mut warnings: Vec<LoadWarning> = Vec::new();
        ingest_workbook(
            "A",
            "1",
            sheets,
            &AliasDictionary::default(),
            &LoadOptions::DEFAULT,
            &mut records,
            &mut warnings,
        );
        // The good sheet loads; the headerless and unreadable sheets
        // each produce one warning; the empty sheet is skipped silently.
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source_section, "Booth1");
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].source_section, "Booth2");
        assert_eq!(warnings[0].reason, WarningReason::NoHeaderFound);
        assert_eq!(warnings[1].source_section, "Booth4");
        assert!(matches!(
            warnings[1].reason,
            WarningReason::UnreadableSource { .. }
        ));
    }

    #[test]
    fn column_collision_is_surfaced_as_warning() {
        let grid: RawGrid = vec![
            vec![
                CellValue::Text("नाम".to_string()),
                CellValue::Text("उमेर".to_string()),
                CellValue::Text("मतदाताको नाम".to_string()),
            ],
            vec![
                CellValue::Text("क".to_string()),
                CellValue::Number(30.0),
                CellValue::Text("राम थापा".to_string()),
            ],
        ];
        let mut records: Vec<VoterRecord> = Vec::new();
        let mut warnings: Vec<LoadWarning> = Vec::new();
        ingest_workbook(
            "A",
            "1",
            vec![("Booth1".to_string(), Ok(grid))],
            &AliasDictionary::default(),
            &LoadOptions::DEFAULT,
            &mut records,
            &mut warnings,
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name.as_deref(), Some("राम थापा"));
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            warnings[0].reason,
            WarningReason::AmbiguousColumnMapping {
                field: CanonicalField::Name,
                kept_column: 2,
                discarded_column: 0,
            }
        );
    }

    #[test]
    fn criteria_from_args() {
        let args = Args::parse_from([
            "namawali", "--unit", "A", "--min-age", "30", "--gender", "M", "--gender", "F",
        ]);
        let criteria = build_criteria(&args);
        assert_eq!(criteria.unit.as_deref(), Some("A"));
        assert_eq!(criteria.age_range, Some((30, u32::MAX)));
        assert_eq!(criteria.genders.as_ref().map(|g| g.len()), Some(2));
        assert_eq!(criteria.castes, None);
    }

    #[test]
    fn aggregate_key_parsing() {
        let args = Args::parse_from(["namawali", "--by", "age"]);
        assert_eq!(aggregate_key(&args).unwrap(), Some(AggregateKey::AgeBand));
        let args = Args::parse_from(["namawali", "--by", "height"]);
        assert!(aggregate_key(&args).is_err());
    }

    #[test]
    fn warning_lines_identify_the_sheet() {
        let w = LoadWarning {
            unit: "A".to_string(),
            sub_unit: "1".to_string(),
            source_section: "Booth1".to_string(),
            reason: WarningReason::NoHeaderFound,
        };
        assert_eq!(w.to_string(), "A / 1 / Booth1: no header row found");
    }
}
