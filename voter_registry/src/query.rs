//! Filtering and aggregation over a loaded dataset.
//!
//! The dataset is built once per load pass and never mutated afterwards.
//! Filtering produces index-based views into the shared records, so any
//! number of queries can run against the same dataset.

use std::collections::{HashMap, HashSet};

use crate::config::VoterRecord;

/// The combined record set across all units for one load pass.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<VoterRecord>,
}

/// Record selection criteria. `None` means "all" for that dimension.
///
/// Records lacking a field that a criterion constrains are excluded by
/// that criterion: an age range keeps only records that have an age.
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct FilterCriteria {
    pub unit: Option<String>,
    pub sub_unit: Option<String>,
    pub source_section: Option<String>,
    /// Inclusive bounds.
    pub age_range: Option<(u32, u32)>,
    pub genders: Option<HashSet<String>>,
    pub castes: Option<HashSet<String>>,
}

/// The dimensions a view can be counted along.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum AggregateKey {
    Gender,
    AgeBand,
    Caste,
    Location,
}

/// Column order of the flat export rows.
pub const EXPORT_COLUMNS: [&str; 14] = [
    "serial_no",
    "voter_no",
    "name",
    "age",
    "gender",
    "surname",
    "spouse_name",
    "parent_name",
    "caste",
    "address",
    "details",
    "unit",
    "sub_unit",
    "source_section",
];

impl Dataset {
    pub fn new(records: Vec<VoterRecord>) -> Dataset {
        Dataset { records }
    }

    pub fn records(&self) -> &[VoterRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The distinct units, sorted.
    pub fn list_units(&self) -> Vec<String> {
        sorted_unique(self.records.iter().map(|r| r.unit.clone()))
    }

    /// The distinct sub-units of one unit, sorted.
    pub fn list_sub_units(&self, unit: &str) -> Vec<String> {
        sorted_unique(
            self.records
                .iter()
                .filter(|r| r.unit == unit)
                .map(|r| r.sub_unit.clone()),
        )
    }

    /// The distinct sections of one sub-unit, sorted.
    pub fn list_sections(&self, unit: &str, sub_unit: &str) -> Vec<String> {
        sorted_unique(
            self.records
                .iter()
                .filter(|r| r.unit == unit && r.sub_unit == sub_unit)
                .map(|r| r.source_section.clone()),
        )
    }

    /// Selects the records matching the criteria. A pure function of
    /// (dataset, criteria): the dataset itself is never modified.
    pub fn filter(&self, criteria: &FilterCriteria) -> DatasetView<'_> {
        let indices = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| matches(r, criteria))
            .map(|(idx, _)| idx)
            .collect();
        DatasetView {
            dataset: self,
            indices,
        }
    }
}

fn sorted_unique(values: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = values.collect();
    out.sort();
    out.dedup();
    out
}

fn matches(record: &VoterRecord, criteria: &FilterCriteria) -> bool {
    if let Some(unit) = &criteria.unit {
        if record.unit != *unit {
            return false;
        }
    }
    if let Some(sub_unit) = &criteria.sub_unit {
        if record.sub_unit != *sub_unit {
            return false;
        }
    }
    if let Some(section) = &criteria.source_section {
        if record.source_section != *section {
            return false;
        }
    }
    if let Some((min, max)) = criteria.age_range {
        match record.age {
            Some(age) if age >= min && age <= max => {}
            _ => return false,
        }
    }
    if let Some(genders) = &criteria.genders {
        match &record.gender {
            Some(g) if genders.contains(g) => {}
            _ => return false,
        }
    }
    if let Some(castes) = &criteria.castes {
        match record.caste_label() {
            Some(c) if castes.contains(c) => {}
            _ => return false,
        }
    }
    true
}

/// A read-only selection of records from one dataset.
#[derive(Debug, Clone)]
pub struct DatasetView<'a> {
    dataset: &'a Dataset,
    indices: Vec<usize>,
}

impl<'a> DatasetView<'a> {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &'a VoterRecord> + '_ {
        self.indices.iter().map(|idx| &self.dataset.records[*idx])
    }

    /// Counts the view's records along one dimension. Records without a
    /// value for that dimension are not counted. The result is sorted by
    /// descending count, ties broken by key, so equal inputs always
    /// produce equal output.
    pub fn aggregate(&self, by: AggregateKey) -> Vec<(String, u64)> {
        let mut counts: HashMap<String, u64> = HashMap::new();
        for record in self.records() {
            let key = match by {
                AggregateKey::Gender => record.gender.clone(),
                AggregateKey::AgeBand => record.age_band().map(|b| b.to_string()),
                AggregateKey::Caste => record.caste_label().map(|c| c.to_string()),
                AggregateKey::Location => Some(record.location_key()),
            };
            if let Some(key) = key {
                *counts.entry(key).or_insert(0) += 1;
            }
        }
        let mut out: Vec<(String, u64)> = counts.into_iter().collect();
        out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        out
    }

    /// Flattens the view into string rows in [EXPORT_COLUMNS] order, for
    /// the downstream CSV / table rendering collaborator.
    pub fn export_rows(&self) -> Vec<Vec<String>> {
        self.records()
            .map(|r| {
                vec![
                    fmt_int(r.serial_no),
                    fmt_int(r.voter_no),
                    fmt_opt(r.name.as_deref()),
                    r.age.map(|a| a.to_string()).unwrap_or_default(),
                    fmt_opt(r.gender.as_deref()),
                    fmt_opt(r.surname()),
                    fmt_opt(r.spouse_name.as_deref()),
                    fmt_opt(r.parent_name.as_deref()),
                    fmt_opt(r.caste.as_deref()),
                    fmt_opt(r.address.as_deref()),
                    fmt_opt(r.details.as_deref()),
                    r.unit.clone(),
                    r.sub_unit.clone(),
                    r.source_section.clone(),
                ]
            })
            .collect()
    }
}

fn fmt_int(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn fmt_opt(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Provenance;

    fn record(unit: &str, sub_unit: &str, section: &str) -> VoterRecord {
        VoterRecord::empty(&Provenance {
            unit: unit.to_string(),
            sub_unit: sub_unit.to_string(),
            source_section: section.to_string(),
        })
    }

    fn voter(
        unit: &str,
        sub_unit: &str,
        section: &str,
        name: &str,
        age: Option<u32>,
        gender: &str,
    ) -> VoterRecord {
        let mut r = record(unit, sub_unit, section);
        r.name = Some(name.to_string());
        r.age = age;
        r.gender = Some(gender.to_string());
        r
    }

    fn sample() -> Dataset {
        Dataset::new(vec![
            voter("A", "1", "Booth1", "राम थापा", Some(34), "M"),
            voter("A", "1", "Booth2", "सीता शर्मा", Some(41), "F"),
            voter("A", "2", "Booth3", "हरि गुरुङ", Some(27), "M"),
            voter("B", "1", "Booth1", "गीता राई", None, "F"),
        ])
    }

    #[test]
    fn cascading_lists() {
        let ds = sample();
        assert_eq!(ds.list_units(), vec!["A", "B"]);
        assert_eq!(ds.list_sub_units("A"), vec!["1", "2"]);
        assert_eq!(ds.list_sub_units("C"), Vec::<String>::new());
        assert_eq!(ds.list_sections("A", "1"), vec!["Booth1", "Booth2"]);
    }

    #[test]
    fn filter_by_location() {
        let ds = sample();
        let criteria = FilterCriteria {
            unit: Some("A".to_string()),
            sub_unit: Some("1".to_string()),
            ..FilterCriteria::default()
        };
        let view = ds.filter(&criteria);
        assert_eq!(view.len(), 2);
        assert!(view.records().all(|r| r.unit == "A" && r.sub_unit == "1"));
    }

    #[test]
    fn age_filter_excludes_records_without_age() {
        let ds = sample();
        let criteria = FilterCriteria {
            age_range: Some((30, 50)),
            ..FilterCriteria::default()
        };
        let view = ds.filter(&criteria);
        let names: Vec<&str> = view.records().filter_map(|r| r.name.as_deref()).collect();
        assert_eq!(names, vec!["राम थापा", "सीता शर्मा"]);
    }

    #[test]
    fn gender_filter() {
        let ds = sample();
        let criteria = FilterCriteria {
            genders: Some(["F".to_string()].into_iter().collect()),
            ..FilterCriteria::default()
        };
        assert_eq!(ds.filter(&criteria).len(), 2);
    }

    #[test]
    fn caste_filter_uses_surname_fallback() {
        let ds = sample();
        let criteria = FilterCriteria {
            castes: Some(["थापा".to_string()].into_iter().collect()),
            ..FilterCriteria::default()
        };
        let view = ds.filter(&criteria);
        assert_eq!(view.len(), 1);
        assert_eq!(view.records().next().unwrap().name.as_deref(), Some("राम थापा"));
    }

    #[test]
    fn filtering_is_pure_and_repeatable() {
        let ds = sample();
        let units_before = ds.list_units();
        let criteria = FilterCriteria {
            unit: Some("A".to_string()),
            ..FilterCriteria::default()
        };
        let first: Vec<Vec<String>> = ds.filter(&criteria).export_rows();
        let second: Vec<Vec<String>> = ds.filter(&criteria).export_rows();
        assert_eq!(first, second);
        assert_eq!(ds.list_units(), units_before);
        assert_eq!(ds.len(), 4);
    }

    #[test]
    fn gender_aggregate_ordering() {
        let mut records: Vec<VoterRecord> = Vec::new();
        for i in 0..7 {
            records.push(voter("A", "1", "B1", &format!("व{}", i), Some(30), "M"));
        }
        for i in 0..3 {
            records.push(voter("A", "1", "B1", &format!("म{}", i), Some(30), "F"));
        }
        let ds = Dataset::new(records);
        let tally = ds.filter(&FilterCriteria::default()).aggregate(AggregateKey::Gender);
        assert_eq!(
            tally,
            vec![("M".to_string(), 7), ("F".to_string(), 3)]
        );
    }

    #[test]
    fn aggregate_ties_break_by_key() {
        let ds = Dataset::new(vec![
            voter("A", "1", "B1", "क", Some(30), "M"),
            voter("A", "1", "B1", "ख", Some(30), "F"),
        ]);
        let tally = ds.filter(&FilterCriteria::default()).aggregate(AggregateKey::Gender);
        assert_eq!(tally, vec![("F".to_string(), 1), ("M".to_string(), 1)]);
    }

    #[test]
    fn age_band_aggregate_skips_absent_ages() {
        let ds = sample();
        let tally = ds
            .filter(&FilterCriteria::default())
            .aggregate(AggregateKey::AgeBand);
        let total: u64 = tally.iter().map(|(_, c)| c).sum();
        // The record without an age does not appear in any band.
        assert_eq!(total, 3);
    }

    #[test]
    fn location_aggregate_uses_composite_key() {
        let ds = sample();
        let tally = ds
            .filter(&FilterCriteria::default())
            .aggregate(AggregateKey::Location);
        assert_eq!(tally.len(), 4);
        assert!(tally.iter().all(|(k, c)| k.contains(" - वडा ") && *c == 1));
    }

    #[test]
    fn normalize_then_export_round_trip() {
        use crate::{normalize_sheet, AliasDictionary, CellValue, LoadOptions};

        let t = |s: &str| CellValue::Text(s.to_string());
        let grid = vec![
            vec![t("सि.नं."), t("मतदाताको नाम"), t("उमेर")],
            vec![CellValue::Number(1.0), t("राम  बहादुर थापा"), t("34")],
            vec![CellValue::Number(2.0), t("सीता शर्मा"), t("41")],
        ];
        let sheet = normalize_sheet(
            &grid,
            &AliasDictionary::default(),
            &LoadOptions::DEFAULT,
            &Provenance {
                unit: "A".to_string(),
                sub_unit: "1".to_string(),
                source_section: "Booth1".to_string(),
            },
        )
        .unwrap();
        let dataset = Dataset::new(sheet.records);
        let rows = dataset.filter(&FilterCriteria::default()).export_rows();
        // Every well-formed data row comes back out, values intact.
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "1");
        assert_eq!(rows[0][2], "राम  बहादुर थापा");
        assert_eq!(rows[0][3], "34");
        assert_eq!(rows[1][0], "2");
        assert_eq!(rows[1][3], "41");
    }

    #[test]
    fn export_preserves_values_exactly() {
        let mut r = voter("A", "1", "Booth1", "राम  बहादुर थापा", Some(34), "M");
        r.serial_no = Some(1);
        r.voter_no = Some(4200153);
        let ds = Dataset::new(vec![r]);
        let rows = ds.filter(&FilterCriteria::default()).export_rows();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.len(), EXPORT_COLUMNS.len());
        assert_eq!(row[0], "1");
        assert_eq!(row[1], "4200153");
        // Internal double space in the name is data, not noise.
        assert_eq!(row[2], "राम  बहादुर थापा");
        assert_eq!(row[3], "34");
        assert_eq!(row[5], "थापा");
        assert_eq!(row[11..], ["A", "1", "Booth1"]);
    }
}
