// JSON summaries of a load, for reporting and regression checks.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JSValue};
use snafu::prelude::*;
use text_diff::print_diff;

use crate::registry::*;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct LoadStats {
    #[serde(rename = "totalRecords")]
    pub total_records: u64,
    #[serde(rename = "matchingRecords")]
    pub matching_records: u64,
    pub units: Vec<String>,
    #[serde(rename = "warningCount")]
    pub warning_count: u64,
}

/// Assembles the machine-readable summary of a load: corpus statistics,
/// the warning lines, and the active breakdown when one was requested.
pub fn build_summary(
    dataset: &Dataset,
    view: &DatasetView<'_>,
    warnings: &[LoadWarning],
    by: Option<AggregateKey>,
) -> JSValue {
    let stats = LoadStats {
        total_records: dataset.len() as u64,
        matching_records: view.len() as u64,
        units: dataset.list_units(),
        warning_count: warnings.len() as u64,
    };
    let warning_lines: Vec<JSValue> = warnings.iter().map(|w| json!(w.to_string())).collect();
    let mut js = json!({ "stats": stats, "warnings": warning_lines });
    if let Some(by) = by {
        let tally: Vec<JSValue> = view
            .aggregate(by)
            .iter()
            .map(|(key, count)| json!({ "key": key, "count": count }))
            .collect();
        js["breakdown"] = json!({ "by": by_name(by), "tally": tally });
    }
    js
}

fn by_name(by: AggregateKey) -> &'static str {
    match by {
        AggregateKey::Gender => "gender",
        AggregateKey::AgeBand => "age",
        AggregateKey::Caste => "caste",
        AggregateKey::Location => "location",
    }
}

pub fn read_summary(path: &str) -> RegistryResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})
}

/// Compares the produced summary against a reference file. A difference
/// is printed and reported as an error so data refreshes can be checked
/// for regressions.
pub fn check_reference(path: &str, produced: &JSValue) -> RegistryResult<()> {
    let reference = read_summary(path)?;
    let pretty_reference =
        serde_json::to_string_pretty(&reference).context(ParsingJsonSnafu {})?;
    let pretty_produced = serde_json::to_string_pretty(produced).context(ParsingJsonSnafu {})?;
    if pretty_reference != pretty_produced {
        warn!("check_reference: found differences with the reference summary");
        print_diff(pretty_reference.as_str(), pretty_produced.as_str(), "\n");
        whatever!("Difference detected between produced summary and reference summary");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dataset() -> Dataset {
        let mut records: Vec<VoterRecord> = Vec::new();
        for (name, gender) in [("राम थापा", "M"), ("सीता शर्मा", "F")] {
            let mut r = VoterRecord::empty(&Provenance {
                unit: "A".to_string(),
                sub_unit: "1".to_string(),
                source_section: "Booth1".to_string(),
            });
            r.name = Some(name.to_string());
            r.gender = Some(gender.to_string());
            records.push(r);
        }
        Dataset::new(records)
    }

    #[test]
    fn summary_shape() {
        let dataset = sample_dataset();
        let view = dataset.filter(&FilterCriteria::default());
        let warnings = vec![LoadWarning {
            unit: "B".to_string(),
            sub_unit: "2".to_string(),
            source_section: "Booth9".to_string(),
            reason: WarningReason::NoHeaderFound,
        }];
        let js = build_summary(&dataset, &view, &warnings, Some(AggregateKey::Gender));
        assert_eq!(js["stats"]["totalRecords"], json!(2));
        assert_eq!(js["stats"]["matchingRecords"], json!(2));
        assert_eq!(js["stats"]["units"], json!(["A"]));
        assert_eq!(js["stats"]["warningCount"], json!(1));
        assert_eq!(
            js["warnings"][0],
            json!("B / 2 / Booth9: no header row found")
        );
        assert_eq!(js["breakdown"]["by"], json!("gender"));
        // Ties on count are broken by key for a stable summary.
        assert_eq!(
            js["breakdown"]["tally"],
            json!([
                { "key": "F", "count": 1 },
                { "key": "M", "count": 1 }
            ])
        );
    }

    #[test]
    fn summary_without_breakdown() {
        let dataset = sample_dataset();
        let view = dataset.filter(&FilterCriteria::default());
        let js = build_summary(&dataset, &view, &[], None);
        assert!(js.get("breakdown").is_none());
        assert_eq!(js["warnings"], json!([]));
    }
}
