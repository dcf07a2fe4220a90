// Reading user-provided alias dictionaries.

use snafu::prelude::*;
use std::collections::HashMap;

use crate::registry::*;

/// Merges the alias file at `path` over `dict`.
///
/// The file is a JSON object mapping canonical field names to arrays of
/// extra header spellings:
///
/// ```json
/// { "voter_no": ["मतदाता क्रम सं."], "age": ["age (years)"] }
/// ```
pub fn read_alias_file(path: &str, dict: &mut AliasDictionary) -> RegistryResult<()> {
    let contents = fs::read_to_string(path).context(OpeningAliasesSnafu { path })?;
    merge_alias_json(&contents, path, dict)
}

fn merge_alias_json(
    contents: &str,
    path: &str,
    dict: &mut AliasDictionary,
) -> RegistryResult<()> {
    let raw: HashMap<String, Vec<String>> =
        serde_json::from_str(contents).context(ParsingAliasesSnafu { path })?;
    // Sorted so the merge order does not depend on the map's hashing.
    let mut entries: Vec<(String, Vec<String>)> = raw.into_iter().collect();
    entries.sort();
    for (key, spellings) in entries {
        let field = CanonicalField::from_key(&key).context(UnknownAliasFieldSnafu {
            name: key.clone(),
            expected: expected_keys(),
        })?;
        debug!(
            "merge_alias_json: {} += {} spelling(s)",
            field.key(),
            spellings.len()
        );
        dict.extend(field, &spellings);
    }
    Ok(())
}

fn expected_keys() -> String {
    CanonicalField::ALL
        .iter()
        .map(|f| f.key())
        .collect::<Vec<&str>>()
        .join(", ")
}
