// ********* Raw cell model ***********

/// A single cell as read from a worksheet, before any interpretation.
///
/// Registry sheets in the wild mix text, numbers and blanks freely within
/// the same column, so the raw value stays tagged until the coercion rule
/// for the target field decides what to make of it.
#[derive(PartialEq, Debug, Clone)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Empty,
}

/// One sheet's cells exactly as read, row-major. Ephemeral: discarded
/// once the sheet has been normalized.
pub type RawGrid = Vec<Vec<CellValue>>;

impl CellValue {
    /// True when the cell carries no usable content.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

// ********* Canonical schema ***********

/// The normalized schema that every sheet is mapped onto, regardless of
/// how its headers are worded.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum CanonicalField {
    SerialNo,
    VoterNo,
    Name,
    Age,
    Gender,
    SpouseName,
    ParentName,
    Caste,
    Address,
    Details,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 10] = [
        CanonicalField::SerialNo,
        CanonicalField::VoterNo,
        CanonicalField::Name,
        CanonicalField::Age,
        CanonicalField::Gender,
        CanonicalField::SpouseName,
        CanonicalField::ParentName,
        CanonicalField::Caste,
        CanonicalField::Address,
        CanonicalField::Details,
    ];

    /// The stable key used in alias files and export headers.
    pub fn key(&self) -> &'static str {
        match self {
            CanonicalField::SerialNo => "serial_no",
            CanonicalField::VoterNo => "voter_no",
            CanonicalField::Name => "name",
            CanonicalField::Age => "age",
            CanonicalField::Gender => "gender",
            CanonicalField::SpouseName => "spouse_name",
            CanonicalField::ParentName => "parent_name",
            CanonicalField::Caste => "caste",
            CanonicalField::Address => "address",
            CanonicalField::Details => "details",
        }
    }

    pub fn from_key(key: &str) -> Option<CanonicalField> {
        CanonicalField::ALL.iter().cloned().find(|f| f.key() == key)
    }
}

// ********* Alias dictionary ***********

/// Maps canonical fields to the raw header spellings that refer to them.
///
/// The dictionary is data, not code: the default below covers the
/// Devanagari headers observed across the sample registries plus a few
/// Latin-script fallbacks, and callers may extend it (or start from
/// [AliasDictionary::empty] to replace it) without touching the mapping
/// logic.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AliasDictionary {
    aliases: Vec<(CanonicalField, Vec<String>)>,
}

impl AliasDictionary {
    pub fn empty() -> AliasDictionary {
        AliasDictionary {
            aliases: CanonicalField::ALL
                .iter()
                .map(|f| (*f, Vec::new()))
                .collect(),
        }
    }

    pub fn add_alias(&mut self, field: CanonicalField, alias: &str) {
        for (f, spellings) in self.aliases.iter_mut() {
            if *f == field && !spellings.iter().any(|s| s == alias) {
                spellings.push(alias.to_string());
            }
        }
    }

    pub fn extend(&mut self, field: CanonicalField, aliases: &[String]) {
        for alias in aliases {
            self.add_alias(field, alias);
        }
    }

    /// All (field, spellings) pairs, in canonical field order.
    pub fn entries(&self) -> impl Iterator<Item = (CanonicalField, &[String])> + '_ {
        self.aliases.iter().map(|(f, s)| (*f, s.as_slice()))
    }
}

impl Default for AliasDictionary {
    fn default() -> AliasDictionary {
        let mut dict = AliasDictionary::empty();
        let defaults: [(CanonicalField, &[&str]); 10] = [
            (
                CanonicalField::SerialNo,
                &["सि.नं.", "सि.नं", "क्र.सं.", "s.n."],
            ),
            (
                CanonicalField::VoterNo,
                &["मतदाता नं", "मतदाता नं.", "मतदाता क्रम सं.", "मतदाता नम्बर", "voter no"],
            ),
            (
                CanonicalField::Name,
                &["मतदाताको नाम", "मतदाताको नाम थर", "नाम", "name"],
            ),
            (
                CanonicalField::Age,
                &["उमेर(वर्ष)", "उमेर (वर्ष)", "उमेर", "age"],
            ),
            (CanonicalField::Gender, &["लिङ्ग", "लिंग", "gender"]),
            (
                CanonicalField::SpouseName,
                &["पति/पत्नीको नाम", "पति वा पत्नीको नाम"],
            ),
            (
                CanonicalField::ParentName,
                &["पिता/माताको नाम", "बाबु/आमाको नाम"],
            ),
            (CanonicalField::Caste, &["जात", "थर", "जात/थर", "caste"]),
            (CanonicalField::Address, &["ठेगाना", "address"]),
            (CanonicalField::Details, &["मतदाता विवरण", "details"]),
        ];
        for (field, spellings) in defaults {
            for alias in spellings {
                dict.add_alias(field, alias);
            }
        }
        dict
    }
}

// ********* Header map ***********

/// Where each canonical field was found in one sheet, as a zero-based
/// column index. Built once per sheet and immutable afterwards; fields
/// whose column is missing from the sheet are simply absent.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct HeaderMap {
    columns: Vec<(CanonicalField, usize)>,
}

impl HeaderMap {
    pub fn column(&self, field: CanonicalField) -> Option<usize> {
        self.columns
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, idx)| *idx)
    }

    pub fn fields(&self) -> impl Iterator<Item = (CanonicalField, usize)> + '_ {
        self.columns.iter().cloned()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Records the column for a field. Returns the previously mapped
    /// column when the field was already present; the new column wins.
    pub fn insert(&mut self, field: CanonicalField, column: usize) -> Option<usize> {
        for (f, idx) in self.columns.iter_mut() {
            if *f == field {
                let previous = *idx;
                *idx = column;
                return Some(previous);
            }
        }
        self.columns.push((field, column));
        None
    }
}

/// Two header cells in the same sheet claimed the same canonical field.
/// The later column wins; the discarded one is surfaced as a warning.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ColumnCollision {
    pub field: CanonicalField,
    pub kept_column: usize,
    pub discarded_column: usize,
}

// ********* Tuning knobs ***********

/// Tunable parameters of the header detection pass.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct LoadOptions {
    /// How many leading rows to scan before giving up on a sheet.
    pub header_look_ahead: usize,
    /// Minimum number of alias-matching cells for a row to qualify as
    /// the header row.
    pub min_header_matches: usize,
}

impl LoadOptions {
    pub const DEFAULT: LoadOptions = LoadOptions {
        header_look_ahead: 15,
        min_header_matches: 2,
    };
}

impl Default for LoadOptions {
    fn default() -> LoadOptions {
        LoadOptions::DEFAULT
    }
}

// ********* Records ***********

/// Where a record came from in the unit / sub-unit / sheet hierarchy.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Provenance {
    /// Top-level administrative area, from the containing folder name.
    pub unit: String,
    /// Numbered division within the unit, from the file name.
    pub sub_unit: String,
    /// Polling location, from the sheet name.
    pub source_section: String,
}

/// One normalized row of voter data.
///
/// Every canonical field is independently optional: which fields are
/// available depends on the columns the source sheet carried. The three
/// provenance fields are always present and non-empty.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct VoterRecord {
    pub serial_no: Option<i64>,
    pub voter_no: Option<i64>,
    pub name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub spouse_name: Option<String>,
    pub parent_name: Option<String>,
    pub caste: Option<String>,
    pub address: Option<String>,
    pub details: Option<String>,
    pub unit: String,
    pub sub_unit: String,
    pub source_section: String,
}

impl VoterRecord {
    pub fn empty(provenance: &Provenance) -> VoterRecord {
        VoterRecord {
            unit: provenance.unit.clone(),
            sub_unit: provenance.sub_unit.clone(),
            source_section: provenance.source_section.clone(),
            ..VoterRecord::default()
        }
    }

    /// True when at least one canonical field carries a value.
    pub fn has_any_field(&self) -> bool {
        self.serial_no.is_some()
            || self.voter_no.is_some()
            || self.name.is_some()
            || self.age.is_some()
            || self.gender.is_some()
            || self.spouse_name.is_some()
            || self.parent_name.is_some()
            || self.caste.is_some()
            || self.address.is_some()
            || self.details.is_some()
    }

    /// The last whitespace-separated token of the name, treated as the
    /// family name. "अकलेश कुमार गुप्ता" gives "गुप्ता".
    pub fn surname(&self) -> Option<&str> {
        self.name.as_deref().and_then(|n| n.split_whitespace().last())
    }

    /// Folds the common English and Nepali gender spellings onto "Male"
    /// and "Female". Unrecognized values are returned untouched.
    pub fn normalized_gender(&self) -> Option<String> {
        self.gender.as_deref().map(|g| {
            match g.trim().to_lowercase().as_str() {
                "m" | "male" | "पुरुष" => "Male".to_string(),
                "f" | "female" | "महिला" => "Female".to_string(),
                _ => g.trim().to_string(),
            }
        })
    }

    /// The age band used for the distribution breakdowns. Ages outside
    /// the bands (0, or past 200) have no band.
    pub fn age_band(&self) -> Option<&'static str> {
        match self.age {
            Some(a) if (1..=25).contains(&a) => Some("18-25"),
            Some(a) if (26..=35).contains(&a) => Some("26-35"),
            Some(a) if (36..=45).contains(&a) => Some("36-45"),
            Some(a) if (46..=60).contains(&a) => Some("46-60"),
            Some(a) if (61..=200).contains(&a) => Some("60+"),
            _ => None,
        }
    }

    /// The value used for caste filtering and breakdowns: the explicit
    /// caste column when the sheet had one, else the derived surname.
    pub fn caste_label(&self) -> Option<&str> {
        self.caste.as_deref().or_else(|| self.surname())
    }

    /// Composite location label, one per (unit, sub-unit, section).
    pub fn location_key(&self) -> String {
        format!(
            "{} - वडा {} - {}",
            self.unit, self.sub_unit, self.source_section
        )
    }
}

// ********* Errors ***********

/// Errors that prevent a single sheet from being normalized.
///
/// These are deliberately scoped to one sheet: the corpus loader turns
/// them into warnings so one bad sheet never aborts a whole load.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum SheetError {
    /// No row within the look-ahead bound matched enough known headers.
    NoHeaderFound,
    /// The sheet contains no rows at all.
    EmptySheet,
}

impl std::error::Error for SheetError {}

impl std::fmt::Display for SheetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetError::NoHeaderFound => write!(f, "no header row found"),
            SheetError::EmptySheet => write!(f, "sheet is empty"),
        }
    }
}
