use clap::Parser;

/// Loads a tree of voter registry spreadsheets into one normalized
/// dataset and answers filter, listing and aggregation queries over it.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (directory path) The root folder containing one sub-folder per
    /// administrative unit. If omitted, the VOTER_DATA_DIR environment
    /// variable is used.
    #[clap(short, long, value_parser)]
    pub data: Option<String>,

    /// (file path) A JSON file with extra header aliases, merged over the
    /// built-in dictionary. Keys are canonical field names, values are
    /// arrays of header spellings.
    #[clap(short, long, value_parser)]
    pub aliases: Option<String>,

    /// Restrict the query to one unit.
    #[clap(long, value_parser)]
    pub unit: Option<String>,

    /// Restrict the query to one sub-unit (ward number).
    #[clap(long, value_parser)]
    pub sub_unit: Option<String>,

    /// Restrict the query to one section (sheet name).
    #[clap(long, value_parser)]
    pub section: Option<String>,

    /// Minimum age, inclusive.
    #[clap(long, value_parser)]
    pub min_age: Option<u32>,

    /// Maximum age, inclusive.
    #[clap(long, value_parser)]
    pub max_age: Option<u32>,

    /// (repeatable) Keep only records with one of these gender values.
    #[clap(long, value_parser)]
    pub gender: Vec<String>,

    /// (repeatable) Keep only records with one of these caste / surname
    /// values.
    #[clap(long, value_parser)]
    pub caste: Vec<String>,

    /// (one of gender, age, caste, location) Print a count breakdown of
    /// the filtered records along this dimension.
    #[clap(long, value_parser)]
    pub by: Option<String>,

    /// (one of units, sub-units, sections) List the available values for
    /// cascading selection instead of querying. sub-units requires
    /// --unit; sections requires --unit and --sub-unit.
    #[clap(long, value_parser)]
    pub list: Option<String>,

    /// (file path or 'stdout') Write the filtered records as CSV. Files
    /// are written with a UTF-8 byte-order marker so spreadsheet
    /// applications pick the right encoding.
    #[clap(short, long, value_parser)]
    pub export: Option<String>,

    /// (file path or 'stdout') Write a JSON summary of the load and the
    /// active breakdown to the given location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference summary in JSON format. If provided, the
    /// produced summary is checked against it and a difference is an
    /// error.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// Number of leading rows scanned for the header row.
    #[clap(long, value_parser)]
    pub look_ahead: Option<usize>,

    /// Minimum number of alias-matching cells for a row to qualify as
    /// the header row.
    #[clap(long, value_parser)]
    pub min_header_matches: Option<usize>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
