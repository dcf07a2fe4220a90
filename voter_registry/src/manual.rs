/*!

# Loading a voter registry corpus

The loader expects a folder tree with one sub-folder per administrative
unit (for instance a municipality), each containing one spreadsheet per
numbered division (a ward), each of whose sheets is one polling location
(a booth):

```text
data/
├── Birgunj/
│   ├── ward_01.xlsx        # sheets: "Booth 1", "Booth 2", ...
│   └── ward_02.xlsx
└── Kalaiya/
    └── ward no _4.xlsx
```

The sheets do not need a uniform layout. Each one is scanned from the top
for the first row in which at least two cells match a known header
spelling; everything above that row (titles, blank spacers, merged-cell
artifacts) is discarded. The matched columns are mapped onto the
canonical schema (`serial_no`, `voter_no`, `name`, `age`, `gender`,
`spouse_name`, `parent_name`, `caste`, `address`, `details`), and every
record is stamped with its unit, sub-unit and section of origin.

Sheets where no header can be found are skipped with a warning; the rest
of the corpus still loads.

# Extending the header dictionary

Header matching is driven by an [AliasDictionary](crate::AliasDictionary)
value. The built-in default covers the Devanagari headers observed in the
sample registries, for example `सि.नं.`, `मतदाता नं`, `मतदाताको नाम`,
`उमेर(वर्ष)` and `लिङ्ग`. Comparison ignores case, repeated whitespace,
common punctuation and parenthetical qualifiers, so `उमेर (वर्ष)` and
`उमेर` both resolve to `age`.

When a municipality words its headers differently, pass the `namawali`
binary a JSON file mapping canonical field names to extra spellings:

```json
{
  "voter_no": ["मतदाता क्रम सं."],
  "age": ["age (years)"]
}
```

```bash
namawali --data ./data --aliases extra_aliases.json --by gender
```

# Tuning header detection

Two knobs control the search for the header row and are exposed both on
[LoadOptions](crate::LoadOptions) and as CLI flags:

- `--look-ahead` (default 15): how many leading rows are scanned before
  the sheet is given up on.
- `--min-header-matches` (default 2): how many alias-matching cells a row
  needs to qualify as the header. Raise this if decorative rows in your
  corpus happen to contain two header-like words.

*/
