// CSV export of a filtered view.

use snafu::prelude::*;
use std::fs::File;
use std::io;
use std::io::Write;

use crate::registry::*;

/// Writes the view's records as CSV to a file or to standard output.
///
/// Files start with a UTF-8 byte-order marker so spreadsheet
/// applications detect the encoding of the Devanagari content; stdout
/// stays bare for piping.
pub fn write_csv(view: &DatasetView<'_>, target: &str) -> RegistryResult<()> {
    if target == "stdout" {
        let stdout = io::stdout();
        write_records(view, stdout.lock(), target)
    } else {
        let mut file = File::create(target).context(WritingOutputSnafu { path: target })?;
        file.write_all("\u{feff}".as_bytes())
            .context(WritingOutputSnafu { path: target })?;
        write_records(view, file, target)
    }
}

fn write_records<W: io::Write>(
    view: &DatasetView<'_>,
    writer: W,
    path: &str,
) -> RegistryResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer
        .write_record(EXPORT_COLUMNS)
        .context(WritingCsvSnafu {})?;
    for row in view.export_rows() {
        csv_writer.write_record(&row).context(WritingCsvSnafu {})?;
    }
    csv_writer.flush().context(WritingOutputSnafu { path })?;
    Ok(())
}
