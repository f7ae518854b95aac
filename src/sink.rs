//! Cumulative CSV spreadsheet of captured rows.

use std::{fs::File, io, path::Path};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use crate::chain::OptionChainRow;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("spreadsheet io: {0}")]
    Io(#[from] io::Error),
    #[error("spreadsheet format: {0}")]
    Csv(#[from] csv::Error),
}

/// Appends `rows` below whatever `path` already holds and returns how many
/// were written.
///
/// Existing records are carried over untouched under the existing header.
/// The file is rewritten in place, so a crash mid-write can lose it. With no
/// rows the file is not touched at all.
pub fn append_rows(path: &Path, rows: &[OptionChainRow]) -> Result<usize, SinkError> {
    if rows.is_empty() {
        return Ok(0);
    }

    let (headers, existing) = read_existing(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    writer.write_record(&headers)?;
    for record in &existing {
        writer.write_record(record)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(rows.len())
}

fn read_existing(path: &Path) -> Result<(StringRecord, Vec<StringRecord>), SinkError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Ok((StringRecord::from(&OptionChainRow::HEADERS[..]), Vec::new()));
        }
        Err(e) => return Err(e.into()),
    };

    let mut reader = ReaderBuilder::new().flexible(true).from_reader(file);
    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Ok((StringRecord::from(&OptionChainRow::HEADERS[..]), Vec::new()));
    }
    let existing = reader.records().collect::<Result<Vec<_>, _>>()?;

    Ok((headers, existing))
}
