use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::types::{MetadataRecord, ScrapeError};

/// Append-only CSV sink. One instance per metadata file.
#[derive(Debug, Clone)]
pub struct MetadataWriter {
    path: PathBuf,
    headers: Vec<String>,
}

impl MetadataWriter {
    pub fn new(path: PathBuf, headers: &[&str]) -> Self {
        MetadataWriter {
            path,
            headers: headers.iter().map(|h| h.to_string()).collect(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, record: &MetadataRecord) -> anyhow::Result<()> {
        append(&self.path, &self.headers, record)
    }
}

/// Creates the file with its header row if needed, then appends `record`
/// in header order. Keys the record lacks are written as empty cells.
pub fn append(path: &Path, headers: &[String], record: &MetadataRecord) -> anyhow::Result<()> {
    let needs_header = !path.is_file()
        || path
            .metadata()
            .context(format!("could not stat metadata file {:?}", path))?
            .len()
            == 0;
    if needs_header {
        if headers.is_empty() {
            return Err(ScrapeError::MissingHeaders(path.to_path_buf()).into());
        }
        let mut writer = csv::Writer::from_path(path)
            .context(format!("could not create metadata file {:?}", path))?;
        writer.write_record(headers)?;
        writer.flush()?;
        debug!("created metadata file {}", path.display());
    }

    let file = OpenOptions::new()
        .append(true)
        .open(path)
        .context(format!("could not open metadata file {:?}", path))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer.write_record(headers.iter().map(|h| record.value(h)))?;
    writer.flush()?;

    Ok(())
}

/// Reads back the header and every row of a metadata file.
pub fn read_rows(path: &Path) -> anyhow::Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader =
        csv::Reader::from_path(path).context(format!("could not read metadata file {:?}", path))?;
    let headers = reader.headers()?.iter().map(String::from).collect();
    let mut rows = vec![];
    for row in reader.records() {
        rows.push(row?.iter().map(String::from).collect());
    }
    Ok((headers, rows))
}

/// Prints a metadata file as `header: value` lines.
pub fn dump(path: &Path) -> anyhow::Result<()> {
    let (headers, rows) = read_rows(path)?;
    println!("{}", headers.join(", "));
    for row in rows {
        for (h, v) in headers.iter().zip(row.iter()) {
            println!("{}: {}", h, v);
        }
        println!();
    }
    Ok(())
}
