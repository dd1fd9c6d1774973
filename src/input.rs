use std::{
    fs,
    io::{BufRead, Write},
    path::Path,
};

use anyhow::Context;

use crate::types::ScrapeError;

/// Reads one URL per line, trimmed, blank lines skipped.
pub fn read_url_file(path: &Path) -> anyhow::Result<Vec<String>> {
    info!("getting URLs from {}", path.display());
    if !path.is_file() {
        return Err(ScrapeError::InputFileNotFound(path.to_path_buf()).into());
    }
    let content =
        fs::read_to_string(path).context(format!("could not read url file {:?}", path))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect())
}

/// Asks for a single URL on `writer`, reading the answer from `reader`.
pub fn prompt_url<R: BufRead, W: Write>(reader: &mut R, writer: &mut W) -> anyhow::Result<Vec<String>> {
    write!(writer, "TikTok page: ")?;
    writer.flush()?;

    let mut line = String::new();
    reader.read_line(&mut line)?;
    let url = line.trim();
    if url.is_empty() {
        return Ok(vec![]);
    }
    Ok(vec![url.to_string()])
}

/// Resolves the list of targets: file first, then the single URL, then the prompt.
pub fn resolve_targets<R: BufRead, W: Write>(
    file: Option<&Path>,
    url: Option<&str>,
    reader: &mut R,
    writer: &mut W,
) -> anyhow::Result<Vec<String>> {
    let urls = if let Some(file) = file {
        read_url_file(file)?
    } else if let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) {
        vec![url.to_string()]
    } else {
        prompt_url(reader, writer)?
    };

    if urls.is_empty() {
        return Err(ScrapeError::NoInput.into());
    }
    Ok(urls)
}
