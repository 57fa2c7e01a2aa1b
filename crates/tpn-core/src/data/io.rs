//! Event I/O: one JSON-encoded [`EventData`] per line.

use super::*;
use crate::{TpnError, TpnResult};
use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Lines, Write},
    path::{Path, PathBuf},
};
use tracing::info;

pub(crate) fn canonicalize_input_path(file_path: &str) -> TpnResult<PathBuf> {
    Ok(Path::new(&*shellexpand::full(file_path)?).canonicalize()?)
}

pub(crate) fn expand_output_path(file_path: &str) -> TpnResult<PathBuf> {
    Ok(PathBuf::from(&*shellexpand::full(file_path)?))
}

/// A streaming reader over a JSON-lines event file. Blank lines are skipped.
pub struct EventLines<R: BufRead> {
    lines: Lines<R>,
    line_number: usize,
}

impl<R: BufRead> EventLines<R> {
    /// Wrap any buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
        }
    }
}

impl<R: BufRead> Iterator for EventLines<R> {
    type Item = TpnResult<EventData>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => return Some(Err(err.into())),
            };
            self.line_number += 1;
            if line.trim().is_empty() {
                continue;
            }
            return Some(serde_json::from_str(&line).map_err(|err| {
                TpnError::Custom(format!("Failed to decode event on line {}: {err}", self.line_number))
            }));
        }
    }
}

/// Open a JSON-lines event file for streaming.
pub fn open_events(file_path: &str) -> TpnResult<EventLines<BufReader<File>>> {
    let path = canonicalize_input_path(file_path)?;
    let file = File::open(path)?;
    Ok(EventLines::new(BufReader::new(file)))
}

/// Read every event in a JSON-lines file into memory.
pub fn read_events(file_path: &str) -> TpnResult<Vec<EventData>> {
    let events = open_events(file_path)?.collect::<TpnResult<Vec<_>>>()?;
    info!(path = file_path, n_events = events.len(), "read events");
    Ok(events)
}

/// Write events as JSON lines.
pub fn write_events<'a, I>(events: I, file_path: &str) -> TpnResult<()>
where
    I: IntoIterator<Item = &'a EventData>,
{
    let path = expand_output_path(file_path)?;
    let mut writer = BufWriter::new(File::create(path)?);
    for event in events {
        serde_json::to_writer(&mut writer, event)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
