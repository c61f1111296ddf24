//! Reading maps from byte streams

use crate::ReadOptions;
use jmap_codec::{DynamicMap, JmapError, Result};
use std::io::{BufRead, BufReader, Read};
use tracing::{debug, trace, warn};

/// Outcome of reading one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadSummary {
    /// Bytes consumed from the reader
    pub bytes_read: usize,
    /// Entries in the target map after decoding
    pub entries: usize,
}

/// Read one JSON object from `reader` into a new map
pub fn read_map<R: Read>(reader: R, opts: &ReadOptions) -> Result<DynamicMap> {
    let map = DynamicMap::new();
    read_into(reader, &map, opts)?;
    Ok(map)
}

/// Read one JSON object from `reader` into an existing map.
///
/// Entries already in `template` steer the decode through their policies.
pub fn read_into<R: Read>(
    reader: R,
    template: &DynamicMap,
    opts: &ReadOptions,
) -> Result<ReadSummary> {
    opts.validate()?;
    let buffer = read_bounded(reader, opts.max_input_bytes)?;

    template.decode_slice_with(&buffer, &opts.decode)?;

    let summary = ReadSummary {
        bytes_read: buffer.len(),
        entries: template.len(),
    };
    debug!(
        bytes = summary.bytes_read,
        entries = summary.entries,
        "decoded map from reader"
    );
    Ok(summary)
}

/// Read the whole input, failing once it grows past `limit` bytes.
fn read_bounded<R: Read>(reader: R, limit: usize) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut limited = reader.take(limit as u64 + 1);
    limited.read_to_end(&mut buffer)?;

    if buffer.len() > limit {
        warn!(limit_bytes = limit, "input rejected: too large");
        return Err(JmapError::InputTooLarge { limit_bytes: limit });
    }
    Ok(buffer)
}

/// Iterator over maps decoded from NDJSON input.
///
/// Blank lines are skipped. Each error carries the 1-based line number. The
/// stream stops after the first I/O error.
pub struct MapStream<R: Read> {
    reader: BufReader<R>,
    opts: ReadOptions,
    line: Vec<u8>,
    line_number: usize,
    records: usize,
    failed: bool,
}

impl<R: Read> MapStream<R> {
    /// Create a stream over `reader`
    pub fn new(reader: R, opts: ReadOptions) -> Result<Self> {
        opts.validate()?;
        Ok(Self {
            reader: BufReader::new(reader),
            opts,
            line: Vec::new(),
            line_number: 0,
            records: 0,
            failed: false,
        })
    }

    /// Maps yielded so far
    pub fn records(&self) -> usize {
        self.records
    }

    /// Read the next line, bounded by `max_input_bytes`.
    ///
    /// Returns `Ok(false)` at end of input.
    fn next_line(&mut self) -> Result<bool> {
        self.line.clear();
        let limit = self.opts.max_input_bytes;
        let read = (&mut self.reader)
            .take(limit as u64 + 1)
            .read_until(b'\n', &mut self.line)?;
        if read == 0 {
            return Ok(false);
        }
        self.line_number += 1;
        if read > limit && self.line.last() != Some(&b'\n') {
            warn!(
                line = self.line_number,
                limit_bytes = limit,
                "ndjson record rejected: too large"
            );
            return Err(JmapError::InputTooLarge { limit_bytes: limit });
        }
        Ok(true)
    }
}

impl<R: Read> Iterator for MapStream<R> {
    type Item = Result<DynamicMap>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            match self.next_line() {
                Ok(false) => {
                    debug!(records = self.records, "ndjson stream finished");
                    return None;
                }
                Ok(true) => {}
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err.at_line(self.line_number.max(1))));
                }
            }

            if self.line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            // Bytes go straight to the parser so invalid UTF-8 fails this
            // line only.
            let map = DynamicMap::new();
            return Some(match map.decode_slice_with(&self.line, &self.opts.decode) {
                Ok(()) => {
                    self.records += 1;
                    trace!(line = self.line_number, entries = map.len(), "decoded record");
                    Ok(map)
                }
                Err(err) => Err(err.at_line(self.line_number)),
            });
        }
    }
}
