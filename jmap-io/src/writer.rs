//! Writing encoded maps to byte streams

use jmap_codec::{DynamicMap, EncodeOptions, Result};
use std::io::{BufWriter, Write};
use tracing::{debug, trace};

/// Outcome of a write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSummary {
    /// Bytes written
    pub bytes_written: usize,
    /// Maps written
    pub records: usize,
}

/// Encode `map` and write it to `writer`.
///
/// The map is fully encoded before anything is written, so an encode error
/// leaves the writer untouched.
pub fn write_map<W: Write>(
    writer: W,
    map: &DynamicMap,
    opts: &EncodeOptions,
) -> Result<WriteSummary> {
    let text = map.encode_with(opts)?;
    let mut writer = BufWriter::new(writer);
    writer.write_all(text.as_bytes())?;
    writer.flush()?;

    let summary = WriteSummary {
        bytes_written: text.len(),
        records: 1,
    };
    debug!(bytes = summary.bytes_written, "wrote map");
    Ok(summary)
}

/// Write maps as NDJSON, one compact object per line.
///
/// Stops at the first map that fails to encode; lines already written stay
/// written.
pub fn write_ndjson<'a, W, I>(writer: W, maps: I) -> Result<WriteSummary>
where
    W: Write,
    I: IntoIterator<Item = &'a DynamicMap>,
{
    let mut writer = BufWriter::new(writer);
    let mut summary = WriteSummary::default();

    for map in maps {
        let mut line = map.to_json_vec()?;
        line.push(b'\n');
        writer.write_all(&line)?;
        summary.bytes_written += line.len();
        summary.records += 1;
        trace!(record = summary.records, bytes = line.len(), "wrote record");
    }

    writer.flush()?;
    debug!(
        records = summary.records,
        bytes = summary.bytes_written,
        "wrote ndjson stream"
    );
    Ok(summary)
}
