//! Codec-selection statistics.
//!
//! When a stream's candidate set holds more than one codec, the merger
//! records each chunk's winning codec together with the raw values it
//! encoded: `term \t codec \t values…`. The files make selection behavior
//! auditable offline; they are never read back by the core.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::codecs::CodecId;
use crate::error::Result;

pub const DOCS_STATS_FILE: &str = "encoder_docs_statistics.txt";
pub const FREQS_STATS_FILE: &str = "encoder_freqs_statistics.txt";

pub struct CodecStats {
    docs: Option<BufWriter<File>>,
    freqs: Option<BufWriter<File>>,
}

impl CodecStats {
    /// No emission (single-codec candidate sets, or tests)
    pub fn disabled() -> Self {
        Self {
            docs: None,
            freqs: None,
        }
    }

    /// Open writers inside `dir` for the streams that requested them
    pub fn create(dir: &Path, emit_docs: bool, emit_freqs: bool) -> Result<Self> {
        let docs = if emit_docs {
            Some(BufWriter::new(File::create(dir.join(DOCS_STATS_FILE))?))
        } else {
            None
        };
        let freqs = if emit_freqs {
            Some(BufWriter::new(File::create(dir.join(FREQS_STATS_FILE))?))
        } else {
            None
        };
        Ok(Self { docs, freqs })
    }

    pub fn record_docs(&mut self, term: &str, codec: CodecId, values: &[u32]) -> Result<()> {
        if let Some(writer) = self.docs.as_mut() {
            write_line(writer, term, codec, values)?;
        }
        Ok(())
    }

    pub fn record_freqs(&mut self, term: &str, codec: CodecId, values: &[u32]) -> Result<()> {
        if let Some(writer) = self.freqs.as_mut() {
            write_line(writer, term, codec, values)?;
        }
        Ok(())
    }

    pub fn finish(self) -> Result<()> {
        if let Some(mut writer) = self.docs {
            writer.flush()?;
        }
        if let Some(mut writer) = self.freqs {
            writer.flush()?;
        }
        Ok(())
    }
}

fn write_line<W: Write>(writer: &mut W, term: &str, codec: CodecId, values: &[u32]) -> Result<()> {
    write!(writer, "{}\t{}\t", term, codec.name())?;
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            writer.write_all(b" ")?;
        }
        write!(writer, "{}", v)?;
    }
    writer.write_all(b"\n")?;
    Ok(())
}
