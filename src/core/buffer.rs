/// Text buffers passed between stages: the chain buffer, the pair buffer
/// and the error log.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

use crate::core::extractor::EntityChain;
use crate::schema::entry::{Entry, EventBlock, Pair};
use crate::schema::event::{TypedDep, TypedEvent};

/// Separates the document id from its chains.
pub const ID_SEPARATOR: char = ';';
/// Separates chains of one document.
pub const CHAIN_SEPARATOR: &str = "&!&";
/// Terminates each event of a chain.
pub const EVENT_SEPARATOR: char = ':';

#[derive(Debug, Error)]
pub enum BufferError {
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },
    #[error("document id '{0}' cannot be written to a buffer")]
    InvalidDocumentId(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn malformed(line: usize, reason: impl Into<String>) -> BufferError {
    BufferError::MalformedRecord {
        line,
        reason: reason.into(),
    }
}

/// Append `text` to the file at `path`, creating it if needed.
pub fn append(path: &Path, text: &str) -> Result<(), BufferError> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(text.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Reject ids that would collide with the buffer separators.
///
/// Mention ids embed the document id, so whitespace and brackets are
/// refused along with the separators themselves.
pub fn check_document_id(id: &str) -> Result<(), BufferError> {
    let clashes = id.is_empty()
        || id.contains(ID_SEPARATOR)
        || id.contains(EVENT_SEPARATOR)
        || id.contains(CHAIN_SEPARATOR)
        || id.contains('|')
        || id.chars().any(|c| c.is_whitespace() || "()[]".contains(c));
    if clashes {
        return Err(BufferError::InvalidDocumentId(id.to_string()));
    }
    Ok(())
}

/// Record a document whose annotation failed.
pub fn append_error(path: &Path, document_id: &str) -> Result<(), BufferError> {
    append(path, &format!("{}\n", document_id))
}

// ---------------------------------------------------------------------------
// Chain buffer
// ---------------------------------------------------------------------------

/// Serialise the chains of one document, or `None` if there are none.
///
/// Format: `<id>;<event>:<event>:&!&<event>:&!&` without a trailing newline.
pub fn format_chain_line(document_id: &str, chains: &[EntityChain]) -> Option<String> {
    if chains.iter().all(EntityChain::is_empty) {
        return None;
    }
    let mut line = String::new();
    line.push_str(document_id);
    line.push(ID_SEPARATOR);
    for chain in chains.iter().filter(|c| !c.is_empty()) {
        for event in &chain.events {
            line.push_str(&event.to_string());
            line.push(EVENT_SEPARATOR);
        }
        line.push_str(CHAIN_SEPARATOR);
    }
    Some(line)
}

/// Parse one chain-buffer line.
///
/// Events that fail to parse are dropped with a warning; a line without an
/// id separator is rejected.
pub fn parse_chain_line(line: &str, line_no: usize) -> Result<Entry, BufferError> {
    let (id, rest) = line
        .split_once(ID_SEPARATOR)
        .ok_or_else(|| malformed(line_no, "missing document id separator"))?;
    let id = id.trim();
    if id.is_empty() {
        return Err(malformed(line_no, "empty document id"));
    }

    let mut entry = Entry::new(id);
    for block in rest.split(CHAIN_SEPARATOR) {
        let mut events = Vec::new();
        for text in block.split(EVENT_SEPARATOR) {
            if text.trim().is_empty() {
                continue;
            }
            match TypedEvent::parse(text, id) {
                Some(event) => events.push(event),
                None => log::warn!("line {}: skipping malformed event '{}'", line_no, text.trim()),
            }
        }
        if !events.is_empty() {
            entry.blocks.push(EventBlock::new(events));
        }
    }
    if entry.event_count() == 0 {
        log::warn!("line {}: document '{}' has no readable events", line_no, entry.id);
    }
    Ok(entry)
}

/// Read every entry of a chain buffer, skipping malformed lines.
pub fn read_chain_buffer(path: &Path) -> Result<Vec<Entry>, BufferError> {
    let reader = BufReader::new(std::fs::File::open(path)?);
    let mut entries = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_chain_line(&line, i + 1) {
            Ok(entry) => entries.push(entry),
            Err(e) => log::warn!("chain buffer {}: {}", path.display(), e),
        }
    }
    Ok(entries)
}

// ---------------------------------------------------------------------------
// Pair buffer
// ---------------------------------------------------------------------------

/// Serialise the pairs of one document: a blank line, the id, then one
/// record per pair.
pub fn format_pair_section(document_id: &str, pairs: &[Pair]) -> String {
    let mut out = String::new();
    out.push('\n');
    out.push_str(document_id);
    out.push('\n');
    for pair in pairs {
        out.push_str(&pair.to_string());
        out.push('\n');
    }
    out
}

/// A pair-buffer record as consumed by the schema builder.
#[derive(Debug, Clone, PartialEq)]
pub struct PairRecord {
    pub first: TypedDep,
    pub second: TypedDep,
    pub pmi: f64,
    /// Argument shared by both events.
    pub argument: String,
}

/// Parse one pair-buffer line. Headers and blank lines yield `Ok(None)`.
///
/// Accepts the PMI either as its own column or followed by the mention
/// block in the same column.
pub fn parse_pair_record(line: &str, line_no: usize) -> Result<Option<PairRecord>, BufferError> {
    let Some(bar) = line.find('|') else {
        return Ok(None);
    };
    let fields: Vec<&str> = line[..bar].split('\t').collect();
    if fields.len() < 3 {
        return Err(malformed(line_no, "expected key, key and pmi columns"));
    }
    let first = TypedDep::parse(fields[0].trim())
        .ok_or_else(|| malformed(line_no, format!("bad typed dependency '{}'", fields[0])))?;
    let second = TypedDep::parse(fields[1].trim())
        .ok_or_else(|| malformed(line_no, format!("bad typed dependency '{}'", fields[1])))?;
    let pmi: f64 = fields[2]
        .trim()
        .parse()
        .map_err(|_| malformed(line_no, format!("bad pmi '{}'", fields[2].trim())))?;

    let mentions = &line[bar + 1..];
    let argument = mentions
        .split_once('(')
        .and_then(|(_, rest)| rest.split_once(')'))
        .map(|(arg, _)| arg.trim())
        .filter(|arg| !arg.is_empty())
        .ok_or_else(|| malformed(line_no, "missing shared argument"))?;

    Ok(Some(PairRecord {
        first,
        second,
        pmi,
        argument: argument.to_string(),
    }))
}

/// Read every pair record of a pair buffer, skipping malformed lines.
pub fn read_pair_buffer(path: &Path) -> Result<Vec<PairRecord>, BufferError> {
    let reader = BufReader::new(std::fs::File::open(path)?);
    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        match parse_pair_record(&line, i + 1) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(e) => log::warn!("pair buffer {}: {}", path.display(), e),
        }
    }
    Ok(records)
}
