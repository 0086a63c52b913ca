//! Load SIP/SWP documents from NDJSON (one document per line)
//!
//! The systematic-transaction feed is nested (validations, fractions), so it
//! ships as newline-delimited JSON rather than CSV.

use super::types::SipDocument;
use std::error::Error;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Load all documents from an NDJSON file
pub fn load_documents<P: AsRef<Path>>(path: P) -> Result<Vec<SipDocument>, Box<dyn Error>> {
    let file = File::open(path)?;
    load_documents_from_reader(file)
}

/// Load documents from any reader; blank lines are skipped
pub fn load_documents_from_reader<R: Read>(reader: R) -> Result<Vec<SipDocument>, Box<dyn Error>> {
    let mut docs = Vec::new();
    for (line_no, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let doc: SipDocument = serde_json::from_str(&line)
            .map_err(|e| format!("line {}: {}", line_no + 1, e))?;
        docs.push(doc);
    }
    Ok(docs)
}
