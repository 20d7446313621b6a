//! Recipient list normalization.
//!
//! Turns uploaded text into an ordered, deduplicated list of recipient tokens.
//! No address validation happens here; the provider rejects malformed numbers
//! at send time.

use std::collections::HashSet;

/// How the uploaded content is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// CSV rows; every cell is a candidate recipient.
    Rows,
    /// One or more recipients per line, optionally comma-separated.
    Freeform,
}

impl SourceFormat {
    /// `.csv` files are row-structured, anything else is freeform.
    pub fn from_file_name(file_name: &str) -> Self {
        if file_name.to_ascii_lowercase().ends_with(".csv") {
            SourceFormat::Rows
        } else {
            SourceFormat::Freeform
        }
    }
}

/// Parse raw uploaded bytes into recipients in first-occurrence order.
///
/// Unreadable content (invalid UTF-8, malformed CSV) yields an empty list, which
/// callers report as "no valid recipients".
pub fn parse_recipients(content: &[u8], format: SourceFormat) -> Vec<String> {
    let text = match std::str::from_utf8(content) {
        Ok(text) => text.strip_prefix('\u{feff}').unwrap_or(text),
        Err(e) => {
            tracing::warn!(error = %e, "Recipient upload is not valid UTF-8");
            return Vec::new();
        }
    };

    let tokens = match format {
        SourceFormat::Rows => match row_tokens(text) {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read recipient CSV");
                return Vec::new();
            }
        },
        SourceFormat::Freeform => freeform_tokens(text),
    };

    dedup(tokens)
}

/// Flatten every cell of every row, row-major.
fn row_tokens(text: &str) -> Result<Vec<String>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut tokens = Vec::new();
    for record in reader.records() {
        let record = record?;
        tokens.extend(record.iter().map(str::trim).filter(|c| !c.is_empty()).map(String::from));
    }
    Ok(tokens)
}

fn freeform_tokens(text: &str) -> Vec<String> {
    text.split('\n')
        .flat_map(|line| line.split(','))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(String::from)
        .collect()
}

/// Keep the first occurrence of each exact (case-sensitive) token.
fn dedup(tokens: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(tokens.len());
    tokens
        .into_iter()
        .filter(|token| seen.insert(token.clone()))
        .collect()
}
