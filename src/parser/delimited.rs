//! Comma-delimited lines whose quoted fields may hide commas.

use tracing::debug;

use super::fields::{is_slug, optional, parse_uint, strip_quotes};
use super::{is_skipped, LineParser};
use crate::db::{Direction, EditionMeta, SimilarityEntry};

/// Split on commas outside double quotes, tracking quote state per character.
/// Each field is trimmed and loses one layer of wrapping quotes.
pub fn split_quoted(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => {
                fields.push(strip_quotes(&current).to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    fields.push(strip_quotes(&current).to_string());
    fields
}

/// The edition catalogue: `slug,author,language,direction[,source[,note]]`.
pub struct EditionParser;

impl EditionParser {
    const SKIP: &'static [&'static str] = &["meta:", "editions["];
}

impl LineParser for EditionParser {
    type Record = EditionMeta;

    fn parse_line(&mut self, line: &str) -> Option<EditionMeta> {
        let line = line.trim();
        if is_skipped(line, Self::SKIP) {
            return None;
        }
        let mut fields = split_quoted(line).into_iter();
        let (slug, author, language, direction) =
            (fields.next()?, fields.next()?, fields.next()?, fields.next()?);
        // catalogue header fields ("version: 2, ...") never look like slugs
        if !is_slug(&slug) {
            debug!("Dropping edition line: {}", line);
            return None;
        }
        let Some(direction) = Direction::parse(&direction) else {
            debug!("Dropping edition {} with direction {:?}", slug, direction);
            return None;
        };
        Some(EditionMeta {
            slug,
            author: optional(&author),
            language,
            direction,
            source: fields.next().as_deref().and_then(optional),
            note: fields.next().as_deref().and_then(optional),
        })
    }
}

/// `"id","source_ref","similar_refs"`; the refs stay one opaque string.
pub struct SimilarityParser;

impl SimilarityParser {
    const SKIP: &'static [&'static str] = &["["];
}

impl LineParser for SimilarityParser {
    type Record = SimilarityEntry;

    fn parse_line(&mut self, line: &str) -> Option<SimilarityEntry> {
        let line = line.trim();
        if is_skipped(line, Self::SKIP) {
            return None;
        }
        let fields = split_quoted(line);
        let [id, source_ref, similar_refs] = fields.as_slice() else {
            debug!("Dropping similarity line with {} fields: {}", fields.len(), line);
            return None;
        };
        if source_ref.is_empty() || similar_refs.is_empty() {
            return None;
        }
        Some(SimilarityEntry {
            id: parse_uint(id).ok()?,
            source_ref: source_ref.clone(),
            similar_refs: similar_refs.clone(),
        })
    }
}
