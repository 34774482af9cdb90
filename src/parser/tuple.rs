//! Flat `<int>,<int>,<rest>` lines.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::fields::{optional, parse_index, parse_uint, strip_quotes, FieldError};
use super::{is_skipped, LineParser};
use crate::db::{GlyphEntry, Reciter, Verse};

// Only the first two commas delimit; the payload keeps its own commas.
static VERSE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+),(\d+),(.+)$").unwrap());
static GLYPH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"^(\d+),(\d+),"(.+)"$"#).unwrap());
static RECITER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+),([^,]+),([^,]*),(\d+)$").unwrap());

/// Verse text documents: the canonical text and every translation edition.
pub struct VerseParser;

impl VerseParser {
    const SKIP: &'static [&'static str] = &["quran["];

    fn parse(line: &str) -> Result<Option<Verse>, FieldError> {
        let Some(caps) = VERSE_RE.captures(line) else {
            return Ok(None);
        };
        Ok(Some(Verse {
            surah: parse_index(&caps[1])?,
            ayah: parse_index(&caps[2])?,
            text: strip_quotes(&caps[3]).to_string(),
        }))
    }
}

impl LineParser for VerseParser {
    type Record = Verse;

    fn parse_line(&mut self, line: &str) -> Option<Verse> {
        let line = line.trim();
        if is_skipped(line, Self::SKIP) {
            return None;
        }
        Self::parse(line).unwrap_or_else(|e| {
            debug!("Dropping verse line ({}): {}", e, line);
            None
        })
    }
}

/// One page of glyph codes. The page number comes from the document name.
pub struct GlyphParser {
    page: u32,
}

impl GlyphParser {
    const SKIP: &'static [&'static str] = &["glyphs["];

    pub fn new(page: u32) -> Self {
        GlyphParser { page }
    }
}

impl LineParser for GlyphParser {
    type Record = GlyphEntry;

    fn parse_line(&mut self, line: &str) -> Option<GlyphEntry> {
        let line = line.trim();
        if is_skipped(line, Self::SKIP) {
            return None;
        }
        let caps = GLYPH_RE.captures(line)?;
        let (surah, ayah) = match (parse_index(&caps[1]), parse_index(&caps[2])) {
            (Ok(s), Ok(a)) => (s, a),
            _ => return None,
        };
        Some(GlyphEntry {
            page: self.page,
            surah,
            ayah,
            glyph_text: caps[3].to_string(),
        })
    }
}

/// `id,name,style,verse_count`; names never contain commas, style may be empty.
pub struct ReciterParser;

impl ReciterParser {
    const SKIP: &'static [&'static str] = &["meta:", "reciters["];
}

impl LineParser for ReciterParser {
    type Record = Reciter;

    fn parse_line(&mut self, line: &str) -> Option<Reciter> {
        let line = line.trim();
        if is_skipped(line, Self::SKIP) {
            return None;
        }
        let caps = RECITER_RE.captures(line)?;
        Some(Reciter {
            id: parse_uint(&caps[1]).ok()?,
            name: strip_quotes(&caps[2]).to_string(),
            style: optional(&caps[3]),
            verse_count: parse_uint(&caps[4]).ok()?,
        })
    }
}
