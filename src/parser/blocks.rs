//! Nested `key: value` blocks introduced by `- key: value` markers.

use tracing::debug;

use super::fields::{optional, parse_bool, parse_index, parse_uint, strip_quotes, value_after_colon, FieldError};
use super::LineParser;
use crate::db::{SurahBlock, SurahMeta, TajweedRule, Verse, VerseInfo, VolumeEntry};

/// Surah metadata with a nested `verses[..]` list. A surah is only complete
/// when the next `- chapter:` marker or the end of the document is reached.
#[derive(Default)]
pub struct InfoParser {
    current: Option<SurahBlock>,
    in_verses: bool,
}

impl InfoParser {
    fn start(&mut self, line: &str) -> Option<SurahBlock> {
        let done = self.current.take();
        self.in_verses = false;
        self.current = value_after_colon(line)
            .and_then(|v| parse_index(v).ok())
            .map(|id| SurahBlock {
                meta: SurahMeta {
                    id,
                    name: None,
                    english_name: None,
                    arabic_name: None,
                    revelation_type: None,
                },
                verses: Vec::new(),
            });
        if self.current.is_none() {
            debug!("Dropping surah block: {}", line);
        }
        done
    }
}

impl LineParser for InfoParser {
    type Record = SurahBlock;

    fn parse_line(&mut self, line: &str) -> Option<SurahBlock> {
        let line = line.trim();
        if line.starts_with("- chapter:") {
            return self.start(line);
        }
        let block = self.current.as_mut()?;
        let field = || value_after_colon(line).and_then(optional);

        if line.starts_with("name:") {
            block.meta.name = field();
        } else if line.starts_with("englishname:") {
            block.meta.english_name = field();
        } else if line.starts_with("arabicname:") {
            block.meta.arabic_name = field();
        } else if line.starts_with("revelation:") {
            block.meta.revelation_type = field();
        } else if line.starts_with("verses[") {
            self.in_verses = true;
        } else if self.in_verses && line.starts_with(|c: char| c.is_ascii_digit()) {
            match parse_verse_info(block.meta.id, line) {
                Ok(Some(v)) => block.verses.push(v),
                Ok(None) => {}
                Err(e) => debug!("Dropping verse info ({}): {}", e, line),
            }
        }
        None
    }

    fn finish(&mut self) -> Option<SurahBlock> {
        self.in_verses = false;
        self.current.take()
    }
}

/// `verse,line,juz,manzil,page,ruku,maqra,sajda`
fn parse_verse_info(surah: u32, line: &str) -> Result<Option<VerseInfo>, FieldError> {
    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() < 8 {
        return Ok(None);
    }
    Ok(Some(VerseInfo {
        surah,
        ayah: parse_index(parts[0])?,
        line: parse_uint(parts[1])?,
        juz: parse_uint(parts[2])?,
        manzil: parse_uint(parts[3])?,
        page: parse_uint(parts[4])?,
        ruku: parse_uint(parts[5])?,
        maqra: parse_uint(parts[6])?,
        sajda: parse_bool(parts[7])?,
    }))
}

/// Tajweed rules. `- c:` opens a surah, `v:` an ayah, and every
/// `start,end,rule` line under `rules[..]` is one record.
#[derive(Default)]
pub struct TajweedParser {
    surah: Option<u32>,
    verse: Option<(u32, u32)>,
}

impl LineParser for TajweedParser {
    type Record = TajweedRule;

    fn parse_line(&mut self, line: &str) -> Option<TajweedRule> {
        let line = line.trim();
        if line.starts_with("- c:") {
            self.surah = value_after_colon(line).and_then(|v| parse_index(v).ok());
            self.verse = None;
            return None;
        }
        if line.starts_with("v:") {
            self.verse = match (self.surah, value_after_colon(line).map(parse_index)) {
                (Some(s), Some(Ok(a))) => Some((s, a)),
                _ => None,
            };
            return None;
        }
        if line.is_empty() || line.starts_with("rules[") {
            return None;
        }
        let (surah, ayah) = self.verse?;
        let rule = parse_rule(line);
        if rule.is_none() {
            debug!("Dropping tajweed rule for {}:{}: {}", surah, ayah, line);
        }
        let (start_pos, end_pos, rule_type) = rule?;
        Some(TajweedRule {
            surah,
            ayah,
            start_pos,
            end_pos,
            rule_type,
        })
    }
}

/// `<start>,<end>,<rule>` where the rule is a single token.
fn parse_rule(line: &str) -> Option<(u32, u32, String)> {
    let mut parts = line.splitn(3, ',');
    let start_pos = parse_uint(parts.next()?).ok()?;
    let end_pos = parse_uint(parts.next()?).ok()?;
    let rule_type = parts.next()?.trim();
    if rule_type.is_empty() || rule_type.contains(|c: char| c == ',' || c.is_whitespace()) {
        return None;
    }
    Some((start_pos, end_pos, rule_type.to_string()))
}

/// A commentary volume: `key: value` metadata, then `surah:ayah,"json text"`
/// lines after the `ayahs[..]` marker.
#[derive(Default)]
pub struct VolumeParser {
    in_ayahs: bool,
}

impl LineParser for VolumeParser {
    type Record = VolumeEntry;

    fn parse_line(&mut self, line: &str) -> Option<VolumeEntry> {
        let line = line.trim();
        if line.is_empty() || line.starts_with("meta:") {
            return None;
        }
        if line.starts_with("ayahs[") {
            self.in_ayahs = true;
            return None;
        }
        if !self.in_ayahs {
            let (key, value) = line.split_once(':')?;
            return Some(VolumeEntry::Meta {
                key: key.trim().to_string(),
                value: strip_quotes(value).to_string(),
            });
        }
        let (key, value) = line.split_once(',')?;
        let (surah, ayah) = key.split_once(':')?;
        let text: String = match serde_json::from_str(value.trim()) {
            Ok(text) => text,
            Err(e) => {
                debug!("Dropping ayah {} ({})", key, e);
                return None;
            }
        };
        Some(VolumeEntry::Ayah(Verse {
            surah: parse_index(surah).ok()?,
            ayah: parse_index(ayah).ok()?,
            text,
        }))
    }
}
