use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use tracing::{debug, info};

use crate::schema::{Schema, BUILD_PRAGMAS, PAGE_SIZE};

// ── Records ──

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verse {
    pub surah: u32,
    pub ayah: u32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurahMeta {
    pub id: u32,
    pub name: Option<String>,
    pub english_name: Option<String>,
    pub arabic_name: Option<String>,
    pub revelation_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerseInfo {
    pub surah: u32,
    pub ayah: u32,
    pub line: u32,
    pub juz: u32,
    pub manzil: u32,
    pub page: u32,
    pub ruku: u32,
    pub maqra: u32,
    pub sajda: bool,
}

/// A surah header with the verse rows nested under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurahBlock {
    pub meta: SurahMeta,
    pub verses: Vec<VerseInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ltr,
    Rtl,
}

impl Direction {
    pub fn parse(s: &str) -> Option<Direction> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("ltr") {
            Some(Direction::Ltr)
        } else if s.eq_ignore_ascii_case("rtl") {
            Some(Direction::Rtl)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Ltr => "ltr",
            Direction::Rtl => "rtl",
        }
    }
}

/// Edition as listed in the edition catalogue, before partitioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditionMeta {
    pub slug: String,
    pub author: Option<String>,
    pub language: String,
    pub direction: Direction,
    pub source: Option<String>,
    pub note: Option<String>,
}

/// Edition with its positional id and the shard holding its translations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edition {
    pub global_id: u32,
    pub chunk_id: u32,
    pub meta: EditionMeta,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TajweedRule {
    pub surah: u32,
    pub ayah: u32,
    pub start_pos: u32,
    pub end_pos: u32,
    pub rule_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphEntry {
    pub page: u32,
    pub surah: u32,
    pub ayah: u32,
    pub glyph_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimilarityEntry {
    pub id: u32,
    pub source_ref: String,
    pub similar_refs: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reciter {
    pub id: u32,
    pub name: String,
    pub style: Option<String>,
    pub verse_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeEntry {
    Meta { key: String, value: String },
    Ayah(Verse),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentaryIndexRow {
    pub slug: String,
    pub name: String,
    pub author: Option<String>,
    pub language: Option<String>,
    pub source: Option<String>,
    pub ayah_count: i64,
    pub file_size_bytes: i64,
}

// ── Artifacts ──

/// Size of one finished artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactReport {
    pub path: PathBuf,
    pub bytes: u64,
}

impl ArtifactReport {
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = fs::metadata(path)
            .with_context(|| format!("Failed to stat {}", path.display()))?
            .len();
        Ok(ArtifactReport {
            path: path.to_path_buf(),
            bytes,
        })
    }

    pub fn megabytes(&self) -> f64 {
        self.bytes as f64 / (1024.0 * 1024.0)
    }
}

/// A database being built from scratch. Disposable until `finalize`.
pub struct Artifact {
    conn: Connection,
    path: PathBuf,
}

impl Artifact {
    /// Delete whatever is at `path`, open a fresh database with build pragmas,
    /// and apply the schema.
    pub fn create(path: &Path, schema: &Schema) -> Result<Self> {
        if path.exists() {
            fs::remove_file(path)
                .with_context(|| format!("Failed to remove old {}", path.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        conn.execute_batch(BUILD_PRAGMAS)?;
        conn.execute_batch(schema.ddl)
            .with_context(|| format!("Failed to apply {} schema", schema.name))?;
        debug!("Created {} ({})", path.display(), schema.name);
        Ok(Artifact {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Run `f` inside one transaction. Nothing is visible unless it returns Ok.
    pub fn load<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let tx = self.conn.unchecked_transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    /// Compact, close, and report the final size.
    pub fn finalize(self) -> Result<ArtifactReport> {
        self.conn
            .execute_batch("VACUUM;")
            .with_context(|| format!("Failed to compact {}", self.path.display()))?;
        self.conn.close().map_err(|(_, e)| e)?;
        let report = ArtifactReport::from_file(&self.path)?;
        debug!(pages = report.bytes / u64::from(PAGE_SIZE), "Compacted {}", report.path.display());
        info!(
            "Created {} ({:.2} MB)",
            report.path.display(),
            report.megabytes()
        );
        Ok(report)
    }
}

pub fn open_read_only(path: &Path) -> Result<Connection> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("Failed to open {}", path.display()))
}

// ── Bulk loads ──

pub fn insert_verses(conn: &Connection, rows: &[Verse]) -> Result<usize> {
    let mut stmt =
        conn.prepare("INSERT OR REPLACE INTO ayahs (surah, ayah, text) VALUES (?1, ?2, ?3)")?;
    let mut count = 0;
    for v in rows {
        count += stmt.execute(rusqlite::params![v.surah, v.ayah, v.text])?;
    }
    Ok(count)
}

/// Surah headers plus their verse rows. `verse_count` is recomputed from the
/// stored verse rows, never taken from input.
pub fn insert_surahs(conn: &Connection, rows: &[SurahBlock]) -> Result<usize> {
    let mut count = 0;
    {
        let mut s_stmt = conn.prepare(
            "INSERT OR IGNORE INTO surahs
             (id, name, english_name, arabic_name, revelation, verse_count)
             VALUES (?1, ?2, ?3, ?4, ?5, 0)",
        )?;
        let mut v_stmt = conn.prepare(
            "INSERT OR IGNORE INTO verse_info
             (surah, ayah, line, juz, manzil, page, ruku, maqra, sajda)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;
        for block in rows {
            let m = &block.meta;
            count += s_stmt.execute(rusqlite::params![
                m.id, m.name, m.english_name, m.arabic_name, m.revelation_type,
            ])?;
            for v in &block.verses {
                v_stmt.execute(rusqlite::params![
                    v.surah, v.ayah, v.line, v.juz, v.manzil, v.page, v.ruku, v.maqra, v.sajda,
                ])?;
            }
        }
    }
    conn.execute(
        "UPDATE surahs SET verse_count =
             (SELECT COUNT(*) FROM verse_info v WHERE v.surah = surahs.id)",
        [],
    )?;
    Ok(count)
}

pub fn insert_editions(conn: &Connection, rows: &[Edition]) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO editions (id, slug, author, language, direction, source, note, chunk_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;
    let mut count = 0;
    for e in rows {
        let m = &e.meta;
        count += stmt.execute(rusqlite::params![
            e.global_id, m.slug, m.author, m.language, m.direction.as_str(), m.source, m.note,
            e.chunk_id,
        ])?;
    }
    Ok(count)
}

pub fn insert_translations(conn: &Connection, edition_id: u32, rows: &[Verse]) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT OR REPLACE INTO translations (edition_id, surah, ayah, text)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    let mut count = 0;
    for v in rows {
        count += stmt.execute(rusqlite::params![edition_id, v.surah, v.ayah, v.text])?;
    }
    Ok(count)
}

pub fn insert_tajweed_rules(conn: &Connection, rows: &[TajweedRule]) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO rules (surah, ayah, start_pos, end_pos, rule_type)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    let mut count = 0;
    for r in rows {
        count += stmt.execute(rusqlite::params![r.surah, r.ayah, r.start_pos, r.end_pos, r.rule_type])?;
    }
    Ok(count)
}

pub fn insert_glyphs(conn: &Connection, rows: &[GlyphEntry]) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT OR REPLACE INTO glyphs (page, surah, ayah, glyph_text) VALUES (?1, ?2, ?3, ?4)",
    )?;
    let mut count = 0;
    for g in rows {
        count += stmt.execute(rusqlite::params![g.page, g.surah, g.ayah, g.glyph_text])?;
    }
    Ok(count)
}

pub fn insert_similarities(conn: &Connection, rows: &[SimilarityEntry]) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT OR REPLACE INTO similarities (id, source_ref, similar_refs) VALUES (?1, ?2, ?3)",
    )?;
    let mut count = 0;
    for s in rows {
        count += stmt.execute(rusqlite::params![s.id, s.source_ref, s.similar_refs])?;
    }
    Ok(count)
}

pub fn insert_reciters(conn: &Connection, rows: &[Reciter]) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT OR REPLACE INTO reciters (id, name, style, verse_count) VALUES (?1, ?2, ?3, ?4)",
    )?;
    let mut count = 0;
    for r in rows {
        count += stmt.execute(rusqlite::params![r.id, r.name, r.style, r.verse_count])?;
    }
    Ok(count)
}

/// Metadata pairs and ayah texts of one commentary volume. Later duplicates win.
pub fn insert_volume_entries(conn: &Connection, rows: &[VolumeEntry]) -> Result<usize> {
    let mut m_stmt = conn.prepare("INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)")?;
    let mut a_stmt =
        conn.prepare("INSERT OR REPLACE INTO ayahs (surah, ayah, text) VALUES (?1, ?2, ?3)")?;
    let mut count = 0;
    for entry in rows {
        count += match entry {
            VolumeEntry::Meta { key, value } => m_stmt.execute(rusqlite::params![key, value])?,
            VolumeEntry::Ayah(v) => a_stmt.execute(rusqlite::params![v.surah, v.ayah, v.text])?,
        };
    }
    Ok(count)
}

pub fn insert_commentary_index(conn: &Connection, rows: &[CommentaryIndexRow]) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO tafsirs (slug, name, author, language, source, ayah_count, file_size_bytes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    let mut count = 0;
    for r in rows {
        count += stmt.execute(rusqlite::params![
            r.slug, r.name, r.author, r.language, r.source, r.ayah_count, r.file_size_bytes,
        ])?;
    }
    Ok(count)
}

// ── Read-back ──

pub fn count_rows(conn: &Connection, table: &str) -> Result<i64> {
    let n = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?;
    Ok(n)
}

/// One `metadata` lookup. A missing key, a missing table, or a NULL value are
/// all just "absent".
pub fn metadata_value(conn: &Connection, key: &str) -> Option<String> {
    conn.query_row("SELECT value FROM metadata WHERE key = ?1", [key], |r| {
        r.get::<_, Option<String>>(0)
    })
    .optional()
    .ok()
    .flatten()
    .flatten()
}
