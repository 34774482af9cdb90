use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::chunk;
use crate::config::Settings;
use crate::db::{self, Artifact, ArtifactReport, GlyphEntry};
use crate::parser::blocks::{InfoParser, TajweedParser};
use crate::parser::delimited::SimilarityParser;
use crate::parser::fields::parse_index;
use crate::parser::tuple::{GlyphParser, ReciterParser, VerseParser};
use crate::parser::{collect_records, LineParser};
use crate::reconcile;
use crate::schema::{self, Schema};
use crate::volumes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Domain {
    Quran,
    Info,
    Editions,
    Tajweed,
    Glyphs,
    Mutashabihat,
    Recitations,
    /// Commentary index; reads the volume artifacts, so it always runs last.
    Tafsirs,
}

impl Domain {
    pub const ORDER: [Domain; 8] = [
        Domain::Quran,
        Domain::Info,
        Domain::Editions,
        Domain::Tajweed,
        Domain::Glyphs,
        Domain::Mutashabihat,
        Domain::Recitations,
        Domain::Tafsirs,
    ];
}

/// Every artifact in dependency order. Commentary volumes are rebuilt first
/// when asked, since the index reads them back.
pub fn run_all(settings: &Settings, with_volumes: bool) -> Result<Vec<ArtifactReport>> {
    settings.ensure_dirs()?;
    let mut reports = Vec::new();
    if with_volumes {
        reports.extend(volumes::build_volumes(&settings.tafsir_source_dir(), &settings.tafsir_db_dir())?);
    }
    for domain in Domain::ORDER {
        reports.extend(build_domain(settings, domain)?);
    }
    Ok(reports)
}

pub fn build_domain(settings: &Settings, domain: Domain) -> Result<Vec<ArtifactReport>> {
    info!("=== Building {:?} ===", domain);
    settings.ensure_dirs()?;
    let src = settings.source_dir.as_path();
    let out = settings.db_dir();

    let report = match domain {
        Domain::Quran => build_simple(
            &src.join("quran.toon"),
            &out.join("quran.db"),
            &schema::QURAN,
            VerseParser,
            db::insert_verses,
        )?,
        Domain::Info => build_simple(
            &src.join("info.toon"),
            &out.join("info.db"),
            &schema::INFO,
            InfoParser::default(),
            db::insert_surahs,
        )?,
        Domain::Editions => {
            return chunk::build_editions(src, &settings.editions_dir(), settings.editions_per_chunk);
        }
        Domain::Tajweed => build_simple(
            &src.join("tajweed.toon"),
            &out.join("tajweed.db"),
            &schema::TAJWEED,
            TajweedParser::default(),
            db::insert_tajweed_rules,
        )?,
        Domain::Glyphs => build_glyphs(&src.join("quran").join("tajweed_glyphs"), &out.join("tajweed_glyphs.db"))?,
        Domain::Mutashabihat => build_simple(
            &src.join("mutashabihat").join("data.toon"),
            &out.join("mutashabihat.db"),
            &schema::MUTASHABIHAT,
            SimilarityParser,
            db::insert_similarities,
        )?,
        Domain::Recitations => build_simple(
            &src.join("recitations.toon"),
            &out.join("recitations.db"),
            &schema::RECITATIONS,
            ReciterParser,
            db::insert_reciters,
        )?,
        Domain::Tafsirs => reconcile::build_index(&settings.tafsir_db_dir())?,
    };
    Ok(vec![report])
}

/// One document, one parser, one artifact, one transaction.
fn build_simple<P: LineParser>(
    doc: &Path,
    out: &Path,
    schema: &Schema,
    parser: P,
    insert: fn(&Connection, &[P::Record]) -> Result<usize>,
) -> Result<ArtifactReport> {
    let records = collect_records(doc, parser)?;
    info!("Parsed {} {} records from {}", records.len(), schema.name, doc.display());
    let artifact = Artifact::create(out, schema)?;
    artifact.load(|conn| insert(conn, &records))?;
    artifact.finalize()
}

/// Glyph documents are named by page number; anything else in the directory
/// is ignored.
pub fn glyph_pages(dir: &Path) -> Result<Vec<(u32, PathBuf)>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;
    let mut pages = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("toon") {
            continue;
        }
        if let Some(page) = path.file_stem().and_then(|s| s.to_str()).and_then(|s| parse_index(s).ok()) {
            pages.push((page, path));
        }
    }
    pages.sort();
    Ok(pages)
}

fn build_glyphs(dir: &Path, out: &Path) -> Result<ArtifactReport> {
    let mut glyphs: Vec<GlyphEntry> = Vec::new();
    let pages = glyph_pages(dir)?;
    for (page, path) in &pages {
        glyphs.extend(collect_records(path, GlyphParser::new(*page))?);
    }
    info!("Parsed {} glyph entries from {} pages", glyphs.len(), pages.len());
    let artifact = Artifact::create(out, &schema::GLYPHS)?;
    artifact.load(|conn| db::insert_glyphs(conn, &glyphs))?;
    artifact.finalize()
}

// ── Size report ──

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeSummary {
    pub total_bytes: u64,
    pub max_bytes: u64,
    pub over_ceiling: Vec<PathBuf>,
}

/// Flags artifacts above the ceiling; never fails.
pub fn summarize(reports: &[ArtifactReport], ceiling_bytes: u64) -> SizeSummary {
    let over_ceiling: Vec<PathBuf> = reports
        .iter()
        .filter(|r| r.bytes > ceiling_bytes)
        .map(|r| r.path.clone())
        .collect();
    for path in &over_ceiling {
        warn!("{} exceeds the {} MB ceiling", path.display(), ceiling_bytes / (1024 * 1024));
    }
    SizeSummary {
        total_bytes: reports.iter().map(|r| r.bytes).sum(),
        max_bytes: reports.iter().map(|r| r.bytes).max().unwrap_or(0),
        over_ceiling,
    }
}

pub fn print_report(settings: &Settings, reports: &[ArtifactReport]) -> SizeSummary {
    let summary = summarize(reports, settings.ceiling_bytes());
    println!("\nGenerated databases:");
    for r in reports {
        let shown = r.path.strip_prefix(&settings.dest_dir).unwrap_or(&r.path);
        println!("  {}: {:.2} MB", shown.display(), r.megabytes());
    }
    let mb = |b: u64| b as f64 / (1024.0 * 1024.0);
    println!("\nTotal: {:.2} MB", mb(summary.total_bytes));
    println!("Max file size: {:.2} MB", mb(summary.max_bytes));
    if summary.over_ceiling.is_empty() {
        println!("All files under {} MB.", settings.size_ceiling_mb);
    } else {
        println!(
            "WARNING: {} file(s) exceed {} MB!",
            summary.over_ceiling.len(),
            settings.size_ceiling_mb
        );
    }
    summary
}

/// Artifacts already on disk, for reporting without rebuilding.
pub fn existing_artifacts(settings: &Settings) -> Result<Vec<ArtifactReport>> {
    let mut reports = Vec::new();
    for dir in [settings.db_dir(), settings.editions_dir()] {
        if !dir.is_dir() {
            continue;
        }
        let mut paths: Vec<PathBuf> = fs::read_dir(&dir)
            .with_context(|| format!("Failed to read directory: {}", dir.display()))?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("db"))
            .collect();
        paths.sort();
        for path in paths {
            reports.push(ArtifactReport::from_file(&path)?);
        }
    }
    let index = settings.tafsir_db_dir().join(reconcile::INDEX_FILE);
    if index.is_file() {
        reports.push(ArtifactReport::from_file(&index)?);
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn settings(dest: &Path) -> Settings {
        Settings {
            source_dir: PathBuf::from("tests/fixtures/toon"),
            dest_dir: dest.to_path_buf(),
            editions_per_chunk: 2,
            size_ceiling_mb: 100,
        }
    }

    /// Every row of every table, as text, keyed by table name.
    fn dump(path: &Path) -> BTreeMap<String, Vec<String>> {
        let conn = db::open_read_only(path).unwrap();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        let mut out = BTreeMap::new();
        for table in tables {
            let sql = format!("SELECT * FROM {}", table);
            let mut stmt = conn.prepare(&sql).unwrap();
            let cols = stmt.column_count();
            let mut rows: Vec<String> = stmt
                .query_map([], |r| {
                    let mut fields = Vec::with_capacity(cols);
                    for i in 0..cols {
                        let v: rusqlite::types::Value = r.get(i)?;
                        fields.push(format!("{:?}", v));
                    }
                    Ok(fields.join("|"))
                })
                .unwrap()
                .collect::<Result<_, _>>()
                .unwrap();
            rows.sort();
            out.insert(table, rows);
        }
        out
    }

    fn count(path: &Path, table: &str) -> i64 {
        db::count_rows(&db::open_read_only(path).unwrap(), table).unwrap()
    }

    #[test]
    fn full_run_builds_every_artifact() {
        let dest = tempfile::tempdir().unwrap();
        let s = settings(dest.path());
        let reports = run_all(&s, true).unwrap();

        // 2 volumes + 6 simple domains + 2 shards + edition index + tafsir index
        assert_eq!(reports.len(), 12);
        let db = s.db_dir();
        assert_eq!(count(&db.join("quran.db"), "ayahs"), 10);
        assert_eq!(count(&db.join("info.db"), "surahs"), 2);
        assert_eq!(count(&db.join("info.db"), "verse_info"), 10);
        assert_eq!(count(&db.join("tajweed.db"), "rules"), 4);
        assert_eq!(count(&db.join("tajweed_glyphs.db"), "glyphs"), 5);
        assert_eq!(count(&db.join("mutashabihat.db"), "similarities"), 2);
        assert_eq!(count(&db.join("recitations.db"), "reciters"), 3);
        assert_eq!(count(&s.editions_dir().join("index.db"), "editions"), 3);
        assert_eq!(count(&s.tafsir_db_dir().join("index.db"), "tafsirs"), 2);

        let summary = summarize(&reports, s.ceiling_bytes());
        assert!(summary.over_ceiling.is_empty());
        assert_eq!(summary.total_bytes, reports.iter().map(|r| r.bytes).sum::<u64>());
    }

    #[test]
    fn info_verse_counts_match_rows() {
        let dest = tempfile::tempdir().unwrap();
        let s = settings(dest.path());
        build_domain(&s, Domain::Info).unwrap();
        let conn = db::open_read_only(&s.db_dir().join("info.db")).unwrap();
        let mismatches: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM surahs s
                 WHERE s.verse_count != (SELECT COUNT(*) FROM verse_info v WHERE v.surah = s.id)",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(mismatches, 0);
        let fatiha: i64 = conn
            .query_row("SELECT verse_count FROM surahs WHERE id = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(fatiha, 7);
    }

    #[test]
    fn glyph_pages_sorted_numerically() {
        let pages: Vec<u32> = glyph_pages(Path::new("tests/fixtures/toon/quran/tajweed_glyphs"))
            .unwrap()
            .into_iter()
            .map(|(p, _)| p)
            .collect();
        assert_eq!(pages, vec![1, 2, 10]);
    }

    #[test]
    fn rerun_reproduces_identical_rows() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let a = run_all(&settings(first.path()), true).unwrap();
        let b = run_all(&settings(second.path()), true).unwrap();
        // and again on top of the first output: old files are replaced, not merged
        let c = run_all(&settings(first.path()), true).unwrap();
        assert_eq!(a.len(), b.len());
        assert_eq!(a.len(), c.len());

        for ((ra, rb), rc) in a.iter().zip(&b).zip(&c) {
            let rel = ra.path.strip_prefix(first.path()).unwrap();
            assert_eq!(rel, rb.path.strip_prefix(second.path()).unwrap());
            if rel.ends_with("tafsirs/db/index.db") {
                // rows carry volume file sizes, which include compaction padding
                assert_eq!(count(&rc.path, "tafsirs"), count(&rb.path, "tafsirs"));
                continue;
            }
            assert_eq!(dump(&rc.path), dump(&rb.path), "{} differs between runs", rel.display());
        }
    }

    #[test]
    fn ceiling_is_a_warning() {
        let reports = vec![
            ArtifactReport {
                path: PathBuf::from("a.db"),
                bytes: 10,
            },
            ArtifactReport {
                path: PathBuf::from("b.db"),
                bytes: 300,
            },
        ];
        let summary = summarize(&reports, 100);
        assert_eq!(summary.total_bytes, 310);
        assert_eq!(summary.max_bytes, 300);
        assert_eq!(summary.over_ceiling, vec![PathBuf::from("b.db")]);
    }

    #[test]
    fn missing_source_document_halts() {
        let dest = tempfile::tempdir().unwrap();
        let s = Settings {
            source_dir: dest.path().join("nowhere"),
            ..settings(dest.path())
        };
        assert!(build_domain(&s, Domain::Quran).is_err());
    }

    #[test]
    fn existing_artifacts_listed() {
        let dest = tempfile::tempdir().unwrap();
        let s = settings(dest.path());
        build_domain(&s, Domain::Quran).unwrap();
        build_domain(&s, Domain::Editions).unwrap();
        let found = existing_artifacts(&s).unwrap();
        let names: Vec<String> = found
            .iter()
            .map(|r| r.path.strip_prefix(dest.path()).unwrap().display().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["db/quran.db", "db/editions/chunk_1.db", "db/editions/chunk_2.db", "db/editions/index.db"]
        );
    }
}
