//! Commentary index, built by reading back the per-volume artifacts that
//! already sit in the destination directory. Must run after every volume
//! exists.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::db::{self, Artifact, ArtifactReport, CommentaryIndexRow};
use crate::schema;

pub const INDEX_FILE: &str = "index.db";
/// Aggregate artifact written by older tooling; never a volume.
pub const LEGACY_MASTER_FILE: &str = "master.db";

/// Volume artifacts in `dir`, sorted by file name.
pub fn volume_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("db") {
            continue;
        }
        match path.file_name().and_then(|n| n.to_str()) {
            Some(INDEX_FILE) | Some(LEGACY_MASTER_FILE) | None => continue,
            Some(_) => paths.push(path),
        }
    }
    paths.sort();
    Ok(paths)
}

/// Self-declared volume metadata. Each key is looked up on its own; whatever
/// is missing falls back to the file stem (name) or stays empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMeta {
    pub name: String,
    pub author: Option<String>,
    pub language: Option<String>,
    pub source: Option<String>,
}

impl VolumeMeta {
    pub fn read(conn: &Connection, slug: &str) -> Self {
        let lookup = |key: &str| db::metadata_value(conn, key);
        VolumeMeta {
            name: lookup("name").unwrap_or_else(|| slug.to_string()),
            author: lookup("author"),
            language: lookup("language"),
            source: lookup("source"),
        }
    }
}

/// One index row. Fails only when the volume has no readable `ayahs` table.
pub fn inspect_volume(path: &Path) -> Result<CommentaryIndexRow> {
    let slug = path
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("Invalid file name: {}", path.display()))?
        .to_string();
    let file_size_bytes = fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .len();

    let conn = db::open_read_only(path)?;
    let ayah_count = db::count_rows(&conn, "ayahs")
        .with_context(|| format!("No ayahs in {}", path.display()))?;
    let meta = VolumeMeta::read(&conn, &slug);

    Ok(CommentaryIndexRow {
        slug,
        name: meta.name,
        author: meta.author,
        language: meta.language,
        source: meta.source,
        ayah_count,
        file_size_bytes: i64::try_from(file_size_bytes)?,
    })
}

pub fn build_index(dir: &Path) -> Result<ArtifactReport> {
    let volumes = volume_paths(dir)?;
    info!("Found {} tafsir databases", volumes.len());

    let rows: Vec<CommentaryIndexRow> = volumes
        .iter()
        .filter_map(|path| match inspect_volume(path) {
            Ok(row) => Some(row),
            Err(e) => {
                warn!("Could not read {}: {:#}", path.display(), e);
                None
            }
        })
        .collect();

    let artifact = Artifact::create(&dir.join(INDEX_FILE), &schema::TAFSIR_INDEX)?;
    artifact.load(|conn| db::insert_commentary_index(conn, &rows))?;
    artifact.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_read_only;

    fn volume(dir: &Path, file: &str, ddl: &str) {
        let conn = Connection::open(dir.join(file)).unwrap();
        conn.execute_batch(ddl).unwrap();
    }

    fn index_rows(dir: &Path) -> Vec<CommentaryIndexRow> {
        let conn = open_read_only(&dir.join(INDEX_FILE)).unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT slug, name, author, language, source, ayah_count, file_size_bytes
                 FROM tafsirs ORDER BY id",
            )
            .unwrap();
        stmt.query_map([], |r| {
            Ok(CommentaryIndexRow {
                slug: r.get(0)?,
                name: r.get(1)?,
                author: r.get(2)?,
                language: r.get(3)?,
                source: r.get(4)?,
                ayah_count: r.get(5)?,
                file_size_bytes: r.get(6)?,
            })
        })
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
    }

    #[test]
    fn excludes_index_and_legacy_master() {
        let dir = tempfile::tempdir().unwrap();
        for f in ["b.db", "a.db", "index.db", "master.db", "notes.txt", "c.db-journal"] {
            fs::write(dir.path().join(f), b"").unwrap();
        }
        let names: Vec<String> = volume_paths(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.db", "b.db"]);
    }

    #[test]
    fn full_metadata() {
        let dir = tempfile::tempdir().unwrap();
        volume(
            dir.path(),
            "en-ibn-kathir.db",
            "CREATE TABLE metadata (key TEXT PRIMARY KEY, value TEXT);
             CREATE TABLE ayahs (surah INTEGER, ayah INTEGER, text TEXT, PRIMARY KEY (surah, ayah));
             INSERT INTO metadata VALUES ('name', 'Tafsir Ibn Kathir'), ('author', 'Ibn Kathir'),
                                         ('language', 'english'), ('source', 'example.org');
             INSERT INTO ayahs VALUES (1, 1, 'a'), (1, 2, 'b');",
        );
        build_index(dir.path()).unwrap();

        let rows = index_rows(dir.path());
        assert_eq!(rows.len(), 1);
        let r = &rows[0];
        assert_eq!(r.slug, "en-ibn-kathir");
        assert_eq!(r.name, "Tafsir Ibn Kathir");
        assert_eq!(r.author.as_deref(), Some("Ibn Kathir"));
        assert_eq!(r.language.as_deref(), Some("english"));
        assert_eq!(r.source.as_deref(), Some("example.org"));
        assert_eq!(r.ayah_count, 2);
        let size = fs::metadata(dir.path().join("en-ibn-kathir.db")).unwrap().len();
        assert_eq!(r.file_size_bytes, size as i64);
    }

    #[test]
    fn missing_metadata_table_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        volume(
            dir.path(),
            "ar-muyassar.db",
            "CREATE TABLE ayahs (surah INTEGER, ayah INTEGER, text TEXT);
             INSERT INTO ayahs VALUES (1, 1, 'a');",
        );
        volume(
            dir.path(),
            "en-partial.db",
            "CREATE TABLE metadata (key TEXT PRIMARY KEY, value TEXT);
             CREATE TABLE ayahs (surah INTEGER, ayah INTEGER, text TEXT);
             INSERT INTO metadata VALUES ('language', 'english');",
        );
        build_index(dir.path()).unwrap();

        let rows = index_rows(dir.path());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].slug, "ar-muyassar");
        assert_eq!(rows[0].name, "ar-muyassar");
        assert_eq!(rows[0].author, None);
        assert_eq!(rows[0].language, None);
        assert_eq!(rows[0].source, None);
        assert_eq!(rows[0].ayah_count, 1);

        assert_eq!(rows[1].name, "en-partial");
        assert_eq!(rows[1].language.as_deref(), Some("english"));
        assert_eq!(rows[1].ayah_count, 0);
    }

    #[test]
    fn unreadable_volume_does_not_stop_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a-garbage.db"), b"definitely not sqlite").unwrap();
        volume(dir.path(), "b-no-ayahs.db", "CREATE TABLE metadata (key TEXT, value TEXT);");
        volume(
            dir.path(),
            "c-good.db",
            "CREATE TABLE ayahs (surah INTEGER, ayah INTEGER, text TEXT);",
        );
        build_index(dir.path()).unwrap();

        let rows = index_rows(dir.path());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].slug, "c-good");
    }

    #[test]
    fn rebuild_replaces_previous_index() {
        let dir = tempfile::tempdir().unwrap();
        volume(dir.path(), "a.db", "CREATE TABLE ayahs (surah INTEGER, ayah INTEGER, text TEXT);");
        build_index(dir.path()).unwrap();
        build_index(dir.path()).unwrap();
        assert_eq!(index_rows(dir.path()).len(), 1);
    }
}
