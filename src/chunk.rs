//! Translation editions, split into fixed-size shards plus one index artifact.
//!
//! The window size is tuned by hand so that a full shard of typical
//! translations stays under the artifact ceiling. It is not derived from the
//! data; materially longer input needs a new value.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{ensure, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use tracing::{info, warn};

use crate::db::{self, Artifact, ArtifactReport, Edition, EditionMeta};
use crate::parser::delimited::EditionParser;
use crate::parser::tuple::VerseParser;
use crate::parser::collect_records;
use crate::schema;

pub const DEFAULT_EDITIONS_PER_CHUNK: usize = 45;

static CHUNK_FILE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^chunk_(\d+)\.db$").unwrap());

/// Give every edition its 1-based position in the catalogue and the 1-based
/// window it falls into.
pub fn assign_ids(metas: Vec<EditionMeta>, window: usize) -> Result<Vec<Edition>> {
    ensure!(window > 0, "editions per chunk must be at least 1");
    Ok(metas
        .into_iter()
        .zip(0usize..)
        .map(|(meta, pos)| Edition {
            global_id: pos as u32 + 1,
            chunk_id: (pos / window) as u32 + 1,
            meta,
        })
        .collect())
}

/// Keep the first catalogue line per slug. Ids are assigned afterwards, so
/// they stay positional over what remains.
pub fn dedup_slugs(metas: Vec<EditionMeta>) -> Vec<EditionMeta> {
    let mut seen = HashSet::new();
    metas
        .into_iter()
        .filter(|m| {
            let first = seen.insert(m.slug.clone());
            if !first {
                warn!("Dropping repeated catalogue entry for edition {}", m.slug);
            }
            first
        })
        .collect()
}

pub fn shard_count(editions: usize, window: usize) -> usize {
    editions.div_ceil(window)
}

/// `(chunk_id, editions)` per window, in order. The last window may be short.
pub fn shards(editions: &[Edition], window: usize) -> impl Iterator<Item = (u32, &[Edition])> {
    (1u32..).zip(editions.chunks(window))
}

pub fn chunk_file_name(chunk_id: u32) -> String {
    format!("chunk_{}.db", chunk_id)
}

/// Build every shard and the index. `source_root` holds `editions.toon` and
/// the `editions/<slug>.toon` documents.
pub fn build_editions(source_root: &Path, out_dir: &Path, window: usize) -> Result<Vec<ArtifactReport>> {
    let metas = collect_records(&source_root.join("editions.toon"), EditionParser)?;
    let editions = assign_ids(dedup_slugs(metas), window)?;
    let count = shard_count(editions.len(), window);
    info!(
        "Found {} editions, splitting into {} chunks of up to {}",
        editions.len(),
        count,
        window
    );

    let docs_dir = source_root.join("editions");
    let pb = ProgressBar::new(editions.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} editions ({msg})")?
            .progress_chars("=> "),
    );

    let mut reports = Vec::with_capacity(count + 1);
    for (chunk_id, shard) in shards(&editions, window) {
        pb.set_message(chunk_file_name(chunk_id));
        let path = out_dir.join(chunk_file_name(chunk_id));
        reports.push(build_shard(&docs_dir, &path, shard, &pb)?);
    }
    pb.finish_and_clear();
    remove_stale_shards(out_dir, count)?;

    let index = Artifact::create(&out_dir.join("index.db"), &schema::EDITION_INDEX)?;
    index.load(|conn| db::insert_editions(conn, &editions))?;
    reports.push(index.finalize()?);
    Ok(reports)
}

/// One transaction per edition, so a long shard commits in steps.
fn build_shard(docs_dir: &Path, path: &Path, shard: &[Edition], pb: &ProgressBar) -> Result<ArtifactReport> {
    let artifact = Artifact::create(path, &schema::EDITION_CHUNK)?;
    for edition in shard {
        let doc = docs_dir.join(format!("{}.toon", edition.meta.slug));
        if !doc.is_file() {
            warn!("No document for edition {} ({})", edition.meta.slug, doc.display());
            pb.inc(1);
            continue;
        }
        let verses = collect_records(&doc, VerseParser)?;
        if !verses.is_empty() {
            artifact.load(|conn| db::insert_translations(conn, edition.global_id, &verses))?;
        }
        pb.inc(1);
    }
    artifact.finalize()
}

/// Shards left over from an earlier run with more windows.
fn remove_stale_shards(out_dir: &Path, count: usize) -> Result<()> {
    let entries = fs::read_dir(out_dir)
        .with_context(|| format!("Failed to read directory: {}", out_dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let stale = CHUNK_FILE_RE
            .captures(name)
            .and_then(|c| c[1].parse::<usize>().ok())
            .is_some_and(|n| n == 0 || n > count);
        if stale {
            info!("Removing stale {}", path.display());
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
    }
    Ok(())
}
