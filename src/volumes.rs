//! Per-volume commentary artifacts, one per `tafsirs/<slug>.toon` document.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::db::{self, Artifact, ArtifactReport, VolumeEntry};
use crate::parser::blocks::VolumeParser;
use crate::parser::collect_records;
use crate::parser::fields::is_slug;
use crate::reconcile::{INDEX_FILE, LEGACY_MASTER_FILE};
use crate::schema;

/// The edition catalogue shares the directory but is not a volume.
const CATALOGUE_FILE: &str = "editions.toon";

pub fn volume_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;
    let mut docs = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_toon = path.extension().and_then(|e| e.to_str()) == Some("toon");
        let is_catalogue = path.file_name().and_then(|n| n.to_str()) == Some(CATALOGUE_FILE);
        if path.is_file() && is_toon && !is_catalogue {
            docs.push(path);
        }
    }
    docs.sort();
    Ok(docs)
}

/// Artifact name for a volume: its `id` metadata, else the document stem.
/// `None` when neither gives a usable, non-reserved name.
pub fn volume_slug(doc: &Path, entries: &[VolumeEntry]) -> Option<String> {
    let declared = entries.iter().find_map(|e| match e {
        VolumeEntry::Meta { key, value } if key == "id" && is_slug(value) => Some(value.clone()),
        _ => None,
    });
    let slug = declared.or_else(|| {
        doc.file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| is_slug(s))
            .map(str::to_string)
    })?;
    let file = format!("{}.db", slug);
    if file == INDEX_FILE || file == LEGACY_MASTER_FILE {
        return None;
    }
    Some(slug)
}

pub fn build_volume(doc: &Path, out_dir: &Path) -> Result<Option<ArtifactReport>> {
    let entries = collect_records(doc, VolumeParser::default())?;
    let Some(slug) = volume_slug(doc, &entries) else {
        warn!("Skipping {}: no usable volume name", doc.display());
        return Ok(None);
    };
    let artifact = Artifact::create(&out_dir.join(format!("{}.db", slug)), &schema::TAFSIR_VOLUME)?;
    artifact.load(|conn| db::insert_volume_entries(conn, &entries))?;
    artifact.finalize().map(Some)
}

pub fn build_volumes(source_dir: &Path, out_dir: &Path) -> Result<Vec<ArtifactReport>> {
    let docs = volume_documents(source_dir)?;
    info!("Found {} tafsir documents", docs.len());

    let pb = ProgressBar::new(docs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} volumes ({msg})")?
            .progress_chars("=> "),
    );

    let mut reports = Vec::with_capacity(docs.len());
    for doc in &docs {
        pb.set_message(doc.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default());
        if let Some(report) = build_volume(doc, out_dir)? {
            reports.push(report);
        }
        pb.inc(1);
    }
    pb.finish_and_clear();
    Ok(reports)
}
