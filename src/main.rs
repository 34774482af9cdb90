mod chunk;
mod config;
mod db;
mod parser;
mod pipeline;
mod reconcile;
mod schema;
mod volumes;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};

use pipeline::Domain;

#[derive(Parser)]
#[command(name = "toon_sql", about = "Convert toon documents to SQLite databases for HTTP range requests")]
struct Cli {
    /// Source tree of .toon documents (env: TOON_SOURCE_DIR)
    #[arg(long, global = true)]
    source: Option<PathBuf>,
    /// Destination tree for databases (env: TOON_DEST_DIR)
    #[arg(long, global = true)]
    dest: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild every database in dependency order
    Run {
        /// Also rebuild the per-volume tafsir databases before the index
        #[arg(long)]
        volumes: bool,
        /// Editions per chunk database (env: TOON_EDITIONS_PER_CHUNK)
        #[arg(long)]
        chunk_size: Option<usize>,
    },
    /// Rebuild a single domain
    Build {
        #[arg(value_enum)]
        domain: Domain,
        /// Editions per chunk database (env: TOON_EDITIONS_PER_CHUNK)
        #[arg(long)]
        chunk_size: Option<usize>,
    },
    /// Rebuild the per-volume tafsir databases only
    Volumes,
    /// Rebuild the tafsir index from existing volume databases
    Index,
    /// Print sizes of existing databases
    Report,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let mut settings = config::Settings::load()?;
    if let Some(source) = cli.source {
        settings.source_dir = source;
    }
    if let Some(dest) = cli.dest {
        settings.dest_dir = dest;
    }

    println!("Source: {}", settings.source_dir.display());
    println!("Output: {}", settings.dest_dir.display());

    match cli.command {
        Commands::Run { volumes, chunk_size } => {
            if let Some(n) = chunk_size {
                settings.editions_per_chunk = n;
            }
            let reports = pipeline::run_all(&settings, volumes)?;
            pipeline::print_report(&settings, &reports);
        }
        Commands::Build { domain, chunk_size } => {
            if let Some(n) = chunk_size {
                settings.editions_per_chunk = n;
            }
            let reports = pipeline::build_domain(&settings, domain)?;
            pipeline::print_report(&settings, &reports);
        }
        Commands::Volumes => {
            settings.ensure_dirs()?;
            let reports = volumes::build_volumes(&settings.tafsir_source_dir(), &settings.tafsir_db_dir())?;
            println!("Built {} tafsir databases", reports.len());
            pipeline::print_report(&settings, &reports);
        }
        Commands::Index => {
            let reports = pipeline::build_domain(&settings, Domain::Tafsirs)?;
            pipeline::print_report(&settings, &reports);
        }
        Commands::Report => {
            let reports = pipeline::existing_artifacts(&settings)?;
            if reports.is_empty() {
                println!("No databases found. Run 'run' first.");
                return Ok(());
            }
            pipeline::print_report(&settings, &reports);
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
