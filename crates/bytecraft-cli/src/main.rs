//! Batch driver: load schemas, match input files to formats by filename
//! pattern, decode each file, and write normalized JSON next to it.
//!
//! Per-file and per-schema failures are logged and skipped; the run reports
//! how many files were actually processed.

use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use clap::Parser;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use bytecraft::format::{Format, find_format, load_formats};
use bytecraft::normalize::normalize;
use bytecraft::registry::Registry;

#[derive(Debug, Parser)]
#[command(name = "bytecraft", about = "Decode binary data files described by JSON schemas")]
struct Args {
    /// Directory containing schema JSON files
    #[arg(long, default_value = "schemas", conflicts_with = "schema_file")]
    schema_dir: PathBuf,

    /// A single schema file to load instead of scanning a directory
    #[arg(long)]
    schema_file: Option<PathBuf>,

    /// Input directory to scan for files matching a loaded format
    #[arg(long, conflicts_with = "input_file")]
    input_dir: Option<PathBuf>,

    /// A single input file to decode
    #[arg(long)]
    input_file: Option<PathBuf>,

    /// Output directory for the decoded JSON files
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// List the loaded formats and their patterns, then exit
    #[arg(long)]
    list_formats: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let registry = Registry::default();

    let formats = read_schemas(&args, &registry)?;
    if formats.is_empty() {
        bail!("no valid schemas found");
    }

    if args.list_formats {
        for format in &formats {
            println!("{}: {}", format.name, format.pattern);
        }
        return Ok(());
    }

    let files = collect_inputs(&args, &formats)?;
    if files.is_empty() {
        info!("no files found to process");
        return Ok(());
    }

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating output directory {}", args.output_dir.display()))?;

    let mut processed = 0usize;
    for path in &files {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let Some(format) = find_format(&formats, &filename) else {
            warn!(file = %path.display(), "no format matches");
            continue;
        };

        match process_file(format, path, &args.output_dir) {
            Ok(out_path) => {
                info!(
                    file = %path.display(),
                    format = %format.name,
                    output = %out_path.display(),
                    "decoded"
                );
                processed += 1;
            }
            Err(err) => error!(file = %path.display(), "{err:#}"),
        }
    }

    info!("processed {processed} of {} files", files.len());
    Ok(())
}

/// Loads schema sources from disk and compiles them. A schema that fails to
/// read, parse, or compile is logged and skipped; the rest still load.
fn read_schemas(args: &Args, registry: &Registry) -> anyhow::Result<Vec<Format>> {
    let mut sources: Vec<(String, String)> = Vec::new();

    if let Some(file) = &args.schema_file {
        let text = fs::read_to_string(file)
            .with_context(|| format!("reading schema {}", file.display()))?;
        sources.push((file.display().to_string(), text));
    } else {
        let entries = fs::read_dir(&args.schema_dir)
            .with_context(|| format!("reading schema directory {}", args.schema_dir.display()))?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        for path in paths {
            match fs::read_to_string(&path) {
                Ok(text) => sources.push((path.display().to_string(), text)),
                Err(err) => warn!(schema = %path.display(), "unreadable, skipping: {err}"),
            }
        }
    }

    let (formats, failures) = load_formats(
        sources.iter().map(|(label, text)| (label.clone(), text.as_str())),
        registry,
    );
    for (label, err) in &failures {
        warn!(schema = %label, "skipping: {err}");
    }

    Ok(formats)
}

/// Gathers the files to decode: either the one named on the command line, or
/// every file in the input directory that some loaded format matches.
fn collect_inputs(args: &Args, formats: &[Format]) -> anyhow::Result<Vec<PathBuf>> {
    if let Some(file) = &args.input_file {
        if !file.is_file() {
            bail!("input file not found: {}", file.display());
        }
        return Ok(vec![file.clone()]);
    }

    let Some(dir) = &args.input_dir else {
        bail!("either --input-dir or --input-file is required");
    };

    let entries = fs::read_dir(dir)
        .with_context(|| format!("reading input directory {}", dir.display()))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    files.retain(|path| {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let matched = find_format(formats, &filename).is_some();
        if !matched {
            debug!(file = %path.display(), "no format matches, skipping");
        }
        matched
    });

    Ok(files)
}

/// Decodes one file and writes `{filename, schema, data}` as pretty JSON.
/// Nothing is written unless the decode succeeds in full.
fn process_file(format: &Format, path: &Path, output_dir: &Path) -> anyhow::Result<PathBuf> {
    let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;

    let (value, consumed) = format
        .codec
        .decode(&data)
        .with_context(|| format!("decoding {}", path.display()))?;
    if consumed < data.len() {
        debug!(
            file = %path.display(),
            trailing = data.len() - consumed,
            "trailing bytes not covered by schema"
        );
    }

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.clone());

    let mut doc = serde_json::Map::new();
    doc.insert("filename".to_string(), serde_json::Value::String(filename));
    doc.insert(
        "schema".to_string(),
        serde_json::Value::String(format.name.clone()),
    );
    doc.insert("data".to_string(), normalize(&value));

    let out_path = output_dir.join(format!("{stem}.json"));
    let file = fs::File::create(&out_path)
        .with_context(|| format!("creating {}", out_path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &serde_json::Value::Object(doc))
        .with_context(|| format!("writing {}", out_path.display()))?;

    Ok(out_path)
}
