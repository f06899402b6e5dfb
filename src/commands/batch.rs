use crate::cli::CatalogueArgs;
use crate::pdf::catalogue::CatalogueOptions;
use crate::pdf::workflow::{self, default_output_path, BookmarkJob, BookmarkReport, OUTPUT_SUFFIX};
use crate::pdf::OpenMode;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::error;
use walkdir::WalkDir;

/// PDFs under `dir`, sorted, leaving out files this tool produced.
pub fn collect_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pdfs = Vec::new();

    for entry in WalkDir::new(dir).follow_links(true) {
        let entry =
            entry.with_context(|| format!("Failed to read directory: {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let is_pdf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        let is_output = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().ends_with(OUTPUT_SUFFIX));
        if is_pdf && !is_output {
            pdfs.push(path.to_path_buf());
        }
    }

    pdfs.sort();
    Ok(pdfs)
}

/// Output path for `input`, mirroring its directory below `dir` under `output_dir`
/// so same-named PDFs in different folders do not overwrite each other.
pub fn batch_output_path(dir: &Path, output_dir: &Path, input: &Path) -> PathBuf {
    let relative_parent = input
        .strip_prefix(dir)
        .ok()
        .and_then(Path::parent)
        .unwrap_or_else(|| Path::new(""));
    output_dir.join(relative_parent).join(default_output_path(input))
}

fn bookmark_one(
    input: &Path,
    output: PathBuf,
    mode: OpenMode,
    options: &CatalogueOptions,
) -> Result<BookmarkReport> {
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut job = BookmarkJob::new(input);
    job.output = output;
    job.mode = mode;
    job.catalogue = options.clone();
    workflow::run(&job)
}

pub fn run(
    dir: &Path,
    output_dir: Option<&Path>,
    mode: OpenMode,
    catalogue: CatalogueArgs,
) -> Result<()> {
    let output_dir = output_dir.unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create directory: {}", output_dir.display()))?;

    let pdfs = collect_pdfs(dir)?;
    if pdfs.is_empty() {
        println!("No PDF files found in {}", dir.display());
        return Ok(());
    }

    let options: CatalogueOptions = catalogue.into();
    let mut failures = 0;

    for input in &pdfs {
        let output = batch_output_path(dir, output_dir, input);
        match bookmark_one(input, output, mode, &options) {
            Ok(report) => println!(
                "{}: {} bookmark(s) -> {}",
                input.display(),
                report.apply.applied,
                report.output.display()
            ),
            Err(e) => {
                error!("{}: {:#}", input.display(), e);
                println!("{}: failed: {:#}", input.display(), e);
                failures += 1;
            }
        }
    }

    println!(
        "\nProcessed {} file(s), {} failed.",
        pdfs.len(),
        failures
    );

    if failures > 0 {
        anyhow::bail!("{} of {} file(s) failed", failures, pdfs.len());
    }
    Ok(())
}
