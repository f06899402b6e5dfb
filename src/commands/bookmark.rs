use crate::cli::BookmarkArgs;
use crate::pdf::workflow::{self, BookmarkJob};
use anyhow::{Context, Result};

pub fn run(args: BookmarkArgs) -> Result<()> {
    let path = args.path.context("No PDF file specified")?;

    let mut job = BookmarkJob::new(&path);
    if let Some(output) = args.output {
        job.output = output;
    }
    job.mode = args.mode;
    job.fit = args.fit;
    job.catalogue = args.catalogue.into();
    job.bookmarks_file = args.bookmarks;

    let report = workflow::run(&job)?;

    for failed in &report.apply.failed {
        println!(
            "Skipped \"{}\" (p. {}): {}",
            failed.entry.title, failed.entry.page, failed.reason
        );
    }
    println!(
        "Added {} bookmark(s) to {} ({} pages)",
        report.apply.applied,
        report.output.display(),
        report.page_count
    );

    Ok(())
}
