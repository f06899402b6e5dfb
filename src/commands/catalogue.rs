use crate::cli::CatalogueArgs;
use crate::pdf::catalogue::extract_catalogue_with;
use crate::pdf::entries::write_bookmarks_text;
use anyhow::Result;
use std::path::Path;

pub fn run<P: AsRef<Path>>(
    path: P,
    args: CatalogueArgs,
    output: Option<&Path>,
    json: bool,
) -> Result<()> {
    let entries = extract_catalogue_with(&path, &args.into())?;

    if let Some(output) = output {
        write_bookmarks_text(output, &entries)?;
        println!("Wrote {} entries to {}", entries.len(), output.display());
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No table of contents found.");
        return Ok(());
    }

    for entry in &entries {
        println!("{}", entry.to_text_line());
    }

    Ok(())
}
