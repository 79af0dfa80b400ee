use anyhow::{Context, Result};
use h2o::export::ExportReader;
use std::path::PathBuf;

pub async fn inspect_export(path: PathBuf, format: String) -> Result<()> {
    let reader = ExportReader::open(&path)
        .with_context(|| format!("Failed to read export {}", path.display()))?;
    let summary = reader.summarize();

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Export: {}", path.display());
    println!("=======");
    match (&summary.publication.title, &summary.publication.id) {
        (Some(title), Some(id)) => println!("Publication:      {} ({})", title, id),
        (Some(title), None) => println!("Publication:      {}", title),
        (None, Some(id)) => println!("Publication:      {}", id),
        (None, None) => println!("Publication:      (none)"),
    }
    println!("Entries:          {}", summary.entries);
    println!("Valid posts:      {}", summary.valid);
    println!("Invalid entries:  {}", summary.invalid);
    println!("Malformed posts:  {}", summary.malformed);
    println!("Published:        {}", summary.published);
    println!("Drafts:           {}", summary.drafts);
    println!("With cover image: {}", summary.with_cover_image);
    println!("Unique tags:      {}", summary.unique_tags.len());

    if !summary.first_ids.is_empty() {
        println!("\nFirst posts:");
        for id in &summary.first_ids {
            println!("  {}", id);
        }
    }

    Ok(())
}
