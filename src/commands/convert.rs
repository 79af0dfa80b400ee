use anyhow::{Context, Result};
use h2o::{
    config::Config,
    export::ExportReader,
    pipeline::{PipelineBuilder, RunOverrides, RunSummary},
    util::{display_relative, format_bytes},
};
use std::path::Path;
use tracing::info;

pub async fn convert_export(
    config: Config,
    export: &Path,
    overrides: RunOverrides,
) -> Result<RunSummary> {
    // Fatal input errors surface before any output is touched
    let reader = ExportReader::open(export)
        .with_context(|| format!("Failed to read export {}", export.display()))?;

    let run = PipelineBuilder::new(config, overrides).build()?;
    info!("Output directory: {}", run.output_root.display());

    let summary = run.pipeline.run(reader).await;

    if let Some(dry) = &run.dry_storage {
        println!("\nDry run: nothing was written to {}", run.output_root.display());
        println!("\nPlanned documents:");
        for doc in run.pipeline.plan() {
            let area = doc.area.map(|a| a.to_string()).unwrap_or_else(|| "template".to_string());
            println!(
                "  [{:<8}] {} ({}, {} tags)",
                area,
                display_relative(&doc.destination),
                format_bytes(doc.bytes),
                doc.tags
            );
        }
        let images = dry.planned();
        if !images.is_empty() {
            println!("\nPlanned images:");
            for image in images {
                println!("  {} ({})", display_relative(&image.path), format_bytes(image.bytes));
            }
        }
    }

    summary.print();
    Ok(summary)
}
