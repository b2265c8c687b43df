use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use grain::config::Config;
use grain::embeddings::EmbeddingProvider;
use grain::error::{GrainError, Result};
use grain::pipeline;

pub fn cmd_ingest(config: &Config) -> Result<()> {
    let embedder = EmbeddingProvider::new(&config.embedding, config.embed_batch_size)?;

    println!(
        "{} {} PDF dir(s) and {}",
        "Ingesting".green().bold(),
        config.pdf_dirs.len(),
        config.links_file.display().to_string().cyan()
    );
    println!("  Embeddings: {}", embedder.model_id().cyan());

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} chunks embedded")
            .map_err(|e| GrainError::Config(format!("progress template: {}", e)))?
            .progress_chars("=>-"),
    );

    let rt = super::runtime()?;
    let report = rt.block_on(pipeline::ingest(config, &embedder, &pb))?;

    println!();
    println!("{}", "Ingestion complete".green().bold());
    println!("{}", "=".repeat(40));
    println!(
        "  PDF documents:     {} ({} chunks)",
        report.pdf_documents, report.pdf_chunks
    );
    println!(
        "  Web pages:         {} ({} chunks)",
        report.web_documents, report.web_chunks
    );
    println!("  Dimension:         {}", report.dimension);
    println!(
        "  Index:             {}",
        report.index_path.display().to_string().cyan()
    );
    println!(
        "  Chunks:            {}",
        report.chunks_path.display().to_string().cyan()
    );

    if !report.failures.is_empty() {
        println!();
        println!(
            "{}",
            format!("{} source(s) skipped:", report.failures.len()).yellow()
        );
        for failure in &report.failures {
            println!("  {} {}: {}", "!".yellow(), failure.source_id, failure.reason);
        }
    }

    Ok(())
}
